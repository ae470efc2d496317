/*
    PAMPAC: stand-off annotation sets and combinator pattern matching

        Licensed under the GNU General Public License v3
*/

use std::error::Error;
use std::fmt;

use crate::span::Span;

// ------------------------------ ERROR DEFINITIONS & IMPLEMENTATIONS -------------------------------------------------------------

/// Which bound was violated: one of the backtracking engine's, or the id space of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// Overall number of match results produced while evaluating one rule at one scan position
    Results,
    /// Number of repetitions of an `N` combinator without explicit maximum
    Repeat,
    /// Number of positions tried by a `Find` combinator
    FindWindow,
    /// Number of annotation ids a document can allocate
    Ids,
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Results => write!(f, "max_results"),
            Self::Repeat => write!(f, "max_repeat"),
            Self::FindWindow => write!(f, "find_window"),
            Self::Ids => write!(f, "annotation_ids"),
        }
    }
}

#[derive(Debug)]
pub enum PampacError {
    /// Offsets do not form a valid span (begin, end, text length)
    InvalidSpan(usize, usize, usize, &'static str),

    /// No such annotation, annotation set or binding
    NotFound(String, &'static str),

    /// A relation was requested that is undefined for the two spans (e.g. the gap between overlapping spans)
    UndefinedRelation(Span, Span, &'static str),

    /// A binding name occurs twice within a single composition
    BindingConflict(String, &'static str),

    /// An action or modifier refers to a binding or capture group that does not exist
    UndefinedReference(String, &'static str),

    /// A configured backtracking bound was exceeded (limit, configured value)
    LimitExceeded(Limit, usize, &'static str),

    /// A regular expression could not be compiled
    RegexError(regex::Error, &'static str),

    /// A user-supplied callback reported failure
    CallbackError(String, &'static str),

    JsonError(
        serde_path_to_error::Error<serde_json::Error>,
        String,
        &'static str,
    ),
    SerializationError(String),
    IOError(std::io::Error, String, &'static str),
}

pub type PampacResult<T> = Result<T, PampacError>;

impl From<&PampacError> for String {
    /// Returns the error message as a String
    fn from(error: &PampacError) -> String {
        match error {
            PampacError::InvalidSpan(begin, end, textlen, msg) => format!(
                "InvalidSpan: Span ({},{}) is not valid for a text of length {} ({})",
                begin, end, textlen, msg
            ),
            PampacError::NotFound(id, msg) => format!("NotFound: No such item: {} ({})", id, msg),
            PampacError::UndefinedRelation(a, b, msg) => format!(
                "UndefinedRelation: Relation is undefined for spans {} and {} ({})",
                a, b, msg
            ),
            PampacError::BindingConflict(name, msg) => format!(
                "BindingConflict: Binding name '{}' is bound more than once ({})",
                name, msg
            ),
            PampacError::UndefinedReference(name, msg) => format!(
                "UndefinedReference: Reference to '{}' can not be resolved ({})",
                name, msg
            ),
            PampacError::LimitExceeded(limit, value, msg) => format!(
                "LimitExceeded: Limit {}={} exceeded ({})",
                limit, value, msg
            ),
            PampacError::RegexError(err, msg) => {
                format!("RegexError: Invalid regular expression: {} ({})", err, msg)
            }
            PampacError::CallbackError(err, msg) => {
                format!("CallbackError: Callback failed: {} ({})", err, msg)
            }
            PampacError::JsonError(err, path, msg) => format!(
                "JsonError: Parsing JSON failed: {} ({}) ({})",
                err, path, msg
            ),
            PampacError::SerializationError(err) => {
                format!("SerializationError: Serialization failed: {}", err)
            }
            PampacError::IOError(err, filename, msg) => format!(
                "IOError: {}: {} ({})",
                filename, err, msg
            ),
        }
    }
}

impl fmt::Display for PampacError {
    /// Formats the error message for printing
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let errmsg: String = String::from(self);
        write!(f, "[PampacError] {}", errmsg)
    }
}

impl Error for PampacError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::RegexError(err, _) => Some(err),
            Self::JsonError(err, _, _) => Some(err),
            Self::IOError(err, _, _) => Some(err),
            _ => None,
        }
    }
}

impl PampacError {
    /// Is this a non-structural error that stems from a configured bound rather than from the rules?
    pub fn is_limit(&self) -> bool {
        matches!(self, Self::LimitExceeded(..))
    }
}
