/*
    PAMPAC: stand-off annotation sets and combinator pattern matching

        Licensed under the GNU General Public License v3
*/

use sealed::sealed;
use std::fmt;
use std::hash::Hash;

use crate::config::Config;

/// The handle trait is implemented on handle types. They refer to an item by a numeric identifier.
/// Types implementing this are lightweight and do not borrow anything, they can be passed and copied freely.
/// This is a sealed trait, not implementable outside this crate.
#[sealed(pub(crate))] //<-- this ensures nobody outside this crate can implement the trait
pub trait Handle:
    Clone + Copy + core::fmt::Debug + PartialEq + Eq + PartialOrd + Ord + Hash
{
    /// Create a new handle for a numeric ID. You shouldn't need to use this as handles will always be generated for you by higher-level functions.
    fn new(intid: usize) -> Self;
    /// Returns the numeric identifier for this handle
    fn as_usize(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Annotation,
    AnnotationSet,
    Document,
    Config,
}

impl TryFrom<&str> for Type {
    type Error = &'static str;

    fn try_from(val: &str) -> Result<Self, Self::Error> {
        match val {
            "Annotation" | "annotation" => Ok(Self::Annotation),
            "AnnotationSet" | "annotationset" => Ok(Self::AnnotationSet),
            "Document" | "document" => Ok(Self::Document),
            "Config" | "config" => Ok(Self::Config),
            _ => Err("Unknown type supplied"),
        }
    }
}

impl Type {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Annotation => "Annotation",
            Self::AnnotationSet => "AnnotationSet",
            Self::Document => "Document",
            Self::Config => "Config",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[sealed(pub(crate))]
pub trait TypeInfo {
    /// Return the type (introspection).
    fn typeinfo() -> Type;
}

/// Emits a debug message, the closure is only invoked (and the message only formatted) when debug mode is enabled in the configuration
#[inline]
pub(crate) fn debug<F>(config: &Config, message_func: F)
where
    F: FnOnce() -> String,
{
    if config.debug() {
        tracing::debug!(target: "pampac", "{}", message_func());
    }
}
