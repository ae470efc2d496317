/*
    PAMPAC: stand-off annotation sets and combinator pattern matching

        Licensed under the GNU General Public License v3
*/

use std::fmt;
use std::sync::Arc;

use crate::document::Document;
use crate::error::PampacError;
use crate::featurevalue::FeatureConstraint;
use crate::span::{HasSpan, Span, SpanRelation};

use super::location::{Context, Location};
use super::primitives::AnnSpec;
use super::result::MatchResult;

/// The second argument of a relational modifier
#[derive(Debug, Clone)]
pub enum RelationTarget {
    /// Any annotation of the input annotation set satisfying the constraints
    Annotations(AnnSpec),
    /// An item bound earlier in the same match
    Binding(String),
    /// A fixed span
    Span(Span),
}

impl RelationTarget {
    /// Annotations of the given type
    pub fn annotype(annotype: &str) -> Self {
        Self::Annotations(AnnSpec::new(Some(annotype), Vec::new()))
    }

    pub fn annotations(annotype: Option<&str>, constraints: Vec<FeatureConstraint>) -> Self {
        Self::Annotations(AnnSpec::new(annotype, constraints))
    }

    pub fn binding(name: impl Into<String>) -> Self {
        Self::Binding(name.into())
    }

    pub fn span(span: Span) -> Self {
        Self::Span(span)
    }
}

impl From<Span> for RelationTarget {
    fn from(span: Span) -> Self {
        Self::Span(span)
    }
}

/// Tests whether `relation` holds between the subject of a match and the target.
/// The subject is the whole match, or the item bound to `subject` if given.
pub(crate) fn test_relation(
    ctx: &Context,
    result: &MatchResult,
    relation: SpanRelation,
    target: &RelationTarget,
    subject: Option<&str>,
) -> Result<bool, PampacError> {
    let (subjectspan, identity) = match subject {
        None => (result.span(), result.item().identity()),
        Some(name) => {
            let binding = result.binding(name).ok_or_else(|| {
                PampacError::UndefinedReference(name.to_string(), "subject of relational modifier")
            })?;
            (binding.span(), binding.identity())
        }
    };
    match target {
        RelationTarget::Span(span) => Ok(relation.test(&subjectspan, span)),
        RelationTarget::Binding(name) => {
            let binding = result.binding(name).ok_or_else(|| {
                PampacError::UndefinedReference(name.to_string(), "target of relational modifier")
            })?;
            Ok(relation.test(&subjectspan, binding))
        }
        RelationTarget::Annotations(spec) => {
            // members `a` with relation(subject, a), i.e. inverse(a, subject)
            Ok(ctx
                .annset
                .related_iter(relation.inverse(), &subjectspan)
                .any(|a| Some(a.handle()) != identity && spec.test(a)))
        }
    }
}

/// A predicate on match results, used by `Filter` (the `where` modifier)
#[derive(Clone)]
pub struct Predicate(pub(crate) Arc<dyn Fn(&MatchResult, &Document) -> bool + Send + Sync>);

impl Predicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&MatchResult, &Document) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Predicate")
    }
}

/// Invoked by `Call` for every result of the wrapped parser
#[derive(Clone)]
pub struct SuccessCallback(
    pub(crate) Arc<dyn Fn(&MatchResult, &Document) -> Result<(), PampacError> + Send + Sync>,
);

impl SuccessCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&MatchResult, &Document) -> Result<(), PampacError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for SuccessCallback {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SuccessCallback")
    }
}

/// Invoked by `Call` when the wrapped parser produced no result at a location
#[derive(Clone)]
pub struct FailureCallback(
    pub(crate) Arc<dyn Fn(&Location, &Document) -> Result<(), PampacError> + Send + Sync>,
);

impl FailureCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Location, &Document) -> Result<(), PampacError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for FailureCallback {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FailureCallback")
    }
}
