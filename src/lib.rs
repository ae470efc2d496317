/*
    PAMPAC: stand-off annotation sets and combinator pattern matching

        Licensed under the GNU General Public License v3
*/

//! ## Introduction
//!
//! This library keeps stand-off annotations over a text and matches patterns over them.
//!
//! **What can you do with this library?**
//!
//! * Keep a [`Document`] with named [`AnnotationSet`]s. An annotation has a type, a [`Span`] of unicode
//!   character offsets and a feature map of [`FeatureValue`]s.
//! * Query annotation sets by type and by the relation of spans to some boundary (within, overlapping,
//!   covering, coextensive, before, after), backed by an interval index.
//! * Describe patterns over annotations and text with the PAMPAC [`Parser`] combinators, with
//!   backtracking, named bindings and relational modifiers.
//! * Apply ordered lists of [`Rule`]s with a [`Pampac`] matcher, whose [`Action`]s add, remove or
//!   update annotations as matches are found.
//! * Read and write documents as JSON.
//!
//! Documents, annotation sets and annotations:
//! * [`Document`]
//! * [`AnnotationSet`]
//! * [`Annotation`]
//! * [`Span`], [`HasSpan`], [`SpanRelation`]
//! * [`FeatureValue`], [`FeatureOperator`]
//!
//! Pattern matching:
//! * [`Parser`]
//! * [`Context`], [`Location`]
//! * [`MatchResult`], [`Bindings`]
//! * [`Pampac`], [`Rule`], [`Action`]

mod annotation;
mod annotationset;
mod config;
mod document;
mod error;
mod featurevalue;
mod intervalindex;
mod json;
mod pampac;
mod span;
mod types;

// Our internal crate structure is not very relevant to the outside world,
// expose all structs and traits in the root namespace, and be explicit about it:

pub use annotation::{Annotation, AnnotationHandle};
pub use annotationset::AnnotationSet;
pub use config::{Config, Configurable};
pub use document::Document;
pub use error::{Limit, PampacError, PampacResult};
pub use featurevalue::{test_features, FeatureConstraint, FeatureOperator, FeatureValue, Features};
pub use json::{FromJson, ToJson};
pub use pampac::*;
pub use span::{HasSpan, Span, SpanRelation};
pub use types::*;

pub use regex::Regex;
