/*
    PAMPAC: stand-off annotation sets and combinator pattern matching

        Licensed under the GNU General Public License v3
*/

use smallvec::SmallVec;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::annotation::{Annotation, AnnotationHandle};
use crate::document::Document;
use crate::error::PampacError;
use crate::span::{HasSpan, Span};

use super::location::Location;

/// An item bound to a name during matching
#[derive(Debug, Clone)]
pub enum Binding {
    /// An annotation matched by `Ann` or `AnnAt`
    Annotation(Arc<Annotation>),
    /// A text match; `groups[0]` is the whole match, further entries are the capture groups
    /// of a regular expression (`None` if the group did not participate)
    Text {
        span: Span,
        groups: SmallVec<[Option<Span>; 4]>,
    },
    /// The span of a composite match
    Span(Span),
    /// A name bound in several repetitions of `N`, in order of repetition
    Repeated(Vec<Binding>),
}

impl Binding {
    pub fn span(&self) -> Span {
        match self {
            Self::Annotation(annotation) => annotation.span(),
            Self::Text { span, .. } => *span,
            Self::Span(span) => *span,
            Self::Repeated(items) => {
                let mut spans = items.iter().map(|item| item.span());
                match spans.next() {
                    Some(first) => spans.fold(first, |acc, span| acc.union(&span)),
                    None => Span::point(0),
                }
            }
        }
    }

    pub fn annotation(&self) -> Option<&Arc<Annotation>> {
        match self {
            Self::Annotation(annotation) => Some(annotation),
            _ => None,
        }
    }

    /// Returns a capture group: `None` if there is no such group, `Some(None)` if the group exists but
    /// did not participate in the match. Group 0 is the whole item, for any kind of binding.
    pub fn group(&self, index: usize) -> Option<Option<Span>> {
        match self {
            Self::Text { groups, .. } => groups.get(index).copied(),
            _ if index == 0 => Some(Some(self.span())),
            _ => None,
        }
    }

    pub fn is_repeated(&self) -> bool {
        matches!(self, Self::Repeated(_))
    }
}

impl HasSpan for Binding {
    fn span(&self) -> Span {
        Binding::span(self)
    }

    fn identity(&self) -> Option<AnnotationHandle> {
        self.annotation().map(|a| a.handle())
    }
}

/// Named bindings of a match. Names are unique, binding a name twice in one composition is a
/// [`PampacError::BindingConflict`], except across repetitions of `N`.
#[derive(Debug, Clone, Default)]
pub struct Bindings(BTreeMap<String, Binding>);

impl Bindings {
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Binding> {
        self.0.iter()
    }

    pub(crate) fn insert(&mut self, name: &str, binding: Binding) -> Result<(), PampacError> {
        if self.0.contains_key(name) {
            return Err(PampacError::BindingConflict(
                name.to_string(),
                "name is already bound",
            ));
        }
        self.0.insert(name.to_string(), binding);
        Ok(())
    }

    /// Adds all bindings of `other`, fails on the first name bound in both
    pub(crate) fn merge(&mut self, other: Bindings) -> Result<(), PampacError> {
        for (name, binding) in other.0 {
            if self.0.contains_key(&name) {
                return Err(PampacError::BindingConflict(
                    name,
                    "name bound by more than one part of the pattern",
                ));
            }
            self.0.insert(name, binding);
        }
        Ok(())
    }

    /// Adds the bindings of a further repetition, names bound before are collected into [`Binding::Repeated`]
    pub(crate) fn merge_repeated(&mut self, other: Bindings) {
        for (name, binding) in other.0 {
            match self.0.remove(&name) {
                Some(Binding::Repeated(mut items)) => {
                    items.push(binding);
                    self.0.insert(name, Binding::Repeated(items));
                }
                Some(existing) => {
                    self.0.insert(name, Binding::Repeated(vec![existing, binding]));
                }
                None => {
                    self.0.insert(name, binding);
                }
            }
        }
    }
}

impl<'a> IntoIterator for &'a Bindings {
    type Item = (&'a String, &'a Binding);
    type IntoIter = btree_map::Iter<'a, String, Binding>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One successful match of a parser: the matched span, the location where matching continues,
/// the item the parser matched (what [`crate::Parser::bind()`] binds) and all named bindings.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub(crate) span: Span,
    pub(crate) location: Location,
    pub(crate) item: Binding,
    pub(crate) bindings: Bindings,
}

impl MatchResult {
    pub(crate) fn new(span: Span, location: Location, item: Binding) -> Self {
        Self {
            span,
            location,
            item,
            bindings: Bindings::default(),
        }
    }

    /// A zero-width match that does not move
    pub(crate) fn empty(location: Location) -> Self {
        let span = Span::point(location.text);
        Self::new(span, location, Binding::Span(span))
    }

    /// The matched span
    pub fn span(&self) -> Span {
        self.span
    }

    /// The location after the match
    pub fn location(&self) -> Location {
        self.location
    }

    pub fn item(&self) -> &Binding {
        &self.item
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// The matched text
    pub fn text<'d>(&self, doc: &'d Document) -> Result<&'d str, PampacError> {
        doc.text_of(&self.span)
    }

    /// Sequential composition: `next` continues where this match ended
    pub(crate) fn then(mut self, next: MatchResult) -> Result<MatchResult, PampacError> {
        self.bindings.merge(next.bindings)?;
        let span = self.span.union(&next.span);
        Ok(MatchResult {
            span,
            location: next.location,
            item: Binding::Span(span),
            bindings: self.bindings,
        })
    }

    /// Sequential composition of repetitions
    pub(crate) fn then_repeated(mut self, next: MatchResult) -> MatchResult {
        self.bindings.merge_repeated(next.bindings);
        let span = self.span.union(&next.span);
        MatchResult {
            span,
            location: next.location,
            item: Binding::Span(span),
            bindings: self.bindings,
        }
    }

    /// Parallel composition: both matched at the same location, matching continues at the further end
    pub(crate) fn and(mut self, other: MatchResult) -> Result<MatchResult, PampacError> {
        self.bindings.merge(other.bindings)?;
        let span = self.span.union(&other.span);
        Ok(MatchResult {
            span,
            location: self.location.max(other.location),
            item: Binding::Span(span),
            bindings: self.bindings,
        })
    }
}

impl HasSpan for MatchResult {
    fn span(&self) -> Span {
        self.span
    }
}
