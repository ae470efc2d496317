/*
    PAMPAC: stand-off annotation sets and combinator pattern matching

        Licensed under the GNU General Public License v3
*/

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use crate::annotation::Annotation;
use crate::annotationset::AnnotationSet;
use crate::config::Config;
use crate::document::Document;
use crate::error::{Limit, PampacError};
use crate::span::HasSpan;

/// A position of the parser: a text offset (in unicode codepoints) and an index into the
/// ordered annotation sequence under match. The annotation at `ann` never starts before `text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Location {
    pub text: usize,
    pub ann: usize,
}

impl Location {
    pub fn new(text: usize, ann: usize) -> Self {
        Self { text, ann }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "@{}/{}", self.text, self.ann)
    }
}

/// Everything parsers read while matching: the document, the annotation set that relational
/// modifiers consult, the ordered annotation sequence under match (typically a type-filtered view of
/// that set) and the configured limits.
///
/// A context is a read-only snapshot. The rule matcher takes the sequence out of it before actions
/// change the document, keeps it in step with those changes and builds the next context around it.
pub struct Context<'d> {
    pub(crate) doc: &'d Document,
    pub(crate) annset: &'d AnnotationSet,
    pub(crate) anns: Vec<Arc<Annotation>>,
    pub(crate) config: &'d Config,
    /// Number of match results produced since the last reset
    produced: Cell<usize>,
}

impl<'d> Context<'d> {
    /// Creates a context matching over all annotations of the given set
    pub fn new(doc: &'d Document, annset: &'d AnnotationSet, config: &'d Config) -> Self {
        Self {
            doc,
            annset,
            anns: annset.to_vec(),
            config,
            produced: Cell::new(0),
        }
    }

    /// Creates a context matching over a sequence of annotations that was prepared beforehand; it must
    /// be ordered by `(start, id)`.
    pub(crate) fn with_sequence(
        doc: &'d Document,
        annset: &'d AnnotationSet,
        config: &'d Config,
        anns: Vec<Arc<Annotation>>,
    ) -> Self {
        Self {
            doc,
            annset,
            anns,
            config,
            produced: Cell::new(0),
        }
    }

    /// Restricts the annotation sequence under match to the given types. Relational modifiers still consult the whole set.
    pub fn with_types<S: AsRef<str>>(mut self, types: &[S]) -> Self {
        self.anns = self.annset.to_vec_of_types(types);
        self
    }

    /// Gives up the context, returning the annotation sequence under match
    pub(crate) fn into_sequence(self) -> Vec<Arc<Annotation>> {
        self.anns
    }

    pub fn document(&self) -> &'d Document {
        self.doc
    }

    pub fn annset(&self) -> &'d AnnotationSet {
        self.annset
    }

    /// The ordered annotation sequence under match
    pub fn annotations(&self) -> &[Arc<Annotation>] {
        &self.anns
    }

    pub fn config(&self) -> &'d Config {
        self.config
    }

    /// Index of the first annotation in the sequence that starts at or after the offset
    pub fn next_ann_index(&self, offset: usize) -> usize {
        self.anns.partition_point(|a| a.start() < offset)
    }

    /// Like [`Self::next_ann_index()`], but never returns an index before `from`
    pub(crate) fn next_ann_index_from(&self, from: usize, offset: usize) -> usize {
        if from >= self.anns.len() {
            return self.anns.len();
        }
        from + self.anns[from..].partition_point(|a| a.start() < offset)
    }

    /// The location for a text offset, pointing at the first annotation starting at or after it
    pub fn location_at(&self, offset: usize) -> Location {
        Location::new(offset, self.next_ann_index(offset))
    }

    /// The location of the annotation at the given index of the sequence, `None` past the end
    pub fn location_of_ann(&self, index: usize) -> Option<Location> {
        self.anns
            .get(index)
            .map(|a| Location::new(a.start(), index))
    }

    pub(crate) fn at_end_of_anns(&self, location: Location) -> bool {
        location.ann >= self.anns.len()
    }

    /// Accounts for one more match result, fails once the configured maximum is exceeded
    pub(crate) fn produce(&self) -> Result<(), PampacError> {
        let produced = self.produced.get() + 1;
        self.produced.set(produced);
        if produced > self.config.max_results() {
            Err(PampacError::LimitExceeded(
                Limit::Results,
                self.config.max_results(),
                "too many match results for one rule at one location",
            ))
        } else {
            Ok(())
        }
    }

    /// Resets the result counter, done before each rule evaluation
    pub(crate) fn reset(&self) {
        self.produced.set(0);
    }
}
