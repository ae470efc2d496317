/*
    PAMPAC: stand-off annotation sets and combinator pattern matching

        Licensed under the GNU General Public License v3
*/

//! This module contains the [`AnnotationSet`], the indexed container of annotations over one document.

use sealed::sealed;
use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::annotation::{Annotation, AnnotationHandle};
use crate::config::Config;
use crate::error::{Limit, PampacError};
use crate::featurevalue::Features;
use crate::intervalindex::IntervalIndex;
use crate::span::{HasSpan, Span, SpanRelation};
use crate::types::*;

/// An `AnnotationSet` holds annotations over the text of one [`crate::Document`]. Members are
/// kept in an interval index ordered by `(start, id)`, augmented for relational queries, and in a
/// secondary index by type.
///
/// Queries (e.g. [`Self::within()`], [`Self::by_type()`]) return *detached* sets: new containers
/// whose membership is independent of the set they were derived from, but which hold the *same*
/// annotations. Adding to or removing from a detached set never affects its origin; changing the
/// features of an annotation through either set is visible in both.
///
/// Mutation requires exclusive (`&mut`) access; concurrent writers need external synchronisation.
#[derive(Debug, Clone)]
pub struct AnnotationSet {
    name: String,

    /// Length of the document text in unicode codepoints
    textlen: usize,

    /// The id allocator of the owning document, shared by all its sets
    counter: Arc<AtomicUsize>,

    annotations: HashMap<AnnotationHandle, Arc<Annotation>>,

    /// Positional index
    index: IntervalIndex,

    /// Maps types to members, ordered by (start, id)
    types: HashMap<String, BTreeSet<(usize, AnnotationHandle)>>,

    /// For query results: the name of the set the result was derived from
    detached: Option<String>,

    config: Config,
}

impl AnnotationSet {
    pub(crate) fn new(
        name: impl Into<String>,
        textlen: usize,
        counter: Arc<AtomicUsize>,
        config: Config,
    ) -> Self {
        Self {
            name: name.into(),
            textlen,
            counter,
            annotations: HashMap::new(),
            index: IntervalIndex::default(),
            types: HashMap::new(),
            detached: None,
            config,
        }
    }

    pub(crate) fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// The name of the set, the default set has an empty name
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Is this a query result rather than a set owned by a document?
    pub fn is_detached(&self) -> bool {
        self.detached.is_some()
    }

    /// For detached sets, returns the name of the document set this result was (ultimately) derived from
    pub fn origin(&self) -> Option<&str> {
        self.detached.as_deref()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Length of the text the annotations refer to
    pub fn textlen(&self) -> usize {
        self.textlen
    }

    pub fn contains(&self, handle: AnnotationHandle) -> bool {
        self.annotations.contains_key(&handle)
    }

    /// Adds a new annotation to the set. Allocates the next document-wide id.
    /// Returns [`PampacError::InvalidSpan`] if `start > end` or the span exceeds the text.
    pub fn add(
        &mut self,
        start: usize,
        end: usize,
        annotype: impl Into<String>,
        features: Option<Features>,
    ) -> Result<Arc<Annotation>, PampacError> {
        self.check_span(start, end)?;
        let intid = self.counter.fetch_add(1, Ordering::Relaxed);
        if intid > AnnotationHandle::MAX {
            return Err(PampacError::LimitExceeded(
                Limit::Ids,
                AnnotationHandle::MAX,
                "the document has run out of annotation ids",
            ));
        }
        let handle = AnnotationHandle::new(intid);
        let annotation = Arc::new(Annotation::new(
            handle,
            Span::new_unchecked(start, end),
            annotype.into(),
            features.unwrap_or_default(),
        ));
        debug(&self.config, || {
            format!("AnnotationSet.add: set={:?} annotation={}", self.name, annotation)
        });
        self.insert(annotation.clone());
        Ok(annotation)
    }

    /// Adds an existing annotation (shared, not copied) to this set. Returns `false` if it was already a member.
    pub fn add_annotation(&mut self, annotation: Arc<Annotation>) -> Result<bool, PampacError> {
        let span = annotation.span();
        self.check_span(span.start, span.end)?;
        if self.contains(annotation.handle()) {
            return Ok(false);
        }
        self.insert(annotation);
        Ok(true)
    }

    /// Adds an annotation with a known id, used when reading a document back in
    pub(crate) fn add_with_handle(
        &mut self,
        handle: AnnotationHandle,
        start: usize,
        end: usize,
        annotype: String,
        features: Features,
    ) -> Result<Arc<Annotation>, PampacError> {
        self.check_span(start, end)?;
        if self.contains(handle) {
            return Err(PampacError::SerializationError(format!(
                "Duplicate annotation id {} in set {:?}",
                handle, self.name
            )));
        }
        let annotation = Arc::new(Annotation::new(
            handle,
            Span::new_unchecked(start, end),
            annotype,
            features,
        ));
        self.insert(annotation.clone());
        Ok(annotation)
    }

    fn check_span(&self, start: usize, end: usize) -> Result<(), PampacError> {
        if start > end {
            Err(PampacError::InvalidSpan(
                start,
                end,
                self.textlen,
                "Start must not be greater than end",
            ))
        } else if end > self.textlen {
            Err(PampacError::InvalidSpan(
                start,
                end,
                self.textlen,
                "Span exceeds the length of the text",
            ))
        } else {
            Ok(())
        }
    }

    fn insert(&mut self, annotation: Arc<Annotation>) {
        let handle = annotation.handle();
        let span = annotation.span();
        self.index.insert(span.start, span.end, handle);
        self.types
            .entry(annotation.annotype().to_string())
            .or_default()
            .insert((span.start, handle));
        self.annotations.insert(handle, annotation);
    }

    /// Retrieves an annotation by handle, returns [`PampacError::NotFound`] if it is not a member
    pub fn get(&self, handle: AnnotationHandle) -> Result<&Arc<Annotation>, PampacError> {
        self.annotations
            .get(&handle)
            .ok_or_else(|| PampacError::NotFound(handle.to_string(), "AnnotationSet.get"))
    }

    /// Removes an annotation from the set (and from all its indices) and returns it
    pub fn remove(&mut self, handle: AnnotationHandle) -> Result<Arc<Annotation>, PampacError> {
        let annotation = self
            .annotations
            .remove(&handle)
            .ok_or_else(|| PampacError::NotFound(handle.to_string(), "AnnotationSet.remove"))?;
        let start = annotation.start();
        self.index.remove(start, handle);
        if let Some(members) = self.types.get_mut(annotation.annotype()) {
            members.remove(&(start, handle));
            if members.is_empty() {
                self.types.remove(annotation.annotype());
            }
        }
        debug(&self.config, || {
            format!("AnnotationSet.remove: set={:?} annotation={}", self.name, annotation)
        });
        Ok(annotation)
    }

    /// Removes all annotations from the set
    pub fn clear(&mut self) {
        self.annotations.clear();
        self.index.clear();
        self.types.clear();
    }

    /// Iterates over all annotations, ordered by start offset, then by id
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Annotation>> + '_ {
        self.index
            .iter()
            .filter_map(move |handle| self.annotations.get(&handle))
    }

    /// Returns all annotations as an ordered vector of shared references
    pub fn to_vec(&self) -> Vec<Arc<Annotation>> {
        self.iter().cloned().collect()
    }

    pub fn first(&self) -> Option<&Arc<Annotation>> {
        self.index.first().and_then(|h| self.annotations.get(&h))
    }

    pub fn last(&self) -> Option<&Arc<Annotation>> {
        self.index.last().and_then(|h| self.annotations.get(&h))
    }

    /// The names of all types present in the set, sorted
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// The extent of all members: from the smallest start to the largest end
    pub fn span(&self) -> Option<Span> {
        let start = self.first()?.start();
        let end = self.index.max_end()?;
        Some(Span::new_unchecked(start, end))
    }

    /// Builds a detached set from handles in index order
    fn derive(&self, handles: impl IntoIterator<Item = AnnotationHandle>) -> AnnotationSet {
        let mut result = AnnotationSet::new(
            self.name.clone(),
            self.textlen,
            self.counter.clone(),
            self.config.clone(),
        );
        result.detached = Some(
            self.detached
                .clone()
                .unwrap_or_else(|| self.name.clone()),
        );
        for handle in handles {
            if let Some(annotation) = self.annotations.get(&handle) {
                result.insert(annotation.clone());
            }
        }
        result
    }

    fn derive_excluding<B: HasSpan + ?Sized>(
        &self,
        handles: Vec<AnnotationHandle>,
        boundary: &B,
        include_self: bool,
    ) -> AnnotationSet {
        let exclude = if include_self {
            None
        } else {
            boundary.identity()
        };
        self.derive(
            handles
                .into_iter()
                .filter(|handle| Some(*handle) != exclude),
        )
    }

    /// All members that lie within the boundary. The boundary may be an annotation or a raw span; if
    /// it is an annotation it is excluded from the result unless `include_self` is set.
    pub fn within<B: HasSpan + ?Sized>(&self, boundary: &B, include_self: bool) -> AnnotationSet {
        let span = boundary.span();
        let handles = self.index.within(span.start, span.end);
        self.derive_excluding(handles, boundary, include_self)
    }

    /// All members that share at least one codepoint with the boundary
    pub fn overlapping<B: HasSpan + ?Sized>(
        &self,
        boundary: &B,
        include_self: bool,
    ) -> AnnotationSet {
        let span = boundary.span();
        let handles = self.index.overlapping(span.start, span.end);
        self.derive_excluding(handles, boundary, include_self)
    }

    /// All members that cover the boundary completely; a zero-length span queries a single point
    pub fn covering<B: HasSpan + ?Sized>(&self, boundary: &B, include_self: bool) -> AnnotationSet {
        let span = boundary.span();
        let handles = self.index.covering(span.start, span.end);
        self.derive_excluding(handles, boundary, include_self)
    }

    /// All members with exactly the same offsets as the boundary
    pub fn coextensive<B: HasSpan + ?Sized>(
        &self,
        boundary: &B,
        include_self: bool,
    ) -> AnnotationSet {
        let span = boundary.span();
        let handles = self.index.coextensive(span.start, span.end);
        self.derive_excluding(handles, boundary, include_self)
    }

    /// All members that end before the boundary starts (exactly where it starts, if `immediately`)
    pub fn before<B: HasSpan + ?Sized>(&self, boundary: &B, immediately: bool) -> AnnotationSet {
        self.related(SpanRelation::Before { immediately }, boundary, false)
    }

    /// All members that start after the boundary ends (exactly where it ends, if `immediately`)
    pub fn after<B: HasSpan + ?Sized>(&self, boundary: &B, immediately: bool) -> AnnotationSet {
        self.related(SpanRelation::After { immediately }, boundary, false)
    }

    /// All members `a` for which `relation(a, boundary)` holds
    pub fn related<B: HasSpan + ?Sized>(
        &self,
        relation: SpanRelation,
        boundary: &B,
        include_self: bool,
    ) -> AnnotationSet {
        let handles = self.related_handles(relation, boundary.span());
        self.derive_excluding(handles, boundary, include_self)
    }

    /// Like [`Self::related()`], but iterates over the members without building a new set
    pub fn related_iter<B: HasSpan + ?Sized>(
        &self,
        relation: SpanRelation,
        boundary: &B,
    ) -> impl Iterator<Item = &Arc<Annotation>> + '_ {
        self.related_handles(relation, boundary.span())
            .into_iter()
            .filter_map(move |handle| self.annotations.get(&handle))
    }

    fn related_handles(&self, relation: SpanRelation, span: Span) -> Vec<AnnotationHandle> {
        match relation {
            SpanRelation::Within => self.index.within(span.start, span.end),
            SpanRelation::Overlapping => self.index.overlapping(span.start, span.end),
            SpanRelation::Covering => self.index.covering(span.start, span.end),
            SpanRelation::Coextensive => self.index.coextensive(span.start, span.end),
            SpanRelation::Before { immediately } => {
                let lo = if immediately { span.start } else { 0 };
                self.index.ending_between(lo, span.start)
            }
            SpanRelation::After { immediately } => {
                let hi = if immediately { span.end } else { usize::MAX };
                self.index.starting_between(span.end, hi)
            }
            SpanRelation::StartsAt => self.index.starting_between(span.start, span.start),
            SpanRelation::EndsAt => self.index.ending_between(span.end, span.end),
        }
    }

    /// All members starting at the given offset
    pub fn startingat(&self, offset: usize) -> AnnotationSet {
        self.derive(self.index.starting_between(offset, offset))
    }

    /// All members starting at or after the given offset
    pub fn start_ge(&self, offset: usize) -> AnnotationSet {
        self.derive(self.index.starting_between(offset, usize::MAX))
    }

    /// All members of the given type, order preserved
    pub fn by_type(&self, annotype: &str) -> AnnotationSet {
        match self.types.get(annotype) {
            Some(members) => self.derive(members.iter().map(|(_, handle)| *handle)),
            None => self.derive(std::iter::empty()),
        }
    }

    /// All members of any of the given types, order preserved
    pub fn by_types<S: AsRef<str>>(&self, annotypes: &[S]) -> AnnotationSet {
        self.derive(self.type_keys(annotypes).into_iter().map(|(_, handle)| handle))
    }

    /// Like [`Self::by_types()`], but returns the members as an ordered vector instead of a detached set
    pub fn to_vec_of_types<S: AsRef<str>>(&self, annotypes: &[S]) -> Vec<Arc<Annotation>> {
        self.type_keys(annotypes)
            .into_iter()
            .filter_map(|(_, handle)| self.annotations.get(&handle).cloned())
            .collect()
    }

    /// The `(start, id)` keys of all members of the given types, ordered
    fn type_keys<S: AsRef<str>>(&self, annotypes: &[S]) -> Vec<(usize, AnnotationHandle)> {
        let mut keys: Vec<(usize, AnnotationHandle)> = annotypes
            .iter()
            .filter_map(|annotype| self.types.get(annotype.as_ref()))
            .flat_map(|members| members.iter().copied())
            .collect();
        if annotypes.len() > 1 {
            keys.sort_unstable();
            keys.dedup();
        }
        keys
    }
}

impl<'a> IntoIterator for &'a AnnotationSet {
    type Item = &'a Arc<Annotation>;
    type IntoIter = Box<dyn Iterator<Item = &'a Arc<Annotation>> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl Serialize for AnnotationSet {
    /// Serialises as the ordered list of member annotations
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for annotation in self.iter() {
            seq.serialize_element(annotation.as_ref())?;
        }
        seq.end()
    }
}

#[sealed]
impl TypeInfo for AnnotationSet {
    fn typeinfo() -> Type {
        Type::AnnotationSet
    }
}
