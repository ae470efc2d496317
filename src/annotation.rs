/*
    PAMPAC: stand-off annotation sets and combinator pattern matching

        Licensed under the GNU General Public License v3
*/

//! This module contains the [`Annotation`], the stand-off unit of the model: an identity, a
//! span of text, a type, and a mutable feature map.

use sealed::sealed;
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::featurevalue::{test_features, FeatureConstraint, FeatureValue, Features};
use crate::span::{HasSpan, Span};
use crate::types::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// A handle to an [`Annotation`]. Ids are allocated by the owning [`crate::Document`] and are unique
/// within that document, across all of its annotation sets.
pub struct AnnotationHandle(u32);

impl AnnotationHandle {
    /// The largest id a handle can hold
    pub const MAX: usize = u32::MAX as usize;
}

#[sealed]
impl Handle for AnnotationHandle {
    /// Callers make sure `intid` does not exceed [`AnnotationHandle::MAX`]
    fn new(intid: usize) -> Self {
        Self(intid as u32)
    }
    fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AnnotationHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `Annotation` represents a particular instance of annotation: a typed span of the document's text,
/// carrying a feature map. The identity, span and type are immutable after creation; only the
/// features can change.
///
/// Annotations are shared between an annotation set and all query results derived from it (they
/// are held in an [`std::sync::Arc`]), feature changes through any of them are visible in all.
#[derive(Debug)]
pub struct Annotation {
    handle: AnnotationHandle,
    span: Span,
    annotype: String,
    features: RwLock<Features>,
}

impl Annotation {
    /// Only annotation sets create annotations
    pub(crate) fn new(
        handle: AnnotationHandle,
        span: Span,
        annotype: String,
        features: Features,
    ) -> Self {
        Self {
            handle,
            span,
            annotype,
            features: RwLock::new(features),
        }
    }

    pub fn handle(&self) -> AnnotationHandle {
        self.handle
    }

    /// The numeric identifier of the annotation
    pub fn id(&self) -> usize {
        self.handle.as_usize()
    }

    pub fn annotype(&self) -> &str {
        self.annotype.as_str()
    }

    // A poisoned lock only means another thread panicked while holding it, the map itself is still sound
    fn read_features(&self) -> RwLockReadGuard<'_, Features> {
        self.features.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_features(&self) -> RwLockWriteGuard<'_, Features> {
        self.features.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a copy of a single feature value
    pub fn feature(&self, key: &str) -> Option<FeatureValue> {
        self.read_features().get(key).cloned()
    }

    pub fn has_feature(&self, key: &str) -> bool {
        self.read_features().contains_key(key)
    }

    /// Returns a snapshot of the entire feature map
    pub fn features(&self) -> Features {
        self.read_features().clone()
    }

    /// Sets a feature, returns the previous value if any
    pub fn set_feature(
        &self,
        key: impl Into<String>,
        value: impl Into<FeatureValue>,
    ) -> Option<FeatureValue> {
        self.write_features().insert(key.into(), value.into())
    }

    /// Merges the given features into the feature map, existing keys are overwritten
    pub fn update_features(&self, features: Features) {
        self.write_features().extend(features);
    }

    /// Replaces the feature map entirely
    pub fn replace_features(&self, features: Features) {
        *self.write_features() = features;
    }

    pub fn remove_feature(&self, key: &str) -> Option<FeatureValue> {
        self.write_features().remove(key)
    }

    /// Tests the annotation against an optional type and a list of feature constraints, all of which must hold
    pub fn test(&self, annotype: Option<&str>, constraints: &[FeatureConstraint]) -> bool {
        if let Some(annotype) = annotype {
            if self.annotype != annotype {
                return false;
            }
        }
        constraints.is_empty() || test_features(&self.read_features(), constraints)
    }
}

impl HasSpan for Annotation {
    fn span(&self) -> Span {
        self.span
    }

    fn identity(&self) -> Option<AnnotationHandle> {
        Some(self.handle)
    }
}

impl PartialEq for Annotation {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Annotation {}

impl Hash for Annotation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl Ord for Annotation {
    /// Annotations are ordered by start offset, then by id
    fn cmp(&self, other: &Self) -> Ordering {
        self.span
            .start
            .cmp(&other.span.start)
            .then(self.handle.cmp(&other.handle))
    }
}

impl PartialOrd for Annotation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}#{}{}", self.annotype, self.handle, self.span)
    }
}

impl Serialize for Annotation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Annotation", 5)?;
        state.serialize_field("id", &self.handle)?;
        state.serialize_field("start", &self.span.start)?;
        state.serialize_field("end", &self.span.end)?;
        state.serialize_field("type", &self.annotype)?;
        state.serialize_field("features", &*self.read_features())?;
        state.end()
    }
}

/// Deserialisation counterpart of an [`Annotation`], turned into a real one by [`crate::Document`]
#[derive(Deserialize, Debug)]
pub(crate) struct AnnotationJson {
    pub(crate) id: AnnotationHandle,
    pub(crate) start: usize,
    pub(crate) end: usize,
    #[serde(rename = "type")]
    pub(crate) annotype: String,
    #[serde(default)]
    pub(crate) features: Features,
}

#[sealed]
impl TypeInfo for Annotation {
    fn typeinfo() -> Type {
        Type::Annotation
    }
}
