/*
    PAMPAC: stand-off annotation sets and combinator pattern matching

        Licensed under the GNU General Public License v3
*/

//! This module contains the [`Document`]: immutable text, document features, and the named
//! annotation sets over the text.

use sealed::sealed;
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::annotation::{Annotation, AnnotationHandle, AnnotationJson};
use crate::annotationset::AnnotationSet;
use crate::config::{Configurable, Config};
use crate::error::PampacError;
use crate::featurevalue::Features;
use crate::json::{open_file_reader, FromJson, ToJson};
use crate::span::{HasSpan, Span};
use crate::types::*;

/// A `Document` owns an immutable text and any number of named [`AnnotationSet`]s over it. The
/// default set has the empty name `""`. Sets are created lazily by [`Document::annset_mut()`].
///
/// All offsets are expressed in unicode codepoints. Annotation ids are allocated by the document
/// and are unique across all of its sets.
#[derive(Debug, Deserialize)]
#[serde(try_from = "DocumentBuilder")]
pub struct Document {
    text: String,

    /// Length of the text in unicode codepoints
    textlen: usize,

    /// Byte offset for every character offset (plus one for the end). Only present if the text is not plain ASCII,
    /// otherwise character offsets equal byte offsets.
    charmap: Option<Vec<usize>>,

    features: Features,

    sets: BTreeMap<String, AnnotationSet>,

    /// Next annotation id, shared with all sets
    counter: Arc<AtomicUsize>,

    config: Config,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        let text: String = text.into();
        let (textlen, charmap) = if text.is_ascii() {
            (text.len(), None)
        } else {
            let mut charmap: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
            let textlen = charmap.len();
            charmap.push(text.len());
            (textlen, Some(charmap))
        };
        Self {
            text,
            textlen,
            charmap,
            features: Features::new(),
            sets: BTreeMap::new(),
            counter: Arc::new(AtomicUsize::new(0)),
            config: Config::default(),
        }
    }

    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    /// Length of the text in unicode codepoints
    pub fn textlen(&self) -> usize {
        self.textlen
    }

    /// Converts a character offset to a byte offset, returns `None` if out of bounds
    pub fn byte_offset(&self, charoffset: usize) -> Option<usize> {
        if charoffset > self.textlen {
            return None;
        }
        match &self.charmap {
            None => Some(charoffset),
            Some(charmap) => charmap.get(charoffset).copied(),
        }
    }

    /// Converts a byte offset (which must fall on a character boundary) to a character offset
    pub fn char_offset(&self, byteoffset: usize) -> Option<usize> {
        match &self.charmap {
            None if byteoffset <= self.text.len() => Some(byteoffset),
            None => None,
            Some(charmap) => charmap.binary_search(&byteoffset).ok(),
        }
    }

    /// Returns the text covered by a span (or annotation)
    pub fn text_of<S: HasSpan + ?Sized>(&self, item: &S) -> Result<&str, PampacError> {
        let span = item.span();
        span.check_bounds(self.textlen)?;
        self.text_slice(span.start(), span.end())
    }

    /// Returns the text between two character offsets
    pub fn text_slice(&self, start: usize, end: usize) -> Result<&str, PampacError> {
        match (self.byte_offset(start), self.byte_offset(end)) {
            (Some(bytestart), Some(byteend)) if bytestart <= byteend => {
                Ok(&self.text[bytestart..byteend])
            }
            _ => Err(PampacError::InvalidSpan(
                start,
                end,
                self.textlen,
                "Document.text_slice",
            )),
        }
    }

    /// The span covering the entire text
    pub fn span(&self) -> Span {
        Span::new_unchecked(0, self.textlen)
    }

    pub fn features(&self) -> &Features {
        &self.features
    }

    pub fn features_mut(&mut self) -> &mut Features {
        &mut self.features
    }

    /// The id the next annotation added to any set of this document will receive
    pub fn next_id(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }

    pub fn has_annset(&self, name: &str) -> bool {
        self.sets.contains_key(name)
    }

    /// Returns the set with the given name, [`PampacError::NotFound`] if it does not exist
    pub fn annset(&self, name: &str) -> Result<&AnnotationSet, PampacError> {
        self.sets
            .get(name)
            .ok_or_else(|| PampacError::NotFound(name.to_string(), "Document.annset"))
    }

    /// Returns the set with the given name mutably, creating it if it does not exist yet
    pub fn annset_mut(&mut self, name: &str) -> &mut AnnotationSet {
        let (textlen, counter, config) = (self.textlen, &self.counter, &self.config);
        self.sets.entry(name.to_string()).or_insert_with(|| {
            debug(config, || {
                format!("Document.annset_mut: creating set {:?}", name)
            });
            AnnotationSet::new(name, textlen, counter.clone(), config.clone())
        })
    }

    /// The names of all sets, sorted
    pub fn annset_names(&self) -> Vec<&str> {
        self.sets.keys().map(|s| s.as_str()).collect()
    }

    /// Removes a set from the document and returns it
    pub fn remove_annset(&mut self, name: &str) -> Result<AnnotationSet, PampacError> {
        self.sets
            .remove(name)
            .ok_or_else(|| PampacError::NotFound(name.to_string(), "Document.remove_annset"))
    }

    pub fn annsets(&self) -> impl Iterator<Item = &AnnotationSet> {
        self.sets.values()
    }
}

impl Configurable for Document {
    fn config(&self) -> &Config {
        &self.config
    }

    fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Sets the configuration, the sets of the document receive it too
    fn set_config(&mut self, config: Config) -> &mut Self {
        for set in self.sets.values_mut() {
            set.set_config(config.clone());
        }
        self.config = config;
        self
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Document", 3)?;
        state.serialize_field("text", &self.text)?;
        state.serialize_field("features", &self.features)?;
        state.serialize_field("annotation_sets", &self.sets)?;
        state.end()
    }
}

#[derive(Deserialize)]
pub(crate) struct DocumentBuilder {
    text: String,
    #[serde(default)]
    features: Features,
    #[serde(default)]
    annotation_sets: BTreeMap<String, Vec<AnnotationJson>>,
}

impl TryFrom<DocumentBuilder> for Document {
    type Error = PampacError;

    fn try_from(builder: DocumentBuilder) -> Result<Self, Self::Error> {
        let mut document = Document::new(builder.text);
        document.features = builder.features;
        // annotations that occur in several sets are shared, not duplicated
        let mut seen: HashMap<AnnotationHandle, Arc<Annotation>> = HashMap::new();
        let mut maxid: Option<usize> = None;
        for (name, annotations) in builder.annotation_sets {
            let set = document.annset_mut(&name);
            for item in annotations {
                maxid = Some(maxid.map_or(item.id.as_usize(), |m| m.max(item.id.as_usize())));
                if let Some(existing) = seen.get(&item.id) {
                    if existing.start() != item.start
                        || existing.end() != item.end
                        || existing.annotype() != item.annotype
                    {
                        return Err(PampacError::SerializationError(format!(
                            "Annotation id {} occurs with different spans or types",
                            item.id
                        )));
                    }
                    set.add_annotation(existing.clone())?;
                } else {
                    let annotation = set.add_with_handle(
                        item.id,
                        item.start,
                        item.end,
                        item.annotype,
                        item.features,
                    )?;
                    seen.insert(annotation.handle(), annotation);
                }
            }
        }
        if let Some(maxid) = maxid {
            document.counter.store(maxid + 1, Ordering::Relaxed);
        }
        Ok(document)
    }
}

#[sealed]
impl TypeInfo for Document {
    fn typeinfo() -> Type {
        Type::Document
    }
}

impl ToJson for Document {}

impl FromJson for Document {
    /// Reads a document from a JSON file
    fn from_json_file(filename: &str, config: Config) -> Result<Self, PampacError> {
        debug(&config, || {
            format!("Document::from_json_file: filename={:?}", filename)
        });
        let reader = open_file_reader(filename)?;
        let deserializer = &mut serde_json::Deserializer::from_reader(reader);
        let result: Result<Document, _> = serde_path_to_error::deserialize(deserializer);
        let mut document = result.map_err(|e| {
            PampacError::JsonError(e, filename.to_string(), "Reading document from file")
        })?;
        document.set_config(config);
        Ok(document)
    }

    /// Reads a document from a JSON string
    fn from_json_str(string: &str, config: Config) -> Result<Self, PampacError> {
        let deserializer = &mut serde_json::Deserializer::from_str(string);
        let result: Result<Document, _> = serde_path_to_error::deserialize(deserializer);
        let mut document = result.map_err(|e| {
            PampacError::JsonError(e, String::new(), "Reading document from string")
        })?;
        document.set_config(config);
        Ok(document)
    }
}
