/*
    PAMPAC: stand-off annotation sets and combinator pattern matching

        Licensed under the GNU General Public License v3
*/

use std::fmt;
use std::sync::Arc;

use crate::annotation::{Annotation, AnnotationHandle};
use crate::config::Config;
use crate::document::Document;
use crate::error::PampacError;
use crate::featurevalue::{FeatureValue, Features};
use crate::span::Span;
use crate::types::debug;

use super::result::{Binding, MatchResult};

/// Refers to a span of a match: the whole match, a named binding, or a capture group of either
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanRef {
    binding: Option<String>,
    group: Option<usize>,
}

impl SpanRef {
    /// The span of the whole match
    pub fn matched() -> Self {
        Self {
            binding: None,
            group: None,
        }
    }

    /// Capture group `n` of the item the rule's parser matched (a `Text` parser)
    pub fn group(n: usize) -> Self {
        Self {
            binding: None,
            group: Some(n),
        }
    }

    /// The span of a named binding
    pub fn binding(name: &str) -> Self {
        Self {
            binding: Some(name.to_string()),
            group: None,
        }
    }

    /// Capture group `n` of a named binding
    pub fn binding_group(name: &str, n: usize) -> Self {
        Self {
            binding: Some(name.to_string()),
            group: Some(n),
        }
    }

    fn item<'a>(&self, result: &'a MatchResult) -> Result<&'a Binding, PampacError> {
        match &self.binding {
            None => Ok(result.item()),
            Some(name) => result
                .binding(name)
                .ok_or_else(|| PampacError::UndefinedReference(name.clone(), "no such binding")),
        }
    }

    /// Resolves the span. `Ok(None)` means the referenced capture group exists but did not take part in the match.
    pub fn resolve(&self, result: &MatchResult) -> Result<Option<Span>, PampacError> {
        match self.group {
            None if self.binding.is_none() => Ok(Some(result.span())),
            None => Ok(Some(self.item(result)?.span())),
            Some(n) => self.item(result)?.group(n).ok_or_else(|| {
                PampacError::UndefinedReference(self.to_string(), "no such capture group")
            }),
        }
    }
}

impl fmt::Display for SpanRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (&self.binding, self.group) {
            (None, None) => write!(f, "<match>"),
            (None, Some(n)) => write!(f, "<match>.{}", n),
            (Some(name), None) => write!(f, "{}", name),
            (Some(name), Some(n)) => write!(f, "{}.{}", name, n),
        }
    }
}

/// The value of a feature set by an action
#[derive(Debug, Clone)]
pub enum FeatureTemplate {
    Value(FeatureValue),
    /// The text of a span of the match
    Text(SpanRef),
    /// A feature of an annotation bound to a name (binding name, feature key)
    Feature(String, String),
}

impl FeatureTemplate {
    /// Resolves the value, `Ok(None)` if the feature should not be set
    fn resolve(
        &self,
        result: &MatchResult,
        doc: &Document,
        config: &Config,
    ) -> Result<Option<FeatureValue>, PampacError> {
        match self {
            Self::Value(value) => Ok(Some(value.clone())),
            Self::Text(spanref) => match spanref.resolve(result)? {
                Some(span) => Ok(Some(doc.text_of(&span)?.into())),
                None => {
                    debug(config, || {
                        format!("FeatureTemplate: group {} did not participate", spanref)
                    });
                    Ok(None)
                }
            },
            Self::Feature(name, key) => {
                let annotation = bound_annotation(result, name)?;
                let value = annotation.feature(key);
                if value.is_none() {
                    debug(config, || {
                        format!("FeatureTemplate: {} has no feature {:?}", annotation, key)
                    });
                }
                Ok(value)
            }
        }
    }
}

impl From<FeatureValue> for FeatureTemplate {
    fn from(value: FeatureValue) -> Self {
        Self::Value(value)
    }
}

impl From<SpanRef> for FeatureTemplate {
    fn from(spanref: SpanRef) -> Self {
        Self::Text(spanref)
    }
}

fn bound_annotation<'a>(
    result: &'a MatchResult,
    name: &str,
) -> Result<&'a Arc<Annotation>, PampacError> {
    result
        .binding(name)
        .ok_or_else(|| PampacError::UndefinedReference(name.to_string(), "no such binding"))?
        .annotation()
        .ok_or_else(|| {
            PampacError::UndefinedReference(name.to_string(), "binding is not an annotation")
        })
}

fn resolve_features(
    templates: &[(String, FeatureTemplate)],
    result: &MatchResult,
    doc: &Document,
    config: &Config,
) -> Result<Features, PampacError> {
    let mut features = Features::new();
    for (key, template) in templates {
        if let Some(value) = template.resolve(result, doc, config)? {
            features.insert(key.clone(), value);
        }
    }
    Ok(features)
}

/// A user-supplied action, it may change the document freely
#[derive(Clone)]
pub struct ActionCallback(
    pub(crate) Arc<dyn Fn(&MatchResult, &mut Document) -> Result<(), PampacError> + Send + Sync>,
);

impl fmt::Debug for ActionCallback {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ActionCallback")
    }
}

/// What a rule does when it fires
#[derive(Debug, Clone)]
pub enum Action {
    /// Adds an annotation over a span of the match, to the matcher's output set unless `annset` is given
    AddAnn {
        annotype: String,
        span: SpanRef,
        features: Vec<(String, FeatureTemplate)>,
        annset: Option<String>,
    },
    /// Removes the annotation bound to the name, from the matcher's input set unless `annset` is given
    RemoveAnn {
        binding: String,
        annset: Option<String>,
    },
    /// Merges features into the annotation bound to the name, or replaces them entirely
    UpdateAnnFeatures {
        binding: String,
        features: Vec<(String, FeatureTemplate)>,
        replace: bool,
    },
    Callback(ActionCallback),
}

impl Action {
    pub fn add_ann(annotype: &str, span: SpanRef) -> Self {
        Self::AddAnn {
            annotype: annotype.to_string(),
            span,
            features: Vec::new(),
            annset: None,
        }
    }

    pub fn remove_ann(binding: &str) -> Self {
        Self::RemoveAnn {
            binding: binding.to_string(),
            annset: None,
        }
    }

    pub fn update_features(binding: &str) -> Self {
        Self::UpdateAnnFeatures {
            binding: binding.to_string(),
            features: Vec::new(),
            replace: false,
        }
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&MatchResult, &mut Document) -> Result<(), PampacError> + Send + Sync + 'static,
    {
        Self::Callback(ActionCallback(Arc::new(f)))
    }

    /// Adds a feature template, for `AddAnn` and `UpdateAnnFeatures`
    pub fn with_feature(mut self, key: &str, template: impl Into<FeatureTemplate>) -> Self {
        match &mut self {
            Self::AddAnn { features, .. } | Self::UpdateAnnFeatures { features, .. } => {
                features.push((key.to_string(), template.into()))
            }
            _ => {}
        }
        self
    }

    /// Sets the annotation set `AddAnn` adds to or `RemoveAnn` removes from
    pub fn in_annset(mut self, name: &str) -> Self {
        match &mut self {
            Self::AddAnn { annset, .. } | Self::RemoveAnn { annset, .. } => {
                *annset = Some(name.to_string())
            }
            _ => {}
        }
        self
    }

    /// Makes `UpdateAnnFeatures` replace the feature map instead of merging into it
    pub fn replacing(mut self) -> Self {
        if let Self::UpdateAnnFeatures { replace, .. } = &mut self {
            *replace = true;
        }
        self
    }

    /// Resolves the action for a match into a concrete change, without applying it.
    /// `Ok(None)` if there is nothing to do (e.g. the span is a non-participating capture group).
    pub(crate) fn resolve(
        &self,
        result: &MatchResult,
        doc: &Document,
        inset: &str,
        outset: &str,
        config: &Config,
    ) -> Result<Option<Mutation>, PampacError> {
        match self {
            Self::AddAnn {
                annotype,
                span,
                features,
                annset,
            } => {
                let span = match span.resolve(result)? {
                    Some(span) => span,
                    None => {
                        debug(config, || {
                            format!("AddAnn {}: group {} did not participate, skipped", annotype, span)
                        });
                        return Ok(None);
                    }
                };
                Ok(Some(Mutation::Add {
                    annset: annset.clone().unwrap_or_else(|| outset.to_string()),
                    span,
                    annotype: annotype.clone(),
                    features: resolve_features(features, result, doc, config)?,
                }))
            }
            Self::RemoveAnn { binding, annset } => Ok(Some(Mutation::Remove {
                annset: annset.clone().unwrap_or_else(|| inset.to_string()),
                handle: bound_annotation(result, binding)?.handle(),
            })),
            Self::UpdateAnnFeatures {
                binding,
                features,
                replace,
            } => Ok(Some(Mutation::Update {
                annotation: bound_annotation(result, binding)?.clone(),
                features: resolve_features(features, result, doc, config)?,
                replace: *replace,
            })),
            Self::Callback(callback) => Ok(Some(Mutation::Callback {
                callback: callback.clone(),
                result: result.clone(),
            })),
        }
    }
}

/// A resolved action
pub(crate) enum Mutation {
    Add {
        annset: String,
        span: Span,
        annotype: String,
        features: Features,
    },
    Remove {
        annset: String,
        handle: AnnotationHandle,
    },
    Update {
        annotation: Arc<Annotation>,
        features: Features,
        replace: bool,
    },
    Callback {
        callback: ActionCallback,
        result: MatchResult,
    },
}

/// What applying a [`Mutation`] changed in the document
pub(crate) enum Changed {
    Added(String, Arc<Annotation>),
    Removed(String, Arc<Annotation>),
    /// Nothing that annotation sequences depend on: features are changed in place
    Unchanged,
    /// A callback ran, it may have changed anything
    Unknown,
}

impl Mutation {
    pub(crate) fn apply(self, doc: &mut Document, config: &Config) -> Result<Changed, PampacError> {
        match self {
            Self::Add {
                annset,
                span,
                annotype,
                features,
            } => {
                let annotation = doc.annset_mut(&annset).add(
                    span.start(),
                    span.end(),
                    annotype,
                    Some(features),
                )?;
                Ok(Changed::Added(annset, annotation))
            }
            Self::Remove { annset, handle } => {
                let set = doc.annset_mut(&annset);
                if set.contains(handle) {
                    let annotation = set.remove(handle)?;
                    Ok(Changed::Removed(annset, annotation))
                } else {
                    debug(config, || {
                        format!("RemoveAnn: annotation {} already gone from {:?}", handle, annset)
                    });
                    Ok(Changed::Unchanged)
                }
            }
            Self::Update {
                annotation,
                features,
                replace,
            } => {
                if replace {
                    annotation.replace_features(features);
                } else {
                    annotation.update_features(features);
                }
                Ok(Changed::Unchanged)
            }
            Self::Callback { callback, result } => {
                (callback.0)(&result, doc)?;
                Ok(Changed::Unknown)
            }
        }
    }
}
