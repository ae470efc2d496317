/*
    PAMPAC: stand-off annotation sets and combinator pattern matching

        Licensed under the GNU General Public License v3
*/

use regex::Regex;
use smallvec::SmallVec;
use std::iter;
use std::sync::Arc;

use crate::annotation::Annotation;
use crate::error::PampacError;
use crate::featurevalue::FeatureConstraint;
use crate::span::{HasSpan, Span};

use super::location::{Context, Location};
use super::parser::Results;
use super::result::{Binding, MatchResult};

/// Decides which of the annotations starting at the anchor offset `AnnAt` yields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchType {
    /// All of them, in sequence order
    #[default]
    All,
    /// Only the first in sequence order
    First,
    /// All that have the maximal length
    Longest,
    /// All that have the minimal length
    Shortest,
}

/// Where `AnnAt` looks for annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    /// At the start offset of the next annotation in the sequence
    #[default]
    NextAnnotation,
    /// At the current text offset
    TextOffset,
}

/// Constraints shared by `Ann` and `AnnAt`
#[derive(Debug, Clone, Default)]
pub struct AnnSpec {
    pub(crate) annotype: Option<String>,
    pub(crate) constraints: Vec<FeatureConstraint>,
}

impl AnnSpec {
    pub fn new(annotype: Option<&str>, constraints: Vec<FeatureConstraint>) -> Self {
        Self {
            annotype: annotype.map(|s| s.to_string()),
            constraints,
        }
    }

    pub fn test(&self, annotation: &Annotation) -> bool {
        annotation.test(self.annotype.as_deref(), &self.constraints)
    }
}

/// The result of matching an annotation at an index of the sequence
fn ann_result(ctx: &Context, index: usize, annotation: &Arc<Annotation>) -> MatchResult {
    let end = annotation.end();
    MatchResult::new(
        annotation.span(),
        Location::new(end, ctx.next_ann_index_from(index + 1, end)),
        Binding::Annotation(annotation.clone()),
    )
}

/// Matches the next annotation of the sequence
pub(crate) fn parse_ann<'c>(spec: &'c AnnSpec, ctx: &'c Context<'c>, location: Location) -> Results<'c> {
    match ctx.anns.get(location.ann) {
        Some(annotation) if spec.test(annotation) => {
            Box::new(iter::once(Ok(ann_result(ctx, location.ann, annotation))))
        }
        _ => Box::new(iter::empty()),
    }
}

/// Matches annotations starting exactly at the anchor offset
pub(crate) fn parse_ann_at<'c>(
    spec: &'c AnnSpec,
    matchtype: MatchType,
    anchor: Anchor,
    ctx: &'c Context<'c>,
    location: Location,
) -> Results<'c> {
    let (offset, from) = match anchor {
        Anchor::NextAnnotation => match ctx.anns.get(location.ann) {
            Some(annotation) => (annotation.start(), location.ann),
            None => return Box::new(iter::empty()),
        },
        Anchor::TextOffset => (
            location.text,
            ctx.next_ann_index_from(location.ann, location.text),
        ),
    };
    let mut candidates: Vec<(usize, &Arc<Annotation>)> = ctx.anns[from.min(ctx.anns.len())..]
        .iter()
        .enumerate()
        .take_while(|(_, a)| a.start() == offset)
        .filter(|(_, a)| spec.test(a))
        .map(|(i, a)| (from + i, a))
        .collect();
    match matchtype {
        MatchType::All => {}
        MatchType::First => candidates.truncate(1),
        MatchType::Longest => {
            if let Some(max) = candidates.iter().map(|(_, a)| a.length()).max() {
                candidates.retain(|(_, a)| a.length() == max);
            }
        }
        MatchType::Shortest => {
            if let Some(min) = candidates.iter().map(|(_, a)| a.length()).min() {
                candidates.retain(|(_, a)| a.length() == min);
            }
        }
    }
    let results: Vec<_> = candidates
        .into_iter()
        .map(|(i, a)| Ok(ann_result(ctx, i, a)))
        .collect();
    Box::new(results.into_iter())
}

/// What a `Text` parser matches
#[derive(Debug, Clone)]
pub enum TextMatcher {
    Literal(String),
    /// A regular expression, compiled anchored at the start; the original pattern is kept for display
    Regex { regex: Regex, pattern: String },
}

impl TextMatcher {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    /// Compiles a pattern that will only match at the current text offset
    pub fn regex(pattern: &str) -> Result<Self, PampacError> {
        let regex = Regex::new(&format!("^(?:{})", pattern))
            .map_err(|e| PampacError::RegexError(e, "Compiling Text pattern"))?;
        Ok(Self::Regex {
            regex,
            pattern: pattern.to_string(),
        })
    }
}

/// Converts a byte offset into the text to a character offset
fn char_offset(ctx: &Context, byteoffset: usize) -> Result<usize, PampacError> {
    ctx.doc.char_offset(byteoffset).ok_or(PampacError::InvalidSpan(
        byteoffset,
        byteoffset,
        ctx.doc.textlen(),
        "byte offset of text match is not on a character boundary",
    ))
}

fn text_result(ctx: &Context, location: Location, span: Span) -> MatchResult {
    MatchResult::new(
        span,
        Location::new(span.end(), ctx.next_ann_index_from(location.ann, span.end())),
        Binding::Text {
            span,
            groups: SmallVec::from_elem(Some(span), 1),
        },
    )
}

/// Matches literal text or a regular expression at the current text offset
pub(crate) fn parse_text<'c>(
    matcher: &'c TextMatcher,
    ctx: &'c Context<'c>,
    location: Location,
) -> Results<'c> {
    let byteoffset = match ctx.doc.byte_offset(location.text) {
        Some(byteoffset) => byteoffset,
        None => return Box::new(iter::empty()),
    };
    let haystack = &ctx.doc.text()[byteoffset..];
    match matcher {
        TextMatcher::Literal(literal) => {
            if haystack.starts_with(literal.as_str()) {
                let end = location.text + literal.chars().count();
                let span = Span::new_unchecked(location.text, end);
                Box::new(iter::once(Ok(text_result(ctx, location, span))))
            } else {
                Box::new(iter::empty())
            }
        }
        TextMatcher::Regex { regex, .. } => match regex.captures(haystack) {
            None => Box::new(iter::empty()),
            Some(captures) => Box::new(iter::once(regex_result(
                ctx, location, byteoffset, regex, &captures,
            ))),
        },
    }
}

fn regex_result(
    ctx: &Context,
    location: Location,
    byteoffset: usize,
    regex: &Regex,
    captures: &regex::Captures,
) -> Result<MatchResult, PampacError> {
    let mut groups: SmallVec<[Option<Span>; 4]> = SmallVec::with_capacity(captures.len());
    for group in captures.iter() {
        groups.push(match group {
            Some(m) => Some(Span::new_unchecked(
                char_offset(ctx, byteoffset + m.start())?,
                char_offset(ctx, byteoffset + m.end())?,
            )),
            None => None,
        });
    }
    // group 0 always participates
    let span = groups
        .first()
        .copied()
        .flatten()
        .unwrap_or_else(|| Span::point(location.text));
    let mut result = MatchResult::new(
        span,
        Location::new(span.end(), ctx.next_ann_index_from(location.ann, span.end())),
        Binding::Text {
            span,
            groups: groups.clone(),
        },
    );
    for (i, name) in regex.capture_names().enumerate() {
        if let (Some(name), Some(Some(groupspan))) = (name, groups.get(i)) {
            result.bindings.insert(name, Binding::Span(*groupspan))?;
        }
    }
    Ok(result)
}
