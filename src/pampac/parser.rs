/*
    PAMPAC: stand-off annotation sets and combinator pattern matching

        Licensed under the GNU General Public License v3
*/

use std::iter;

use crate::document::Document;
use crate::error::{Limit, PampacError};
use crate::featurevalue::{FeatureConstraint, FeatureOperator};
use crate::span::SpanRelation;
use crate::types::debug;

use super::location::{Context, Location};
use super::modifiers::*;
use super::primitives::*;
use super::result::MatchResult;

/// The lazily produced results of a parser at one location. Results come in a fixed order
/// (declaration order, greedy-first); an `Err` item is a structural error or a violated limit and
/// ends the evaluation.
pub type Results<'c> = Box<dyn Iterator<Item = Result<MatchResult, PampacError>> + 'c>;

/// A parser matches annotations and text at a [`Location`], producing zero or more
/// [`MatchResult`]s with full backtracking. Parsers are plain values: they are composed with the
/// constructors and modifier methods below and evaluated with [`Parser::parse()`] or through a
/// [`crate::Rule`]. Parsers never change the document.
///
/// ```
/// use pampac::*;
/// let date = Parser::seq(vec![
///     Parser::ann("Number").bind("day"),
///     Parser::ann("Month").bind("month"),
///     Parser::ann("Number").bind("year"),
/// ]);
/// ```
#[derive(Debug, Clone)]
pub enum Parser {
    /// The next annotation in the sequence, if it satisfies the constraints
    Ann(AnnSpec),
    /// Annotations starting exactly at the anchor offset
    AnnAt {
        spec: AnnSpec,
        matchtype: MatchType,
        anchor: Anchor,
    },
    /// Literal text or a regular expression at the current text offset
    Text(TextMatcher),
    /// All parsers match at the same location
    And(Vec<Parser>),
    /// The results of the first alternative that matches, or of all alternatives
    Or { parsers: Vec<Parser>, all: bool },
    /// Sequential composition
    Seq(Vec<Parser>),
    /// Repetition, greedy
    N {
        parser: Box<Parser>,
        min: usize,
        max: Option<usize>,
        until: Option<Box<Parser>>,
    },
    /// The first position from the current location onward where the parser matches
    Find { parser: Box<Parser>, by_anns: bool },
    /// Results of `parser` that are (not, if `negate`) followed by a match of `lookahead`
    Lookahead {
        parser: Box<Parser>,
        lookahead: Box<Parser>,
        negate: bool,
    },
    Filter {
        parser: Box<Parser>,
        predicate: Predicate,
    },
    Call {
        parser: Box<Parser>,
        on_success: Option<SuccessCallback>,
        on_failure: Option<FailureCallback>,
    },
    /// Results whose subject stands (or does not stand, if `negate`) in the relation to the target
    Related {
        parser: Box<Parser>,
        relation: SpanRelation,
        target: RelationTarget,
        subject: Option<String>,
        negate: bool,
    },
    /// Binds the matched item to a name
    Bind { parser: Box<Parser>, name: String },
}

impl Parser {
    /// Matches the next annotation if it has the given type
    pub fn ann(annotype: &str) -> Self {
        Self::Ann(AnnSpec::new(Some(annotype), Vec::new()))
    }

    /// Matches the next annotation, whatever its type
    pub fn any_ann() -> Self {
        Self::Ann(AnnSpec::default())
    }

    pub fn ann_with(annotype: Option<&str>, constraints: Vec<FeatureConstraint>) -> Self {
        Self::Ann(AnnSpec::new(annotype, constraints))
    }

    /// Matches all annotations of the given type starting where the next annotation starts
    pub fn ann_at(annotype: &str) -> Self {
        Self::AnnAt {
            spec: AnnSpec::new(Some(annotype), Vec::new()),
            matchtype: MatchType::All,
            anchor: Anchor::NextAnnotation,
        }
    }

    pub fn ann_at_with(
        annotype: Option<&str>,
        constraints: Vec<FeatureConstraint>,
        matchtype: MatchType,
        anchor: Anchor,
    ) -> Self {
        Self::AnnAt {
            spec: AnnSpec::new(annotype, constraints),
            matchtype,
            anchor,
        }
    }

    /// Matches the literal text at the current offset
    pub fn text(literal: &str) -> Self {
        Self::Text(TextMatcher::literal(literal))
    }

    /// Matches a regular expression at the current offset. Capture groups are available through
    /// the bound item, named groups are bound automatically under their names.
    pub fn regex(pattern: &str) -> Result<Self, PampacError> {
        Ok(Self::Text(TextMatcher::regex(pattern)?))
    }

    pub fn and(parsers: Vec<Parser>) -> Self {
        Self::And(parsers)
    }

    /// The results of the first alternative that produces any
    pub fn or(parsers: Vec<Parser>) -> Self {
        Self::Or {
            parsers,
            all: false,
        }
    }

    /// The results of all alternatives, in order
    pub fn or_all(parsers: Vec<Parser>) -> Self {
        Self::Or {
            parsers,
            all: true,
        }
    }

    pub fn seq(parsers: Vec<Parser>) -> Self {
        Self::Seq(parsers)
    }

    /// Repeats `parser` at least `min` and at most `max` times. Without a maximum, the configured
    /// `max_repeat` applies and exceeding it is an error.
    pub fn n(parser: Parser, min: usize, max: Option<usize>) -> Self {
        Self::N {
            parser: Box::new(parser),
            min,
            max,
            until: None,
        }
    }

    /// Like [`Self::n()`], but once `min` is reached, repetition stops where `until` matches (without consuming it)
    pub fn n_until(parser: Parser, min: usize, max: Option<usize>, until: Parser) -> Self {
        Self::N {
            parser: Box::new(parser),
            min,
            max,
            until: Some(Box::new(until)),
        }
    }

    /// Searches forward by text offset
    pub fn find(parser: Parser) -> Self {
        Self::Find {
            parser: Box::new(parser),
            by_anns: false,
        }
    }

    /// Searches forward by annotation
    pub fn find_by_anns(parser: Parser) -> Self {
        Self::Find {
            parser: Box::new(parser),
            by_anns: true,
        }
    }

    /// Repeats this parser, see [`Self::n()`]
    pub fn repeat(self, min: usize, max: Option<usize>) -> Self {
        Self::n(self, min, max)
    }

    /// Adds a feature constraint. Only `Ann` and `AnnAt` carry feature constraints, other parsers are returned unchanged.
    pub fn with_feature(mut self, key: &str, operator: FeatureOperator) -> Self {
        match &mut self {
            Self::Ann(spec) | Self::AnnAt { spec, .. } => {
                spec.constraints.push((key.to_string(), operator))
            }
            _ => {}
        }
        self
    }

    /// Binds the matched item under `name`: the annotation for `Ann`/`AnnAt`, the text with its
    /// capture groups for `Text`, the overall span for composite parsers.
    pub fn bind(self, name: &str) -> Self {
        Self::Bind {
            parser: Box::new(self),
            name: name.to_string(),
        }
    }

    /// Keeps only the results for which the predicate holds (the `where` modifier)
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&MatchResult, &Document) -> bool + Send + Sync + 'static,
    {
        Self::Filter {
            parser: Box::new(self),
            predicate: Predicate::new(predicate),
        }
    }

    /// Keeps the results after which `lookahead` matches, without consuming it
    pub fn followed_by(self, lookahead: Parser) -> Self {
        Self::Lookahead {
            parser: Box::new(self),
            lookahead: Box::new(lookahead),
            negate: false,
        }
    }

    /// Keeps the results after which `lookahead` does not match
    pub fn not_followed_by(self, lookahead: Parser) -> Self {
        Self::Lookahead {
            parser: Box::new(self),
            lookahead: Box::new(lookahead),
            negate: true,
        }
    }

    /// Invokes the callback for every result
    pub fn on_success<F>(self, callback: F) -> Self
    where
        F: Fn(&MatchResult, &Document) -> Result<(), PampacError> + Send + Sync + 'static,
    {
        match self {
            Self::Call {
                parser, on_failure, ..
            } => Self::Call {
                parser,
                on_success: Some(SuccessCallback::new(callback)),
                on_failure,
            },
            parser => Self::Call {
                parser: Box::new(parser),
                on_success: Some(SuccessCallback::new(callback)),
                on_failure: None,
            },
        }
    }

    /// Invokes the callback when there is no result at a location
    pub fn on_failure<F>(self, callback: F) -> Self
    where
        F: Fn(&Location, &Document) -> Result<(), PampacError> + Send + Sync + 'static,
    {
        match self {
            Self::Call {
                parser, on_success, ..
            } => Self::Call {
                parser,
                on_success,
                on_failure: Some(FailureCallback::new(callback)),
            },
            parser => Self::Call {
                parser: Box::new(parser),
                on_success: None,
                on_failure: Some(FailureCallback::new(callback)),
            },
        }
    }

    /// Keeps the results whose span stands in the relation to the target
    pub fn related(self, relation: SpanRelation, target: RelationTarget) -> Self {
        self.related_as(None, relation, target, false)
    }

    /// Keeps the results whose span does not stand in the relation to the target
    pub fn not_related(self, relation: SpanRelation, target: RelationTarget) -> Self {
        self.related_as(None, relation, target, true)
    }

    /// The general relational modifier: tests the item bound to `subject` (or the whole match) against the target
    pub fn related_as(
        self,
        subject: Option<&str>,
        relation: SpanRelation,
        target: RelationTarget,
        negate: bool,
    ) -> Self {
        Self::Related {
            parser: Box::new(self),
            relation,
            target,
            subject: subject.map(|s| s.to_string()),
            negate,
        }
    }

    pub fn within(self, target: RelationTarget) -> Self {
        self.related(SpanRelation::Within, target)
    }

    pub fn not_within(self, target: RelationTarget) -> Self {
        self.not_related(SpanRelation::Within, target)
    }

    pub fn overlapping(self, target: RelationTarget) -> Self {
        self.related(SpanRelation::Overlapping, target)
    }

    pub fn not_overlapping(self, target: RelationTarget) -> Self {
        self.not_related(SpanRelation::Overlapping, target)
    }

    pub fn covering(self, target: RelationTarget) -> Self {
        self.related(SpanRelation::Covering, target)
    }

    pub fn not_covering(self, target: RelationTarget) -> Self {
        self.not_related(SpanRelation::Covering, target)
    }

    pub fn coextensive(self, target: RelationTarget) -> Self {
        self.related(SpanRelation::Coextensive, target)
    }

    pub fn not_coextensive(self, target: RelationTarget) -> Self {
        self.not_related(SpanRelation::Coextensive, target)
    }

    pub fn before(self, target: RelationTarget, immediately: bool) -> Self {
        self.related(SpanRelation::Before { immediately }, target)
    }

    pub fn not_before(self, target: RelationTarget, immediately: bool) -> Self {
        self.not_related(SpanRelation::Before { immediately }, target)
    }

    pub fn after(self, target: RelationTarget, immediately: bool) -> Self {
        self.related(SpanRelation::After { immediately }, target)
    }

    pub fn not_after(self, target: RelationTarget, immediately: bool) -> Self {
        self.not_related(SpanRelation::After { immediately }, target)
    }

    /// Keeps the results that start where the target starts
    pub fn at(self, target: RelationTarget) -> Self {
        self.related(SpanRelation::StartsAt, target)
    }

    pub fn not_at(self, target: RelationTarget) -> Self {
        self.not_related(SpanRelation::StartsAt, target)
    }

    /// Evaluates the parser at a location and returns the lazy result sequence.
    /// Every result counts towards the configured `max_results`, see [`Self::parse_all()`] for a fresh count.
    pub fn parse<'c>(&'c self, ctx: &'c Context<'c>, location: Location) -> Results<'c> {
        let results: Results<'c> = match self {
            Self::Ann(spec) => parse_ann(spec, ctx, location),
            Self::AnnAt {
                spec,
                matchtype,
                anchor,
            } => parse_ann_at(spec, *matchtype, *anchor, ctx, location),
            Self::Text(matcher) => parse_text(matcher, ctx, location),
            Self::And(parsers) => parse_and(parsers, ctx, location, None),
            Self::Or { parsers, all } => Box::new(OrIter {
                parsers: parsers.iter(),
                ctx,
                location,
                all: *all,
                current: None,
                committed: false,
            }),
            Self::Seq(parsers) => parse_seq(parsers, ctx, location, None),
            Self::N {
                parser,
                min,
                max,
                until,
            } => parse_n(
                Repetition {
                    parser,
                    min: *min,
                    max: *max,
                    until: until.as_deref(),
                },
                ctx,
                location,
                0,
                None,
            ),
            Self::Find { parser, by_anns } => Box::new(FindIter {
                parser,
                by_anns: *by_anns,
                ctx,
                next: Some(location),
                tried: 0,
                current: None,
            }),
            Self::Lookahead {
                parser,
                lookahead,
                negate,
            } => {
                let negate = *negate;
                Box::new(parser.parse(ctx, location).filter_map(move |r| match r {
                    Err(e) => Some(Err(e)),
                    Ok(m) => match lookahead.parse(ctx, m.location).next() {
                        Some(Err(e)) => Some(Err(e)),
                        Some(Ok(_)) if !negate => Some(Ok(m)),
                        None if negate => Some(Ok(m)),
                        _ => None,
                    },
                }))
            }
            Self::Filter { parser, predicate } => {
                Box::new(parser.parse(ctx, location).filter(move |r| match r {
                    Ok(m) => (predicate.0)(m, ctx.doc),
                    Err(_) => true,
                }))
            }
            Self::Call {
                parser,
                on_success,
                on_failure,
            } => Box::new(CallIter {
                inner: parser.parse(ctx, location),
                on_success: on_success.as_ref(),
                on_failure: on_failure.as_ref(),
                ctx,
                location,
                produced: false,
                done: false,
            }),
            Self::Related {
                parser,
                relation,
                target,
                subject,
                negate,
            } => {
                let (relation, negate) = (*relation, *negate);
                Box::new(parser.parse(ctx, location).filter_map(move |r| match r {
                    Err(e) => Some(Err(e)),
                    Ok(m) => {
                        match test_relation(ctx, &m, relation, target, subject.as_deref()) {
                            Err(e) => Some(Err(e)),
                            Ok(holds) if holds != negate => Some(Ok(m)),
                            Ok(_) => None,
                        }
                    }
                }))
            }
            Self::Bind { parser, name } => {
                Box::new(parser.parse(ctx, location).map(move |r| {
                    r.and_then(|mut m| {
                        let item = m.item.clone();
                        m.bindings.insert(name, item)?;
                        Ok(m)
                    })
                }))
            }
        };
        Box::new(results.map(move |r| r.and_then(|m| ctx.produce().map(|()| m))))
    }

    /// Evaluates the parser at a location and collects all results, or the first error
    pub fn parse_all(
        &self,
        ctx: &Context,
        location: Location,
    ) -> Result<Vec<MatchResult>, PampacError> {
        ctx.reset();
        self.parse(ctx, location).collect()
    }

    /// Evaluates the parser at a location and returns only the first result, if any
    pub fn parse_first(
        &self,
        ctx: &Context,
        location: Location,
    ) -> Result<Option<MatchResult>, PampacError> {
        ctx.reset();
        self.parse(ctx, location).next().transpose()
    }
}

/// Turns the first part of a composition into the composite it starts
fn start_composite(mut m: MatchResult) -> MatchResult {
    m.item = super::result::Binding::Span(m.span);
    m
}

fn parse_seq<'c>(
    parsers: &'c [Parser],
    ctx: &'c Context<'c>,
    location: Location,
    acc: Option<MatchResult>,
) -> Results<'c> {
    match parsers.split_first() {
        None => Box::new(iter::once(Ok(
            acc.unwrap_or_else(|| MatchResult::empty(location))
        ))),
        Some((first, rest)) => {
            Box::new(first.parse(ctx, location).flat_map(move |r| -> Results<'c> {
                let combined = match (r, &acc) {
                    (Err(e), _) => Err(e),
                    (Ok(m), None) => Ok(start_composite(m)),
                    (Ok(m), Some(acc)) => acc.clone().then(m),
                };
                match combined {
                    Err(e) => Box::new(iter::once(Err(e))),
                    Ok(combined) => parse_seq(rest, ctx, combined.location, Some(combined)),
                }
            }))
        }
    }
}

fn parse_and<'c>(
    parsers: &'c [Parser],
    ctx: &'c Context<'c>,
    location: Location,
    acc: Option<MatchResult>,
) -> Results<'c> {
    match parsers.split_first() {
        None => Box::new(iter::once(Ok(
            acc.unwrap_or_else(|| MatchResult::empty(location))
        ))),
        Some((first, rest)) => {
            Box::new(first.parse(ctx, location).flat_map(move |r| -> Results<'c> {
                let combined = match (r, &acc) {
                    (Err(e), _) => Err(e),
                    (Ok(m), None) => Ok(start_composite(m)),
                    (Ok(m), Some(acc)) => acc.clone().and(m),
                };
                match combined {
                    Err(e) => Box::new(iter::once(Err(e))),
                    // every part starts at the same location
                    Ok(combined) => parse_and(rest, ctx, location, Some(combined)),
                }
            }))
        }
    }
}

#[derive(Clone, Copy)]
struct Repetition<'c> {
    parser: &'c Parser,
    min: usize,
    max: Option<usize>,
    until: Option<&'c Parser>,
}

/// Greedy repetition: the results with more repetitions come first, then the result that stops here
fn parse_n<'c>(
    rep: Repetition<'c>,
    ctx: &'c Context<'c>,
    location: Location,
    count: usize,
    acc: Option<MatchResult>,
) -> Results<'c> {
    if count >= rep.min {
        if let Some(until) = rep.until {
            match until.parse(ctx, location).next() {
                Some(Ok(_)) => {
                    return Box::new(iter::once(Ok(
                        acc.unwrap_or_else(|| MatchResult::empty(location))
                    )))
                }
                Some(Err(e)) => return Box::new(iter::once(Err(e))),
                None => {}
            }
        }
    }
    let this = if count >= rep.min {
        Some(
            acc.clone()
                .unwrap_or_else(|| MatchResult::empty(location)),
        )
    } else {
        None
    };
    let cap = rep.max.unwrap_or_else(|| ctx.config.max_repeat());
    let more: Results<'c> = if count < cap {
        Box::new(
            rep.parser
                .parse(ctx, location)
                .flat_map(move |r| -> Results<'c> {
                    match r {
                        Err(e) => Box::new(iter::once(Err(e))),
                        // a repetition has to make progress
                        Ok(m) if m.location == location => Box::new(iter::empty()),
                        Ok(m) => {
                            let next = match &acc {
                                None => start_composite(m),
                                Some(acc) => acc.clone().then_repeated(m),
                            };
                            parse_n(rep, ctx, next.location, count + 1, Some(next))
                        }
                    }
                }),
        )
    } else if rep.max.is_none() {
        let progress = rep.parser.parse(ctx, location).find(|r| match r {
            Ok(m) => m.location != location,
            Err(_) => true,
        });
        match progress {
            Some(Err(e)) => Box::new(iter::once(Err(e))),
            Some(Ok(_)) => {
                debug(ctx.config, || {
                    format!("N: repetition limit {} reached at {}", cap, location)
                });
                Box::new(iter::once(Err(PampacError::LimitExceeded(
                    Limit::Repeat,
                    cap,
                    "N without maximum repeats further",
                ))))
            }
            None => Box::new(iter::empty()),
        }
    } else {
        Box::new(iter::empty())
    };
    Box::new(more.chain(this.into_iter().map(Ok)))
}

struct OrIter<'c> {
    parsers: std::slice::Iter<'c, Parser>,
    ctx: &'c Context<'c>,
    location: Location,
    all: bool,
    current: Option<Results<'c>>,
    /// Set once any alternative produced something
    committed: bool,
}

impl<'c> Iterator for OrIter<'c> {
    type Item = Result<MatchResult, PampacError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(current) = self.current.as_mut() {
                if let Some(result) = current.next() {
                    self.committed = true;
                    return Some(result);
                }
                self.current = None;
                if self.committed && !self.all {
                    return None;
                }
            }
            let parser = self.parsers.next()?;
            self.current = Some(parser.parse(self.ctx, self.location));
        }
    }
}

struct FindIter<'c> {
    parser: &'c Parser,
    by_anns: bool,
    ctx: &'c Context<'c>,
    /// The next position to try, `None` when the search is over
    next: Option<Location>,
    tried: usize,
    /// The results at the position where the parser matched
    current: Option<Results<'c>>,
}

impl<'c> FindIter<'c> {
    fn advance(&self, location: Location) -> Option<Location> {
        if self.by_anns {
            self.ctx.location_of_ann(location.ann + 1)
        } else if location.text < self.ctx.doc.textlen() {
            let text = location.text + 1;
            Some(Location::new(
                text,
                self.ctx.next_ann_index_from(location.ann, text),
            ))
        } else {
            None
        }
    }
}

impl<'c> Iterator for FindIter<'c> {
    type Item = Result<MatchResult, PampacError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(current) = self.current.as_mut() {
            return current.next();
        }
        loop {
            let location = self.next?;
            self.tried += 1;
            if let Some(window) = self.ctx.config.find_window() {
                if self.tried > window {
                    self.next = None;
                    debug(self.ctx.config, || {
                        format!("Find: window of {} positions exhausted at {}", window, location)
                    });
                    return Some(Err(PampacError::LimitExceeded(
                        Limit::FindWindow,
                        window,
                        "Find tried too many positions",
                    )));
                }
            }
            self.next = self.advance(location);
            let mut results = self.parser.parse(self.ctx, location);
            if let Some(first) = results.next() {
                self.next = None;
                self.current = Some(results);
                return Some(first);
            }
        }
    }
}

struct CallIter<'c> {
    inner: Results<'c>,
    on_success: Option<&'c SuccessCallback>,
    on_failure: Option<&'c FailureCallback>,
    ctx: &'c Context<'c>,
    location: Location,
    produced: bool,
    done: bool,
}

impl<'c> Iterator for CallIter<'c> {
    type Item = Result<MatchResult, PampacError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.inner.next() {
            Some(Ok(m)) => {
                self.produced = true;
                if let Some(callback) = self.on_success {
                    if let Err(e) = (callback.0)(&m, self.ctx.doc) {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
                Some(Ok(m))
            }
            Some(Err(e)) => {
                self.done = true;
                Some(Err(e))
            }
            None => {
                self.done = true;
                if !self.produced {
                    if let Some(callback) = self.on_failure {
                        if let Err(e) = (callback.0)(&self.location, self.ctx.doc) {
                            return Some(Err(e));
                        }
                    }
                }
                None
            }
        }
    }
}
