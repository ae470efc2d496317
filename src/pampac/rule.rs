/*
    PAMPAC: stand-off annotation sets and combinator pattern matching

        Licensed under the GNU General Public License v3
*/

use std::collections::HashSet;
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::annotation::{Annotation, AnnotationHandle};
use crate::annotationset::AnnotationSet;
use crate::config::{Configurable, Config};
use crate::document::Document;
use crate::error::PampacError;
use crate::span::{HasSpan, Span};
use crate::types::debug;

use super::action::{Action, Changed, Mutation};
use super::location::{Context, Location};
use super::parser::Parser;
use super::result::MatchResult;

/// A parser with the actions to carry out for its matches
#[derive(Debug, Clone)]
pub struct Rule {
    parser: Parser,
    actions: Vec<Action>,
}

impl Rule {
    pub fn new(parser: Parser, action: Action) -> Self {
        Self {
            parser,
            actions: vec![action],
        }
    }

    /// A rule that only reports its matches
    pub fn without_action(parser: Parser) -> Self {
        Self {
            parser,
            actions: Vec::new(),
        }
    }

    /// Adds a further action, actions are carried out in order
    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}

/// Which of the rules that matched at a location fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Select {
    /// Only the first matching rule in list order
    #[default]
    First,
    /// Every matching rule
    All,
    /// The matching rule with the longest match, the first one on ties
    Longest,
}

/// Where the scan continues after rules fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Skip {
    /// Past the end of the longest fired match
    #[default]
    Longest,
    /// One step forward, so overlapping matches are found too
    Next,
    /// Stop after the first location where rules fired
    Once,
}

/// How the scan steps through the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scan {
    /// Text offset by text offset
    #[default]
    Text,
    /// Annotation by annotation of the sequence under match
    Annotations,
}

/// A rule that fired, with the match it fired for
#[derive(Debug, Clone)]
pub struct FiredMatch {
    pub rule: usize,
    pub result: MatchResult,
}

/// The rule matcher: applies an ordered list of rules over a document, fires the actions of the selected
/// matches and advances the scan. Changes made by actions are visible to the matching that follows.
#[derive(Debug, Clone)]
pub struct Pampac {
    rules: Vec<Rule>,
    select: Select,
    skip: Skip,
    scan: Scan,
    /// The annotation set `AddAnn` adds to by default
    outset: String,
    config: Config,
}

/// Where the scan resumes after the matching context was rebuilt
#[derive(Debug, Clone, Copy)]
enum Resume {
    Offset(usize),
    /// The first annotation not ordered before this key
    Annotation(usize, AnnotationHandle),
}

enum Step {
    Done,
    Apply(Vec<Mutation>, Option<Resume>),
}

impl Pampac {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            select: Select::default(),
            skip: Skip::default(),
            scan: Scan::default(),
            outset: String::new(),
            config: Config::default(),
        }
    }

    pub fn with_select(mut self, select: Select) -> Self {
        self.select = select;
        self
    }

    pub fn with_skip(mut self, skip: Skip) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_scan(mut self, scan: Scan) -> Self {
        self.scan = scan;
        self
    }

    /// Sets the annotation set new annotations are added to (default: the default set `""`)
    pub fn with_outset(mut self, name: &str) -> Self {
        self.outset = name.to_string();
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Runs the rules over the whole document. `annset` is the input set; if `types` is given, only
    /// annotations of these types make up the sequence under match.
    pub fn run(
        &self,
        doc: &mut Document,
        annset: &str,
        types: Option<&[&str]>,
    ) -> Result<Vec<FiredMatch>, PampacError> {
        let end = doc.textlen();
        self.run_cancellable(doc, annset, types, 0, end, |_| true)
    }

    /// Runs the rules at scan positions in `[start, end)` only
    pub fn run_range(
        &self,
        doc: &mut Document,
        annset: &str,
        types: Option<&[&str]>,
        start: usize,
        end: usize,
    ) -> Result<Vec<FiredMatch>, PampacError> {
        self.run_cancellable(doc, annset, types, start, end, |_| true)
    }

    /// Runs the rules at scan positions in `[start, end)`, asking `proceed` before every position; the run
    /// stops (successfully) as soon as it returns false.
    pub fn run_cancellable<F>(
        &self,
        doc: &mut Document,
        annset: &str,
        types: Option<&[&str]>,
        start: usize,
        end: usize,
        mut proceed: F,
    ) -> Result<Vec<FiredMatch>, PampacError>
    where
        F: FnMut(&Location) -> bool,
    {
        if start > end || end > doc.textlen() {
            return Err(PampacError::InvalidSpan(
                start,
                end,
                doc.textlen(),
                "Pampac.run: invalid range",
            ));
        }
        debug(&self.config, || {
            format!(
                "Pampac.run: {} rules over set {:?}, range ({},{})",
                self.rules.len(),
                annset,
                start,
                end
            )
        });
        // the input set is created if it does not exist, so there is something to match over
        let mut sequence = Self::sequence_of(doc.annset_mut(annset), types);
        let mut fired: Vec<FiredMatch> = Vec::new();
        let mut seen: HashSet<(usize, Span)> = HashSet::new();
        let mut resume = Resume::Offset(start);
        loop {
            let step = {
                let ctx = Context::with_sequence(
                    doc,
                    doc.annset(annset)?,
                    &self.config,
                    std::mem::take(&mut sequence),
                );
                let step = self.scan(&ctx, annset, resume, end, &mut proceed, &mut fired, &mut seen)?;
                sequence = ctx.into_sequence();
                step
            };
            match step {
                Step::Done => break,
                Step::Apply(mutations, next) => {
                    let mut rebuild = false;
                    for mutation in mutations {
                        let changed = mutation.apply(doc, &self.config)?;
                        rebuild |= !track(&mut sequence, changed, annset, types);
                    }
                    if rebuild {
                        sequence = Self::sequence_of(doc.annset_mut(annset), types);
                    }
                    match next {
                        Some(next) => resume = next,
                        None => break,
                    }
                }
            }
        }
        Ok(fired)
    }

    /// The ordered annotation sequence under match
    fn sequence_of(set: &AnnotationSet, types: Option<&[&str]>) -> Vec<Arc<Annotation>> {
        match types {
            Some(types) => set.to_vec_of_types(types),
            None => set.to_vec(),
        }
    }

    /// Scans from the resume position until actions have to change the document, or until the end
    #[allow(clippy::too_many_arguments)]
    fn scan<F>(
        &self,
        ctx: &Context,
        annset: &str,
        resume: Resume,
        end: usize,
        proceed: &mut F,
        fired: &mut Vec<FiredMatch>,
        seen: &mut HashSet<(usize, Span)>,
    ) -> Result<Step, PampacError>
    where
        F: FnMut(&Location) -> bool,
    {
        let mut location = match (self.scan, resume) {
            (Scan::Text, Resume::Offset(offset)) => ctx.location_at(offset),
            (Scan::Annotations, Resume::Offset(offset)) => {
                match ctx.location_of_ann(ctx.next_ann_index(offset)) {
                    Some(location) => location,
                    None => return Ok(Step::Done),
                }
            }
            (_, Resume::Annotation(start, handle)) => {
                let index = ctx
                    .annotations()
                    .partition_point(|a| (a.start(), a.handle()) < (start, handle));
                match ctx.location_of_ann(index) {
                    Some(location) => location,
                    None => return Ok(Step::Done),
                }
            }
        };
        loop {
            let at_end = match self.scan {
                Scan::Text => location.text >= end,
                Scan::Annotations => ctx.at_end_of_anns(location) || location.text >= end,
            };
            if at_end || !proceed(&location) {
                return Ok(Step::Done);
            }
            let selected = self.evaluate(ctx, location)?;
            // a rule never fires twice for the same span
            let selected: Vec<(usize, MatchResult)> = selected
                .into_iter()
                .filter(|(rule, result)| !seen.contains(&(*rule, result.span())))
                .collect();
            if selected.is_empty() {
                match self.step(ctx, location) {
                    Some(next) => location = next,
                    None => return Ok(Step::Done),
                }
                continue;
            }
            let mut mutations = Vec::new();
            for (rule, result) in selected.iter() {
                debug(&self.config, || {
                    format!("Pampac: rule {} fires at {} for {}", rule, location, result.span())
                });
                for action in self.rules[*rule].actions.iter() {
                    if let Some(mutation) =
                        action.resolve(result, ctx.doc, annset, &self.outset, &self.config)?
                    {
                        mutations.push(mutation);
                    }
                }
            }
            let furthest = selected
                .iter()
                .map(|(_, result)| result.location().text.max(result.span().end()))
                .max()
                .unwrap_or(location.text);
            for (rule, result) in selected {
                seen.insert((rule, result.span()));
                fired.push(FiredMatch { rule, result });
            }
            let next = match self.skip {
                Skip::Once => None,
                Skip::Next => self.step(ctx, location),
                Skip::Longest if furthest > location.text => match self.scan {
                    Scan::Text => Some(ctx.location_at(furthest)),
                    Scan::Annotations => {
                        ctx.location_of_ann(ctx.next_ann_index_from(location.ann + 1, furthest))
                    }
                },
                Skip::Longest => self.step(ctx, location),
            };
            debug(&self.config, || match next {
                Some(next) => format!("Pampac: scan continues at {}", next),
                None => "Pampac: scan ends".to_string(),
            });
            if !mutations.is_empty() {
                let resume = next.map(|next| self.resume_of(ctx, next));
                return Ok(Step::Apply(mutations, resume));
            }
            match next {
                Some(next) => location = next,
                None => return Ok(Step::Done),
            }
        }
    }

    /// Evaluates all rules at a location and applies the selection policy
    fn evaluate(
        &self,
        ctx: &Context,
        location: Location,
    ) -> Result<Vec<(usize, MatchResult)>, PampacError> {
        let mut candidates: Vec<(usize, MatchResult)> = Vec::new();
        for (i, rule) in self.rules.iter().enumerate() {
            let result = match self.select {
                // any result of a rule may be the longest one
                Select::Longest => longest(rule.parser.parse_all(ctx, location)?),
                Select::First | Select::All => rule.parser.parse_first(ctx, location)?,
            };
            if let Some(result) = result {
                candidates.push((i, result));
                if self.select == Select::First {
                    break;
                }
            }
        }
        if self.select == Select::Longest && candidates.len() > 1 {
            let mut best = 0;
            for (i, (_, result)) in candidates.iter().enumerate() {
                if result.span().length() > candidates[best].1.span().length() {
                    best = i;
                }
            }
            let best = candidates.swap_remove(best);
            candidates = vec![best];
        }
        Ok(candidates)
    }

    /// One step forward in the scan
    fn step(&self, ctx: &Context, location: Location) -> Option<Location> {
        match self.scan {
            Scan::Text if location.text < ctx.doc.textlen() => {
                Some(ctx.location_at(location.text + 1))
            }
            Scan::Text => None,
            Scan::Annotations => ctx.location_of_ann(location.ann + 1),
        }
    }

    fn resume_of(&self, ctx: &Context, location: Location) -> Resume {
        match self.scan {
            Scan::Text => Resume::Offset(location.text),
            Scan::Annotations => match ctx.annotations().get(location.ann) {
                Some(annotation) => Resume::Annotation(annotation.start(), annotation.handle()),
                None => Resume::Offset(ctx.doc.textlen() + 1),
            },
        }
    }

    /// Runs the rules over many documents, in parallel if the `parallel` feature is enabled
    pub fn run_corpus(
        &self,
        docs: &mut [Document],
        annset: &str,
        types: Option<&[&str]>,
    ) -> Vec<Result<Vec<FiredMatch>, PampacError>> {
        #[cfg(feature = "parallel")]
        {
            docs.par_iter_mut()
                .map(|doc| self.run(doc, annset, types))
                .collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            docs.iter_mut()
                .map(|doc| self.run(doc, annset, types))
                .collect()
        }
    }
}

/// Keeps the sequence under match in step with a change to the document. Returns false if the
/// change is unknown and the sequence has to be rebuilt.
fn track(
    sequence: &mut Vec<Arc<Annotation>>,
    changed: Changed,
    annset: &str,
    types: Option<&[&str]>,
) -> bool {
    match changed {
        Changed::Added(set, annotation) if set == annset => {
            let wanted = match types {
                Some(types) => types.iter().any(|t| *t == annotation.annotype()),
                None => true,
            };
            if wanted {
                let index = sequence.partition_point(|a| a.as_ref() < annotation.as_ref());
                sequence.insert(index, annotation);
            }
            true
        }
        Changed::Removed(set, annotation) if set == annset => {
            let index = sequence.partition_point(|a| a.as_ref() < annotation.as_ref());
            if sequence.get(index).map(|a| a.handle()) == Some(annotation.handle()) {
                sequence.remove(index);
            }
            true
        }
        Changed::Unknown => false,
        _ => true,
    }
}

/// The first of the results with the longest span
fn longest(results: Vec<MatchResult>) -> Option<MatchResult> {
    let mut best: Option<MatchResult> = None;
    for result in results {
        if best
            .as_ref()
            .map_or(true, |best| result.span().length() > best.span().length())
        {
            best = Some(result);
        }
    }
    best
}

impl Configurable for Pampac {
    fn config(&self) -> &Config {
        &self.config
    }

    fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    fn set_config(&mut self, config: Config) -> &mut Self {
        self.config = config;
        self
    }
}
