use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pampac::*;

mod common;

use common::*;

fn spans_of(results: &[MatchResult]) -> Vec<(usize, usize)> {
    results
        .iter()
        .map(|m| (m.span().start(), m.span().end()))
        .collect()
}

fn plain(text: &str) -> Document {
    let mut doc = Document::new(text);
    doc.annset_mut("");
    doc
}

#[test]
fn text_literal_and_regex() -> Result<(), PampacError> {
    let doc = plain("Hello world");
    let config = Config::default();
    let ctx = Context::new(&doc, doc.annset("")?, &config);
    let results = Parser::text("world").parse_all(&ctx, ctx.location_at(6))?;
    assert_eq!(spans_of(&results), vec![(6, 11)]);
    assert!(Parser::text("world").parse_all(&ctx, ctx.location_at(0))?.is_empty());
    // a regular expression only matches at the current offset
    let parser = Parser::regex("w[a-z]+")?;
    assert!(parser.parse_first(&ctx, ctx.location_at(0))?.is_none());
    let result = parser.parse_first(&ctx, ctx.location_at(6))?;
    assert_eq!(result.map(|m| m.location().text), Some(11));
    assert!(matches!(Parser::regex("(unclosed"), Err(PampacError::RegexError(..))));
    Ok(())
}

#[test]
fn regex_groups_unicode() -> Result<(), PampacError> {
    let doc = plain("€ 42,50");
    let config = Config::default();
    let ctx = Context::new(&doc, doc.annset("")?, &config);
    let parser = Parser::regex(r"€ (?P<whole>\d+),(\d+)?")?.bind("amount");
    let result = parser
        .parse_first(&ctx, ctx.location_at(0))?
        .ok_or(PampacError::NotFound("amount".into(), "test"))?;
    assert_eq!(result.span(), Span::new(0, 7)?);
    assert_eq!(result.binding("whole").map(|b| b.span()), Some(Span::new(2, 4)?));
    let amount = result.binding("amount").ok_or(PampacError::NotFound("amount".into(), "test"))?;
    assert_eq!(amount.group(2), Some(Some(Span::new(5, 7)?)));
    assert_eq!(amount.group(3), None);
    assert_eq!(result.text(&doc)?, "€ 42,50");
    Ok(())
}

#[test]
fn ann_sequence_with_bindings() -> Result<(), PampacError> {
    let doc = setup_example_2()?;
    let config = Config::default();
    let ctx = Context::new(&doc, doc.annset("")?, &config).with_types(&["Number", "Month"]);
    let date = Parser::seq(vec![
        Parser::ann("Number").bind("day"),
        Parser::ann("Month").bind("month"),
        Parser::ann("Number").bind("year"),
    ]);
    let results = date.parse_all(&ctx, ctx.location_at(3))?;
    assert_eq!(spans_of(&results), vec![(3, 15)]);
    let result = &results[0];
    assert_eq!(result.bindings().len(), 3);
    let month = result
        .binding("month")
        .and_then(|b| b.annotation())
        .ok_or(PampacError::NotFound("month".into(), "test"))?;
    assert_eq!(month.feature("month"), Some(FeatureValue::Int(3)));
    assert_eq!(result.location(), Location::new(15, 3));
    // nothing at the month
    assert!(date.parse_all(&ctx, ctx.location_at(5))?.is_empty());
    Ok(())
}

#[test]
fn binding_conflict() -> Result<(), PampacError> {
    let doc = setup_example_2()?;
    let config = Config::default();
    let ctx = Context::new(&doc, doc.annset("")?, &config).with_types(&["Number", "Month"]);
    let parser = Parser::seq(vec![
        Parser::ann("Number").bind("x"),
        Parser::ann("Month").bind("x"),
    ]);
    assert!(matches!(
        parser.parse_all(&ctx, ctx.location_at(0)),
        Err(PampacError::BindingConflict(..))
    ));
    Ok(())
}

#[test]
fn repetition_greedy_with_backtracking() -> Result<(), PampacError> {
    let doc = plain("abcd");
    let config = Config::default();
    let ctx = Context::new(&doc, doc.annset("")?, &config);
    let letter = Parser::regex("[a-z]")?;
    let results = Parser::n(letter.clone(), 2, Some(3)).parse_all(&ctx, ctx.location_at(0))?;
    assert_eq!(spans_of(&results), vec![(0, 3), (0, 2)]);
    let results = Parser::seq(vec![Parser::n(letter.clone(), 2, Some(3)), Parser::text("d")])
        .parse_all(&ctx, ctx.location_at(0))?;
    assert_eq!(spans_of(&results), vec![(0, 4)]);
    let results = Parser::n(letter, 0, None).parse_all(&ctx, ctx.location_at(2))?;
    assert_eq!(spans_of(&results), vec![(2, 4), (2, 3), (2, 2)]);
    Ok(())
}

#[test]
fn repetition_bindings() -> Result<(), PampacError> {
    let doc = plain("abc");
    let config = Config::default();
    let ctx = Context::new(&doc, doc.annset("")?, &config);
    let results = Parser::regex("[a-z]")?
        .bind("c")
        .repeat(1, None)
        .parse_all(&ctx, ctx.location_at(0))?;
    assert_eq!(results.len(), 3);
    match results[0].binding("c") {
        Some(Binding::Repeated(items)) => {
            let spans: Vec<Span> = items.iter().map(|b| b.span()).collect();
            assert_eq!(spans, vec![Span::new(0, 1)?, Span::new(1, 2)?, Span::new(2, 3)?]);
        }
        other => panic!("expected a repeated binding, got {:?}", other),
    }
    assert!(!results[2].binding("c").map_or(true, |b| b.is_repeated()));
    Ok(())
}

#[test]
fn repetition_until() -> Result<(), PampacError> {
    let doc = plain("aaab");
    let config = Config::default();
    let ctx = Context::new(&doc, doc.annset("")?, &config);
    let parser = Parser::n_until(Parser::regex("[a-z]")?, 1, None, Parser::text("b"));
    let results = parser.parse_all(&ctx, ctx.location_at(0))?;
    assert_eq!(spans_of(&results), vec![(0, 3), (0, 2), (0, 1)]);
    Ok(())
}

#[test]
fn alternatives() -> Result<(), PampacError> {
    let doc = plain("abc");
    let config = Config::default();
    let ctx = Context::new(&doc, doc.annset("")?, &config);
    let first = Parser::or(vec![Parser::text("x"), Parser::text("ab"), Parser::text("a")]);
    assert_eq!(spans_of(&first.parse_all(&ctx, ctx.location_at(0))?), vec![(0, 2)]);
    let all = Parser::or_all(vec![Parser::text("x"), Parser::text("ab"), Parser::text("a")]);
    assert_eq!(spans_of(&all.parse_all(&ctx, ctx.location_at(0))?), vec![(0, 2), (0, 1)]);
    let both = Parser::and(vec![Parser::text("ab"), Parser::regex("[a-z]")?]);
    let results = both.parse_all(&ctx, ctx.location_at(0))?;
    assert_eq!(spans_of(&results), vec![(0, 2)]);
    assert_eq!(results[0].location().text, 2);
    Ok(())
}

#[test]
fn find_and_window() -> Result<(), PampacError> {
    let doc = plain("abcabc");
    let config = Config::default();
    let ctx = Context::new(&doc, doc.annset("")?, &config);
    let find = Parser::find(Parser::text("c"));
    assert_eq!(spans_of(&find.parse_all(&ctx, ctx.location_at(0))?), vec![(2, 3)]);
    assert_eq!(spans_of(&find.parse_all(&ctx, ctx.location_at(3))?), vec![(5, 6)]);
    assert!(Parser::find(Parser::text("x")).parse_all(&ctx, ctx.location_at(0))?.is_empty());

    let config = Config::default().with_find_window(Some(1));
    let ctx = Context::new(&doc, doc.annset("")?, &config);
    assert!(matches!(
        find.parse_all(&ctx, ctx.location_at(0)),
        Err(PampacError::LimitExceeded(Limit::FindWindow, 1, _))
    ));
    Ok(())
}

#[test]
fn find_by_annotations() -> Result<(), PampacError> {
    let doc = setup_example_2()?;
    let config = Config::default();
    let ctx = Context::new(&doc, doc.annset("")?, &config).with_types(&["Number", "Month"]);
    let find = Parser::find_by_anns(Parser::ann("Month"));
    assert_eq!(spans_of(&find.parse_all(&ctx, ctx.location_at(0))?), vec![(5, 10)]);
    assert_eq!(spans_of(&find.parse_all(&ctx, ctx.location_at(11))?), vec![(35, 38)]);
    Ok(())
}

#[test]
fn lookahead() -> Result<(), PampacError> {
    let doc = plain("ab ac");
    let config = Config::default();
    let ctx = Context::new(&doc, doc.annset("")?, &config);
    let a_before_b = Parser::text("a").followed_by(Parser::text("b"));
    assert_eq!(spans_of(&a_before_b.parse_all(&ctx, ctx.location_at(0))?), vec![(0, 1)]);
    assert!(a_before_b.parse_all(&ctx, ctx.location_at(3))?.is_empty());
    let a_not_before_b = Parser::text("a").not_followed_by(Parser::text("b"));
    assert!(a_not_before_b.parse_all(&ctx, ctx.location_at(0))?.is_empty());
    assert_eq!(spans_of(&a_not_before_b.parse_all(&ctx, ctx.location_at(3))?), vec![(3, 4)]);
    Ok(())
}

#[test]
fn filter_and_feature_constraints() -> Result<(), PampacError> {
    let doc = setup_example_2()?;
    let config = Config::default();
    let ctx = Context::new(&doc, doc.annset("")?, &config).with_types(&["Number"]);
    let big = Parser::ann("Number").filter(|m, _| {
        m.item()
            .annotation()
            .and_then(|a| a.feature("value"))
            .and_then(|v| v.as_i64())
            .map_or(false, |v| v > 100)
    });
    assert!(big.parse_all(&ctx, ctx.location_at(0))?.is_empty());
    assert_eq!(spans_of(&big.parse_all(&ctx, ctx.location_at(5))?), vec![(11, 15)]);
    let day = Parser::ann("Number").with_feature("value", FeatureOperator::LessThanOrEqual(31.0));
    assert_eq!(spans_of(&day.parse_all(&ctx, ctx.location_at(0))?), vec![(3, 4)]);
    assert!(day.parse_all(&ctx, ctx.location_at(5))?.is_empty());
    Ok(())
}

#[test]
fn callbacks() -> Result<(), PampacError> {
    let doc = plain("abc");
    let config = Config::default();
    let ctx = Context::new(&doc, doc.annset("")?, &config);
    let successes = Arc::new(AtomicUsize::new(0));
    let failures = Arc::new(AtomicUsize::new(0));
    let (s, f) = (successes.clone(), failures.clone());
    let parser = Parser::text("a")
        .on_success(move |_, _| {
            s.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .on_failure(move |_, _| {
            f.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    parser.parse_all(&ctx, ctx.location_at(0))?;
    parser.parse_all(&ctx, ctx.location_at(1))?;
    parser.parse_all(&ctx, ctx.location_at(2))?;
    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(failures.load(Ordering::SeqCst), 2);

    let failing = Parser::text("a").on_success(|_, _| {
        Err(PampacError::CallbackError("rejected".into(), "test"))
    });
    assert!(matches!(
        failing.parse_all(&ctx, ctx.location_at(0)),
        Err(PampacError::CallbackError(..))
    ));
    Ok(())
}

#[test]
fn relational_modifiers() -> Result<(), PampacError> {
    let doc = setup_example_2()?;
    let config = Config::default();
    let ctx = Context::new(&doc, doc.annset("")?, &config).with_types(&["Token"]);
    // the token "2" at 3 covers a number, "March" at 5 does not
    let numeric = Parser::ann("Token").covering(RelationTarget::annotype("Number"));
    assert_eq!(spans_of(&numeric.parse_all(&ctx, ctx.location_at(3))?), vec![(3, 4)]);
    assert!(numeric.parse_all(&ctx, ctx.location_at(5))?.is_empty());
    let other = Parser::ann("Token").not_covering(RelationTarget::annotype("Number"));
    assert_eq!(spans_of(&other.parse_all(&ctx, ctx.location_at(5))?), vec![(5, 10)]);
    // a token never relates to itself
    let alone = Parser::ann("Token").coextensive(RelationTarget::annotype("Token"));
    assert!(alone.parse_all(&ctx, ctx.location_at(0))?.is_empty());
    let inside = Parser::ann("Token").within(RelationTarget::span(Span::new(0, 10)?));
    assert_eq!(spans_of(&inside.parse_all(&ctx, ctx.location_at(5))?), vec![(5, 10)]);
    assert!(inside.parse_all(&ctx, ctx.location_at(11))?.is_empty());
    Ok(())
}

#[test]
fn relation_between_bindings() -> Result<(), PampacError> {
    let doc = setup_example_2()?;
    let config = Config::default();
    let ctx = Context::new(&doc, doc.annset("")?, &config).with_types(&["Number", "Month"]);
    let pair = Parser::seq(vec![
        Parser::ann("Number").bind("n"),
        Parser::ann("Month").bind("m"),
    ]);
    let adjacent = pair.clone().related_as(
        Some("n"),
        SpanRelation::Before { immediately: true },
        RelationTarget::binding("m"),
        false,
    );
    assert!(adjacent.parse_all(&ctx, ctx.location_at(0))?.is_empty());
    let near = pair.clone().related_as(
        Some("n"),
        SpanRelation::Before { immediately: false },
        RelationTarget::binding("m"),
        false,
    );
    assert_eq!(spans_of(&near.parse_all(&ctx, ctx.location_at(0))?), vec![(3, 10)]);
    let undefined = pair.related_as(
        Some("n"),
        SpanRelation::Before { immediately: false },
        RelationTarget::binding("nothing"),
        false,
    );
    assert!(matches!(
        undefined.parse_all(&ctx, ctx.location_at(0)),
        Err(PampacError::UndefinedReference(..))
    ));
    Ok(())
}

#[test]
fn ann_at_match_types() -> Result<(), PampacError> {
    let mut doc = Document::new("abcdef");
    let set = doc.annset_mut("");
    set.add(1, 3, "A", None)?;
    set.add(1, 5, "A", None)?;
    set.add(1, 2, "B", None)?;
    set.add(4, 6, "A", None)?;
    let config = Config::default();
    let ctx = Context::new(&doc, doc.annset("")?, &config).with_types(&["A"]);
    let all = Parser::ann_at("A").parse_all(&ctx, ctx.location_at(0))?;
    assert_eq!(spans_of(&all), vec![(1, 3), (1, 5)]);
    let longest = Parser::ann_at_with(Some("A"), vec![], MatchType::Longest, Anchor::NextAnnotation);
    assert_eq!(spans_of(&longest.parse_all(&ctx, ctx.location_at(0))?), vec![(1, 5)]);
    let first = Parser::ann_at_with(Some("A"), vec![], MatchType::First, Anchor::NextAnnotation);
    assert_eq!(spans_of(&first.parse_all(&ctx, ctx.location_at(0))?), vec![(1, 3)]);
    let here = Parser::ann_at_with(Some("A"), vec![], MatchType::All, Anchor::TextOffset);
    assert!(here.parse_all(&ctx, ctx.location_at(0))?.is_empty());
    assert_eq!(spans_of(&here.parse_all(&ctx, ctx.location_at(4))?), vec![(4, 6)]);
    Ok(())
}

#[test]
fn limit_max_results() -> Result<(), PampacError> {
    let doc = plain("abcdefgh");
    let parser = Parser::n(Parser::regex("[a-z]")?, 1, None);
    let config = Config::default();
    let ctx = Context::new(&doc, doc.annset("")?, &config);
    assert_eq!(parser.parse_all(&ctx, ctx.location_at(0))?.len(), 8);
    let config = Config::default().with_max_results(5);
    let ctx = Context::new(&doc, doc.annset("")?, &config);
    match parser.parse_all(&ctx, ctx.location_at(0)) {
        Err(e) => assert!(e.is_limit()),
        Ok(results) => panic!("expected a limit error, got {} results", results.len()),
    }
    Ok(())
}

#[test]
fn limit_max_repeat() -> Result<(), PampacError> {
    let doc = plain("abcdef");
    let config = Config::default().with_max_repeat(3);
    let ctx = Context::new(&doc, doc.annset("")?, &config);
    let unbounded = Parser::n(Parser::regex("[a-z]")?, 0, None);
    assert!(matches!(
        unbounded.parse_all(&ctx, ctx.location_at(0)),
        Err(PampacError::LimitExceeded(Limit::Repeat, 3, _))
    ));
    // exactly at the limit, with nothing left to repeat
    assert_eq!(unbounded.parse_all(&ctx, ctx.location_at(3))?.len(), 4);
    // an explicit maximum is never an error
    let bounded = Parser::n(Parser::regex("[a-z]")?, 0, Some(3));
    assert_eq!(spans_of(&bounded.parse_all(&ctx, ctx.location_at(0))?)[0], (0, 3));
    Ok(())
}

#[test]
fn rule_regex_date() -> Result<(), PampacError> {
    let mut doc = plain("2023-01-02");
    let rule = Rule::new(
        Parser::regex(r"(\d{4})-(\d{2})-(\d{2})")?,
        Action::add_ann("Date", SpanRef::matched()),
    )
    .with_action(Action::add_ann("Year", SpanRef::group(1)).with_feature("year", SpanRef::group(1)))
    .with_action(Action::add_ann("Month", SpanRef::group(2)).with_feature("month", SpanRef::group(2)))
    .with_action(Action::add_ann("Day", SpanRef::group(3)).with_feature("day", SpanRef::group(3)));
    let fired = Pampac::new(vec![rule]).run(&mut doc, "", None)?;
    assert_eq!(fired.len(), 1);
    let set = doc.annset("")?;
    assert_eq!(spans(&set.by_type("Date")), vec![(0, 10)]);
    assert_eq!(spans(&set.by_type("Year")), vec![(0, 4)]);
    assert_eq!(spans(&set.by_type("Month")), vec![(5, 7)]);
    assert_eq!(spans(&set.by_type("Day")), vec![(8, 10)]);
    let month = set.by_type("Month");
    let month = month.first().ok_or(PampacError::NotFound("Month".into(), "test"))?;
    assert_eq!(month.feature("month"), Some("01".into()));
    let year = set.by_type("Year");
    assert_eq!(year.first().and_then(|a| a.feature("year")), Some("2023".into()));
    Ok(())
}

#[test]
fn rule_add_to_outset() -> Result<(), PampacError> {
    let mut doc = setup_example_2()?;
    let date = Parser::seq(vec![
        Parser::ann("Number").bind("day"),
        Parser::ann("Month").bind("month"),
        Parser::ann("Number").bind("year"),
    ]);
    let rule = Rule::new(
        date,
        Action::add_ann("Date", SpanRef::matched())
            .with_feature("month", FeatureTemplate::Feature("month".into(), "month".into()))
            .with_feature("text", SpanRef::matched()),
    );
    let fired = Pampac::new(vec![rule])
        .with_outset("dates")
        .run(&mut doc, "", Some(&["Number", "Month"][..]))?;
    assert_eq!(fired.len(), 2);
    let dates = doc.annset("dates")?;
    assert_eq!(spans(dates), vec![(3, 15), (32, 43)]);
    let last = dates.last().ok_or(PampacError::NotFound("date".into(), "test"))?;
    assert_eq!(last.feature("month"), Some(FeatureValue::Int(5)));
    assert_eq!(last.feature("text"), Some("15 May 2024".into()));
    // the input set is left alone
    assert!(doc.annset("")?.by_type("Date").is_empty());
    Ok(())
}

#[test]
fn rule_remove_and_update() -> Result<(), PampacError> {
    let mut doc = setup_example_2()?;
    let remove = Rule::new(Parser::ann("Number").bind("n"), Action::remove_ann("n"));
    let fired = Pampac::new(vec![remove]).run(&mut doc, "", Some(&["Number"][..]))?;
    assert_eq!(fired.len(), 4);
    assert!(doc.annset("")?.by_type("Number").is_empty());
    assert_eq!(doc.annset("")?.by_type("Token").len(), 11);

    let update = Rule::new(
        Parser::ann("Month").bind("m"),
        Action::update_features("m").with_feature("name", SpanRef::binding("m")),
    );
    Pampac::new(vec![update]).run(&mut doc, "", Some(&["Month"][..]))?;
    let names: Vec<Option<FeatureValue>> = doc
        .annset("")?
        .by_type("Month")
        .iter()
        .map(|a| a.feature("name"))
        .collect();
    assert_eq!(names, vec![Some("March".into()), Some("May".into())]);

    let replace = Rule::new(
        Parser::ann("Month").bind("m"),
        Action::update_features("m").replacing(),
    );
    Pampac::new(vec![replace]).run(&mut doc, "", Some(&["Month"][..]))?;
    assert!(doc.annset("")?.by_type("Month").iter().all(|a| a.features().is_empty()));
    Ok(())
}

#[test]
fn rule_undefined_reference() -> Result<(), PampacError> {
    let mut doc = setup_example_1()?;
    let rule = Rule::new(Parser::ann("Token"), Action::remove_ann("missing"));
    assert!(matches!(
        Pampac::new(vec![rule]).run(&mut doc, "", None),
        Err(PampacError::UndefinedReference(..))
    ));
    assert_eq!(doc.annset("")?.len(), 2);
    Ok(())
}

#[test]
fn rule_callback_action() -> Result<(), PampacError> {
    let mut doc = setup_example_1()?;
    let rule = Rule::new(
        Parser::ann("Token").bind("t"),
        Action::callback(|m, doc| {
            let word = m.text(doc)?.to_uppercase();
            doc.features_mut().insert(word, FeatureValue::Bool(true));
            Ok(())
        }),
    );
    Pampac::new(vec![rule]).run(&mut doc, "", None)?;
    assert!(doc.features().contains_key("HELLO"));
    assert!(doc.features().contains_key("WORLD"));
    Ok(())
}

fn two_rules() -> Vec<Rule> {
    vec![
        Rule::without_action(Parser::text("ab")),
        Rule::without_action(Parser::text("abc")),
    ]
}

fn fired_rules(fired: &[FiredMatch]) -> Vec<(usize, usize)> {
    fired.iter().map(|f| (f.rule, f.result.span().start())).collect()
}

#[test]
fn select_policies() -> Result<(), PampacError> {
    let mut doc = plain("abcabc");
    let fired = Pampac::new(two_rules()).run(&mut doc, "", None)?;
    assert_eq!(fired_rules(&fired), vec![(0, 0), (0, 3)]);
    let fired = Pampac::new(two_rules())
        .with_select(Select::All)
        .run(&mut doc, "", None)?;
    assert_eq!(fired_rules(&fired), vec![(0, 0), (1, 0), (0, 3), (1, 3)]);
    let fired = Pampac::new(two_rules())
        .with_select(Select::Longest)
        .run(&mut doc, "", None)?;
    assert_eq!(fired_rules(&fired), vec![(1, 0), (1, 3)]);
    Ok(())
}

#[test]
fn select_longest_considers_every_result() -> Result<(), PampacError> {
    let mut doc = plain("abcd");
    let rules = vec![
        Rule::without_action(Parser::or_all(vec![Parser::text("a"), Parser::text("abc")])),
        Rule::without_action(Parser::text("ab")),
    ];
    let fired = Pampac::new(rules)
        .with_select(Select::Longest)
        .run(&mut doc, "", None)?;
    let found: Vec<(usize, Span)> = fired.iter().map(|f| (f.rule, f.result.span())).collect();
    assert_eq!(found, vec![(0, Span::new(0, 3)?)]);
    Ok(())
}

#[test]
fn added_annotations_are_matched_in_the_same_run() -> Result<(), PampacError> {
    let mut doc = setup_example_1()?;
    let mark = Rule::new(
        Parser::seq(vec![Parser::ann("Token"), Parser::ann("Token").bind("second")]),
        Action::add_ann("X", SpanRef::binding("second")),
    );
    let on_x = Rule::new(Parser::ann("X").bind("x"), Action::add_ann("Found", SpanRef::binding("x")))
        .with_action(Action::add_ann("Ignored", SpanRef::binding("x")));
    let fired = Pampac::new(vec![mark, on_x])
        .with_scan(Scan::Annotations)
        .with_skip(Skip::Next)
        .run(&mut doc, "", Some(&["Token", "X"][..]))?;
    let found: Vec<(usize, Span)> = fired.iter().map(|f| (f.rule, f.result.span())).collect();
    assert_eq!(found, vec![(0, Span::new(0, 11)?), (1, Span::new(6, 11)?)]);
    let set = doc.annset("")?;
    assert_eq!(spans(&set.by_type("X")), vec![(6, 11)]);
    assert_eq!(spans(&set.by_type("Found")), vec![(6, 11)]);
    // added to the input set, but not of a type under match
    assert_eq!(spans(&set.by_type("Ignored")), vec![(6, 11)]);
    Ok(())
}

#[test]
fn removed_annotations_leave_the_sequence() -> Result<(), PampacError> {
    let mut doc = setup_example_2()?;
    let drop_next = Rule::new(
        Parser::seq(vec![Parser::ann("Number"), Parser::ann("Month").bind("month")]),
        Action::remove_ann("month"),
    );
    let month = Rule::without_action(Parser::ann("Month"));
    let fired = Pampac::new(vec![drop_next, month])
        .with_scan(Scan::Annotations)
        .with_skip(Skip::Next)
        .run(&mut doc, "", Some(&["Number", "Month"][..]))?;
    // the second rule would fire on both months if they stayed in the sequence
    assert_eq!(fired_rules(&fired), vec![(0, 3), (0, 32)]);
    assert!(doc.annset("")?.by_type("Month").is_empty());
    Ok(())
}

#[test]
fn output_set_leaves_input_untouched() -> Result<(), PampacError> {
    let mut doc = Document::new("a ".repeat(500));
    tokenize(&mut doc, "")?;
    let rule = Rule::new(Parser::ann("Token"), Action::add_ann("Word", SpanRef::matched()));
    let fired = Pampac::new(vec![rule])
        .with_scan(Scan::Annotations)
        .with_outset("out")
        .run(&mut doc, "", Some(&["Token"][..]))?;
    assert_eq!(fired.len(), 500);
    assert_eq!(doc.annset("out")?.len(), 500);
    assert_eq!(doc.annset("")?.len(), 500);
    Ok(())
}

#[test]
fn skip_policies() -> Result<(), PampacError> {
    let mut doc = plain("abc");
    let rules = || vec![Rule::without_action(Parser::regex("[a-z]+").unwrap())];
    let fired = Pampac::new(rules()).run(&mut doc, "", None)?;
    assert_eq!(fired.len(), 1);
    let fired = Pampac::new(rules()).with_skip(Skip::Next).run(&mut doc, "", None)?;
    let found: Vec<Span> = fired.iter().map(|f| f.result.span()).collect();
    assert_eq!(found, vec![Span::new(0, 3)?, Span::new(1, 3)?, Span::new(2, 3)?]);
    let mut doc = plain("a b c");
    let fired = Pampac::new(rules()).with_skip(Skip::Once).run(&mut doc, "", None)?;
    assert_eq!(fired.len(), 1);
    Ok(())
}

#[test]
fn skip_next_fires_once_per_annotation() -> Result<(), PampacError> {
    let mut doc = setup_example_1()?;
    let rule = Rule::new(Parser::ann("Token"), Action::add_ann("Word", SpanRef::matched()));
    let fired = Pampac::new(vec![rule])
        .with_skip(Skip::Next)
        .with_outset("words")
        .run(&mut doc, "", None)?;
    assert_eq!(fired.len(), 2);
    assert_eq!(spans(doc.annset("words")?), vec![(0, 5), (6, 11)]);
    Ok(())
}

#[test]
fn scan_by_annotations() -> Result<(), PampacError> {
    let mut doc = setup_example_2()?;
    let rule = Rule::new(
        Parser::ann("Token").bind("t"),
        Action::add_ann("Word", SpanRef::binding("t")),
    );
    let fired = Pampac::new(vec![rule])
        .with_scan(Scan::Annotations)
        .with_outset("words")
        .run(&mut doc, "", Some(&["Token"][..]))?;
    assert_eq!(fired.len(), 11);
    assert_eq!(doc.annset("words")?.len(), 11);
    Ok(())
}

#[test]
fn run_range_and_cancellation() -> Result<(), PampacError> {
    let mut doc = plain("abcabc");
    let rules = vec![Rule::without_action(Parser::text("a"))];
    let pampac = Pampac::new(rules);
    let fired = pampac.run_range(&mut doc, "", None, 2, 6)?;
    assert_eq!(fired_rules(&fired), vec![(0, 3)]);
    assert!(matches!(
        pampac.run_range(&mut doc, "", None, 4, 9),
        Err(PampacError::InvalidSpan(..))
    ));
    let fired = pampac.run_cancellable(&mut doc, "", None, 0, 6, |location| location.text < 3)?;
    assert_eq!(fired_rules(&fired), vec![(0, 0)]);
    Ok(())
}

#[test]
fn run_creates_input_set() -> Result<(), PampacError> {
    let mut doc = Document::new("abc");
    let fired = Pampac::new(vec![Rule::without_action(Parser::text("b"))]).run(&mut doc, "input", None)?;
    assert_eq!(fired.len(), 1);
    assert!(doc.has_annset("input"));
    Ok(())
}

#[test]
fn run_over_corpus() -> Result<(), PampacError> {
    let mut docs = vec![setup_example_1()?, setup_example_2()?];
    let rule = Rule::new(Parser::ann("Token"), Action::add_ann("Word", SpanRef::matched()));
    let results = Pampac::new(vec![rule])
        .with_outset("words")
        .run_corpus(&mut docs, "", Some(&["Token"][..]));
    let counts: Vec<usize> = results
        .into_iter()
        .map(|r| r.map(|fired| fired.len()))
        .collect::<Result<_, _>>()?;
    assert_eq!(counts, vec![2, 11]);
    assert_eq!(docs[1].annset("words")?.len(), 11);
    Ok(())
}
