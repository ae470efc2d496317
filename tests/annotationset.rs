use pampac::*;

mod common;

use common::*;

#[test]
fn add_and_iterate_in_order() -> Result<(), PampacError> {
    let mut doc = Document::new("abcdefgh");
    let set = doc.annset_mut("");
    set.add(3, 5, "X", None)?;
    set.add(0, 4, "X", None)?;
    set.add(0, 2, "Y", None)?;
    set.add(3, 3, "Y", None)?;
    assert_eq!(set.len(), 4);
    assert_eq!(spans(set), vec![(0, 4), (0, 2), (3, 5), (3, 3)]);
    assert_eq!(set.type_names(), vec!["X", "Y"]);
    assert_eq!(set.span(), Some(Span::new(0, 5)?));
    Ok(())
}

#[test]
fn ties_are_ordered_by_id() -> Result<(), PampacError> {
    let mut doc = Document::new("abcdefgh");
    let set = doc.annset_mut("");
    let a = set.add(2, 6, "A", None)?;
    let b = set.add(2, 3, "B", None)?;
    let ids: Vec<usize> = set.iter().map(|a| a.id()).collect();
    assert_eq!(ids, vec![a.id(), b.id()]);
    Ok(())
}

#[test]
fn invalid_spans() -> Result<(), PampacError> {
    let mut doc = Document::new("abc");
    let set = doc.annset_mut("");
    assert!(matches!(
        set.add(2, 1, "X", None),
        Err(PampacError::InvalidSpan(2, 1, 3, _))
    ));
    assert!(matches!(
        set.add(1, 4, "X", None),
        Err(PampacError::InvalidSpan(1, 4, 3, _))
    ));
    assert!(set.add(3, 3, "X", None).is_ok());
    Ok(())
}

#[test]
fn get_and_remove() -> Result<(), PampacError> {
    let mut doc = Document::new("abcdef");
    let set = doc.annset_mut("");
    let a = set.add(0, 2, "X", None)?;
    set.add(2, 4, "X", None)?;
    assert_eq!(set.get(a.handle())?.span(), Span::new(0, 2)?);
    let removed = set.remove(a.handle())?;
    assert_eq!(removed.handle(), a.handle());
    assert_eq!(set.len(), 1);
    assert!(matches!(set.get(a.handle()), Err(PampacError::NotFound(..))));
    assert!(matches!(set.remove(a.handle()), Err(PampacError::NotFound(..))));
    assert_eq!(set.by_type("X").len(), 1);
    assert!(set.overlapping(&Span::new(0, 1)?, true).is_empty());
    Ok(())
}

#[test]
fn within_boundary() -> Result<(), PampacError> {
    let mut doc = Document::new("abcdef");
    let set = doc.annset_mut("");
    let outer = set.add(0, 4, "A", None)?;
    set.add(1, 2, "B", None)?;
    set.add(3, 4, "B", None)?;
    set.add(3, 6, "C", None)?;
    assert_eq!(spans(&set.within(&outer, false)), vec![(1, 2), (3, 4)]);
    assert_eq!(spans(&set.within(&outer, true)), vec![(0, 4), (1, 2), (3, 4)]);
    // a raw span has no identity, so nothing is excluded
    assert_eq!(spans(&set.within(&Span::new(0, 4)?, false)), vec![(0, 4), (1, 2), (3, 4)]);
    Ok(())
}

#[test]
fn relational_queries() -> Result<(), PampacError> {
    let mut doc = Document::new("0123456789");
    let set = doc.annset_mut("");
    set.add(0, 2, "A", None)?;
    set.add(2, 5, "A", None)?;
    set.add(3, 4, "A", None)?;
    set.add(4, 4, "A", None)?;
    set.add(5, 9, "A", None)?;
    let q = Span::new(2, 5)?;
    assert_eq!(spans(&set.overlapping(&q, true)), vec![(2, 5), (3, 4), (4, 4)]);
    assert_eq!(spans(&set.covering(&Span::new(3, 4)?, true)), vec![(2, 5), (3, 4)]);
    assert_eq!(spans(&set.coextensive(&q, true)), vec![(2, 5)]);
    assert_eq!(spans(&set.before(&q, false)), vec![(0, 2)]);
    assert_eq!(spans(&set.before(&q, true)), vec![(0, 2)]);
    assert_eq!(spans(&set.after(&q, true)), vec![(5, 9)]);
    assert_eq!(spans(&set.after(&Span::new(0, 2)?, false)), vec![(2, 5), (3, 4), (4, 4), (5, 9)]);
    assert_eq!(spans(&set.startingat(4)), vec![(4, 4)]);
    assert_eq!(spans(&set.start_ge(4)), vec![(4, 4), (5, 9)]);
    assert_eq!(
        spans(&set.related(SpanRelation::EndsAt, &Span::new(1, 4)?, true)),
        vec![(3, 4), (4, 4)]
    );
    Ok(())
}

#[test]
fn empty_set_queries() -> Result<(), PampacError> {
    let mut doc = Document::new("abc");
    let set = doc.annset_mut("");
    assert!(set.within(&Span::new(0, 3)?, true).is_empty());
    assert!(set.first().is_none());
    assert!(set.span().is_none());
    Ok(())
}

#[test]
fn query_results_share_annotations() -> Result<(), PampacError> {
    let mut doc = Document::new("abcdef");
    let set = doc.annset_mut("");
    let a = set.add(0, 2, "X", None)?;
    set.add(2, 4, "Y", None)?;
    let mut result = set.by_type("X");
    assert!(result.is_detached());
    assert_eq!(result.origin(), Some(""));
    // features are shared
    result.get(a.handle())?.set_feature("seen", true);
    assert_eq!(set.get(a.handle())?.feature("seen"), Some(FeatureValue::Bool(true)));
    // membership is not
    result.remove(a.handle())?;
    assert!(result.is_empty());
    assert!(set.contains(a.handle()));
    Ok(())
}

#[test]
fn type_filters() -> Result<(), PampacError> {
    let doc = setup_example_2()?;
    let set = doc.annset("")?;
    assert_eq!(set.by_type("Number").len(), 4);
    assert_eq!(set.by_type("Month").len(), 2);
    assert!(set.by_type("Person").is_empty());
    let dates = set.by_types(&["Number", "Month"]);
    assert_eq!(spans(&dates), vec![(3, 4), (5, 10), (11, 15), (32, 34), (35, 38), (39, 43)]);
    let months: Vec<String> = set
        .by_type("Month")
        .iter()
        .map(|a| doc.text_of(a).map(|s| s.to_string()))
        .collect::<Result<_, _>>()?;
    assert_eq!(months, vec!["March", "May"]);
    Ok(())
}

#[test]
fn features_on_annotations() -> Result<(), PampacError> {
    let doc = setup_example_1()?;
    let set = doc.annset("")?;
    let world = set.last().ok_or(PampacError::NotFound("world".into(), "test"))?;
    assert_eq!(world.feature("string"), Some("world".into()));
    assert!(world.test(Some("Token"), &[("string".into(), FeatureOperator::equals("world"))]));
    assert!(!world.test(Some("Word"), &[]));
    world.update_features(Features::from([("len".to_string(), FeatureValue::from(5))]));
    assert_eq!(world.features().len(), 2);
    world.replace_features(Features::new());
    assert!(!world.has_feature("string"));
    Ok(())
}

#[test]
fn set_to_json() -> Result<(), PampacError> {
    let doc = setup_example_1()?;
    let json = serde_json::to_value(doc.annset("")?)
        .map_err(|e| PampacError::SerializationError(e.to_string()))?;
    assert_eq!(json[0]["type"], "Token");
    assert_eq!(json[1]["start"], 6);
    assert_eq!(json[1]["features"]["string"], "world");
    Ok(())
}
