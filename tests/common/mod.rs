#![allow(dead_code)]
use pampac::*;

/// Adds a `Token` annotation (with a `string` feature) for every whitespace separated word
pub fn tokenize(doc: &mut Document, annset: &str) -> Result<(), PampacError> {
    let mut tokens: Vec<(usize, usize, String)> = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in doc.text().chars().chain(std::iter::once(' ')).enumerate() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                tokens.push((s, i, doc.text_slice(s, i)?.to_string()));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    let set = doc.annset_mut(annset);
    for (start, end, string) in tokens {
        set.add(
            start,
            end,
            "Token",
            Some(Features::from([("string".to_string(), FeatureValue::from(string))])),
        )?;
    }
    Ok(())
}

/// The text "Hello world" with two tokens in the default set
pub fn setup_example_1() -> Result<Document, PampacError> {
    let mut doc = Document::new("Hello world").with_config(Config::default().with_debug(true));
    tokenize(&mut doc, "")?;
    Ok(doc)
}

/// A document with tokens, numbers and month names in the default set:
/// "On 2 March 2024 we met again on 15 May 2024."
pub fn setup_example_2() -> Result<Document, PampacError> {
    let mut doc = Document::new("On 2 March 2024 we met again on 15 May 2024.");
    tokenize(&mut doc, "")?;
    let set = doc.annset_mut("");
    for (start, end, value) in [(3, 4, 2), (11, 15, 2024), (32, 34, 15), (39, 43, 2024)] {
        set.add(
            start,
            end,
            "Number",
            Some(Features::from([("value".to_string(), FeatureValue::from(value))])),
        )?;
    }
    for (start, end, month) in [(5, 10, 3), (35, 38, 5)] {
        set.add(
            start,
            end,
            "Month",
            Some(Features::from([("month".to_string(), FeatureValue::from(month))])),
        )?;
    }
    Ok(doc)
}

/// Spans from the annotation set, in order
pub fn spans(set: &AnnotationSet) -> Vec<(usize, usize)> {
    set.iter().map(|a| (a.start(), a.end())).collect()
}
