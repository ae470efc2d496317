use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};

use pampac::*;

/// A deterministic text of `n` words of varying length
fn generate_text(n: usize) -> String {
    let words = ["lorem", "ipsum", "a", "dolor", "sit", "amet", "consectetur", "of", "2024"];
    let mut text = String::new();
    for i in 0..n {
        if i > 0 {
            text.push(' ');
        }
        text.push_str(words[(i * 7 + i / 3) % words.len()]);
    }
    text
}

fn tokenized(n: usize) -> Document {
    let mut doc = Document::new(generate_text(n));
    let rule = Rule::new(
        Parser::regex(r"\w+").unwrap(),
        Action::add_ann("Token", SpanRef::matched()),
    );
    Pampac::new(vec![rule]).run(&mut doc, "", None).unwrap();
    doc
}

pub fn bench_annotationset(c: &mut Criterion) {
    let mut group = c.benchmark_group("annotationset_add");
    for n in [1_000usize, 10_000] {
        let text = generate_text(n);
        let textlen = text.chars().count();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mut doc = Document::new(text.as_str());
                let set = doc.annset_mut("");
                for i in 0..n {
                    let start = (i * 31) % textlen;
                    let end = (start + (i % 13)).min(textlen);
                    set.add(start, end, "X", None).unwrap();
                }
                black_box(set.len())
            })
        });
    }
    group.finish();

    let doc = tokenized(10_000);
    let set = doc.annset("").unwrap();
    let textlen = doc.textlen();
    c.bench_function("annotationset_overlapping", |b| {
        b.iter(|| {
            let mut total = 0;
            for start in (0..textlen).step_by(97) {
                let query = Span::new(start, (start + 20).min(textlen)).unwrap();
                total += black_box(set.overlapping(&query, true)).len();
            }
            assert!(total > 0);
        })
    });
    c.bench_function("annotationset_within", |b| {
        b.iter(|| {
            let mut total = 0;
            for start in (0..textlen).step_by(97) {
                let query = Span::new(start, (start + 20).min(textlen)).unwrap();
                total += black_box(set.related_iter(SpanRelation::Within, &query)).count();
            }
            assert!(total > 0);
        })
    });
}

pub fn bench_pampac(c: &mut Criterion) {
    let rule = Rule::new(
        Parser::seq(vec![
            Parser::ann("Token").bind("a"),
            Parser::ann("Token")
                .with_feature("string", FeatureOperator::Any)
                .repeat(0, Some(1)),
            Parser::ann("Token").bind("b"),
        ]),
        Action::add_ann("Triple", SpanRef::matched()),
    );
    let pampac = Pampac::new(vec![rule]).with_outset("triples");
    c.bench_function("pampac_token_sequence", |b| {
        b.iter_batched(
            || tokenized(2_000),
            |mut doc| black_box(pampac.run(&mut doc, "", None).unwrap().len()),
            BatchSize::LargeInput,
        )
    });
    let mut group = c.benchmark_group("pampac_annotation_scan");
    let scan = Pampac::new(vec![Rule::new(
        Parser::ann("Token"),
        Action::add_ann("Word", SpanRef::matched()),
    )])
    .with_scan(Scan::Annotations)
    .with_outset("out");
    for n in [2_000usize, 8_000] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter_batched(
                || tokenized(n),
                |mut doc| black_box(scan.run(&mut doc, "", Some(&["Token"][..])).unwrap().len()),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();

    let text = generate_text(2_000);
    let words = Pampac::new(vec![Rule::without_action(Parser::regex(r"[a-z]+ [a-z]+").unwrap())])
        .with_skip(Skip::Next);
    c.bench_function("pampac_text_scan", |b| {
        b.iter_batched(
            || Document::new(text.as_str()),
            |mut doc| black_box(words.run(&mut doc, "", None).unwrap().len()),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_annotationset, bench_pampac);
criterion_main!(benches);
