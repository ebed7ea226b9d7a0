//! These benches measure parsing a deeply nested identifier, and rewriting a
//! document that repeats a large number of identifiers.

#![allow(missing_docs)]

use std::{fmt::Write as _, hint::black_box};

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use tsid::{Config, Document, Parser};

const NESTED: &str = "((A1.1.2)/(R-r)).4.1";

/// Generates a document defining and then linking many identifiers
fn preseed_document() -> String {
    let mut text = String::new();
    for i in 1..=99 {
        writeln!(text, "**A{i}-x.{i}**: definition {i}").unwrap();
        writeln!(text, "**(B{i}/C{i})-y**: answer {i}").unwrap();
    }
    for i in 1..=99 {
        writeln!(text, "see **A{i}-x.{i}** and **(B{i}/C{i})-y**").unwrap();
    }
    text
}

fn parse_nested(c: &mut Criterion) {
    c.bench_function("parse nested identifier", |b| {
        // a fresh parser per iteration keeps the cache out of the measurement
        b.iter_batched(
            Parser::default,
            |parser| parser.parse(black_box(NESTED)).unwrap(),
            BatchSize::SmallInput,
        );
    });
}

fn substitute_document(c: &mut Criterion) {
    let text = preseed_document();
    c.bench_function("substitute document", |b| {
        b.iter(|| {
            Document::new(black_box(text.as_str()), &Config::default())
                .unwrap()
                .substitute()
                .unwrap()
        });
    });
}

criterion_group!(benches, parse_nested, substitute_document);
criterion_main!(benches);
