// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Smallest useful pipeline: one pair of numbers, summed and printed.
//!
//! ```text
//! cargo run --example sum_pair -- 3 4
//! ```

use std::env;

use anyhow::Context;
use the_pipeworks::observability::init_tracing;
use the_pipeworks::{Pipeline, Processor};

#[derive(Debug, Clone)]
enum Value {
    Pair(i64, i64),
    Sum(i64),
}

fn parse_arg(args: &[String], index: usize, default: i64) -> anyhow::Result<i64> {
    match args.get(index) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("argument {index} is not an integer: {raw:?}")),
        None => Ok(default),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let args: Vec<String> = env::args().collect();
    let left = parse_arg(&args, 1, 3)?;
    let right = parse_arg(&args, 2, 4)?;

    let mut pipeline = Pipeline::new();
    let pairs = pipeline.add(Processor::source("pairs", move || {
        vec![("success", Value::Pair(left, right))]
    }))?;
    let add = pipeline.add(Processor::transform("sum_pair", |value: Value| match value {
        Value::Pair(a, b) => vec![("success", Value::Sum(a + b))],
        Value::Sum(_) => Vec::new(),
    }))?;
    let print = pipeline.add(Processor::sink("print", |value: Value| {
        if let Value::Sum(sum) = value {
            println!("the result is {sum}");
        }
    }))?;

    pipeline.chain(pairs).to(add)?.to(print)?;

    let report = pipeline.run().await?;
    println!(
        "{} after {} steps in {:?}",
        report.outcome, report.steps, report.elapsed
    );
    Ok(())
}
