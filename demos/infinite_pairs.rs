// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Two unbounded sources, two arithmetic transforms with a failure path each.
//!
//! Words can be added (concatenated) but not subtracted, so every word pair
//! ends up on `minus`'s failure relationship. Stops after `budget` printed
//! results or on Ctrl-C.
//!
//! ```text
//! RUST_LOG=debug cargo run --example infinite_pairs -- 50
//! ```

use std::env;
use std::fmt;

use anyhow::Context;
use rand::distributions::Alphanumeric;
use rand::Rng;
use the_pipeworks::observability::init_tracing;
use the_pipeworks::{Pipeline, Processor};
use tracing::{error, info};

#[derive(Debug, Clone)]
enum Operand {
    Number(i64),
    Word(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Number(n) => write!(f, "{n}"),
            Operand::Word(w) => write!(f, "{w:?}"),
        }
    }
}

#[derive(Debug, Clone)]
enum Item {
    Pair(Operand, Operand),
    Result(Operand),
}

fn random_word(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .map(|b| char::from(b).to_ascii_lowercase())
        .filter(char::is_ascii_lowercase)
        .take(len)
        .collect()
}

fn number_pairs() -> impl Iterator<Item = (&'static str, Item)> {
    std::iter::repeat_with(|| {
        let mut rng = rand::thread_rng();
        let a = Operand::Number(rng.gen_range(1..=100));
        let b = Operand::Number(rng.gen_range(1..=100));
        ("success", Item::Pair(a, b))
    })
}

fn word_pairs() -> impl Iterator<Item = (&'static str, Item)> {
    std::iter::repeat_with(|| {
        let a = Operand::Word(random_word(8));
        let b = Operand::Word(random_word(8));
        ("success", Item::Pair(a, b))
    })
}

fn add(item: Item) -> Vec<(&'static str, Item)> {
    match item {
        Item::Pair(Operand::Number(a), Operand::Number(b)) => {
            vec![("success", Item::Result(Operand::Number(a + b)))]
        }
        Item::Pair(Operand::Word(a), Operand::Word(b)) => {
            vec![("success", Item::Result(Operand::Word(a + &b)))]
        }
        other => vec![("failure", other)],
    }
}

fn minus(item: Item) -> Vec<(&'static str, Item)> {
    match item {
        Item::Pair(Operand::Number(a), Operand::Number(b)) => {
            vec![("success", Item::Result(Operand::Number(a - b)))]
        }
        other => vec![("failure", other)],
    }
}

fn log_failure(verb: &'static str) -> impl FnMut(Item) + Send + 'static {
    move |item| {
        if let Item::Pair(a, b) = item {
            error!("could not {verb} {a} and {b}");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let budget: u64 = match env::args().nth(1) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("budget is not a number: {raw:?}"))?,
        None => 20,
    };

    let mut pipeline = Pipeline::new();
    let numbers = pipeline.add(Processor::source("numbers", number_pairs))?;
    let words = pipeline.add(Processor::source("words", word_pairs))?;
    let add_nums = pipeline.add(Processor::transform("add", add).emits("failure"))?;
    let minus_nums = pipeline.add(Processor::transform("minus", minus).emits("failure"))?;

    let stop = pipeline.cancel_signal();
    let mut printed = 0u64;
    let on_success = pipeline.add(Processor::sink("print", move |item: Item| {
        if let Item::Result(value) = item {
            println!("the result is {value}");
            printed += 1;
            if printed >= budget {
                stop.cancel();
            }
        }
    }))?;
    let on_add_failure = pipeline.add(Processor::sink("add_failure", log_failure("add")))?;
    let on_minus_failure = pipeline.add(Processor::sink("minus_failure", log_failure("subtract")))?;

    pipeline.funnel([numbers, words], add_nums)?;
    pipeline.funnel([numbers, words], minus_nums)?;
    pipeline.funnel([add_nums, minus_nums], on_success)?;
    pipeline.connect_via(add_nums, "failure", on_add_failure)?;
    pipeline.connect_via(minus_nums, "failure", on_minus_failure)?;

    let handle = pipeline.spawn()?;
    let ctrl_c = handle.cancel_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let report = handle.join().await?;
    info!(
        outcome = %report.outcome,
        steps = report.steps,
        pulled = report.records_pulled,
        "pipeline stopped"
    );
    Ok(())
}
