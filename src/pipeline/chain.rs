// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::DEFAULT_RELATIONSHIP;
use crate::errors::PipelineError;
use crate::graph::{Payload, Processor, UnitId};
use crate::pipeline::Pipeline;

/// Fluent, left-to-right wiring starting from one unit.
///
/// Each `to` connects the current unit to the next one over the pending
/// relationship (`"success"` unless [`via`](Chain::via) picked another) and
/// moves the cursor downstream.
///
/// ```
/// use the_pipeworks::{Pipeline, Processor};
///
/// # fn main() -> Result<(), the_pipeworks::PipelineError> {
/// let mut pipeline = Pipeline::new();
/// let numbers = pipeline.add(Processor::source("numbers", || vec![("success", 4i64)]))?;
/// let halve = pipeline.add(
///     Processor::transform("halve", |x: i64| {
///         if x % 2 == 0 { vec![("success", x / 2)] } else { vec![("failure", x)] }
///     })
///     .emits("failure"),
/// )?;
/// let print = pipeline.add(Processor::sink("print", |x: i64| println!("{x}")))?;
/// let reject = pipeline.add(Processor::sink("reject", |x: i64| eprintln!("odd: {x}")))?;
///
/// pipeline.chain(numbers).to(halve)?.to(print)?;
/// pipeline.chain(halve).via("failure").to(reject)?;
/// # Ok(())
/// # }
/// ```
pub struct Chain<'p, T: Payload> {
    pipeline: &'p mut Pipeline<T>,
    current: UnitId,
    relationship: String,
}

impl<'p, T: Payload> Chain<'p, T> {
    pub(crate) fn new(pipeline: &'p mut Pipeline<T>, start: UnitId) -> Self {
        Self {
            pipeline,
            current: start,
            relationship: DEFAULT_RELATIONSHIP.to_string(),
        }
    }

    /// Use `relationship` for the next connection only.
    pub fn via(mut self, relationship: impl Into<String>) -> Self {
        self.relationship = relationship.into();
        self
    }

    /// Connect the current unit to `downstream` and continue from there.
    pub fn to(self, downstream: UnitId) -> Result<Self, PipelineError> {
        self.pipeline
            .connect_via(self.current, &self.relationship, downstream)?;
        Ok(Self {
            pipeline: self.pipeline,
            current: downstream,
            relationship: DEFAULT_RELATIONSHIP.to_string(),
        })
    }

    /// Add `processor` to the pipeline, then connect to it.
    pub fn then(self, processor: Processor<T>) -> Result<Self, PipelineError> {
        let downstream = self.pipeline.add(processor)?;
        self.to(downstream)
    }

    /// The unit the chain currently points at.
    pub fn id(&self) -> UnitId {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_resets_relationship_after_each_hop() {
        let mut pipeline: Pipeline<i32> = Pipeline::new();
        let src = pipeline.add(Processor::source("src", || vec![("success", 1)])).unwrap();
        let check = pipeline
            .add(Processor::transform("check", |x: i32| [("success", x)]).emits("failure"))
            .unwrap();
        let bad = pipeline.add(Processor::sink("bad", |_x: i32| {})).unwrap();

        let end = pipeline
            .chain(src)
            .to(check)
            .unwrap()
            .via("failure")
            .to(bad)
            .unwrap()
            .id();

        assert_eq!(end, bad);
        let edges = pipeline.edges();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].relationship, "success");
        assert_eq!(edges[1].relationship, "failure");
    }

    #[test]
    fn test_then_adds_and_connects() {
        let mut pipeline: Pipeline<i32> = Pipeline::new();
        let src = pipeline.add(Processor::source("src", || vec![("success", 1)])).unwrap();

        let sink = pipeline
            .chain(src)
            .then(Processor::transform("double", |x: i32| [("success", x * 2)]))
            .unwrap()
            .then(Processor::sink("out", |_x: i32| {}))
            .unwrap()
            .id();

        assert_eq!(sink, UnitId::new(2));
        assert_eq!(pipeline.edges().len(), 2);
    }
}
