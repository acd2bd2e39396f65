// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Processing units: the uniform wrapper around every unit of work.
//!
//! A [`Processor`] is the caller-facing description of a unit (a closure or a
//! stateful task object plus its name and declared relationships). Adding it to
//! a pipeline turns it into a [`ProcessingUnit`] with a stable [`UnitId`].
//!
//! The arity tag is chosen by the constructor: `source*` constructors accept
//! zero-argument callables only, `transform*`/`sink*` constructors accept
//! one-argument callables only, so a mismatch is a compile error rather than a
//! run-time surprise.
//!
//! ```
//! use the_pipeworks::Processor;
//!
//! let numbers: Processor<i64> =
//!     Processor::source("numbers", || vec![("success", 1), ("success", 2)]);
//! let double = Processor::transform("double", |x: i64| [("success", x * 2)]);
//! let print = Processor::sink("print", |x: i64| println!("got {x}"));
//! # let _ = (numbers, double, print);
//! ```

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use futures::FutureExt;

use crate::config::consts::DEFAULT_RELATIONSHIP;
use crate::errors::{BoxError, InvocationStage, UnitExecutionError};
use crate::graph::record::{Payload, Record, RecordStream};
use crate::traits::{SourceTask, TransformTask};

/// Stable identity of a unit within one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(usize);

impl UnitId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether a unit produces records on its own or reacts to inbound ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Zero arguments; invoked once per run to obtain a lazy sequence
    Source,
    /// One argument; invoked once per inbound record
    Transform,
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Source => f.write_str("source"),
            Arity::Transform => f.write_str("transform"),
        }
    }
}

pub(crate) enum UnitBody<T: Payload> {
    Source(Box<dyn SourceTask<T>>),
    Transform(Box<dyn TransformTask<T>>),
}

impl<T: Payload> UnitBody<T> {
    fn arity(&self) -> Arity {
        match self {
            UnitBody::Source(_) => Arity::Source,
            UnitBody::Transform(_) => Arity::Transform,
        }
    }
}

type OpenFn<T> = Box<dyn FnMut() -> Result<RecordStream<T>, BoxError> + Send>;
type ProcessFn<T> = Box<dyn FnMut(T) -> Result<Vec<Record<T>>, BoxError> + Send>;

/// Adapts a zero-argument closure to [`SourceTask`].
struct FnSource<T> {
    open: OpenFn<T>,
}

#[async_trait]
impl<T: Payload> SourceTask<T> for FnSource<T> {
    fn open(&mut self) -> Result<RecordStream<T>, BoxError> {
        (self.open)()
    }
}

/// Adapts a one-argument closure to [`TransformTask`].
struct FnTransform<T> {
    process: ProcessFn<T>,
}

#[async_trait]
impl<T: Payload> TransformTask<T> for FnTransform<T> {
    fn process(&mut self, input: T) -> Result<Vec<Record<T>>, BoxError> {
        (self.process)(input)
    }
}

/// Caller-facing description of a unit, ready to be added to a pipeline.
pub struct Processor<T: Payload> {
    name: String,
    body: UnitBody<T>,
    emits: BTreeSet<String>,
    terminal: bool,
}

impl<T: Payload> Processor<T> {
    fn with_body(name: impl Into<String>, body: UnitBody<T>) -> Self {
        Self {
            name: name.into(),
            body,
            emits: BTreeSet::from([DEFAULT_RELATIONSHIP.to_string()]),
            terminal: false,
        }
    }

    /// Wrap a zero-argument callable returning any iterable of `(relationship, payload)` pairs.
    ///
    /// The iterator is pulled lazily, one element per engine step, so it may be infinite.
    pub fn source<F, I, R>(name: impl Into<String>, mut f: F) -> Self
    where
        F: FnMut() -> I + Send + 'static,
        I: IntoIterator<Item = R>,
        I::IntoIter: Send + 'static,
        R: Into<Record<T>> + 'static,
    {
        let open: OpenFn<T> = Box::new(move || {
            let records = f()
                .into_iter()
                .map(|r| Ok::<Record<T>, BoxError>(r.into()));
            Ok(stream::iter(records).boxed())
        });
        Self::from_source_task(name, FnSource { open })
    }

    /// Like [`Processor::source`], but each element may be an error, which fails the run.
    pub fn try_source<F, I, R, E>(name: impl Into<String>, mut f: F) -> Self
    where
        F: FnMut() -> I + Send + 'static,
        I: IntoIterator<Item = Result<R, E>>,
        I::IntoIter: Send + 'static,
        R: Into<Record<T>> + 'static,
        E: Into<BoxError> + 'static,
    {
        let open: OpenFn<T> = Box::new(move || {
            let records = f().into_iter().map(|item| -> Result<Record<T>, BoxError> {
                item.map(Into::into).map_err(Into::into)
            });
            Ok(stream::iter(records).boxed())
        });
        Self::from_source_task(name, FnSource { open })
    }

    /// Wrap a zero-argument callable returning an asynchronous stream.
    ///
    /// Pulling from the stream is the only point where the engine suspends.
    pub fn stream_source<F, S, R, E>(name: impl Into<String>, mut f: F) -> Self
    where
        F: FnMut() -> S + Send + 'static,
        S: Stream<Item = Result<R, E>> + Send + 'static,
        R: Into<Record<T>> + 'static,
        E: Into<BoxError> + 'static,
    {
        let open: OpenFn<T> = Box::new(move || {
            Ok(f()
                .map(|item| -> Result<Record<T>, BoxError> {
                    item.map(Into::into).map_err(Into::into)
                })
                .boxed())
        });
        Self::from_source_task(name, FnSource { open })
    }

    /// Wrap a one-argument callable returning zero or more `(relationship, payload)` pairs.
    pub fn transform<F, I, R>(name: impl Into<String>, mut f: F) -> Self
    where
        F: FnMut(T) -> I + Send + 'static,
        I: IntoIterator<Item = R>,
        R: Into<Record<T>>,
    {
        let process: ProcessFn<T> =
            Box::new(move |input| Ok(f(input).into_iter().map(Into::<Record<T>>::into).collect()));
        Self::from_transform_task(name, FnTransform { process })
    }

    /// Like [`Processor::transform`], but the callable may fail.
    pub fn try_transform<F, I, R, E>(name: impl Into<String>, mut f: F) -> Self
    where
        F: FnMut(T) -> Result<I, E> + Send + 'static,
        I: IntoIterator<Item = R>,
        R: Into<Record<T>>,
        E: Into<BoxError>,
    {
        let process: ProcessFn<T> = Box::new(move |input| {
            f(input)
                .map(|outputs| outputs.into_iter().map(Into::<Record<T>>::into).collect())
                .map_err(Into::into)
        });
        Self::from_transform_task(name, FnTransform { process })
    }

    /// A terminal transform that consumes records and emits nothing.
    pub fn sink<F>(name: impl Into<String>, mut f: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        let process: ProcessFn<T> = Box::new(move |input| {
            f(input);
            Ok(Vec::new())
        });
        Self::from_transform_task(name, FnTransform { process }).into_sink()
    }

    pub fn try_sink<F, E>(name: impl Into<String>, mut f: F) -> Self
    where
        F: FnMut(T) -> Result<(), E> + Send + 'static,
        E: Into<BoxError>,
    {
        let process: ProcessFn<T> =
            Box::new(move |input| f(input).map(|_| Vec::new()).map_err(Into::into));
        Self::from_transform_task(name, FnTransform { process }).into_sink()
    }

    /// Wrap a stateful source object with its own setup/teardown.
    pub fn from_source_task(name: impl Into<String>, task: impl SourceTask<T> + 'static) -> Self {
        Self::with_body(name, UnitBody::Source(Box::new(task)))
    }

    /// Wrap a stateful transform object with its own setup/teardown.
    pub fn from_transform_task(
        name: impl Into<String>,
        task: impl TransformTask<T> + 'static,
    ) -> Self {
        Self::with_body(name, UnitBody::Transform(Box::new(task)))
    }

    fn into_sink(mut self) -> Self {
        self.emits.clear();
        self.terminal = true;
        self
    }

    /// Declare another relationship this unit may emit.
    pub fn emits(mut self, relationship: impl Into<String>) -> Self {
        self.emits.insert(relationship.into());
        self
    }

    /// Allow declared relationships to stay unconnected.
    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.body.arity()
    }

    pub(crate) fn into_unit(self, id: UnitId) -> ProcessingUnit<T> {
        ProcessingUnit {
            id,
            name: self.name,
            body: self.body,
            emits: self.emits,
            terminal: self.terminal,
        }
    }

    /// Run setup and hand back the bare unit for use outside a pipeline.
    ///
    /// The caller owns the lifecycle from here on and should call
    /// [`ProcessingUnit::teardown`] when done.
    pub async fn standalone(self) -> Result<ProcessingUnit<T>, UnitExecutionError> {
        let mut unit = self.into_unit(UnitId::new(0));
        unit.setup().await?;
        Ok(unit)
    }
}

impl<T: Payload> fmt::Debug for Processor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("name", &self.name)
            .field("arity", &self.arity())
            .field("emits", &self.emits)
            .field("terminal", &self.terminal)
            .finish()
    }
}

/// Convert a caught panic payload into a unit failure cause.
pub(crate) fn panic_error(payload: Box<dyn Any + Send>) -> BoxError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    format!("panicked: {message}").into()
}

/// A unit owned by a pipeline graph, addressed by its [`UnitId`].
pub struct ProcessingUnit<T: Payload> {
    id: UnitId,
    name: String,
    body: UnitBody<T>,
    emits: BTreeSet<String>,
    terminal: bool,
}

impl<T: Payload> ProcessingUnit<T> {
    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.body.arity()
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Relationship names this unit declared, in sorted order.
    pub fn emits(&self) -> impl Iterator<Item = &str> {
        self.emits.iter().map(String::as_str)
    }

    pub fn declares(&self, relationship: &str) -> bool {
        self.emits.contains(relationship)
    }

    fn failure(
        &self,
        stage: InvocationStage,
        input: Option<String>,
        source: BoxError,
    ) -> UnitExecutionError {
        UnitExecutionError {
            unit_id: self.id,
            unit: self.name.clone(),
            stage,
            input,
            source,
        }
    }

    fn arity_mismatch(&self, stage: InvocationStage, expected: Arity) -> UnitExecutionError {
        self.failure(
            stage,
            None,
            format!("expected a {} unit, found a {}", expected, self.arity()).into(),
        )
    }

    pub async fn setup(&mut self) -> Result<(), UnitExecutionError> {
        let result = match &mut self.body {
            UnitBody::Source(task) => AssertUnwindSafe(task.setup()).catch_unwind().await,
            UnitBody::Transform(task) => AssertUnwindSafe(task.setup()).catch_unwind().await,
        };
        result
            .unwrap_or_else(|payload| Err(panic_error(payload)))
            .map_err(|source| self.failure(InvocationStage::Setup, None, source))
    }

    pub async fn teardown(&mut self) -> Result<(), UnitExecutionError> {
        let result = match &mut self.body {
            UnitBody::Source(task) => AssertUnwindSafe(task.teardown()).catch_unwind().await,
            UnitBody::Transform(task) => AssertUnwindSafe(task.teardown()).catch_unwind().await,
        };
        result
            .unwrap_or_else(|payload| Err(panic_error(payload)))
            .map_err(|source| self.failure(InvocationStage::Teardown, None, source))
    }

    /// Invoke a source to obtain its lazy sequence.
    pub fn open(&mut self) -> Result<RecordStream<T>, UnitExecutionError> {
        let result = match &mut self.body {
            UnitBody::Source(task) => panic::catch_unwind(AssertUnwindSafe(|| task.open()))
                .unwrap_or_else(|payload| Err(panic_error(payload))),
            UnitBody::Transform(_) => {
                return Err(self.arity_mismatch(InvocationStage::Open, Arity::Source))
            }
        };
        result.map_err(|source| self.failure(InvocationStage::Open, None, source))
    }

    /// Invoke a transform or sink with one record.
    ///
    /// A panic in the wrapped callable is reported like any other failure.
    /// The input is copied up front because a failure must name the record
    /// that caused it and `process` consumes it.
    pub fn invoke(&mut self, input: T) -> Result<Vec<Record<T>>, UnitExecutionError> {
        let context = input.clone();
        let result = match &mut self.body {
            UnitBody::Transform(task) => panic::catch_unwind(AssertUnwindSafe(|| task.process(input)))
                .unwrap_or_else(|payload| Err(panic_error(payload))),
            UnitBody::Source(_) => {
                return Err(self.arity_mismatch(InvocationStage::Invoke, Arity::Transform))
            }
        };
        result.map_err(|source| {
            self.failure(InvocationStage::Invoke, Some(format!("{:?}", context)), source)
        })
    }

    /// Wrap a failed pull from this unit's source stream.
    pub(crate) fn pull_failure(&self, source: BoxError) -> UnitExecutionError {
        self.failure(InvocationStage::Pull, None, source)
    }
}

impl<T: Payload> fmt::Debug for ProcessingUnit<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingUnit")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("arity", &self.arity())
            .field("emits", &self.emits)
            .field("terminal", &self.terminal)
            .finish()
    }
}
