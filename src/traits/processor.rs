// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::errors::BoxError;
use crate::graph::{Record, RecordStream};

/// A zero-argument unit of work: produces a lazy, possibly infinite sequence.
///
/// `open` is called once per run. The returned stream is the only thing the
/// engine pulls from; a source is restarted by opening it again, never by
/// rewinding.
#[async_trait]
pub trait SourceTask<T: Send + 'static>: Send {
    /// Acquire resources (connections, files) before the first pull.
    async fn setup(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Release resources. Called on every exit path of a run that ran `setup`.
    async fn teardown(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    fn open(&mut self) -> Result<RecordStream<T>, BoxError>;
}

/// A one-argument unit of work, invoked once per inbound record.
///
/// `process` must return every output for that input before returning; the
/// engine never calls it re-entrantly.
#[async_trait]
pub trait TransformTask<T: Send + 'static>: Send {
    async fn setup(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    async fn teardown(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    fn process(&mut self, input: T) -> Result<Vec<Record<T>>, BoxError>;
}
