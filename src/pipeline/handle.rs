// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::engine::RunReport;
use crate::errors::PipelineError;

/// Cooperative stop request for a run.
///
/// Cloneable and cheap; units may capture one to stop their own pipeline.
/// The engine observes it between steps and after each source pull.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    token: CancellationToken,
}

impl CancelSignal {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the run has been asked to stop.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// A run executing on its own tokio task.
///
/// Dropping the handle before the run finishes cancels it. Teardown still
/// completes on the worker task, it just no longer has anyone waiting for it.
#[derive(Debug)]
pub struct RunHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<Result<RunReport, PipelineError>>>,
}

impl RunHandle {
    pub(crate) fn new(
        cancel: CancellationToken,
        task: JoinHandle<Result<RunReport, PipelineError>>,
    ) -> Self {
        Self {
            cancel,
            task: Some(task),
        }
    }

    pub fn cancel_signal(&self) -> CancelSignal {
        CancelSignal::new(self.cancel.clone())
    }

    /// Ask the run to stop at the next step boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the run, including teardown, to finish.
    pub async fn join(mut self) -> Result<RunReport, PipelineError> {
        let joined = match self.task.as_mut() {
            Some(task) => task.await,
            None => {
                return Err(PipelineError::RunAborted {
                    reason: "run was already joined".to_string(),
                })
            }
        };
        self.task = None;

        match joined {
            Ok(result) => result,
            Err(join_error) => Err(PipelineError::RunAborted {
                reason: join_error.to_string(),
            }),
        }
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.cancel.cancel();
        }
    }
}
