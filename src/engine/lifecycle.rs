// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Setup and teardown of the units a worker owns.
//!
//! Setup runs in ascending id order and stops at the first failure; teardown
//! runs in reverse over exactly the units whose setup succeeded.

use crate::engine::plan::UnitTable;
use crate::errors::UnitExecutionError;
use crate::graph::{Payload, UnitId};
use crate::observability::messages::unit::{TeardownFailed, UnitFailed};
use crate::observability::messages::StructuredLog;

/// Set up every unit in `units`.
///
/// On failure the units already set up are torn down (their teardown errors
/// are logged and suppressed) and the setup error is returned.
pub(crate) async fn setup_all<T: Payload>(
    units: &mut UnitTable<T>,
) -> Result<Vec<UnitId>, UnitExecutionError> {
    let mut set_up = Vec::new();

    for id in units.ids() {
        let Some(unit) = units.get_mut(id) else {
            continue;
        };
        if let Err(error) = unit.setup().await {
            UnitFailed { error: &error }.log();
            // suppressed teardown always returns Ok
            let _ = teardown_all(units, &set_up, true).await;
            return Err(error);
        }
        set_up.push(id);
    }

    Ok(set_up)
}

/// Tear down `set_up` in reverse order.
///
/// Every unit gets its teardown even if an earlier one fails. The first
/// failure is returned unless `suppress` is set, in which case failures are
/// only logged.
pub(crate) async fn teardown_all<T: Payload>(
    units: &mut UnitTable<T>,
    set_up: &[UnitId],
    suppress: bool,
) -> Result<(), UnitExecutionError> {
    let mut first_error = None;

    for &id in set_up.iter().rev() {
        let Some(unit) = units.get_mut(id) else {
            continue;
        };
        if let Err(error) = unit.teardown().await {
            TeardownFailed {
                error: &error,
                suppressed: suppress,
            }
            .log();
            if !suppress && first_error.is_none() {
                first_error = Some(error);
            }
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{BoxError, InvocationStage};
    use crate::graph::{PipelineGraph, Processor, Record, DEFAULT_RELATIONSHIP};
    use crate::traits::TransformTask;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct Tracked {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail_setup: bool,
        fail_teardown: bool,
    }

    #[async_trait]
    impl TransformTask<i32> for Tracked {
        async fn setup(&mut self) -> Result<(), BoxError> {
            self.log.lock().unwrap().push(format!("setup {}", self.name));
            if self.fail_setup {
                return Err("no connection".into());
            }
            Ok(())
        }

        async fn teardown(&mut self) -> Result<(), BoxError> {
            self.log.lock().unwrap().push(format!("teardown {}", self.name));
            if self.fail_teardown {
                return Err("close failed".into());
            }
            Ok(())
        }

        fn process(&mut self, input: i32) -> Result<Vec<Record<i32>>, BoxError> {
            Ok(vec![Record::success(input)])
        }
    }

    fn table(
        log: &Arc<Mutex<Vec<String>>>,
        fail_setup: Option<&'static str>,
        fail_teardown: Option<&'static str>,
    ) -> UnitTable<i32> {
        let mut graph = PipelineGraph::<i32>::new();
        let src = graph.add(Processor::source("src", || vec![("success", 1)]));
        let mut previous = src;
        for name in ["a", "b", "c"] {
            let processor = Processor::from_transform_task(
                name,
                Tracked {
                    name,
                    log: Arc::clone(log),
                    fail_setup: fail_setup == Some(name),
                    fail_teardown: fail_teardown == Some(name),
                },
            );
            let processor = if name == "c" { processor.terminal() } else { processor };
            let id = graph.add(processor);
            graph.connect(previous, DEFAULT_RELATIONSHIP, id).unwrap();
            previous = id;
        }
        let (units, _) = graph.freeze().unwrap();
        UnitTable::new(units)
    }

    #[tokio::test]
    async fn test_teardown_reverses_setup_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut units = table(&log, None, None);

        let set_up = setup_all(&mut units).await.unwrap();
        teardown_all(&mut units, &set_up, false).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["setup a", "setup b", "setup c", "teardown c", "teardown b", "teardown a"]
        );
    }

    #[tokio::test]
    async fn test_setup_failure_tears_down_only_units_set_up() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut units = table(&log, Some("b"), None);

        let error = setup_all(&mut units).await.unwrap_err();

        assert_eq!(error.stage, InvocationStage::Setup);
        assert_eq!(error.unit, "b");
        assert_eq!(*log.lock().unwrap(), vec!["setup a", "setup b", "teardown a"]);
    }

    #[tokio::test]
    async fn test_teardown_continues_past_failures() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut units = table(&log, None, Some("c"));

        let set_up = setup_all(&mut units).await.unwrap();
        let error = teardown_all(&mut units, &set_up, false).await.unwrap_err();

        assert_eq!(error.stage, InvocationStage::Teardown);
        assert_eq!(log.lock().unwrap().last().map(String::as_str), Some("teardown a"));
    }

    #[tokio::test]
    async fn test_suppressed_teardown_failure_is_not_returned() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut units = table(&log, None, Some("a"));

        let set_up = setup_all(&mut units).await.unwrap();
        assert!(teardown_all(&mut units, &set_up, true).await.is_ok());
    }
}
