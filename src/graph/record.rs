// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt::Debug;

use futures::stream::BoxStream;

use crate::errors::BoxError;

/// Bounds every payload flowing through a pipeline must satisfy.
///
/// `Clone` gives each fan-out target its own copy, `Debug` renders the
/// offending record when a unit fails.
pub trait Payload: Clone + Debug + Send + 'static {}

impl<T: Clone + Debug + Send + 'static> Payload for T {}

/// A payload tagged with the relationship it was emitted on.
///
/// Units usually build records from `(name, payload)` tuples:
///
/// ```
/// use the_pipeworks::Record;
///
/// let record: Record<i64> = ("success", 7).into();
/// assert_eq!(record.relationship, "success");
/// assert_eq!(record.payload, 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<T> {
    pub relationship: String,
    pub payload: T,
}

impl<T> Record<T> {
    pub fn new(relationship: impl Into<String>, payload: T) -> Self {
        Self {
            relationship: relationship.into(),
            payload,
        }
    }

    /// A record on the default `"success"` relationship.
    pub fn success(payload: T) -> Self {
        Self::new(crate::config::consts::DEFAULT_RELATIONSHIP, payload)
    }
}

impl<T, R: Into<String>> From<(R, T)> for Record<T> {
    fn from((relationship, payload): (R, T)) -> Self {
        Self::new(relationship, payload)
    }
}

/// The lazy sequence a source produces when opened.
pub type RecordStream<T> = BoxStream<'static, Result<Record<T>, BoxError>>;
