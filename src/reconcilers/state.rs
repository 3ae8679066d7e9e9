// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Scoped short-circuit signal returned by every unit of reconcile work.
//!
//! Each step of a pass (deletion guard, action executor, phase inference) returns a
//! [`ReconcileState`]. Callers combine results without knowing what each step did and
//! ask [`ReconcileState::should_exit`] whether to stop:
//!
//! - [`ExitScope::None`] - keep going
//! - [`ExitScope::Component`] - stop work on the current component, move on to the next
//! - [`ExitScope::Reconciler`] - abort the whole pass
//!
//! # Example
//!
//! ```rust
//! use wandb_operator::reconcilers::state::{ExitScope, ReconcileState};
//! use std::time::Duration;
//!
//! let state = ReconcileState::none()
//!     .combine(ReconcileState::done_until(ExitScope::Component, Duration::from_secs(30)));
//!
//! assert!(state.should_exit(ExitScope::Component));
//! assert!(!state.should_exit(ExitScope::Reconciler));
//! assert_eq!(state.to_result().unwrap(), Some(Duration::from_secs(30)));
//! ```

use crate::errors::ReconcileError;
use std::time::Duration;

/// How much of the remaining pass a result tells its caller to skip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExitScope {
    /// Continue.
    #[default]
    None,
    /// Skip the rest of the current component.
    Component,
    /// Skip the rest of the pass.
    Reconciler,
}

/// Outcome of one unit of reconcile work.
///
/// `ReconcileState::default()` is the *undone* value: nothing has settled it yet and
/// [`to_result`](Self::to_result) refuses to convert it.
#[derive(Clone, Debug, Default)]
pub struct ReconcileState {
    exit_scope: ExitScope,
    error: Option<ReconcileError>,
    requeue_after: Option<Duration>,
    settled: bool,
}

impl ReconcileState {
    /// Continue with the next unit of work.
    #[must_use]
    pub fn none() -> Self {
        Self {
            settled: true,
            ..Self::default()
        }
    }

    /// Stop every handler at or below `scope`.
    #[must_use]
    pub fn done(scope: ExitScope) -> Self {
        Self {
            exit_scope: scope,
            settled: true,
            ..Self::default()
        }
    }

    /// Stop every handler at or below `scope` and ask to be re-run after `after`.
    #[must_use]
    pub fn done_until(scope: ExitScope, after: Duration) -> Self {
        Self {
            exit_scope: scope,
            requeue_after: Some(after),
            settled: true,
            ..Self::default()
        }
    }

    /// Abort the pass carrying `error`. The caller retries with backoff.
    #[must_use]
    pub fn fail(error: impl Into<ReconcileError>) -> Self {
        Self {
            exit_scope: ExitScope::Reconciler,
            error: Some(error.into()),
            settled: true,
            ..Self::default()
        }
    }

    /// `true` when the result asks callers at `scope` (or narrower) to stop.
    #[must_use]
    pub fn should_exit(&self, scope: ExitScope) -> bool {
        self.exit_scope >= scope
    }

    #[must_use]
    pub fn exit_scope(&self) -> ExitScope {
        self.exit_scope
    }

    #[must_use]
    pub fn error(&self) -> Option<&ReconcileError> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn requeue_after(&self) -> Option<Duration> {
        self.requeue_after
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Merge two results as a parent does with its children's.
    ///
    /// The exit scope is the wider of the two, the first error is kept, and the
    /// earlier requeue wins.
    #[must_use]
    pub fn combine(self, other: ReconcileState) -> ReconcileState {
        let requeue_after = match (self.requeue_after, other.requeue_after) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        ReconcileState {
            exit_scope: self.exit_scope.max(other.exit_scope),
            error: self.error.or(other.error),
            requeue_after,
            settled: self.settled || other.settled,
        }
    }

    /// Convert into the control loop's result.
    ///
    /// # Returns
    ///
    /// The requested requeue delay, or `None` to let the caller pick its default.
    ///
    /// # Errors
    ///
    /// Returns the carried error, or [`ReconcileError::Undone`] when nothing
    /// settled this value.
    pub fn to_result(self) -> Result<Option<Duration>, ReconcileError> {
        if !self.settled {
            return Err(ReconcileError::Undone);
        }
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.requeue_after),
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod state_tests;
