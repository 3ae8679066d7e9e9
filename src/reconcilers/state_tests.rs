// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `state.rs`

#[cfg(test)]
mod tests {
    use super::super::{ExitScope, ReconcileState};
    use crate::crd::Component;
    use crate::errors::{ReconcileError, ValidationError};
    use std::time::Duration;

    fn validation_error() -> ValidationError {
        ValidationError::InvalidReplicas {
            component: Component::Kafka,
            replicas: -1,
        }
    }

    fn samples() -> Vec<ReconcileState> {
        vec![
            ReconcileState::default(),
            ReconcileState::none(),
            ReconcileState::done(ExitScope::Component),
            ReconcileState::done(ExitScope::Reconciler),
            ReconcileState::done_until(ExitScope::Component, Duration::from_secs(30)),
            ReconcileState::done_until(ExitScope::Reconciler, Duration::from_secs(5)),
            ReconcileState::fail(validation_error()),
        ]
    }

    #[test]
    fn test_scope_ordering() {
        assert!(ExitScope::None < ExitScope::Component);
        assert!(ExitScope::Component < ExitScope::Reconciler);
    }

    #[test]
    fn test_undone_to_result_fails_loudly() {
        let result = ReconcileState::default().to_result();
        assert!(
            matches!(result, Err(ReconcileError::Undone)),
            "undone state must not convert into an empty result"
        );
    }

    #[test]
    fn test_none_continues() {
        let state = ReconcileState::none();
        assert!(!state.should_exit(ExitScope::Component));
        assert!(!state.should_exit(ExitScope::Reconciler));
        assert!(state.should_exit(ExitScope::None));
        assert_eq!(state.to_result().unwrap(), None);
    }

    #[test]
    fn test_done_component_stops_only_component() {
        let state = ReconcileState::done(ExitScope::Component);
        assert!(state.should_exit(ExitScope::Component));
        assert!(!state.should_exit(ExitScope::Reconciler));
    }

    #[test]
    fn test_done_until_carries_requeue() {
        let state = ReconcileState::done_until(ExitScope::Component, Duration::from_secs(30));
        assert_eq!(state.requeue_after(), Some(Duration::from_secs(30)));
        assert_eq!(state.to_result().unwrap(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_fail_is_reconciler_scope_with_error() {
        let state = ReconcileState::fail(validation_error());
        assert!(state.should_exit(ExitScope::Reconciler));
        assert!(state.error().is_some());

        let err = state.to_result().unwrap_err();
        assert!(matches!(err, ReconcileError::Validation(_)));
    }

    #[test]
    fn test_combine_never_decreases_scope() {
        for a in samples() {
            for b in samples() {
                let expected = a.exit_scope().max(b.exit_scope());
                let a_scope = a.exit_scope();
                let b_scope = b.exit_scope();
                let combined = a.clone().combine(b.clone());
                assert!(combined.exit_scope() >= a_scope);
                assert!(combined.exit_scope() >= b_scope);
                assert_eq!(combined.exit_scope(), expected);
            }
        }
    }

    #[test]
    fn test_combine_keeps_first_error() {
        let first = ReconcileState::fail(validation_error());
        let second = ReconcileState::fail(ValidationError::BackupNotSupported {
            component: Component::Redis,
        });

        let combined = first.combine(second);
        assert!(matches!(
            combined.error(),
            Some(ReconcileError::Validation(ValidationError::InvalidReplicas { .. }))
        ));
    }

    #[test]
    fn test_combine_takes_earliest_requeue() {
        let combined = ReconcileState::done_until(ExitScope::Component, Duration::from_secs(120))
            .combine(ReconcileState::none())
            .combine(ReconcileState::done_until(
                ExitScope::Component,
                Duration::from_secs(30),
            ));

        assert_eq!(combined.requeue_after(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_combining_into_undone_settles() {
        let combined = ReconcileState::default().combine(ReconcileState::none());
        assert!(combined.is_settled());
        assert_eq!(combined.to_result().unwrap(), None);
    }
}
