// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `drift.rs`

#[cfg(test)]
mod tests {
    use crate::cluster::fake::{owner, spec_with};
    use crate::crd::{Component, ComponentStatus, DeploymentSize, WeightsAndBiases};
    use crate::reconcilers::component::desired::build_desired;
    use crate::reconcilers::component::drift::{select_action, Action};
    use crate::reconcilers::component::{Layout, ManagedKind, Snapshot};
    use crate::reconcilers::kinds::{KafkaKind, RedisKind};
    use k8s_openapi::api::core::v1::Secret;
    use kube::api::ObjectMeta;

    fn secret(layout: &Layout) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some(layout.secret_name.clone()),
                namespace: Some(layout.namespace().to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn kafka_layout() -> Layout {
        KafkaKind.layout("wandb", DeploymentSize::Dev)
    }

    /// Every Kafka object present, as rendered.
    fn kafka_everything() -> Snapshot {
        let layout = kafka_layout();
        Snapshot::absent()
            .with_primary(layout.primary.new_object())
            .with_dependent(layout.dependent.clone().unwrap().new_object())
            .with_secret(secret(&layout))
    }

    /// Apply `action` to a simulated cluster.
    fn apply(action: &Action, actual: &Snapshot, recorded: &mut ComponentStatus) -> Snapshot {
        let mut primary = actual.primary().cloned();
        let mut dependent = actual.dependent().cloned();
        let mut secret = actual.secret().cloned();
        match action {
            Action::CreateDependent { object, .. } => dependent = Some(object.clone()),
            Action::DeleteDependent { .. } => dependent = None,
            Action::DeleteSecret { .. } => secret = None,
            Action::DeletePrimary { .. } => primary = None,
            Action::CreatePrimary { object, .. } => primary = Some(object.clone()),
            Action::CreateSecret { secret: created } => secret = Some(created.clone()),
            Action::UpdateStatus { observed } => {
                recorded.ready = observed.ready;
                recorded.state = observed.state.clone();
            }
        }
        Snapshot::new(primary, dependent, secret)
    }

    /// Run passes until converged, returning the action names taken.
    fn converge(kind: &dyn ManagedKind, owner: &WeightsAndBiases, actual: &mut Snapshot) -> Vec<&'static str> {
        let layout = kind.layout("wandb", owner.spec.size);
        let mut recorded = ComponentStatus::default();
        let mut taken = Vec::new();
        for _ in 0..10 {
            let desired = build_desired(kind, owner, actual).unwrap();
            match select_action(kind, &layout, &desired, actual, &recorded) {
                Some(action) => {
                    taken.push(action.name());
                    *actual = apply(&action, actual, &mut recorded);
                }
                None => return taken,
            }
        }
        panic!("no convergence after 10 passes: {taken:?}");
    }

    #[test]
    fn test_creation_starts_with_dependent() {
        let owner = owner(spec_with(DeploymentSize::Dev, &[Component::Kafka]));
        let desired = build_desired(&KafkaKind, &owner, &Snapshot::absent()).unwrap();

        let action = select_action(
            &KafkaKind,
            &kafka_layout(),
            &desired,
            &Snapshot::absent(),
            &ComponentStatus::default(),
        );
        assert!(matches!(action, Some(Action::CreateDependent { .. })));
    }

    #[test]
    fn test_primary_follows_dependent() {
        let owner = owner(spec_with(DeploymentSize::Dev, &[Component::Kafka]));
        let layout = kafka_layout();
        let actual = Snapshot::absent().with_dependent(layout.dependent.clone().unwrap().new_object());
        let desired = build_desired(&KafkaKind, &owner, &actual).unwrap();

        let action = select_action(&KafkaKind, &layout, &desired, &actual, &ComponentStatus::default());
        assert!(matches!(action, Some(Action::CreatePrimary { .. })));
    }

    #[test]
    fn test_teardown_deletes_secret_first() {
        let action = select_action(
            &KafkaKind,
            &kafka_layout(),
            &Snapshot::absent(),
            &kafka_everything(),
            &ComponentStatus::default(),
        );
        match action {
            Some(Action::DeleteSecret { namespace, name }) => {
                assert_eq!(namespace, "wandb");
                assert_eq!(name, "wandb-kafka-connection");
            }
            other => panic!("expected DeleteSecret, got {other:?}"),
        }
    }

    #[test]
    fn test_dependent_waits_for_primary_removal() {
        let layout = kafka_layout();
        let actual = Snapshot::absent()
            .with_primary(layout.primary.new_object())
            .with_dependent(layout.dependent.clone().unwrap().new_object());

        let action = select_action(
            &KafkaKind,
            &layout,
            &Snapshot::absent(),
            &actual,
            &ComponentStatus::default(),
        );
        assert!(matches!(action, Some(Action::DeletePrimary { .. })));
    }

    #[test]
    fn test_dependent_removed_last() {
        let layout = kafka_layout();
        let actual = Snapshot::absent().with_dependent(layout.dependent.clone().unwrap().new_object());

        let action = select_action(
            &KafkaKind,
            &layout,
            &Snapshot::absent(),
            &actual,
            &ComponentStatus::default(),
        );
        assert!(matches!(action, Some(Action::DeleteDependent { .. })));
    }

    #[test]
    fn test_unwanted_dependent_removed_beside_live_primary() {
        let layout = kafka_layout();
        let desired = Snapshot::absent().with_primary(layout.primary.new_object());
        let actual = Snapshot::absent()
            .with_primary(layout.primary.new_object())
            .with_dependent(layout.dependent.clone().unwrap().new_object());

        let action = select_action(&KafkaKind, &layout, &desired, &actual, &ComponentStatus::default());
        assert!(matches!(action, Some(Action::DeleteDependent { .. })));
    }

    #[test]
    fn test_orphaned_secret_is_deleted() {
        let layout = kafka_layout();
        let actual = Snapshot::absent().with_secret(secret(&layout));

        let action = select_action(
            &KafkaKind,
            &layout,
            &Snapshot::absent(),
            &actual,
            &ComponentStatus::default(),
        );
        assert!(matches!(action, Some(Action::DeleteSecret { .. })));
    }

    #[test]
    fn test_status_update_when_observation_differs() {
        let layout = RedisKind.layout("wandb", DeploymentSize::Dev);
        let actual = Snapshot::absent();
        let recorded = ComponentStatus {
            ready: true,
            state: "ready".to_string(),
            ..Default::default()
        };

        match select_action(&RedisKind, &layout, &Snapshot::absent(), &actual, &recorded) {
            Some(Action::UpdateStatus { observed }) => {
                assert!(!observed.ready);
                assert_eq!(observed.state, "NotInstalled");
            }
            other => panic!("expected UpdateStatus, got {other:?}"),
        }
    }

    #[test]
    fn test_converged_selects_nothing() {
        let layout = RedisKind.layout("wandb", DeploymentSize::Dev);
        let recorded = ComponentStatus {
            ready: false,
            state: "NotInstalled".to_string(),
            ..Default::default()
        };

        assert!(select_action(
            &RedisKind,
            &layout,
            &Snapshot::absent(),
            &Snapshot::absent(),
            &recorded
        )
        .is_none());
    }

    #[test]
    fn test_redis_converges_in_order() {
        let owner = owner(spec_with(DeploymentSize::Dev, &[Component::Redis]));
        let mut actual = Snapshot::absent();

        let taken = converge(&RedisKind, &owner, &mut actual);

        assert_eq!(taken, vec!["create_primary", "create_secret", "update_status"]);
        assert!(actual.installed());
        assert!(actual.secret_installed());
    }

    #[test]
    fn test_disable_tears_down_in_reverse_order() {
        let enabled = owner(spec_with(DeploymentSize::Small, &[Component::Redis]));
        let mut actual = Snapshot::absent();
        let created = converge(&RedisKind, &enabled, &mut actual);
        assert_eq!(
            created,
            vec!["create_dependent", "create_primary", "create_secret", "update_status"]
        );

        let disabled = owner(spec_with(DeploymentSize::Small, &[]));
        let removed = converge(&RedisKind, &disabled, &mut actual);

        assert_eq!(
            removed,
            vec!["delete_secret", "delete_primary", "delete_dependent", "update_status"]
        );
        assert!(actual.is_absent());
    }

    #[test]
    fn test_converged_state_is_stable() {
        let owner = owner(spec_with(DeploymentSize::Dev, &[Component::Redis]));
        let mut actual = Snapshot::absent();
        converge(&RedisKind, &owner, &mut actual);

        assert!(converge(&RedisKind, &owner, &mut actual).len() <= 1);
    }
}
