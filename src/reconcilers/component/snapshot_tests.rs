// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `snapshot.rs`

#[cfg(test)]
mod tests {
    use crate::cluster::fake::{object_with, FakeCluster};
    use crate::crd::DeploymentSize;
    use crate::reconcilers::component::snapshot::load_actual;
    use crate::reconcilers::component::{ManagedKind, Snapshot};
    use crate::reconcilers::kinds::{KafkaKind, MysqlKind};
    use k8s_openapi::api::core::v1::Secret;
    use kube::api::ObjectMeta;
    use serde_json::json;

    fn secret(name: &str) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("wandb".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_absent_snapshot() {
        let snapshot = Snapshot::absent();
        assert!(snapshot.is_absent());
        assert!(!snapshot.installed());
        assert!(!snapshot.dependent_installed());
        assert!(!snapshot.secret_installed());
    }

    #[test]
    fn test_installed_follows_primary() {
        let layout = KafkaKind.layout("wandb", DeploymentSize::Dev);
        let dependent_only = Snapshot::absent().with_dependent(layout.dependent.unwrap().new_object());

        assert!(!dependent_only.installed());
        assert!(dependent_only.dependent_installed());
        assert!(!dependent_only.is_absent());

        let installed = dependent_only.with_primary(layout.primary.new_object());
        assert!(installed.installed());
    }

    #[test]
    fn test_secret_alone_is_not_absent() {
        let snapshot = Snapshot::absent().with_secret(secret("wandb-kafka-connection"));
        assert!(!snapshot.installed());
        assert!(snapshot.secret_installed());
        assert!(!snapshot.is_absent());
    }

    #[tokio::test]
    async fn test_load_actual_reads_everything_present() {
        let cluster = FakeCluster::new();
        let layout = KafkaKind.layout("wandb", DeploymentSize::Dev);
        let dependent = layout.dependent.clone().unwrap();
        cluster.insert_object(&layout.primary, object_with(&layout.primary, json!({})));
        cluster.insert_object(&dependent, object_with(&dependent, json!({})));
        cluster.insert_secret("wandb", secret(&layout.secret_name));

        let actual = load_actual(&cluster, &layout).await.unwrap();

        assert!(actual.installed());
        assert!(actual.dependent_installed());
        assert!(actual.secret_installed());
        assert!(cluster.journal().is_empty());
    }

    #[tokio::test]
    async fn test_load_actual_missing_objects_are_absent() {
        let cluster = FakeCluster::new();
        let layout = MysqlKind.layout("wandb", DeploymentSize::Dev);

        let actual = load_actual(&cluster, &layout).await.unwrap();
        assert!(actual.is_absent());
    }

    #[tokio::test]
    async fn test_load_actual_ignores_other_namespaces() {
        let cluster = FakeCluster::new();
        let elsewhere = MysqlKind.layout("other", DeploymentSize::Dev);
        cluster.insert_object(&elsewhere.primary, elsewhere.primary.new_object());

        let actual = load_actual(&cluster, &MysqlKind.layout("wandb", DeploymentSize::Dev))
            .await
            .unwrap();
        assert!(!actual.installed());
    }

    #[tokio::test]
    async fn test_load_actual_propagates_read_failure() {
        let cluster = FakeCluster::new();
        cluster.fail_on("get Secret");
        let layout = MysqlKind.layout("wandb", DeploymentSize::Dev);

        assert!(load_actual(&cluster, &layout).await.is_err());
    }
}
