// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `cluster.rs`

#[cfg(test)]
mod tests {
    use super::super::{is_conflict, is_not_found, map_error, status_patch, CustomKind, ObjectKey};
    use crate::cluster::fake::{owner, spec_with};
    use crate::crd::{Component, DeploymentPhase, DeploymentSize};
    use crate::errors::ClusterError;

    const KAFKA: CustomKind = CustomKind {
        group: "kafka.strimzi.io",
        version: "v1beta2",
        kind: "Kafka",
        plural: "kafkas",
    };

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(Box::new(kube::core::Status {
            status: Some(kube::core::response::StatusSummary::Failure),
            message: format!("{reason} from test"),
            reason: reason.to_string(),
            code,
            metadata: None,
            details: None,
        }))
    }

    #[test]
    fn test_not_found_detection() {
        assert!(is_not_found(&api_error(404, "NotFound")));
        assert!(!is_not_found(&api_error(409, "AlreadyExists")));
        assert!(!is_not_found(&api_error(500, "InternalError")));
    }

    #[test]
    fn test_conflict_detection() {
        assert!(is_conflict(&api_error(409, "Conflict")));
        assert!(!is_conflict(&api_error(404, "NotFound")));
    }

    #[test]
    fn test_conflict_maps_to_conflict_error() {
        let err = map_error(
            "patch",
            "WeightsAndBiases",
            "wandb",
            "wandb",
            &api_error(409, "Conflict"),
        );
        assert!(matches!(err, ClusterError::Conflict { .. }));
    }

    #[test]
    fn test_server_error_maps_to_request_error() {
        let err = map_error(
            "get",
            "Kafka",
            "wandb",
            "wandb-kafka",
            &api_error(503, "ServiceUnavailable"),
        );
        match err {
            ClusterError::Request { verb, kind, name, .. } => {
                assert_eq!(verb, "get");
                assert_eq!(kind, "Kafka");
                assert_eq!(name, "wandb-kafka");
            }
            other => panic!("expected request error, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_key_resource_coordinates() {
        let key = ObjectKey::custom(&KAFKA, "wandb", "wandb-kafka");
        assert_eq!(key.kind(), "Kafka");
        assert_eq!(key.resource.group, "kafka.strimzi.io");
        assert_eq!(key.resource.version, "v1beta2");
        assert_eq!(key.resource.plural, "kafkas");
        assert_eq!(key.resource.api_version, "kafka.strimzi.io/v1beta2");
    }

    #[test]
    fn test_secret_key_is_core_v1() {
        let key = ObjectKey::secret("wandb", "wandb-minio-config");
        assert_eq!(key.kind(), "Secret");
        assert_eq!(key.resource.api_version, "v1");
        assert_eq!(key.resource.plural, "secrets");
    }

    #[test]
    fn test_new_object_is_addressed() {
        let key = ObjectKey::custom(&KAFKA, "wandb", "wandb-kafka");
        let object = key.new_object();
        assert_eq!(object.metadata.name.as_deref(), Some("wandb-kafka"));
        assert_eq!(object.metadata.namespace.as_deref(), Some("wandb"));
        assert_eq!(
            object.types.as_ref().map(|t| t.kind.as_str()),
            Some("Kafka")
        );
    }

    #[test]
    fn test_status_patch_is_guarded_by_resource_version() {
        let mut owner = owner(spec_with(DeploymentSize::Dev, &[Component::Redis]));
        owner.status.as_mut().unwrap().state = DeploymentPhase::Deleting;

        let patch = status_patch(&owner).unwrap();

        assert_eq!(patch["metadata"]["resourceVersion"], "1");
        assert_eq!(patch["status"]["state"], "Deleting");
        assert!(patch.get("spec").is_none());
    }
}
