// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `desired.rs`

#[cfg(test)]
mod tests {
    use crate::cluster::fake::{component_spec_mut, object_with, owner, spec_with};
    use crate::crd::{BackupSpec, BackupStorageType, Component, DeploymentSize};
    use crate::errors::ValidationError;
    use crate::labels::{K8S_COMPONENT, K8S_INSTANCE};
    use crate::reconcilers::component::desired::{
        build_desired, parse_quantity, resolve, resolve_backup,
    };
    use crate::reconcilers::component::{ManagedKind, Snapshot};
    use crate::reconcilers::kinds::{KafkaKind, MysqlKind, RedisKind};
    use kube::ResourceExt;
    use serde_json::json;

    fn mysql_ready() -> Snapshot {
        let layout = MysqlKind.layout("wandb", DeploymentSize::Dev);
        Snapshot::absent().with_primary(object_with(
            &layout.primary,
            json!({ "status": { "state": "ready" } }),
        ))
    }

    // ------------------------------------------------------------------
    // resolve
    // ------------------------------------------------------------------

    #[test]
    fn test_resolve_applies_profile_defaults() {
        let owner = owner(spec_with(DeploymentSize::Small, &[Component::Mysql]));
        let spec = resolve(&MysqlKind, &owner).unwrap();

        assert_eq!(spec.storage_size, "10Gi");
        assert_eq!(spec.replicas, 3);
        assert_eq!(spec.namespace, "wandb");
        assert_eq!(spec.owner_name, "wandb");
        assert_eq!(spec.name, "wandb-mysql");
        assert!(spec.version.is_empty());
        assert!(!spec.backup.enabled);
        assert_eq!(spec.backup.storage_name, "default-backup");
        assert_eq!(spec.backup.timeout_seconds, 600);
    }

    #[test]
    fn test_resolve_keeps_explicit_values() {
        let mut wandb_spec = spec_with(DeploymentSize::Dev, &[Component::Mysql]);
        let mysql = component_spec_mut(&mut wandb_spec, Component::Mysql);
        mysql.storage_size = " 20Gi ".to_string();
        mysql.replicas = 5;
        mysql.namespace = "databases".to_string();

        let spec = resolve(&MysqlKind, &owner(wandb_spec)).unwrap();
        assert_eq!(spec.storage_size, "20Gi");
        assert_eq!(spec.replicas, 5);
        assert_eq!(spec.namespace, "databases");
    }

    #[test]
    fn test_resolve_rejects_bad_storage() {
        let mut wandb_spec = spec_with(DeploymentSize::Dev, &[Component::Kafka]);
        component_spec_mut(&mut wandb_spec, Component::Kafka).storage_size = "lots".to_string();

        let error = resolve(&KafkaKind, &owner(wandb_spec)).unwrap_err();
        assert!(matches!(
            error,
            ValidationError::InvalidStorageSize { component: Component::Kafka, .. }
        ));
    }

    #[test]
    fn test_resolve_rejects_negative_replicas() {
        let mut wandb_spec = spec_with(DeploymentSize::Dev, &[Component::Kafka]);
        component_spec_mut(&mut wandb_spec, Component::Kafka).replicas = -1;

        let error = resolve(&KafkaKind, &owner(wandb_spec)).unwrap_err();
        assert!(matches!(error, ValidationError::InvalidReplicas { replicas: -1, .. }));
    }

    #[test]
    fn test_resolve_rejects_backups_without_support() {
        let mut wandb_spec = spec_with(DeploymentSize::Dev, &[Component::Redis]);
        component_spec_mut(&mut wandb_spec, Component::Redis).backup.enabled = true;

        let error = resolve(&RedisKind, &owner(wandb_spec)).unwrap_err();
        assert!(matches!(
            error,
            ValidationError::BackupNotSupported { component: Component::Redis }
        ));
    }

    #[test]
    fn test_resolve_rejects_unsupported_backend() {
        let mut wandb_spec = spec_with(DeploymentSize::Dev, &[Component::Kafka]);
        let backup = &mut component_spec_mut(&mut wandb_spec, Component::Kafka).backup;
        backup.enabled = true;
        backup.storage_type = BackupStorageType::S3;

        let error = resolve(&KafkaKind, &owner(wandb_spec)).unwrap_err();
        assert!(matches!(
            error,
            ValidationError::UnsupportedBackupStorage {
                storage_type: BackupStorageType::S3,
                ..
            }
        ));
    }

    #[test]
    fn test_backend_not_checked_while_backups_off() {
        let mut wandb_spec = spec_with(DeploymentSize::Dev, &[Component::Kafka]);
        component_spec_mut(&mut wandb_spec, Component::Kafka).backup.storage_type =
            BackupStorageType::S3;

        assert!(resolve(&KafkaKind, &owner(wandb_spec)).is_ok());
    }

    #[test]
    fn test_resolve_backup_defaults() {
        let resolved = resolve_backup(&BackupSpec {
            enabled: true,
            storage_name: String::new(),
            storage_type: BackupStorageType::Filesystem,
            timeout_seconds: 0,
        });
        assert_eq!(resolved.storage_name, "default-backup");
        assert_eq!(resolved.timeout_seconds, 600);

        let kept = resolve_backup(&BackupSpec {
            enabled: true,
            storage_name: "nightly".to_string(),
            storage_type: BackupStorageType::S3,
            timeout_seconds: 60,
        });
        assert_eq!(kept.storage_name, "nightly");
        assert_eq!(kept.timeout_seconds, 60);
    }

    // ------------------------------------------------------------------
    // build_desired
    // ------------------------------------------------------------------

    #[test]
    fn test_disabled_component_is_absent() {
        let owner = owner(spec_with(DeploymentSize::Dev, &[]));
        let desired = build_desired(&MysqlKind, &owner, &mysql_ready()).unwrap();
        assert!(desired.is_absent());
    }

    #[test]
    fn test_disabled_component_skips_validation() {
        let mut wandb_spec = spec_with(DeploymentSize::Dev, &[]);
        component_spec_mut(&mut wandb_spec, Component::Mysql).storage_size = "lots".to_string();

        assert!(build_desired(&MysqlKind, &owner(wandb_spec), &Snapshot::absent()).is_ok());
    }

    #[test]
    fn test_secret_withheld_until_ready() {
        let owner = owner(spec_with(DeploymentSize::Dev, &[Component::Mysql]));
        let desired = build_desired(&MysqlKind, &owner, &Snapshot::absent()).unwrap();

        assert!(desired.installed());
        assert!(!desired.secret_installed());
        assert!(!desired.dependent_installed());
    }

    #[test]
    fn test_secret_published_once_ready() {
        let owner = owner(spec_with(DeploymentSize::Dev, &[Component::Mysql]));
        let desired = build_desired(&MysqlKind, &owner, &mysql_ready()).unwrap();

        let secret = desired.secret().unwrap();
        assert_eq!(secret.name_any(), "wandb-mysql-connection");
        assert_eq!(secret.namespace().as_deref(), Some("wandb"));
        let data = secret.string_data.as_ref().unwrap();
        assert_eq!(data["MYSQL_PORT"], "3306");
    }

    #[test]
    fn test_objects_carry_component_labels() {
        let owner = owner(spec_with(DeploymentSize::Dev, &[Component::Kafka]));
        let desired = build_desired(&KafkaKind, &owner, &Snapshot::absent()).unwrap();

        let primary = desired.primary().unwrap();
        assert_eq!(primary.labels()[K8S_COMPONENT], "kafka");
        assert_eq!(primary.labels()[K8S_INSTANCE], "wandb");

        let pool = desired.dependent().unwrap();
        assert_eq!(pool.labels()[K8S_COMPONENT], "kafka");
        assert!(pool.labels().contains_key("strimzi.io/cluster"));
    }

    #[test]
    fn test_invalid_spec_fails_build() {
        let mut wandb_spec = spec_with(DeploymentSize::Dev, &[Component::Mysql]);
        component_spec_mut(&mut wandb_spec, Component::Mysql).replicas = -3;

        assert!(build_desired(&MysqlKind, &owner(wandb_spec), &Snapshot::absent()).is_err());
    }

    // ------------------------------------------------------------------
    // parse_quantity
    // ------------------------------------------------------------------

    #[test]
    fn test_parse_quantity_suffixes() {
        assert_eq!(parse_quantity("1Gi").unwrap(), 1_073_741_824.0);
        assert_eq!(parse_quantity("100Mi").unwrap(), 104_857_600.0);
        assert_eq!(parse_quantity("2k").unwrap(), 2000.0);
        assert_eq!(parse_quantity("1e3").unwrap(), 1000.0);
        assert_eq!(parse_quantity("1.5Gi").unwrap(), 1_610_612_736.0);
        assert_eq!(parse_quantity("512").unwrap(), 512.0);
    }

    #[test]
    fn test_parse_quantity_rejects_malformed() {
        for value in ["", "Gi", "1Xi", "1.2.3Gi", ".", "-1Gi", "ten"] {
            assert!(parse_quantity(value).is_err(), "{value} should be rejected");
        }
    }

    #[test]
    fn test_parse_quantity_rejects_zero() {
        assert_eq!(
            parse_quantity("0Gi").unwrap_err(),
            "quantity must be greater than zero"
        );
    }
}
