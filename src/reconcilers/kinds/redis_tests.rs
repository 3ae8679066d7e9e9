// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `redis.rs`

#[cfg(test)]
mod tests {
    use crate::cluster::fake::{component_spec_mut, owner, spec_with};
    use crate::crd::{Component, DeploymentSize, RedisSentinelSpec};
    use k8s_openapi::api::core::v1::ResourceRequirements;
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use std::collections::BTreeMap;
    use crate::reconcilers::component::desired::resolve;
    use crate::reconcilers::component::{ManagedKind, ResolvedSpec, Snapshot};
    use crate::reconcilers::kinds::redis::{RedisKind, MASTER_GROUP, REDIS_NAME};

    fn resolved(size: DeploymentSize) -> ResolvedSpec {
        resolve(&RedisKind, &owner(spec_with(size, &[Component::Redis]))).unwrap()
    }

    #[test]
    fn test_dev_layout_is_standalone() {
        let layout = RedisKind.layout("wandb", DeploymentSize::Dev);
        assert_eq!(layout.primary.kind(), "Redis");
        assert_eq!(layout.primary.name, REDIS_NAME);
        assert!(layout.dependent.is_none());
    }

    #[test]
    fn test_small_layout_puts_replication_before_sentinel() {
        let layout = RedisKind.layout("wandb", DeploymentSize::Small);
        assert_eq!(layout.primary.kind(), "RedisSentinel");
        assert_eq!(layout.primary.name, "wandb-redis-sentinel");
        let dependent = layout.dependent.unwrap();
        assert_eq!(dependent.kind(), "RedisReplication");
        assert_eq!(dependent.name, REDIS_NAME);
    }

    #[test]
    fn test_dev_renders_no_dependent() {
        let spec = resolved(DeploymentSize::Dev);
        let layout = RedisKind.layout("wandb", spec.size);
        let primary = RedisKind.render_primary(&spec, layout.primary.new_object());

        assert_eq!(
            primary.data["spec"]["storage"]["volumeClaimTemplate"]["spec"]["resources"]["requests"]
                ["storage"],
            "100Mi"
        );
        assert!(RedisKind
            .render_dependent(&spec, layout.primary.new_object())
            .is_none());
    }

    #[test]
    fn test_small_renders_sentinel_and_replication() {
        let spec = resolved(DeploymentSize::Small);
        let layout = RedisKind.layout("wandb", spec.size);
        let sentinel = RedisKind.render_primary(&spec, layout.primary.new_object());
        let replication = RedisKind
            .render_dependent(&spec, layout.dependent.unwrap().new_object())
            .unwrap();

        assert_eq!(sentinel.data["spec"]["clusterSize"], 3);
        assert_eq!(
            sentinel.data["spec"]["redisSentinelConfig"]["redisReplicationName"],
            REDIS_NAME
        );
        assert_eq!(replication.data["spec"]["clusterSize"], 3);
    }

    #[test]
    fn test_standalone_ready_once_installed() {
        let layout = RedisKind.layout("wandb", DeploymentSize::Dev);
        let installed = Snapshot::absent().with_primary(layout.primary.new_object());

        assert!(RedisKind.is_ready(&installed));
        assert_eq!(RedisKind.status(&installed), "ready");
        assert!(!RedisKind.is_ready(&Snapshot::absent()));
        assert_eq!(RedisKind.status(&Snapshot::absent()), "NotInstalled");
    }

    #[test]
    fn test_sentinel_waits_for_replication() {
        let layout = RedisKind.layout("wandb", DeploymentSize::Small);
        let sentinel_only = Snapshot::absent().with_primary(layout.primary.new_object());
        let both = sentinel_only
            .clone()
            .with_dependent(layout.dependent.unwrap().new_object());

        assert!(!RedisKind.is_ready(&sentinel_only));
        assert_eq!(RedisKind.status(&sentinel_only), "pending");
        assert!(RedisKind.is_ready(&both));
    }

    #[test]
    fn test_connection_info_per_profile() {
        let dev = RedisKind.connection_info(&resolved(DeploymentSize::Dev), &Snapshot::absent());
        assert_eq!(dev["REDIS_HOST"], "wandb-redis.wandb.svc.cluster.local");
        assert_eq!(dev["REDIS_PORT"], "6379");

        let small = RedisKind.connection_info(&resolved(DeploymentSize::Small), &Snapshot::absent());
        assert_eq!(
            small["REDIS_SENTINEL_HOST"],
            "wandb-redis-sentinel.wandb.svc.cluster.local"
        );
        assert_eq!(small["REDIS_SENTINEL_PORT"], "26379");
        assert_eq!(small["REDIS_MASTER_NAME"], MASTER_GROUP);
        assert!(!small.contains_key("REDIS_HOST"));
    }

    #[test]
    fn test_name_override_moves_sentinel_and_replication() {
        let mut wandb_spec = spec_with(DeploymentSize::Small, &[Component::Redis]);
        component_spec_mut(&mut wandb_spec, Component::Redis).name = "cache".to_string();
        let spec = resolve(&RedisKind, &owner(wandb_spec)).unwrap();
        let layout = RedisKind.layout_named("wandb", &spec.name, spec.size);

        assert_eq!(layout.primary.name, "cache-sentinel");
        assert_eq!(layout.dependent.unwrap().name, "cache");
        assert_eq!(layout.secret_name, "cache-connection");

        let sentinel = RedisKind.render_primary(&spec, layout.primary.new_object());
        assert_eq!(
            sentinel.data["spec"]["redisSentinelConfig"]["redisReplicationName"],
            "cache"
        );
        let info = RedisKind.connection_info(&spec, &Snapshot::absent());
        assert_eq!(
            info["REDIS_SENTINEL_HOST"],
            "cache-sentinel.wandb.svc.cluster.local"
        );
    }

    #[test]
    fn test_sentinel_settings_tune_sentinels_only() {
        let mut wandb_spec = spec_with(DeploymentSize::Small, &[Component::Redis]);
        let sentinel_limits = ResourceRequirements {
            limits: Some(BTreeMap::from([("cpu".to_string(), Quantity("250m".to_string()))])),
            ..Default::default()
        };
        let redis_requests = ResourceRequirements {
            requests: Some(BTreeMap::from([("memory".to_string(), Quantity("1Gi".to_string()))])),
            ..Default::default()
        };
        let component = component_spec_mut(&mut wandb_spec, Component::Redis);
        component.sentinel = Some(RedisSentinelSpec {
            master_name: "primary".to_string(),
            resources: Some(sentinel_limits),
        });
        component.config.resources = Some(redis_requests);
        let spec = resolve(&RedisKind, &owner(wandb_spec)).unwrap();
        let layout = RedisKind.layout("wandb", spec.size);

        let sentinel = RedisKind.render_primary(&spec, layout.primary.new_object());
        let replication = RedisKind
            .render_dependent(&spec, layout.dependent.unwrap().new_object())
            .unwrap();

        assert_eq!(
            sentinel.data["spec"]["redisSentinelConfig"]["masterGroupName"],
            "primary"
        );
        assert_eq!(
            sentinel.data["spec"]["kubernetesConfig"]["resources"]["limits"]["cpu"],
            "250m"
        );
        assert_eq!(
            replication.data["spec"]["kubernetesConfig"]["resources"]["requests"]["memory"],
            "1Gi"
        );
        assert_eq!(
            RedisKind.connection_info(&spec, &Snapshot::absent())["REDIS_MASTER_NAME"],
            "primary"
        );
    }

    #[test]
    fn test_blank_master_name_keeps_default_group() {
        let mut wandb_spec = spec_with(DeploymentSize::Small, &[Component::Redis]);
        component_spec_mut(&mut wandb_spec, Component::Redis).sentinel = Some(RedisSentinelSpec::default());
        let spec = resolve(&RedisKind, &owner(wandb_spec)).unwrap();
        let layout = RedisKind.layout("wandb", spec.size);

        let sentinel = RedisKind.render_primary(&spec, layout.primary.new_object());
        assert_eq!(
            sentinel.data["spec"]["redisSentinelConfig"]["masterGroupName"],
            MASTER_GROUP
        );
    }

    #[test]
    fn test_backups_not_supported() {
        assert!(RedisKind.backup_storage().is_empty());
    }
}
