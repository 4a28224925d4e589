//! Knative `Service` manifest.
//!
//! Mirrors the serving.knative.dev/v1 shape, including the parts the
//! target schema rejects (an empty container name, the status sub-tree);
//! [`clean_service_manifest`] strips those after serialization.

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use super::shared::{
    env_vars, gen2_annotations, insert_connectivity_annotations, insert_scaling_annotations,
    resource_limits, Annotations, EnvVar, Resources, ANNOTATION_INGRESS,
};
use super::RenderOptions;
use crate::config::{AppHostingConfig, DEFAULT_TIMEOUT_SECONDS};

pub const SERVICE_API_VERSION: &str = "serving.knative.dev/v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub api_version: String,
    pub kind: String,
    pub metadata: ServiceMeta,
    pub spec: ServiceSpec,
    /// Always empty; removed by the cleanup pass.
    pub status: ServiceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceMeta {
    pub name: String,
    pub annotations: Annotations,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSpec {
    pub template: RevisionTemplate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionTemplate {
    pub metadata: RevisionMeta,
    pub spec: RevisionSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionMeta {
    pub annotations: Annotations,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_concurrency: Option<u64>,
    pub timeout_seconds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    pub containers: Vec<RevisionContainer>,
}

/// Core v1 container; `name` is always serialized, even when empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionContainer {
    pub name: String,
    pub image: String,
    pub resources: Resources,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {}

pub fn build_service(config: &AppHostingConfig, options: &RenderOptions) -> Service {
    let timeout_seconds = if options.timeout_seconds <= 0 {
        DEFAULT_TIMEOUT_SECONDS
    } else {
        options.timeout_seconds
    };

    let mut template_annotations = gen2_annotations();
    insert_scaling_annotations(&config.run_config, &mut template_annotations);
    insert_connectivity_annotations(config, &mut template_annotations);

    let mut service_annotations = Annotations::new();
    service_annotations.insert(ANNOTATION_INGRESS.to_string(), "all".to_string());

    let container = RevisionContainer {
        name: String::new(),
        image: options.image.clone(),
        resources: resource_limits(&config.run_config),
        env: env_vars(&config.env),
    };

    Service {
        api_version: SERVICE_API_VERSION.to_string(),
        kind: "Service".to_string(),
        metadata: ServiceMeta {
            name: options.service_name.clone(),
            annotations: service_annotations,
        },
        spec: ServiceSpec {
            template: RevisionTemplate {
                metadata: RevisionMeta {
                    annotations: template_annotations,
                },
                spec: RevisionSpec {
                    container_concurrency: config.run_config.concurrency,
                    timeout_seconds,
                    service_account_name: config.service_account.clone(),
                    containers: vec![container],
                },
            },
        },
        status: ServiceStatus::default(),
    }
}

/// Drop the top-level `status` and any empty `name` next to an `image`.
pub fn clean_service_manifest(mut manifest: Value) -> Value {
    if let Value::Mapping(root) = &mut manifest {
        root.remove("status");
    }
    remove_empty_container_names(&mut manifest);
    manifest
}

fn remove_empty_container_names(node: &mut Value) {
    match node {
        Value::Mapping(map) => {
            if is_container_with_empty_name(map) {
                // rebuilt rather than removed in place to keep key order
                *map = std::mem::take(map)
                    .into_iter()
                    .filter(|(key, _)| key.as_str() != Some("name"))
                    .collect();
            }
            for (_, child) in map.iter_mut() {
                remove_empty_container_names(child);
            }
        }
        Value::Sequence(items) => {
            for item in items {
                remove_empty_container_names(item);
            }
        }
        _ => {}
    }
}

fn is_container_with_empty_name(map: &Mapping) -> bool {
    map.contains_key("image")
        && matches!(map.get("name"), Some(Value::String(name)) if name.is_empty())
}
