//! Pieces shared by every manifest shape.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::{AppHostingConfig, EnvEntry, EnvSource, RunConfig};

pub const ANNOTATION_EXECUTION_ENVIRONMENT: &str = "run.googleapis.com/execution-environment";
pub const ANNOTATION_INGRESS: &str = "run.googleapis.com/ingress";
pub const ANNOTATION_MIN_SCALE: &str = "autoscaling.knative.dev/minScale";
pub const ANNOTATION_MAX_SCALE: &str = "autoscaling.knative.dev/maxScale";
pub const ANNOTATION_CLOUDSQL_INSTANCES: &str = "run.googleapis.com/cloudsql-instances";
pub const ANNOTATION_NETWORK_INTERFACES: &str = "run.googleapis.com/network-interfaces";
pub const ANNOTATION_VPC_CONNECTOR: &str = "run.googleapis.com/vpc-access-connector";
pub const ANNOTATION_VPC_EGRESS: &str = "run.googleapis.com/vpc-access-egress";

/// Secret version every secret reference resolves to.
pub const SECRET_VERSION_LATEST: &str = "latest";

/// Sorted so serialization is byte-stable.
pub type Annotations = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameMeta {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedMeta {
    pub annotations: Annotations,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resources {
    pub limits: BTreeMap<String, String>,
}

/// Container shape used by jobs and worker pools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Container {
    pub image: String,
    pub resources: Resources,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_from: Option<EnvVarSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVarSource {
    pub secret_key_ref: SecretKeyRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretKeyRef {
    pub name: String,
    pub key: String,
}

/// `cpu` → `"<cpu*1000>m"`, `memoryMiB` → `"<memoryMiB>Mi"`, defaults applied.
pub fn resource_limits(run_config: &RunConfig) -> Resources {
    let cpu = run_config.cpu_or_default().saturating_mul(1000);
    let memory = run_config.memory_mib_or_default();

    let mut limits = BTreeMap::new();
    limits.insert("cpu".to_string(), format!("{}m", cpu));
    limits.insert("memory".to_string(), format!("{}Mi", memory));
    Resources { limits }
}

/// Secret name from a reference: everything after the last `/`.
///
/// `projects/123/secrets/API_KEY` → `API_KEY`; a bare name is returned as is.
pub fn secret_name_from_reference(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

/// Env entries in config order. Entries without a variable name, or with
/// neither a value nor a secret, are skipped.
pub fn env_vars(entries: &[EnvEntry]) -> Vec<EnvVar> {
    entries
        .iter()
        .filter_map(|entry| {
            let name = entry.variable.clone();
            match entry.source()? {
                EnvSource::Value(value) => Some(EnvVar {
                    name,
                    value: Some(value.to_string()),
                    value_from: None,
                }),
                EnvSource::Secret(reference) => Some(EnvVar {
                    name,
                    value: None,
                    value_from: Some(EnvVarSource {
                        secret_key_ref: SecretKeyRef {
                            name: secret_name_from_reference(reference).to_string(),
                            key: SECRET_VERSION_LATEST.to_string(),
                        },
                    }),
                }),
            }
        })
        .collect()
}

/// Container for jobs and worker pools.
pub fn container(config: &AppHostingConfig, image: &str) -> Container {
    Container {
        image: image.to_string(),
        resources: resource_limits(&config.run_config),
        env: env_vars(&config.env),
    }
}

/// Min/max scale, only for explicitly set fields. An explicit zero is emitted.
pub fn insert_scaling_annotations(run_config: &RunConfig, annotations: &mut Annotations) {
    if let Some(min) = run_config.min_instances {
        annotations.insert(ANNOTATION_MIN_SCALE.to_string(), min.to_string());
    }
    if let Some(max) = run_config.max_instances {
        annotations.insert(ANNOTATION_MAX_SCALE.to_string(), max.to_string());
    }
}

/// Cloud SQL, network interface and VPC access annotations.
pub fn insert_connectivity_annotations(config: &AppHostingConfig, annotations: &mut Annotations) {
    if let Some(connector) = &config.cloudsql_connector {
        annotations.insert(ANNOTATION_CLOUDSQL_INSTANCES.to_string(), connector.clone());
    }
    if let Some((network, subnet)) = config.run_config.network_interface() {
        annotations.insert(
            ANNOTATION_NETWORK_INTERFACES.to_string(),
            network_interfaces_literal(network, subnet),
        );
    }
    if let Some(connector) = config.run_config.vpc_connector() {
        annotations.insert(ANNOTATION_VPC_CONNECTOR.to_string(), connector.to_string());
    }
    if let Some(egress) = config.run_config.vpc_egress() {
        annotations.insert(ANNOTATION_VPC_EGRESS.to_string(), egress.to_string());
    }
}

/// `[{"network":"<network>","subnetwork":"<subnet>"}]`
pub fn network_interfaces_literal(network: &str, subnet: &str) -> String {
    serde_json::json!([{ "network": network, "subnetwork": subnet }]).to_string()
}

/// Template annotations every service and worker pool revision carries.
pub fn gen2_annotations() -> Annotations {
    let mut annotations = Annotations::new();
    annotations.insert(
        ANNOTATION_EXECUTION_ENVIRONMENT.to_string(),
        "gen2".to_string(),
    );
    annotations
}
