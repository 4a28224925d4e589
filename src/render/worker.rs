//! Cloud Run `WorkerPool` manifest.

use serde::Serialize;

use super::shared::{
    container, gen2_annotations, insert_connectivity_annotations, insert_scaling_annotations,
    AnnotatedMeta, Container, NameMeta,
};
use super::RenderOptions;
use crate::config::AppHostingConfig;

pub const WORKER_POOL_API_VERSION: &str = "run.googleapis.com/v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPool {
    pub api_version: String,
    pub kind: String,
    pub metadata: NameMeta,
    pub spec: WorkerPoolSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerPoolSpec {
    pub template: WorkerPoolTemplate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerPoolTemplate {
    pub metadata: AnnotatedMeta,
    pub spec: WorkerPoolRevisionSpec,
}

/// No request concurrency: worker pools take no requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPoolRevisionSpec {
    pub containers: Vec<Container>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i64>,
}

pub fn build_worker_pool(config: &AppHostingConfig, options: &RenderOptions) -> WorkerPool {
    let mut annotations = gen2_annotations();
    insert_scaling_annotations(&config.run_config, &mut annotations);
    insert_connectivity_annotations(config, &mut annotations);

    let timeout_seconds = (options.timeout_seconds > 0).then_some(options.timeout_seconds);

    WorkerPool {
        api_version: WORKER_POOL_API_VERSION.to_string(),
        kind: "WorkerPool".to_string(),
        metadata: NameMeta {
            name: options.service_name.clone(),
        },
        spec: WorkerPoolSpec {
            template: WorkerPoolTemplate {
                metadata: AnnotatedMeta { annotations },
                spec: WorkerPoolRevisionSpec {
                    containers: vec![container(config, &options.image)],
                    service_account_name: config.service_account.clone(),
                    timeout_seconds,
                },
            },
        },
    }
}
