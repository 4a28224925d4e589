//! Cloud Run `Job` manifest.

use serde::Serialize;

use super::shared::{
    container, insert_connectivity_annotations, AnnotatedMeta, Annotations, Container, NameMeta,
};
use super::RenderOptions;
use crate::config::AppHostingConfig;

pub const JOB_API_VERSION: &str = "run.googleapis.com/v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub api_version: String,
    pub kind: String,
    pub metadata: NameMeta,
    pub spec: JobSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSpec {
    pub template: ExecutionTemplate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionTemplate {
    /// Omitted entirely when no annotation applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AnnotatedMeta>,
    pub spec: ExecutionSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSpec {
    pub task_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<u64>,
    pub template: TaskTemplate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskTemplate {
    pub spec: TaskSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    pub containers: Vec<Container>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

/// Task timeout and retries come from `runConfig`, never from the render
/// options.
pub fn build_job(config: &AppHostingConfig, options: &RenderOptions) -> Job {
    let run_config = &config.run_config;

    let mut annotations = Annotations::new();
    insert_connectivity_annotations(config, &mut annotations);
    let metadata = if annotations.is_empty() {
        None
    } else {
        Some(AnnotatedMeta { annotations })
    };

    Job {
        api_version: JOB_API_VERSION.to_string(),
        kind: "Job".to_string(),
        metadata: NameMeta {
            name: options.service_name.clone(),
        },
        spec: JobSpec {
            template: ExecutionTemplate {
                metadata,
                spec: ExecutionSpec {
                    task_count: run_config.task_count_or_default(),
                    parallelism: run_config.parallelism,
                    template: TaskTemplate {
                        spec: TaskSpec {
                            containers: vec![container(config, &options.image)],
                            service_account_name: config.service_account.clone(),
                            max_retries: run_config.max_retries,
                            timeout_seconds: run_config.timeout_seconds,
                        },
                    },
                },
            },
        },
    }
}
