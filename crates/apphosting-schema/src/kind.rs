//! Resource kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::rules::{KindRules, JOB_RULES, SERVICE_RULES, WORKER_RULES};

/// The Cloud Run resource a config is rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Request-serving Knative service.
    Service,
    /// Batch job run to completion.
    Job,
    /// Worker pool without an ingress.
    Worker,
}

impl ResourceKind {
    /// Every kind, in canonical order.
    pub const ALL: [ResourceKind; 3] = [Self::Service, Self::Job, Self::Worker];

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Job => "job",
            Self::Worker => "worker",
        }
    }

    /// Validation rule table for this kind.
    pub fn rules(&self) -> &'static KindRules {
        match self {
            Self::Service => &SERVICE_RULES,
            Self::Job => &JOB_RULES,
            Self::Worker => &WORKER_RULES,
        }
    }

    /// Canonical names of all kinds, comma-separated.
    pub fn allowed_names() -> String {
        Self::ALL
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource type string that names none of the known kinds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("resource type must be one of [{}], got '{value}'", ResourceKind::allowed_names())]
pub struct UnknownKind {
    pub value: String,
}

impl FromStr for ResourceKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "service" => Ok(Self::Service),
            "job" => Ok(Self::Job),
            "worker" | "workerPool" | "worker-pool" | "workerpool" => Ok(Self::Worker),
            _ => Err(UnknownKind {
                value: s.to_string(),
            }),
        }
    }
}
