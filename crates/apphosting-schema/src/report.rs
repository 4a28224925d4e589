//! Aggregated validation output.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;

use crate::{validate, ResourceKind, Violation};

/// Every violation found in one validation pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationReport {
    /// Kind the config was checked against.
    pub kind: ResourceKind,

    /// Violations in check order. Empty means valid.
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Validate `doc` as `kind` and collect the result.
    pub fn check(doc: &Value, kind: ResourceKind) -> Self {
        Self {
            kind,
            violations: validate(doc, kind),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Stable codes for each violation.
    pub fn codes(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.to_code()).collect()
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Multi-line report for terminals.
    pub fn to_human(&self) -> String {
        if self.is_valid() {
            return format!("config is valid for resource type '{}'", self.kind);
        }
        let mut lines = vec![format!(
            "config is invalid for resource type '{}' ({} violation{}):",
            self.kind,
            self.violations.len(),
            if self.violations.len() == 1 { "" } else { "s" }
        )];
        for violation in &self.violations {
            lines.push(format!("  - {}", violation));
        }
        lines.join("\n")
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_human())
    }
}
