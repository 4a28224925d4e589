//! Schema violation types.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;

/// One independent rule failure found while validating a config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "detail", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Violation {
    /// A document or list item that must be a mapping is not.
    NotAMapping { path: String, found: String },

    /// Key outside the allowed set. `parent` is empty for top-level keys.
    UnknownKey {
        parent: String,
        key: String,
        allowed: Vec<String>,
    },

    /// Numeric field that is not a non-negative integer.
    NotANonNegativeInteger { path: String, found: String },

    /// Integer below the field's lower bound.
    BelowMinimum { path: String, value: u64, min: u64 },

    /// Integer outside an enumerated set.
    NotInSet {
        path: String,
        value: u64,
        allowed: Vec<u64>,
    },

    /// Integer outside an inclusive range.
    OutOfRange {
        path: String,
        value: u64,
        min: u64,
        max: u64,
    },

    /// Field of the wrong YAML type.
    WrongType {
        path: String,
        expected: String,
        found: String,
    },

    /// One of two co-required fields is set without the other.
    MissingPartner {
        present: String,
        value: String,
        missing: String,
    },

    /// `env` entry without a `variable`.
    MissingVariable { index: usize },

    /// `env` entry carrying both `value` and `secret`.
    BothValueAndSecret { index: usize, variable: String },

    /// `env` entry carrying neither `value` nor `secret`.
    NeitherValueNorSecret { index: usize, variable: String },

    /// `secret` that is not a `projects/<number>/secrets/<name>` reference.
    InvalidSecretReference {
        index: usize,
        variable: String,
        found: String,
    },

    /// `serviceAccount` that is not shaped like an email address.
    InvalidServiceAccount { found: String },

    /// `cloudsqlConnector` that is not a `project:region:instance` triple.
    InvalidCloudSqlConnector { found: String },
}

impl Violation {
    /// Dotted path of the offending field.
    pub fn path(&self) -> String {
        match self {
            Violation::NotAMapping { path, .. }
            | Violation::NotANonNegativeInteger { path, .. }
            | Violation::BelowMinimum { path, .. }
            | Violation::NotInSet { path, .. }
            | Violation::OutOfRange { path, .. }
            | Violation::WrongType { path, .. } => path.clone(),
            Violation::UnknownKey { parent, key, .. } => join_path(parent, key),
            Violation::MissingPartner { missing, .. } => missing.clone(),
            Violation::MissingVariable { index } => format!("env[{}].variable", index),
            Violation::BothValueAndSecret { index, .. }
            | Violation::NeitherValueNorSecret { index, .. } => format!("env[{}]", index),
            Violation::InvalidSecretReference { index, .. } => format!("env[{}].secret", index),
            Violation::InvalidServiceAccount { .. } => "serviceAccount".to_string(),
            Violation::InvalidCloudSqlConnector { .. } => "cloudsqlConnector".to_string(),
        }
    }

    /// Stable machine-readable code, e.g. `UNKNOWN_KEY:runConfig.foo`.
    pub fn to_code(&self) -> String {
        let kind = match self {
            Violation::NotAMapping { .. } => "NOT_A_MAPPING",
            Violation::UnknownKey { .. } => "UNKNOWN_KEY",
            Violation::NotANonNegativeInteger { .. } => "NOT_A_NON_NEGATIVE_INTEGER",
            Violation::BelowMinimum { .. } => "BELOW_MINIMUM",
            Violation::NotInSet { .. } => "NOT_IN_SET",
            Violation::OutOfRange { .. } => "OUT_OF_RANGE",
            Violation::WrongType { .. } => "WRONG_TYPE",
            Violation::MissingPartner { .. } => "MISSING_PARTNER",
            Violation::MissingVariable { .. } => "MISSING_VARIABLE",
            Violation::BothValueAndSecret { .. } => "BOTH_VALUE_AND_SECRET",
            Violation::NeitherValueNorSecret { .. } => "NEITHER_VALUE_NOR_SECRET",
            Violation::InvalidSecretReference { .. } => "INVALID_SECRET_REFERENCE",
            Violation::InvalidServiceAccount { .. } => "INVALID_SERVICE_ACCOUNT",
            Violation::InvalidCloudSqlConnector { .. } => "INVALID_CLOUDSQL_CONNECTOR",
        };
        format!("{}:{}", kind, self.path())
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::NotAMapping { path, found } => {
                write!(f, "{}: expected a mapping, got {}", display_path(path), found)
            }
            Violation::UnknownKey {
                parent,
                key,
                allowed,
            } => write!(
                f,
                "unknown key '{}' in {}; allowed keys: {}",
                key,
                display_path(parent),
                allowed.join(", ")
            ),
            Violation::NotANonNegativeInteger { path, found } => {
                write!(f, "{}: expected a non-negative integer, got {}", path, found)
            }
            Violation::BelowMinimum { path, value, min } => {
                write!(f, "{}: value {} is below the minimum of {}", path, value, min)
            }
            Violation::NotInSet {
                path,
                value,
                allowed,
            } => {
                let allowed: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
                write!(
                    f,
                    "{}: value {} is not one of [{}]",
                    path,
                    value,
                    allowed.join(", ")
                )
            }
            Violation::OutOfRange {
                path,
                value,
                min,
                max,
            } => write!(
                f,
                "{}: value {} is outside the range [{}, {}]",
                path, value, min, max
            ),
            Violation::WrongType {
                path,
                expected,
                found,
            } => write!(f, "{}: expected {}, got {}", path, expected, found),
            Violation::MissingPartner {
                present,
                value,
                missing,
            } => write!(
                f,
                "{} is set to {} but {} is missing; both must be set together",
                present, value, missing
            ),
            Violation::MissingVariable { index } => {
                write!(f, "env[{}]: missing required field 'variable'", index)
            }
            Violation::BothValueAndSecret { index, variable } => write!(
                f,
                "env[{}] ({}): both value and secret are set; exactly one is allowed",
                index, variable
            ),
            Violation::NeitherValueNorSecret { index, variable } => write!(
                f,
                "env[{}] ({}): neither value nor secret is set; exactly one is required",
                index, variable
            ),
            Violation::InvalidSecretReference {
                index,
                variable,
                found,
            } => write!(
                f,
                "env[{}].secret ({}): {} does not match projects/<number>/secrets/<name>",
                index, variable, found
            ),
            Violation::InvalidServiceAccount { found } => {
                write!(f, "serviceAccount: {} is not a valid email address", found)
            }
            Violation::InvalidCloudSqlConnector { found } => write!(
                f,
                "cloudsqlConnector: {} does not match project:region:instance",
                found
            ),
        }
    }
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "config"
    } else {
        path
    }
}

/// Short rendering of an offending YAML value for violation messages.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s),
        Value::Sequence(seq) => format!("a list of {} item(s)", seq.len()),
        Value::Mapping(_) => "a mapping".to_string(),
        Value::Tagged(tagged) => format!("a value tagged {}", tagged.tag),
    }
}
