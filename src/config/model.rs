//! Typed view of a merged apphosting config.
//!
//! Built from the dynamic YAML tree only after merging, so unknown or
//! malformed keys in either layer never block the merge itself.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use super::defaults::{
    DEFAULT_CONCURRENCY, DEFAULT_CPU, DEFAULT_MAX_INSTANCES, DEFAULT_MEMORY_MIB,
    DEFAULT_MIN_INSTANCES, DEFAULT_TASK_COUNT,
};
use super::load::ConfigError;

/// A merged apphosting config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppHostingConfig {
    #[serde(default)]
    pub run_config: RunConfig,

    /// Order matters: later entries with the same variable win at consumption time.
    #[serde(default)]
    pub env: Vec<EnvEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudsql_connector: Option<String>,
}

/// `runConfig` section. `None` means the key was absent, which is distinct
/// from an explicit value (including an explicit zero).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    pub cpu: Option<u64>,
    #[serde(rename = "memoryMiB")]
    pub memory_mib: Option<u64>,
    pub min_instances: Option<u64>,
    pub max_instances: Option<u64>,
    pub concurrency: Option<u64>,
    pub network: Option<String>,
    pub subnet: Option<String>,
    pub vpc_connector: Option<String>,
    pub vpc_egress: Option<String>,
    pub task_count: Option<u64>,
    pub parallelism: Option<u64>,
    pub max_retries: Option<u64>,
    pub timeout_seconds: Option<u64>,
}

/// One `env` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvEntry {
    #[serde(default)]
    pub variable: String,

    /// Plain value; numbers and booleans are kept in their YAML spelling.
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<String>,

    /// `projects/<number>/secrets/<name>` reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// Passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<Value>,
}

/// Where an env entry's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvSource<'a> {
    Value(&'a str),
    Secret(&'a str),
}

impl AppHostingConfig {
    /// Build the typed view from a merged document.
    ///
    /// A `runConfig` that is not a mapping is treated as absent, as are null
    /// `env`, `serviceAccount` and `cloudsqlConnector` values. Empty strings
    /// for the optional top-level fields count as unset.
    pub fn from_document(doc: &Value) -> Result<Self, ConfigError> {
        let mut map = match doc {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(map) => map.clone(),
            _ => {
                return Err(ConfigError::Shape(de::Error::custom(
                    "config root must be a mapping",
                )))
            }
        };

        if !matches!(map.get("runConfig"), None | Some(Value::Mapping(_))) {
            map.remove("runConfig");
        }
        if matches!(map.get("env"), Some(Value::Null)) {
            map.remove("env");
        }

        let mut config: Self =
            serde_yaml::from_value(Value::Mapping(map)).map_err(ConfigError::Shape)?;
        config.service_account = config.service_account.filter(|s| !s.is_empty());
        config.cloudsql_connector = config.cloudsql_connector.filter(|s| !s.is_empty());
        Ok(config)
    }
}

impl RunConfig {
    pub fn cpu_or_default(&self) -> u64 {
        self.cpu.unwrap_or(DEFAULT_CPU)
    }

    pub fn memory_mib_or_default(&self) -> u64 {
        self.memory_mib.unwrap_or(DEFAULT_MEMORY_MIB)
    }

    pub fn min_instances_or_default(&self) -> u64 {
        self.min_instances.unwrap_or(DEFAULT_MIN_INSTANCES)
    }

    pub fn max_instances_or_default(&self) -> u64 {
        self.max_instances.unwrap_or(DEFAULT_MAX_INSTANCES)
    }

    pub fn concurrency_or_default(&self) -> u64 {
        self.concurrency.unwrap_or(DEFAULT_CONCURRENCY)
    }

    pub fn task_count_or_default(&self) -> u64 {
        self.task_count.unwrap_or(DEFAULT_TASK_COUNT)
    }

    /// `(network, subnet)` when both are set.
    pub fn network_interface(&self) -> Option<(&str, &str)> {
        match (non_empty(&self.network), non_empty(&self.subnet)) {
            (Some(network), Some(subnet)) => Some((network, subnet)),
            _ => None,
        }
    }

    pub fn vpc_connector(&self) -> Option<&str> {
        non_empty(&self.vpc_connector)
    }

    pub fn vpc_egress(&self) -> Option<&str> {
        non_empty(&self.vpc_egress)
    }
}

impl EnvEntry {
    /// The entry's source, or `None` when it has neither a variable name nor
    /// a non-empty value or secret. A non-empty value takes precedence.
    pub fn source(&self) -> Option<EnvSource<'_>> {
        if self.variable.is_empty() {
            return None;
        }
        if let Some(value) = non_empty(&self.value) {
            return Some(EnvSource::Value(value));
        }
        non_empty(&self.secret).map(EnvSource::Secret)
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(de::Error::custom("env value must be a scalar")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> AppHostingConfig {
        let doc: Value = serde_yaml::from_str(yaml).unwrap();
        AppHostingConfig::from_document(&doc).unwrap()
    }

    #[test]
    fn test_empty_document() {
        let config = AppHostingConfig::from_document(&Value::Null).unwrap();
        assert_eq!(config, AppHostingConfig::default());
        assert_eq!(config.run_config.cpu_or_default(), 1);
        assert_eq!(config.run_config.memory_mib_or_default(), 512);
        assert_eq!(config.run_config.min_instances_or_default(), 0);
        assert_eq!(config.run_config.max_instances_or_default(), 3);
        assert_eq!(config.run_config.concurrency_or_default(), 1000);
        assert_eq!(config.run_config.task_count_or_default(), 1);
    }

    #[test]
    fn test_explicit_zero_is_not_absent() {
        let config = parse("runConfig:\n  minInstances: 0\n");
        assert_eq!(config.run_config.min_instances, Some(0));
        assert_eq!(config.run_config.max_instances, None);
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
runConfig:
  cpu: 2
  memoryMiB: 1024
  network: default
  subnet: app-subnet
  vpcConnector: connector-a
serviceAccount: app@project.iam.gserviceaccount.com
cloudsqlConnector: project:region:instance
env:
  - variable: LOG_LEVEL
    value: info
    availability: [RUNTIME]
  - variable: API_KEY
    secret: projects/123456789/secrets/API_KEY
"#,
        );
        assert_eq!(config.run_config.cpu, Some(2));
        assert_eq!(config.run_config.memory_mib, Some(1024));
        assert_eq!(
            config.run_config.network_interface(),
            Some(("default", "app-subnet"))
        );
        assert_eq!(config.run_config.vpc_connector(), Some("connector-a"));
        assert_eq!(config.run_config.vpc_egress(), None);
        assert_eq!(
            config.service_account.as_deref(),
            Some("app@project.iam.gserviceaccount.com")
        );
        assert_eq!(config.env.len(), 2);
        assert_eq!(config.env[0].source(), Some(EnvSource::Value("info")));
        assert!(config.env[0].availability.is_some());
        assert_eq!(
            config.env[1].source(),
            Some(EnvSource::Secret("projects/123456789/secrets/API_KEY"))
        );
    }

    #[test]
    fn test_non_mapping_run_config_is_absent() {
        let config = parse("runConfig: fast\nenv: null\n");
        assert_eq!(config.run_config, RunConfig::default());
        assert!(config.env.is_empty());
    }

    #[test]
    fn test_scalar_env_values_are_stringified() {
        let config = parse("env:\n  - variable: BATCH_SIZE\n    value: 100\n  - variable: DEBUG\n    value: true\n");
        assert_eq!(config.env[0].value.as_deref(), Some("100"));
        assert_eq!(config.env[1].value.as_deref(), Some("true"));
    }

    #[test]
    fn test_empty_optional_strings_are_unset() {
        let config = parse("serviceAccount: \"\"\ncloudsqlConnector: \"\"\nrunConfig:\n  network: default\n  subnet: \"\"\n");
        assert!(config.service_account.is_none());
        assert!(config.cloudsql_connector.is_none());
        assert!(config.run_config.network_interface().is_none());
    }

    #[test]
    fn test_env_source_precedence() {
        let entry = EnvEntry {
            variable: "X".to_string(),
            value: Some(String::new()),
            secret: Some("projects/1/secrets/X".to_string()),
            availability: None,
        };
        assert_eq!(entry.source(), Some(EnvSource::Secret("projects/1/secrets/X")));

        let nameless = EnvEntry {
            value: Some("v".to_string()),
            ..Default::default()
        };
        assert_eq!(nameless.source(), None);
    }

    #[test]
    fn test_wrong_shape_is_an_error() {
        let doc: Value = serde_yaml::from_str("runConfig:\n  cpu: two\n").unwrap();
        assert!(matches!(
            AppHostingConfig::from_document(&doc),
            Err(ConfigError::Shape(_))
        ));
        let list: Value = serde_yaml::from_str("- a\n").unwrap();
        assert!(AppHostingConfig::from_document(&list).is_err());
    }
}
