//! Per-kind rule tables.
//!
//! The kind set is closed, so each kind gets a static table instead of a
//! trait hierarchy.

/// Allowed top-level keys of an apphosting config.
pub const TOP_LEVEL_KEYS: &[&str] = &["cloudsqlConnector", "env", "runConfig", "serviceAccount"];

/// Allowed keys of a single `env` entry.
pub const ENV_ENTRY_KEYS: &[&str] = &["availability", "secret", "value", "variable"];

/// Allowed `cpu` values.
pub const CPU_VALUES: &[u64] = &[1, 2, 4, 8];

/// Inclusive `memoryMiB` bounds.
pub const MEMORY_MIB_RANGE: (u64, u64) = (128, 32768);

/// A numeric `runConfig` field and the smallest value it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericField {
    pub key: &'static str,
    pub min: u64,
}

const fn numeric(key: &'static str, min: u64) -> NumericField {
    NumericField { key, min }
}

/// Validation rules for one resource kind.
#[derive(Debug)]
pub struct KindRules {
    /// Allowed `runConfig` keys, sorted.
    pub run_config_keys: &'static [&'static str],
    /// Integer-valued `runConfig` keys.
    pub numeric_fields: &'static [NumericField],
    /// String-valued `runConfig` keys.
    pub string_fields: &'static [&'static str],
    /// Whether `network`/`subnet` apply to this kind.
    pub networking: bool,
}

impl KindRules {
    pub fn allows_run_config_key(&self, key: &str) -> bool {
        self.run_config_keys.contains(&key)
    }

    pub fn numeric_field(&self, key: &str) -> Option<&NumericField> {
        self.numeric_fields.iter().find(|f| f.key == key)
    }
}

const INSTANCE_STRING_FIELDS: &[&str] = &["network", "subnet", "vpcConnector", "vpcEgress"];

pub static SERVICE_RULES: KindRules = KindRules {
    run_config_keys: &[
        "concurrency",
        "cpu",
        "maxInstances",
        "memoryMiB",
        "minInstances",
        "network",
        "subnet",
        "vpcConnector",
        "vpcEgress",
    ],
    numeric_fields: &[
        numeric("cpu", 0),
        numeric("memoryMiB", 0),
        numeric("minInstances", 0),
        numeric("maxInstances", 1),
        numeric("concurrency", 1),
    ],
    string_fields: INSTANCE_STRING_FIELDS,
    networking: true,
};

pub static WORKER_RULES: KindRules = KindRules {
    run_config_keys: &[
        "cpu",
        "maxInstances",
        "memoryMiB",
        "minInstances",
        "network",
        "subnet",
        "vpcConnector",
        "vpcEgress",
    ],
    numeric_fields: &[
        numeric("cpu", 0),
        numeric("memoryMiB", 0),
        numeric("minInstances", 0),
        numeric("maxInstances", 1),
    ],
    string_fields: INSTANCE_STRING_FIELDS,
    networking: true,
};

pub static JOB_RULES: KindRules = KindRules {
    run_config_keys: &[
        "cpu",
        "maxRetries",
        "memoryMiB",
        "parallelism",
        "taskCount",
        "timeoutSeconds",
    ],
    numeric_fields: &[
        numeric("cpu", 0),
        numeric("memoryMiB", 0),
        numeric("taskCount", 1),
        numeric("parallelism", 1),
        numeric("maxRetries", 0),
        numeric("timeoutSeconds", 1),
    ],
    string_fields: &[],
    networking: false,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_has_no_concurrency() {
        assert!(SERVICE_RULES.allows_run_config_key("concurrency"));
        assert!(!WORKER_RULES.allows_run_config_key("concurrency"));
        assert!(!JOB_RULES.allows_run_config_key("concurrency"));
    }

    #[test]
    fn test_numeric_fields_are_allowed_keys() {
        for rules in [&SERVICE_RULES, &WORKER_RULES, &JOB_RULES] {
            for field in rules.numeric_fields {
                assert!(rules.allows_run_config_key(field.key), "{}", field.key);
            }
            for key in rules.string_fields {
                assert!(rules.allows_run_config_key(key), "{}", key);
            }
        }
    }

    #[test]
    fn test_key_lists_are_sorted() {
        for rules in [&SERVICE_RULES, &WORKER_RULES, &JOB_RULES] {
            let mut sorted = rules.run_config_keys.to_vec();
            sorted.sort_unstable();
            assert_eq!(sorted, rules.run_config_keys);
        }
    }

    #[test]
    fn test_job_minimums() {
        assert_eq!(JOB_RULES.numeric_field("taskCount").map(|f| f.min), Some(1));
        assert_eq!(JOB_RULES.numeric_field("maxRetries").map(|f| f.min), Some(0));
        assert!(JOB_RULES.numeric_field("minInstances").is_none());
    }
}
