//! Schema validator for apphosting configs.
//!
//! Checks a merged config document against the rules of one resource kind
//! and reports every violation it finds. Checks are independent: a failing
//! rule never hides the result of another one.

mod formats;
mod kind;
mod report;
mod rules;
mod violation;

pub use formats::{is_cloudsql_connector, is_email, is_secret_reference};
pub use kind::{ResourceKind, UnknownKind};
pub use report::ValidationReport;
pub use rules::{
    KindRules, NumericField, CPU_VALUES, ENV_ENTRY_KEYS, MEMORY_MIB_RANGE, TOP_LEVEL_KEYS,
};
pub use violation::Violation;

use serde_yaml::{Mapping, Value};
use violation::describe;

/// Validate a config document for `kind`.
///
/// Returns every violation in check order; an empty list means the document
/// is valid. An empty document (`null`) is an empty config.
pub fn validate(doc: &Value, kind: ResourceKind) -> Vec<Violation> {
    let mut violations = Vec::new();

    let root = match doc {
        Value::Null => return violations,
        Value::Mapping(map) => map,
        other => {
            violations.push(Violation::NotAMapping {
                path: String::new(),
                found: describe(other),
            });
            return violations;
        }
    };

    check_top_level_keys(root, &mut violations);

    // A runConfig that is not a mapping is treated as absent.
    if let Some(Value::Mapping(run_config)) = root.get("runConfig") {
        check_run_config(run_config, kind.rules(), &mut violations);
    }

    if let Some(env) = root.get("env") {
        check_env(env, &mut violations);
    }

    check_formatted_string(
        root.get("serviceAccount"),
        "serviceAccount",
        is_email,
        |found| Violation::InvalidServiceAccount { found },
        &mut violations,
    );
    check_formatted_string(
        root.get("cloudsqlConnector"),
        "cloudsqlConnector",
        is_cloudsql_connector,
        |found| Violation::InvalidCloudSqlConnector { found },
        &mut violations,
    );

    violations
}

fn key_name(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => describe(other),
    }
}

fn allowed(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn check_top_level_keys(root: &Mapping, violations: &mut Vec<Violation>) {
    for key in root.keys() {
        let name = key_name(key);
        if !TOP_LEVEL_KEYS.contains(&name.as_str()) {
            violations.push(Violation::UnknownKey {
                parent: String::new(),
                key: name,
                allowed: allowed(TOP_LEVEL_KEYS),
            });
        }
    }
}

fn check_run_config(run_config: &Mapping, rules: &KindRules, violations: &mut Vec<Violation>) {
    for (key, value) in run_config {
        let name = key_name(key);
        if !rules.allows_run_config_key(&name) {
            violations.push(Violation::UnknownKey {
                parent: "runConfig".to_string(),
                key: name,
                allowed: allowed(rules.run_config_keys),
            });
            continue;
        }

        let path = format!("runConfig.{}", name);
        if let Some(field) = rules.numeric_field(&name) {
            check_numeric(&path, field, value, violations);
        } else if rules.string_fields.contains(&name.as_str())
            && !matches!(value, Value::Null | Value::String(_))
        {
            violations.push(Violation::WrongType {
                path,
                expected: "a string".to_string(),
                found: describe(value),
            });
        }
    }

    if rules.networking {
        let network = run_config.get("network");
        let subnet = run_config.get("subnet");
        let partner = match (is_set(network), is_set(subnet)) {
            (true, false) => Some(("network", network, "subnet")),
            (false, true) => Some(("subnet", subnet, "network")),
            _ => None,
        };
        if let Some((present, value, missing)) = partner {
            violations.push(Violation::MissingPartner {
                present: format!("runConfig.{}", present),
                value: value.map(describe).unwrap_or_default(),
                missing: format!("runConfig.{}", missing),
            });
        }
    }
}

fn check_numeric(path: &str, field: &NumericField, value: &Value, violations: &mut Vec<Violation>) {
    let number = match value {
        Value::Null => return,
        Value::Number(n) => n.as_u64(),
        _ => None,
    };
    let Some(number) = number else {
        violations.push(Violation::NotANonNegativeInteger {
            path: path.to_string(),
            found: describe(value),
        });
        return;
    };

    match field.key {
        "cpu" => {
            if !CPU_VALUES.contains(&number) {
                violations.push(Violation::NotInSet {
                    path: path.to_string(),
                    value: number,
                    allowed: CPU_VALUES.to_vec(),
                });
            }
        }
        "memoryMiB" => {
            let (min, max) = MEMORY_MIB_RANGE;
            if !(min..=max).contains(&number) {
                violations.push(Violation::OutOfRange {
                    path: path.to_string(),
                    value: number,
                    min,
                    max,
                });
            }
        }
        _ => {
            if number < field.min {
                violations.push(Violation::BelowMinimum {
                    path: path.to_string(),
                    value: number,
                    min: field.min,
                });
            }
        }
    }
}

fn check_env(env: &Value, violations: &mut Vec<Violation>) {
    match env {
        Value::Null => {}
        Value::Sequence(entries) => {
            for (index, entry) in entries.iter().enumerate() {
                check_env_entry(index, entry, violations);
            }
        }
        other => violations.push(Violation::WrongType {
            path: "env".to_string(),
            expected: "a list of entries".to_string(),
            found: describe(other),
        }),
    }
}

fn check_env_entry(index: usize, entry: &Value, violations: &mut Vec<Violation>) {
    let Value::Mapping(entry) = entry else {
        violations.push(Violation::NotAMapping {
            path: format!("env[{}]", index),
            found: describe(entry),
        });
        return;
    };

    // Without a variable name the remaining checks have nothing to anchor to.
    let variable = match entry.get("variable") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        None | Some(Value::Null) | Some(Value::String(_)) => {
            violations.push(Violation::MissingVariable { index });
            return;
        }
        Some(other) => {
            violations.push(Violation::WrongType {
                path: format!("env[{}].variable", index),
                expected: "a non-empty string".to_string(),
                found: describe(other),
            });
            return;
        }
    };

    for key in entry.keys() {
        let name = key_name(key);
        if !ENV_ENTRY_KEYS.contains(&name.as_str()) {
            violations.push(Violation::UnknownKey {
                parent: format!("env[{}]", index),
                key: name,
                allowed: allowed(ENV_ENTRY_KEYS),
            });
        }
    }

    let value = entry.get("value").filter(|v| !v.is_null());
    let secret = entry.get("secret").filter(|v| !v.is_null());

    match (value, secret) {
        (Some(_), Some(_)) => violations.push(Violation::BothValueAndSecret {
            index,
            variable: variable.clone(),
        }),
        (None, None) => violations.push(Violation::NeitherValueNorSecret {
            index,
            variable: variable.clone(),
        }),
        _ => {}
    }

    if let Some(value @ (Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_))) = value {
        violations.push(Violation::WrongType {
            path: format!("env[{}].value", index),
            expected: "a scalar".to_string(),
            found: describe(value),
        });
    }

    match secret {
        Some(Value::String(s)) if is_secret_reference(s) => {}
        Some(Value::String(s)) => violations.push(Violation::InvalidSecretReference {
            index,
            variable,
            found: format!("'{}'", s),
        }),
        Some(other) => violations.push(Violation::WrongType {
            path: format!("env[{}].secret", index),
            expected: "a string".to_string(),
            found: describe(other),
        }),
        None => {}
    }
}

fn check_formatted_string(
    value: Option<&Value>,
    path: &str,
    is_valid: fn(&str) -> bool,
    invalid: impl FnOnce(String) -> Violation,
    violations: &mut Vec<Violation>,
) {
    match value {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) if s.is_empty() || is_valid(s) => {}
        Some(Value::String(s)) => violations.push(invalid(format!("'{}'", s))),
        Some(other) => violations.push(Violation::WrongType {
            path: path.to_string(),
            expected: "a string".to_string(),
            found: describe(other),
        }),
    }
}
