//! String format checks for secrets, service accounts and Cloud SQL connectors.

use regex_lite::Regex;
use std::sync::OnceLock;

const SECRET_REFERENCE_PATTERN: &str = r"^projects/[0-9]+/secrets/[A-Za-z_][A-Za-z0-9_-]*$";

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$";

const CLOUDSQL_CONNECTOR_PATTERN: &str = r"^[A-Za-z0-9._-]+:[A-Za-z0-9._-]+:[A-Za-z0-9._-]+$";

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("built-in pattern compiles"))
}

/// `projects/<number>/secrets/<name>`
pub fn is_secret_reference(s: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, SECRET_REFERENCE_PATTERN).is_match(s)
}

/// `local@domain.tld`
pub fn is_email(s: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, EMAIL_PATTERN).is_match(s)
}

/// `project:region:instance`
pub fn is_cloudsql_connector(s: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    compiled(&RE, CLOUDSQL_CONNECTOR_PATTERN).is_match(s)
}
