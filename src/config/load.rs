//! Config document loading with provenance
//!
//! Each loaded document remembers which layer it came from and the SHA-256
//! digest of its raw bytes, so a render can be traced back to the exact
//! inputs that produced it.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Layer a document was loaded as
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Base,
    Overlay,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigSource {
    /// Layer of this source
    pub origin: ConfigOrigin,

    /// File path
    pub path: PathBuf,

    /// SHA-256 digest of raw file bytes
    pub digest: String,
}

/// A parsed document together with where it came from
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub source: ConfigSource,
    pub value: Value,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config does not match the apphosting schema: {0}")]
    Shape(#[source] serde_yaml::Error),
}

/// Read and parse one YAML document. An empty file is the empty document.
pub fn load_document(path: &Path, origin: ConfigOrigin) -> Result<LoadedDocument, ConfigError> {
    let bytes = fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let value = parse_document(&bytes).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let source = ConfigSource {
        origin,
        path: path.to_path_buf(),
        digest: sha256_hex(&bytes),
    };
    tracing::debug!(
        origin = ?source.origin,
        path = %source.path.display(),
        digest = %source.digest,
        "loaded config document"
    );

    Ok(LoadedDocument { source, value })
}

/// Parse YAML bytes into a document tree.
pub fn parse_document(bytes: &[u8]) -> Result<Value, serde_yaml::Error> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Value::Null);
    }
    serde_yaml::from_slice(bytes)
}

/// Hex-encoded SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_document() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "runConfig:").unwrap();
        writeln!(temp, "  cpu: 2").unwrap();

        let loaded = load_document(temp.path(), ConfigOrigin::Overlay).unwrap();

        assert_eq!(loaded.source.origin, ConfigOrigin::Overlay);
        assert_eq!(loaded.source.path, temp.path());
        assert_eq!(loaded.source.digest.len(), 64);
        assert_eq!(loaded.value["runConfig"]["cpu"].as_u64(), Some(2));
    }

    #[test]
    fn test_digest_tracks_content() {
        assert_eq!(sha256_hex(b"cpu: 1\n"), sha256_hex(b"cpu: 1\n"));
        assert_ne!(sha256_hex(b"cpu: 1\n"), sha256_hex(b"cpu: 2\n"));
    }

    #[test]
    fn test_empty_file_is_null() {
        let temp = NamedTempFile::new().unwrap();
        let loaded = load_document(temp.path(), ConfigOrigin::Base).unwrap();
        assert!(loaded.value.is_null());
    }

    #[test]
    fn test_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.yaml");

        let err = load_document(&path, ConfigOrigin::Base).unwrap_err();

        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("missing.yaml"));
    }

    #[test]
    fn test_malformed_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "runConfig: [unclosed").unwrap();

        let err = load_document(temp.path(), ConfigOrigin::Overlay).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("failed to parse config"));
    }
}
