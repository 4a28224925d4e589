//! Configuration loading and merge
//!
//! Two layers, lowest precedence first:
//! 1. Base config (optional, shared by every environment)
//! 2. Overlay config (environment-specific)
//!
//! The layers are merged as dynamic YAML trees; the typed
//! [`AppHostingConfig`] view is only built from the merged result.

mod defaults;
mod load;
mod merge;
mod model;

pub use defaults::*;
pub use load::{
    load_document, parse_document, sha256_hex, ConfigError, ConfigOrigin, ConfigSource,
    LoadedDocument,
};
pub use merge::{deep_merge, merge, merge_layers};
pub use model::{AppHostingConfig, EnvEntry, EnvSource, RunConfig};
