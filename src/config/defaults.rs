//! Built-in defaults
//!
//! Applied only when a field is absent. An invalid value never falls back
//! to a default; the validator rejects it first.

/// vCPU count when `runConfig.cpu` is absent
pub const DEFAULT_CPU: u64 = 1;

/// Memory limit in MiB when `runConfig.memoryMiB` is absent
pub const DEFAULT_MEMORY_MIB: u64 = 512;

/// Minimum instance count assumed when `runConfig.minInstances` is absent.
/// Never emitted as an annotation.
pub const DEFAULT_MIN_INSTANCES: u64 = 0;

/// Maximum instance count assumed when `runConfig.maxInstances` is absent.
/// Never emitted as an annotation.
pub const DEFAULT_MAX_INSTANCES: u64 = 3;

/// Per-instance request concurrency assumed when `runConfig.concurrency` is absent
pub const DEFAULT_CONCURRENCY: u64 = 1000;

/// Job task count when `runConfig.taskCount` is absent
pub const DEFAULT_TASK_COUNT: u64 = 1;

/// Service request timeout when the render option is zero or negative
pub const DEFAULT_TIMEOUT_SECONDS: i64 = 300;
