//! # spindle-core
//!
//! Platform-agnostic types for the spindle user-level threading runtime.
//!
//! Everything OS- or architecture-specific (context switching, stacks,
//! workers, the scheduling loop itself) lives in `spindle-runtime`.
//!
//! ## Modules
//!
//! - `occupancy` - per-core atomic bitmap + count word for slot ownership
//! - `invocation` - inline type-erased callable storage
//! - `rawlock` - internal test-and-set spin lock
//! - `error` - error types
//! - `klog` - leveled stderr logging macros
//! - `env` - environment variable helpers

pub mod env;
pub mod error;
pub mod invocation;
pub mod klog;
pub mod occupancy;
pub mod rawlock;

pub use env::{env_get, env_get_bool};
pub use error::{MemoryError, SchedError, SchedResult, WorkerError};
pub use invocation::Invocation;
pub use occupancy::{OccupancySnapshot, OccupiedAndCount};
pub use rawlock::RawSpinLock;

/// Process-wide constants shared by the core and runtime crates.
pub mod constants {
    /// Slots per core. Bounded by the 56 bitmap bits of the occupancy word
    /// (the top 8 bits hold the population count).
    pub const MAX_STRANDS_PER_CORE: usize = 56;

    /// Upper bound on kernel workers.
    pub const MAX_CORES: usize = 64;

    /// Default strand stack size in bytes.
    pub const DEFAULT_STACK_SIZE: usize = 1024 * 1024;

    /// Default number of kernel workers.
    pub const DEFAULT_NUM_CORES: usize = 2;

    /// Wakeup-time sentinel: the strand is blocked and must not be scheduled.
    pub const BLOCKED: u64 = u64::MAX;

    /// Wakeup-time value for "runnable immediately".
    pub const RUNNABLE: u64 = 0;

    /// Bytes of inline storage for a strand's entry closure.
    pub const INVOCATION_SIZE: usize = 64;

    /// Cache line size used for alignment decisions.
    pub const CACHE_LINE_SIZE: usize = 64;
}
