//! Error types for runtime initialization and teardown
//!
//! Capacity exhaustion on strand creation is deliberately not an error:
//! `spawn_on` reports it through the null strand id, and callers poll if they
//! want to retry.

use core::fmt;

pub type SchedResult<T> = Result<T, SchedError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedError {
    /// `init` called while a runtime is live.
    AlreadyInitialized,

    /// Operation requires a live runtime.
    NotInitialized,

    /// Configuration rejected by validation or argument parsing.
    InvalidConfig(&'static str),

    /// Stack mapping failed.
    Memory(MemoryError),

    /// Kernel worker failed to start.
    Worker(WorkerError),
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::AlreadyInitialized => write!(f, "runtime already initialized"),
            SchedError::NotInitialized => write!(f, "runtime not initialized"),
            SchedError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            SchedError::Memory(e) => write!(f, "memory error: {}", e),
            SchedError::Worker(e) => write!(f, "worker error: {}", e),
        }
    }
}

impl std::error::Error for SchedError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// mmap refused the stack mapping.
    MapFailed,

    /// mprotect could not open the usable stack span.
    ProtectFailed,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::MapFailed => write!(f, "stack mapping failed"),
            MemoryError::ProtectFailed => write!(f, "stack protection change failed"),
        }
    }
}

impl From<MemoryError> for SchedError {
    fn from(e: MemoryError) -> Self {
        SchedError::Memory(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerError {
    /// OS thread spawn failed.
    SpawnFailed,
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::SpawnFailed => write!(f, "failed to spawn kernel worker"),
        }
    }
}

impl From<WorkerError> for SchedError {
    fn from(e: WorkerError) -> Self {
        SchedError::Worker(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        assert_eq!(
            format!("{}", SchedError::AlreadyInitialized),
            "runtime already initialized"
        );
        assert_eq!(
            format!("{}", SchedError::Memory(MemoryError::MapFailed)),
            "memory error: stack mapping failed"
        );
    }

    #[test]
    fn conversions() {
        let e: SchedError = MemoryError::ProtectFailed.into();
        assert_eq!(e, SchedError::Memory(MemoryError::ProtectFailed));
        let e: SchedError = WorkerError::SpawnFailed.into();
        assert_eq!(e, SchedError::Worker(WorkerError::SpawnFailed));
    }
}
