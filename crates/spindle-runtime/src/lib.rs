//! # spindle-runtime
//!
//! The scheduler proper: architecture-specific context switching, cycle
//! counting, strand stacks and contexts, the per-core scheduling loop,
//! kernel worker management, and the cooperative synchronization primitives.
//!
//! Scheduling model: cooperative within a core, parallel across cores. Each
//! kernel worker is pinned to one core and runs `core_main` forever; a strand
//! runs until it yields, sleeps, blocks, waits, or exits. There is no
//! preemption.

pub mod arch;
pub mod config;
pub mod context;
pub mod cycles;
pub mod scheduler;
pub mod stack;
pub mod sync;
pub mod tls;
pub mod worker;

pub use config::Config;
pub use context::StrandId;
pub use scheduler::{
    block, current_id, destroy, init, join, num_cores, occupancy_snapshot, signal, sleep,
    spawn_on, stack_size, yield_now,
};
pub use sync::{ConditionVariable, SpinLock, SpinLockGuard};

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        pub use arch::x86_64 as current_arch;
    } else if #[cfg(target_arch = "aarch64")] {
        pub use arch::aarch64 as current_arch;
    } else {
        compile_error!("spindle supports x86_64 and aarch64 only");
    }
}
