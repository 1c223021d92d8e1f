//! # spindle - cooperative M:N user-level threading
//!
//! Multiplexes large populations of short-lived cooperative strands onto a
//! small, fixed set of kernel workers pinned to cores. Creating a strand is
//! a compare-and-swap on the target core's occupancy word plus a closure
//! write into pre-allocated slot storage: no syscall, no allocation, no
//! kernel stack. Strands run until they yield, sleep, block, wait, or exit;
//! nothing preempts them.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! static DONE: AtomicBool = AtomicBool::new(false);
//!
//! spindle::init(spindle::Config::default()).unwrap();
//!
//! let id = spindle::spawn_on(0, || {
//!     spindle::yield_now();
//!     DONE.store(true, Ordering::Release);
//! });
//! assert!(!id.is_null());
//! spindle::join(id);
//!
//! spindle::destroy().unwrap();
//! ```
//!
//! ## Model
//!
//! - **Cooperative within a core, parallel across cores.** One pinned kernel
//!   worker per configured core scans its own occupancy bitmap and switches
//!   onto the first strand whose wakeup time has arrived. Strands on one
//!   core are strictly serialized; cross-core interaction goes through the
//!   atomic occupancy word, the atomic wakeup times, and the sync types.
//! - **Bounded capacity.** Each core holds at most
//!   [`MAX_STRANDS_PER_CORE`] strands; [`spawn_on`] reports a full core by
//!   returning [`StrandId::NULL`] and never blocks or retries.
//! - **Handles detect reuse.** A [`StrandId`] pairs the slot with a
//!   generation snapshot; [`join`] keys off the generation, [`signal`]
//!   deliberately does not (see its docs).
//!
//! Suspension points are [`yield_now`], [`sleep`], [`block`],
//! [`ConditionVariable::wait`], [`join`] and contention in
//! [`SpinLock::lock`]; every other call runs to completion on the strand.

pub use spindle_core::constants::{
    BLOCKED, DEFAULT_NUM_CORES, DEFAULT_STACK_SIZE, MAX_CORES, MAX_STRANDS_PER_CORE,
};
pub use spindle_core::error::{MemoryError, SchedError, SchedResult, WorkerError};
pub use spindle_core::klog::{self, LogLevel};
pub use spindle_core::occupancy::OccupancySnapshot;

pub use spindle_runtime::config::Config;
pub use spindle_runtime::context::StrandId;
pub use spindle_runtime::current_arch::{swapcontext, SPACE_FOR_SAVED_REGISTERS};
pub use spindle_runtime::cycles;
pub use spindle_runtime::scheduler::{
    block, current_id, destroy, join, num_cores, occupancy_snapshot, signal, sleep, spawn_on,
    stack_size, yield_now,
};
pub use spindle_runtime::sync::{ConditionVariable, SpinLock, SpinLockGuard};

use spindle_runtime::scheduler;

/// Initialize the runtime, taking configuration flags from `args`.
///
/// Applies `-c`/`--numCores` and `-s`/`--stackSize` on top of the
/// environment and the defaults, removing consumed tokens from `args` in
/// place (see [`Config::apply_args`]), then starts the workers.
pub fn init_from_args(args: &mut Vec<String>) -> SchedResult<()> {
    let mut config = Config::default();
    config.apply_args(args)?;
    scheduler::init(config)
}

/// Initialize the runtime with an explicit configuration.
pub fn init(config: Config) -> SchedResult<()> {
    scheduler::init(config)
}
