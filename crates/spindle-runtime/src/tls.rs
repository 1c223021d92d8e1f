//! Thread-local core state pointer
//!
//! Each kernel worker publishes its `CoreState` here on entry to the
//! scheduling loop; the suspension primitives use it to find the running
//! strand and the kernel stack slot without touching the global runtime.

use core::cell::Cell;

use crate::scheduler::CoreState;

thread_local! {
    static CURRENT_CORE: Cell<*const CoreState> = const { Cell::new(core::ptr::null()) };
}

pub(crate) fn set_current_core(core: *const CoreState) {
    CURRENT_CORE.with(|cell| cell.set(core));
}

pub(crate) fn clear_current_core() {
    CURRENT_CORE.with(|cell| cell.set(core::ptr::null()));
}

/// The calling thread's core state, if the caller is a kernel worker.
#[inline]
pub(crate) fn current_core() -> Option<&'static CoreState> {
    let ptr = CURRENT_CORE.with(|cell| cell.get());
    if ptr.is_null() {
        None
    } else {
        // Safety: set only by a live worker; cleared before its runtime is
        // torn down, and workers outlive every strand they run.
        Some(unsafe { &*ptr })
    }
}

/// Whether the calling thread is a kernel worker.
#[inline]
pub fn is_worker_thread() -> bool {
    CURRENT_CORE.with(|cell| !cell.get().is_null())
}
