//! Strand contexts and identifiers
//!
//! One `StrandContext` per (core, slot) pair, allocated at init and reused by
//! every strand that occupies the slot until teardown.
//!
//! Mutation protocol (the only synchronization on top of the atomics):
//! - `sp`, the stack contents and the invocation are written by the creator
//!   between the occupancy-claim CAS and the publishing `wakeup_cycles`
//!   store, and after that only by the occupying strand / its core's worker.
//! - `wakeup_cycles` is the one cross-core channel: wakers store 0 into it,
//!   the scheduler reads it and stores the blocked sentinel before switching
//!   a strand in. All concurrent writes of 0 race benignly.
//! - `generation` is bumped by the exiting strand before the slot is
//!   released, never elsewhere.

use core::cell::UnsafeCell;
use core::sync::atomic::AtomicU64;

use spindle_core::constants::BLOCKED;
use spindle_core::Invocation;

use crate::arch;
use crate::stack::StrandStack;

/// Per-slot record: stack, saved stack pointer, wakeup time, generation and
/// the entry invocation.
pub struct StrandContext {
    /// Saved stack pointer while the strand is not running.
    sp: UnsafeCell<*mut u8>,

    /// Owned stack mapping.
    stack: StrandStack,

    /// Absolute cycle deadline at which the strand becomes runnable.
    /// `u64::MAX` = blocked (also the convention while running), 0 = now.
    wakeup_cycles: AtomicU64,

    /// Bumped on every occupied -> free transition; lets `StrandId` holders
    /// detect slot reuse.
    generation: AtomicU64,

    /// Entry closure storage.
    invocation: Invocation,

    core_id: usize,
    slot_index: u32,
}

// Safety: shared across kernel threads per the module-level protocol.
unsafe impl Send for StrandContext {}
unsafe impl Sync for StrandContext {}

impl StrandContext {
    pub(crate) fn new(core_id: usize, slot_index: u32, stack: StrandStack) -> Self {
        Self {
            sp: UnsafeCell::new(core::ptr::null_mut()),
            stack,
            wakeup_cycles: AtomicU64::new(BLOCKED),
            generation: AtomicU64::new(0),
            invocation: Invocation::new(),
            core_id,
            slot_index,
        }
    }

    /// Lay out the stack for a fresh strand: trampoline address in the top
    /// word, the register save area of don't-care bytes below it, saved sp
    /// below that. The first switch-in pops the don't-cares and returns into
    /// the trampoline.
    ///
    /// # Safety
    ///
    /// Caller must own the slot (claimed, not yet published).
    pub(crate) unsafe fn prepare_entry(&self) {
        let top = self.stack.top();
        (top.sub(8) as *mut usize).write(arch::strand_trampoline as usize);
        let sp = top.sub(8 + arch::SPACE_FOR_SAVED_REGISTERS);
        core::ptr::write_bytes(sp, 0, arch::SPACE_FOR_SAVED_REGISTERS);
        *self.sp.get() = sp;
    }

    /// Slot for `swapcontext` to save/load this strand's stack pointer.
    #[inline]
    pub(crate) fn sp_slot(&self) -> *mut *mut u8 {
        self.sp.get()
    }

    #[inline]
    pub(crate) fn wakeup_cycles(&self) -> &AtomicU64 {
        &self.wakeup_cycles
    }

    #[inline]
    pub(crate) fn generation(&self) -> &AtomicU64 {
        &self.generation
    }

    #[inline]
    pub(crate) fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    #[inline]
    pub(crate) fn core_id(&self) -> usize {
        self.core_id
    }

    #[inline]
    pub(crate) fn slot_index(&self) -> u32 {
        self.slot_index
    }

    #[cfg(test)]
    pub(crate) fn stack(&self) -> &StrandStack {
        &self.stack
    }
}

/// Opaque strand handle: a context pointer plus the generation the slot had
/// when the handle was produced.
///
/// The handle refers to a live strand only while the context's generation
/// still equals the snapshot; `join` relies on exactly that. `NULL` is the
/// "no strand / creation failed" value.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct StrandId {
    pub(crate) context: *const StrandContext,
    pub(crate) generation: u64,
}

// Safety: the pointer targets slot storage that outlives every handle use
// inside a live runtime; all access goes through atomics.
unsafe impl Send for StrandId {}
unsafe impl Sync for StrandId {}

impl StrandId {
    /// Sentinel: no strand.
    pub const NULL: StrandId = StrandId {
        context: core::ptr::null(),
        generation: 0,
    };

    pub(crate) fn new(context: &StrandContext, generation: u64) -> Self {
        Self {
            context,
            generation,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.context.is_null()
    }
}

impl Default for StrandId {
    fn default() -> Self {
        StrandId::NULL
    }
}

impl core::fmt::Debug for StrandId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_null() {
            write!(f, "StrandId(null)")
        } else {
            let ctx = unsafe { &*self.context };
            write!(
                f,
                "StrandId(core {} slot {} gen {})",
                ctx.core_id(),
                ctx.slot_index(),
                self.generation
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::Ordering;

    #[test]
    fn null_id_is_null() {
        assert!(StrandId::NULL.is_null());
        assert_eq!(StrandId::default(), StrandId::NULL);
        assert_eq!(format!("{:?}", StrandId::NULL), "StrandId(null)");
    }

    #[test]
    fn fresh_context_is_blocked() {
        let ctx = StrandContext::new(0, 3, StrandStack::map(4096).unwrap());
        assert_eq!(ctx.wakeup_cycles().load(Ordering::Relaxed), BLOCKED);
        assert_eq!(ctx.generation().load(Ordering::Relaxed), 0);
        assert_eq!(ctx.slot_index(), 3);
    }

    #[test]
    fn prepare_entry_layout() {
        let size = 16 * 1024;
        let ctx = StrandContext::new(0, 0, StrandStack::map(size).unwrap());
        unsafe {
            ctx.prepare_entry();
            let sp = *ctx.sp_slot();
            let from_base = sp as usize - ctx.stack().base() as usize;
            assert_eq!(
                from_base,
                size - core::mem::size_of::<*mut u8>() - arch::SPACE_FOR_SAVED_REGISTERS
            );
            let top_word = (ctx.stack().top().sub(8) as *const usize).read();
            assert_eq!(top_word, arch::strand_trampoline as usize);
        }
    }
}
