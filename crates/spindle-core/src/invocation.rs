//! Inline type-erased callable storage
//!
//! Each strand slot owns one `Invocation`: a fixed-size buffer holding the
//! entry closure and its captures, plus an invoke function pointer
//! monomorphized for the concrete closure type at store time. Nothing is
//! heap-allocated on the creation path; a closure that does not fit the
//! buffer is rejected at compile time.
//!
//! Mutation protocol (no internal synchronization):
//! - `store` is called only by a creator that owns the slot via the occupancy
//!   claim CAS, before the slot is published.
//! - `invoke` is called only by the strand itself, exactly once per store.

use core::cell::UnsafeCell;
use core::mem::{align_of, size_of, MaybeUninit};

use crate::constants::INVOCATION_SIZE;

const INVOCATION_ALIGN: usize = 16;

#[repr(C, align(16))]
struct Storage([MaybeUninit<u8>; INVOCATION_SIZE]);

/// Bounded inline storage for a strand's entry closure.
pub struct Invocation {
    invoke: UnsafeCell<Option<unsafe fn(*mut u8)>>,
    storage: UnsafeCell<Storage>,
}

impl Invocation {
    pub const fn new() -> Self {
        Self {
            invoke: UnsafeCell::new(None),
            storage: UnsafeCell::new(Storage([MaybeUninit::uninit(); INVOCATION_SIZE])),
        }
    }

    /// Move `f` into the inline buffer and record its invoke thunk.
    ///
    /// Fails to compile when `F` exceeds the buffer's size or alignment.
    ///
    /// # Safety
    ///
    /// Caller must hold exclusive ownership of the slot (claimed but not yet
    /// published). Any previously stored, never-invoked closure is leaked.
    pub unsafe fn store<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        const {
            assert!(
                size_of::<F>() <= INVOCATION_SIZE,
                "strand entry closure exceeds the inline invocation buffer"
            );
            assert!(
                align_of::<F>() <= INVOCATION_ALIGN,
                "strand entry closure is over-aligned for the invocation buffer"
            );
        }
        (self.storage.get() as *mut F).write(f);
        *self.invoke.get() = Some(invoke_erased::<F>);
    }

    /// Consume and run the stored closure.
    ///
    /// # Safety
    ///
    /// Caller must be the strand owning this slot, and a closure must have
    /// been stored since the last invoke.
    pub unsafe fn invoke(&self) {
        let thunk = (*self.invoke.get())
            .take()
            .expect("invocation invoked with no stored closure");
        thunk(self.storage.get() as *mut u8);
    }
}

unsafe fn invoke_erased<F: FnOnce()>(storage: *mut u8) {
    // Moves the closure out of the buffer; drop runs as part of the call.
    (storage as *mut F).read()()
}

impl Default for Invocation {
    fn default() -> Self {
        Self::new()
    }
}
