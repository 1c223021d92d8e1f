//! Internal test-and-set spin lock
//!
//! Protects short runtime-internal critical sections (the condition
//! variable's waiter list). It never suspends a strand; strand-visible
//! locking goes through `spindle_runtime::sync::SpinLock`, which yields to
//! the scheduler instead of burning the core.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

pub struct RawSpinLock<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

// Safety: the lock serializes all access to `data`.
unsafe impl<T: Send> Send for RawSpinLock<T> {}
unsafe impl<T: Send> Sync for RawSpinLock<T> {}

impl<T> RawSpinLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquire the lock, spinning with pause hints until it is free.
    #[inline]
    pub fn lock(&self) -> RawSpinLockGuard<'_, T> {
        loop {
            if self
                .locked
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return RawSpinLockGuard { lock: self };
            }
            while self.locked.load(Ordering::Relaxed) {
                core::hint::spin_loop();
            }
        }
    }

    /// One acquisition attempt, no spinning.
    #[inline]
    pub fn try_lock(&self) -> Option<RawSpinLockGuard<'_, T>> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(RawSpinLockGuard { lock: self })
        } else {
            None
        }
    }
}

pub struct RawSpinLockGuard<'a, T> {
    lock: &'a RawSpinLock<T>,
}

impl<T> Deref for RawSpinLockGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // Safety: guard existence proves the lock is held.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for RawSpinLockGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // Safety: guard existence proves the lock is held.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for RawSpinLockGuard<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}
