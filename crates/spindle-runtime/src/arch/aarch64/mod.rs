//! aarch64 context switch
//!
//! Same contract as the x86_64 version with the AAPCS64 callee-preserved
//! set: x19-x28, the frame pointer x29, and the link register x30. The link
//! register's save slot is the topmost word of the area, so the uniform
//! creation layout (trampoline address in the stack's top word) feeds the
//! first switch-in's `ret` exactly as on x86_64.

use core::arch::naked_asm;

/// Don't-care bytes below the top-of-stack return slot: x19-x29.
pub const SPACE_FOR_SAVED_REGISTERS: usize = 88;

/// Total save-area footprint: x19-x29 plus the x30 slot.
const FRAME: usize = 96;

const _: () = assert!(FRAME == SPACE_FOR_SAVED_REGISTERS + 8);

/// Swap execution flows through two stack-pointer slots.
///
/// # Safety
///
/// Same contract as the x86_64 `swapcontext`; additionally both stacks must
/// keep sp 16-byte aligned, which the creation layout and AAPCS64 guarantee.
#[unsafe(naked)]
pub unsafe extern "C" fn swapcontext(_save: *mut *mut u8, _load: *const *mut u8) {
    naked_asm!(
        "sub sp, sp, #96",
        "stp x19, x20, [sp]",
        "stp x21, x22, [sp, #16]",
        "stp x23, x24, [sp, #32]",
        "stp x25, x26, [sp, #48]",
        "stp x27, x28, [sp, #64]",
        "str x29, [sp, #80]",
        "str x30, [sp, #88]",
        "mov x9, sp",
        "str x9, [x0]",
        "ldr x9, [x1]",
        "mov sp, x9",
        "ldp x19, x20, [sp]",
        "ldp x21, x22, [sp, #16]",
        "ldp x23, x24, [sp, #32]",
        "ldp x25, x26, [sp, #48]",
        "ldp x27, x28, [sp, #64]",
        "ldr x29, [sp, #80]",
        "ldr x30, [sp, #88]",
        "add sp, sp, #96",
        "ret",
    );
}

/// First frame of every strand; never returns.
#[unsafe(naked)]
pub unsafe extern "C" fn strand_trampoline() {
    naked_asm!(
        "bl {entry}",
        "brk #0",
        entry = sym crate::scheduler::strand_entry,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicBool, Ordering};

    const TEST_STACK_SIZE: usize = 1024;

    #[repr(C, align(16))]
    struct TestStack([u8; TEST_STACK_SIZE]);

    static mut STACK: TestStack = TestStack([0; TEST_STACK_SIZE]);
    static mut STACK_POINTER: *mut u8 = core::ptr::null_mut();
    static mut OLD_STACK_POINTER: *mut u8 = core::ptr::null_mut();
    static SWAPPED: AtomicBool = AtomicBool::new(false);

    extern "C" fn swap_helper() {
        SWAPPED.store(true, Ordering::SeqCst);
        unsafe {
            swapcontext(&raw mut STACK_POINTER, &raw const OLD_STACK_POINTER);
        }
        unreachable!();
    }

    #[test]
    fn swapcontext_runs_prepared_stack() {
        SWAPPED.store(false, Ordering::SeqCst);
        unsafe {
            let base = (&raw mut STACK) as *mut u8;
            let top = base.add(TEST_STACK_SIZE);
            (top.sub(8) as *mut usize).write(swap_helper as usize);
            STACK_POINTER = top.sub(8 + SPACE_FOR_SAVED_REGISTERS);

            swapcontext(&raw mut OLD_STACK_POINTER, &raw const STACK_POINTER);
        }
        assert!(SWAPPED.load(Ordering::SeqCst));
    }
}
