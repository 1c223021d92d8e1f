//! x86_64 context switch
//!
//! Hand-written assembly, stable in Rust 1.88+ via `naked_asm!`.
//!
//! The save area is the six System V callee-preserved general registers
//! pushed onto the suspended flow's own stack; the saved stack pointer is the
//! only per-strand state kept outside the stack itself.

use core::arch::naked_asm;

/// Bytes pushed by `swapcontext`: rbx, rbp, r12, r13, r14, r15.
pub const SPACE_FOR_SAVED_REGISTERS: usize = 48;

/// Swap execution flows through two stack-pointer slots.
///
/// Pushes the callee-preserved registers, stores rsp into `*save`, loads rsp
/// from `*load`, pops the callee-preserved registers and returns into the
/// address the new stack's top frame holds.
///
/// # Safety
///
/// `save` must be writable; `*load` must point at a stack prepared either by
/// a previous `swapcontext` save or by the creation-time layout described in
/// `arch`. The call must not be inlined into a frame that assumes rsp is
/// unchanged across it (the `extern "C"` naked boundary guarantees this).
#[unsafe(naked)]
pub unsafe extern "C" fn swapcontext(_save: *mut *mut u8, _load: *const *mut u8) {
    naked_asm!(
        "push r15",
        "push r14",
        "push r13",
        "push r12",
        "push rbp",
        "push rbx",
        "mov [rdi], rsp",
        "mov rsp, [rsi]",
        "pop rbx",
        "pop rbp",
        "pop r12",
        "pop r13",
        "pop r14",
        "pop r15",
        "ret",
    );
}

/// First frame of every strand.
///
/// Entered by `swapcontext`'s final `ret` with rsp at the very top of the
/// strand stack (16-byte aligned), so the `call` below gives `strand_entry`
/// a standard ABI-aligned frame. `strand_entry` never returns; the trap
/// instruction documents that.
#[unsafe(naked)]
pub unsafe extern "C" fn strand_trampoline() {
    naked_asm!(
        "call {entry}",
        "ud2",
        entry = sym crate::scheduler::strand_entry,
    );
}
