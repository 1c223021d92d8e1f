//! Architecture-specific context switching
//!
//! Each architecture provides:
//!
//! - `swapcontext(save, load)` - push the callee-preserved registers onto the
//!   current stack, store the resulting stack pointer into `*save`, load the
//!   hardware stack pointer from `*load`, pop the callee-preserved registers
//!   and return into whatever return address the new stack's top frame holds.
//! - `SPACE_FOR_SAVED_REGISTERS` - size in bytes of that on-stack save area.
//! - `strand_trampoline` - the routine a freshly created strand's stack
//!   returns into on its first switch-in.
//!
//! A new strand's stack is laid out uniformly across architectures: the
//! topmost word holds the trampoline address, `SPACE_FOR_SAVED_REGISTERS`
//! don't-care bytes sit below it, and the saved stack pointer starts below
//! those. The first `swapcontext` into the strand consumes the don't-care
//! bytes as "saved registers" and returns into the trampoline.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        pub mod x86_64;
        pub use x86_64::{swapcontext, strand_trampoline, SPACE_FOR_SAVED_REGISTERS};
    } else if #[cfg(target_arch = "aarch64")] {
        pub mod aarch64;
        pub use aarch64::{swapcontext, strand_trampoline, SPACE_FOR_SAVED_REGISTERS};
    }
}
