//! Cycle counter and cycle/nanosecond conversion
//!
//! Wakeup deadlines are absolute cycle counts so the scheduling loop pays one
//! counter read per pass instead of a clock syscall. On x86_64 the counter is
//! the TSC, calibrated once against the monotonic clock; on aarch64 the
//! generic timer provides both the counter and its frequency directly.

use std::sync::OnceLock;

static CYCLES_PER_NS: OnceLock<f64> = OnceLock::new();

/// Read the cycle counter.
#[inline]
pub fn rdtsc() -> u64 {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        core::arch::x86_64::_rdtsc()
    }
    #[cfg(target_arch = "aarch64")]
    unsafe {
        let cnt: u64;
        core::arch::asm!("mrs {}, cntvct_el0", out(reg) cnt, options(nomem, nostack));
        cnt
    }
}

/// Calibrate the counter. Idempotent; called from runtime init, and lazily
/// by the conversion helpers so tests can use them standalone.
pub fn init() {
    let _ = CYCLES_PER_NS.get_or_init(calibrate);
}

fn cycles_per_ns() -> f64 {
    *CYCLES_PER_NS.get_or_init(calibrate)
}

#[cfg(target_arch = "x86_64")]
fn calibrate() -> f64 {
    use std::time::{Duration, Instant};

    let start_cycles = rdtsc();
    let start = Instant::now();
    std::thread::sleep(Duration::from_millis(10));
    let elapsed_cycles = rdtsc().wrapping_sub(start_cycles);
    let elapsed_ns = start.elapsed().as_nanos() as f64;
    elapsed_cycles as f64 / elapsed_ns
}

#[cfg(target_arch = "aarch64")]
fn calibrate() -> f64 {
    let freq_hz: u64;
    unsafe {
        core::arch::asm!("mrs {}, cntfrq_el0", out(reg) freq_hz, options(nomem, nostack));
    }
    freq_hz as f64 / 1_000_000_000.0
}

/// Nanoseconds to cycles, rounding up so sleep deadlines never undershoot.
#[inline]
pub fn to_cycles(ns: u64) -> u64 {
    (ns as f64 * cycles_per_ns()).ceil() as u64
}

/// Cycles to nanoseconds.
#[inline]
pub fn to_nanos(cycles: u64) -> u64 {
    (cycles as f64 / cycles_per_ns()) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_is_monotonic() {
        let a = rdtsc();
        let b = rdtsc();
        assert!(b >= a);
    }

    #[test]
    fn conversions_round_trip_within_tolerance() {
        init();
        let ns = 1_000_000u64;
        let cycles = to_cycles(ns);
        assert!(cycles > 0);
        let back = to_nanos(cycles);
        // Rounding slack only.
        assert!(back >= ns);
        assert!(back < ns + ns / 100 + 16);
    }

    #[test]
    fn elapsed_cycles_track_wall_time() {
        use std::time::Duration;
        init();
        let before = rdtsc();
        std::thread::sleep(Duration::from_millis(5));
        let delta_ns = to_nanos(rdtsc() - before);
        assert!(delta_ns >= 5_000_000, "measured only {} ns", delta_ns);
    }
}
