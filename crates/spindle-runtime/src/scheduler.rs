//! Per-core scheduling loop, strand lifecycle and suspension primitives
//!
//! Each kernel worker runs `core_main` forever: read the cycle counter, scan
//! its own occupancy bitmap low-bit-first, and switch onto the first strand
//! whose wakeup time has arrived. Strands come back to the kernel stack by
//! yielding, sleeping, blocking, waiting, or exiting; the loop then continues
//! the same scan pass, so every runnable slot gets a turn per pass and
//! fairness comes from strands yielding, not from the scheduler.
//!
//! The runtime is a process-wide singleton with explicit init/teardown,
//! published through an atomic pointer; workers and strand primitives reach
//! it through that pointer and the thread-local core state.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicPtr, AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use spindle_core::constants::{BLOCKED, MAX_STRANDS_PER_CORE, RUNNABLE};
use spindle_core::error::{SchedError, SchedResult};
use spindle_core::occupancy::{OccupancySnapshot, OccupiedAndCount};
use spindle_core::{klog, sdebug, serror, sinfo, swarn};

use crate::arch;
use crate::config::Config;
use crate::context::{StrandContext, StrandId};
use crate::cycles;
use crate::stack::StrandStack;
use crate::tls;
use crate::worker::CorePool;

/// Everything one kernel worker owns: the occupancy word, the pre-allocated
/// slot contexts, the currently running strand, the worker's own saved stack
/// pointer, and a scratch save slot for exiting strands.
pub(crate) struct CoreState {
    core_id: usize,
    occupied_and_count: OccupiedAndCount,
    contexts: Box<[StrandContext]>,

    /// Context currently on this core's CPU; null while the worker is in its
    /// scan loop. Written only by the owning worker.
    running: UnsafeCell<*const StrandContext>,

    /// The worker's saved stack pointer while a strand runs.
    kernel_sp: UnsafeCell<*mut u8>,

    /// Save slot for the final switch of an exiting strand. Its own `sp`
    /// cannot be used: after the releasing CAS a creator may already have
    /// claimed the slot and written a fresh stack pointer there.
    exit_sp: UnsafeCell<*mut u8>,
}

// Safety: `running`, `kernel_sp` and `exit_sp` are touched only from the
// owning worker's OS thread (the scan loop and the strands it runs on that
// same thread); everything else is atomic or follows the slot ownership
// protocol in `context`.
unsafe impl Sync for CoreState {}

impl CoreState {
    fn build(core_id: usize, config: &Config) -> SchedResult<Self> {
        let mut contexts = Vec::with_capacity(MAX_STRANDS_PER_CORE);
        for slot in 0..MAX_STRANDS_PER_CORE {
            let stack = StrandStack::map(config.stack_size)?;
            contexts.push(StrandContext::new(core_id, slot as u32, stack));
        }
        Ok(Self {
            core_id,
            occupied_and_count: OccupiedAndCount::new(),
            contexts: contexts.into_boxed_slice(),
            running: UnsafeCell::new(core::ptr::null()),
            kernel_sp: UnsafeCell::new(core::ptr::null_mut()),
            exit_sp: UnsafeCell::new(core::ptr::null_mut()),
        })
    }

    #[inline]
    pub(crate) fn context(&self, slot: u32) -> &StrandContext {
        &self.contexts[slot as usize]
    }

    /// The strand currently on this core's CPU, if any. Meaningful only on
    /// the owning worker's thread.
    #[inline]
    pub(crate) fn current_strand(&self) -> Option<&StrandContext> {
        let ptr = unsafe { *self.running.get() };
        if ptr.is_null() {
            None
        } else {
            Some(unsafe { &*ptr })
        }
    }
}

pub(crate) struct Runtime {
    config: Config,
    cores: Box<[CoreState]>,
    shutdown: AtomicBool,
    pool: Mutex<Option<CorePool>>,
}

const DOWN: u8 = 0;
const TRANSITION: u8 = 1;
const UP: u8 = 2;

static STATE: AtomicU8 = AtomicU8::new(DOWN);
static RUNTIME: AtomicPtr<Runtime> = AtomicPtr::new(core::ptr::null_mut());

fn try_runtime() -> Option<&'static Runtime> {
    let ptr = RUNTIME.load(Ordering::Acquire);
    if ptr.is_null() {
        None
    } else {
        // Safety: the pointer is published at init and retired only after
        // every worker has been joined.
        Some(unsafe { &*ptr })
    }
}

fn runtime() -> &'static Runtime {
    try_runtime().expect("spindle runtime is not initialized")
}

/// Bring the runtime up: map all strand stacks, then spawn one pinned kernel
/// worker per configured core.
///
/// Partial failures unwind: stacks already mapped are released and workers
/// already spawned are joined before the error is returned.
pub fn init(config: Config) -> SchedResult<()> {
    klog::init();
    config.validate()?;
    cycles::init();

    if STATE
        .compare_exchange(DOWN, TRANSITION, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(SchedError::AlreadyInitialized);
    }

    let result = start_runtime(config);
    match result {
        Ok(()) => {
            STATE.store(UP, Ordering::SeqCst);
            Ok(())
        }
        Err(e) => {
            STATE.store(DOWN, Ordering::SeqCst);
            Err(e)
        }
    }
}

fn start_runtime(config: Config) -> SchedResult<()> {
    let mut cores = Vec::with_capacity(config.num_cores);
    for core_id in 0..config.num_cores {
        // A failed mapping drops the cores built so far, unmapping their
        // stacks on the way out.
        cores.push(CoreState::build(core_id, &config)?);
    }

    let num_cores = config.num_cores;
    let runtime = Box::new(Runtime {
        config,
        cores: cores.into_boxed_slice(),
        shutdown: AtomicBool::new(false),
        pool: Mutex::new(None),
    });
    let ptr = Box::into_raw(runtime);
    RUNTIME.store(ptr, Ordering::Release);
    let rt = unsafe { &*ptr };

    match CorePool::start(num_cores, core_main) {
        Ok(pool) => {
            *rt.pool.lock().unwrap() = Some(pool);
            sinfo!(
                "runtime started: {} cores, {} B stacks, {} slots/core",
                num_cores,
                rt.config.stack_size,
                MAX_STRANDS_PER_CORE
            );
            Ok(())
        }
        Err((partial, err)) => {
            serror!("worker spawn failed; unwinding partial init");
            rt.shutdown.store(true, Ordering::Release);
            partial.join();
            RUNTIME.store(core::ptr::null_mut(), Ordering::Release);
            unsafe { drop(Box::from_raw(ptr)) };
            Err(err.into())
        }
    }
}

/// Tear the runtime down.
///
/// Waits until the application has drained every strand (all occupancy words
/// empty), then stops and joins the workers and frees all per-core state.
/// Strands blocked forever make this wait forever; draining is the caller's
/// responsibility.
pub fn destroy() -> SchedResult<()> {
    if STATE
        .compare_exchange(UP, TRANSITION, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(SchedError::NotInitialized);
    }

    let ptr = RUNTIME.load(Ordering::Acquire);
    {
        let rt = unsafe { &*ptr };
        while rt
            .cores
            .iter()
            .any(|core| !core.occupied_and_count.is_empty())
        {
            std::thread::yield_now();
        }
        rt.shutdown.store(true, Ordering::Release);
        let pool = rt.pool.lock().unwrap().take();
        if let Some(pool) = pool {
            pool.join();
        }
    }

    RUNTIME.store(core::ptr::null_mut(), Ordering::Release);
    unsafe { drop(Box::from_raw(ptr)) };
    STATE.store(DOWN, Ordering::SeqCst);
    sdebug!("runtime stopped");
    Ok(())
}

/// The loop each kernel worker runs until shutdown.
fn core_main(core_id: usize) {
    let Some(rt) = try_runtime() else { return };
    let core = &rt.cores[core_id];
    tls::set_current_core(core);
    sdebug!("worker {} entering scheduling loop", core.core_id);

    loop {
        let mut now = cycles::rdtsc();
        let mut bits = core.occupied_and_count.bitmap();
        while bits != 0 {
            let slot = bits.trailing_zeros();
            bits &= bits - 1;
            let ctx = core.context(slot);
            if ctx.wakeup_cycles().load(Ordering::Acquire) <= now {
                run_strand(core, ctx);
                now = cycles::rdtsc();
            }
        }

        if rt.shutdown.load(Ordering::Acquire) && core.occupied_and_count.is_empty() {
            break;
        }
        core::hint::spin_loop();
    }

    tls::clear_current_core();
    sdebug!("worker {} exiting", core.core_id);
}

/// Switch onto a runnable strand; returns when it suspends or exits.
fn run_strand(core: &CoreState, ctx: &StrandContext) {
    // Running convention: a strand holding the CPU has no pending deadline.
    ctx.wakeup_cycles().store(BLOCKED, Ordering::Relaxed);
    unsafe {
        *core.running.get() = ctx;
        arch::swapcontext(core.kernel_sp.get(), ctx.sp_slot());
        *core.running.get() = core::ptr::null();
    }
}

/// The routine every strand's first stack frame returns into, and that its
/// entry closure returns to: run the invocation, retire the slot, and hand
/// the CPU back to the scheduler.
pub(crate) extern "C" fn strand_entry() {
    let core = tls::current_core().expect("strand entry outside a kernel worker");
    let ctx = core
        .current_strand()
        .expect("strand entry with no running strand");

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| unsafe {
        ctx.invocation().invoke();
    }));
    if outcome.is_err() {
        serror!(
            "strand on core {} slot {} panicked; retiring the slot",
            ctx.core_id(),
            ctx.slot_index()
        );
    }

    // Exit protocol: bump the generation first so stale ids are detectable
    // before the slot can be reused, then release the slot in one CAS. From
    // that point a creator on another kernel thread may reinitialize the
    // context, so the final switch saves the dying stack pointer into the
    // core's scratch slot.
    ctx.generation().fetch_add(1, Ordering::Release);
    core.occupied_and_count.release(ctx.slot_index());
    unsafe {
        arch::swapcontext(core.exit_sp.get(), core.kernel_sp.get());
    }
    unreachable!("exited strand was resumed");
}

/// Create a strand on `core_id` running `f`.
///
/// Returns `StrandId::NULL` when the core already holds
/// `MAX_STRANDS_PER_CORE` strands. The core hint is binding: no balancing or
/// fallback to other cores happens here. Closures larger than the inline
/// invocation buffer are rejected at compile time.
pub fn spawn_on<F>(core_id: usize, f: F) -> StrandId
where
    F: FnOnce() + Send + 'static,
{
    let rt = runtime();
    assert!(
        core_id < rt.cores.len(),
        "core {} out of range ({} cores)",
        core_id,
        rt.cores.len()
    );
    let core = &rt.cores[core_id];

    let Some(slot) = core.occupied_and_count.try_claim() else {
        return StrandId::NULL;
    };
    let ctx = core.context(slot);
    let generation = ctx.generation().load(Ordering::Acquire);
    unsafe {
        ctx.invocation().store(f);
        ctx.prepare_entry();
    }
    let id = StrandId::new(ctx, generation);

    // Publication point: the claimed slot still carries the blocked
    // sentinel, so the scheduler ignores it until this store.
    ctx.wakeup_cycles().store(RUNNABLE, Ordering::Release);
    id
}

/// Give up the CPU, staying runnable. Off-strand this yields the OS thread.
pub fn yield_now() {
    match on_strand() {
        Some((core, ctx)) => {
            ctx.wakeup_cycles().store(RUNNABLE, Ordering::Release);
            suspend_on(core, ctx);
        }
        None => std::thread::yield_now(),
    }
}

/// Suspend the calling strand for at least `duration`.
///
/// The slot stays occupied; the scheduler skips it until the deadline
/// passes. There is no upper bound on the actual delay. Off-strand this is
/// an OS sleep.
pub fn sleep(duration: Duration) {
    match on_strand() {
        Some((core, ctx)) => {
            let deadline = cycles::rdtsc() + cycles::to_cycles(duration.as_nanos() as u64);
            ctx.wakeup_cycles().store(deadline, Ordering::Release);
            suspend_on(core, ctx);
        }
        None => std::thread::sleep(duration),
    }
}

/// Park the calling strand until some other flow `signal`s it.
///
/// A running strand's wakeup time already holds the blocked sentinel, so
/// parking is just the switch out; re-storing the sentinel here could
/// overwrite a signal that has already arrived.
pub fn block() {
    match on_strand() {
        Some((core, ctx)) => suspend_on(core, ctx),
        None => swarn!("block() outside a strand ignored"),
    }
}

/// Make the strand behind `id` runnable.
///
/// No generation check is performed: signalling an id whose strand has
/// exited and whose slot was reused wakes the current occupant. Callers must
/// keep the target alive, or tolerate that.
pub fn signal(id: StrandId) {
    if id.is_null() {
        return;
    }
    unsafe {
        (*id.context).wakeup_cycles().store(RUNNABLE, Ordering::Release);
    }
}

/// Wait until the strand behind `id` has exited.
///
/// Spins on the generation snapshot, yielding between probes; returns
/// immediately when the strand is already gone.
pub fn join(id: StrandId) {
    if id.is_null() {
        return;
    }
    let ctx = unsafe { &*id.context };
    while ctx.generation().load(Ordering::Acquire) == id.generation {
        yield_now();
    }
}

/// Handle of the calling strand, or `StrandId::NULL` off-strand.
pub fn current_id() -> StrandId {
    match on_strand() {
        Some((_, ctx)) => StrandId::new(ctx, ctx.generation().load(Ordering::Relaxed)),
        None => StrandId::NULL,
    }
}

/// Number of cores the live runtime schedules on.
pub fn num_cores() -> usize {
    runtime().cores.len()
}

/// Configured strand stack size of the live runtime.
pub fn stack_size() -> usize {
    runtime().config.stack_size
}

/// Decoded occupancy word of one core, for diagnostics and tests.
pub fn occupancy_snapshot(core_id: usize) -> OccupancySnapshot {
    let rt = runtime();
    rt.cores[core_id].occupied_and_count.load()
}

/// Switch out without touching the wakeup time. Used by the condition
/// variable, whose waiters must not overwrite a signal that lands between
/// list insertion and the switch.
pub(crate) fn suspend() {
    if let Some((core, ctx)) = on_strand() {
        suspend_on(core, ctx);
    } else {
        std::thread::yield_now();
    }
}

#[inline]
fn on_strand() -> Option<(&'static CoreState, &'static StrandContext)> {
    let core = tls::current_core()?;
    let ctx = core.current_strand()?;
    Some((core, ctx))
}

#[inline]
fn suspend_on(core: &CoreState, ctx: &StrandContext) {
    unsafe {
        arch::swapcontext(ctx.sp_slot(), core.kernel_sp.get());
    }
}
