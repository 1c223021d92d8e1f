//! Kernel worker management
//!
//! Workers are OS threads, one per configured core, each pinned and running
//! the scheduling loop until shutdown.

use std::thread::{self, JoinHandle};

use spindle_core::error::WorkerError;
use spindle_core::swarn;

/// Handles of the spawned kernel workers.
pub(crate) struct CorePool {
    handles: Vec<JoinHandle<()>>,
}

impl CorePool {
    /// Spawn `num_cores` named workers running `entry(core_id)`.
    ///
    /// On spawn failure the partial pool is returned alongside the error so
    /// the caller can signal shutdown and join what did start.
    pub fn start<F>(num_cores: usize, entry: F) -> Result<Self, (Self, WorkerError)>
    where
        F: Fn(usize) + Send + Sync + Clone + 'static,
    {
        let mut handles = Vec::with_capacity(num_cores);
        for core_id in 0..num_cores {
            let entry = entry.clone();
            let spawned = thread::Builder::new()
                .name(format!("spindle-core-{}", core_id))
                .spawn(move || {
                    pin_current_worker(core_id);
                    entry(core_id);
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(_) => return Err((Self { handles }, WorkerError::SpawnFailed)),
            }
        }
        Ok(Self { handles })
    }

    /// Wait for every worker to exit.
    pub fn join(self) {
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

/// Pin the calling worker to a CPU.
///
/// The target is `core_id` modulo the CPUs actually present, so configs
/// with more cores than the host still start; a failed pin costs latency
/// isolation, not correctness, and is downgraded to a warning.
fn pin_current_worker(core_id: usize) {
    match core_affinity::get_core_ids() {
        Some(ids) if !ids.is_empty() => {
            let target = ids[core_id % ids.len()];
            if !core_affinity::set_for_current(target) {
                swarn!("worker {} could not pin to cpu {:?}", core_id, target);
            }
        }
        _ => swarn!("worker {} could not enumerate cpus; running unpinned", core_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn start_runs_one_entry_per_core() {
        let ran = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&ran);
        let pool = CorePool::start(3, move |core_id| {
            assert!(core_id < 3);
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .map_err(|(_, e)| e)
        .unwrap();
        pool.join();
        assert_eq!(ran.load(Ordering::SeqCst), 3);
    }
}
