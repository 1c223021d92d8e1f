//! Basic spindle example
//!
//! Spawns a handful of strands across the configured cores and exercises
//! yield, sleep and join.
//!
//! Accepts the runtime flags (`-c/--numCores`, `-s/--stackSize`) plus:
//!
//! - `SPINDLE_DEMO_STRANDS=<n>` - strands per core (default: 4)
//! - `SPINDLE_DEMO_YIELDS=<n>` - yields per strand (default: 3)
//! - `SPINDLE_LOG_LEVEL=<level>` - runtime log level

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use spindle_core::env_get;
use spindle_core::sinfo;

static COMPLETED: AtomicUsize = AtomicUsize::new(0);

fn main() {
    let mut args: Vec<String> = std::env::args().collect();
    if let Err(e) = spindle::init_from_args(&mut args) {
        eprintln!("init failed: {}", e);
        std::process::exit(1);
    }

    let cores = spindle::num_cores();
    let per_core: usize = env_get("SPINDLE_DEMO_STRANDS", 4);
    let yields: usize = env_get("SPINDLE_DEMO_YIELDS", 3);
    COMPLETED.store(0, Ordering::SeqCst);

    println!(
        "spindle basic: {} cores, {} strands/core, {} yields each",
        cores, per_core, yields
    );

    let mut ids = Vec::new();
    for core in 0..cores {
        for n in 0..per_core {
            let id = spindle::spawn_on(core, move || {
                for _ in 0..yields {
                    spindle::yield_now();
                }
                spindle::sleep(Duration::from_micros(100));
                COMPLETED.fetch_add(1, Ordering::SeqCst);
            });
            if id.is_null() {
                eprintln!("core {} full at strand {}", core, n);
            } else {
                ids.push(id);
            }
        }
    }

    for id in ids {
        spindle::join(id);
    }
    sinfo!("all strands joined");

    println!(
        "completed {}/{}",
        COMPLETED.load(Ordering::SeqCst),
        cores * per_core
    );

    spindle::destroy().expect("teardown failed");
}
