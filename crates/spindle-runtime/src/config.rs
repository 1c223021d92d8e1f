//! Runtime configuration
//!
//! Three layers, highest wins: command-line flags consumed by
//! `apply_args`, then environment variables, then built-in defaults.
//!
//! # Environment variables
//!
//! - `SPINDLE_NUM_CORES` - number of kernel workers
//! - `SPINDLE_STACK_SIZE` - strand stack size in bytes
//!
//! # Command-line flags
//!
//! - `-c`, `--numCores <N>`
//! - `-s`, `--stackSize <bytes>`
//!
//! Recognized flags and their values are consumed and removed from the
//! argument vector; a literal `--` ends option parsing and is consumed;
//! an unrecognized token stops parsing at that position, leaving it and
//! everything after it untouched.

use spindle_core::constants::{DEFAULT_NUM_CORES, DEFAULT_STACK_SIZE, MAX_CORES};
use spindle_core::env::env_get;
use spindle_core::error::{SchedError, SchedResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of kernel workers, one per core.
    pub num_cores: usize,

    /// Usable stack bytes per strand slot.
    pub stack_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl Config {
    /// Built-in defaults, no environment consulted. Mainly for tests that
    /// need deterministic settings.
    pub fn new() -> Self {
        Self {
            num_cores: DEFAULT_NUM_CORES,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self {
            num_cores: env_get("SPINDLE_NUM_CORES", DEFAULT_NUM_CORES),
            stack_size: env_get("SPINDLE_STACK_SIZE", DEFAULT_STACK_SIZE),
        }
    }

    pub fn num_cores(mut self, n: usize) -> Self {
        self.num_cores = n;
        self
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    /// Consume recognized flags from `args`, in place.
    ///
    /// Parsing starts after the program name at index 0. Consumed tokens
    /// (flags, their values, and a terminating `--`) are removed; the
    /// program name and any remaining application arguments stay.
    pub fn apply_args(&mut self, args: &mut Vec<String>) -> SchedResult<()> {
        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "-c" | "--numCores" => {
                    let value = args
                        .get(i + 1)
                        .ok_or(SchedError::InvalidConfig("missing value for --numCores"))?;
                    self.num_cores = value
                        .parse()
                        .map_err(|_| SchedError::InvalidConfig("bad value for --numCores"))?;
                    i += 2;
                }
                "-s" | "--stackSize" => {
                    let value = args
                        .get(i + 1)
                        .ok_or(SchedError::InvalidConfig("missing value for --stackSize"))?;
                    self.stack_size = value
                        .parse()
                        .map_err(|_| SchedError::InvalidConfig("bad value for --stackSize"))?;
                    i += 2;
                }
                "--" => {
                    i += 1;
                    break;
                }
                _ => break,
            }
        }
        args.drain(1..i);
        Ok(())
    }

    pub fn validate(&self) -> SchedResult<()> {
        if self.num_cores == 0 {
            return Err(SchedError::InvalidConfig("num_cores must be > 0"));
        }
        if self.num_cores > MAX_CORES {
            return Err(SchedError::InvalidConfig("num_cores exceeds MAX_CORES"));
        }
        if self.stack_size < 1024 {
            return Err(SchedError::InvalidConfig("stack_size must be >= 1024"));
        }
        if self.stack_size % 16 != 0 {
            return Err(SchedError::InvalidConfig(
                "stack_size must be 16-byte aligned",
            ));
        }
        Ok(())
    }
}
