//! Per-block compilation state and run counters
//!
//! A block moves through
//!
//! ```text
//! Uncompiled -> Compiling -> Compiled
//!                         \-> Failed
//! ```
//!
//! and never returns to `Uncompiled`. Only one caller can win the
//! `Uncompiled -> Compiling` transition, so a block is compiled at most once.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Compilation state of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompileState {
    /// Never compiled; runs in the interpreter
    Uncompiled = 0,

    /// A compilation is in flight
    Compiling = 1,

    /// Native code is cached
    Compiled = 2,

    /// Compilation failed; the block stays interpreted
    Failed = 3,
}

impl From<u8> for CompileState {
    fn from(v: u8) -> Self {
        match v {
            1 => CompileState::Compiling,
            2 => CompileState::Compiled,
            3 => CompileState::Failed,
            _ => CompileState::Uncompiled,
        }
    }
}

/// Profiling data for one block
///
/// All fields are atomics, so a profile can be shared between the cache and
/// any number of executors without locking.
#[derive(Debug)]
pub struct BlockProfile {
    state: AtomicU8,

    /// Runs through native code
    native_runs: AtomicU64,

    /// Runs through the interpreter
    interpreted_runs: AtomicU64,
}

impl BlockProfile {
    pub const fn new() -> Self {
        BlockProfile {
            state: AtomicU8::new(CompileState::Uncompiled as u8),
            native_runs: AtomicU64::new(0),
            interpreted_runs: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn state(&self) -> CompileState {
        CompileState::from(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_compiled(&self) -> bool {
        self.state() == CompileState::Compiled
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.state() == CompileState::Failed
    }

    /// Try to transition from Uncompiled to Compiling
    ///
    /// Returns true if this caller won the race to compile. The winner must
    /// call `set_compiled` or `set_failed` afterwards.
    pub fn try_start_compiling(&self) -> bool {
        self.state
            .compare_exchange(
                CompileState::Uncompiled as u8,
                CompileState::Compiling as u8,
                Ordering::AcqRel,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    pub fn set_compiled(&self) {
        self.state.store(CompileState::Compiled as u8, Ordering::Release);
    }

    /// Mark compilation as failed; the block will not be retried
    pub fn set_failed(&self) {
        self.state.store(CompileState::Failed as u8, Ordering::Release);
    }

    #[inline]
    pub fn record_run(&self, native: bool) {
        let counter = if native {
            &self.native_runs
        } else {
            &self.interpreted_runs
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn native_runs(&self) -> u64 {
        self.native_runs.load(Ordering::Relaxed)
    }

    pub fn interpreted_runs(&self) -> u64 {
        self.interpreted_runs.load(Ordering::Relaxed)
    }

    pub fn total_runs(&self) -> u64 {
        self.native_runs() + self.interpreted_runs()
    }
}

impl Default for BlockProfile {
    fn default() -> Self {
        BlockProfile::new()
    }
}
