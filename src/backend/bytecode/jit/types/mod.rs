//! JIT Type Definitions
//!
//! This module defines the core types shared by the code generator and the
//! execution engine:
//! - [`JitResult`] and [`JitError`]: Result types for JIT operations
//! - [`RawExecuteFn`]: The calling convention of a compiled block

mod error;
mod signature;


// Re-export error types
pub use error::{BoundsTarget, JitError, JitResult};

// Re-export entry point signature
pub use signature::{
    FaultCode, RawExecuteFn, EXECUTE_PARAMS, FAULT_INDEX, FAULT_PORT, INT_HEAP_LEN, PORT_LENS,
    REAL_HEAP_LEN,
};
