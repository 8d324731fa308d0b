//! JIT error types.
//!
//! This module defines [`JitError`] and [`JitResult`] for compilation and
//! native execution error handling.

use std::fmt;

use crate::backend::bytecode::heap::HeapKind;

/// Buffer a run-time index addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsTarget {
    Heap(HeapKind),
    Input(u32),
    Output(u32),
}

impl fmt::Display for BoundsTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundsTarget::Heap(heap) => write!(f, "{} heap", heap),
            BoundsTarget::Input(port) => write!(f, "input port {}", port),
            BoundsTarget::Output(port) => write!(f, "output port {}", port),
        }
    }
}

// =============================================================================
// JitResult and JitError
// =============================================================================

/// Error types for JIT compilation and execution
#[derive(Debug, Clone, PartialEq)]
pub enum JitError {
    /// Block cannot be JIT compiled
    NotCompilable(String),

    /// Cranelift compilation error
    CompilationError(String),

    /// The generated function failed IR verification
    Verification(String),

    /// Compile-time operand stack exceeded its configured capacity
    StackOverflow { limit: usize },

    /// Compile-time operand stack underflow
    StackUnderflow,

    /// Operand of the wrong kind on the compile-time stack
    TypeMismatch { expected: &'static str, got: &'static str },

    /// Operand stacks disagree where control flow joins
    StackMismatch(String),

    /// A math symbol was requested with two different signatures
    SymbolSignatureMismatch(String),

    /// Heaps or I/O buffers too small for the compiled block
    FrameMismatch(String),

    /// Native code stopped at a run-time index outside its buffer
    IndexOutOfBounds { target: BoundsTarget, index: i64, len: usize },
}

impl fmt::Display for JitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JitError::NotCompilable(msg) => write!(f, "Not compilable: {}", msg),
            JitError::CompilationError(msg) => write!(f, "Compilation error: {}", msg),
            JitError::Verification(msg) => write!(f, "IR verification failed: {}", msg),
            JitError::StackOverflow { limit } => {
                write!(f, "Stack overflow (limit {})", limit)
            }
            JitError::StackUnderflow => write!(f, "Stack underflow"),
            JitError::TypeMismatch { expected, got } => {
                write!(f, "Type mismatch: expected {}, got {}", expected, got)
            }
            JitError::StackMismatch(msg) => write!(f, "Stack mismatch: {}", msg),
            JitError::SymbolSignatureMismatch(name) => {
                write!(f, "Symbol {} redeclared with a different signature", name)
            }
            JitError::FrameMismatch(msg) => write!(f, "Frame mismatch: {}", msg),
            JitError::IndexOutOfBounds { target, index, len } => {
                write!(f, "{} index {} out of bounds (len {})", target, index, len)
            }
        }
    }
}

impl std::error::Error for JitError {}

/// Result type for JIT operations
pub type JitResult<T> = Result<T, JitError>;
