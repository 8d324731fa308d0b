//! Type definitions for the bytecode VM.
//!
//! This module contains the core types used throughout the VM:
//! - VmError: Error types that can occur during execution
//! - Value: A runtime operand stack slot
//! - VmConfig: VM configuration options

use std::fmt;

use crate::backend::bytecode::heap::HeapKind;
use crate::backend::bytecode::real::Real;

/// Result of VM execution
pub type VmResult<T> = Result<T, VmError>;

/// Errors that can occur during VM execution
#[derive(Debug, Clone, PartialEq)]
pub enum VmError {
    /// Stack underflow
    StackUnderflow,
    /// Value stack overflow
    ValueStackOverflow { limit: usize },
    /// Type error in operation
    TypeError { expected: &'static str, got: &'static str },
    /// Integer division or remainder by zero
    DivisionByZero,
    /// Heap access outside the allocated heap
    HeapOutOfBounds { heap: HeapKind, index: i64, len: usize },
    /// Input or output port that the caller did not provide
    PortOutOfBounds { port: u32, available: usize },
    /// Sample index outside an I/O buffer
    SampleOutOfBounds { port: u32, index: i64, len: usize },
    /// `CondBranch` reached with a different stack depth than the block head
    StackMismatch { expected: usize, got: usize },
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackUnderflow => write!(f, "Stack underflow"),
            Self::ValueStackOverflow { limit } => {
                write!(f, "Value stack overflow (limit {})", limit)
            }
            Self::TypeError { expected, got } => {
                write!(f, "Type error: expected {}, got {}", expected, got)
            }
            Self::DivisionByZero => write!(f, "Division by zero"),
            Self::HeapOutOfBounds { heap, index, len } => {
                write!(f, "{} heap index {} out of bounds (len {})", heap, index, len)
            }
            Self::PortOutOfBounds { port, available } => {
                write!(f, "Port {} out of bounds ({} available)", port, available)
            }
            Self::SampleOutOfBounds { port, index, len } => {
                write!(f, "Sample {} out of bounds on port {} (len {})", index, port, len)
            }
            Self::StackMismatch { expected, got } => write!(
                f,
                "Stack depth {} at branch does not match block head depth {}",
                got, expected
            ),
        }
    }
}

impl std::error::Error for VmError {}

/// An operand stack slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<R> {
    Int(i32),
    Real(R),
}

impl<R: Real> Value<R> {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Real(_) => "real",
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Real(_) => None,
        }
    }

    pub fn as_real(&self) -> Option<R> {
        match self {
            Value::Real(v) => Some(*v),
            Value::Int(_) => None,
        }
    }
}

/// VM configuration
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Maximum operand stack depth
    pub max_stack_depth: usize,
    /// Enable instruction tracing
    pub trace: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_stack_depth: 512,
            trace: false,
        }
    }
}
