//! Native entry point signature.

/// Entry point of a compiled block
///
/// `(int_heap, real_heap, inputs, outputs, bounds) -> status`, where
/// `inputs` and `outputs` point at arrays of per-port sample buffers and
/// `bounds` at a table of buffer lengths laid out as described by the slot
/// constants below. The real-typed pointers are erased to bytes so the same
/// function pointer type serves both precisions.
///
/// A status of 0 means the block ran to completion. Any other status is a
/// [`FaultCode`]: a run-time index fell outside its buffer and the block
/// stopped there, leaving the index in [`FAULT_INDEX`] and the port in
/// [`FAULT_PORT`].
pub type RawExecuteFn =
    unsafe extern "C" fn(*mut i32, *mut u8, *const *const u8, *const *mut u8, *mut i64) -> i32;

/// Number of pointer parameters of [`RawExecuteFn`]
pub const EXECUTE_PARAMS: usize = 5;

/// Bounds table slot receiving the offending index
pub const FAULT_INDEX: usize = 0;
/// Bounds table slot receiving the offending port
pub const FAULT_PORT: usize = 1;
/// Bounds table slot holding the int heap length
pub const INT_HEAP_LEN: usize = 2;
/// Bounds table slot holding the real heap length
pub const REAL_HEAP_LEN: usize = 3;
/// First per-port sample count: input ports, then output ports
pub const PORT_LENS: usize = 4;

/// Non-zero status returned by a compiled block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum FaultCode {
    IntHeap = 1,
    RealHeap = 2,
    Input = 3,
    Output = 4,
}

impl FaultCode {
    pub fn from_status(status: i32) -> Option<Self> {
        match status {
            1 => Some(FaultCode::IntHeap),
            2 => Some(FaultCode::RealHeap),
            3 => Some(FaultCode::Input),
            4 => Some(FaultCode::Output),
            _ => None,
        }
    }
}
