//! Execution Engine Adapter
//!
//! Owns the Cranelift module of one compiled block together with its
//! resolved entry point. The entry point never leaves a [`CompiledBlock`]
//! except through `&self` methods, so it cannot outlive the code memory.

use std::fmt;
use std::marker::PhantomData;
use std::sync::OnceLock;

use cranelift::codegen::isa::OwnedTargetIsa;
use cranelift::prelude::*;
use cranelift_jit::JITModule;
use serde::Deserialize;
use smallvec::SmallVec;
use tracing::debug;

use super::compiler::FrameLayout;
use super::types::{
    BoundsTarget, FaultCode, JitError, JitResult, RawExecuteFn, FAULT_INDEX, FAULT_PORT,
    INT_HEAP_LEN, PORT_LENS, REAL_HEAP_LEN,
};
use crate::backend::bytecode::heap::{HeapKind, Heaps};
use crate::backend::bytecode::real::Real;

/// Cranelift optimization level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptLevel {
    None,
    #[default]
    Speed,
    SpeedAndSize,
}

impl OptLevel {
    /// Value of Cranelift's `opt_level` setting
    pub fn as_setting(self) -> &'static str {
        match self {
            OptLevel::None => "none",
            OptLevel::Speed => "speed",
            OptLevel::SpeedAndSize => "speed_and_size",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for OptLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_setting())
    }
}

static HOST_ISAS: [OnceLock<OwnedTargetIsa>; 3] = [const { OnceLock::new() }; 3];

/// Host ISA for `opt`, built once per process per level
pub fn host_isa(opt: OptLevel) -> JitResult<OwnedTargetIsa> {
    let slot = &HOST_ISAS[opt.slot()];
    if let Some(isa) = slot.get() {
        return Ok(isa.clone());
    }

    let isa = build_isa(opt)?;
    Ok(slot.get_or_init(|| isa).clone())
}

fn build_isa(opt: OptLevel) -> JitResult<OwnedTargetIsa> {
    let mut flag_builder = settings::builder();
    flag_builder.set("opt_level", opt.as_setting()).map_err(|e| {
        JitError::CompilationError(format!("Failed to set opt_level: {}", e))
    })?;

    let isa_builder = cranelift_native::builder().map_err(|e| {
        JitError::CompilationError(format!("Failed to create ISA builder: {}", e))
    })?;

    let isa = isa_builder
        .finish(settings::Flags::new(flag_builder))
        .map_err(|e| JitError::CompilationError(format!("Failed to create ISA: {}", e)))?;

    debug!(
        target: "dspjit::jit::engine",
        opt_level = %opt,
        triple = %isa.triple(),
        "Built host ISA"
    );
    Ok(isa)
}

/// Native code for one bytecode block
///
/// Dropping it frees the code memory of its module.
pub struct CompiledBlock<R> {
    name: String,
    entry: RawExecuteFn,
    layout: FrameLayout,
    ir: Option<String>,
    module: Option<JITModule>,
    _real: PhantomData<fn(R)>,
}

// SAFETY: the module is only touched again in `Drop`, which has exclusive
// access. The finalized code is immutable and keeps no state of its own, so
// the entry point may be called from any thread given disjoint buffers.
unsafe impl<R> Send for CompiledBlock<R> {}
unsafe impl<R> Sync for CompiledBlock<R> {}

impl<R: Real> CompiledBlock<R> {
    /// Take ownership of a finalized module
    ///
    /// # Safety
    /// `entry` must be a finalized function of `module` whose signature is
    /// [`RawExecuteFn`] with `R`-sized real pointers.
    pub(crate) unsafe fn from_parts(
        name: &str,
        module: JITModule,
        entry: *const u8,
        ir: Option<String>,
        layout: FrameLayout,
    ) -> Self {
        CompiledBlock {
            name: name.to_string(),
            entry: std::mem::transmute::<*const u8, RawExecuteFn>(entry),
            layout,
            ir,
            module: Some(module),
            _real: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cranelift IR text, when kept at compile time
    pub fn ir(&self) -> Option<&str> {
        self.ir.as_deref()
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Run the block against a frame
    ///
    /// Static heap offsets and port numbers are checked against the frame
    /// before any code runs. Run-time indices are checked as they are used;
    /// an index outside its buffer stops the block with
    /// [`JitError::IndexOutOfBounds`], keeping the writes made before it.
    pub fn execute(
        &self,
        heaps: &mut Heaps<R>,
        inputs: &[&[R]],
        outputs: &mut [&mut [R]],
    ) -> JitResult<()> {
        self.layout.check(heaps, inputs.len(), outputs.len())?;

        let inputs = &inputs[..self.layout.inputs];
        let outputs = &mut outputs[..self.layout.outputs];

        let mut bounds: SmallVec<[i64; 16]> = SmallVec::new();
        bounds.resize(PORT_LENS, 0);
        bounds[INT_HEAP_LEN] = heaps.int.len() as i64;
        bounds[REAL_HEAP_LEN] = heaps.real.len() as i64;
        bounds.extend(inputs.iter().map(|buf| buf.len() as i64));
        bounds.extend(outputs.iter().map(|buf| buf.len() as i64));

        let input_ptrs: SmallVec<[*const R; 8]> = inputs.iter().map(|buf| buf.as_ptr()).collect();
        let output_ptrs: SmallVec<[*mut R; 8]> =
            outputs.iter_mut().map(|buf| buf.as_mut_ptr()).collect();

        // SAFETY: the layout check above covers every static access, the
        // bounds table holds the true length of every buffer the block can
        // index at run time, and all pointers come from live borrows held
        // for the whole call.
        let status = unsafe {
            self.call_raw(
                heaps.int.as_mut_ptr(),
                heaps.real.as_mut_ptr(),
                input_ptrs.as_ptr(),
                output_ptrs.as_ptr(),
                bounds.as_mut_ptr(),
            )
        };

        if status == 0 {
            return Ok(());
        }
        let fault = FaultCode::from_status(status).ok_or_else(|| {
            JitError::CompilationError(format!("Block {} returned status {}", self.name, status))
        })?;
        let port = bounds[FAULT_PORT] as u32;
        let (target, len_slot) = match fault {
            FaultCode::IntHeap => (BoundsTarget::Heap(HeapKind::Int), INT_HEAP_LEN),
            FaultCode::RealHeap => (BoundsTarget::Heap(HeapKind::Real), REAL_HEAP_LEN),
            FaultCode::Input => (BoundsTarget::Input(port), PORT_LENS + port as usize),
            FaultCode::Output => (
                BoundsTarget::Output(port),
                PORT_LENS + self.layout.inputs + port as usize,
            ),
        };
        Err(JitError::IndexOutOfBounds {
            target,
            index: bounds[FAULT_INDEX],
            len: bounds[len_slot] as usize,
        })
    }

    /// Call the entry point directly, returning its status
    ///
    /// # Safety
    /// Every static heap slot and port the block touches must be in bounds
    /// of the given pointers, `bounds` must follow the table layout of
    /// [`RawExecuteFn`] for this block's [`FrameLayout`] with true buffer
    /// lengths, and the buffers must not be accessed concurrently.
    #[inline]
    pub unsafe fn call_raw(
        &self,
        int_heap: *mut i32,
        real_heap: *mut R,
        inputs: *const *const R,
        outputs: *const *mut R,
        bounds: *mut i64,
    ) -> i32 {
        (self.entry)(int_heap, real_heap.cast(), inputs.cast(), outputs.cast(), bounds)
    }
}

impl<R> Drop for CompiledBlock<R> {
    fn drop(&mut self) {
        if let Some(module) = self.module.take() {
            debug!(target: "dspjit::jit::engine", block = %self.name, "Releasing compiled block");
            // SAFETY: `entry` is only reachable through `self`, which is
            // being dropped.
            unsafe { module.free_memory() };
        }
    }
}

impl<R> fmt::Debug for CompiledBlock<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledBlock")
            .field("name", &self.name)
            .field("layout", &self.layout)
            .field("has_ir", &self.ir.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opt_level_names() {
        assert_eq!(OptLevel::None.as_setting(), "none");
        assert_eq!(OptLevel::Speed.to_string(), "speed");
        assert_eq!(OptLevel::SpeedAndSize.as_setting(), "speed_and_size");
        assert_eq!(OptLevel::default(), OptLevel::Speed);
    }

    #[test]
    fn test_host_isa_is_shared() {
        let a = host_isa(OptLevel::Speed).unwrap();
        let b = host_isa(OptLevel::Speed).unwrap();
        assert!(std::sync::Arc::ptr_eq(&a, &b));
    }
}
