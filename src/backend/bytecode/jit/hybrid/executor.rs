//! HybridExecutor implementation.
//!
//! This module contains the core HybridExecutor struct and its methods for
//! switching between native code and the interpreter per block.

use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::backend::bytecode::block::{Block, Program};
use crate::backend::bytecode::heap::Heaps;
use crate::backend::bytecode::real::Real;
use crate::backend::bytecode::vm::{BytecodeVM, VmError, VmResult};

use super::super::compiler::BlockCompiler;
use super::super::engine::CompiledBlock;
use super::super::tiered::{BlockCache, Tier};
use super::super::types::{BoundsTarget, JitError, JitResult};
use super::config::{CompilePolicy, HybridConfig, HybridStats};

/// Hybrid JIT/Bytecode Executor
///
/// Owns the heaps of one DSP instance and runs its blocks either as native
/// code or in the interpreter. Both paths give the same observable result.
///
/// # Thread Safety
///
/// The executor itself is not thread-safe, but the underlying
/// [`BlockCache`] can be shared between executors on different threads.
pub struct HybridExecutor<R: Real> {
    program: Program,
    heaps: Heaps<R>,
    vm: BytecodeVM<R>,
    /// Compiled block cache (shareable across executors)
    cache: Arc<BlockCache<R>>,
    compiler: BlockCompiler<R>,
    config: HybridConfig,
    stats: HybridStats,
}

impl<R: Real> HybridExecutor<R> {
    /// Create a new HybridExecutor with default configuration
    pub fn new(program: Program) -> Self {
        Self::with_config(program, HybridConfig::default())
    }

    pub fn with_config(program: Program, config: HybridConfig) -> Self {
        Self::with_shared_cache(program, config, Arc::new(BlockCache::new()))
    }

    /// Create a HybridExecutor that shares its cache with other executors
    pub fn with_shared_cache(
        program: Program,
        config: HybridConfig,
        cache: Arc<BlockCache<R>>,
    ) -> Self {
        let mut executor = Self {
            heaps: Heaps::new(program.int_heap_size, program.real_heap_size),
            vm: BytecodeVM::with_config(config.vm_config()),
            compiler: BlockCompiler::with_options(config.compile_options()),
            stats: HybridStats::default(),
            program,
            cache,
            config,
        };

        if executor.config.eager_compile && executor.config.policy != CompilePolicy::Never {
            let compute = Arc::clone(&executor.program.compute);
            // A failure is logged and the block stays interpreted
            if let Err(e) = executor.compile_block(&compute) {
                debug!(target: "dspjit::jit::hybrid", error = %e, "Eager compilation skipped");
            }
        }
        executor
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    pub fn stats(&self) -> &HybridStats {
        &self.stats
    }

    /// The block cache, for sharing with other executors
    pub fn cache(&self) -> Arc<BlockCache<R>> {
        Arc::clone(&self.cache)
    }

    pub fn heaps(&self) -> &Heaps<R> {
        &self.heaps
    }

    pub fn heaps_mut(&mut self) -> &mut Heaps<R> {
        &mut self.heaps
    }

    /// Whether `block` may be compiled on a miss
    fn may_compile(&self, block: &Arc<Block>, compile_hint: bool) -> bool {
        match self.config.policy {
            CompilePolicy::ComputeOnly => compile_hint && self.program.is_compute(block),
            CompilePolicy::Hinted => compile_hint,
            CompilePolicy::Never => false,
        }
    }

    /// Compile `block` unless it is already cached
    ///
    /// Idempotent: a cached block is returned as is, and a block that failed
    /// before is not compiled again.
    pub fn compile_block(&mut self, block: &Arc<Block>) -> JitResult<Arc<CompiledBlock<R>>> {
        let compiler = &self.compiler;
        let mut attempted = false;

        let result = self.cache.get_or_compile(block, |b| {
            attempted = true;
            compiler.compile(b)
        });

        if attempted {
            match &result {
                Ok(_) => {
                    self.stats.compilations += 1;
                    debug!(target: "dspjit::jit::hybrid", block = block.name(), "Compiled block");
                }
                Err(e) => {
                    self.stats.failures += 1;
                    warn!(
                        target: "dspjit::jit::hybrid",
                        block = block.name(),
                        error = %e,
                        "Compilation failed, falling back to the interpreter"
                    );
                }
            }
        }
        result
    }

    /// Execute one block against the executor's heaps
    ///
    /// This is the main entry point for execution. It:
    /// 1. Checks the cache for compiled native code
    /// 2. On a miss, compiles if the hint and the policy allow it
    /// 3. Runs native code when available and the interpreter otherwise
    ///
    /// Returns the tier the block ran in.
    pub fn execute_block(
        &mut self,
        block: &Arc<Block>,
        compile_hint: bool,
        inputs: &[&[R]],
        outputs: &mut [&mut [R]],
    ) -> VmResult<Tier> {
        self.stats.runs += 1;

        if self.config.policy == CompilePolicy::Never {
            self.run_vm(block, inputs, outputs)?;
            return Ok(Tier::Interpreter);
        }

        let compiled = match self.cache.get(block) {
            Some(compiled) => Some(compiled),
            None if self.may_compile(block, compile_hint) && !self.cache.is_failed(block) => {
                self.compile_block(block).ok()
            }
            None => None,
        };

        if self.config.trace {
            trace!(
                target: "dspjit::jit::hybrid",
                block = block.name(),
                native = compiled.is_some(),
                "Executing block"
            );
        }

        if let Some(compiled) = compiled {
            match compiled.execute(&mut self.heaps, inputs, outputs) {
                Ok(()) => {
                    self.stats.native_runs += 1;
                    self.cache.record_run(block, true);
                    return Ok(Tier::Native);
                }
                Err(JitError::IndexOutOfBounds { target, index, len }) => {
                    // The block ran up to the fault, so rerunning it would
                    // repeat its earlier writes
                    self.stats.native_runs += 1;
                    self.cache.record_run(block, true);
                    return Err(match target {
                        BoundsTarget::Heap(heap) => VmError::HeapOutOfBounds { heap, index, len },
                        BoundsTarget::Input(port) | BoundsTarget::Output(port) => {
                            VmError::SampleOutOfBounds { port, index, len }
                        }
                    });
                }
                Err(e) => {
                    // Rejected before any code ran; the interpreter reports
                    // the precise fault
                    self.stats.native_bailouts += 1;
                    warn!(
                        target: "dspjit::jit::hybrid",
                        block = block.name(),
                        error = %e,
                        "Native run rejected"
                    );
                }
            }
        }

        self.run_vm(block, inputs, outputs)?;
        Ok(Tier::Interpreter)
    }

    /// Run one buffer: the control block (interpreted), then the compute block
    pub fn compute(&mut self, inputs: &[&[R]], outputs: &mut [&mut [R]]) -> VmResult<Tier> {
        if let Some(control) = self.program.control.clone() {
            self.execute_block(&control, false, inputs, outputs)?;
        }
        let compute = Arc::clone(&self.program.compute);
        self.execute_block(&compute, true, inputs, outputs)
    }

    /// Run using the bytecode VM only
    fn run_vm(
        &mut self,
        block: &Arc<Block>,
        inputs: &[&[R]],
        outputs: &mut [&mut [R]],
    ) -> VmResult<()> {
        self.stats.interpreted_runs += 1;
        self.cache.record_run(block, false);
        self.vm.execute(block, &mut self.heaps, inputs, outputs)
    }

    /// Zero the heaps and statistics; compiled code stays cached
    pub fn reset(&mut self) {
        self.heaps.clear();
        self.stats = HybridStats::default();
    }
}

impl<R: Real> std::fmt::Debug for HybridExecutor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridExecutor")
            .field("compute", &self.program.compute.name())
            .field("config", &self.config)
            .field("stats", &self.stats)
            .field("cache", &self.cache)
            .finish()
    }
}
