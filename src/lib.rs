/// dspjit - Tiered Cranelift JIT for structured DSP bytecode
///
/// This library executes the per-sample code of a DSP program, given as a
/// tree of bytecode blocks, either in an interpreter or as native code
/// generated with Cranelift.
///
/// # Architecture
///
/// 1. **Bytecode** (`backend::bytecode`)
///    - A closed instruction set over an operand stack
///    - Structured control flow: `If`, `Select`, `Loop`, `CondBranch`
///    - Two flat heaps (integer and real) plus input/output sample buffers
///
/// 2. **Execution** (`backend::bytecode::vm`, `backend::bytecode::jit`)
///    - The interpreter runs any block
///    - The compiler turns a block into a native function, at most once
///    - The hybrid executor picks a tier per block and caches native code
///
/// # Example
///
/// ```ignore
/// use dspjit::backend::bytecode::{BlockBuilder, HybridExecutor, Instruction, Program};
///
/// // out[0][0] = in[0][0] * 2
/// let mut compute = BlockBuilder::new("compute");
/// compute.emit_all([
///     Instruction::Int32Value(0),
///     Instruction::LoadInput(0),
///     Instruction::RealValue(2.0),
///     Instruction::MulReal,
///     Instruction::Int32Value(0),
///     Instruction::StoreOutput(0),
/// ]);
/// let program = Program::new(compute.build(), 0, 0).with_ports(1, 1);
///
/// let mut executor = HybridExecutor::<f32>::new(program);
/// let mut out = [0.0f32; 1];
/// executor.compute(&[&[21.0][..]], &mut [&mut out[..]])?;
/// assert_eq!(out[0], 42.0);
/// ```
///
/// # Sample precision
///
/// Everything is generic over [`Real`](backend::bytecode::Real), implemented
/// for `f32` and `f64`. Math runtime symbols follow the C library naming
/// (`sinf` / `sin`).

pub mod backend;

pub use backend::bytecode::{
    Block, BlockBuilder, BlockCache, BlockCompiler, BytecodeVM, CompiledBlock, HybridConfig,
    HybridExecutor, Instruction, JitError, Program, VmError,
};
