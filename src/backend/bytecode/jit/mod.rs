//! Cranelift JIT Compilation Module
//!
//! This module compiles bytecode blocks to native code using Cranelift and
//! dispatches between native code and the interpreter:
//!
//! ```text
//! Tier 0: Bytecode VM (every block)
//! Tier 1: Native code (blocks the compile policy selects, compiled once)
//! ```
//!
//! # Architecture
//!
//! The compile-time operand stack holds SSA values, so the generated code
//! has no runtime stack. Heaps and I/O buffers are passed in as four raw
//! pointers. Nested blocks are lowered by recursive descent into Cranelift
//! basic blocks.
//!
//! # Modules
//!
//! - [`types`]: JitError, JitResult and the entry point signature
//! - [`profile`]: Per-block compile state and run counters
//! - [`codegen`]: Cranelift IR generation helpers
//! - [`compiler`]: Block-to-Cranelift IR translation
//! - [`handlers`]: Opcode-specific IR generation handlers
//! - [`engine`]: Ownership of compiled code and safe invocation
//! - [`tiered`]: Block identity and the compiled block cache
//! - [`runtime`]: Math functions callable from JIT code
//! - [`hybrid`]: Hybrid executor combining JIT with interpreter fallback

pub mod codegen;
pub mod compiler;
pub mod engine;
pub mod handlers;
pub mod hybrid;
pub mod profile;
pub mod runtime;
pub mod tiered;
pub mod types;

// Re-export main types
pub use codegen::CodegenContext;
pub use compiler::{BlockCompiler, CompileOptions, FrameLayout};
pub use engine::{host_isa, CompiledBlock, OptLevel};
pub use hybrid::{CompilePolicy, ConfigError, HybridConfig, HybridExecutor, HybridStats};
pub use profile::{BlockProfile, CompileState};
pub use tiered::{BlockCache, BlockId, Tier};
pub use types::{BoundsTarget, JitError, JitResult, RawExecuteFn};
