//! JIT Compiler Initialization Module
//!
//! Runtime symbols the generated code may call are registered here, before
//! the module is created, and declared lazily while a block is translated.

mod math;

pub use math::{register_math_symbols, uniform_signature, MathImports, INT_ABS_SYMBOL};
