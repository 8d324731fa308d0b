//! Test utilities for dspjit integration tests
//!
//! This module provides shared utilities for integration tests, including:
//! - Tracing setup that writes through the test harness
//! - Builders for the small DSP programs the tests run on both tiers
//! - Helpers to run a block in the interpreter and as native code

#![allow(dead_code)]

use std::sync::{Arc, Once};

use dspjit::backend::bytecode::{
    Block, BlockBuilder, BlockCompiler, BytecodeVM, Heaps, Instruction, Program, Real,
};
use Instruction::*;

static TRACING: Once = Once::new();

/// Install a fmt subscriber once per test binary
///
/// Warnings only, unless `DSPJIT_TEST_TRACE` is set.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let level = if std::env::var_os("DSPJIT_TEST_TRACE").is_some() {
            tracing::Level::TRACE
        } else {
            tracing::Level::WARN
        };
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .try_init();
    });
}

pub fn block(name: &str, ins: Vec<Instruction>) -> Arc<Block> {
    let mut builder = BlockBuilder::new(name);
    builder.emit_all(ins);
    builder.build()
}

/// `out[0][n] = in[0][n] * 2.0 + 1.0` for `n` in `0..int[1]`
///
/// The loop counter lives in `int[0]`; the control block sets `int[1]`.
pub fn gain_program(samples: i32) -> Program {
    let init = block("init", vec![Int32Value(0), StoreInt(0)]);
    let body = block(
        "body",
        vec![
            LoadInt(0),
            LoadInput(0),
            RealValue(2.0),
            MulReal,
            RealValue(1.0),
            AddReal,
            LoadInt(0),
            StoreOutput(0),
            Int32Value(1),
            LoadInt(0),
            AddInt,
            StoreInt(0),
            LoadInt(1),
            LoadInt(0),
            LtInt,
            CondBranch,
        ],
    );
    let mut compute = BlockBuilder::new("gain");
    compute.emit_loop(init, body);
    let control = block("control", vec![Int32Value(samples), StoreInt(1)]);

    Program::new(compute.build(), 2, 0)
        .with_control(control)
        .with_ports(1, 1)
}

/// `int[1] = if int[0] > 0 { 1 } else { -1 }`
pub fn sign_block() -> Arc<Block> {
    let mut builder = BlockBuilder::new("sign");
    builder.emit_all([Int32Value(0), LoadInt(0), GtInt]);
    builder.emit_if(
        block("positive", vec![Int32Value(1), StoreInt(1)]),
        block("non_positive", vec![Int32Value(-1), StoreInt(1)]),
    );
    builder.build()
}

/// Heaps, outputs and the tier-independent result of one run
pub struct Run<R> {
    pub heaps: Heaps<R>,
    pub outputs: Vec<Vec<R>>,
}

fn with_buffers<R: Real, E: std::fmt::Debug>(
    inputs: &[Vec<R>],
    out_lens: &[usize],
    run: impl FnOnce(&[&[R]], &mut [&mut [R]]) -> Result<(), E>,
) -> Vec<Vec<R>> {
    let ins: Vec<&[R]> = inputs.iter().map(|v| v.as_slice()).collect();
    let mut outputs: Vec<Vec<R>> = out_lens.iter().map(|&n| vec![R::default(); n]).collect();
    let mut outs: Vec<&mut [R]> = outputs.iter_mut().map(|v| v.as_mut_slice()).collect();
    run(&ins, &mut outs).expect("block should run");
    outputs
}

pub fn run_interpreted<R: Real>(
    block: &Block,
    mut heaps: Heaps<R>,
    inputs: &[Vec<R>],
    out_lens: &[usize],
) -> Run<R> {
    let mut vm = BytecodeVM::<R>::new();
    let outputs = with_buffers(inputs, out_lens, |ins, outs| {
        vm.execute(block, &mut heaps, ins, outs)
    });
    Run { heaps, outputs }
}

pub fn run_compiled<R: Real>(
    block: &Block,
    mut heaps: Heaps<R>,
    inputs: &[Vec<R>],
    out_lens: &[usize],
) -> Run<R> {
    let compiled = BlockCompiler::<R>::new()
        .compile(block)
        .expect("block should compile");
    let outputs = with_buffers(inputs, out_lens, |ins, outs| {
        compiled.execute(&mut heaps, ins, outs)
    });
    Run { heaps, outputs }
}

/// Bit patterns of a real buffer, so NaN and signed zero compare exactly
pub fn bits<R: Real>(values: &[R]) -> Vec<u64> {
    values.iter().map(|v| v.to_f64().to_bits()).collect()
}

/// Run `block` on both tiers from the same state and assert equal results
pub fn assert_tiers_agree<R: Real>(
    block: &Block,
    heaps: Heaps<R>,
    inputs: &[Vec<R>],
    out_lens: &[usize],
) -> Run<R> {
    let interpreted = run_interpreted(block, heaps.clone(), inputs, out_lens);
    let native = run_compiled(block, heaps, inputs, out_lens);

    assert_eq!(native.heaps.int, interpreted.heaps.int, "int heap of {}", block.name());
    assert_eq!(
        bits(&native.heaps.real),
        bits(&interpreted.heaps.real),
        "real heap of {}",
        block.name()
    );
    assert_eq!(native.outputs.len(), interpreted.outputs.len());
    for (n, i) in native.outputs.iter().zip(&interpreted.outputs) {
        assert_eq!(bits(n), bits(i), "outputs of {}", block.name());
    }
    native
}
