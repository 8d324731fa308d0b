//! Benchmark comparing the bytecode VM with Cranelift-compiled blocks
//!
//! This benchmark measures the two execution tiers on per-sample loops:
//! - Tier 0: Bytecode VM
//! - Tier 1: Native code from the block compiler
//!
//! plus the one-off cost of compiling a block.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dspjit::backend::bytecode::{
    Block, BlockBuilder, BlockCompiler, BytecodeVM, CompileOptions, Heaps, HybridConfig,
    HybridExecutor, Instruction, OptLevel, Program, UnaryMath,
};
use std::sync::Arc;
use std::time::Duration;

use Instruction::*;

fn block(name: &str, ins: Vec<Instruction>) -> Arc<Block> {
    let mut builder = BlockBuilder::new(name);
    builder.emit_all(ins);
    builder.build()
}

/// Loop over `int[1]` samples with the counter in `int[0]`; `per_sample`
/// sees the sample index via `LoadInt(0)`
fn sample_loop(name: &str, per_sample: Vec<Instruction>) -> Arc<Block> {
    let init = block("init", vec![Int32Value(0), StoreInt(0)]);
    let mut body = per_sample;
    body.extend([
        Int32Value(1),
        LoadInt(0),
        AddInt,
        StoreInt(0),
        LoadInt(1),
        LoadInt(0),
        LtInt,
        CondBranch,
    ]);
    let mut compute = BlockBuilder::new(name);
    compute.emit_loop(init, block("body", body));
    compute.build()
}

/// `out[n] = in[n] * 0.5 + 0.25`
fn gain() -> Arc<Block> {
    sample_loop(
        "gain",
        vec![
            LoadInt(0),
            LoadInput(0),
            RealValue(0.5),
            MulReal,
            RealValue(0.25),
            AddReal,
            LoadInt(0),
            StoreOutput(0),
        ],
    )
}

/// One-pole low-pass: `y += 0.1 * (x - y)`, state in `real[0]`
fn one_pole() -> Arc<Block> {
    sample_loop(
        "one_pole",
        vec![
            LoadReal(0),
            LoadInt(0),
            LoadInput(0),
            SubReal,
            RealValue(0.1),
            MulReal,
            LoadReal(0),
            AddReal,
            StoreReal(0),
            LoadReal(0),
            LoadInt(0),
            StoreOutput(0),
        ],
    )
}

/// Sine oscillator through the math runtime: `out[n] = sin(phase)`
fn oscillator() -> Arc<Block> {
    sample_loop(
        "oscillator",
        vec![
            LoadReal(0),
            Unary(UnaryMath::Sin),
            LoadInt(0),
            StoreOutput(0),
            RealValue(0.0625),
            LoadReal(0),
            AddReal,
            StoreReal(0),
        ],
    )
}

fn input(len: usize) -> Vec<f32> {
    (0..len).map(|i| (i as f32 * 0.01).sin()).collect()
}

fn bench_tiers(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp_tiers");
    group.measurement_time(Duration::from_secs(5));

    let blocks = [("gain", gain()), ("one_pole", one_pole()), ("oscillator", oscillator())];
    for (name, compute) in blocks {
        let compiled = BlockCompiler::<f32>::new()
            .compile(&compute)
            .expect("bench block compiles");

        for len in [64usize, 256, 1024] {
            let samples = input(len);
            let mut output = vec![0.0f32; len];
            let mut heaps = Heaps::<f32>::new(2, 1);
            heaps.int[1] = len as i32;

            group.throughput(Throughput::Elements(len as u64));

            let mut vm = BytecodeVM::<f32>::new();
            group.bench_with_input(BenchmarkId::new(format!("{name}/vm"), len), &len, |b, _| {
                b.iter(|| {
                    vm.execute(
                        &compute,
                        &mut heaps,
                        &[black_box(&samples[..])],
                        &mut [&mut output[..]],
                    )
                    .expect("interpreted run")
                })
            });

            group.bench_with_input(BenchmarkId::new(format!("{name}/native"), len), &len, |b, _| {
                b.iter(|| {
                    compiled
                        .execute(
                            &mut heaps,
                            &[black_box(&samples[..])],
                            &mut [&mut output[..]],
                        )
                        .expect("native run")
                })
            });
        }
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    let compute = one_pole();

    for opt_level in [OptLevel::None, OptLevel::Speed, OptLevel::SpeedAndSize] {
        let compiler = BlockCompiler::<f32>::with_options(CompileOptions {
            opt_level,
            ..CompileOptions::default()
        });
        group.bench_function(BenchmarkId::new("one_pole", opt_level), |b| {
            b.iter(|| compiler.compile(black_box(&compute)).expect("compiles"))
        });
    }

    group.finish();
}

/// Whole-buffer dispatch through the executor, control block included
fn bench_executor(c: &mut Criterion) {
    let mut group = c.benchmark_group("executor");
    let len = 256usize;
    let samples = input(len);
    let mut output = vec![0.0f32; len];

    let program = || {
        Program::new(one_pole(), 2, 1)
            .with_control(block("control", vec![Int32Value(len as i32), StoreInt(1)]))
            .with_ports(1, 1)
    };

    for (label, config) in [
        ("hybrid", HybridConfig::default()),
        ("interpreter_only", HybridConfig::interpreter_only()),
    ] {
        let mut executor = HybridExecutor::<f32>::with_config(program(), config);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_function(label, |b| {
            b.iter(|| {
                executor
                    .compute(&[black_box(&samples[..])], &mut [&mut output[..]])
                    .expect("compute")
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tiers, bench_compile, bench_executor);
criterion_main!(benches);
