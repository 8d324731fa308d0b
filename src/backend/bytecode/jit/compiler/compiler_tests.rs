use std::sync::Arc;

use super::*;
use crate::backend::bytecode::block::{Block, BlockBuilder};
use crate::backend::bytecode::heap::Heaps;
use crate::backend::bytecode::jit::types::BoundsTarget;
use crate::backend::bytecode::opcodes::UnaryMath;
use crate::backend::bytecode::vm::BytecodeVM;

use Instruction::*;

fn block(name: &str, ins: Vec<Instruction>) -> Arc<Block> {
    let mut builder = BlockBuilder::new(name);
    builder.emit_all(ins);
    builder.build()
}

fn compile<R: Real>(block: &Block) -> CompiledBlock<R> {
    BlockCompiler::<R>::new()
        .compile(block)
        .expect("block should compile")
}

fn compile_err(ins: Vec<Instruction>) -> JitError {
    BlockCompiler::<f32>::new()
        .compile(&block("bad", ins))
        .expect_err("block should not compile")
}

/// Heaps and output buffers after one run
struct Run<R> {
    heaps: Heaps<R>,
    outputs: Vec<Vec<R>>,
}

fn output_buffers<R: Real>(lens: &[usize]) -> Vec<Vec<R>> {
    lens.iter().map(|&n| vec![R::default(); n]).collect()
}

fn run_native<R: Real>(
    compiled: &CompiledBlock<R>,
    mut heaps: Heaps<R>,
    inputs: &[Vec<R>],
    out_lens: &[usize],
) -> Run<R> {
    let ins: Vec<&[R]> = inputs.iter().map(|v| v.as_slice()).collect();
    let mut outputs = output_buffers(out_lens);
    let mut outs: Vec<&mut [R]> = outputs.iter_mut().map(|v| v.as_mut_slice()).collect();
    compiled
        .execute(&mut heaps, &ins, &mut outs)
        .expect("native run should succeed");
    Run { heaps, outputs }
}

fn run_vm<R: Real>(
    block: &Block,
    mut heaps: Heaps<R>,
    inputs: &[Vec<R>],
    out_lens: &[usize],
) -> Run<R> {
    let ins: Vec<&[R]> = inputs.iter().map(|v| v.as_slice()).collect();
    let mut outputs = output_buffers(out_lens);
    let mut outs: Vec<&mut [R]> = outputs.iter_mut().map(|v| v.as_mut_slice()).collect();
    BytecodeVM::<R>::new()
        .execute(block, &mut heaps, &ins, &mut outs)
        .expect("interpreted run should succeed");
    Run { heaps, outputs }
}

fn bits<R: Real>(values: &[R]) -> Vec<u64> {
    values.iter().map(|v| v.to_f64().to_bits()).collect()
}

/// Run both tiers from the same state and require bitwise equal results
fn run_both<R: Real>(
    block: &Block,
    heaps: Heaps<R>,
    inputs: &[Vec<R>],
    out_lens: &[usize],
) -> Run<R> {
    let native = run_native(&compile::<R>(block), heaps.clone(), inputs, out_lens);
    let interpreted = run_vm(block, heaps, inputs, out_lens);

    assert_eq!(native.heaps.int, interpreted.heaps.int, "int heap differs in {}", block.name());
    assert_eq!(
        bits(&native.heaps.real),
        bits(&interpreted.heaps.real),
        "real heap differs in {}",
        block.name()
    );
    for (n, i) in native.outputs.iter().zip(&interpreted.outputs) {
        assert_eq!(bits(n), bits(i), "outputs differ in {}", block.name());
    }
    native
}

/// Evaluate to an int stored at int heap slot 0
fn eval_int(mut ins: Vec<Instruction>) -> i32 {
    ins.push(StoreInt(0));
    run_both::<f32>(&block("eval_int", ins), Heaps::new(8, 8), &[], &[]).heaps.int[0]
}

/// Evaluate to a real stored at real heap slot 0
fn eval_real(mut ins: Vec<Instruction>) -> f32 {
    ins.push(StoreReal(0));
    run_both::<f32>(&block("eval_real", ins), Heaps::new(8, 8), &[], &[]).heaps.real[0]
}

/// `out[0][i] = in[0][i] * 2 + 1` for i in 0..4, unrolled
fn gain_block() -> Arc<Block> {
    let mut ins = Vec::new();
    for i in 0..4 {
        ins.extend([
            Int32Value(i),
            LoadInput(0),
            RealValue(2.0),
            MulReal,
            RealValue(1.0),
            AddReal,
            Int32Value(i),
            StoreOutput(0),
        ]);
    }
    block("gain", ins)
}

// =============================================================================
// Arithmetic
// =============================================================================

#[test]
fn test_left_operand_is_top_of_stack() {
    assert_eq!(eval_int(vec![Int32Value(3), Int32Value(10), SubInt]), 7);
    assert_eq!(eval_real(vec![RealValue(4.0), RealValue(1.0), DivReal]), 0.25);
    assert_eq!(eval_int(vec![Int32Value(2), Int32Value(-7), DivInt]), -3);
    assert_eq!(eval_int(vec![Int32Value(3), Int32Value(-7), RemInt]), -1);
}

#[test]
fn test_integer_arithmetic_wraps() {
    assert_eq!(eval_int(vec![Int32Value(1), Int32Value(i32::MAX), AddInt]), i32::MIN);
    assert_eq!(eval_int(vec![Int32Value(2), Int32Value(i32::MAX), MulInt]), -2);
    assert_eq!(eval_int(vec![Int32Value(1), Int32Value(i32::MIN), SubInt]), i32::MAX);
}

#[test]
fn test_min_divided_by_minus_one_wraps() {
    assert_eq!(eval_int(vec![Int32Value(-1), Int32Value(i32::MIN), DivInt]), i32::MIN);
    assert_eq!(eval_int(vec![Int32Value(-1), Int32Value(i32::MIN), RemInt]), 0);
    assert_eq!(eval_int(vec![Int32Value(-1), Int32Value(7), DivInt]), -7);
    assert_eq!(eval_int(vec![Int32Value(-1), Int32Value(i32::MAX), DivInt]), -i32::MAX);
}

#[test]
fn test_shifts_are_logical_and_masked() {
    assert_eq!(eval_int(vec![Int32Value(28), Int32Value(-1), RshInt]), 0xf);
    assert_eq!(eval_int(vec![Int32Value(4), Int32Value(1), LshInt]), 16);
    assert_eq!(eval_int(vec![Int32Value(33), Int32Value(1), LshInt]), 2);
}

#[test]
fn test_bitwise() {
    assert_eq!(eval_int(vec![Int32Value(0b1100), Int32Value(0b1010), AndInt]), 0b1000);
    assert_eq!(eval_int(vec![Int32Value(0b1100), Int32Value(0b1010), OrInt]), 0b1110);
    assert_eq!(eval_int(vec![Int32Value(0b1100), Int32Value(0b1010), XorInt]), 0b0110);
}

#[test]
fn test_binary_ops_match_interpreter() {
    let int_ops = [AddInt, SubInt, MulInt, DivInt, RemInt, LshInt, RshInt, AndInt, OrInt, XorInt];
    let int_pairs = [(1, 2), (-7, 3), (i32::MAX, 5), (12, -12), (5, 31), (i32::MIN, -1)];
    for op in &int_ops {
        for &(a, b) in &int_pairs {
            let ins = vec![Int32Value(b), Int32Value(a), op.clone(), StoreInt(0)];
            run_both::<f32>(&block(op.mnemonic(), ins), Heaps::new(1, 0), &[], &[]);
        }
    }

    let real_ops = [AddReal, SubReal, MulReal, DivReal, RemReal, MinReal, MaxReal];
    let real_pairs = [(1.5, 2.0), (-7.25, 3.0), (0.0, -0.0), (1e30, 1e-30), (f64::NAN, 1.0)];
    for op in &real_ops {
        for &(a, b) in &real_pairs {
            let ins = vec![RealValue(b), RealValue(a), op.clone(), StoreReal(0)];
            run_both::<f32>(&block(op.mnemonic(), ins.clone()), Heaps::new(0, 1), &[], &[]);
            run_both::<f64>(&block(op.mnemonic(), ins), Heaps::new(0, 1), &[], &[]);
        }
    }
}

// =============================================================================
// Comparisons
// =============================================================================

#[test]
fn test_comparisons_materialize_int() {
    assert_eq!(eval_int(vec![Int32Value(1), Int32Value(2), GtInt]), 1);
    assert_eq!(eval_int(vec![Int32Value(2), Int32Value(1), GtInt]), 0);
    assert_eq!(eval_int(vec![Int32Value(2), Int32Value(2), GeInt]), 1);
    assert_eq!(eval_int(vec![Int32Value(-1), Int32Value(2), LtInt]), 0);
    assert_eq!(eval_int(vec![RealValue(2.0), RealValue(2.0), EqReal]), 1);
    assert_eq!(eval_int(vec![RealValue(3.0), RealValue(2.0), LeReal]), 1);
}

#[test]
fn test_real_comparisons_are_ordered() {
    let nan = f64::NAN;
    for op in [GtReal, LtReal, GeReal, LeReal, EqReal, NeReal] {
        assert_eq!(eval_int(vec![RealValue(1.0), RealValue(nan), op.clone()]), 0, "{}", op);
    }
    assert_eq!(eval_int(vec![RealValue(1.0), RealValue(2.0), NeReal]), 1);
}

#[test]
fn test_min_max() {
    assert_eq!(eval_int(vec![Int32Value(-3), Int32Value(4), MinInt]), -3);
    assert_eq!(eval_int(vec![Int32Value(-3), Int32Value(4), MaxInt]), 4);
    assert_eq!(eval_real(vec![RealValue(0.5), RealValue(-0.5), MinReal]), -0.5);
    assert_eq!(eval_real(vec![RealValue(0.5), RealValue(-0.5), MaxReal]), 0.5);
    // With NaN on top, `lhs < rhs` is false and max keeps lhs
    assert!(eval_real(vec![RealValue(1.0), RealValue(f64::NAN), MaxReal]).is_nan());
    assert_eq!(eval_real(vec![RealValue(1.0), RealValue(f64::NAN), MinReal]), 1.0);
}

// =============================================================================
// Conversions and math
// =============================================================================

#[test]
fn test_conversions() {
    assert_eq!(eval_real(vec![Int32Value(-3), CastReal]), -3.0);
    assert_eq!(eval_int(vec![RealValue(2.7), CastInt]), 2);
    assert_eq!(eval_int(vec![RealValue(-2.7), CastInt]), -2);
    assert_eq!(eval_int(vec![RealValue(f64::NAN), CastInt]), 0);
    assert_eq!(eval_int(vec![RealValue(1e10), CastInt]), i32::MAX);
    assert_eq!(eval_int(vec![RealValue(1.0), BitcastInt]), 0x3f80_0000);
    assert_eq!(eval_real(vec![Int32Value(0x3f80_0000), BitcastReal]), 1.0);
}

#[test]
fn test_double_precision_bitcasts() {
    let ins = vec![
        RealValue(1.0),
        BitcastInt,
        StoreInt(0),
        Int32Value(1),
        BitcastReal,
        StoreReal(0),
    ];
    let run = run_both::<f64>(&block("bitcast64", ins), Heaps::new(1, 1), &[], &[]);
    // Low 32 bits of 1.0f64 are zero; the int pattern is zero-extended
    assert_eq!(run.heaps.int[0], 0);
    assert_eq!(run.heaps.real[0].to_bits(), 1);
}

#[test]
fn test_real_remainder_is_exact_for_large_dividends() {
    // 2^60 rem 3 on both tiers
    let ins = vec![RealValue(3.0), RealValue(2f64.powi(60)), RemReal, StoreReal(0)];
    let run = run_both::<f64>(&block("big_rem", ins), Heaps::new(0, 1), &[], &[]);
    assert_eq!(run.heaps.real[0], 1.0);
}

#[test]
fn test_math_calls() {
    assert_eq!(eval_real(vec![RealValue(16.0), Unary(UnaryMath::Sqrt)]), 4.0);
    assert_eq!(eval_real(vec![RealValue(-2.5), Unary(UnaryMath::Fabs)]), 2.5);
    assert_eq!(eval_real(vec![RealValue(2.4), Unary(UnaryMath::Floor)]), 2.0);
    assert_eq!(eval_real(vec![RealValue(3.0), RealValue(2.0), Binary(BinaryMath::Pow)]), 8.0);
    assert_eq!(eval_real(vec![RealValue(3.0), RealValue(8.0), RemReal]), -1.0);
    assert_eq!(eval_int(vec![Int32Value(-5), Abs]), 5);

    for op in UnaryMath::ALL {
        let ins = vec![RealValue(0.5), Unary(op), StoreReal(0)];
        run_both::<f32>(&block(op.c_name(), ins.clone()), Heaps::new(0, 1), &[], &[]);
        run_both::<f64>(&block(op.c_name(), ins), Heaps::new(0, 1), &[], &[]);
    }
}

#[test]
fn test_math_symbols_declared_once() {
    let ins = vec![
        RealValue(0.1),
        Unary(UnaryMath::Sin),
        Unary(UnaryMath::Sin),
        Unary(UnaryMath::Cos),
        Unary(UnaryMath::Sin),
        StoreReal(0),
    ];
    let options = CompileOptions {
        keep_ir: true,
        ..Default::default()
    };
    let compiled = BlockCompiler::<f32>::with_options(options)
        .compile(&block("trig", ins))
        .unwrap();
    let ir = compiled.ir().expect("IR should be kept");
    let imports = ir.lines().filter(|l| l.trim_start().starts_with("fn")).count();
    assert_eq!(imports, 2, "{}", ir);
}

// =============================================================================
// Heaps and I/O
// =============================================================================

#[test]
fn test_indexed_access() {
    let ins = vec![
        // heap[1 + 2] = 5
        Int32Value(5),
        Int32Value(2),
        StoreIndexedInt(1),
        // heap[4 + -1] is the same slot
        Int32Value(-1),
        LoadIndexedInt(4),
        StoreInt(0),
        RealValue(1.5),
        Int32Value(3),
        StoreIndexedReal(0),
        Int32Value(1),
        LoadIndexedReal(2),
        StoreReal(0),
    ];
    let run = run_both::<f32>(&block("indexed", ins), Heaps::new(8, 8), &[], &[]);
    assert_eq!(run.heaps.int[3], 5);
    assert_eq!(run.heaps.int[0], 5);
    assert_eq!(run.heaps.real[0], 1.5);
}

#[test]
fn test_block_shift() {
    let mut heaps = Heaps::<f32>::new(5, 5);
    heaps.int = vec![10, 20, 30, 40, 50];
    heaps.real = vec![1.0, 2.0, 3.0, 4.0, 5.0];
    let ins = vec![
        BlockShiftInt { from: 4, to: 0 },
        BlockShiftReal { from: 3, to: 1 },
    ];

    let run = run_both(&block("shift", ins), heaps, &[], &[]);
    assert_eq!(run.heaps.int, vec![10, 10, 20, 30, 40]);
    assert_eq!(run.heaps.real, vec![1.0, 2.0, 2.0, 3.0, 5.0]);
}

#[test]
fn test_arithmetic_scenario() {
    let input = vec![vec![1.0f32, 2.0, 3.0, 4.0]];
    let run = run_both(&gain_block(), Heaps::new(0, 0), &input, &[4]);
    assert_eq!(run.outputs[0], vec![3.0, 5.0, 7.0, 9.0]);

    let input = vec![vec![1.0f64, 2.0, 3.0, 4.0]];
    let run = run_both(&gain_block(), Heaps::new(0, 0), &input, &[4]);
    assert_eq!(run.outputs[0], vec![3.0, 5.0, 7.0, 9.0]);
}

#[test]
fn test_multiple_ports() {
    // out[1][0] = in[0][0] - in[1][0]
    let ins = vec![
        Int32Value(0),
        LoadInput(1),
        Int32Value(0),
        LoadInput(0),
        SubReal,
        Int32Value(0),
        StoreOutput(1),
    ];
    let inputs = vec![vec![10.0f32], vec![4.0]];
    let run = run_both(&block("ports", ins), Heaps::new(0, 0), &inputs, &[1, 1]);
    assert_eq!(run.outputs[1], vec![6.0]);
    assert_eq!(run.outputs[0], vec![0.0]);
}

// =============================================================================
// Control flow
// =============================================================================

fn sign_block() -> Arc<Block> {
    let then_block = block("then", vec![Int32Value(1), StoreInt(1)]);
    let else_block = block("else", vec![Int32Value(-1), StoreInt(1)]);
    let mut builder = BlockBuilder::new("sign");
    builder
        .emit_all([Int32Value(0), LoadInt(0), GtInt])
        .emit_if(then_block, else_block);
    builder.build()
}

#[test]
fn test_conditional_scenario() {
    let sign = sign_block();
    for (x, y) in [(-1, -1), (0, -1), (1, 1)] {
        let mut heaps = Heaps::<f32>::new(2, 0);
        heaps.int[0] = x;
        let run = run_both(&sign, heaps, &[], &[]);
        assert_eq!(run.heaps.int[1], y, "x = {}", x);
    }
}

#[test]
fn test_if_tests_equal_to_one() {
    let then_block = block("then", vec![Int32Value(1), StoreInt(0)]);
    let else_block = block("else", vec![Int32Value(2), StoreInt(0)]);
    let mut builder = BlockBuilder::new("if_two");
    builder.emit(Int32Value(2)).emit_if(then_block, else_block);

    let run = run_both::<f32>(&builder.build(), Heaps::new(1, 0), &[], &[]);
    assert_eq!(run.heaps.int[0], 2);
}

#[test]
fn test_if_merges_differing_stacks() {
    let then_block = block("then", vec![RealValue(1.0), Int32Value(7)]);
    let else_block = block("else", vec![RealValue(2.0), Int32Value(7)]);
    let mut builder = BlockBuilder::new("merge");
    builder
        .emit(LoadInt(0))
        .emit_if(then_block, else_block)
        .emit_all([StoreInt(1), StoreReal(0)]);
    let merge = builder.build();

    for (cond, expected) in [(1, 1.0), (0, 2.0)] {
        let mut heaps = Heaps::<f32>::new(2, 1);
        heaps.int[0] = cond;
        let run = run_both(&merge, heaps, &[], &[]);
        assert_eq!(run.heaps.real[0], expected);
        assert_eq!(run.heaps.int[1], 7);
    }
}

#[test]
fn test_return_resumes_after_if() {
    let then_block = block(
        "then",
        vec![Int32Value(7), StoreInt(1), Return, Int32Value(99), StoreInt(1)],
    );
    let else_block = block("else", vec![]);
    let mut builder = BlockBuilder::new("resume");
    builder
        .emit(Int32Value(1))
        .emit_if(then_block, else_block)
        .emit_all([Int32Value(5), StoreInt(2)]);

    let run = run_both::<f32>(&builder.build(), Heaps::new(3, 0), &[], &[]);
    assert_eq!(run.heaps.int, vec![0, 7, 5]);
}

#[test]
fn test_top_level_return_halts() {
    let ins = vec![Int32Value(1), StoreInt(0), Return, Int32Value(2), StoreInt(0)];
    let run = run_both::<f32>(&block("halt", ins), Heaps::new(1, 0), &[], &[]);
    assert_eq!(run.heaps.int[0], 1);
}

#[test]
fn test_select_law() {
    let first = block("a", vec![RealValue(10.0)]);
    let second = block("b", vec![RealValue(20.0)]);

    for (cond, expected) in [(1, 20.0), (0, 10.0), (2, 20.0), (-1, 20.0)] {
        let mut builder = BlockBuilder::new("select");
        builder
            .emit(Int32Value(cond))
            .emit_select_real(Arc::clone(&first), Arc::clone(&second))
            .emit(StoreReal(0));
        let run = run_both::<f32>(&builder.build(), Heaps::new(0, 1), &[], &[]);
        assert_eq!(run.heaps.real[0], expected, "cond = {}", cond);
    }
}

#[test]
fn test_select_runs_both_arms() {
    let first = block("a", vec![Int32Value(1), StoreInt(0), Int32Value(100)]);
    let second = block("b", vec![Int32Value(2), StoreInt(1), Int32Value(200)]);
    let mut builder = BlockBuilder::new("select_int");
    builder
        .emit(Int32Value(0))
        .emit_select_int(first, second)
        .emit(StoreInt(2));

    let run = run_both::<f32>(&builder.build(), Heaps::new(3, 0), &[], &[]);
    assert_eq!(run.heaps.int, vec![1, 2, 100]);
}

#[test]
fn test_counting_loop() {
    // do { int[0] += 1 } while int[0] < int[1]
    let init = block("init", vec![Int32Value(0), StoreInt(0)]);
    let body = block(
        "body",
        vec![
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
    let mut builder = BlockBuilder::new("count");
    builder.emit_loop(init, body);
    let count = builder.build();

    let mut heaps = Heaps::<f32>::new(2, 0);
    heaps.int[1] = 5;
    let run = run_both(&count, heaps, &[], &[]);
    assert_eq!(run.heaps.int, vec![5, 5]);
}

#[test]
fn test_loop_carries_stack_through_head() {
    // acc = 0.0; do { acc += 0.5; i += 1 } while i < n; real[0] = acc
    let init = block("init", vec![Int32Value(0), StoreInt(0), RealValue(0.0)]);
    let body = block(
        "body",
        vec![
            RealValue(0.5),
            AddReal,
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
    let mut builder = BlockBuilder::new("accumulate");
    builder.emit_loop(init, body).emit(StoreReal(0));
    let accumulate = builder.build();

    let mut heaps = Heaps::<f64>::new(2, 1);
    heaps.int[1] = 6;
    let run = run_both(&accumulate, heaps, &[], &[]);
    assert_eq!(run.heaps.real[0], 3.0);
}

#[test]
fn test_return_ends_only_the_loop_child() {
    // Both children end in Return; the body still runs and so does the
    // code after the loop
    let init = block("init", vec![Int32Value(0), StoreInt(0), Return, Int32Value(50), StoreInt(0)]);
    let body = block(
        "body",
        vec![
            Int32Value(1),
            LoadInt(0),
            AddInt,
            StoreInt(0),
            Int32Value(4),
            LoadInt(0),
            LtInt,
            CondBranch,
            Return,
            Int32Value(60),
            StoreInt(0),
        ],
    );
    let mut builder = BlockBuilder::new("returning_loop");
    builder
        .emit_loop(init, body)
        .emit_all([LoadInt(0), StoreInt(1)]);

    let mut heaps = Heaps::<f32>::new(2, 0);
    heaps.int[1] = 99;
    let run = run_both(&builder.build(), heaps, &[], &[]);
    assert_eq!(run.heaps.int, vec![4, 4]);
}

#[test]
fn test_return_after_loop_halts() {
    let init = block("init", vec![Int32Value(3), StoreInt(0), Return]);
    let body = block("body", vec![Return]);
    let mut builder = BlockBuilder::new("halt_after_loop");
    builder
        .emit_loop(init, body)
        .emit_return()
        .emit_all([Int32Value(8), StoreInt(0)]);

    let run = run_both::<f32>(&builder.build(), Heaps::new(1, 0), &[], &[]);
    assert_eq!(run.heaps.int[0], 3);
}

#[test]
fn test_cond_branch_uses_low_bit() {
    // Only the low bit of the condition counts: 2 falls through
    let ins = vec![
        Int32Value(1),
        LoadInt(0),
        AddInt,
        StoreInt(0),
        Int32Value(2),
        CondBranch,
    ];
    let run = run_both::<f32>(&block("low_bit", ins), Heaps::new(1, 0), &[], &[]);
    assert_eq!(run.heaps.int[0], 1);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_type_mismatch() {
    let err = compile_err(vec![RealValue(1.0), Int32Value(1), AddInt]);
    assert_eq!(
        err,
        JitError::TypeMismatch {
            expected: "int",
            got: "real"
        }
    );
}

#[test]
fn test_stack_underflow() {
    assert_eq!(compile_err(vec![AddInt]), JitError::StackUnderflow);
    assert_eq!(compile_err(vec![StoreReal(0)]), JitError::StackUnderflow);
}

#[test]
fn test_stack_overflow_is_reported() {
    let options = CompileOptions {
        max_stack_depth: 2,
        ..Default::default()
    };
    let err = BlockCompiler::<f32>::with_options(options)
        .compile(&block("deep", vec![Int32Value(1), Int32Value(2), Int32Value(3)]))
        .unwrap_err();
    assert_eq!(err, JitError::StackOverflow { limit: 2 });
}

#[test]
fn test_cond_branch_stack_mismatch() {
    let err = compile_err(vec![Int32Value(1), Int32Value(1), CondBranch]);
    assert!(matches!(err, JitError::StackMismatch(_)), "{:?}", err);
}

#[test]
fn test_if_arms_with_different_kinds() {
    let then_block = block("then", vec![Int32Value(1)]);
    let else_block = block("else", vec![RealValue(1.0)]);
    let mut builder = BlockBuilder::new("kinds");
    builder.emit(Int32Value(1)).emit_if(then_block, else_block);

    let err = BlockCompiler::<f32>::new().compile(&builder.build()).unwrap_err();
    assert!(matches!(err, JitError::StackMismatch(ref msg) if msg.contains("slot 0")), "{:?}", err);
}

#[test]
fn test_execute_checks_frame() {
    let compiled = compile::<f32>(&block("far", vec![LoadInt(3), StoreInt(0)]));
    let mut heaps = Heaps::new(2, 0);
    let err = compiled.execute(&mut heaps, &[], &mut []).unwrap_err();
    assert!(matches!(err, JitError::FrameMismatch(_)));

    let compiled = compile::<f32>(&gain_block());
    let input = [0.0f32; 4];
    let err = compiled
        .execute(&mut Heaps::new(0, 0), &[&input[..]], &mut [])
        .unwrap_err();
    assert!(matches!(err, JitError::FrameMismatch(ref msg) if msg.contains("output ports")));
}

#[test]
fn test_sample_index_past_buffer_is_reported() {
    let compiled = compile::<f32>(&block(
        "far_sample",
        vec![RealValue(7.0), Int32Value(2), StoreOutput(0)],
    ));

    // The block sees only the first sample; its neighbours must survive
    let mut storage = [0.0f32; 3];
    let (visible, rest) = storage.split_at_mut(1);
    let err = compiled
        .execute(&mut Heaps::new(0, 0), &[], &mut [visible])
        .unwrap_err();

    assert_eq!(
        err,
        JitError::IndexOutOfBounds {
            target: BoundsTarget::Output(0),
            index: 2,
            len: 1
        }
    );
    assert_eq!(rest, [0.0, 0.0]);
    assert_eq!(storage, [0.0; 3]);
}

#[test]
fn test_negative_sample_index_is_reported() {
    let compiled = compile::<f64>(&block(
        "before_start",
        vec![Int32Value(-1), LoadInput(1), StoreReal(0)],
    ));
    let input = [1.0f64; 4];
    let err = compiled
        .execute(&mut Heaps::new(0, 1), &[&input[..], &input[..]], &mut [])
        .unwrap_err();
    assert_eq!(
        err,
        JitError::IndexOutOfBounds {
            target: BoundsTarget::Input(1),
            index: -1,
            len: 4
        }
    );
}

#[test]
fn test_indexed_heap_access_past_end_is_reported() {
    // heap[1 + 3] on a four-slot heap
    let compiled = compile::<f32>(&block(
        "far_slot",
        vec![Int32Value(5), Int32Value(3), StoreIndexedInt(1)],
    ));
    let mut heaps = Heaps::<f32>::new(4, 0);
    let err = compiled.execute(&mut heaps, &[], &mut []).unwrap_err();
    assert_eq!(
        err,
        JitError::IndexOutOfBounds {
            target: BoundsTarget::Heap(HeapKind::Int),
            index: 4,
            len: 4
        }
    );
    assert_eq!(heaps.int, vec![0; 4]);

    let compiled = compile::<f32>(&block(
        "wrapped_slot",
        vec![Int32Value(i32::MAX), LoadIndexedReal(1), StoreReal(0)],
    ));
    let err = compiled
        .execute(&mut Heaps::new(0, 2), &[], &mut [])
        .unwrap_err();
    assert!(matches!(
        err,
        JitError::IndexOutOfBounds {
            target: BoundsTarget::Heap(HeapKind::Real),
            index,
            len: 2
        } if index == i32::MIN as i64
    ));
}

#[test]
fn test_fault_keeps_earlier_writes_like_the_interpreter() {
    let compute = gain_block();
    let input = [1.0f32, 2.0, 3.0, 4.0];

    let mut native_out = [0.0f32; 2];
    let native = compile::<f32>(&compute)
        .execute(&mut Heaps::new(0, 0), &[&input[..]], &mut [&mut native_out[..]])
        .unwrap_err();

    let mut vm_out = [0.0f32; 2];
    let interpreted = BytecodeVM::<f32>::new()
        .execute(&compute, &mut Heaps::new(0, 0), &[&input[..]], &mut [&mut vm_out[..]])
        .unwrap_err();

    assert_eq!(
        native,
        JitError::IndexOutOfBounds {
            target: BoundsTarget::Output(0),
            index: 2,
            len: 2
        }
    );
    assert!(matches!(
        interpreted,
        crate::backend::bytecode::vm::VmError::SampleOutOfBounds { port: 0, index: 2, len: 2 }
    ));
    assert_eq!(native_out, [3.0, 5.0]);
    assert_eq!(native_out, vm_out);
}

// =============================================================================
// Options and determinism
// =============================================================================

#[test]
fn test_all_opt_levels_agree() {
    let input = [1.0f32, 2.0, 3.0, 4.0];
    for opt_level in [OptLevel::None, OptLevel::Speed, OptLevel::SpeedAndSize] {
        let options = CompileOptions {
            opt_level,
            ..Default::default()
        };
        let compiled = BlockCompiler::<f32>::with_options(options)
            .compile(&gain_block())
            .unwrap();
        let mut output = [0.0f32; 4];
        compiled
            .execute(&mut Heaps::new(0, 0), &[&input[..]], &mut [&mut output[..]])
            .unwrap();
        assert_eq!(output, [3.0, 5.0, 7.0, 9.0], "{}", opt_level);
    }
}

#[test]
fn test_ir_is_kept_on_request() {
    let without = compile::<f32>(&gain_block());
    assert!(without.ir().is_none());

    let options = CompileOptions {
        keep_ir: true,
        ..Default::default()
    };
    let with = BlockCompiler::<f32>::with_options(options)
        .compile(&gain_block())
        .unwrap();
    assert!(with.ir().unwrap().contains("function"));
    assert_eq!(with.name(), "gain");
}

#[test]
fn test_compilation_is_deterministic() {
    let sign = sign_block();
    let a = compile::<f32>(&sign);
    let b = compile::<f32>(&sign);

    for x in [-5, 0, 5] {
        let mut heaps = Heaps::<f32>::new(2, 0);
        heaps.int[0] = x;
        let ra = run_native(&a, heaps.clone(), &[], &[]);
        let rb = run_native(&b, heaps, &[], &[]);
        assert_eq!(ra.heaps, rb.heaps);
    }
}

#[test]
fn test_layout_is_recorded() {
    let compiled = compile::<f32>(&gain_block());
    assert_eq!(compiled.layout().inputs, 1);
    assert_eq!(compiled.layout().outputs, 1);
    assert_eq!(compiled.layout().int_heap_len, 0);
}
