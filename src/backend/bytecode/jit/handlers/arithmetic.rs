//! Arithmetic operation handlers for JIT compilation
//!
//! Handles: Add, Sub, Mul, Div, Rem (int), Lsh, Rsh, And, Or, Xor and the
//! four conversions
//!
//! Binary operators pop the left operand first. Integer ops wrap, including
//! `i32::MIN / -1`; integer division by zero traps.

use cranelift::prelude::*;

use crate::backend::bytecode::jit::codegen::CodegenContext;
use crate::backend::bytecode::jit::types::{JitError, JitResult};
use crate::backend::bytecode::opcodes::Instruction;

/// Compile integer arithmetic and bitwise opcodes
pub fn compile_int_arithmetic_op(
    codegen: &mut CodegenContext<'_, '_>,
    op: &Instruction,
) -> JitResult<()> {
    let lhs = codegen.pop_int()?;
    let rhs = codegen.pop_int()?;
    if let Instruction::DivInt | Instruction::RemInt = op {
        let result = wrapping_div_rem(codegen, op, lhs, rhs);
        return codegen.push(result);
    }
    let ins = codegen.builder.ins();

    let result = match op {
        Instruction::AddInt => ins.iadd(lhs, rhs),
        Instruction::SubInt => ins.isub(lhs, rhs),
        Instruction::MulInt => ins.imul(lhs, rhs),
        Instruction::LshInt => ins.ishl(lhs, rhs),
        // Logical: the sign bit is not replicated
        Instruction::RshInt => ins.ushr(lhs, rhs),
        Instruction::AndInt => ins.band(lhs, rhs),
        Instruction::OrInt => ins.bor(lhs, rhs),
        Instruction::XorInt => ins.bxor(lhs, rhs),
        other => return Err(unexpected(other)),
    };

    codegen.push(result)
}

/// `sdiv`/`srem` that never trap on `i32::MIN` and -1
///
/// A divisor of -1 is replaced by 1; the quotient is then negated, giving
/// `i32::MIN / -1 == i32::MIN`, and the remainder is 0 either way.
fn wrapping_div_rem(
    codegen: &mut CodegenContext<'_, '_>,
    op: &Instruction,
    lhs: Value,
    rhs: Value,
) -> Value {
    let is_minus_one = codegen.builder.ins().icmp_imm(IntCC::Equal, rhs, -1);
    let one = codegen.const_int(1);
    let divisor = codegen.builder.ins().select(is_minus_one, one, rhs);

    if let Instruction::RemInt = op {
        return codegen.builder.ins().srem(lhs, divisor);
    }
    let quotient = codegen.builder.ins().sdiv(lhs, divisor);
    let negated = codegen.builder.ins().ineg(lhs);
    codegen.builder.ins().select(is_minus_one, negated, quotient)
}

/// Compile real arithmetic opcodes (RemReal goes through the math runtime)
pub fn compile_real_arithmetic_op(
    codegen: &mut CodegenContext<'_, '_>,
    op: &Instruction,
) -> JitResult<()> {
    let lhs = codegen.pop_real()?;
    let rhs = codegen.pop_real()?;
    let ins = codegen.builder.ins();

    let result = match op {
        Instruction::AddReal => ins.fadd(lhs, rhs),
        Instruction::SubReal => ins.fsub(lhs, rhs),
        Instruction::MulReal => ins.fmul(lhs, rhs),
        Instruction::DivReal => ins.fdiv(lhs, rhs),
        other => return Err(unexpected(other)),
    };

    codegen.push(result)
}

/// Compile CastReal, CastInt, BitcastInt and BitcastReal
pub fn compile_conversion_op(
    codegen: &mut CodegenContext<'_, '_>,
    op: &Instruction,
) -> JitResult<()> {
    let real = codegen.real_type();

    let result = match op {
        Instruction::CastReal => {
            let v = codegen.pop_int()?;
            codegen.builder.ins().fcvt_from_sint(real, v)
        }
        Instruction::CastInt => {
            // Saturating, NaN becomes 0
            let v = codegen.pop_real()?;
            codegen.builder.ins().fcvt_to_sint_sat(types::I32, v)
        }
        Instruction::BitcastInt => {
            let v = codegen.pop_real()?;
            if real == types::F32 {
                codegen.builder.ins().bitcast(types::I32, MemFlags::new(), v)
            } else {
                let bits = codegen.builder.ins().bitcast(types::I64, MemFlags::new(), v);
                codegen.builder.ins().ireduce(types::I32, bits)
            }
        }
        Instruction::BitcastReal => {
            let v = codegen.pop_int()?;
            if real == types::F32 {
                codegen.builder.ins().bitcast(types::F32, MemFlags::new(), v)
            } else {
                let bits = codegen.builder.ins().uextend(types::I64, v);
                codegen.builder.ins().bitcast(types::F64, MemFlags::new(), bits)
            }
        }
        other => return Err(unexpected(other)),
    };

    codegen.push(result)
}

pub(super) fn unexpected(op: &Instruction) -> JitError {
    JitError::NotCompilable(format!("{} routed to the wrong handler", op.mnemonic()))
}
