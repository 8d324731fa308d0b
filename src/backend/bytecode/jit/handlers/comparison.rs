//! Comparison handlers for JIT compilation
//!
//! Handles: Gt, Lt, Ge, Le, Eq, Ne for both kinds, and Min/Max

use cranelift::prelude::*;

use super::arithmetic::unexpected;
use crate::backend::bytecode::jit::codegen::CodegenContext;
use crate::backend::bytecode::jit::types::JitResult;
use crate::backend::bytecode::opcodes::Instruction;

/// Compile a comparison, materialized as an i32 1 or 0
pub fn compile_comparison_op(
    codegen: &mut CodegenContext<'_, '_>,
    op: &Instruction,
) -> JitResult<()> {
    use Instruction::*;

    let flag = match op {
        GtInt | LtInt | GeInt | LeInt | EqInt | NeInt => {
            let cc = match op {
                GtInt => IntCC::SignedGreaterThan,
                LtInt => IntCC::SignedLessThan,
                GeInt => IntCC::SignedGreaterThanOrEqual,
                LeInt => IntCC::SignedLessThanOrEqual,
                EqInt => IntCC::Equal,
                _ => IntCC::NotEqual,
            };
            let lhs = codegen.pop_int()?;
            let rhs = codegen.pop_int()?;
            codegen.builder.ins().icmp(cc, lhs, rhs)
        }
        GtReal | LtReal | GeReal | LeReal | EqReal | NeReal => {
            // Ordered throughout: NaN compares false, including for NE
            let cc = match op {
                GtReal => FloatCC::GreaterThan,
                LtReal => FloatCC::LessThan,
                GeReal => FloatCC::GreaterThanOrEqual,
                LeReal => FloatCC::LessThanOrEqual,
                EqReal => FloatCC::Equal,
                _ => FloatCC::OrderedNotEqual,
            };
            let lhs = codegen.pop_real()?;
            let rhs = codegen.pop_real()?;
            codegen.builder.ins().fcmp(cc, lhs, rhs)
        }
        other => return Err(unexpected(other)),
    };

    let result = codegen.flag_to_int(flag);
    codegen.push(result)
}

/// Compile MinInt, MaxInt, MinReal and MaxReal as a select on `lhs < rhs`
pub fn compile_min_max_op(codegen: &mut CodegenContext<'_, '_>, op: &Instruction) -> JitResult<()> {
    let (lhs, rhs, less) = match op {
        Instruction::MinInt | Instruction::MaxInt => {
            let lhs = codegen.pop_int()?;
            let rhs = codegen.pop_int()?;
            let less = codegen.builder.ins().icmp(IntCC::SignedLessThan, lhs, rhs);
            (lhs, rhs, less)
        }
        Instruction::MinReal | Instruction::MaxReal => {
            let lhs = codegen.pop_real()?;
            let rhs = codegen.pop_real()?;
            let less = codegen.builder.ins().fcmp(FloatCC::LessThan, lhs, rhs);
            (lhs, rhs, less)
        }
        other => return Err(unexpected(other)),
    };

    let result = match op {
        Instruction::MinInt | Instruction::MinReal => codegen.builder.ins().select(less, lhs, rhs),
        _ => codegen.builder.ins().select(less, rhs, lhs),
    };
    codegen.push(result)
}
