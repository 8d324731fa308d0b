//! Control flow handlers for JIT compilation
//!
//! Handles: Return, If, SelectReal, SelectInt, Loop, CondBranch
//!
//! Nested blocks are lowered by recursive descent through a
//! [`BlockTranslator`]. No construct emits a runtime jump for `Return`:
//! a `Return` under a pending `If`/`Select`/`Loop` stops translation of the
//! nested block and control continues with the next step of that construct.

use cranelift::codegen::ir::BlockArg;
use cranelift::prelude::*;

use crate::backend::bytecode::block::{Block as CodeBlock, Flow};
use crate::backend::bytecode::jit::codegen::{kind_of, CodegenContext};
use crate::backend::bytecode::jit::types::{JitError, JitResult};

/// Translates a nested bytecode block at the current insertion point
pub trait BlockTranslator {
    fn translate_block(
        &mut self,
        codegen: &mut CodegenContext<'_, '_>,
        block: &CodeBlock,
    ) -> JitResult<Flow>;
}

/// The basic block a `CondBranch` jumps back to
#[derive(Debug, Clone)]
pub struct BlockHead {
    pub block: Block,
    /// Operand kinds the head's parameters expect
    pub types: Vec<Type>,
}

/// An `If` arm that reached its end and waits to be joined
struct ArmExit {
    block: Block,
    stack: Vec<Value>,
}

/// Compile Return
pub fn compile_return(codegen: &mut CodegenContext<'_, '_>) -> Flow {
    if codegen.in_nested() {
        return Flow::Resume;
    }
    codegen.return_ok();
    codegen.mark_terminated();
    Flow::Halt
}

/// Compile If: test `== 1`, translate both arms, join the ones that fall through
pub fn compile_if<T: BlockTranslator>(
    translator: &mut T,
    codegen: &mut CodegenContext<'_, '_>,
    then_block: &CodeBlock,
    else_block: &CodeBlock,
) -> JitResult<Option<Flow>> {
    let cond = codegen.pop_int()?;
    let is_true = codegen.builder.ins().icmp_imm(IntCC::Equal, cond, 1);

    let then_ir = codegen.builder.create_block();
    let else_ir = codegen.builder.create_block();
    codegen.builder.ins().brif(is_true, then_ir, &[], else_ir, &[]);

    let base = codegen.snapshot();
    let mut exits = Vec::with_capacity(2);

    codegen.enter_nested();
    for (entry, child) in [(then_ir, then_block), (else_ir, else_block)] {
        codegen.switch_to(entry);
        codegen.restore(base.clone());
        translator.translate_block(codegen, child)?;

        if !codegen.is_terminated() {
            let exit = codegen.builder.create_block();
            codegen.builder.ins().jump(exit, &[]);
            exits.push(ArmExit {
                block: exit,
                stack: codegen.snapshot(),
            });
        }
    }
    codegen.leave_nested();

    join_arms(codegen, exits)
}

/// Wire the arms that fall through into a merge point
///
/// Slots that differ between the two arms become merge block parameters.
fn join_arms(
    codegen: &mut CodegenContext<'_, '_>,
    mut exits: Vec<ArmExit>,
) -> JitResult<Option<Flow>> {
    if exits.len() < 2 {
        return Ok(match exits.pop() {
            Some(arm) => {
                codegen.switch_to(arm.block);
                codegen.restore(arm.stack);
                None
            }
            None => {
                // Neither arm falls through
                codegen.mark_terminated();
                Some(Flow::Halt)
            }
        });
    }

    let (then_arm, else_arm) = (&exits[0], &exits[1]);
    if then_arm.stack.len() != else_arm.stack.len() {
        return Err(JitError::StackMismatch(format!(
            "if arms leave {} and {} values",
            then_arm.stack.len(),
            else_arm.stack.len()
        )));
    }

    let merge = codegen.builder.create_block();
    let mut merged = then_arm.stack.clone();
    let mut differing = Vec::new();

    for (slot, (&a, &b)) in then_arm.stack.iter().zip(&else_arm.stack).enumerate() {
        if a == b {
            continue;
        }
        let (ta, tb) = (codegen.value_type(a), codegen.value_type(b));
        if ta != tb {
            return Err(JitError::StackMismatch(format!(
                "slot {} is {} in the then arm and {} in the else arm",
                slot,
                kind_of(ta),
                kind_of(tb)
            )));
        }
        merged[slot] = codegen.builder.append_block_param(merge, ta);
        differing.push(slot);
    }

    for arm in &exits {
        codegen.switch_to(arm.block);
        let args: Vec<BlockArg> = differing
            .iter()
            .map(|&slot| BlockArg::Value(arm.stack[slot]))
            .collect();
        codegen.builder.ins().jump(merge, &args);
    }

    codegen.switch_to(merge);
    codegen.restore(merged);
    Ok(None)
}

/// Compile SelectReal/SelectInt
///
/// Both arms are translated in line and always run. The result is the
/// second arm's value when the condition is non-zero.
pub fn compile_select<T: BlockTranslator>(
    translator: &mut T,
    codegen: &mut CodegenContext<'_, '_>,
    first: &CodeBlock,
    second: &CodeBlock,
    ty: Type,
) -> JitResult<Option<Flow>> {
    let cond = codegen.pop_int()?;
    let flag = codegen.builder.ins().icmp_imm(IntCC::NotEqual, cond, 0);

    codegen.enter_nested();
    for arm in [first, second] {
        translator.translate_block(codegen, arm)?;
        if codegen.is_terminated() {
            codegen.leave_nested();
            return Ok(Some(Flow::Halt));
        }
    }
    codegen.leave_nested();

    let b = codegen.pop_typed(ty)?;
    let a = codegen.pop_typed(ty)?;
    let result = codegen.builder.ins().select(flag, b, a);
    codegen.push(result)?;
    Ok(None)
}

/// Compile Loop: fall into a fresh init block, then a fresh body block
///
/// Repetition is the body's own `CondBranch`; no back edge is added here.
/// A `Return` ending `init` moves on to `body`, one ending `body` continues
/// after the loop.
pub fn compile_loop<T: BlockTranslator>(
    translator: &mut T,
    codegen: &mut CodegenContext<'_, '_>,
    init: &CodeBlock,
    body: &CodeBlock,
) -> JitResult<Option<Flow>> {
    codegen.enter_nested();
    for child in [init, body] {
        let entry = codegen.builder.create_block();
        codegen.builder.ins().jump(entry, &[]);
        codegen.switch_to(entry);

        let flow = translator.translate_block(codegen, child);
        if !matches!(flow, Ok(Flow::FallThrough | Flow::Resume)) {
            codegen.leave_nested();
            return flow.map(Some);
        }
    }
    codegen.leave_nested();
    Ok(None)
}

/// Compile CondBranch: on a set low bit, jump back to the head of the block
pub fn compile_cond_branch(
    codegen: &mut CodegenContext<'_, '_>,
    head: Option<&BlockHead>,
) -> JitResult<()> {
    let head = head.ok_or_else(|| {
        JitError::NotCompilable("cond_branch outside of a block head".to_string())
    })?;

    let cond = codegen.pop_int()?;
    let bit = codegen.builder.ins().band_imm(cond, 1);

    let types = codegen.stack_types();
    if types != head.types {
        return Err(JitError::StackMismatch(format!(
            "branch carries [{}] but the block head expects [{}]",
            kinds(&types),
            kinds(&head.types)
        )));
    }

    let next = codegen.builder.create_block();
    let args = codegen.stack_args();
    codegen.builder.ins().brif(bit, head.block, &args, next, &[]);
    codegen.switch_to(next);
    Ok(())
}

fn kinds(types: &[Type]) -> String {
    types.iter().map(|&ty| kind_of(ty)).collect::<Vec<_>>().join(", ")
}
