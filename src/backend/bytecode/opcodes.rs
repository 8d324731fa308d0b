//! Bytecode Instruction Set
//!
//! The instruction set is closed: every operation the front end can emit is a
//! variant of [`Instruction`], and control flow is expressed by nesting child
//! blocks inside the three structured opcodes (`If`, `Select*`, `Loop`),
//! never by raw jump targets.
//!
//! # Stack discipline
//!
//! Binary operators pop the left operand first:
//!
//! ```text
//! lhs = pop(); rhs = pop(); push(lhs <op> rhs)
//! ```
//!
//! so a front end computing `a - b` pushes `b`, then `a`, then emits `SubReal`.

use std::fmt;
use std::sync::Arc;

use super::block::Block;

/// Unary real-valued math functions bound to the math runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryMath {
    Fabs,
    Acos,
    Asin,
    Atan,
    Ceil,
    Cos,
    Cosh,
    Exp,
    Floor,
    Log,
    Log10,
    Round,
    Sin,
    Sinh,
    Sqrt,
    Tan,
    Tanh,
}

impl UnaryMath {
    /// Every unary math function, in declaration order
    pub const ALL: [UnaryMath; 17] = [
        UnaryMath::Fabs,
        UnaryMath::Acos,
        UnaryMath::Asin,
        UnaryMath::Atan,
        UnaryMath::Ceil,
        UnaryMath::Cos,
        UnaryMath::Cosh,
        UnaryMath::Exp,
        UnaryMath::Floor,
        UnaryMath::Log,
        UnaryMath::Log10,
        UnaryMath::Round,
        UnaryMath::Sin,
        UnaryMath::Sinh,
        UnaryMath::Sqrt,
        UnaryMath::Tan,
        UnaryMath::Tanh,
    ];

    /// Double-precision C library name; single precision appends a suffix
    pub fn c_name(self) -> &'static str {
        match self {
            UnaryMath::Fabs => "fabs",
            UnaryMath::Acos => "acos",
            UnaryMath::Asin => "asin",
            UnaryMath::Atan => "atan",
            UnaryMath::Ceil => "ceil",
            UnaryMath::Cos => "cos",
            UnaryMath::Cosh => "cosh",
            UnaryMath::Exp => "exp",
            UnaryMath::Floor => "floor",
            UnaryMath::Log => "log",
            UnaryMath::Log10 => "log10",
            UnaryMath::Round => "round",
            UnaryMath::Sin => "sin",
            UnaryMath::Sinh => "sinh",
            UnaryMath::Sqrt => "sqrt",
            UnaryMath::Tan => "tan",
            UnaryMath::Tanh => "tanh",
        }
    }
}

/// Binary real-valued math functions bound to the math runtime
///
/// `Remainder` is what `RemReal` lowers to; the others have their own opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryMath {
    Atan2,
    Fmod,
    Pow,
    Remainder,
}

impl BinaryMath {
    pub const ALL: [BinaryMath; 4] = [
        BinaryMath::Atan2,
        BinaryMath::Fmod,
        BinaryMath::Pow,
        BinaryMath::Remainder,
    ];

    pub fn c_name(self) -> &'static str {
        match self {
            BinaryMath::Atan2 => "atan2",
            BinaryMath::Fmod => "fmod",
            BinaryMath::Pow => "pow",
            BinaryMath::Remainder => "remainder",
        }
    }
}

/// A single bytecode instruction
///
/// Offsets index the integer or real heap (in elements, not bytes). Ports
/// index the input or output pointer arrays. Child blocks are shared so the
/// dispatcher can address them by identity.
#[derive(Debug, Clone)]
pub enum Instruction {
    // Literals
    RealValue(f64),
    Int32Value(i32),

    // Heap access at a static offset
    LoadReal(u32),
    LoadInt(u32),
    StoreReal(u32),
    StoreInt(u32),

    // Heap access at `offset + pop()`; stores pop the index, then the value
    LoadIndexedReal(u32),
    LoadIndexedInt(u32),
    StoreIndexedReal(u32),
    StoreIndexedInt(u32),

    /// `for i in (to + 1..=from).rev() { heap[i] = heap[i - 1] }`
    BlockShiftReal { from: u32, to: u32 },
    BlockShiftInt { from: u32, to: u32 },

    // I/O: pop the sample index; StoreOutput then pops the value
    LoadInput(u32),
    StoreOutput(u32),

    // Conversions
    CastReal,
    CastInt,
    BitcastInt,
    BitcastReal,

    // Binary arithmetic
    AddReal,
    AddInt,
    SubReal,
    SubInt,
    MulReal,
    MulInt,
    DivReal,
    DivInt,
    RemReal,
    RemInt,
    LshInt,
    RshInt,

    // Comparisons, materialized as i32 1/0
    GtReal,
    GtInt,
    LtReal,
    LtInt,
    GeReal,
    GeInt,
    LeReal,
    LeInt,
    EqReal,
    EqInt,
    NeReal,
    NeInt,

    // Bitwise
    AndInt,
    OrInt,
    XorInt,

    // Extended math
    Abs,
    Unary(UnaryMath),
    Binary(BinaryMath),

    // Min/max
    MinInt,
    MaxInt,
    MinReal,
    MaxReal,

    // Control
    Return,
    If { then_block: Arc<Block>, else_block: Arc<Block> },
    SelectReal { first: Arc<Block>, second: Arc<Block> },
    SelectInt { first: Arc<Block>, second: Arc<Block> },
    CondBranch,
    Loop { init: Arc<Block>, body: Arc<Block> },
}

impl Instruction {
    /// Get the mnemonic for disassembly
    pub fn mnemonic(&self) -> &'static str {
        use Instruction::*;
        match self {
            RealValue(_) => "real_value",
            Int32Value(_) => "int32_value",
            LoadReal(_) => "load_real",
            LoadInt(_) => "load_int",
            StoreReal(_) => "store_real",
            StoreInt(_) => "store_int",
            LoadIndexedReal(_) => "load_indexed_real",
            LoadIndexedInt(_) => "load_indexed_int",
            StoreIndexedReal(_) => "store_indexed_real",
            StoreIndexedInt(_) => "store_indexed_int",
            BlockShiftReal { .. } => "block_shift_real",
            BlockShiftInt { .. } => "block_shift_int",
            LoadInput(_) => "load_input",
            StoreOutput(_) => "store_output",
            CastReal => "cast_real",
            CastInt => "cast_int",
            BitcastInt => "bitcast_int",
            BitcastReal => "bitcast_real",
            AddReal => "add_real",
            AddInt => "add_int",
            SubReal => "sub_real",
            SubInt => "sub_int",
            MulReal => "mul_real",
            MulInt => "mul_int",
            DivReal => "div_real",
            DivInt => "div_int",
            RemReal => "rem_real",
            RemInt => "rem_int",
            LshInt => "lsh_int",
            RshInt => "rsh_int",
            GtReal => "gt_real",
            GtInt => "gt_int",
            LtReal => "lt_real",
            LtInt => "lt_int",
            GeReal => "ge_real",
            GeInt => "ge_int",
            LeReal => "le_real",
            LeInt => "le_int",
            EqReal => "eq_real",
            EqInt => "eq_int",
            NeReal => "ne_real",
            NeInt => "ne_int",
            AndInt => "and_int",
            OrInt => "or_int",
            XorInt => "xor_int",
            Abs => "abs",
            Unary(_) => "unary_math",
            Binary(_) => "binary_math",
            MinInt => "min_int",
            MaxInt => "max_int",
            MinReal => "min_real",
            MaxReal => "max_real",
            Return => "return",
            If { .. } => "if",
            SelectReal { .. } => "select_real",
            SelectInt { .. } => "select_int",
            CondBranch => "cond_branch",
            Loop { .. } => "loop",
        }
    }

    /// Child blocks owned by this instruction, in evaluation order
    pub fn children(&self) -> Option<(&Arc<Block>, &Arc<Block>)> {
        match self {
            Instruction::If { then_block, else_block } => Some((then_block, else_block)),
            Instruction::SelectReal { first, second } | Instruction::SelectInt { first, second } => {
                Some((first, second))
            }
            Instruction::Loop { init, body } => Some((init, body)),
            _ => None,
        }
    }

    /// Check if this instruction affects control flow
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            Instruction::Return
                | Instruction::If { .. }
                | Instruction::SelectReal { .. }
                | Instruction::SelectInt { .. }
                | Instruction::CondBranch
                | Instruction::Loop { .. }
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        let name = self.mnemonic();
        match self {
            RealValue(v) => write!(f, "{} {}", name, v),
            Int32Value(v) => write!(f, "{} {}", name, v),
            LoadReal(o) | LoadInt(o) | StoreReal(o) | StoreInt(o) | LoadIndexedReal(o)
            | LoadIndexedInt(o) | StoreIndexedReal(o) | StoreIndexedInt(o) => {
                write!(f, "{} @{}", name, o)
            }
            BlockShiftReal { from, to } | BlockShiftInt { from, to } => {
                write!(f, "{} {}..{}", name, from, to)
            }
            LoadInput(p) | StoreOutput(p) => write!(f, "{} port={}", name, p),
            Unary(op) => write!(f, "{} {}", name, op.c_name()),
            Binary(op) => write!(f, "{} {}", name, op.c_name()),
            _ => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_math_names_are_base_names() {
        assert_eq!(UnaryMath::Sin.c_name(), "sin");
        assert_eq!(UnaryMath::Log10.c_name(), "log10");
        assert_eq!(BinaryMath::Remainder.c_name(), "remainder");
    }

    #[test]
    fn test_display_includes_operands() {
        assert_eq!(Instruction::LoadReal(3).to_string(), "load_real @3");
        assert_eq!(
            Instruction::BlockShiftInt { from: 4, to: 0 }.to_string(),
            "block_shift_int 4..0"
        );
        assert_eq!(Instruction::Unary(UnaryMath::Tanh).to_string(), "unary_math tanh");
        assert_eq!(Instruction::AddInt.to_string(), "add_int");
    }

    #[test]
    fn test_control_classification() {
        let empty = Arc::new(Block::new("empty", vec![Instruction::Return]));
        let ins = Instruction::Loop { init: empty.clone(), body: empty };
        assert!(ins.is_control());
        assert!(ins.children().is_some());
        assert!(!Instruction::MulReal.is_control());
        assert!(Instruction::CondBranch.children().is_none());
    }
}
