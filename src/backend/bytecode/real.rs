//! Sample precision
//!
//! DSP programs are compiled for one real-number width, chosen when the
//! program is built. [`Real`] collects everything the interpreter and the
//! code generator need to know about that width.

use std::fmt::{Debug, Display};
use std::ops::{Add, Div, Mul, Sub};

use super::jit::runtime;
use super::opcodes::{BinaryMath, UnaryMath};

/// A real-number sample type (`f32` or `f64`)
pub trait Real:
    Copy
    + Default
    + PartialOrd
    + Debug
    + Display
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
{
    /// Width in bits (32 or 64)
    const BITS: u32;

    /// Appended to C math function names (`sin` becomes `sinf`)
    const MATH_SUFFIX: &'static str;

    fn from_f64(value: f64) -> Self;

    fn to_f64(self) -> f64;

    /// Signed integer to real, rounding to nearest
    fn from_i32(value: i32) -> Self;

    /// Real to signed integer, truncating toward zero and saturating; NaN is 0
    fn to_i32(self) -> i32;

    /// Reinterpret as a 32-bit pattern (low 32 bits for `f64`)
    fn to_int_bits(self) -> i32;

    /// Reinterpret a 32-bit pattern (zero-extended for `f64`)
    fn from_int_bits(bits: i32) -> Self;

    fn unary_fn(op: UnaryMath) -> extern "C" fn(Self) -> Self;

    fn binary_fn(op: BinaryMath) -> extern "C" fn(Self, Self) -> Self;

    /// External symbol name for a math function at this precision
    fn math_symbol(base: &str) -> String {
        format!("{}{}", base, Self::MATH_SUFFIX)
    }
}

impl Real for f32 {
    const BITS: u32 = 32;
    const MATH_SUFFIX: &'static str = "f";

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_i32(value: i32) -> Self {
        value as f32
    }

    #[inline]
    fn to_i32(self) -> i32 {
        self as i32
    }

    #[inline]
    fn to_int_bits(self) -> i32 {
        self.to_bits() as i32
    }

    #[inline]
    fn from_int_bits(bits: i32) -> Self {
        f32::from_bits(bits as u32)
    }

    fn unary_fn(op: UnaryMath) -> extern "C" fn(f32) -> f32 {
        runtime::unary_f32(op)
    }

    fn binary_fn(op: BinaryMath) -> extern "C" fn(f32, f32) -> f32 {
        runtime::binary_f32(op)
    }
}

impl Real for f64 {
    const BITS: u32 = 64;
    const MATH_SUFFIX: &'static str = "";

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_i32(value: i32) -> Self {
        value as f64
    }

    #[inline]
    fn to_i32(self) -> i32 {
        self as i32
    }

    #[inline]
    fn to_int_bits(self) -> i32 {
        self.to_bits() as u32 as i32
    }

    #[inline]
    fn from_int_bits(bits: i32) -> Self {
        f64::from_bits(bits as u32 as u64)
    }

    fn unary_fn(op: UnaryMath) -> extern "C" fn(f64) -> f64 {
        runtime::unary_f64(op)
    }

    fn binary_fn(op: BinaryMath) -> extern "C" fn(f64, f64) -> f64 {
        runtime::binary_f64(op)
    }
}
