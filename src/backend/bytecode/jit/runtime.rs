//! Math runtime callable from JIT code
//!
//! Extended math opcodes lower to calls into these functions. They are
//! registered with the JIT module under their C library names (`sinf` for
//! single precision, `sin` for double precision, ...) and the interpreter
//! calls the very same functions, so both tiers produce identical results
//! for transcendental operations.
//!
//! The functions are plain `extern "C"` Rust functions; they are bound by
//! name through `JITBuilder::symbol` and are not exported from the binary.

use crate::backend::bytecode::opcodes::{BinaryMath, UnaryMath};

macro_rules! math_runtime {
    (
        unary { $($uop:ident => $u32:ident, $u64:ident, $method:ident;)* }
        binary { $($bop:ident => $b32:ident: $f32:path, $b64:ident: $f64:path;)* }
    ) => {
        $(
            pub extern "C" fn $u32(x: f32) -> f32 {
                x.$method()
            }

            pub extern "C" fn $u64(x: f64) -> f64 {
                x.$method()
            }
        )*

        $(
            pub extern "C" fn $b32(a: f32, b: f32) -> f32 {
                $f32(a, b)
            }

            pub extern "C" fn $b64(a: f64, b: f64) -> f64 {
                $f64(a, b)
            }
        )*

        /// Single-precision implementation of a unary math function
        pub fn unary_f32(op: UnaryMath) -> extern "C" fn(f32) -> f32 {
            match op {
                $(UnaryMath::$uop => $u32,)*
            }
        }

        /// Double-precision implementation of a unary math function
        pub fn unary_f64(op: UnaryMath) -> extern "C" fn(f64) -> f64 {
            match op {
                $(UnaryMath::$uop => $u64,)*
            }
        }

        pub fn binary_f32(op: BinaryMath) -> extern "C" fn(f32, f32) -> f32 {
            match op {
                $(BinaryMath::$bop => $b32,)*
            }
        }

        pub fn binary_f64(op: BinaryMath) -> extern "C" fn(f64, f64) -> f64 {
            match op {
                $(BinaryMath::$bop => $b64,)*
            }
        }
    };
}

math_runtime! {
    unary {
        Fabs => fabsf, fabs, abs;
        Acos => acosf, acos, acos;
        Asin => asinf, asin, asin;
        Atan => atanf, atan, atan;
        Ceil => ceilf, ceil, ceil;
        Cos => cosf, cos, cos;
        Cosh => coshf, cosh, cosh;
        Exp => expf, exp, exp;
        Floor => floorf, floor, floor;
        Log => logf, log, ln;
        Log10 => log10f, log10, log10;
        Round => roundf, round, round;
        Sin => sinf, sin, sin;
        Sinh => sinhf, sinh, sinh;
        Sqrt => sqrtf, sqrt, sqrt;
        Tan => tanf, tan, tan;
        Tanh => tanhf, tanh, tanh;
    }
    binary {
        Atan2 => atan2f: f32::atan2, atan2: f64::atan2;
        Fmod => fmodf: libm::fmodf, fmod: libm::fmod;
        Pow => powf: f32::powf, pow: f64::powf;
        Remainder => remainderf: libm::remainderf, remainder: libm::remainder;
    }
}

/// Integer absolute value; `i32::MIN` maps to itself like C `abs`
pub extern "C" fn abs(x: i32) -> i32 {
    x.wrapping_abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unary_dispatch_matches_std() {
        assert_eq!(unary_f64(UnaryMath::Sqrt)(16.0), 4.0);
        assert_eq!(unary_f32(UnaryMath::Fabs)(-2.5), 2.5);
        assert_eq!(unary_f64(UnaryMath::Log)(1.0), 0.0);
        assert_eq!(unary_f32(UnaryMath::Floor)(-1.5), -2.0);
    }

    #[test]
    fn test_round_is_half_away_from_zero() {
        assert_eq!(roundf(2.5), 3.0);
        assert_eq!(round(-2.5), -3.0);
    }

    #[test]
    fn test_fmod_keeps_dividend_sign() {
        assert_eq!(fmod(-7.0, 3.0), -1.0);
        assert_eq!(fmodf(7.0, -3.0), 1.0);
    }

    #[test]
    fn test_remainder_rounds_quotient_to_even() {
        assert_eq!(remainder(7.0, 2.0), -1.0);
        assert_eq!(remainder(5.0, 2.0), 1.0);
        assert_eq!(remainderf(10.0, 4.0), 2.0);
        assert_eq!(binary_f64(BinaryMath::Remainder)(1.0, 3.0), 1.0);
    }

    #[test]
    fn test_remainder_is_exact_for_large_dividends() {
        // 2^60 = 3 * q + 1 exactly; a rounded quotient loses the 1
        assert_eq!(remainder(2f64.powi(60), 3.0), 1.0);
        assert_eq!(remainderf(2f32.powi(30), 3.0), 1.0);
        assert_eq!(remainder(-(2f64.powi(60)), 3.0), -1.0);
        assert!(remainder(1.0, 0.0).is_nan());
    }

    #[test]
    fn test_int_abs_wraps() {
        assert_eq!(abs(-5), 5);
        assert_eq!(abs(i32::MIN), i32::MIN);
    }
}
