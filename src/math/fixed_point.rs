// Fixed-point helpers for Q64.96 sqrt-price arithmetic.
// -----------------------------------------------------
// All entry points take and return 256-bit unsigned integers; the
// intermediates run through BigUint so products up to 512 bits never wrap.
// Rounding is explicit everywhere. Any result that does not fit back into
// 256 bits is an `Overflow` error, matching where the on-chain libraries
// would revert.

use ethers::types::U256;
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{FromPrimitive, Zero};

use crate::errors::ArithmeticError;

pub const Q96: u128 = 1 << 96;

// --------------------------------- Helpers ---------------------------------

pub(crate) fn to_big(x: U256) -> BigUint {
    let mut bytes = [0u8; 32];
    x.to_big_endian(&mut bytes);
    BigUint::from_bytes_be(&bytes)
}

pub(crate) fn from_big(x: &BigUint) -> Result<U256, ArithmeticError> {
    if x.bits() > 256 {
        return Err(ArithmeticError::Overflow);
    }
    Ok(U256::from_big_endian(&x.to_bytes_be()))
}

#[inline]
fn ceil_div(a: &BigUint, b: &BigUint) -> BigUint {
    a.div_ceil(b)
}

#[inline]
fn q96_big() -> BigUint {
    BigUint::from(Q96)
}

// --------------------------------- Mul-div ---------------------------------

/// `floor(a * b / denominator)` with a 512-bit intermediate product.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, ArithmeticError> {
    if denominator.is_zero() {
        return Err(ArithmeticError::DivisionByZero);
    }
    let product = to_big(a) * to_big(b);
    from_big(&(product / to_big(denominator)))
}

/// `ceil(a * b / denominator)` with a 512-bit intermediate product.
pub fn mul_div_rounding_up(a: U256, b: U256, denominator: U256) -> Result<U256, ArithmeticError> {
    if denominator.is_zero() {
        return Err(ArithmeticError::DivisionByZero);
    }
    let product = to_big(a) * to_big(b);
    from_big(&ceil_div(&product, &to_big(denominator)))
}

// ------------------------------ Amount deltas -------------------------------

/// Token0 owed across the price range `[sqrt_a, sqrt_b]` for `liquidity`.
///
/// `amount0 = L * Q96 * (sb - sa) / (sa * sb)`, computed as a two-step
/// division so the rounding matches the reference library exactly:
/// round-up applies ceil to both divisions, round-down applies floor to both.
pub fn get_amount0_delta(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, ArithmeticError> {
    if liquidity == 0 {
        return Ok(U256::zero());
    }
    let (sa, sb) = if sqrt_ratio_a_x96 < sqrt_ratio_b_x96 {
        (to_big(sqrt_ratio_a_x96), to_big(sqrt_ratio_b_x96))
    } else {
        (to_big(sqrt_ratio_b_x96), to_big(sqrt_ratio_a_x96))
    };
    if sa.is_zero() {
        return Err(ArithmeticError::DivisionByZero);
    }
    if sa == sb {
        return Ok(U256::zero());
    }

    let numerator1 = BigUint::from(liquidity) << 96;
    let numerator2 = &sb - &sa;

    let result = if round_up {
        ceil_div(&ceil_div(&(&numerator1 * &numerator2), &sb), &sa)
    } else {
        ((&numerator1 * &numerator2) / &sb) / &sa
    };
    from_big(&result)
}

/// Token1 owed across the price range `[sqrt_a, sqrt_b]` for `liquidity`.
///
/// `amount1 = L * (sb - sa) / Q96`, rounded per flag.
pub fn get_amount1_delta(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, ArithmeticError> {
    if liquidity == 0 {
        return Ok(U256::zero());
    }
    let (sa, sb) = if sqrt_ratio_a_x96 < sqrt_ratio_b_x96 {
        (to_big(sqrt_ratio_a_x96), to_big(sqrt_ratio_b_x96))
    } else {
        (to_big(sqrt_ratio_b_x96), to_big(sqrt_ratio_a_x96))
    };
    if sa == sb {
        return Ok(U256::zero());
    }

    let numerator = BigUint::from(liquidity) * (&sb - &sa);
    let result = if round_up {
        ceil_div(&numerator, &q96_big())
    } else {
        numerator / q96_big()
    };
    from_big(&result)
}

// ----------------------------- Next sqrt price ------------------------------

/// Price after consuming `amount_in` (net of fee) at `sqrt_price_x96`.
///
/// Rounds up for `zero_for_one` (price moves down, never past the true
/// target) and down otherwise, matching the whitepaper formulas.
pub fn get_next_sqrt_price_from_input(
    sqrt_price_x96: U256,
    liquidity: u128,
    amount_in: U256,
    zero_for_one: bool,
) -> Result<U256, ArithmeticError> {
    if sqrt_price_x96.is_zero() || liquidity == 0 {
        return Err(ArithmeticError::DivisionByZero);
    }
    if amount_in.is_zero() {
        return Ok(sqrt_price_x96);
    }

    let sqrt_p = to_big(sqrt_price_x96);
    let numerator1 = BigUint::from(liquidity) << 96;

    if zero_for_one {
        // sqrtQ = ceil( L<<96 * sqrtP / (L<<96 + amountIn * sqrtP) )
        let denominator = &numerator1 + to_big(amount_in) * &sqrt_p;
        from_big(&ceil_div(&(&numerator1 * &sqrt_p), &denominator))
    } else {
        // sqrtQ = sqrtP + floor( amountIn << 96 / L )
        let increment = (to_big(amount_in) << 96) / BigUint::from(liquidity);
        from_big(&(sqrt_p + increment))
    }
}

/// Price after producing `amount_out` at `sqrt_price_x96`. Fails with
/// `PriceBound` when the requested output cannot be produced from the
/// current price with the given liquidity.
pub fn get_next_sqrt_price_from_output(
    sqrt_price_x96: U256,
    liquidity: u128,
    amount_out: U256,
    zero_for_one: bool,
) -> Result<U256, ArithmeticError> {
    if sqrt_price_x96.is_zero() || liquidity == 0 {
        return Err(ArithmeticError::DivisionByZero);
    }
    if amount_out.is_zero() {
        return Ok(sqrt_price_x96);
    }

    let sqrt_p = to_big(sqrt_price_x96);

    if zero_for_one {
        // Output is token1; price moves down. sqrtQ = sqrtP - ceil(out << 96 / L)
        let quotient = ceil_div(&(to_big(amount_out) << 96), &BigUint::from(liquidity));
        if quotient >= sqrt_p {
            return Err(ArithmeticError::PriceBound);
        }
        from_big(&(sqrt_p - quotient))
    } else {
        // Output is token0; price moves up.
        // sqrtQ = ceil( L<<96 * sqrtP / (L<<96 - out * sqrtP) )
        let numerator1 = BigUint::from(liquidity) << 96;
        let product = to_big(amount_out) * &sqrt_p;
        if product >= numerator1 {
            return Err(ArithmeticError::PriceBound);
        }
        let denominator = &numerator1 - product;
        from_big(&ceil_div(&(&numerator1 * &sqrt_p), &denominator))
    }
}

// --------------------------- Optimizer boundary -----------------------------

/// Lossy widening to f64 for the scalar search. Exact math never goes
/// through this path.
pub fn u256_to_f64(x: U256) -> f64 {
    const LIMB: f64 = 18_446_744_073_709_551_616.0; // 2^64
    x.0.iter()
        .rev()
        .fold(0.0, |acc, &limb| acc * LIMB + limb as f64)
}

/// Floor of a non-negative float as a U256, saturating at the type bounds.
pub fn f64_to_u256(x: f64) -> U256 {
    if !x.is_finite() || x <= 0.0 {
        return U256::zero();
    }
    match BigUint::from_f64(x.floor()) {
        Some(big) => from_big(&big).unwrap_or(U256::MAX),
        None => U256::zero(),
    }
}

// ---------------------------------- Tests ------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div_floor_and_ceil() {
        let a = U256::from(7u64);
        let b = U256::from(3u64);
        let d = U256::from(2u64);
        assert_eq!(mul_div(a, b, d).unwrap(), U256::from(10u64));
        assert_eq!(mul_div_rounding_up(a, b, d).unwrap(), U256::from(11u64));

        // exact division rounds identically in both modes
        let e = U256::from(4u64);
        assert_eq!(mul_div(a, e, d).unwrap(), U256::from(14u64));
        assert_eq!(mul_div_rounding_up(a, e, d).unwrap(), U256::from(14u64));
    }

    #[test]
    fn mul_div_zero_denominator() {
        assert_eq!(
            mul_div(U256::one(), U256::one(), U256::zero()),
            Err(ArithmeticError::DivisionByZero)
        );
    }

    #[test]
    fn mul_div_overflow() {
        assert_eq!(
            mul_div(U256::MAX, U256::MAX, U256::one()),
            Err(ArithmeticError::Overflow)
        );
        // but a large product with a large denominator fits
        assert_eq!(mul_div(U256::MAX, U256::MAX, U256::MAX).unwrap(), U256::MAX);
    }

    #[test]
    fn amount_deltas_are_order_insensitive() {
        let sa = U256::from(Q96); // price 1.0
        let sb = U256::from(Q96 * 2); // price 4.0
        let liquidity = 1_000_000_000_000u128;

        let fwd = get_amount0_delta(sa, sb, liquidity, true).unwrap();
        let rev = get_amount0_delta(sb, sa, liquidity, true).unwrap();
        assert_eq!(fwd, rev);

        let fwd1 = get_amount1_delta(sa, sb, liquidity, false).unwrap();
        let rev1 = get_amount1_delta(sb, sa, liquidity, false).unwrap();
        assert_eq!(fwd1, rev1);
        // L * (sb - sa) / Q96 with sb - sa == Q96 is exactly L
        assert_eq!(fwd1, U256::from(liquidity));
    }

    #[test]
    fn amount_delta_rounding_modes_differ_by_at_most_one() {
        let sa = U256::from(Q96);
        let sb = U256::from(Q96 + Q96 / 3);
        let liquidity = 987_654_321u128;

        let up = get_amount0_delta(sa, sb, liquidity, true).unwrap();
        let down = get_amount0_delta(sa, sb, liquidity, false).unwrap();
        assert!(up >= down);
        assert!(up - down <= U256::from(2u64)); // two chained divisions
    }

    #[test]
    fn next_price_from_input_moves_in_direction() {
        let p = U256::from(Q96);
        let liquidity = 10_000_000_000u128;
        let amount = U256::from(1_000_000u64);

        let down = get_next_sqrt_price_from_input(p, liquidity, amount, true).unwrap();
        let up = get_next_sqrt_price_from_input(p, liquidity, amount, false).unwrap();
        assert!(down < p);
        assert!(up > p);

        // zero input leaves the price untouched
        assert_eq!(
            get_next_sqrt_price_from_input(p, liquidity, U256::zero(), true).unwrap(),
            p
        );
    }

    #[test]
    fn next_price_from_output_rejects_exhausted_range() {
        let p = U256::from(Q96);
        let liquidity = 1_000u128;
        // asking for more token1 than the range can produce
        let result = get_next_sqrt_price_from_output(p, liquidity, U256::MAX, true);
        assert_eq!(result, Err(ArithmeticError::PriceBound));
    }

    #[test]
    fn f64_round_trip_on_exactly_representable_values() {
        for v in [0u64, 1, 1_000, 1u64 << 52] {
            let x = U256::from(v);
            assert_eq!(f64_to_u256(u256_to_f64(x)), x);
        }
        assert_eq!(f64_to_u256(-1.0), U256::zero());
        assert_eq!(f64_to_u256(f64::NAN), U256::zero());
    }

    #[test]
    fn u256_to_f64_is_monotone_across_limbs() {
        let small = U256::from(u64::MAX);
        let large = U256::from(u128::MAX);
        assert!(u256_to_f64(small) < u256_to_f64(large));
        assert!(u256_to_f64(large) < u256_to_f64(U256::MAX));
    }
}
