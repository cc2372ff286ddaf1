// Spot-price estimation for the pre-flight profitability check.
// --------------------------------------------------------------
// Everything here is reporting-grade f64: the product of directional spot
// prices and fee multipliers is a cheap scalar predicate that rules a cycle
// out before any integer swap math runs. It can approve a cycle that the
// optimizer later finds worthless, but it never rejects a profitable one.

use crate::errors::LiquidityPoolError;
use crate::math::fixed_point::{u256_to_f64, Q96};
use crate::math::tick::{MAX_SQRT_RATIO, MIN_SQRT_RATIO};
use crate::pool::{Pool, PoolSnapshot, V2PoolState, V3PoolState};
use crate::types::Fraction;
use ethers::types::U256;

/// Spot price of a V2 pool in the given direction: token1 per token0 for
/// zero-for-one, reciprocal otherwise.
pub fn v2_spot_price(state: &V2PoolState, zero_for_one: bool) -> f64 {
    let reserve0 = u256_to_f64(state.reserves_token0);
    let reserve1 = u256_to_f64(state.reserves_token1);
    if zero_for_one {
        reserve1 / reserve0
    } else {
        reserve0 / reserve1
    }
}

/// Spot price of a V3 pool: `(sqrt_price / 2^96)^2`, reciprocated for
/// one-for-zero.
pub fn v3_spot_price(state: &V3PoolState, zero_for_one: bool) -> f64 {
    let sqrt_price = u256_to_f64(state.sqrt_price_x96) / Q96 as f64;
    let price = sqrt_price * sqrt_price;
    if zero_for_one {
        price
    } else {
        1.0 / price
    }
}

fn v2_liquidity_check(
    state: &V2PoolState,
    zero_for_one: bool,
) -> Result<(), LiquidityPoolError> {
    if state.reserves_token0.is_zero() || state.reserves_token1.is_zero() {
        return Err(LiquidityPoolError::ZeroLiquidity);
    }
    // a single reserve unit on the output side is unreachable
    if zero_for_one && state.reserves_token1 == U256::one() {
        return Err(LiquidityPoolError::ZeroLiquidity);
    }
    if !zero_for_one && state.reserves_token0 == U256::one() {
        return Err(LiquidityPoolError::ZeroLiquidity);
    }
    Ok(())
}

fn v3_liquidity_check(
    state: &V3PoolState,
    zero_for_one: bool,
) -> Result<(), LiquidityPoolError> {
    if state.sqrt_price_x96.is_zero() {
        return Err(LiquidityPoolError::ZeroLiquidity);
    }
    if state.tick_bitmap.is_empty() {
        return Err(LiquidityPoolError::ZeroLiquidity);
    }
    if state.liquidity == 0 {
        // pinned at the far bound with nothing left to swap against
        if zero_for_one && state.sqrt_price_x96 == MIN_SQRT_RATIO + U256::one() {
            return Err(LiquidityPoolError::ZeroLiquidity);
        }
        if !zero_for_one && state.sqrt_price_x96 == MAX_SQRT_RATIO - U256::one() {
            return Err(LiquidityPoolError::ZeroLiquidity);
        }
    }
    Ok(())
}

/// Contribution of one hop to the cycle's profit factor: directional spot
/// price times the fraction of input retained after the fee. Errors when the
/// hop cannot execute at all in this direction.
pub(crate) fn hop_factor(
    pool: &Pool,
    snapshot: &PoolSnapshot,
    zero_for_one: bool,
) -> Result<f64, LiquidityPoolError> {
    match (pool, snapshot) {
        (Pool::V2(pool), PoolSnapshot::V2(state)) => {
            v2_liquidity_check(state, zero_for_one)?;
            let fee = if zero_for_one {
                pool.fee_token0()
            } else {
                pool.fee_token1()
            };
            Ok(v2_spot_price(state, zero_for_one) * fee.retained())
        }
        (Pool::V3(pool), PoolSnapshot::V3(state)) => {
            v3_liquidity_check(state, zero_for_one)?;
            let fee = Fraction::from_pips(pool.fee_pips());
            Ok(v3_spot_price(state, zero_for_one) * fee.retained())
        }
        _ => Err(LiquidityPoolError::StateMismatch),
    }
}
