// One price-segment step of a concentrated-liquidity swap.
//
// The target price passed in is already the nearer of the next initialized
// tick and the swapper's price limit, so this function only decides whether
// the remaining amount reaches it. Positive `amount_remaining` is an
// exact-input leg, negative is exact-output.

use ethers::types::{I256, U256};

use super::fixed_point::{
    get_amount0_delta, get_amount1_delta, get_next_sqrt_price_from_input,
    get_next_sqrt_price_from_output, mul_div, mul_div_rounding_up,
};
use crate::errors::ArithmeticError;

/// Fee denominator: fees are quoted in hundredths of a bip.
pub const FEE_DENOMINATOR: u32 = 1_000_000;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SwapStep {
    pub sqrt_ratio_next_x96: U256,
    pub amount_in: U256,
    pub amount_out: U256,
    pub fee_amount: U256,
}

pub fn compute_swap_step(
    sqrt_ratio_current_x96: U256,
    sqrt_ratio_target_x96: U256,
    liquidity: u128,
    amount_remaining: I256,
    fee_pips: u32,
) -> Result<SwapStep, ArithmeticError> {
    if fee_pips >= FEE_DENOMINATOR {
        return Err(ArithmeticError::DivisionByZero);
    }
    let zero_for_one = sqrt_ratio_current_x96 >= sqrt_ratio_target_x96;
    let exact_in = amount_remaining >= I256::zero();

    let fee_complement = U256::from(FEE_DENOMINATOR - fee_pips);

    let mut step = SwapStep::default();

    if exact_in {
        let amount_remaining_less_fee = mul_div(
            amount_remaining.into_raw(),
            fee_complement,
            U256::from(FEE_DENOMINATOR),
        )?;
        step.amount_in = if zero_for_one {
            get_amount0_delta(
                sqrt_ratio_target_x96,
                sqrt_ratio_current_x96,
                liquidity,
                true,
            )?
        } else {
            get_amount1_delta(
                sqrt_ratio_current_x96,
                sqrt_ratio_target_x96,
                liquidity,
                true,
            )?
        };
        step.sqrt_ratio_next_x96 = if amount_remaining_less_fee >= step.amount_in {
            sqrt_ratio_target_x96
        } else {
            get_next_sqrt_price_from_input(
                sqrt_ratio_current_x96,
                liquidity,
                amount_remaining_less_fee,
                zero_for_one,
            )?
        };
    } else {
        step.amount_out = if zero_for_one {
            get_amount1_delta(
                sqrt_ratio_target_x96,
                sqrt_ratio_current_x96,
                liquidity,
                false,
            )?
        } else {
            get_amount0_delta(
                sqrt_ratio_current_x96,
                sqrt_ratio_target_x96,
                liquidity,
                false,
            )?
        };
        let requested = (-amount_remaining).into_raw();
        step.sqrt_ratio_next_x96 = if requested >= step.amount_out {
            sqrt_ratio_target_x96
        } else {
            get_next_sqrt_price_from_output(
                sqrt_ratio_current_x96,
                liquidity,
                requested,
                zero_for_one,
            )?
        };
    }

    let reached_target = sqrt_ratio_target_x96 == step.sqrt_ratio_next_x96;

    if zero_for_one {
        if !(reached_target && exact_in) {
            step.amount_in = get_amount0_delta(
                step.sqrt_ratio_next_x96,
                sqrt_ratio_current_x96,
                liquidity,
                true,
            )?;
        }
        if !(reached_target && !exact_in) {
            step.amount_out = get_amount1_delta(
                step.sqrt_ratio_next_x96,
                sqrt_ratio_current_x96,
                liquidity,
                false,
            )?;
        }
    } else {
        if !(reached_target && exact_in) {
            step.amount_in = get_amount1_delta(
                sqrt_ratio_current_x96,
                step.sqrt_ratio_next_x96,
                liquidity,
                true,
            )?;
        }
        if !(reached_target && !exact_in) {
            step.amount_out = get_amount0_delta(
                sqrt_ratio_current_x96,
                step.sqrt_ratio_next_x96,
                liquidity,
                false,
            )?;
        }
    }

    // exact-output never hands back more than was asked for
    if !exact_in {
        let requested = (-amount_remaining).into_raw();
        if step.amount_out > requested {
            step.amount_out = requested;
        }
    }

    step.fee_amount = if exact_in && !reached_target {
        // the whole remainder is consumed; whatever is not principal is fee
        amount_remaining.into_raw() - step.amount_in
    } else {
        mul_div_rounding_up(step.amount_in, U256::from(fee_pips), fee_complement)?
    };

    Ok(step)
}
