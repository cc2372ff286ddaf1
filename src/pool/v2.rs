// Constant-product pool with a per-direction fee.
// ------------------------------------------------
// Exact integer math only: the quoting formulas run through BigUint so even
// a 2^256 - 1 input cannot wrap. Fees are exact fractions; Camelot-style
// pools quote different fees per direction, the default is 3/1000 both ways.
//
// Reserve updates are externally driven (the chain watcher owns them) and
// archived per block so a reorg can unwind the pool to any earlier state.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use ethers::types::{Address, I256, U256};
use num_bigint::BigUint;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{PoolSnapshot, Subscriber, SubscriberSet};
use crate::errors::{ArithmeticError, LiquidityPoolError};
use crate::math::fixed_point::{from_big, to_big};
use crate::types::{Fraction, Token};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct V2PoolState {
    pub reserves_token0: U256,
    pub reserves_token1: U256,
    pub block_number: u64,
}

/// Outcome of a hypothetical swap. Deltas are pool-centric: positive means
/// the pool gained that token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct V2SimulationResult {
    pub amount0_delta: I256,
    pub amount1_delta: I256,
    pub initial_state: V2PoolState,
    pub final_state: V2PoolState,
}

pub struct V2Pool {
    address: Address,
    token0: Token,
    token1: Token,
    fee_token0: Fraction,
    fee_token1: Fraction,
    state: RwLock<V2PoolState>,
    archive: RwLock<BTreeMap<u64, V2PoolState>>,
    subscribers: SubscriberSet,
}

impl V2Pool {
    pub fn new(address: Address, token0: Token, token1: Token) -> Arc<Self> {
        Self::new_with_fees(
            address,
            token0,
            token1,
            Fraction::DEFAULT_V2,
            Fraction::DEFAULT_V2,
        )
    }

    /// Camelot-style constructor with independent fees per direction.
    pub fn new_with_fees(
        address: Address,
        token0: Token,
        token1: Token,
        fee_token0: Fraction,
        fee_token1: Fraction,
    ) -> Arc<Self> {
        let initial = V2PoolState::default();
        let mut archive = BTreeMap::new();
        archive.insert(0, initial.clone());
        Arc::new(Self {
            address,
            token0,
            token1,
            fee_token0,
            fee_token1,
            state: RwLock::new(initial),
            archive: RwLock::new(archive),
            subscribers: SubscriberSet::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token0(&self) -> &Token {
        &self.token0
    }

    pub fn token1(&self) -> &Token {
        &self.token1
    }

    pub fn fee_token0(&self) -> Fraction {
        self.fee_token0
    }

    pub fn fee_token1(&self) -> Fraction {
        self.fee_token1
    }

    /// Immutable snapshot of the live state.
    pub fn state(&self) -> V2PoolState {
        self.state.read().unwrap().clone()
    }

    pub fn subscribe(&self, subscriber: &Arc<dyn Subscriber>) {
        self.subscribers.subscribe(subscriber);
    }

    pub fn unsubscribe(&self, subscriber: &Arc<dyn Subscriber>) {
        self.subscribers.unsubscribe(subscriber);
    }

    /// Apply externally observed reserves. Returns whether the state
    /// changed. Updates may not go backwards in block height.
    pub fn update_reserves(
        &self,
        reserves_token0: U256,
        reserves_token1: U256,
        block_number: u64,
    ) -> Result<bool, LiquidityPoolError> {
        let snapshot = {
            let mut state = self.state.write().unwrap();
            if block_number < state.block_number {
                return Err(LiquidityPoolError::LateUpdate {
                    update: block_number,
                    state: state.block_number,
                });
            }
            let changed = state.reserves_token0 != reserves_token0
                || state.reserves_token1 != reserves_token1;
            state.reserves_token0 = reserves_token0;
            state.reserves_token1 = reserves_token1;
            state.block_number = block_number;
            if !changed {
                return Ok(false);
            }
            state.clone()
        };

        log::debug!(
            "pool {:?} reserves -> ({}, {}) at block {}",
            self.address,
            snapshot.reserves_token0,
            snapshot.reserves_token1,
            block_number
        );
        self.archive
            .write()
            .unwrap()
            .insert(block_number, snapshot.clone());
        self.subscribers
            .notify(self.address, &PoolSnapshot::V2(snapshot));
        Ok(true)
    }

    /// Unwind to the newest state recorded strictly before `block_number`,
    /// discarding everything at or after it. Used on chain reorgs.
    pub fn restore_state_before_block(
        &self,
        block_number: u64,
    ) -> Result<V2PoolState, LiquidityPoolError> {
        let restored = {
            let mut state = self.state.write().unwrap();
            let mut archive = self.archive.write().unwrap();
            let restored = archive
                .range(..block_number)
                .next_back()
                .map(|(_, archived)| archived.clone())
                .ok_or(LiquidityPoolError::NoPoolStateAvailable(block_number))?;
            let stale: Vec<u64> = archive.range(block_number..).map(|(block, _)| *block).collect();
            for block in stale {
                archive.remove(&block);
            }
            *state = restored.clone();
            restored
        };

        log::debug!(
            "pool {:?} restored to pre-block-{} state (block {})",
            self.address,
            block_number,
            restored.block_number
        );
        self.subscribers
            .notify(self.address, &PoolSnapshot::V2(restored.clone()));
        Ok(restored)
    }

    fn zero_for_one(&self, token_in: &Token) -> Result<bool, LiquidityPoolError> {
        if *token_in == self.token0 {
            Ok(true)
        } else if *token_in == self.token1 {
            Ok(false)
        } else {
            Err(LiquidityPoolError::UnknownToken(token_in.address))
        }
    }

    fn swap_fee(&self, zero_for_one: bool) -> Fraction {
        if zero_for_one {
            self.fee_token0
        } else {
            self.fee_token1
        }
    }

    /// Exact output for `amount_in` of `token_in`, floored the way the pair
    /// contract floors. The last reserve unit is unreachable, so the result
    /// is clamped to `reserve_out - 1`.
    pub fn calculate_tokens_out_from_tokens_in(
        &self,
        token_in: &Token,
        amount_in: U256,
        override_state: Option<&V2PoolState>,
    ) -> Result<U256, LiquidityPoolError> {
        if amount_in.is_zero() {
            return Err(LiquidityPoolError::ZeroSwap);
        }
        let state = match override_state {
            Some(state) => state.clone(),
            None => self.state(),
        };
        if state.reserves_token0.is_zero() || state.reserves_token1.is_zero() {
            return Err(LiquidityPoolError::ZeroLiquidity);
        }

        let zero_for_one = self.zero_for_one(token_in)?;
        let (reserve_in, reserve_out) = if zero_for_one {
            (state.reserves_token0, state.reserves_token1)
        } else {
            (state.reserves_token1, state.reserves_token0)
        };
        let fee = self.swap_fee(zero_for_one);
        if fee.numerator >= fee.denominator {
            return Err(LiquidityPoolError::Arithmetic(
                ArithmeticError::DivisionByZero,
            ));
        }

        let amount_in_with_fee =
            to_big(amount_in) * BigUint::from(fee.denominator - fee.numerator);
        let numerator = &amount_in_with_fee * to_big(reserve_out);
        let denominator = to_big(reserve_in) * BigUint::from(fee.denominator) + &amount_in_with_fee;
        let amount_out = from_big(&(numerator / denominator))?;

        let max_out = reserve_out - U256::one();
        Ok(amount_out.min(max_out))
    }

    /// Exact input of `token_in` required to withdraw `amount_out` of the
    /// opposite token, rounded up the way the router rounds.
    pub fn calculate_tokens_in_from_tokens_out(
        &self,
        token_in: &Token,
        amount_out: U256,
        override_state: Option<&V2PoolState>,
    ) -> Result<U256, LiquidityPoolError> {
        if amount_out.is_zero() {
            return Err(LiquidityPoolError::ZeroSwap);
        }
        let state = match override_state {
            Some(state) => state.clone(),
            None => self.state(),
        };
        if state.reserves_token0.is_zero() || state.reserves_token1.is_zero() {
            return Err(LiquidityPoolError::ZeroLiquidity);
        }

        let zero_for_one = self.zero_for_one(token_in)?;
        let (reserve_in, reserve_out) = if zero_for_one {
            (state.reserves_token0, state.reserves_token1)
        } else {
            (state.reserves_token1, state.reserves_token0)
        };
        if amount_out >= reserve_out {
            return Err(LiquidityPoolError::InsufficientLiquidity);
        }
        let fee = self.swap_fee(zero_for_one);
        if fee.numerator >= fee.denominator {
            return Err(LiquidityPoolError::Arithmetic(
                ArithmeticError::DivisionByZero,
            ));
        }

        let numerator = to_big(reserve_in) * to_big(amount_out) * BigUint::from(fee.denominator);
        let denominator =
            to_big(reserve_out - amount_out) * BigUint::from(fee.denominator - fee.numerator);
        let amount_in = from_big(&(numerator / denominator))?;
        amount_in
            .checked_add(U256::one())
            .ok_or(LiquidityPoolError::Arithmetic(ArithmeticError::Overflow))
    }

    /// Quote a swap and report the would-be end state without touching the
    /// live pool.
    pub fn simulate_swap(
        &self,
        token_in: &Token,
        amount_in: U256,
        override_state: Option<&V2PoolState>,
    ) -> Result<V2SimulationResult, LiquidityPoolError> {
        let initial_state = match override_state {
            Some(state) => state.clone(),
            None => self.state(),
        };
        let amount_out =
            self.calculate_tokens_out_from_tokens_in(token_in, amount_in, Some(&initial_state))?;
        let zero_for_one = self.zero_for_one(token_in)?;

        let amount_in_signed =
            I256::try_from(amount_in).map_err(|_| ArithmeticError::Overflow)?;
        let amount_out_signed =
            I256::try_from(amount_out).map_err(|_| ArithmeticError::Overflow)?;

        let (amount0_delta, amount1_delta) = if zero_for_one {
            (amount_in_signed, -amount_out_signed)
        } else {
            (-amount_out_signed, amount_in_signed)
        };

        let final_state = if zero_for_one {
            V2PoolState {
                reserves_token0: initial_state.reserves_token0 + amount_in,
                reserves_token1: initial_state.reserves_token1 - amount_out,
                block_number: initial_state.block_number,
            }
        } else {
            V2PoolState {
                reserves_token0: initial_state.reserves_token0 - amount_out,
                reserves_token1: initial_state.reserves_token1 + amount_in,
                block_number: initial_state.block_number,
            }
        };

        Ok(V2SimulationResult {
            amount0_delta,
            amount1_delta,
            initial_state,
            final_state,
        })
    }
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct V2PoolRepr {
    address: Address,
    token0: Token,
    token1: Token,
    fee_token0: Fraction,
    fee_token1: Fraction,
    state: V2PoolState,
    archive: BTreeMap<u64, V2PoolState>,
}

#[cfg(feature = "serde")]
impl Serialize for V2Pool {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = V2PoolRepr {
            address: self.address,
            token0: self.token0.clone(),
            token1: self.token1.clone(),
            fee_token0: self.fee_token0,
            fee_token1: self.fee_token1,
            state: self.state(),
            archive: self.archive.read().unwrap().clone(),
        };
        repr.serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for V2Pool {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = V2PoolRepr::deserialize(deserializer)?;
        Ok(Self {
            address: repr.address,
            token0: repr.token0,
            token1: repr.token1,
            fee_token0: repr.fee_token0,
            fee_token1: repr.fee_token1,
            state: RwLock::new(repr.state),
            archive: RwLock::new(repr.archive),
            subscribers: SubscriberSet::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(x: u8) -> Address {
        Address::from([x; 20])
    }

    fn pool_with_reserves(reserve0: u128, reserve1: u128) -> Arc<V2Pool> {
        let pool = V2Pool::new(
            addr(0xAA),
            Token::new(addr(1), 8, "WBTC"),
            Token::new(addr(2), 18, "WETH"),
        );
        pool.update_reserves(U256::from(reserve0), U256::from(reserve1), 1)
            .unwrap();
        pool
    }

    #[test]
    fn rejects_zero_input() {
        let pool = pool_with_reserves(1_000_000, 1_000_000);
        let token0 = pool.token0().clone();
        assert_eq!(
            pool.calculate_tokens_out_from_tokens_in(&token0, U256::zero(), None),
            Err(LiquidityPoolError::ZeroSwap)
        );
        assert_eq!(
            pool.calculate_tokens_in_from_tokens_out(&token0, U256::zero(), None),
            Err(LiquidityPoolError::ZeroSwap)
        );
    }

    #[test]
    fn rejects_empty_reserves() {
        let pool = V2Pool::new(
            addr(0xAB),
            Token::new(addr(1), 8, "WBTC"),
            Token::new(addr(2), 18, "WETH"),
        );
        let token0 = pool.token0().clone();
        assert_eq!(
            pool.calculate_tokens_out_from_tokens_in(&token0, U256::from(100u64), None),
            Err(LiquidityPoolError::ZeroLiquidity)
        );
    }

    #[test]
    fn rejects_foreign_token() {
        let pool = pool_with_reserves(1_000_000, 1_000_000);
        let stranger = Token::new(addr(9), 18, "DAI");
        assert_eq!(
            pool.calculate_tokens_out_from_tokens_in(&stranger, U256::from(100u64), None),
            Err(LiquidityPoolError::UnknownToken(addr(9)))
        );
    }

    #[test]
    fn k_invariant_holds_after_swap() {
        let pool = pool_with_reserves(16_231_137_593, 2_571_336_301_536_722_443_178);
        let token0 = pool.token0().clone();
        let amount_in = U256::from(8_000_000_000u64);
        let amount_out = pool
            .calculate_tokens_out_from_tokens_in(&token0, amount_in, None)
            .unwrap();

        let state = pool.state();
        let k_before = to_big(state.reserves_token0) * to_big(state.reserves_token1);
        // fee-adjusted input actually added to the invariant check
        let in_with_fee = to_big(amount_in) * BigUint::from(997u32) / BigUint::from(1000u32);
        let k_after = (to_big(state.reserves_token0) + in_with_fee)
            * (to_big(state.reserves_token1) - to_big(amount_out));
        assert!(k_after >= k_before);
    }

    #[test]
    fn inverse_law_within_one_unit() {
        let pool = pool_with_reserves(16_231_137_593, 2_571_336_301_536_722_443_178);
        let token0 = pool.token0().clone();
        let amount_in = U256::from(8_000_000_000u64);
        let amount_out = pool
            .calculate_tokens_out_from_tokens_in(&token0, amount_in, None)
            .unwrap();

        let required_in = pool
            .calculate_tokens_in_from_tokens_out(&token0, amount_out, None)
            .unwrap();
        assert!(required_in <= amount_in);

        let required_more = pool
            .calculate_tokens_in_from_tokens_out(&token0, amount_out + U256::one(), None)
            .unwrap();
        assert!(required_more > amount_in);
    }

    #[test]
    fn max_input_drains_to_last_unit() {
        let pool = pool_with_reserves(16_231_137_593, 2_571_336_301_536_722_443_178);
        let token0 = pool.token0().clone();
        let out = pool
            .calculate_tokens_out_from_tokens_in(&token0, U256::MAX, None)
            .unwrap();
        assert_eq!(
            out,
            U256::from(2_571_336_301_536_722_443_178u128) - U256::one()
        );
    }

    #[test]
    fn exact_output_beyond_reserves_fails() {
        let pool = pool_with_reserves(1_000_000, 2_000_000);
        let token0 = pool.token0().clone();
        assert_eq!(
            pool.calculate_tokens_in_from_tokens_out(&token0, U256::from(2_000_000u64), None),
            Err(LiquidityPoolError::InsufficientLiquidity)
        );
    }

    #[test]
    fn asymmetric_fees_quote_differently_per_direction() {
        let pool = V2Pool::new_with_fees(
            addr(0xAC),
            Token::new(addr(1), 18, "A"),
            Token::new(addr(2), 18, "B"),
            Fraction::new(3, 1000),
            Fraction::new(30, 1000),
        );
        pool.update_reserves(U256::from(10u128.pow(21)), U256::from(10u128.pow(21)), 1)
            .unwrap();

        let token0 = pool.token0().clone();
        let token1 = pool.token1().clone();
        let amount = U256::from(10u128.pow(18));
        let out_0_to_1 = pool
            .calculate_tokens_out_from_tokens_in(&token0, amount, None)
            .unwrap();
        let out_1_to_0 = pool
            .calculate_tokens_out_from_tokens_in(&token1, amount, None)
            .unwrap();
        // the 3% direction pays more fee than the 0.3% direction
        assert!(out_1_to_0 < out_0_to_1);
    }

    #[test]
    fn stale_updates_are_rejected() {
        let pool = pool_with_reserves(1_000, 1_000);
        pool.update_reserves(U256::from(2_000u64), U256::from(2_000u64), 5)
            .unwrap();
        assert_eq!(
            pool.update_reserves(U256::from(3_000u64), U256::from(3_000u64), 4),
            Err(LiquidityPoolError::LateUpdate { update: 4, state: 5 })
        );
    }

    #[test]
    fn simulation_leaves_live_state_untouched() {
        let pool = pool_with_reserves(16_231_137_593, 2_571_336_301_536_722_443_178);
        let token0 = pool.token0().clone();
        let before = pool.state();

        let sim = pool
            .simulate_swap(&token0, U256::from(8_000_000_000u64), None)
            .unwrap();
        assert_eq!(pool.state(), before);
        assert!(sim.amount0_delta > I256::zero());
        assert!(sim.amount1_delta < I256::zero());
        assert_eq!(
            sim.final_state.reserves_token0,
            before.reserves_token0 + U256::from(8_000_000_000u64)
        );
    }
}
