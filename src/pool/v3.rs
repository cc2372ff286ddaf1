// Concentrated-liquidity pool with a tick-walking swap simulator.
// ----------------------------------------------------------------
// The simulator walks initialized ticks one bitmap word at a time, applying
// `compute_swap_step` per price segment and crossing liquidity at
// initialized boundaries. Nothing here mutates the live pool; every entry
// point works on a snapshot and returns the would-be end state.
//
// A pool flagged `sparse_bitmap` only holds the bitmap words it has been
// fed; missing words read as empty. Such a pool cannot be shipped to a
// foreign worker process, which the solver enforces at dispatch time.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use ethers::types::{Address, I256, U256};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{PoolSnapshot, Subscriber, SubscriberSet};
use crate::errors::{ArithmeticError, LiquidityPoolError};
use crate::math::swap_step::compute_swap_step;
use crate::math::tick::{
    flip_tick, get_sqrt_ratio_at_tick, get_tick_at_sqrt_ratio,
    next_initialized_tick_within_one_word, MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK,
};
use crate::types::Token;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickInfo {
    pub liquidity_net: i128,
    pub liquidity_gross: u128,
    pub initialized: bool,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct V3PoolState {
    pub sqrt_price_x96: U256,
    pub liquidity: u128,
    pub tick: i32,
    pub tick_bitmap: BTreeMap<i16, U256>,
    pub ticks: BTreeMap<i32, TickInfo>,
    pub block_number: u64,
}

/// Outcome of a hypothetical swap. Deltas are pool-centric: positive means
/// the pool gained that token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct V3SimulationResult {
    pub amount0_delta: I256,
    pub amount1_delta: I256,
    pub initial_state: V3PoolState,
    pub final_state: V3PoolState,
}

struct SwapState {
    amount_specified_remaining: I256,
    amount_calculated: I256,
    sqrt_price_x96: U256,
    tick: i32,
    liquidity: u128,
}

fn add_liquidity_delta(liquidity: u128, delta: i128) -> Result<u128, ArithmeticError> {
    if delta < 0 {
        liquidity
            .checked_sub(delta.unsigned_abs())
            .ok_or(ArithmeticError::LiquidityUnderflow)
    } else {
        liquidity
            .checked_add(delta as u128)
            .ok_or(ArithmeticError::LiquidityUnderflow)
    }
}

/// Build the word map matching a set of initialized ticks. Test and
/// bootstrap helper; every tick must sit on the spacing grid.
pub fn build_tick_bitmap(
    ticks: &BTreeMap<i32, TickInfo>,
    tick_spacing: i32,
) -> Result<BTreeMap<i16, U256>, ArithmeticError> {
    let mut bitmap = BTreeMap::new();
    for &tick in ticks.keys() {
        flip_tick(&mut bitmap, tick, tick_spacing)?;
    }
    Ok(bitmap)
}

pub struct V3Pool {
    address: Address,
    token0: Token,
    token1: Token,
    fee_pips: u32,
    tick_spacing: i32,
    sparse_bitmap: bool,
    state: RwLock<V3PoolState>,
    archive: RwLock<BTreeMap<u64, V3PoolState>>,
    subscribers: SubscriberSet,
}

impl V3Pool {
    pub fn new(
        address: Address,
        token0: Token,
        token1: Token,
        fee_pips: u32,
        tick_spacing: i32,
        initial_state: V3PoolState,
    ) -> Arc<Self> {
        Self::build(
            address,
            token0,
            token1,
            fee_pips,
            tick_spacing,
            false,
            initial_state,
        )
    }

    /// Variant for pools whose bitmap words are loaded on demand.
    pub fn new_sparse(
        address: Address,
        token0: Token,
        token1: Token,
        fee_pips: u32,
        tick_spacing: i32,
        initial_state: V3PoolState,
    ) -> Arc<Self> {
        Self::build(
            address,
            token0,
            token1,
            fee_pips,
            tick_spacing,
            true,
            initial_state,
        )
    }

    fn build(
        address: Address,
        token0: Token,
        token1: Token,
        fee_pips: u32,
        tick_spacing: i32,
        sparse_bitmap: bool,
        initial_state: V3PoolState,
    ) -> Arc<Self> {
        let mut archive = BTreeMap::new();
        archive.insert(initial_state.block_number, initial_state.clone());
        Arc::new(Self {
            address,
            token0,
            token1,
            fee_pips,
            tick_spacing,
            sparse_bitmap,
            state: RwLock::new(initial_state),
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

    pub fn fee_pips(&self) -> u32 {
        self.fee_pips
    }

    pub fn tick_spacing(&self) -> i32 {
        self.tick_spacing
    }

    pub fn sparse_bitmap(&self) -> bool {
        self.sparse_bitmap
    }

    /// Immutable snapshot of the live state.
    pub fn state(&self) -> V3PoolState {
        self.state.read().unwrap().clone()
    }

    pub fn subscribe(&self, subscriber: &Arc<dyn Subscriber>) {
        self.subscribers.subscribe(subscriber);
    }

    pub fn unsubscribe(&self, subscriber: &Arc<dyn Subscriber>) {
        self.subscribers.unsubscribe(subscriber);
    }

    /// Replace the live state with an externally observed one. Returns
    /// whether anything changed. Updates may not go backwards in block
    /// height.
    pub fn external_update(&self, new_state: V3PoolState) -> Result<bool, LiquidityPoolError> {
        let snapshot = {
            let mut state = self.state.write().unwrap();
            if new_state.block_number < state.block_number {
                return Err(LiquidityPoolError::LateUpdate {
                    update: new_state.block_number,
                    state: state.block_number,
                });
            }
            if *state == new_state {
                return Ok(false);
            }
            *state = new_state;
            state.clone()
        };

        log::debug!(
            "pool {:?} state advanced to block {} (tick {}, liquidity {})",
            self.address,
            snapshot.block_number,
            snapshot.tick,
            snapshot.liquidity
        );
        self.archive
            .write()
            .unwrap()
            .insert(snapshot.block_number, snapshot.clone());
        self.subscribers
            .notify(self.address, &PoolSnapshot::V3(snapshot));
        Ok(true)
    }

    /// Unwind to the newest state recorded strictly before `block_number`,
    /// discarding everything at or after it. Used on chain reorgs.
    pub fn restore_state_before_block(
        &self,
        block_number: u64,
    ) -> Result<V3PoolState, LiquidityPoolError> {
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
        self.subscribers
            .notify(self.address, &PoolSnapshot::V3(restored.clone()));
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

    fn default_price_limit(zero_for_one: bool) -> U256 {
        if zero_for_one {
            MIN_SQRT_RATIO + U256::one()
        } else {
            MAX_SQRT_RATIO - U256::one()
        }
    }

    /// Core tick walk. Returns the pool-centric `(amount0, amount1)` deltas
    /// and the end state. Positive `amount_specified` swaps exact-input,
    /// negative exact-output.
    fn swap(
        &self,
        initial_state: &V3PoolState,
        zero_for_one: bool,
        amount_specified: I256,
        sqrt_price_limit_x96: U256,
    ) -> Result<(I256, I256, V3PoolState), LiquidityPoolError> {
        if amount_specified.is_zero() {
            return Err(LiquidityPoolError::ZeroSwap);
        }
        if initial_state.sqrt_price_x96.is_zero() {
            return Err(LiquidityPoolError::ZeroLiquidity);
        }
        if initial_state.tick_bitmap.is_empty() {
            return Err(LiquidityPoolError::ZeroLiquidity);
        }
        // pinned at the far bound with nothing to swap against
        if initial_state.liquidity == 0 {
            if zero_for_one
                && initial_state.sqrt_price_x96 == MIN_SQRT_RATIO + U256::one()
            {
                return Err(LiquidityPoolError::ZeroLiquidity);
            }
            if !zero_for_one
                && initial_state.sqrt_price_x96 == MAX_SQRT_RATIO - U256::one()
            {
                return Err(LiquidityPoolError::ZeroLiquidity);
            }
        }
        if zero_for_one {
            if sqrt_price_limit_x96 >= initial_state.sqrt_price_x96
                || sqrt_price_limit_x96 <= MIN_SQRT_RATIO
            {
                return Err(LiquidityPoolError::Arithmetic(ArithmeticError::PriceBound));
            }
        } else if sqrt_price_limit_x96 <= initial_state.sqrt_price_x96
            || sqrt_price_limit_x96 >= MAX_SQRT_RATIO
        {
            return Err(LiquidityPoolError::Arithmetic(ArithmeticError::PriceBound));
        }

        let exact_input = amount_specified > I256::zero();

        let mut state = SwapState {
            amount_specified_remaining: amount_specified,
            amount_calculated: I256::zero(),
            sqrt_price_x96: initial_state.sqrt_price_x96,
            tick: initial_state.tick,
            liquidity: initial_state.liquidity,
        };

        while !state.amount_specified_remaining.is_zero()
            && state.sqrt_price_x96 != sqrt_price_limit_x96
        {
            let sqrt_price_start_x96 = state.sqrt_price_x96;

            let (next_tick, initialized) = next_initialized_tick_within_one_word(
                &initial_state.tick_bitmap,
                state.tick,
                self.tick_spacing,
                zero_for_one,
            );
            // the bitmap is unaware of the tick bounds
            let next_tick = next_tick.clamp(MIN_TICK, MAX_TICK);
            let sqrt_price_next_tick = get_sqrt_ratio_at_tick(next_tick)?;

            let sqrt_price_target = if zero_for_one {
                sqrt_price_next_tick.max(sqrt_price_limit_x96)
            } else {
                sqrt_price_next_tick.min(sqrt_price_limit_x96)
            };

            let step = compute_swap_step(
                state.sqrt_price_x96,
                sqrt_price_target,
                state.liquidity,
                state.amount_specified_remaining,
                self.fee_pips,
            )?;

            let gross_in = step
                .amount_in
                .checked_add(step.fee_amount)
                .ok_or(ArithmeticError::Overflow)?;
            let gross_in = I256::try_from(gross_in).map_err(|_| ArithmeticError::Overflow)?;
            let amount_out =
                I256::try_from(step.amount_out).map_err(|_| ArithmeticError::Overflow)?;

            if exact_input {
                state.amount_specified_remaining -= gross_in;
                state.amount_calculated -= amount_out;
            } else {
                state.amount_specified_remaining += amount_out;
                state.amount_calculated += gross_in;
            }
            state.sqrt_price_x96 = step.sqrt_ratio_next_x96;

            if state.sqrt_price_x96 == sqrt_price_next_tick {
                if initialized {
                    let liquidity_net = initial_state
                        .ticks
                        .get(&next_tick)
                        .map(|info| info.liquidity_net)
                        .unwrap_or_default();
                    let liquidity_net = if zero_for_one {
                        liquidity_net
                            .checked_neg()
                            .ok_or(ArithmeticError::LiquidityUnderflow)?
                    } else {
                        liquidity_net
                    };
                    state.liquidity = add_liquidity_delta(state.liquidity, liquidity_net)?;
                }
                state.tick = if zero_for_one { next_tick - 1 } else { next_tick };
            } else if state.sqrt_price_x96 != sqrt_price_start_x96 {
                state.tick = get_tick_at_sqrt_ratio(state.sqrt_price_x96)?;
            }
        }

        let (amount0_delta, amount1_delta) = if zero_for_one == exact_input {
            (
                amount_specified - state.amount_specified_remaining,
                state.amount_calculated,
            )
        } else {
            (
                state.amount_calculated,
                amount_specified - state.amount_specified_remaining,
            )
        };

        let final_state = V3PoolState {
            sqrt_price_x96: state.sqrt_price_x96,
            liquidity: state.liquidity,
            tick: state.tick,
            tick_bitmap: initial_state.tick_bitmap.clone(),
            ticks: initial_state.ticks.clone(),
            block_number: initial_state.block_number,
        };
        Ok((amount0_delta, amount1_delta, final_state))
    }

    /// Exact-input quote for `amount_in` of `token_in`. The walk runs to the
    /// far price bound, so an oversized input is partially filled and the
    /// returned output is everything the range liquidity can produce.
    pub fn calculate_tokens_out_from_tokens_in(
        &self,
        token_in: &Token,
        amount_in: U256,
        override_state: Option<&V3PoolState>,
    ) -> Result<U256, LiquidityPoolError> {
        let state = match override_state {
            Some(state) => state.clone(),
            None => self.state(),
        };
        let zero_for_one = self.zero_for_one(token_in)?;
        let amount_specified =
            I256::try_from(amount_in).map_err(|_| ArithmeticError::Overflow)?;

        let (amount0, amount1) = {
            let (amount0, amount1, _) = self.swap(
                &state,
                zero_for_one,
                amount_specified,
                Self::default_price_limit(zero_for_one),
            )?;
            (amount0, amount1)
        };

        let amount_out = if zero_for_one { -amount1 } else { -amount0 };
        debug_assert!(amount_out >= I256::zero());
        Ok(amount_out.into_raw())
    }

    /// Exact-output quote: input of `token_in` needed to withdraw
    /// `amount_out` of the opposite token. Fails with
    /// `InsufficientLiquidity` when the range cannot produce the request.
    pub fn calculate_tokens_in_from_tokens_out(
        &self,
        token_in: &Token,
        amount_out: U256,
        override_state: Option<&V3PoolState>,
    ) -> Result<U256, LiquidityPoolError> {
        let state = match override_state {
            Some(state) => state.clone(),
            None => self.state(),
        };
        let zero_for_one = self.zero_for_one(token_in)?;
        let amount_specified =
            -I256::try_from(amount_out).map_err(|_| ArithmeticError::Overflow)?;

        let (amount0, amount1, end_state) = self.swap(
            &state,
            zero_for_one,
            amount_specified,
            Self::default_price_limit(zero_for_one),
        )?;

        let produced = if zero_for_one { -amount1 } else { -amount0 };
        if produced < I256::try_from(amount_out).map_err(|_| ArithmeticError::Overflow)? {
            log::debug!(
                "pool {:?} exhausted at sqrt price {} before filling exact output",
                self.address,
                end_state.sqrt_price_x96
            );
            return Err(LiquidityPoolError::InsufficientLiquidity);
        }

        let amount_in = if zero_for_one { amount0 } else { amount1 };
        debug_assert!(amount_in >= I256::zero());
        Ok(amount_in.into_raw())
    }

    /// Quote a swap and report the would-be end state without touching the
    /// live pool.
    pub fn simulate_swap(
        &self,
        token_in: &Token,
        amount_in: U256,
        override_state: Option<&V3PoolState>,
    ) -> Result<V3SimulationResult, LiquidityPoolError> {
        let initial_state = match override_state {
            Some(state) => state.clone(),
            None => self.state(),
        };
        let zero_for_one = self.zero_for_one(token_in)?;
        let amount_specified =
            I256::try_from(amount_in).map_err(|_| ArithmeticError::Overflow)?;

        let (amount0_delta, amount1_delta, final_state) = self.swap(
            &initial_state,
            zero_for_one,
            amount_specified,
            Self::default_price_limit(zero_for_one),
        )?;

        Ok(V3SimulationResult {
            amount0_delta,
            amount1_delta,
            initial_state,
            final_state,
        })
    }
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct V3PoolRepr {
    address: Address,
    token0: Token,
    token1: Token,
    fee_pips: u32,
    tick_spacing: i32,
    sparse_bitmap: bool,
    state: V3PoolState,
    archive: BTreeMap<u64, V3PoolState>,
}

#[cfg(feature = "serde")]
impl Serialize for V3Pool {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = V3PoolRepr {
            address: self.address,
            token0: self.token0.clone(),
            token1: self.token1.clone(),
            fee_pips: self.fee_pips,
            tick_spacing: self.tick_spacing,
            sparse_bitmap: self.sparse_bitmap,
            state: self.state(),
            archive: self.archive.read().unwrap().clone(),
        };
        repr.serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for V3Pool {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = V3PoolRepr::deserialize(deserializer)?;
        Ok(Self {
            address: repr.address,
            token0: repr.token0,
            token1: repr.token1,
            fee_pips: repr.fee_pips,
            tick_spacing: repr.tick_spacing,
            sparse_bitmap: repr.sparse_bitmap,
            state: RwLock::new(repr.state),
            archive: RwLock::new(repr.archive),
            subscribers: SubscriberSet::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::fixed_point::Q96;

    fn addr(x: u8) -> Address {
        Address::from([x; 20])
    }

    /// Single liquidity range centered on tick 0, price 1.0.
    fn centered_pool(liquidity: u128, half_width: i32, spacing: i32) -> Arc<V3Pool> {
        let lower = -(half_width / spacing) * spacing;
        let upper = (half_width / spacing) * spacing;

        let mut ticks = BTreeMap::new();
        ticks.insert(
            lower,
            TickInfo {
                liquidity_net: liquidity as i128,
                liquidity_gross: liquidity,
                initialized: true,
            },
        );
        ticks.insert(
            upper,
            TickInfo {
                liquidity_net: -(liquidity as i128),
                liquidity_gross: liquidity,
                initialized: true,
            },
        );
        let tick_bitmap = build_tick_bitmap(&ticks, spacing).unwrap();

        V3Pool::new(
            addr(0xCC),
            Token::new(addr(1), 18, "WETH"),
            Token::new(addr(2), 6, "USDC"),
            3000,
            spacing,
            V3PoolState {
                sqrt_price_x96: U256::from(Q96),
                liquidity,
                tick: 0,
                tick_bitmap,
                ticks,
                block_number: 1,
            },
        )
    }

    const LIQ: u128 = 20_000_000_000_000_000_000_000;

    #[test]
    fn zero_input_is_rejected() {
        let pool = centered_pool(LIQ, 6000, 60);
        let token0 = pool.token0().clone();
        assert_eq!(
            pool.calculate_tokens_out_from_tokens_in(&token0, U256::zero(), None),
            Err(LiquidityPoolError::ZeroSwap)
        );
    }

    #[test]
    fn uninitialized_pool_is_rejected() {
        let pool = V3Pool::new(
            addr(0xCD),
            Token::new(addr(1), 18, "WETH"),
            Token::new(addr(2), 6, "USDC"),
            3000,
            60,
            V3PoolState::default(),
        );
        let token0 = pool.token0().clone();
        assert_eq!(
            pool.calculate_tokens_out_from_tokens_in(&token0, U256::from(1_000u64), None),
            Err(LiquidityPoolError::ZeroLiquidity)
        );
    }

    #[test]
    fn small_swap_near_spot_price() {
        let pool = centered_pool(LIQ, 6000, 60);
        let token0 = pool.token0().clone();

        // at price 1.0 with 0.3% fee, a small trade returns just under its input
        let amount_in = U256::from(1_000_000_000u64);
        let out = pool
            .calculate_tokens_out_from_tokens_in(&token0, amount_in, None)
            .unwrap();
        assert!(out < amount_in);
        let floor = amount_in * U256::from(99u64) / U256::from(100u64);
        assert!(out > floor, "out {out} below 99% of input");
    }

    #[test]
    fn output_is_monotone_and_concave_in_input() {
        let pool = centered_pool(LIQ, 6000, 60);
        let token0 = pool.token0().clone();

        let base = 50_000_000_000_000_000_000u128; // 50 units
        let out1 = pool
            .calculate_tokens_out_from_tokens_in(&token0, U256::from(base), None)
            .unwrap();
        let out2 = pool
            .calculate_tokens_out_from_tokens_in(&token0, U256::from(2 * base), None)
            .unwrap();
        let out3 = pool
            .calculate_tokens_out_from_tokens_in(&token0, U256::from(3 * base), None)
            .unwrap();

        assert!(out1 < out2 && out2 < out3);
        // concavity: marginal output decreases
        assert!(out2 - out1 <= out1);
        assert!(out3 - out2 <= out2 - out1);
    }

    #[test]
    fn walk_crosses_range_boundary_and_stops() {
        let pool = centered_pool(LIQ, 600, 60);
        let token0 = pool.token0().clone();

        // drain far beyond the single range; output is capped by range liquidity
        let huge = U256::from(10u128.pow(30));
        let out_huge = pool
            .calculate_tokens_out_from_tokens_in(&token0, huge, None)
            .unwrap();
        let out_huger = pool
            .calculate_tokens_out_from_tokens_in(&token0, huge * U256::from(2u64), None)
            .unwrap();
        assert_eq!(out_huge, out_huger);
        assert!(!out_huge.is_zero());

        let sim = pool.simulate_swap(&token0, huge, None).unwrap();
        // price left the range and liquidity dropped to zero
        assert_eq!(sim.final_state.liquidity, 0);
        assert!(sim.final_state.tick < -600);
    }

    #[test]
    fn exact_output_round_trips_with_exact_input() {
        let pool = centered_pool(LIQ, 6000, 60);
        let token0 = pool.token0().clone();

        let amount_in = U256::from(10_000_000_000_000_000_000u128);
        let out = pool
            .calculate_tokens_out_from_tokens_in(&token0, amount_in, None)
            .unwrap();
        let needed = pool
            .calculate_tokens_in_from_tokens_out(&token0, out, None)
            .unwrap();
        assert!(needed <= amount_in);
        // the two quotes differ only by per-division rounding
        assert!(amount_in - needed < U256::from(100u64));
    }

    #[test]
    fn exact_output_beyond_range_liquidity_fails() {
        let pool = centered_pool(LIQ, 600, 60);
        let token0 = pool.token0().clone();
        assert_eq!(
            pool.calculate_tokens_in_from_tokens_out(&token0, U256::from(10u128.pow(30)), None),
            Err(LiquidityPoolError::InsufficientLiquidity)
        );
    }

    #[test]
    fn simulation_does_not_touch_live_state() {
        let pool = centered_pool(LIQ, 6000, 60);
        let token1 = pool.token1().clone();
        let before = pool.state();

        let sim = pool
            .simulate_swap(&token1, U256::from(10u128.pow(21)), None)
            .unwrap();
        assert_eq!(pool.state(), before);
        assert!(sim.final_state.sqrt_price_x96 > before.sqrt_price_x96);
        assert!(sim.amount1_delta > I256::zero());
        assert!(sim.amount0_delta < I256::zero());
    }

    #[test]
    fn reorg_restores_archived_states() {
        let pool = centered_pool(LIQ, 6000, 60);
        let token0 = pool.token0().clone();
        let state_block1 = pool.state();

        let sim = pool
            .simulate_swap(&token0, U256::from(10u128.pow(20)), None)
            .unwrap();
        let mut advanced = sim.final_state.clone();
        advanced.block_number = 2;
        pool.external_update(advanced.clone()).unwrap();
        assert_eq!(pool.state(), advanced);

        let restored = pool.restore_state_before_block(2).unwrap();
        assert_eq!(restored, state_block1);
        assert_eq!(pool.state(), state_block1);

        assert_eq!(
            pool.restore_state_before_block(1),
            Err(LiquidityPoolError::NoPoolStateAvailable(1))
        );
    }
}
