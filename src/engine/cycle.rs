// Cyclic arbitrage solver.
// ------------------------
// An `ArbitrageCycle` holds an ordered loop of pools whose token pairs
// return to the input token, a precomputed swap vector per hop, and a cached
// snapshot of every pool's state. `calculate` is pure with respect to those
// snapshots (or explicit overrides), which is what makes fanning many cycles
// out across workers safe: pools are only written by their updaters, and the
// cycle's own caches sit behind mutexes held just long enough to copy.
//
// The search itself is a bounded scalar minimization of the negated profit.
// Pool failures inside the objective fold to zero output so the minimizer
// converges even when it probes sizes the path cannot absorb; the winning
// input is then re-validated through the exact integer path before anything
// is reported.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ethers::types::{Address, Bytes, I256, U256};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::optimizer::minimize_scalar_bounded;
use super::payload::{self, PoolSwapAmounts};
use super::pricing;
use crate::errors::ArbitrageError;
use crate::math::fixed_point::{f64_to_u256, u256_to_f64};
use crate::pool::{Pool, PoolSnapshot, Subscriber};
use crate::types::Token;

/// Direction of one hop along the cycle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapVector {
    pub token_in: Token,
    pub token_out: Token,
    pub zero_for_one: bool,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArbitrageCalculationResult {
    pub id: String,
    pub input_token: Token,
    pub profit_token: Token,
    pub input_amount: U256,
    pub profit_amount: I256,
    pub swap_amounts: Vec<PoolSwapAmounts>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
struct BestRecord {
    swap_amount: U256,
    profit_amount: I256,
    swap_amounts: Vec<PoolSwapAmounts>,
}

impl Default for BestRecord {
    fn default() -> Self {
        Self {
            swap_amount: U256::zero(),
            profit_amount: I256::zero(),
            swap_amounts: Vec::new(),
        }
    }
}

/// State override for one pool, keyed by pool address.
pub type StateOverride = (Address, PoolSnapshot);

const OPTIMIZER_XATOL: f64 = 1.0;
const OPTIMIZER_MAX_EVALUATIONS: u32 = 500;

pub struct ArbitrageCycle {
    id: String,
    input_token: Token,
    max_input: U256,
    pools: Vec<Pool>,
    swap_vectors: Vec<SwapVector>,
    pool_states: Mutex<HashMap<Address, PoolSnapshot>>,
    best: Mutex<BestRecord>,
}

impl ArbitrageCycle {
    /// Validate the pool loop, derive the per-hop swap vectors, capture the
    /// initial state snapshots, and subscribe to every pool.
    pub fn new(
        input_token: Token,
        pools: Vec<Pool>,
        id: impl Into<String>,
        max_input: Option<U256>,
    ) -> Result<Arc<Self>, ArbitrageError> {
        if pools.is_empty() {
            return Err(ArbitrageError::Config("cycle holds no pools".into()));
        }

        let swap_vectors = derive_swap_vectors(&input_token, &pools)?;

        let max_input = match max_input {
            Some(value) if value.is_zero() => {
                return Err(ArbitrageError::Config("max input of zero".into()));
            }
            Some(value) => value,
            None => {
                log::warn!("no maximum input provided, defaulting to 100 WETH");
                U256::from(100u64) * U256::from(10u64).pow(U256::from(18u64))
            }
        };

        let pool_states = pools
            .iter()
            .map(|pool| (pool.address(), pool.snapshot()))
            .collect();

        let cycle = Arc::new(Self {
            id: id.into(),
            input_token,
            max_input,
            pools,
            swap_vectors,
            pool_states: Mutex::new(pool_states),
            best: Mutex::new(BestRecord::default()),
        });
        cycle.resubscribe();
        Ok(cycle)
    }

    /// Attach this cycle to its pools' notification lists. Needed after
    /// deserialization, where subscriber registries come back empty.
    pub fn resubscribe(self: &Arc<Self>) {
        let subscriber: Arc<dyn Subscriber> = self.clone();
        for pool in &self.pools {
            pool.subscribe(&subscriber);
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn input_token(&self) -> &Token {
        &self.input_token
    }

    pub fn max_input(&self) -> U256 {
        self.max_input
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn swap_vectors(&self) -> &[SwapVector] {
        &self.swap_vectors
    }

    /// Pull-path refresh: re-snapshot every pool and report whether any
    /// cached state changed.
    pub fn auto_update(&self) -> bool {
        let mut found_updates = false;
        {
            let mut states = self.pool_states.lock().unwrap();
            for pool in &self.pools {
                let fresh = pool.snapshot();
                match states.get_mut(&pool.address()) {
                    Some(slot) if *slot != fresh => {
                        *slot = fresh;
                        found_updates = true;
                    }
                    Some(_) => {}
                    None => {
                        states.insert(pool.address(), fresh);
                        found_updates = true;
                    }
                }
            }
        }
        if found_updates {
            self.clear_best();
        }
        found_updates
    }

    fn clear_best(&self) {
        let mut best = self.best.lock().unwrap();
        *best = BestRecord::default();
    }

    fn sort_overrides(
        &self,
        overrides: &[StateOverride],
    ) -> Result<HashMap<Address, PoolSnapshot>, ArbitrageError> {
        let mut sorted = HashMap::with_capacity(overrides.len());
        for (address, snapshot) in overrides {
            let pool = self
                .pools
                .iter()
                .find(|pool| pool.address() == *address)
                .ok_or_else(|| {
                    ArbitrageError::Config(format!("override for unknown pool {address:?}"))
                })?;
            match (pool, snapshot) {
                (Pool::V2(_), PoolSnapshot::V2(_)) | (Pool::V3(_), PoolSnapshot::V3(_)) => {}
                _ => {
                    return Err(ArbitrageError::Config(format!(
                        "override kind does not match pool {address:?}"
                    )));
                }
            }
            sorted.insert(*address, snapshot.clone());
        }
        Ok(sorted)
    }

    /// The snapshots a calculation will read: explicit override first, the
    /// subscription cache otherwise. Taken in one short lock so the
    /// optimizer never touches shared state.
    fn effective_states(
        &self,
        overrides: &HashMap<Address, PoolSnapshot>,
    ) -> Vec<PoolSnapshot> {
        let cached = self.pool_states.lock().unwrap();
        self.pools
            .iter()
            .map(|pool| {
                overrides
                    .get(&pool.address())
                    .or_else(|| cached.get(&pool.address()))
                    .cloned()
                    .unwrap_or_else(|| pool.snapshot())
            })
            .collect()
    }

    fn pre_calculation_check(
        &self,
        overrides: &HashMap<Address, PoolSnapshot>,
    ) -> Result<(), ArbitrageError> {
        let states = self.effective_states(overrides);

        // net value of one input token across the whole loop; > 1 means the
        // spot prices leave room for profit after fees
        let mut profit_factor = 1.0_f64;
        for ((pool, vector), state) in self.pools.iter().zip(&self.swap_vectors).zip(&states) {
            profit_factor *= pricing::hop_factor(pool, state, vector.zero_for_one)?;
        }

        if profit_factor < 1.0 {
            return Err(ArbitrageError::NoProfit(profit_factor));
        }
        Ok(())
    }

    /// Cheap viability check: per-hop liquidity guards plus the spot-price
    /// product. Approval does not guarantee the optimizer finds profit.
    pub fn pre_check(&self, overrides: &[StateOverride]) -> Result<(), ArbitrageError> {
        let overrides = self.sort_overrides(overrides)?;
        self.pre_calculation_check(&overrides)
    }

    /// Composed output of pushing `amount` through the whole loop against
    /// fixed snapshots. Failures fold to zero so the scalar search keeps
    /// converging; the final candidate is re-validated exactly.
    fn composed_output(&self, amount: U256, states: &[PoolSnapshot]) -> U256 {
        let mut leg_amount = amount;
        for ((pool, vector), state) in self.pools.iter().zip(&self.swap_vectors).zip(states) {
            match pool.calculate_tokens_out_from_tokens_in(&vector.token_in, leg_amount, Some(state))
            {
                Ok(amount_out) => leg_amount = amount_out,
                Err(e) => {
                    log::debug!(
                        "objective fold: pool {:?} rejected {} in: {}",
                        pool.address(),
                        leg_amount,
                        e
                    );
                    return U256::zero();
                }
            }
        }
        leg_amount
    }

    fn _calculate(
        &self,
        overrides: &HashMap<Address, PoolSnapshot>,
    ) -> Result<ArbitrageCalculationResult, ArbitrageError> {
        self.pre_calculation_check(overrides)?;

        let states = self.effective_states(overrides);
        let bounds = (1.0, u256_to_f64(self.max_input));

        let objective = |x: f64| {
            let amount = f64_to_u256(x);
            let out = self.composed_output(amount, &states);
            // negated profit: the minimizer settles on the best input
            -(u256_to_f64(out) - u256_to_f64(amount))
        };

        let opt = minimize_scalar_bounded(
            objective,
            bounds,
            OPTIMIZER_XATOL,
            OPTIMIZER_MAX_EVALUATIONS,
        );
        let swap_amount = f64_to_u256(opt.x).max(U256::one()).min(self.max_input);
        log::debug!(
            "cycle {}: optimizer settled on {} after {} evaluations",
            self.id,
            swap_amount,
            opt.evaluations
        );

        // re-validate through the exact integer path
        let (swap_amounts, final_out) =
            payload::build_swap_amounts(&self.pools, &self.swap_vectors, &states, swap_amount)?;

        let out_signed = I256::try_from(final_out)
            .map_err(|_| ArbitrageError::NoArbitrage("output exceeds signed range".into()))?;
        let in_signed = I256::try_from(swap_amount)
            .map_err(|_| ArbitrageError::NoArbitrage("input exceeds signed range".into()))?;
        let profit_amount = out_signed - in_signed;

        Ok(ArbitrageCalculationResult {
            id: self.id.clone(),
            input_token: self.input_token.clone(),
            profit_token: self.input_token.clone(),
            input_amount: swap_amount,
            profit_amount,
            swap_amounts,
        })
    }

    fn enforce_profitability(
        result: ArbitrageCalculationResult,
    ) -> Result<ArbitrageCalculationResult, ArbitrageError> {
        if result.profit_amount <= I256::zero() {
            return Err(ArbitrageError::NoArbitrage(format!(
                "best profit {} at input {}",
                result.profit_amount, result.input_amount
            )));
        }
        Ok(result)
    }

    /// Stateless calculation against the cached snapshots, with optional
    /// per-pool overrides. A converged-but-worthless search reports
    /// `NoArbitrage`.
    pub fn calculate(
        &self,
        overrides: &[StateOverride],
    ) -> Result<ArbitrageCalculationResult, ArbitrageError> {
        let overrides = self.sort_overrides(overrides)?;
        Self::enforce_profitability(self._calculate(&overrides)?)
    }

    /// Run the calculation and retain the outcome for payload generation.
    /// Returns the profitability verdict with the sized amounts.
    pub fn calculate_arbitrage(
        &self,
        overrides: &[StateOverride],
    ) -> Result<(bool, (U256, I256)), ArbitrageError> {
        let sorted = self.sort_overrides(overrides)?;
        let result = self._calculate(&sorted)?;

        if overrides.is_empty() {
            let mut best = self.best.lock().unwrap();
            best.swap_amount = result.input_amount;
            best.profit_amount = result.profit_amount;
            best.swap_amounts = result.swap_amounts.clone();
        }

        let profitable = result.profit_amount > I256::zero();
        Ok((profitable, (result.input_amount, result.profit_amount)))
    }

    /// Dispatch the pure calculation to the blocking pool and await it.
    /// Refused for cycles holding sparse-bitmap V3 pools: their bitmap
    /// backfill needs an RPC handle that does not travel to workers.
    pub async fn calculate_async(
        self: &Arc<Self>,
        overrides: Vec<StateOverride>,
    ) -> Result<ArbitrageCalculationResult, ArbitrageError> {
        if self.pools.iter().any(|pool| pool.is_sparse_v3()) {
            return Err(ArbitrageError::SparseBitmapNotPortable);
        }

        let overrides = self.sort_overrides(&overrides)?;
        self.pre_calculation_check(&overrides)?;

        let cycle = Arc::clone(self);
        let result = tokio::task::spawn_blocking(move || cycle._calculate(&overrides))
            .await
            .map_err(|e| ArbitrageError::TaskFailed(e.to_string()))??;
        Self::enforce_profitability(result)
    }

    /// Build the executable call plan for the current best (or explicitly
    /// supplied) swap amounts.
    pub fn generate_swap_plan(
        &self,
        from_address: Address,
        swap_amount: Option<U256>,
        pool_swap_amounts: Option<Vec<PoolSwapAmounts>>,
    ) -> Result<Vec<(Address, Bytes, U256)>, ArbitrageError> {
        let best = self.best.lock().unwrap().clone();
        let amount = swap_amount.unwrap_or(best.swap_amount);
        let amounts = match pool_swap_amounts {
            Some(amounts) => amounts,
            None => best.swap_amounts,
        };

        // a concurrent pool update may have cleared the stored best between
        // the calculation and this call; abandon rather than encode garbage
        if amounts.is_empty() {
            return Err(ArbitrageError::NoArbitrage(
                "swap amounts empty, abandoning payload generation".into(),
            ));
        }

        payload::encode_swap_plan(
            &self.pools,
            self.input_token.address,
            from_address,
            amount,
            &amounts,
        )
    }
}

/// Evaluate many independent cycles concurrently. Each calculation is pure
/// with respect to its own snapshots, so the fan-out needs no coordination
/// beyond collecting the results.
pub async fn calculate_all(
    cycles: &[Arc<ArbitrageCycle>],
) -> Vec<Result<ArbitrageCalculationResult, ArbitrageError>> {
    let calculations = cycles
        .iter()
        .map(|cycle| cycle.calculate_async(Vec::new()));
    futures::future::join_all(calculations).await
}

impl Subscriber for ArbitrageCycle {
    fn notify_pool_update(&self, pool: Address, state: &PoolSnapshot) {
        let changed = {
            let mut states = self.pool_states.lock().unwrap();
            match states.get_mut(&pool) {
                Some(slot) if slot != state => {
                    *slot = state.clone();
                    true
                }
                _ => false,
            }
        };
        if changed {
            log::debug!("cycle {}: pool {:?} state changed", self.id, pool);
            self.clear_best();
        }
    }
}

fn derive_swap_vectors(
    input_token: &Token,
    pools: &[Pool],
) -> Result<Vec<SwapVector>, ArbitrageError> {
    let mut vectors = Vec::with_capacity(pools.len());
    let mut current = input_token.clone();

    for pool in pools {
        let vector = if current == *pool.token0() {
            SwapVector {
                token_in: pool.token0().clone(),
                token_out: pool.token1().clone(),
                zero_for_one: true,
            }
        } else if current == *pool.token1() {
            SwapVector {
                token_in: pool.token1().clone(),
                token_out: pool.token0().clone(),
                zero_for_one: false,
            }
        } else {
            return Err(ArbitrageError::Config(format!(
                "pool {:?} does not trade {}",
                pool.address(),
                current
            )));
        };
        current = vector.token_out.clone();
        vectors.push(vector);
    }

    if current != *input_token {
        return Err(ArbitrageError::Config(format!(
            "path ends in {} instead of the input token {}",
            current, input_token
        )));
    }
    Ok(vectors)
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct CycleRepr {
    id: String,
    input_token: Token,
    max_input: U256,
    pools: Vec<Pool>,
    swap_vectors: Vec<SwapVector>,
    pool_states: std::collections::BTreeMap<Address, PoolSnapshot>,
    best: BestRecord,
}

// Mutexes and subscriber handles do not travel; the receiving side gets the
// caches verbatim and reconstructs the plumbing empty.
#[cfg(feature = "serde")]
impl Serialize for ArbitrageCycle {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = CycleRepr {
            id: self.id.clone(),
            input_token: self.input_token.clone(),
            max_input: self.max_input,
            pools: self.pools.clone(),
            swap_vectors: self.swap_vectors.clone(),
            pool_states: self
                .pool_states
                .lock()
                .unwrap()
                .iter()
                .map(|(address, state)| (*address, state.clone()))
                .collect(),
            best: self.best.lock().unwrap().clone(),
        };
        repr.serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for ArbitrageCycle {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = CycleRepr::deserialize(deserializer)?;
        Ok(Self {
            id: repr.id,
            input_token: repr.input_token,
            max_input: repr.max_input,
            pools: repr.pools,
            swap_vectors: repr.swap_vectors,
            pool_states: Mutex::new(repr.pool_states.into_iter().collect()),
            best: Mutex::new(repr.best),
        })
    }
}
