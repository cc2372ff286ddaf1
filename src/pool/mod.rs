// Pool variants and the state-change notification plumbing.
//
// Pools are shared between cycles through `Arc` handles. Mutation goes
// through the owning updater only; readers take immutable snapshots.
// Subscribers are held weakly so a dropped cycle never keeps a pool alive
// and vice versa.

pub mod v2;
pub mod v3;

use std::sync::{Arc, Mutex, Weak};

use ethers::types::{Address, U256};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::LiquidityPoolError;
use crate::types::Token;

pub use v2::{V2Pool, V2PoolState, V2SimulationResult};
pub use v3::{TickInfo, V3Pool, V3PoolState, V3SimulationResult};

/// Observer of pool state changes. Implemented by cycles; the pool pushes
/// the committed snapshot so the observer never has to read back under the
/// publisher's lock.
pub trait Subscriber: Send + Sync {
    fn notify_pool_update(&self, pool: Address, state: &PoolSnapshot);
}

/// Immutable copy of a pool's mutable state.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolSnapshot {
    V2(V2PoolState),
    V3(V3PoolState),
}

impl PoolSnapshot {
    pub fn block_number(&self) -> u64 {
        match self {
            PoolSnapshot::V2(state) => state.block_number,
            PoolSnapshot::V3(state) => state.block_number,
        }
    }
}

/// Weakly-held subscriber registry shared by both pool kinds.
pub(crate) struct SubscriberSet {
    inner: Mutex<Vec<Weak<dyn Subscriber>>>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, subscriber: &Arc<dyn Subscriber>) {
        let mut subscribers = self.inner.lock().unwrap();
        if !subscribers
            .iter()
            .any(|existing| existing.as_ptr() == Arc::as_ptr(subscriber))
        {
            subscribers.push(Arc::downgrade(subscriber));
        }
    }

    pub fn unsubscribe(&self, subscriber: &Arc<dyn Subscriber>) {
        self.inner
            .lock()
            .unwrap()
            .retain(|existing| existing.as_ptr() != Arc::as_ptr(subscriber));
    }

    /// Fan the snapshot out to live subscribers, pruning dead ones.
    pub fn notify(&self, pool: Address, snapshot: &PoolSnapshot) {
        let subscribers: Vec<Weak<dyn Subscriber>> = {
            let mut guard = self.inner.lock().unwrap();
            guard.retain(|subscriber| subscriber.strong_count() > 0);
            guard.clone()
        };
        for subscriber in subscribers {
            if let Some(live) = subscriber.upgrade() {
                live.notify_pool_update(pool, snapshot);
            }
        }
    }
}

/// A swap pool of any supported variant. The cycle dispatches by tag and
/// only relies on the shared quoting operations.
#[derive(Clone)]
pub enum Pool {
    V2(Arc<V2Pool>),
    V3(Arc<V3Pool>),
}

impl Pool {
    pub fn address(&self) -> Address {
        match self {
            Pool::V2(pool) => pool.address(),
            Pool::V3(pool) => pool.address(),
        }
    }

    pub fn token0(&self) -> &Token {
        match self {
            Pool::V2(pool) => pool.token0(),
            Pool::V3(pool) => pool.token0(),
        }
    }

    pub fn token1(&self) -> &Token {
        match self {
            Pool::V2(pool) => pool.token1(),
            Pool::V3(pool) => pool.token1(),
        }
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        match self {
            Pool::V2(pool) => PoolSnapshot::V2(pool.state()),
            Pool::V3(pool) => PoolSnapshot::V3(pool.state()),
        }
    }

    pub fn subscribe(&self, subscriber: &Arc<dyn Subscriber>) {
        match self {
            Pool::V2(pool) => pool.subscribe(subscriber),
            Pool::V3(pool) => pool.subscribe(subscriber),
        }
    }

    pub fn unsubscribe(&self, subscriber: &Arc<dyn Subscriber>) {
        match self {
            Pool::V2(pool) => pool.unsubscribe(subscriber),
            Pool::V3(pool) => pool.unsubscribe(subscriber),
        }
    }

    pub fn calculate_tokens_out_from_tokens_in(
        &self,
        token_in: &Token,
        amount_in: U256,
        override_state: Option<&PoolSnapshot>,
    ) -> Result<U256, LiquidityPoolError> {
        match self {
            Pool::V2(pool) => {
                let state = Self::v2_override(override_state)?;
                pool.calculate_tokens_out_from_tokens_in(token_in, amount_in, state)
            }
            Pool::V3(pool) => {
                let state = Self::v3_override(override_state)?;
                pool.calculate_tokens_out_from_tokens_in(token_in, amount_in, state)
            }
        }
    }

    pub fn calculate_tokens_in_from_tokens_out(
        &self,
        token_in: &Token,
        amount_out: U256,
        override_state: Option<&PoolSnapshot>,
    ) -> Result<U256, LiquidityPoolError> {
        match self {
            Pool::V2(pool) => {
                let state = Self::v2_override(override_state)?;
                pool.calculate_tokens_in_from_tokens_out(token_in, amount_out, state)
            }
            Pool::V3(pool) => {
                let state = Self::v3_override(override_state)?;
                pool.calculate_tokens_in_from_tokens_out(token_in, amount_out, state)
            }
        }
    }

    pub(crate) fn is_sparse_v3(&self) -> bool {
        match self {
            Pool::V2(_) => false,
            Pool::V3(pool) => pool.sparse_bitmap(),
        }
    }

    fn v2_override(
        snapshot: Option<&PoolSnapshot>,
    ) -> Result<Option<&V2PoolState>, LiquidityPoolError> {
        match snapshot {
            None => Ok(None),
            Some(PoolSnapshot::V2(state)) => Ok(Some(state)),
            Some(PoolSnapshot::V3(_)) => Err(LiquidityPoolError::StateMismatch),
        }
    }

    fn v3_override(
        snapshot: Option<&PoolSnapshot>,
    ) -> Result<Option<&V3PoolState>, LiquidityPoolError> {
        match snapshot {
            None => Ok(None),
            Some(PoolSnapshot::V3(state)) => Ok(Some(state)),
            Some(PoolSnapshot::V2(_)) => Err(LiquidityPoolError::StateMismatch),
        }
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pool::V2(pool) => write!(f, "V2Pool({:?})", pool.address()),
            Pool::V3(pool) => write!(f, "V3Pool({:?})", pool.address()),
        }
    }
}

// Pools serialize by value; the subscriber registries are not shareable and
// come back empty on the receiving side.
#[cfg(feature = "serde")]
impl Serialize for Pool {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        enum Repr<'a> {
            V2(&'a V2Pool),
            V3(&'a V3Pool),
        }
        let repr = match self {
            Pool::V2(pool) => Repr::V2(pool.as_ref()),
            Pool::V3(pool) => Repr::V3(pool.as_ref()),
        };
        repr.serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Pool {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        enum Repr {
            V2(V2Pool),
            V3(V3Pool),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::V2(pool) => Pool::V2(Arc::new(pool)),
            Repr::V3(pool) => Pool::V3(Arc::new(pool)),
        })
    }
}
