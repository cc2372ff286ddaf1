// lib.rs - Library exports

pub mod engine;
pub mod errors;
pub mod math;
pub mod pool;
pub mod types;

pub use engine::cycle::{
    calculate_all, ArbitrageCalculationResult, ArbitrageCycle, StateOverride, SwapVector,
};
pub use engine::payload::PoolSwapAmounts;
pub use errors::{ArbitrageError, ArithmeticError, LiquidityPoolError};
pub use pool::{Pool, PoolSnapshot, Subscriber, TickInfo, V2Pool, V2PoolState, V3Pool, V3PoolState};
pub use types::{Fraction, Token};
