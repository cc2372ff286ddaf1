// Error taxonomy for the solver.
//
// Propagation policy: configuration and contract-shape errors surface
// immediately; numeric errors inside the optimizer's search loop are folded
// to zero output by the caller; numeric errors at re-validation surface as
// `NoArbitrage`.

use ethers::types::Address;
use thiserror::Error;

/// Failures from the fixed-point math layer. These correspond to the places
/// the on-chain libraries would revert.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("mul-div denominator is zero")]
    DivisionByZero,

    #[error("result does not fit in 256 bits")]
    Overflow,

    #[error("sqrt price outside the representable range")]
    PriceBound,

    #[error("tick outside the permitted range")]
    TickBound,

    #[error("liquidity delta overflows the active liquidity")]
    LiquidityUnderflow,
}

/// Failures raised by individual pools when asked to quote a swap.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LiquidityPoolError {
    #[error("zero-amount swap requested")]
    ZeroSwap,

    #[error("pool cannot execute a swap in the requested direction")]
    ZeroLiquidity,

    #[error("requested output exceeds the available reserves")]
    InsufficientLiquidity,

    #[error("token {0} does not belong to this pool")]
    UnknownToken(Address),

    #[error("override state kind does not match the pool kind")]
    StateMismatch,

    #[error("update for block {update} is behind pool state at block {state}")]
    LateUpdate { update: u64, state: u64 },

    #[error("no pool state recorded before block {0}")]
    NoPoolStateAvailable(u64),

    #[error("swap math reverted: {0}")]
    Arithmetic(#[from] ArithmeticError),
}

/// Failures surfaced by the cycle solver.
#[derive(Debug, Error)]
pub enum ArbitrageError {
    #[error("invalid cycle configuration: {0}")]
    Config(String),

    #[error("no profitable arbitrage at current prices (profit factor {0:.6})")]
    NoProfit(f64),

    #[error("no possible arbitrage: {0}")]
    NoArbitrage(String),

    #[error("zero-output swap through pool {0}")]
    ZeroOutputHop(Address),

    #[error("cycle holds a sparse-bitmap V3 pool and cannot be dispatched to a worker")]
    SparseBitmapNotPortable,

    #[error("background task failed: {0}")]
    TaskFailed(String),

    #[error(transparent)]
    Pool(#[from] LiquidityPoolError),
}
