// Shared domain types: tokens and fee fractions.
//
// Tokens are identified by their 20-byte address; decimals and symbol are
// carried for reporting only and never participate in comparisons.

use std::fmt;
use std::hash::{Hash, Hasher};

use ethers::types::Address;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct Token {
    pub address: Address,
    pub decimals: u8,
    pub symbol: String,
}

impl Token {
    pub fn new(address: Address, decimals: u8, symbol: impl Into<String>) -> Self {
        Self {
            address,
            decimals,
            symbol: symbol.into(),
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// Swap fee as an exact fraction of the input amount.
///
/// V2-style pools quote fees as e.g. 3/1000; V3-style pools quote in
/// hundredths of a bip (pips) and convert through [`Fraction::from_pips`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Fraction {
    pub numerator: u32,
    pub denominator: u32,
}

impl Fraction {
    /// The common 0.30% constant-product fee.
    pub const DEFAULT_V2: Fraction = Fraction {
        numerator: 3,
        denominator: 1000,
    };

    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub const fn from_pips(fee_pips: u32) -> Self {
        Self {
            numerator: fee_pips,
            denominator: 1_000_000,
        }
    }

    /// Fraction of the input kept after the fee, as a float for the
    /// estimator layer. Exact math stays in integer space.
    pub fn retained(&self) -> f64 {
        (self.denominator - self.numerator) as f64 / self.denominator as f64
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}
