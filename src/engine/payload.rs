// Per-hop swap amounts and the on-chain call plan.
// -------------------------------------------------
// `build_swap_amounts` re-runs the composed swap exactly once at the chosen
// input, materializing the records an executor contract needs.
// `encode_swap_plan` turns those records into raw calldata: V2 pools take a
// pre-swap token transfer and chain their output straight into the next V2
// pool, V3 pools pull their input through the swap callback so the executor
// keeps custody.

use ethers::abi::{encode, Token as AbiToken};
use ethers::types::{Address, Bytes, I256, U256};
use ethers::utils::keccak256;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::cycle::SwapVector;
use crate::errors::ArbitrageError;
use crate::math::tick::{MAX_SQRT_RATIO, MIN_SQRT_RATIO};
use crate::pool::{Pool, PoolSnapshot};

/// Arguments for one hop of the executed path.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolSwapAmounts {
    V2 {
        /// `(amount0_out, amount1_out)` — exactly one side is non-zero.
        amounts: (U256, U256),
    },
    V3 {
        /// Positive: exact input.
        amount_specified: I256,
        zero_for_one: bool,
        sqrt_price_limit_x96: U256,
    },
}

/// Push `token_in_quantity` through every hop, recording the swap arguments
/// per pool. `states` is the per-pool snapshot vector the calculation ran
/// against. Returns the records and the final output amount.
pub(crate) fn build_swap_amounts(
    pools: &[Pool],
    vectors: &[SwapVector],
    states: &[PoolSnapshot],
    token_in_quantity: U256,
) -> Result<(Vec<PoolSwapAmounts>, U256), ArbitrageError> {
    let mut amounts = Vec::with_capacity(pools.len());
    let mut leg_amount = token_in_quantity;

    for ((pool, vector), state) in pools.iter().zip(vectors).zip(states) {
        let amount_out = pool
            .calculate_tokens_out_from_tokens_in(&vector.token_in, leg_amount, Some(state))
            .map_err(|e| ArbitrageError::NoArbitrage(e.to_string()))?;
        if amount_out.is_zero() {
            return Err(ArbitrageError::ZeroOutputHop(pool.address()));
        }

        match pool {
            Pool::V2(_) => {
                amounts.push(PoolSwapAmounts::V2 {
                    amounts: if vector.zero_for_one {
                        (U256::zero(), amount_out)
                    } else {
                        (amount_out, U256::zero())
                    },
                });
            }
            Pool::V3(_) => {
                amounts.push(PoolSwapAmounts::V3 {
                    amount_specified: I256::from_raw(leg_amount),
                    zero_for_one: vector.zero_for_one,
                    sqrt_price_limit_x96: if vector.zero_for_one {
                        MIN_SQRT_RATIO + U256::one()
                    } else {
                        MAX_SQRT_RATIO - U256::one()
                    },
                });
            }
        }
        leg_amount = amount_out;
    }

    Ok((amounts, leg_amount))
}

fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn calldata(signature: &str, args: &[AbiToken]) -> Bytes {
    let mut data = selector(signature).to_vec();
    data.extend(encode(args));
    Bytes::from(data)
}

/// Encode the executable call plan: `(target, calldata, value)` per call.
pub(crate) fn encode_swap_plan(
    pools: &[Pool],
    input_token_address: Address,
    from_address: Address,
    swap_amount: U256,
    amounts: &[PoolSwapAmounts],
) -> Result<Vec<(Address, Bytes, U256)>, ArbitrageError> {
    if amounts.len() != pools.len() {
        return Err(ArbitrageError::Config(
            "swap amounts do not line up with the pool path".into(),
        ));
    }

    let mut payloads = Vec::new();
    let msg_value = U256::zero();

    // V2 pools require their input before `swap`; fund the first hop from
    // the executor's balance
    if let Some(Pool::V2(first)) = pools.first() {
        payloads.push((
            input_token_address,
            calldata(
                "transfer(address,uint256)",
                &[
                    AbiToken::Address(first.address()),
                    AbiToken::Uint(swap_amount),
                ],
            ),
            msg_value,
        ));
    }

    for (i, (pool, hop)) in pools.iter().zip(amounts).enumerate() {
        let next_pool = pools.get(i + 1);
        // V2 output can be sent straight to the next V2 pool; everything
        // else returns to the executor for custody
        let destination = match next_pool {
            Some(Pool::V2(next)) => next.address(),
            _ => from_address,
        };

        match (pool, hop) {
            (Pool::V2(pool), PoolSwapAmounts::V2 { amounts }) => {
                log::debug!(
                    "plan: V2 swap at {:?} amounts ({}, {}) -> {:?}",
                    pool.address(),
                    amounts.0,
                    amounts.1,
                    destination
                );
                payloads.push((
                    pool.address(),
                    calldata(
                        "swap(uint256,uint256,address,bytes)",
                        &[
                            AbiToken::Uint(amounts.0),
                            AbiToken::Uint(amounts.1),
                            AbiToken::Address(destination),
                            AbiToken::Bytes(Vec::new()),
                        ],
                    ),
                    msg_value,
                ));
            }
            (Pool::V3(pool), PoolSwapAmounts::V3 {
                amount_specified,
                zero_for_one,
                sqrt_price_limit_x96,
            }) => {
                log::debug!(
                    "plan: V3 swap at {:?} amount {} zero_for_one {}",
                    pool.address(),
                    amount_specified,
                    zero_for_one
                );
                payloads.push((
                    pool.address(),
                    calldata(
                        "swap(address,bool,int256,uint160,bytes)",
                        &[
                            AbiToken::Address(from_address),
                            AbiToken::Bool(*zero_for_one),
                            AbiToken::Int(amount_specified.into_raw()),
                            AbiToken::Uint(*sqrt_price_limit_x96),
                            AbiToken::Bytes(Vec::new()),
                        ],
                    ),
                    msg_value,
                ));
            }
            _ => {
                return Err(ArbitrageError::Config(
                    "swap amount kind does not match pool kind".into(),
                ));
            }
        }
    }

    Ok(payloads)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_match_known_signatures() {
        // canonical 4-byte ids of the pool interfaces
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(
            selector("swap(uint256,uint256,address,bytes)"),
            [0x02, 0x2c, 0x0d, 0x9f]
        );
        assert_eq!(
            selector("swap(address,bool,int256,uint160,bytes)"),
            [0x12, 0x8a, 0xcb, 0x08]
        );
    }

    #[test]
    fn calldata_layout_starts_with_selector() {
        let data = calldata(
            "transfer(address,uint256)",
            &[
                AbiToken::Address(Address::zero()),
                AbiToken::Uint(U256::from(42u64)),
            ],
        );
        assert_eq!(&data[..4], [0xa9u8, 0x05, 0x9c, 0xbb]);
        // two 32-byte words follow the selector
        assert_eq!(data.len(), 4 + 64);
    }
}
