// Tick math and the initialized-tick bitmap.
// -------------------------------------------
// `get_sqrt_ratio_at_tick` is the canonical magic-constant ladder (Q128.128
// product, round-up shift to Q64.96). The inverse is an exact binary search
// over the forward function, which satisfies the contract
// `ratio_at(t) <= p < ratio_at(t + 1)` on the whole tick range.

use std::collections::BTreeMap;

use ethers::types::U256;
use num_bigint::BigUint;
use num_traits::One;

use crate::errors::ArithmeticError;

pub const MIN_TICK: i32 = -887_272;
pub const MAX_TICK: i32 = 887_272;

/// `get_sqrt_ratio_at_tick(MIN_TICK)`
pub const MIN_SQRT_RATIO: U256 = U256([4_295_128_739, 0, 0, 0]);
/// `get_sqrt_ratio_at_tick(MAX_TICK)`:
/// 1461446703485210103287273052203988822378723970342
pub const MAX_SQRT_RATIO: U256 = U256([
    0x5D95_1D52_6398_8D26,
    0xEFD1_FC6A_5064_8849,
    0x0000_0000_FFFD_8963,
    0,
]);

// One multiplier per bit of |tick|, bit 1 upward. Bit 0 seeds the ratio.
const SEED_RATIO: &[u8] = b"fffcb933bd6fad37aa2d162d1a594001";
const RATIO_MULTIPLIERS: [&[u8]; 19] = [
    b"fff97272373d413259a46990580e213a",
    b"fff2e50f5f656932ef12357cf3c7fdcc",
    b"ffe5caca7e10e4e61c3624eaa0941cd0",
    b"ffcb9843d60f6159c9db58835c926644",
    b"ff973b41fa98c081472e6896dfb254c0",
    b"ff2ea16466c96a3843ec78b326b52861",
    b"fe5dee046a99a2a811c461f1969c3053",
    b"fcbe86c7900a88aedcffc83b479aa3a4",
    b"f987a7253ac413176f2b074cf7815e54",
    b"f3392b0822b70005940c7a398e4b70f3",
    b"e7159475a2c29b7443b29c7fa6e889d9",
    b"d097f3bdfd2022b8845ad8f792aa5825",
    b"a9f746462d870fdf8a65dc1f90e061e5",
    b"70d869a156d2a1b890bb3df62baf32f7",
    b"31be135f97d08fd981231505542fcfa6",
    b"9aa508b5b7a84e1c677de54f3e99bc9",
    b"5d6af8dedb81196699c329225ee604",
    b"2216e584f5fa1ea926041bedfe98",
    b"48a170391f7dc42444e8fa2",
];

fn parse_ratio(hex: &[u8]) -> BigUint {
    BigUint::parse_bytes(hex, 16).expect("bad ratio constant")
}

/// Q64.96 sqrt price for `tick`, bit-exact against the reference library.
pub fn get_sqrt_ratio_at_tick(tick: i32) -> Result<U256, ArithmeticError> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(ArithmeticError::TickBound);
    }
    let abs_tick = tick.unsigned_abs();

    let mut ratio = if abs_tick & 0x1 != 0 {
        parse_ratio(SEED_RATIO)
    } else {
        BigUint::one() << 128
    };

    for (i, multiplier) in RATIO_MULTIPLIERS.iter().enumerate() {
        if abs_tick & (1 << (i + 1)) != 0 {
            ratio = (ratio * parse_ratio(multiplier)) >> 128;
        }
    }

    if tick > 0 {
        let max = (BigUint::one() << 256usize) - BigUint::one();
        ratio = max / ratio;
    }

    // Q128.128 -> Q64.96, rounding up
    let rounded = (ratio + ((BigUint::one() << 32) - BigUint::one())) >> 32;
    super::fixed_point::from_big(&rounded)
}

/// Largest tick whose sqrt ratio is `<= sqrt_price_x96`. The input must lie
/// in `[MIN_SQRT_RATIO, MAX_SQRT_RATIO)`.
pub fn get_tick_at_sqrt_ratio(sqrt_price_x96: U256) -> Result<i32, ArithmeticError> {
    if sqrt_price_x96 < MIN_SQRT_RATIO || sqrt_price_x96 >= MAX_SQRT_RATIO {
        return Err(ArithmeticError::PriceBound);
    }
    let mut lo = MIN_TICK;
    let mut hi = MAX_TICK;
    while lo < hi {
        let mid = lo + (hi - lo + 1) / 2;
        if get_sqrt_ratio_at_tick(mid)? <= sqrt_price_x96 {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    Ok(lo)
}

// -------------------------------- Tick bitmap --------------------------------

/// Word and bit holding the initialized flag for a compressed tick.
#[inline]
pub fn position(compressed: i32) -> (i16, u8) {
    ((compressed >> 8) as i16, (compressed & 0xff) as u8)
}

/// Toggle the initialized bit for `tick`. The tick must sit on the spacing
/// grid.
pub fn flip_tick(
    bitmap: &mut BTreeMap<i16, U256>,
    tick: i32,
    tick_spacing: i32,
) -> Result<(), ArithmeticError> {
    if tick % tick_spacing != 0 {
        return Err(ArithmeticError::TickBound);
    }
    let (word_pos, bit_pos) = position(tick / tick_spacing);
    let mask = U256::one() << (bit_pos as usize);
    let word = bitmap.entry(word_pos).or_insert_with(U256::zero);
    *word ^= mask;
    if word.is_zero() {
        bitmap.remove(&word_pos);
    }
    Ok(())
}

/// Scan the word containing `tick` for the next initialized tick.
///
/// `lte = true` searches at-or-below (the `zero_for_one` direction), `false`
/// searches strictly above. When the word holds no initialized bit in the
/// requested direction, the word boundary is returned with
/// `initialized = false` so the caller continues into the next word. Words
/// absent from the map read as empty.
pub fn next_initialized_tick_within_one_word(
    bitmap: &BTreeMap<i16, U256>,
    tick: i32,
    tick_spacing: i32,
    lte: bool,
) -> (i32, bool) {
    let mut compressed = tick / tick_spacing;
    if tick < 0 && tick % tick_spacing != 0 {
        compressed -= 1; // round toward negative infinity
    }

    if lte {
        let (word_pos, bit_pos) = position(compressed);
        // all bits at or below bit_pos
        let mask = (U256::one() << (bit_pos as usize)) - 1 + (U256::one() << (bit_pos as usize));
        let masked = bitmap.get(&word_pos).copied().unwrap_or_default() & mask;
        let initialized = !masked.is_zero();

        let next = if initialized {
            let msb = 255 - masked.leading_zeros() as i32;
            (compressed - (bit_pos as i32 - msb)) * tick_spacing
        } else {
            (compressed - bit_pos as i32) * tick_spacing
        };
        (next, initialized)
    } else {
        let (word_pos, bit_pos) = position(compressed + 1);
        // all bits at or above bit_pos
        let mask = !((U256::one() << (bit_pos as usize)) - 1);
        let masked = bitmap.get(&word_pos).copied().unwrap_or_default() & mask;
        let initialized = !masked.is_zero();

        let next = if initialized {
            let lsb = masked.trailing_zeros() as i32;
            (compressed + 1 + (lsb - bit_pos as i32)) * tick_spacing
        } else {
            (compressed + 1 + (255 - bit_pos as i32)) * tick_spacing
        };
        (next, initialized)
    }
}

// ---------------------------------- Tests ------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqrt_ratio_at_bound_ticks() {
        assert_eq!(get_sqrt_ratio_at_tick(MIN_TICK).unwrap(), MIN_SQRT_RATIO);
        assert_eq!(get_sqrt_ratio_at_tick(MAX_TICK).unwrap(), MAX_SQRT_RATIO);
        assert_eq!(
            get_sqrt_ratio_at_tick(0).unwrap(),
            U256::from(crate::math::fixed_point::Q96)
        );
    }

    #[test]
    fn sqrt_ratio_rejects_out_of_range_tick() {
        assert_eq!(
            get_sqrt_ratio_at_tick(MIN_TICK - 1),
            Err(ArithmeticError::TickBound)
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(MAX_TICK + 1),
            Err(ArithmeticError::TickBound)
        );
    }

    #[test]
    fn sqrt_ratio_is_strictly_increasing() {
        let mut previous = U256::zero();
        for tick in (MIN_TICK..=MAX_TICK).step_by(50_000) {
            let ratio = get_sqrt_ratio_at_tick(tick).unwrap();
            assert!(ratio > previous, "tick {tick}");
            previous = ratio;
        }
    }

    #[test]
    fn tick_round_trips_through_sqrt_ratio() {
        for tick in [
            MIN_TICK,
            -500_000,
            -887,
            -1,
            0,
            1,
            887,
            123_456,
            500_000,
            MAX_TICK - 1,
        ] {
            let ratio = get_sqrt_ratio_at_tick(tick).unwrap();
            assert_eq!(get_tick_at_sqrt_ratio(ratio).unwrap(), tick, "tick {tick}");
        }
    }

    #[test]
    fn tick_at_ratio_brackets_between_neighbors() {
        for tick in [-200_000, -60, 0, 60, 200_000] {
            let ratio = get_sqrt_ratio_at_tick(tick).unwrap();
            let above = ratio + U256::one();
            assert_eq!(get_tick_at_sqrt_ratio(above).unwrap(), tick);
            let next = get_sqrt_ratio_at_tick(tick + 1).unwrap();
            assert_eq!(get_tick_at_sqrt_ratio(next - U256::one()).unwrap(), tick);
        }
    }

    #[test]
    fn tick_at_ratio_rejects_out_of_range_price() {
        assert_eq!(
            get_tick_at_sqrt_ratio(MIN_SQRT_RATIO - U256::one()),
            Err(ArithmeticError::PriceBound)
        );
        assert_eq!(
            get_tick_at_sqrt_ratio(MAX_SQRT_RATIO),
            Err(ArithmeticError::PriceBound)
        );
    }

    #[test]
    fn position_rounds_negative_ticks_downward() {
        assert_eq!(position(0), (0, 0));
        assert_eq!(position(255), (0, 255));
        assert_eq!(position(256), (1, 0));
        assert_eq!(position(-1), (-1, 255));
        assert_eq!(position(-256), (-1, 0));
        assert_eq!(position(-257), (-2, 255));
    }

    fn bitmap_with(ticks: &[i32], spacing: i32) -> BTreeMap<i16, U256> {
        let mut bitmap = BTreeMap::new();
        for &tick in ticks {
            flip_tick(&mut bitmap, tick, spacing).unwrap();
        }
        bitmap
    }

    #[test]
    fn word_scan_finds_tick_at_or_below() {
        let bitmap = bitmap_with(&[-120, 0, 180], 60);

        let (next, initialized) = next_initialized_tick_within_one_word(&bitmap, 170, 60, true);
        assert_eq!((next, initialized), (0, true));

        // exact hit counts for lte
        let (next, initialized) = next_initialized_tick_within_one_word(&bitmap, 180, 60, true);
        assert_eq!((next, initialized), (180, true));

        let (next, initialized) = next_initialized_tick_within_one_word(&bitmap, -60, 60, true);
        assert_eq!((next, initialized), (-120, true));
    }

    #[test]
    fn word_scan_finds_tick_strictly_above() {
        let bitmap = bitmap_with(&[-120, 0, 180], 60);

        let (next, initialized) = next_initialized_tick_within_one_word(&bitmap, 0, 60, false);
        assert_eq!((next, initialized), (180, true));

        // strictly above: starting on an initialized tick skips it
        let (next, initialized) = next_initialized_tick_within_one_word(&bitmap, 180, 60, false);
        assert!(!initialized);
        assert!(next > 180);

        let (next, initialized) = next_initialized_tick_within_one_word(&bitmap, -121, 60, false);
        assert_eq!((next, initialized), (-120, true));
    }

    #[test]
    fn word_scan_returns_boundary_when_word_is_empty() {
        let bitmap = BTreeMap::new();

        let (next, initialized) = next_initialized_tick_within_one_word(&bitmap, 0, 1, true);
        assert!(!initialized);
        assert_eq!(next, 0); // compressed 0 sits at bit 0, its own word edge

        let (next, initialized) = next_initialized_tick_within_one_word(&bitmap, 0, 1, false);
        assert!(!initialized);
        assert_eq!(next, 255); // far edge of the current word

        // negative side rounds toward the lower word edge
        let (next, initialized) = next_initialized_tick_within_one_word(&bitmap, -5, 1, true);
        assert!(!initialized);
        assert_eq!(next, -256);
    }

    #[test]
    fn flip_tick_rejects_off_grid_and_toggles() {
        let mut bitmap = BTreeMap::new();
        assert_eq!(
            flip_tick(&mut bitmap, 61, 60),
            Err(ArithmeticError::TickBound)
        );
        flip_tick(&mut bitmap, 120, 60).unwrap();
        assert_eq!(bitmap.len(), 1);
        flip_tick(&mut bitmap, 120, 60).unwrap();
        assert!(bitmap.is_empty());
    }
}
