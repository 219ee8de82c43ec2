//! Fixed-rate conversion between the two chains' units.
//!
//! payout = floor(amount * numerator / denominator)
//!
//! The product is computed in 512 bits so no intermediate overflows; only a
//! quotient that does not fit in 256 bits is rejected. A payout that floors
//! to zero is rejected before any reservation or transfer happens.

use alloy::primitives::{U256, U512};
use relay_types::{ExchangeRate, RelayError, Result};

/// Raw floored conversion. Returns `None` only when the quotient exceeds
/// 256 bits; zero results are passed through.
pub fn converted_amount(amount: U256, rate: &ExchangeRate) -> Option<U256> {
    let product: U512 = amount.widening_mul(rate.numerator());
    let denominator = U512::from_limbs_slice(rate.denominator().as_limbs());
    let quotient = product / denominator;
    U256::checked_from_limbs_slice(quotient.as_limbs())
}

/// Convert a chain-B amount into the chain-A payout.
///
/// Fails with `ConversionUnderflow` when the payout floors to zero and with
/// `ConversionOverflow` when it does not fit in 256 bits.
pub fn convert(amount: U256, rate: &ExchangeRate) -> Result<U256> {
    let payout = converted_amount(amount, rate).ok_or(RelayError::ConversionOverflow)?;
    if payout.is_zero() {
        return Err(RelayError::ConversionUnderflow);
    }
    Ok(payout)
}

/// Smallest input that converts to a non-zero payout.
pub fn minimum_convertible(rate: &ExchangeRate) -> U256 {
    // ceil(den / num)
    let (q, r) = rate.denominator().div_rem(rate.numerator());
    if r.is_zero() {
        q
    } else {
        q + U256::from(1u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ether(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
    }

    #[test]
    fn test_default_rate_one_token() {
        let rate = ExchangeRate::default();
        let payout = convert(ether(1), &rate).unwrap();
        assert_eq!(payout, U256::from(18_000_000_000_000_000u64));
    }

    #[test]
    fn test_floor_division() {
        let rate = ExchangeRate::default();
        // 1001 * 18 / 1000 = 18.018
        assert_eq!(convert(U256::from(1001u64), &rate).unwrap(), U256::from(18u64));
        // 55 * 18 / 1000 = 0.99
        assert!(matches!(
            convert(U256::from(55u64), &rate),
            Err(RelayError::ConversionUnderflow)
        ));
        assert_eq!(convert(U256::from(56u64), &rate).unwrap(), U256::from(1u64));
    }

    #[test]
    fn test_zero_amount() {
        let rate = ExchangeRate::default();
        assert_eq!(converted_amount(U256::ZERO, &rate), Some(U256::ZERO));
        assert!(matches!(convert(U256::ZERO, &rate), Err(RelayError::ConversionUnderflow)));
    }

    #[test]
    fn test_minimum_convertible() {
        let rate = ExchangeRate::default();
        let min = minimum_convertible(&rate);
        assert_eq!(min, U256::from(56u64));
        assert!(convert(min, &rate).is_ok());
        assert!(convert(min - U256::from(1u64), &rate).is_err());

        let even = ExchangeRate::new(U256::from(1u64), U256::from(4u64)).unwrap();
        assert_eq!(minimum_convertible(&even), U256::from(4u64));
    }

    #[test]
    fn test_monotonic() {
        let rate = ExchangeRate::default();
        let mut previous = U256::ZERO;
        for i in 0..2_000u64 {
            let payout = converted_amount(U256::from(i), &rate).unwrap();
            assert!(payout >= previous, "not monotonic at {}", i);
            previous = payout;
        }
    }

    #[test]
    fn test_large_amount_without_intermediate_overflow() {
        let rate = ExchangeRate::default();
        // amount * 18 overflows 256 bits, the quotient does not
        let payout = convert(U256::MAX, &rate).unwrap();
        let expected = U256::MAX / U256::from(1000u64) * U256::from(18u64);
        assert!(payout >= expected);
        assert!(payout < expected + U256::from(18u64));
    }

    #[test]
    fn test_quotient_overflow() {
        let rate = ExchangeRate::new(U256::from(2u64), U256::from(1u64)).unwrap();
        assert!(matches!(convert(U256::MAX, &rate), Err(RelayError::ConversionOverflow)));
        assert_eq!(convert(U256::MAX / U256::from(2u64), &rate).unwrap(), U256::MAX - U256::from(1u64));
    }
}
