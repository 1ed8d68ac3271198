//! Fixed-point to float conversion helpers.

use alloy::primitives::U256;

/// Convert a fixed-point amount to a float in whole-token units.
pub(crate) fn u256_to_f64(value: U256, decimals: u8) -> f64 {
    let divisor = 10_f64.powi(decimals as i32);
    value.to_string().parse::<f64>().unwrap_or(0.0) / divisor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_wei_scale_amounts() {
        // 100 tokens with 18 decimals
        let raw = U256::from(100u64) * U256::from(10u64).pow(U256::from(18u64));
        assert!((u256_to_f64(raw, 18) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn converts_oracle_scale_prices() {
        // $2000 with 8 decimals
        let raw = U256::from(200_000_000_000u64);
        assert!((u256_to_f64(raw, 8) - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn zero_is_zero() {
        assert_eq!(u256_to_f64(U256::ZERO, 18), 0.0);
    }
}
