use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Decimal places every monetary amount is carried at.
pub const MONEY_DP: u32 = 2;

/// Round a monetary amount the way a payment statement does (2 dp, banker's rounding).
pub fn round_money(amount: Decimal) -> Money {
    amount.round_dp(MONEY_DP)
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
    pub money_dp: u32,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
            money_dp: MONEY_DP,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_money_half_even() {
        assert_eq!(round_money(dec!(1610.4649)), dec!(1610.46));
        assert_eq!(round_money(dec!(0.125)), dec!(0.12));
        assert_eq!(round_money(dec!(0.135)), dec!(0.14));
    }

    #[test]
    fn test_with_metadata_records_warnings() {
        let out = with_metadata("Test", &dec!(1), vec!["w".into()], 7, dec!(2));
        assert_eq!(out.result, dec!(2));
        assert_eq!(out.warnings, vec!["w".to_string()]);
        assert_eq!(out.metadata.computation_time_us, 7);
        assert_eq!(out.metadata.money_dp, 2);
    }
}
