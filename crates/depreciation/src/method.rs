//! Depreciation method descriptors (pure data, read-only to the engine).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use assetbook_core::ValueObject;

use crate::error::{DepreciationError, DepreciationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    StraightLine,
    DecliningBalance,
    UnitsOfProduction,
}

impl core::fmt::Display for MethodKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            MethodKind::StraightLine => "straight_line",
            MethodKind::DecliningBalance => "declining_balance",
            MethodKind::UnitsOfProduction => "units_of_production",
        })
    }
}

/// Immutable depreciation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepreciationMethod {
    pub code: String,
    pub kind: MethodKind,
    /// Per-period percentage of book value (declining balance only), e.g. `20` for 20%.
    pub rate_percentage: Option<Decimal>,
    pub description: String,
}

impl ValueObject for DepreciationMethod {}

impl DepreciationMethod {
    pub fn straight_line(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            kind: MethodKind::StraightLine,
            rate_percentage: None,
            description: String::new(),
        }
    }

    pub fn declining_balance(code: impl Into<String>, rate_percentage: Decimal) -> Self {
        Self {
            code: code.into(),
            kind: MethodKind::DecliningBalance,
            rate_percentage: Some(rate_percentage),
            description: String::new(),
        }
    }

    pub fn units_of_production(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            kind: MethodKind::UnitsOfProduction,
            rate_percentage: None,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declining-balance rate as a fraction in (0, 1].
    pub fn rate_fraction(&self) -> DepreciationResult<Decimal> {
        let rate = self.rate_percentage.ok_or_else(|| {
            DepreciationError::configuration_missing(format!(
                "method '{}' has no declining-balance rate",
                self.code
            ))
        })?;
        if rate <= Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
            return Err(DepreciationError::configuration_missing(format!(
                "method '{}' rate {rate}% is outside (0, 100]",
                self.code
            )));
        }
        Ok(rate / Decimal::ONE_HUNDRED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rate_fraction_validates_range() {
        assert_eq!(
            DepreciationMethod::declining_balance("DB20", dec!(20)).rate_fraction().unwrap(),
            dec!(0.2)
        );
        for bad in [dec!(0), dec!(-5), dec!(100.5)] {
            let err = DepreciationMethod::declining_balance("DB", bad).rate_fraction().unwrap_err();
            assert!(matches!(err, DepreciationError::ConfigurationMissing(_)));
        }
        let err = DepreciationMethod::straight_line("SL").rate_fraction().unwrap_err();
        assert!(matches!(err, DepreciationError::ConfigurationMissing(_)));
    }
}
