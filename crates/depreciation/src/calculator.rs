//! Pure per-period charge computation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use assetbook_core::{DomainError, Money};

use crate::asset::Asset;
use crate::error::{DepreciationError, DepreciationResult};
use crate::method::{DepreciationMethod, MethodKind};

/// Ledger-derived state the charge depends on.
///
/// Always taken from the fold over the asset's un-reversed entries, never from
/// the cached balances on [`Asset`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedgerPosition {
    pub accumulated_before: Money,
    pub periods_charged: u32,
}

/// Per-run inputs for one asset.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodInput {
    pub period_date: NaiveDate,
    /// Business date of the run; `period_date` may not be later.
    pub today: NaiveDate,
    /// Units consumed this period (units-of-production only).
    pub units_consumed: Option<i64>,
}

#[derive(Debug, Copy, Clone, Default)]
pub struct DepreciationCalculator;

impl DepreciationCalculator {
    /// The method configured on `asset`, or `ConfigurationMissing`.
    pub fn method_of(asset: &Asset) -> DepreciationResult<&DepreciationMethod> {
        asset.method.as_ref().ok_or_else(|| {
            DepreciationError::configuration_missing(format!(
                "asset {} has no depreciation method",
                asset.asset_number
            ))
        })
    }

    /// Charge for one period.
    ///
    /// Returns `Money::ZERO` when nothing is left to depreciate. The result is
    /// rounded half-up to the minor unit and never takes accumulated
    /// depreciation past the depreciable base.
    pub fn compute(
        asset: &Asset,
        method: &DepreciationMethod,
        position: LedgerPosition,
        input: &PeriodInput,
    ) -> DepreciationResult<Money> {
        if input.period_date > input.today {
            return Err(DepreciationError::invalid_period(format!(
                "period date {} is after {}",
                input.period_date, input.today
            )));
        }

        let base = asset.depreciable_base();
        let remaining = base - position.accumulated_before;
        if !remaining.is_positive() {
            return Ok(Money::ZERO);
        }

        if asset.useful_life_periods == 0 {
            return Err(DepreciationError::configuration_missing(format!(
                "asset {} has no useful life",
                asset.asset_number
            )));
        }

        // Straight-line absorbs rounding residue in its last period.
        let final_period = position.periods_charged.saturating_add(1) >= asset.useful_life_periods;
        if method.kind == MethodKind::StraightLine && final_period {
            return Ok(remaining);
        }

        let charge = match method.kind {
            MethodKind::StraightLine => {
                let life = Decimal::from(asset.useful_life_periods);
                Money::round(base.amount() / life)
            }
            MethodKind::DecliningBalance => {
                let rate = method.rate_fraction()?;
                let book_value_before = asset.original_cost - position.accumulated_before;
                Money::round(book_value_before.amount() * rate)
            }
            MethodKind::UnitsOfProduction => units_charge(asset, base, input.units_consumed)?,
        };

        Ok(charge.min(remaining))
    }
}

fn units_charge(asset: &Asset, base: Money, units_consumed: Option<i64>) -> DepreciationResult<Money> {
    let units = match units_consumed {
        Some(u) if u > 0 => Decimal::from(u),
        _ => return Err(DepreciationError::MissingUnits),
    };
    let capacity = match asset.total_capacity_units {
        Some(c) if c > 0 => Decimal::from(c),
        _ => {
            return Err(DepreciationError::configuration_missing(format!(
                "asset {} has no total capacity",
                asset.asset_number
            )));
        }
    };

    let scaled = base
        .amount()
        .checked_mul(units)
        .and_then(|v| v.checked_div(capacity))
        .ok_or_else(|| DomainError::invariant("units-of-production charge overflow"))?;
    Ok(Money::round(scaled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetId, NewAsset};
    use assetbook_core::{AggregateId, TenantId};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn asset(cost: Money, salvage: Money, life: u32, method: DepreciationMethod) -> Asset {
        Asset::register(NewAsset {
            tenant_id: TenantId::new(),
            asset_id: AssetId::new(AggregateId::new()),
            asset_number: "FA-0001".to_string(),
            name: "Press".to_string(),
            category: "MACHINERY".to_string(),
            location: None,
            branch_id: None,
            cost_center: None,
            original_cost: cost,
            salvage_value: salvage,
            useful_life_periods: life,
            method: Some(method),
            total_capacity_units: Some(100_000),
            depreciation_start: date(2025, 1, 1),
        })
        .unwrap()
    }

    fn input(units: Option<i64>) -> PeriodInput {
        PeriodInput {
            period_date: date(2025, 1, 31),
            today: date(2025, 2, 1),
            units_consumed: units,
        }
    }

    fn at(accumulated: Money, periods: u32) -> LedgerPosition {
        LedgerPosition {
            accumulated_before: accumulated,
            periods_charged: periods,
        }
    }

    /// Charges for consecutive periods, folding the position forward.
    fn schedule(asset: &Asset, periods: u32) -> Vec<Money> {
        let method = DepreciationCalculator::method_of(asset).unwrap();
        let mut position = LedgerPosition::default();
        let mut charges = Vec::new();
        for _ in 0..periods {
            let charge = DepreciationCalculator::compute(asset, method, position, &input(None)).unwrap();
            charges.push(charge);
            if charge.is_positive() {
                position.accumulated_before += charge;
                position.periods_charged += 1;
            }
        }
        charges
    }

    #[test]
    fn straight_line_even_charges_then_zero() {
        let a = asset(Money::from_major(12_000), Money::ZERO, 12, DepreciationMethod::straight_line("SL"));
        let charges = schedule(&a, 13);

        for charge in &charges[..12] {
            assert_eq!(*charge, Money::from_major(1_000));
        }
        assert_eq!(charges[12], Money::ZERO);
    }

    #[test]
    fn straight_line_final_period_takes_exact_remainder() {
        let a = asset(Money::from_major(1_000), Money::ZERO, 3, DepreciationMethod::straight_line("SL"));
        let charges = schedule(&a, 3);

        assert_eq!(charges[0], Money::round(dec!(333.333)));
        assert_eq!(charges[1], Money::round(dec!(333.333)));
        assert_eq!(charges[2], Money::round(dec!(333.334)));
        assert_eq!(charges.iter().sum::<Money>(), Money::from_major(1_000));
    }

    #[test]
    fn declining_balance_uses_book_value_before() {
        let method = DepreciationMethod::declining_balance("DB20", dec!(20));
        let a = asset(Money::from_major(10_000), Money::ZERO, 60, method.clone());

        let first = DepreciationCalculator::compute(&a, &method, at(Money::ZERO, 0), &input(None)).unwrap();
        assert_eq!(first, Money::from_major(2_000));
        assert_eq!(a.original_cost - first, Money::from_major(8_000));

        let second = DepreciationCalculator::compute(&a, &method, at(first, 1), &input(None)).unwrap();
        assert_eq!(second, Money::from_major(1_600));
    }

    #[test]
    fn declining_balance_has_no_end_of_life_catch_up() {
        let method = DepreciationMethod::declining_balance("DB20", dec!(20));
        let a = asset(Money::from_major(10_000), Money::ZERO, 2, method.clone());

        let first = DepreciationCalculator::compute(&a, &method, at(Money::ZERO, 0), &input(None)).unwrap();
        assert_eq!(first, Money::from_major(2_000));

        let last = DepreciationCalculator::compute(&a, &method, at(first, 1), &input(None)).unwrap();
        assert_eq!(last, Money::from_major(1_600));
    }

    #[test]
    fn declining_balance_is_clipped_at_salvage() {
        let method = DepreciationMethod::declining_balance("DB50", dec!(50));
        let a = asset(Money::from_major(10_000), Money::from_major(4_000), 60, method.clone());

        let charge = DepreciationCalculator::compute(&a, &method, at(Money::from_major(5_000), 1), &input(None)).unwrap();
        assert_eq!(charge, Money::from_major(1_000));
    }

    #[test]
    fn units_of_production_scales_by_consumption() {
        let method = DepreciationMethod::units_of_production("UOP");
        let a = asset(Money::from_major(55_000), Money::from_major(5_000), 120, method.clone());

        let charge = DepreciationCalculator::compute(&a, &method, at(Money::ZERO, 0), &input(Some(5_000))).unwrap();
        assert_eq!(charge, Money::from_major(2_500));
    }

    #[test]
    fn units_of_production_requires_positive_units() {
        let method = DepreciationMethod::units_of_production("UOP");
        let a = asset(Money::from_major(50_000), Money::ZERO, 120, method.clone());

        for units in [None, Some(0), Some(-3)] {
            let err = DepreciationCalculator::compute(&a, &method, at(Money::ZERO, 0), &input(units)).unwrap_err();
            assert_eq!(err, DepreciationError::MissingUnits);
        }
    }

    #[test]
    fn units_of_production_requires_capacity() {
        let method = DepreciationMethod::units_of_production("UOP");
        let mut a = asset(Money::from_major(50_000), Money::ZERO, 120, method.clone());
        a.total_capacity_units = None;

        let err = DepreciationCalculator::compute(&a, &method, at(Money::ZERO, 0), &input(Some(10))).unwrap_err();
        assert!(matches!(err, DepreciationError::ConfigurationMissing(_)));
    }

    #[test]
    fn future_period_is_invalid() {
        let method = DepreciationMethod::straight_line("SL");
        let a = asset(Money::from_major(12_000), Money::ZERO, 12, method.clone());
        let future = PeriodInput {
            period_date: date(2025, 3, 31),
            today: date(2025, 3, 30),
            units_consumed: None,
        };

        let err = DepreciationCalculator::compute(&a, &method, at(Money::ZERO, 0), &future).unwrap_err();
        assert!(matches!(err, DepreciationError::InvalidPeriod(_)));
    }

    #[test]
    fn missing_method_is_configuration_error() {
        let mut a = asset(Money::from_major(12_000), Money::ZERO, 12, DepreciationMethod::straight_line("SL"));
        a.method = None;
        assert!(matches!(
            DepreciationCalculator::method_of(&a),
            Err(DepreciationError::ConfigurationMissing(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Straight-line charges over the full life sum to the depreciable base exactly.
        #[test]
        fn straight_line_sum_law(
            cost_minor in 1_000_000i64..10_000_000_000i64,
            salvage_pct in 0i64..90i64,
            life in 1u32..240u32,
        ) {
            let cost = Money::from_minor(cost_minor);
            let salvage = Money::from_minor(cost_minor * salvage_pct / 100);
            let a = asset(cost, salvage, life, DepreciationMethod::straight_line("SL"));

            let charges = schedule(&a, life + 1);
            let total: Money = charges.iter().sum();

            prop_assert_eq!(total, a.depreciable_base());
            prop_assert_eq!(charges[life as usize], Money::ZERO);
            prop_assert!(charges.iter().all(|c| !c.is_negative()));
        }

        /// No method ever charges past the depreciable base.
        #[test]
        fn charge_never_exceeds_remaining(
            accumulated_minor in 0i64..12_000_000i64,
            periods in 0u32..24u32,
            rate in 1i64..=100i64,
        ) {
            let method = DepreciationMethod::declining_balance("DB", Decimal::from(rate));
            let a = asset(Money::from_major(12_000), Money::ZERO, 24, method.clone());
            let accumulated = Money::from_minor(accumulated_minor);

            let charge = DepreciationCalculator::compute(&a, &method, at(accumulated, periods), &input(None)).unwrap();
            prop_assert!(accumulated + charge <= a.depreciable_base());
            prop_assert!(!charge.is_negative());
        }
    }
}
