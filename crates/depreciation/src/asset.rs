//! Fixed asset master data and its cached depreciation balances.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use assetbook_core::{AggregateId, BranchId, DomainError, Money, TenantId};

use crate::ledger::AssetLedger;
use crate::method::DepreciationMethod;
use crate::period::Period;

/// Asset identifier (tenant-scoped via `tenant_id`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub AggregateId);

impl AssetId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for AssetId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for AssetId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<AggregateId>().map(Self)
    }
}

/// Lifecycle of the physical asset. Only `Active` assets depreciate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    Active,
    Inactive,
    UnderMaintenance,
    Disposed,
    Sold,
    Lost,
    Damaged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepreciationStatus {
    Active,
    Paused,
    /// Accumulated depreciation reached the depreciable base.
    Completed,
}

/// Cached running balances. Rebuilt from the ledger, never written directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBalances {
    pub accumulated_depreciation: Money,
    pub book_value: Money,
}

/// Registration input for a new asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAsset {
    pub tenant_id: TenantId,
    pub asset_id: AssetId,
    pub asset_number: String,
    pub name: String,
    pub category: String,
    pub location: Option<String>,
    pub branch_id: Option<BranchId>,
    pub cost_center: Option<String>,
    pub original_cost: Money,
    pub salvage_value: Money,
    pub useful_life_periods: u32,
    pub method: Option<DepreciationMethod>,
    pub total_capacity_units: Option<u64>,
    pub depreciation_start: NaiveDate,
}

/// The depreciable entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub tenant_id: TenantId,
    pub asset_number: String,
    pub name: String,
    pub category: String,
    pub location: Option<String>,
    pub branch_id: Option<BranchId>,
    pub cost_center: Option<String>,
    pub original_cost: Money,
    pub salvage_value: Money,
    pub useful_life_periods: u32,
    /// `None` when the asset was registered without a usable method.
    pub method: Option<DepreciationMethod>,
    pub total_capacity_units: Option<u64>,
    pub depreciation_start: NaiveDate,
    pub lifecycle_status: LifecycleStatus,
    pub depreciation_status: DepreciationStatus,
    balances: AssetBalances,
}

impl Asset {
    /// Validate and register a new, not yet depreciated asset.
    pub fn register(new: NewAsset) -> Result<Self, DomainError> {
        if new.asset_number.trim().is_empty() {
            return Err(DomainError::validation("asset number cannot be empty"));
        }
        if !new.original_cost.is_positive() {
            return Err(DomainError::validation("original cost must be positive"));
        }
        if new.salvage_value.is_negative() {
            return Err(DomainError::validation("salvage value cannot be negative"));
        }
        if new.salvage_value >= new.original_cost {
            return Err(DomainError::validation(
                "salvage value must be below original cost",
            ));
        }
        if new.useful_life_periods == 0 {
            return Err(DomainError::validation("useful life must be at least one period"));
        }

        Ok(Self {
            id: new.asset_id,
            tenant_id: new.tenant_id,
            asset_number: new.asset_number,
            name: new.name,
            category: new.category,
            location: new.location,
            branch_id: new.branch_id,
            cost_center: new.cost_center,
            original_cost: new.original_cost,
            salvage_value: new.salvage_value,
            useful_life_periods: new.useful_life_periods,
            method: new.method,
            total_capacity_units: new.total_capacity_units,
            depreciation_start: new.depreciation_start,
            lifecycle_status: LifecycleStatus::Active,
            depreciation_status: DepreciationStatus::Active,
            balances: AssetBalances {
                accumulated_depreciation: Money::ZERO,
                book_value: new.original_cost,
            },
        })
    }

    /// Original cost minus salvage value.
    pub fn depreciable_base(&self) -> Money {
        self.original_cost - self.salvage_value
    }

    pub fn accumulated_depreciation(&self) -> Money {
        self.balances.accumulated_depreciation
    }

    pub fn book_value(&self) -> Money {
        self.balances.book_value
    }

    pub fn balances(&self) -> AssetBalances {
        self.balances
    }

    pub fn is_fully_depreciated(&self) -> bool {
        self.balances.accumulated_depreciation >= self.depreciable_base()
    }

    /// Both lifecycle and depreciation status allow a new charge.
    pub fn is_depreciable(&self) -> bool {
        self.lifecycle_status == LifecycleStatus::Active
            && self.depreciation_status == DepreciationStatus::Active
    }

    /// First period that may carry a charge.
    pub fn first_period(&self) -> Period {
        Period::of(self.depreciation_start)
    }

    /// Rebuild the cached balances from the ledger fold and derive the
    /// completed/active transition from them.
    ///
    /// `Paused` is an operator decision and is left alone.
    pub fn sync_with(&mut self, ledger: &AssetLedger) {
        let accumulated = ledger.accumulated();
        self.balances = AssetBalances {
            accumulated_depreciation: accumulated,
            book_value: self.original_cost - accumulated,
        };

        match self.depreciation_status {
            DepreciationStatus::Active if accumulated >= self.depreciable_base() => {
                self.depreciation_status = DepreciationStatus::Completed;
            }
            DepreciationStatus::Completed if accumulated < self.depreciable_base() => {
                self.depreciation_status = DepreciationStatus::Active;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_asset() -> NewAsset {
        NewAsset {
            tenant_id: TenantId::new(),
            asset_id: AssetId::new(AggregateId::new()),
            asset_number: "FA-0001".to_string(),
            name: "Delivery van".to_string(),
            category: "VEHICLES".to_string(),
            location: None,
            branch_id: None,
            cost_center: None,
            original_cost: Money::from_major(12_000),
            salvage_value: Money::ZERO,
            useful_life_periods: 12,
            method: Some(DepreciationMethod::straight_line("SL")),
            total_capacity_units: None,
            depreciation_start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        }
    }

    #[test]
    fn register_starts_with_full_book_value() {
        let asset = Asset::register(new_asset()).unwrap();
        assert_eq!(asset.accumulated_depreciation(), Money::ZERO);
        assert_eq!(asset.book_value(), Money::from_major(12_000));
        assert!(asset.is_depreciable());
    }

    #[test]
    fn salvage_must_be_below_cost() {
        let mut new = new_asset();
        new.salvage_value = Money::from_major(12_000);
        assert!(matches!(Asset::register(new), Err(DomainError::Validation(_))));

        let mut new = new_asset();
        new.salvage_value = Money::from_major(-1);
        assert!(matches!(Asset::register(new), Err(DomainError::Validation(_))));
    }

    #[test]
    fn zero_useful_life_is_rejected() {
        let mut new = new_asset();
        new.useful_life_periods = 0;
        assert!(Asset::register(new).is_err());
    }

    #[test]
    fn paused_asset_is_not_depreciable() {
        let mut asset = Asset::register(new_asset()).unwrap();
        asset.depreciation_status = DepreciationStatus::Paused;
        assert!(!asset.is_depreciable());

        asset.depreciation_status = DepreciationStatus::Active;
        asset.lifecycle_status = LifecycleStatus::Disposed;
        assert!(!asset.is_depreciable());
    }
}
