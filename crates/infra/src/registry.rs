//! Asset selection for a batch run.

use serde::{Deserialize, Serialize};

use assetbook_core::{BranchId, TenantId};
use assetbook_depreciation::{Asset, AssetId, DepreciationResult, MethodKind};

use crate::store::DepreciationStore;

/// Filter over a tenant's assets. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFilter {
    pub category: Option<String>,
    pub location: Option<String>,
    pub method: Option<MethodKind>,
    pub branch_id: Option<BranchId>,
}

impl AssetFilter {
    pub fn matches(&self, asset: &Asset) -> bool {
        if let Some(category) = &self.category {
            if !asset.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(location) = &self.location {
            if asset.location.as_deref() != Some(location.as_str()) {
                return false;
            }
        }
        if let Some(kind) = self.method {
            if asset.method.as_ref().map(|m| m.kind) != Some(kind) {
                return false;
            }
        }
        if let Some(branch_id) = self.branch_id {
            if asset.branch_id != Some(branch_id) {
                return false;
            }
        }
        true
    }
}

/// Which assets a run covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetSelection {
    /// These assets, in this order.
    Explicit(Vec<AssetId>),
    /// Every asset of the tenant matching the filter, by asset number.
    Filter(AssetFilter),
}

impl Default for AssetSelection {
    fn default() -> Self {
        AssetSelection::Filter(AssetFilter::default())
    }
}

/// A selected asset, or an explicitly requested id that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Found(Asset),
    Missing(AssetId),
}

impl AssetSelection {
    pub fn all() -> Self {
        Self::default()
    }

    /// Resolve against the store. Lifecycle and depreciation status are not
    /// filtered here; the runner reports such assets as skipped.
    pub fn resolve<S>(&self, store: &S, tenant_id: TenantId) -> DepreciationResult<Vec<Candidate>>
    where
        S: DepreciationStore + ?Sized,
    {
        match self {
            AssetSelection::Explicit(ids) => ids
                .iter()
                .map(|id| {
                    Ok(match store.get_asset(tenant_id, *id)? {
                        Some(asset) => Candidate::Found(asset),
                        None => Candidate::Missing(*id),
                    })
                })
                .collect(),
            AssetSelection::Filter(filter) => Ok(store
                .list_assets(tenant_id)?
                .into_iter()
                .filter(|a| filter.matches(a))
                .map(Candidate::Found)
                .collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryDepreciationStore;
    use assetbook_core::{AggregateId, Money};
    use assetbook_depreciation::{DepreciationMethod, NewAsset};
    use chrono::NaiveDate;

    fn asset(tenant_id: TenantId, number: &str, category: &str, method: Option<DepreciationMethod>) -> Asset {
        Asset::register(NewAsset {
            tenant_id,
            asset_id: AssetId::new(AggregateId::new()),
            asset_number: number.to_string(),
            name: number.to_string(),
            category: category.to_string(),
            location: Some("HQ".to_string()),
            branch_id: None,
            cost_center: None,
            original_cost: Money::from_major(1_000),
            salvage_value: Money::ZERO,
            useful_life_periods: 10,
            method,
            total_capacity_units: None,
            depreciation_start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        })
        .unwrap()
    }

    #[test]
    fn filter_by_category_and_method() {
        let store = InMemoryDepreciationStore::new();
        let tenant = TenantId::new();
        store.upsert_asset(asset(tenant, "FA-3", "VEHICLES", Some(DepreciationMethod::straight_line("SL")))).unwrap();
        store.upsert_asset(asset(tenant, "FA-1", "vehicles", None)).unwrap();
        store.upsert_asset(asset(tenant, "FA-2", "IT", Some(DepreciationMethod::straight_line("SL")))).unwrap();

        let by_category = AssetSelection::Filter(AssetFilter {
            category: Some("Vehicles".to_string()),
            ..AssetFilter::default()
        });
        let numbers: Vec<String> = by_category
            .resolve(&store, tenant)
            .unwrap()
            .into_iter()
            .map(|c| match c {
                Candidate::Found(a) => a.asset_number,
                Candidate::Missing(id) => panic!("unexpected missing {id}"),
            })
            .collect();
        assert_eq!(numbers, vec!["FA-1", "FA-3"]);

        let by_method = AssetSelection::Filter(AssetFilter {
            method: Some(MethodKind::StraightLine),
            ..AssetFilter::default()
        });
        assert_eq!(by_method.resolve(&store, tenant).unwrap().len(), 2);
    }

    #[test]
    fn explicit_selection_reports_unknown_ids() {
        let store = InMemoryDepreciationStore::new();
        let tenant = TenantId::new();
        let known = asset(tenant, "FA-1", "IT", None);
        store.upsert_asset(known.clone()).unwrap();
        let unknown = AssetId::new(AggregateId::new());

        let resolved = AssetSelection::Explicit(vec![unknown, known.id]).resolve(&store, tenant).unwrap();
        assert_eq!(resolved[0], Candidate::Missing(unknown));
        assert!(matches!(&resolved[1], Candidate::Found(a) if a.id == known.id));
    }
}
