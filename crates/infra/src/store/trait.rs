//! The `DepreciationStore` contract and the history read model.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use assetbook_accounting::JournalEntryId;
use assetbook_core::TenantId;
use assetbook_depreciation::{
    Asset, AssetBalances, AssetId, AssetLedger, DepreciationResult, LedgerEntry, LedgerEntryId,
    LedgerEvent, Period, PostedShare, RecordCharge, ReverseCharge,
};
use assetbook_events::EventEnvelope;

/// Audit stream element of an asset ledger.
pub type LedgerEnvelope = EventEnvelope<LedgerEvent>;

/// Read-out of one asset's depreciation schedule.
///
/// `entries` includes reversed entries; `balances` is the fold over the
/// un-reversed ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetHistory {
    pub asset: Asset,
    pub balances: AssetBalances,
    pub entries: Vec<LedgerEntry>,
}

/// Storage of assets and their depreciation ledgers.
///
/// Every ledger mutation and the matching refresh of the asset's cached
/// balances happen in one transaction: both are visible or neither is.
/// All reads and writes are tenant-scoped.
pub trait DepreciationStore: Send + Sync {
    /// Insert or replace an asset's master data. The ledger is kept and the
    /// cached balances are rebuilt from it.
    fn upsert_asset(&self, asset: Asset) -> DepreciationResult<()>;

    fn get_asset(&self, tenant_id: TenantId, asset_id: AssetId) -> DepreciationResult<Option<Asset>>;

    /// All assets of a tenant, ordered by asset number.
    fn list_assets(&self, tenant_id: TenantId) -> DepreciationResult<Vec<Asset>>;

    /// Current ledger of an asset (empty when nothing was recorded yet).
    fn ledger(&self, tenant_id: TenantId, asset_id: AssetId) -> DepreciationResult<AssetLedger>;

    fn has_entry(&self, tenant_id: TenantId, asset_id: AssetId, period: Period) -> DepreciationResult<bool>;

    /// Record one period's charge and refresh the asset.
    fn record(&self, tenant_id: TenantId, asset_id: AssetId, command: RecordCharge) -> DepreciationResult<LedgerEntry>;

    /// Set the journal-entry reference of an entry (once), with the accounts it
    /// was booked to.
    fn attach_journal_entry(
        &self,
        tenant_id: TenantId,
        asset_id: AssetId,
        entry_id: LedgerEntryId,
        journal_entry_id: JournalEntryId,
        share: PostedShare,
    ) -> DepreciationResult<()>;

    /// Flag an entry reversed and refresh the asset. Returns the updated entry.
    fn reverse(&self, tenant_id: TenantId, asset_id: AssetId, command: ReverseCharge) -> DepreciationResult<LedgerEntry>;

    /// Un-reversed entries of every asset of the tenant in `period`.
    fn entries_for_period(&self, tenant_id: TenantId, period: Period) -> DepreciationResult<Vec<LedgerEntry>>;

    fn history(&self, tenant_id: TenantId, asset_id: AssetId) -> DepreciationResult<AssetHistory>;

    /// Append-only audit stream of an asset's ledger.
    fn audit_stream(&self, tenant_id: TenantId, asset_id: AssetId) -> DepreciationResult<Vec<LedgerEnvelope>>;
}

impl<S> DepreciationStore for Arc<S>
where
    S: DepreciationStore + ?Sized,
{
    fn upsert_asset(&self, asset: Asset) -> DepreciationResult<()> {
        (**self).upsert_asset(asset)
    }

    fn get_asset(&self, tenant_id: TenantId, asset_id: AssetId) -> DepreciationResult<Option<Asset>> {
        (**self).get_asset(tenant_id, asset_id)
    }

    fn list_assets(&self, tenant_id: TenantId) -> DepreciationResult<Vec<Asset>> {
        (**self).list_assets(tenant_id)
    }

    fn ledger(&self, tenant_id: TenantId, asset_id: AssetId) -> DepreciationResult<AssetLedger> {
        (**self).ledger(tenant_id, asset_id)
    }

    fn has_entry(&self, tenant_id: TenantId, asset_id: AssetId, period: Period) -> DepreciationResult<bool> {
        (**self).has_entry(tenant_id, asset_id, period)
    }

    fn record(&self, tenant_id: TenantId, asset_id: AssetId, command: RecordCharge) -> DepreciationResult<LedgerEntry> {
        (**self).record(tenant_id, asset_id, command)
    }

    fn attach_journal_entry(
        &self,
        tenant_id: TenantId,
        asset_id: AssetId,
        entry_id: LedgerEntryId,
        journal_entry_id: JournalEntryId,
        share: PostedShare,
    ) -> DepreciationResult<()> {
        (**self).attach_journal_entry(tenant_id, asset_id, entry_id, journal_entry_id, share)
    }

    fn reverse(&self, tenant_id: TenantId, asset_id: AssetId, command: ReverseCharge) -> DepreciationResult<LedgerEntry> {
        (**self).reverse(tenant_id, asset_id, command)
    }

    fn entries_for_period(&self, tenant_id: TenantId, period: Period) -> DepreciationResult<Vec<LedgerEntry>> {
        (**self).entries_for_period(tenant_id, period)
    }

    fn history(&self, tenant_id: TenantId, asset_id: AssetId) -> DepreciationResult<AssetHistory> {
        (**self).history(tenant_id, asset_id)
    }

    fn audit_stream(&self, tenant_id: TenantId, asset_id: AssetId) -> DepreciationResult<Vec<LedgerEnvelope>> {
        (**self).audit_stream(tenant_id, asset_id)
    }
}
