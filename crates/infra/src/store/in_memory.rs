//! Lock-guarded in-memory store, snapshotted to JSON by the CLI.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use assetbook_accounting::JournalEntryId;
use assetbook_core::{Aggregate, DomainError, TenantId};
use assetbook_depreciation::{
    Asset, AssetId, AssetLedger, AttachJournalEntry, DepreciationError, DepreciationResult,
    LedgerCommand, LedgerEntry, LedgerEntryId, LedgerEvent, Period, PostedShare, RecordCharge,
    ReverseCharge,
};
use assetbook_events::EventEnvelope;

use super::r#trait::{AssetHistory, DepreciationStore, LedgerEnvelope};

const LEDGER_AGGREGATE_TYPE: &str = "assets.asset_ledger";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    tenant_id: TenantId,
    asset_id: AssetId,
}

/// One asset together with everything it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub asset: Asset,
    pub ledger: AssetLedger,
    pub audit: Vec<LedgerEnvelope>,
}

impl AssetRecord {
    fn new(asset: Asset) -> Self {
        Self {
            ledger: AssetLedger::empty(asset.id),
            asset,
            audit: Vec::new(),
        }
    }

    fn key(&self) -> StreamKey {
        StreamKey {
            tenant_id: self.asset.tenant_id,
            asset_id: self.asset.id,
        }
    }

    /// Run a ledger command, refresh the asset cache and extend the audit
    /// stream. Nothing changes when the command is rejected.
    fn execute(&mut self, command: &LedgerCommand) -> DepreciationResult<()> {
        let events = self.ledger.execute(command)?;
        self.asset.sync_with(&self.ledger);
        for event in events {
            self.push_audit(event);
        }
        Ok(())
    }

    fn push_audit(&mut self, event: LedgerEvent) {
        let envelope = match self.audit.last() {
            Some(previous) => previous.next(event),
            None => EventEnvelope::new(
                self.asset.tenant_id,
                self.asset.id.0,
                LEDGER_AGGREGATE_TYPE,
                1,
                event,
            ),
        };
        self.audit.push(envelope);
    }
}

/// Serializable image of the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub records: Vec<AssetRecord>,
}

/// In-memory depreciation store.
///
/// A single lock guards all assets and ledgers; each write runs under one
/// write guard, which is the transaction boundary.
#[derive(Debug, Default)]
pub struct InMemoryDepreciationStore {
    records: RwLock<HashMap<StreamKey, AssetRecord>>,
}

fn poisoned<T>(_: PoisonError<T>) -> DepreciationError {
    DomainError::invariant("depreciation store lock poisoned").into()
}

impl InMemoryDepreciationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a snapshot. Cached balances are recomputed from
    /// each ledger, so a hand-edited snapshot cannot carry diverging totals.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let records = snapshot
            .records
            .into_iter()
            .map(|mut record| {
                record.asset.sync_with(&record.ledger);
                (record.key(), record)
            })
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    /// Consistent copy of every record, ordered by tenant and asset number.
    pub fn snapshot(&self) -> DepreciationResult<StoreSnapshot> {
        let map = self.records.read().map_err(poisoned)?;
        let mut records: Vec<AssetRecord> = map.values().cloned().collect();
        records.sort_by(|a, b| {
            (a.asset.tenant_id, &a.asset.asset_number).cmp(&(b.asset.tenant_id, &b.asset.asset_number))
        });
        Ok(StoreSnapshot { records })
    }

    fn with_record<T>(
        &self,
        tenant_id: TenantId,
        asset_id: AssetId,
        f: impl FnOnce(&mut AssetRecord) -> DepreciationResult<T>,
    ) -> DepreciationResult<T> {
        let mut map = self.records.write().map_err(poisoned)?;
        let record = map
            .get_mut(&StreamKey { tenant_id, asset_id })
            .ok_or(DepreciationError::AssetNotFound(asset_id))?;
        f(record)
    }

    fn read_record<T>(
        &self,
        tenant_id: TenantId,
        asset_id: AssetId,
        f: impl FnOnce(&AssetRecord) -> T,
    ) -> DepreciationResult<T> {
        let map = self.records.read().map_err(poisoned)?;
        map.get(&StreamKey { tenant_id, asset_id })
            .map(f)
            .ok_or(DepreciationError::AssetNotFound(asset_id))
    }
}

impl DepreciationStore for InMemoryDepreciationStore {
    fn upsert_asset(&self, mut asset: Asset) -> DepreciationResult<()> {
        let mut map = self.records.write().map_err(poisoned)?;
        let key = StreamKey {
            tenant_id: asset.tenant_id,
            asset_id: asset.id,
        };
        match map.get_mut(&key) {
            Some(record) => {
                asset.sync_with(&record.ledger);
                record.asset = asset;
            }
            None => {
                map.insert(key, AssetRecord::new(asset));
            }
        }
        Ok(())
    }

    fn get_asset(&self, tenant_id: TenantId, asset_id: AssetId) -> DepreciationResult<Option<Asset>> {
        let map = self.records.read().map_err(poisoned)?;
        Ok(map
            .get(&StreamKey { tenant_id, asset_id })
            .map(|r| r.asset.clone()))
    }

    fn list_assets(&self, tenant_id: TenantId) -> DepreciationResult<Vec<Asset>> {
        let map = self.records.read().map_err(poisoned)?;
        let mut assets: Vec<Asset> = map
            .iter()
            .filter_map(|(k, r)| if k.tenant_id == tenant_id { Some(r.asset.clone()) } else { None })
            .collect();
        assets.sort_by(|a, b| a.asset_number.cmp(&b.asset_number));
        Ok(assets)
    }

    fn ledger(&self, tenant_id: TenantId, asset_id: AssetId) -> DepreciationResult<AssetLedger> {
        self.read_record(tenant_id, asset_id, |r| r.ledger.clone())
    }

    fn has_entry(&self, tenant_id: TenantId, asset_id: AssetId, period: Period) -> DepreciationResult<bool> {
        self.read_record(tenant_id, asset_id, |r| r.ledger.has_entry(period))
    }

    fn record(&self, tenant_id: TenantId, asset_id: AssetId, command: RecordCharge) -> DepreciationResult<LedgerEntry> {
        let entry_id = command.entry_id;
        self.with_record(tenant_id, asset_id, |record| {
            record.execute(&LedgerCommand::RecordCharge(command))?;
            record
                .ledger
                .entry(entry_id)
                .cloned()
                .ok_or(DepreciationError::EntryNotFound(entry_id))
        })
    }

    fn attach_journal_entry(
        &self,
        tenant_id: TenantId,
        asset_id: AssetId,
        entry_id: LedgerEntryId,
        journal_entry_id: JournalEntryId,
        share: PostedShare,
    ) -> DepreciationResult<()> {
        self.with_record(tenant_id, asset_id, |record| {
            record.execute(&LedgerCommand::AttachJournalEntry(AttachJournalEntry {
                tenant_id,
                entry_id,
                journal_entry_id,
                share,
                occurred_at: chrono::Utc::now(),
            }))
        })
    }

    fn reverse(&self, tenant_id: TenantId, asset_id: AssetId, command: ReverseCharge) -> DepreciationResult<LedgerEntry> {
        let entry_id = command.entry_id;
        self.with_record(tenant_id, asset_id, |record| {
            record.execute(&LedgerCommand::ReverseCharge(command))?;
            record
                .ledger
                .entry(entry_id)
                .cloned()
                .ok_or(DepreciationError::EntryNotFound(entry_id))
        })
    }

    fn entries_for_period(&self, tenant_id: TenantId, period: Period) -> DepreciationResult<Vec<LedgerEntry>> {
        let map = self.records.read().map_err(poisoned)?;
        let mut entries: Vec<(String, LedgerEntry)> = map
            .iter()
            .filter(|(k, _)| k.tenant_id == tenant_id)
            .filter_map(|(_, r)| {
                r.ledger
                    .active_entry_for(period)
                    .map(|e| (r.asset.asset_number.clone(), e.clone()))
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries.into_iter().map(|(_, e)| e).collect())
    }

    fn history(&self, tenant_id: TenantId, asset_id: AssetId) -> DepreciationResult<AssetHistory> {
        self.read_record(tenant_id, asset_id, |r| AssetHistory {
            asset: r.asset.clone(),
            balances: r.asset.balances(),
            entries: r.ledger.entries().to_vec(),
        })
    }

    fn audit_stream(&self, tenant_id: TenantId, asset_id: AssetId) -> DepreciationResult<Vec<LedgerEnvelope>> {
        self.read_record(tenant_id, asset_id, |r| r.audit.clone())
    }
}
