//! Undo of recorded depreciation periods.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use assetbook_accounting::AccountingGateway;
use assetbook_core::{Actor, Aggregate, Money, TenantId};
use assetbook_depreciation::{
    AssetId, DepreciationError, DepreciationResult, ErrorCode, LedgerCommand, LedgerEntry,
    LedgerEntryId, Period, ReverseCharge,
};

use crate::config::ReversalPolicy;
use crate::posting::LedgerPostingAdapter;
use crate::store::DepreciationStore;

/// A single reversal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalRequest {
    pub tenant_id: TenantId,
    pub asset_id: AssetId,
    pub entry_id: LedgerEntryId,
    pub reversal_date: NaiveDate,
    /// Business date of the request.
    pub today: NaiveDate,
    pub reason: String,
    pub actor: Actor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversedEntry {
    pub asset_id: AssetId,
    pub entry_id: LedgerEntryId,
    pub charge: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedReversal {
    pub asset_id: AssetId,
    pub entry_id: LedgerEntryId,
    pub code: ErrorCode,
    pub message: String,
}

/// Per-entry outcome of a whole-period reversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodReversalResult {
    pub period: Period,
    pub reversed: Vec<ReversedEntry>,
    pub failed: Vec<FailedReversal>,
}

impl PeriodReversalResult {
    pub fn total_reversed(&self) -> Money {
        self.reversed.iter().map(|r| r.charge).sum()
    }

    pub fn exit_code(&self) -> i32 {
        if self.failed.is_empty() { 0 } else { 1 }
    }
}

/// Reverses ledger entries: validates, cancels the journal share when the
/// entry was posted, then flags the entry and refreshes the asset.
#[derive(Debug, Clone)]
pub struct ReversalProcessor<S, G> {
    store: S,
    posting: LedgerPostingAdapter<S, G>,
    policy: ReversalPolicy,
}

impl<S, G> ReversalProcessor<S, G>
where
    S: DepreciationStore,
    G: AccountingGateway,
{
    pub fn new(store: S, posting: LedgerPostingAdapter<S, G>, policy: ReversalPolicy) -> Self {
        Self {
            store,
            posting,
            policy,
        }
    }

    pub fn policy(&self) -> ReversalPolicy {
        self.policy
    }

    /// Reverse one entry. Every failure is a hard error for this request and
    /// leaves the ledger untouched.
    pub fn reverse(&self, request: &ReversalRequest) -> DepreciationResult<LedgerEntry> {
        let asset = self
            .store
            .get_asset(request.tenant_id, request.asset_id)?
            .ok_or(DepreciationError::AssetNotFound(request.asset_id))?;
        let ledger = self.store.ledger(request.tenant_id, request.asset_id)?;

        let mut command = ReverseCharge {
            tenant_id: request.tenant_id,
            entry_id: request.entry_id,
            reversal_date: request.reversal_date,
            today: request.today,
            reason: request.reason.clone(),
            min_reason_len: self.policy.min_reason_len,
            reversed_by: request.actor,
            reversal_journal_entry: None,
            occurred_at: Utc::now(),
        };

        // Validate before touching the accounting side.
        ledger.handle(&LedgerCommand::ReverseCharge(command.clone()))?;
        let entry = ledger
            .entry(request.entry_id)
            .ok_or(DepreciationError::EntryNotFound(request.entry_id))?;

        if let Some(journal_entry_id) = entry.journal_entry {
            let reversal_journal = self
                .posting
                .cancel_share(&asset, entry, journal_entry_id, request.reversal_date, request.reason.trim())
                .map_err(|e| {
                    warn!(
                        tenant = %request.tenant_id,
                        asset = %request.asset_id,
                        journal_entry = %journal_entry_id,
                        error = %e,
                        "journal cancellation failed"
                    );
                    DepreciationError::PostingFailed(e)
                })?;
            command.reversal_journal_entry = Some(reversal_journal);
        }

        let reversed = self
            .store
            .reverse(request.tenant_id, request.asset_id, command)
            .map_err(|e| {
                if let Some(journal) = entry.journal_entry {
                    error!(
                        tenant = %request.tenant_id,
                        asset = %request.asset_id,
                        journal_entry = %journal,
                        error = %e,
                        "ledger reversal failed after journal cancellation"
                    );
                }
                e
            })?;

        info!(
            tenant = %request.tenant_id,
            asset = %request.asset_id,
            entry = %reversed.id,
            period = %reversed.period,
            charge = %reversed.charge,
            actor = %request.actor,
            "depreciation reversed"
        );
        Ok(reversed)
    }

    /// Reverse every active entry of a period, each independently.
    pub fn reverse_period(
        &self,
        tenant_id: TenantId,
        period_date: NaiveDate,
        today: NaiveDate,
        reason: &str,
        actor: Actor,
    ) -> DepreciationResult<PeriodReversalResult> {
        let period = Period::of(period_date);
        let mut result = PeriodReversalResult {
            period,
            reversed: Vec::new(),
            failed: Vec::new(),
        };

        for entry in self.store.entries_for_period(tenant_id, period)? {
            let request = ReversalRequest {
                tenant_id,
                asset_id: entry.asset_id,
                entry_id: entry.id,
                reversal_date: today,
                today,
                reason: reason.to_string(),
                actor,
            };
            match self.reverse(&request) {
                Ok(reversed) => result.reversed.push(ReversedEntry {
                    asset_id: reversed.asset_id,
                    entry_id: reversed.id,
                    charge: reversed.charge,
                }),
                Err(e) => {
                    warn!(tenant = %tenant_id, asset = %entry.asset_id, error = %e, "period reversal failed for entry");
                    result.failed.push(FailedReversal {
                        asset_id: entry.asset_id,
                        entry_id: entry.id,
                        code: e.code(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            tenant = %tenant_id,
            period = %period,
            reversed = result.reversed.len(),
            failed = result.failed.len(),
            "period reversal finished"
        );
        Ok(result)
    }
}
