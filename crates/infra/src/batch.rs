//! Batch depreciation runs.
//!
//! One run covers one period for a selection of assets. Assets are processed
//! independently: a failing asset is reported and never stops its siblings.
//! Recorded charges are then posted as a single journal entry; a posting
//! failure is a batch-level warning and leaves the recorded entries in place,
//! unposted.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use assetbook_accounting::{AccountingGateway, JournalEntryId};
use assetbook_core::{Actor, Aggregate, BranchId, Money, TenantId};
use assetbook_depreciation::{
    Asset, AssetId, AssetLedger, DepreciationCalculator, DepreciationError, DepreciationResult,
    DepreciationStatus, ErrorCode, LedgerCommand, LedgerEntry, LedgerEntryId, LedgerEvent,
    LifecycleStatus, MethodKind, Period, PeriodInput, RecordCharge, ReverseCharge,
};

use crate::config::EngineConfig;
use crate::posting::{LedgerPostingAdapter, PostableCharge};
use crate::registry::{AssetSelection, Candidate};
use crate::reversal::{ReversalProcessor, ReversalRequest};
use crate::store::DepreciationStore;

/// Reason recorded when `force_recalculate` replaces an existing entry.
pub const FORCED_RECALCULATION_REASON: &str = "forced recalculation by depreciation run";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Replace an existing entry for the period. The replacement is computed
    /// first; the old entry is reversed only when it succeeds.
    pub force_recalculate: bool,
    /// Post recorded charges as one journal entry.
    pub auto_post: bool,
    /// Compute and report only; nothing is recorded or posted.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub tenant_id: TenantId,
    pub selection: AssetSelection,
    pub period_date: NaiveDate,
    /// Business date of the run; `period_date` may not be later.
    pub today: NaiveDate,
    pub options: BatchOptions,
    pub actor: Actor,
    /// Posting branch; falls back to the configured default.
    pub branch_id: Option<BranchId>,
    /// Units consumed this period, for units-of-production assets.
    pub units: BTreeMap<AssetId, i64>,
}

/// Why an asset produced no charge. Not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    Inactive { lifecycle: LifecycleStatus },
    Paused,
    NotYetInService { first_period: Period },
    AlreadyComputed,
    FullyDepreciated,
}

impl core::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SkipReason::Inactive { lifecycle } => write!(f, "asset is not active ({lifecycle:?})"),
            SkipReason::Paused => f.write_str("depreciation paused"),
            SkipReason::NotYetInService { first_period } => {
                write!(f, "not yet in service (depreciation starts {first_period})")
            }
            SkipReason::AlreadyComputed => f.write_str("already computed"),
            SkipReason::FullyDepreciated => f.write_str("fully depreciated"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedCharge {
    pub asset_id: AssetId,
    pub asset_number: String,
    /// `None` in a dry run.
    pub entry_id: Option<LedgerEntryId>,
    pub charge: Money,
    pub accumulated_after: Money,
    pub book_value_after: Money,
    /// The charge brought the asset to its depreciable base.
    pub completed: bool,
    /// An existing entry for the period was reversed first.
    pub recalculated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedAsset {
    pub asset_id: AssetId,
    pub asset_number: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedAsset {
    pub asset_id: AssetId,
    pub asset_number: Option<String>,
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub tenant_id: TenantId,
    pub period: Period,
    pub period_date: NaiveDate,
    pub dry_run: bool,
    pub posted: Vec<RecordedCharge>,
    pub skipped: Vec<SkippedAsset>,
    pub failed: Vec<FailedAsset>,
    pub total_charge: Money,
    pub journal_entry_id: Option<JournalEntryId>,
    /// Set when auto-posting failed (the recorded entries stay unposted) or
    /// when the journal entry could not be linked to every ledger entry.
    pub posting_warning: Option<String>,
}

impl BatchResult {
    fn new(request: &BatchRequest) -> Self {
        Self {
            tenant_id: request.tenant_id,
            period: Period::of(request.period_date),
            period_date: request.period_date,
            dry_run: request.options.dry_run,
            posted: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            total_charge: Money::ZERO,
            journal_entry_id: None,
            posting_warning: None,
        }
    }

    /// `1` when any asset failed, `2` when only posting failed, else `0`.
    pub fn exit_code(&self) -> i32 {
        if !self.failed.is_empty() {
            1
        } else if self.posting_warning.is_some() {
            2
        } else {
            0
        }
    }
}

enum AssetOutcome {
    Recorded {
        charge: RecordedCharge,
        entry: Option<LedgerEntry>,
    },
    Skipped(SkipReason),
}

/// Runs depreciation for one period over a selection of assets.
#[derive(Debug, Clone)]
pub struct BatchRunner<S, G> {
    store: S,
    posting: LedgerPostingAdapter<S, G>,
    reversal: ReversalProcessor<S, G>,
}

impl<S, G> BatchRunner<S, G>
where
    S: DepreciationStore + Clone,
    G: AccountingGateway + Clone,
{
    pub fn new(store: S, gateway: G, config: &EngineConfig) -> Self {
        let posting = LedgerPostingAdapter::new(store.clone(), gateway, config.posting.clone());
        let reversal = ReversalProcessor::new(store.clone(), posting.clone(), config.reversal);
        Self {
            store,
            posting,
            reversal,
        }
    }

    pub fn posting(&self) -> &LedgerPostingAdapter<S, G> {
        &self.posting
    }

    pub fn reversal(&self) -> &ReversalProcessor<S, G> {
        &self.reversal
    }

    /// Run one period. Only a future period date or a storage failure while
    /// selecting assets fails the run as a whole.
    pub fn run(&self, request: &BatchRequest) -> DepreciationResult<BatchResult> {
        if request.period_date > request.today {
            return Err(DepreciationError::invalid_period(format!(
                "period date {} is after {}",
                request.period_date, request.today
            )));
        }

        info!(
            tenant = %request.tenant_id,
            period = %Period::of(request.period_date),
            actor = %request.actor,
            force_recalculate = request.options.force_recalculate,
            auto_post = request.options.auto_post,
            dry_run = request.options.dry_run,
            "depreciation run started"
        );

        let mut result = BatchResult::new(request);
        let mut postable = Vec::new();

        for candidate in request.selection.resolve(&self.store, request.tenant_id)? {
            let asset = match candidate {
                Candidate::Found(asset) => asset,
                Candidate::Missing(asset_id) => {
                    let e = DepreciationError::AssetNotFound(asset_id);
                    warn!(tenant = %request.tenant_id, asset = %asset_id, error = %e, "asset failed");
                    result.failed.push(FailedAsset {
                        asset_id,
                        asset_number: None,
                        code: e.code(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            match self.process_asset(request, &asset) {
                Ok(AssetOutcome::Recorded { charge, entry }) => {
                    result.total_charge += charge.charge;
                    if let Some(entry) = entry {
                        postable.push(PostableCharge::new(&asset, &entry));
                    }
                    result.posted.push(charge);
                }
                Ok(AssetOutcome::Skipped(reason)) => {
                    debug!(
                        tenant = %request.tenant_id,
                        asset = %asset.id,
                        asset_number = %asset.asset_number,
                        reason = %reason,
                        "asset skipped"
                    );
                    result.skipped.push(SkippedAsset {
                        asset_id: asset.id,
                        asset_number: asset.asset_number.clone(),
                        reason,
                    });
                }
                Err(e) => {
                    warn!(
                        tenant = %request.tenant_id,
                        asset = %asset.id,
                        asset_number = %asset.asset_number,
                        code = %e.code(),
                        error = %e,
                        "asset failed"
                    );
                    result.failed.push(FailedAsset {
                        asset_id: asset.id,
                        asset_number: Some(asset.asset_number.clone()),
                        code: e.code(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if request.options.auto_post && !request.options.dry_run && !postable.is_empty() {
            match self
                .posting
                .post(request.tenant_id, request.branch_id, request.period_date, &postable)
            {
                Ok(outcome) => {
                    result.journal_entry_id = Some(outcome.journal_entry_id);
                    if !outcome.unattached.is_empty() {
                        result.posting_warning = Some(format!(
                            "journal entry {} posted but {} ledger entries could not be linked to it",
                            outcome.journal_entry_id,
                            outcome.unattached.len()
                        ));
                    }
                }
                Err(e) => {
                    warn!(
                        tenant = %request.tenant_id,
                        period = %result.period,
                        entries = postable.len(),
                        error = %e,
                        "posting failed; entries remain unposted"
                    );
                    result.posting_warning = Some(e.to_string());
                }
            }
        }

        info!(
            tenant = %request.tenant_id,
            period = %result.period,
            posted = result.posted.len(),
            skipped = result.skipped.len(),
            failed = result.failed.len(),
            total_charge = %result.total_charge,
            journal_entry = ?result.journal_entry_id,
            "depreciation run finished"
        );
        Ok(result)
    }

    fn process_asset(&self, request: &BatchRequest, asset: &Asset) -> DepreciationResult<AssetOutcome> {
        let period = Period::of(request.period_date);
        let force = request.options.force_recalculate;

        if asset.lifecycle_status != LifecycleStatus::Active {
            return Ok(AssetOutcome::Skipped(SkipReason::Inactive {
                lifecycle: asset.lifecycle_status,
            }));
        }

        let mut ledger = self.store.ledger(request.tenant_id, asset.id)?;
        let existing = ledger.active_entry_for(period).cloned();

        match asset.depreciation_status {
            DepreciationStatus::Paused => return Ok(AssetOutcome::Skipped(SkipReason::Paused)),
            DepreciationStatus::Completed if !(force && existing.is_some()) => {
                return Ok(AssetOutcome::Skipped(SkipReason::FullyDepreciated));
            }
            _ => {}
        }

        if period < asset.first_period() {
            return Ok(AssetOutcome::Skipped(SkipReason::NotYetInService {
                first_period: asset.first_period(),
            }));
        }

        // A forced recompute is rehearsed on the local ledger copy; the stored
        // entry is only reversed once the replacement is known to be valid.
        let replaced = match existing {
            Some(_) if !force => return Ok(AssetOutcome::Skipped(SkipReason::AlreadyComputed)),
            Some(entry) => {
                ledger.execute(&LedgerCommand::ReverseCharge(self.recalculation_reversal(request, &entry)))?;
                Some(entry)
            }
            None => None,
        };

        let method = DepreciationCalculator::method_of(asset)?;
        let units = request.units.get(&asset.id).copied();
        let charge = DepreciationCalculator::compute(
            asset,
            method,
            ledger.position(),
            &PeriodInput {
                period_date: request.period_date,
                today: request.today,
                units_consumed: units,
            },
        )?;
        if charge.is_zero() {
            return Ok(AssetOutcome::Skipped(SkipReason::FullyDepreciated));
        }

        let command = RecordCharge {
            tenant_id: request.tenant_id,
            entry_id: LedgerEntryId::new(),
            period_date: request.period_date,
            charge,
            units_consumed: match method.kind {
                MethodKind::UnitsOfProduction => units.and_then(|u| u64::try_from(u).ok()),
                _ => None,
            },
            original_cost: asset.original_cost,
            depreciable_base: asset.depreciable_base(),
            first_period: asset.first_period(),
            recorded_by: request.actor,
            recorded_at: Utc::now(),
        };

        let preview_entry = preview(&ledger, command.clone())?;
        let (entry, persisted) = if request.options.dry_run {
            (preview_entry, false)
        } else {
            if let Some(previous) = &replaced {
                self.reversal.reverse(&ReversalRequest {
                    tenant_id: request.tenant_id,
                    asset_id: asset.id,
                    entry_id: previous.id,
                    reversal_date: request.today,
                    today: request.today,
                    reason: FORCED_RECALCULATION_REASON.to_string(),
                    actor: request.actor,
                })?;
            }
            (self.store.record(request.tenant_id, asset.id, command)?, true)
        };

        Ok(AssetOutcome::Recorded {
            charge: RecordedCharge {
                asset_id: asset.id,
                asset_number: asset.asset_number.clone(),
                entry_id: persisted.then_some(entry.id),
                charge: entry.charge,
                accumulated_after: entry.accumulated_after,
                book_value_after: entry.book_value_after,
                completed: entry.accumulated_after >= asset.depreciable_base(),
                recalculated: replaced.is_some(),
            },
            entry: persisted.then_some(entry),
        })
    }

    fn recalculation_reversal(&self, request: &BatchRequest, entry: &LedgerEntry) -> ReverseCharge {
        ReverseCharge {
            tenant_id: request.tenant_id,
            entry_id: entry.id,
            reversal_date: request.today,
            today: request.today,
            reason: FORCED_RECALCULATION_REASON.to_string(),
            min_reason_len: self.reversal.policy().min_reason_len,
            reversed_by: request.actor,
            reversal_journal_entry: None,
            occurred_at: Utc::now(),
        }
    }
}

/// The entry a command would record, without recording it.
fn preview(ledger: &AssetLedger, command: RecordCharge) -> DepreciationResult<LedgerEntry> {
    let entry_id = command.entry_id;
    ledger
        .handle(&LedgerCommand::RecordCharge(command))?
        .into_iter()
        .find_map(|event| match event {
            LedgerEvent::ChargeRecorded(recorded) => Some(recorded.entry),
            _ => None,
        })
        .ok_or(DepreciationError::EntryNotFound(entry_id))
}
