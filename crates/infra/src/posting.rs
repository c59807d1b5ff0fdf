//! Turns recorded depreciation charges into journal entries.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use assetbook_accounting::{
    Account, AccountingGateway, CancellationRequest, JournalEntryDraft, JournalEntryId,
    JournalEntryLine, PostingError,
};
use assetbook_core::{BranchId, Money, TenantId};
use assetbook_depreciation::{
    Asset, AssetId, DepreciationError, DepreciationResult, LedgerEntry, LedgerEntryId, Period,
    PostedShare,
};

use crate::config::PostingConfig;
use crate::store::DepreciationStore;

const EXPENSE_ROLE: &str = "depreciation expense";
const ACCUMULATED_ROLE: &str = "accumulated depreciation";

/// One ledger entry's contribution to a journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostableCharge {
    pub asset_id: AssetId,
    pub entry_id: LedgerEntryId,
    pub category: String,
    pub cost_center: Option<String>,
    pub charge: Money,
}

impl PostableCharge {
    pub fn new(asset: &Asset, entry: &LedgerEntry) -> Self {
        Self {
            asset_id: asset.id,
            entry_id: entry.id,
            category: asset.category.clone(),
            cost_center: asset.cost_center.clone(),
            charge: entry.charge,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingOutcome {
    pub journal_entry_id: JournalEntryId,
    pub entries: usize,
    pub total: Money,
    /// Entries covered by the journal entry whose reference could not be
    /// written back. They read as unposted and must not be posted again.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unattached: Vec<LedgerEntryId>,
}

/// Posting adapter between the depreciation ledger and the accounting gateway.
#[derive(Debug, Clone)]
pub struct LedgerPostingAdapter<S, G> {
    store: S,
    gateway: G,
    config: PostingConfig,
}

impl<S, G> LedgerPostingAdapter<S, G>
where
    S: DepreciationStore,
    G: AccountingGateway,
{
    pub fn new(store: S, gateway: G, config: PostingConfig) -> Self {
        Self {
            store,
            gateway,
            config,
        }
    }

    pub fn config(&self) -> &PostingConfig {
        &self.config
    }

    fn expense_account(&self, category: &str) -> Result<Account, PostingError> {
        self.config.expense_for(category).ok_or_else(|| PostingError::MissingAccount {
            category: category.to_string(),
            role: EXPENSE_ROLE,
        })
    }

    fn accumulated_account(&self, category: &str) -> Result<Account, PostingError> {
        self.config.accumulated_for(category).ok_or_else(|| PostingError::MissingAccount {
            category: category.to_string(),
            role: ACCUMULATED_ROLE,
        })
    }

    /// Where `charge` lands in the journal entry `build_draft` produces.
    fn share_of(&self, charge: &PostableCharge) -> Result<PostedShare, PostingError> {
        Ok(PostedShare {
            expense_account: self.expense_account(&charge.category)?,
            accumulated_account: self.accumulated_account(&charge.category)?,
            cost_center: charge.cost_center.clone(),
        })
    }

    /// One balanced draft for the whole batch.
    ///
    /// Debits are grouped per (category, cost centre) on the category's expense
    /// account; credits per category on its accumulated-depreciation account.
    pub fn build_draft(
        &self,
        tenant_id: TenantId,
        branch_id: Option<BranchId>,
        period_date: NaiveDate,
        charges: &[PostableCharge],
    ) -> Result<JournalEntryDraft, PostingError> {
        if charges.is_empty() {
            return Err(PostingError::EmptyEntry);
        }
        let branch_id = branch_id
            .or(self.config.default_branch)
            .ok_or(PostingError::NoActiveBranch)?;
        let period = Period::of(period_date);

        let mut debits: BTreeMap<(&str, Option<&str>), Money> = BTreeMap::new();
        let mut credits: BTreeMap<&str, Money> = BTreeMap::new();
        for c in charges {
            *debits.entry((c.category.as_str(), c.cost_center.as_deref())).or_default() += c.charge;
            *credits.entry(c.category.as_str()).or_default() += c.charge;
        }

        let mut lines = Vec::with_capacity(debits.len() + credits.len());
        for ((category, cost_center), amount) in debits {
            lines.push(
                JournalEntryLine::debit(self.expense_account(category)?, amount)
                    .with_cost_center(cost_center.map(str::to_string))
                    .with_description(format!("{category} depreciation {period}")),
            );
        }
        for (category, amount) in credits {
            lines.push(
                JournalEntryLine::credit(self.accumulated_account(category)?, amount)
                    .with_description(format!("{category} accumulated depreciation {period}")),
            );
        }

        let draft = JournalEntryDraft {
            tenant_id,
            branch_id,
            entry_date: period_date,
            description: format!("{} {period}", self.config.description_prefix),
            source: self.config.source.clone(),
            lines,
        };
        draft.validate()?;
        Ok(draft)
    }

    /// Post the batch as one journal entry and write its id back onto every
    /// ledger entry. A posting failure leaves the ledger entries recorded and
    /// unposted. Once the journal entry exists, write-back failures no longer
    /// fail the call: they are logged and listed in `unattached`.
    pub fn post(
        &self,
        tenant_id: TenantId,
        branch_id: Option<BranchId>,
        period_date: NaiveDate,
        charges: &[PostableCharge],
    ) -> DepreciationResult<PostingOutcome> {
        let draft = self.build_draft(tenant_id, branch_id, period_date, charges)?;
        let total = draft.total_debit();
        let journal_entry_id = self.gateway.post(draft)?;

        let mut unattached = Vec::new();
        for c in charges {
            let attached = self
                .share_of(c)
                .map_err(DepreciationError::from)
                .and_then(|share| {
                    self.store
                        .attach_journal_entry(tenant_id, c.asset_id, c.entry_id, journal_entry_id, share)
                });
            if let Err(e) = attached {
                warn!(
                    tenant = %tenant_id,
                    asset = %c.asset_id,
                    entry = %c.entry_id,
                    journal_entry = %journal_entry_id,
                    error = %e,
                    "failed to attach journal entry to ledger entry"
                );
                unattached.push(c.entry_id);
            }
        }

        if unattached.is_empty() {
            info!(
                tenant = %tenant_id,
                journal_entry = %journal_entry_id,
                entries = charges.len(),
                total = %total,
                "depreciation posted"
            );
        } else {
            warn!(
                tenant = %tenant_id,
                journal_entry = %journal_entry_id,
                entries = charges.len(),
                unattached = unattached.len(),
                total = %total,
                "depreciation posted with unlinked ledger entries"
            );
        }
        Ok(PostingOutcome {
            journal_entry_id,
            entries: charges.len(),
            total,
            unattached,
        })
    }

    /// Post every un-reversed, unposted entry of the period in one journal
    /// entry. `None` when there is nothing to post.
    pub fn post_unposted(
        &self,
        tenant_id: TenantId,
        branch_id: Option<BranchId>,
        period_date: NaiveDate,
    ) -> DepreciationResult<Option<PostingOutcome>> {
        let mut charges = Vec::new();
        for entry in self
            .store
            .entries_for_period(tenant_id, Period::of(period_date))?
            .into_iter()
            .filter(|e| !e.is_posted())
        {
            let asset = self
                .store
                .get_asset(tenant_id, entry.asset_id)?
                .ok_or(DepreciationError::AssetNotFound(entry.asset_id))?;
            charges.push(PostableCharge::new(&asset, &entry));
        }

        if charges.is_empty() {
            info!(tenant = %tenant_id, period = %Period::of(period_date), "no unposted depreciation");
            return Ok(None);
        }
        self.post(tenant_id, branch_id, period_date, &charges).map(Some)
    }

    /// Withdraw one asset's share of a posted batch entry. The lines mirror the
    /// accounts and cost centre the charge was booked to. Returns the id of the
    /// reversing journal entry.
    pub fn cancel_share(
        &self,
        asset: &Asset,
        entry: &LedgerEntry,
        journal_entry_id: JournalEntryId,
        reversal_date: NaiveDate,
        reason: &str,
    ) -> Result<JournalEntryId, PostingError> {
        let share = match &entry.posted_share {
            Some(share) => share.clone(),
            // Attached without a recorded share: only the current mapping is known.
            None => self.share_of(&PostableCharge::new(asset, entry))?,
        };
        let description = format!("{} {}", asset.asset_number, entry.period);

        self.gateway.cancel(CancellationRequest {
            tenant_id: asset.tenant_id,
            journal_entry_id,
            lines: vec![
                JournalEntryLine::debit(share.expense_account, entry.charge)
                    .with_cost_center(share.cost_center)
                    .with_description(description.clone()),
                JournalEntryLine::credit(share.accumulated_account, entry.charge)
                    .with_description(description),
            ],
            reversal_date,
            reason: reason.to_string(),
        })
    }
}
