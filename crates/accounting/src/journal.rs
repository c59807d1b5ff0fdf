use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use assetbook_core::{Aggregate, AggregateId, AggregateRoot, BranchId, Money, TenantId};
use assetbook_events::Event;

use crate::error::PostingError;

/// High-level account kind (determines normal balance side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

/// Account identifier + metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    pub code: String, // e.g. "530100"
    pub name: String, // e.g. "Depreciation expense - vehicles"
    pub kind: AccountKind,
}

impl Account {
    pub fn new(code: impl Into<String>, name: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            kind,
        }
    }
}

/// Journal entry identifier assigned by the accounting subsystem.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JournalEntryId(pub Uuid);

impl JournalEntryId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JournalEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for JournalEntryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// One side of a journal entry (immutable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntryLine {
    pub account: Account,
    /// Positive amount.
    pub amount: Money,
    /// true = debit, false = credit.
    pub is_debit: bool,
    pub cost_center: Option<String>,
    pub description: Option<String>,
}

impl JournalEntryLine {
    pub fn debit(account: Account, amount: Money) -> Self {
        Self {
            account,
            amount,
            is_debit: true,
            cost_center: None,
            description: None,
        }
    }

    pub fn credit(account: Account, amount: Money) -> Self {
        Self {
            account,
            amount,
            is_debit: false,
            cost_center: None,
            description: None,
        }
    }

    pub fn with_cost_center(mut self, cost_center: Option<String>) -> Self {
        self.cost_center = cost_center;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Same account and amount on the opposite side.
    pub fn mirrored(&self) -> Self {
        Self {
            is_debit: !self.is_debit,
            ..self.clone()
        }
    }
}

/// A journal entry as requested by a caller, before the accounting subsystem accepts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntryDraft {
    pub tenant_id: TenantId,
    pub branch_id: BranchId,
    pub entry_date: NaiveDate,
    pub description: String,
    /// Source document type, e.g. "asset_depreciation".
    pub source: String,
    pub lines: Vec<JournalEntryLine>,
}

impl JournalEntryDraft {
    pub fn total_debit(&self) -> Money {
        self.lines.iter().filter(|l| l.is_debit).map(|l| l.amount).sum()
    }

    pub fn total_credit(&self) -> Money {
        self.lines.iter().filter(|l| !l.is_debit).map(|l| l.amount).sum()
    }

    /// Double-entry validation: non-empty, positive lines, debits equal credits.
    pub fn validate(&self) -> Result<(), PostingError> {
        validate_lines(&self.lines)
    }
}

fn validate_lines(lines: &[JournalEntryLine]) -> Result<(), PostingError> {
    if lines.is_empty() {
        return Err(PostingError::EmptyEntry);
    }

    let mut debit = Money::ZERO;
    let mut credit = Money::ZERO;
    for line in lines {
        if !line.amount.is_positive() {
            return Err(PostingError::NonPositiveAmount);
        }
        if line.is_debit {
            debit += line.amount;
        } else {
            credit += line.amount;
        }
    }

    if debit != credit {
        return Err(PostingError::Unbalanced { debit, credit });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalStatus {
    Posted,
    /// Fully offset by reversing entries.
    Cancelled,
}

/// A journal entry accepted by the accounting subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: JournalEntryId,
    pub tenant_id: TenantId,
    pub branch_id: BranchId,
    pub entry_date: NaiveDate,
    pub description: String,
    pub source: String,
    pub lines: Vec<JournalEntryLine>,
    pub status: JournalStatus,
    /// Set on reversing entries: the entry they offset.
    pub reverses: Option<JournalEntryId>,
    /// Running total of amounts offset by later reversing entries.
    pub reversed_amount: Money,
}

impl JournalEntry {
    pub fn total_debit(&self) -> Money {
        self.lines.iter().filter(|l| l.is_debit).map(|l| l.amount).sum()
    }

    pub fn remaining(&self) -> Money {
        self.total_debit() - self.reversed_amount
    }
}

/// Journal identifier (one journal per tenant).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JournalId(pub AggregateId);

impl JournalId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for JournalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Journal (double-entry book of one tenant).
///
/// Holds entries so that cancellations can be validated against what was posted.
/// Account balances are not tracked here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    id: JournalId,
    tenant_id: Option<TenantId>,
    entries: BTreeMap<JournalEntryId, JournalEntry>,
    version: u64,
    created: bool,
}

impl Journal {
    /// Empty aggregate for rehydration.
    pub fn empty(id: JournalId) -> Self {
        Self {
            id,
            tenant_id: None,
            entries: BTreeMap::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> JournalId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn entry(&self, id: JournalEntryId) -> Option<&JournalEntry> {
        self.entries.get(&id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.values()
    }
}

impl AggregateRoot for Journal {
    type Id = JournalId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PostJournalEntry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostJournalEntry {
    pub entry_id: JournalEntryId,
    pub draft: JournalEntryDraft,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReverseJournalEntry (partial or full offset of a posted entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseJournalEntry {
    pub tenant_id: TenantId,
    pub reversal_id: JournalEntryId,
    pub original_id: JournalEntryId,
    /// Lines as they appear on the original; the reversing entry mirrors them.
    pub lines: Vec<JournalEntryLine>,
    pub reversal_date: NaiveDate,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalCommand {
    PostJournalEntry(PostJournalEntry),
    ReverseJournalEntry(ReverseJournalEntry),
}

/// Event: JournalEntryPosted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntryPosted {
    pub entry: JournalEntry,
    pub occurred_at: DateTime<Utc>,
}

/// Event: JournalEntryReversed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntryReversed {
    pub original_id: JournalEntryId,
    pub reversal: JournalEntry,
    pub amount: Money,
    pub fully_cancelled: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalEvent {
    JournalEntryPosted(JournalEntryPosted),
    JournalEntryReversed(JournalEntryReversed),
}

impl Event for JournalEvent {
    fn event_type(&self) -> &'static str {
        match self {
            JournalEvent::JournalEntryPosted(_) => "accounting.journal.entry_posted",
            JournalEvent::JournalEntryReversed(_) => "accounting.journal.entry_reversed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            JournalEvent::JournalEntryPosted(e) => e.occurred_at,
            JournalEvent::JournalEntryReversed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Journal {
    type Command = JournalCommand;
    type Event = JournalEvent;
    type Error = PostingError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            JournalEvent::JournalEntryPosted(e) => {
                if self.tenant_id.is_none() {
                    self.tenant_id = Some(e.entry.tenant_id);
                    self.created = true;
                }
                self.entries.insert(e.entry.id, e.entry.clone());
            }
            JournalEvent::JournalEntryReversed(e) => {
                if let Some(original) = self.entries.get_mut(&e.original_id) {
                    original.reversed_amount += e.amount;
                    if e.fully_cancelled {
                        original.status = JournalStatus::Cancelled;
                    }
                }
                self.entries.insert(e.reversal.id, e.reversal.clone());
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            JournalCommand::PostJournalEntry(cmd) => self.handle_post(cmd),
            JournalCommand::ReverseJournalEntry(cmd) => self.handle_reverse(cmd),
        }
    }
}

impl Journal {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), PostingError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(PostingError::TenantMismatch);
        }
        Ok(())
    }

    fn handle_post(&self, cmd: &PostJournalEntry) -> Result<Vec<JournalEvent>, PostingError> {
        self.ensure_tenant(cmd.draft.tenant_id)?;
        cmd.draft.validate()?;

        let draft = cmd.draft.clone();
        Ok(vec![JournalEvent::JournalEntryPosted(JournalEntryPosted {
            entry: JournalEntry {
                id: cmd.entry_id,
                tenant_id: draft.tenant_id,
                branch_id: draft.branch_id,
                entry_date: draft.entry_date,
                description: draft.description,
                source: draft.source,
                lines: draft.lines,
                status: JournalStatus::Posted,
                reverses: None,
                reversed_amount: Money::ZERO,
            },
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reverse(&self, cmd: &ReverseJournalEntry) -> Result<Vec<JournalEvent>, PostingError> {
        self.ensure_tenant(cmd.tenant_id)?;
        let original = self
            .entries
            .get(&cmd.original_id)
            .ok_or(PostingError::NotFound(cmd.original_id))?;
        if original.status == JournalStatus::Cancelled {
            return Err(PostingError::AlreadyCancelled(cmd.original_id));
        }

        validate_lines(&cmd.lines)?;
        let amount: Money = cmd.lines.iter().filter(|l| l.is_debit).map(|l| l.amount).sum();
        let remaining = original.remaining();
        if amount > remaining {
            return Err(PostingError::CancellationExceedsEntry {
                entry: cmd.original_id,
                requested: amount,
                remaining,
            });
        }

        let reversal = JournalEntry {
            id: cmd.reversal_id,
            tenant_id: cmd.tenant_id,
            branch_id: original.branch_id,
            entry_date: cmd.reversal_date,
            description: format!("Reversal of {}: {}", original.id, cmd.reason),
            source: original.source.clone(),
            lines: cmd.lines.iter().map(JournalEntryLine::mirrored).collect(),
            status: JournalStatus::Posted,
            reverses: Some(original.id),
            reversed_amount: Money::ZERO,
        };

        Ok(vec![JournalEvent::JournalEntryReversed(JournalEntryReversed {
            original_id: cmd.original_id,
            reversal,
            amount,
            fully_cancelled: amount == remaining,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_journal() -> Journal {
        Journal::empty(JournalId::new(AggregateId::new()))
    }

    fn expense() -> Account {
        Account::new("530100", "Depreciation expense", AccountKind::Expense)
    }

    fn accumulated() -> Account {
        Account::new("160100", "Accumulated depreciation", AccountKind::Asset)
    }

    fn draft(tenant_id: TenantId, debit: Money, credit: Money) -> JournalEntryDraft {
        JournalEntryDraft {
            tenant_id,
            branch_id: BranchId::new(),
            entry_date: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            description: "Depreciation 2025-01".to_string(),
            source: "asset_depreciation".to_string(),
            lines: vec![
                JournalEntryLine::debit(expense(), debit),
                JournalEntryLine::credit(accumulated(), credit),
            ],
        }
    }

    fn post(journal: &mut Journal, draft: JournalEntryDraft) -> JournalEntryId {
        let entry_id = JournalEntryId::new();
        journal
            .execute(&JournalCommand::PostJournalEntry(PostJournalEntry {
                entry_id,
                draft,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        entry_id
    }

    #[test]
    fn balanced_entry_is_posted() {
        let mut journal = test_journal();
        let tenant_id = TenantId::new();
        let id = post(&mut journal, draft(tenant_id, Money::from_major(100), Money::from_major(100)));

        let entry = journal.entry(id).unwrap();
        assert_eq!(entry.status, JournalStatus::Posted);
        assert_eq!(entry.total_debit(), Money::from_major(100));
        assert_eq!(journal.version(), 1);
    }

    #[test]
    fn unbalanced_entry_is_rejected() {
        let journal = test_journal();
        let cmd = JournalCommand::PostJournalEntry(PostJournalEntry {
            entry_id: JournalEntryId::new(),
            draft: draft(TenantId::new(), Money::from_major(100), Money::from_major(90)),
            occurred_at: Utc::now(),
        });

        match journal.handle(&cmd).unwrap_err() {
            PostingError::Unbalanced { debit, credit } => {
                assert_eq!(debit, Money::from_major(100));
                assert_eq!(credit, Money::from_major(90));
            }
            other => panic!("expected unbalanced, got {other:?}"),
        }
    }

    #[test]
    fn entry_for_another_tenant_is_rejected() {
        let mut journal = test_journal();
        post(&mut journal, draft(TenantId::new(), Money::from_major(1), Money::from_major(1)));

        let cmd = JournalCommand::PostJournalEntry(PostJournalEntry {
            entry_id: JournalEntryId::new(),
            draft: draft(TenantId::new(), Money::from_major(1), Money::from_major(1)),
            occurred_at: Utc::now(),
        });
        assert_eq!(journal.handle(&cmd).unwrap_err(), PostingError::TenantMismatch);
    }

    #[test]
    fn partial_reversals_cancel_entry_once_fully_offset() {
        let mut journal = test_journal();
        let tenant_id = TenantId::new();
        let original = post(&mut journal, draft(tenant_id, Money::from_major(300), Money::from_major(300)));

        let reverse = |amount: Money| {
            JournalCommand::ReverseJournalEntry(ReverseJournalEntry {
                tenant_id,
                reversal_id: JournalEntryId::new(),
                original_id: original,
                lines: vec![
                    JournalEntryLine::debit(expense(), amount),
                    JournalEntryLine::credit(accumulated(), amount),
                ],
                reversal_date: NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
                reason: "asset disposed before period end".to_string(),
                occurred_at: Utc::now(),
            })
        };

        journal.execute(&reverse(Money::from_major(100))).unwrap();
        assert_eq!(journal.entry(original).unwrap().status, JournalStatus::Posted);
        assert_eq!(journal.entry(original).unwrap().remaining(), Money::from_major(200));

        let err = journal.handle(&reverse(Money::from_major(250))).unwrap_err();
        assert!(matches!(err, PostingError::CancellationExceedsEntry { .. }));

        journal.execute(&reverse(Money::from_major(200))).unwrap();
        assert_eq!(journal.entry(original).unwrap().status, JournalStatus::Cancelled);

        let err = journal.handle(&reverse(Money::from_minor(1))).unwrap_err();
        assert_eq!(err, PostingError::AlreadyCancelled(original));
    }

    #[test]
    fn reversing_entry_mirrors_lines() {
        let mut journal = test_journal();
        let tenant_id = TenantId::new();
        let original = post(&mut journal, draft(tenant_id, Money::from_major(10), Money::from_major(10)));
        let reversal_id = JournalEntryId::new();
        let lines = journal.entry(original).unwrap().lines.clone();

        journal
            .execute(&JournalCommand::ReverseJournalEntry(ReverseJournalEntry {
                tenant_id,
                reversal_id,
                original_id: original,
                lines,
                reversal_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                reason: "wrong useful life entered".to_string(),
                occurred_at: Utc::now(),
            }))
            .unwrap();

        let reversal = journal.entry(reversal_id).unwrap();
        assert_eq!(reversal.reverses, Some(original));
        assert!(!reversal.lines[0].is_debit);
        assert_eq!(reversal.lines[0].account, expense());
        assert!(reversal.lines[1].is_debit);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Every accepted entry nets to zero.
        #[test]
        fn posted_entries_net_to_zero(amounts in prop::collection::vec(1i64..1_000_000_000i64, 1..10)) {
            let mut journal = test_journal();
            let tenant_id = TenantId::new();
            for minor in amounts {
                let amount = Money::from_minor(minor);
                post(&mut journal, draft(tenant_id, amount, amount));
            }

            let mut net = Money::ZERO;
            for entry in journal.entries() {
                for line in &entry.lines {
                    if line.is_debit { net += line.amount } else { net -= line.amount }
                }
            }
            prop_assert_eq!(net, Money::ZERO);
        }
    }
}
