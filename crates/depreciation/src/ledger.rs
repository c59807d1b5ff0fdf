//! Per-asset depreciation ledger (append-only, event-sourced).
//!
//! One entry per (asset, period) charge. Financial fields are never updated in
//! place: the only post-creation mutations are attaching the journal-entry
//! reference (once) and flagging the entry reversed (once). Running balances
//! are a fold over the un-reversed entries in period order.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use assetbook_accounting::{Account, JournalEntryId};
use assetbook_core::{Actor, Aggregate, AggregateRoot, DomainError, Money, TenantId};
use assetbook_events::Event;

use crate::asset::AssetId;
use crate::calculator::LedgerPosition;
use crate::error::DepreciationError;
use crate::period::Period;

/// Ledger entry identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerEntryId(pub Uuid);

impl LedgerEntryId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for LedgerEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for LedgerEntryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for LedgerEntryId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::invalid_id(format!("LedgerEntryId: {e}")))
    }
}

/// Audit record of an undone charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalRecord {
    pub reversal_date: NaiveDate,
    pub reason: String,
    pub reversed_by: Actor,
    pub reversed_at: DateTime<Utc>,
    /// Reversing journal entry, when the charge had been posted.
    pub reversal_journal_entry: Option<JournalEntryId>,
}

/// Accounts and cost centre a posted charge was booked to. Cancelling the
/// charge mirrors these, whatever the asset's mapping has become since.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedShare {
    pub expense_account: Account,
    pub accumulated_account: Account,
    pub cost_center: Option<String>,
}

/// One period's depreciation charge for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub tenant_id: TenantId,
    pub asset_id: AssetId,
    pub period_date: NaiveDate,
    pub period: Period,
    pub charge: Money,
    pub accumulated_before: Money,
    pub accumulated_after: Money,
    pub book_value_after: Money,
    pub units_consumed: Option<u64>,
    pub journal_entry: Option<JournalEntryId>,
    /// Set together with `journal_entry`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_share: Option<PostedShare>,
    pub recorded_by: Actor,
    pub recorded_at: DateTime<Utc>,
    pub reversal: Option<ReversalRecord>,
}

impl LedgerEntry {
    pub fn is_posted(&self) -> bool {
        self.journal_entry.is_some()
    }

    pub fn is_reversed(&self) -> bool {
        self.reversal.is_some()
    }
}

/// Aggregate root: the depreciation ledger of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLedger {
    asset_id: AssetId,
    tenant_id: Option<TenantId>,
    /// Recording order; reversed entries stay in place.
    entries: Vec<LedgerEntry>,
    version: u64,
}

impl AssetLedger {
    /// Empty aggregate for rehydration.
    pub fn empty(asset_id: AssetId) -> Self {
        Self {
            asset_id,
            tenant_id: None,
            entries: Vec::new(),
            version: 0,
        }
    }

    pub fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    /// Full history, reversed entries included.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Un-reversed entries, in period order.
    pub fn active_entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter().filter(|e| !e.is_reversed())
    }

    pub fn entry(&self, id: LedgerEntryId) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn last_active(&self) -> Option<&LedgerEntry> {
        self.active_entries().last()
    }

    pub fn active_entry_for(&self, period: Period) -> Option<&LedgerEntry> {
        self.active_entries().find(|e| e.period == period)
    }

    pub fn has_entry(&self, period: Period) -> bool {
        self.active_entry_for(period).is_some()
    }

    /// Accumulated depreciation: sum of un-reversed charges.
    pub fn accumulated(&self) -> Money {
        self.active_entries().map(|e| e.charge).sum()
    }

    pub fn position(&self) -> LedgerPosition {
        LedgerPosition {
            accumulated_before: self.accumulated(),
            periods_charged: self.active_entries().count() as u32,
        }
    }
}

impl AggregateRoot for AssetLedger {
    type Id = AssetId;

    fn id(&self) -> &Self::Id {
        &self.asset_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RecordCharge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCharge {
    pub tenant_id: TenantId,
    pub entry_id: LedgerEntryId,
    pub period_date: NaiveDate,
    pub charge: Money,
    pub units_consumed: Option<u64>,
    pub original_cost: Money,
    pub depreciable_base: Money,
    pub first_period: Period,
    pub recorded_by: Actor,
    pub recorded_at: DateTime<Utc>,
}

/// Command: AttachJournalEntry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachJournalEntry {
    pub tenant_id: TenantId,
    pub entry_id: LedgerEntryId,
    pub journal_entry_id: JournalEntryId,
    pub share: PostedShare,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReverseCharge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseCharge {
    pub tenant_id: TenantId,
    pub entry_id: LedgerEntryId,
    pub reversal_date: NaiveDate,
    /// Business date of the request; the reversal date may not be later.
    pub today: NaiveDate,
    pub reason: String,
    pub min_reason_len: usize,
    pub reversed_by: Actor,
    pub reversal_journal_entry: Option<JournalEntryId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCommand {
    RecordCharge(RecordCharge),
    AttachJournalEntry(AttachJournalEntry),
    ReverseCharge(ReverseCharge),
}

/// Event: ChargeRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRecorded {
    pub entry: LedgerEntry,
}

/// Event: JournalEntryAttached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntryAttached {
    pub tenant_id: TenantId,
    pub asset_id: AssetId,
    pub entry_id: LedgerEntryId,
    pub journal_entry_id: JournalEntryId,
    pub share: PostedShare,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ChargeReversed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeReversed {
    pub tenant_id: TenantId,
    pub asset_id: AssetId,
    pub entry_id: LedgerEntryId,
    pub reversal: ReversalRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    ChargeRecorded(ChargeRecorded),
    JournalEntryAttached(JournalEntryAttached),
    ChargeReversed(ChargeReversed),
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::ChargeRecorded(_) => "assets.depreciation.charge_recorded",
            LedgerEvent::JournalEntryAttached(_) => "assets.depreciation.journal_entry_attached",
            LedgerEvent::ChargeReversed(_) => "assets.depreciation.charge_reversed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::ChargeRecorded(e) => e.entry.recorded_at,
            LedgerEvent::JournalEntryAttached(e) => e.occurred_at,
            LedgerEvent::ChargeReversed(e) => e.reversal.reversed_at,
        }
    }

    fn actor(&self) -> Option<Actor> {
        match self {
            LedgerEvent::ChargeRecorded(e) => Some(e.entry.recorded_by),
            LedgerEvent::JournalEntryAttached(_) => None,
            LedgerEvent::ChargeReversed(e) => Some(e.reversal.reversed_by),
        }
    }
}

impl Aggregate for AssetLedger {
    type Command = LedgerCommand;
    type Event = LedgerEvent;
    type Error = DepreciationError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LedgerEvent::ChargeRecorded(e) => {
                if self.tenant_id.is_none() {
                    self.tenant_id = Some(e.entry.tenant_id);
                }
                self.entries.push(e.entry.clone());
            }
            LedgerEvent::JournalEntryAttached(e) => {
                if let Some(entry) = self.entries.iter_mut().find(|x| x.id == e.entry_id) {
                    entry.journal_entry = Some(e.journal_entry_id);
                    entry.posted_share = Some(e.share.clone());
                }
            }
            LedgerEvent::ChargeReversed(e) => {
                if let Some(entry) = self.entries.iter_mut().find(|x| x.id == e.entry_id) {
                    entry.reversal = Some(e.reversal.clone());
                }
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LedgerCommand::RecordCharge(cmd) => self.handle_record(cmd),
            LedgerCommand::AttachJournalEntry(cmd) => self.handle_attach(cmd),
            LedgerCommand::ReverseCharge(cmd) => self.handle_reverse(cmd),
        }
    }
}

impl AssetLedger {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DepreciationError> {
        match self.tenant_id {
            Some(t) if t != tenant_id => Err(DomainError::invariant("tenant mismatch").into()),
            _ => Ok(()),
        }
    }

    fn existing(&self, entry_id: LedgerEntryId) -> Result<&LedgerEntry, DepreciationError> {
        self.entry(entry_id)
            .ok_or(DepreciationError::EntryNotFound(entry_id))
    }

    fn handle_record(&self, cmd: &RecordCharge) -> Result<Vec<LedgerEvent>, DepreciationError> {
        self.ensure_tenant(cmd.tenant_id)?;

        if !cmd.charge.is_positive() {
            return Err(DomainError::validation("charge must be positive").into());
        }

        let period = Period::of(cmd.period_date);
        if self.has_entry(period) {
            return Err(DepreciationError::DuplicatePeriod {
                asset: self.asset_id,
                period,
            });
        }

        // Each period's "before" must be the previous period's "after".
        match self.last_active() {
            Some(last) if period < last.period => {
                return Err(DepreciationError::invalid_period(format!(
                    "period {period} precedes last recorded period {}",
                    last.period
                )));
            }
            Some(last) if !period.is_next_after(last.period) => {
                return Err(DepreciationError::invalid_period(format!(
                    "period {period} skips uncomputed periods after {}",
                    last.period
                )));
            }
            None if period < cmd.first_period => {
                return Err(DepreciationError::invalid_period(format!(
                    "period {period} is before depreciation start {}",
                    cmd.first_period
                )));
            }
            None if period != cmd.first_period => {
                return Err(DepreciationError::invalid_period(format!(
                    "period {period} skips uncomputed periods from {}",
                    cmd.first_period
                )));
            }
            _ => {}
        }

        let accumulated_before = self.accumulated();
        let accumulated_after = accumulated_before + cmd.charge;
        if accumulated_after > cmd.depreciable_base {
            return Err(DomainError::invariant(format!(
                "accumulated depreciation {accumulated_after} would exceed depreciable base {}",
                cmd.depreciable_base
            ))
            .into());
        }

        Ok(vec![LedgerEvent::ChargeRecorded(ChargeRecorded {
            entry: LedgerEntry {
                id: cmd.entry_id,
                tenant_id: cmd.tenant_id,
                asset_id: self.asset_id,
                period_date: cmd.period_date,
                period,
                charge: cmd.charge,
                accumulated_before,
                accumulated_after,
                book_value_after: cmd.original_cost - accumulated_after,
                units_consumed: cmd.units_consumed,
                journal_entry: None,
                posted_share: None,
                recorded_by: cmd.recorded_by,
                recorded_at: cmd.recorded_at,
                reversal: None,
            },
        })])
    }

    fn handle_attach(
        &self,
        cmd: &AttachJournalEntry,
    ) -> Result<Vec<LedgerEvent>, DepreciationError> {
        self.ensure_tenant(cmd.tenant_id)?;
        let entry = self.existing(cmd.entry_id)?;

        if entry.is_reversed() {
            return Err(DomainError::conflict(format!("entry {} is reversed", entry.id)).into());
        }
        match entry.journal_entry {
            Some(existing) if existing == cmd.journal_entry_id => return Ok(vec![]),
            Some(existing) => {
                return Err(DomainError::conflict(format!(
                    "entry {} is already posted to journal entry {existing}",
                    entry.id
                ))
                .into());
            }
            None => {}
        }

        Ok(vec![LedgerEvent::JournalEntryAttached(JournalEntryAttached {
            tenant_id: cmd.tenant_id,
            asset_id: self.asset_id,
            entry_id: cmd.entry_id,
            journal_entry_id: cmd.journal_entry_id,
            share: cmd.share.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reverse(&self, cmd: &ReverseCharge) -> Result<Vec<LedgerEvent>, DepreciationError> {
        self.ensure_tenant(cmd.tenant_id)?;

        let reason = cmd.reason.trim();
        if reason.chars().count() < cmd.min_reason_len {
            return Err(DepreciationError::invalid_reversal(format!(
                "reason must be at least {} characters",
                cmd.min_reason_len
            )));
        }

        let entry = self.existing(cmd.entry_id)?;
        if entry.is_reversed() {
            return Err(DepreciationError::invalid_reversal(format!(
                "entry {} is already reversed",
                entry.id
            )));
        }
        if cmd.reversal_date < entry.period_date {
            return Err(DepreciationError::invalid_reversal(format!(
                "reversal date {} precedes period date {}",
                cmd.reversal_date, entry.period_date
            )));
        }
        if cmd.reversal_date > cmd.today {
            return Err(DepreciationError::invalid_reversal(format!(
                "reversal date {} is in the future",
                cmd.reversal_date
            )));
        }
        if let Some(last) = self.last_active() {
            if last.id != entry.id {
                return Err(DepreciationError::invalid_reversal(format!(
                    "later period {} is still active; reverse it first",
                    last.period
                )));
            }
        }

        Ok(vec![LedgerEvent::ChargeReversed(ChargeReversed {
            tenant_id: cmd.tenant_id,
            asset_id: self.asset_id,
            entry_id: entry.id,
            reversal: ReversalRecord {
                reversal_date: cmd.reversal_date,
                reason: reason.to_string(),
                reversed_by: cmd.reversed_by,
                reversed_at: cmd.occurred_at,
                reversal_journal_entry: cmd.reversal_journal_entry,
            },
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetbook_accounting::AccountKind;
    use assetbook_core::AggregateId;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn month_end(index: u32) -> NaiveDate {
        // 2025-01-31, 2025-02-28, ...
        let first = date(2025, 1, 1)
            .checked_add_months(chrono::Months::new(index + 1))
            .unwrap();
        first.pred_opt().unwrap()
    }

    struct Fixture {
        tenant_id: TenantId,
        ledger: AssetLedger,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                tenant_id: TenantId::new(),
                ledger: AssetLedger::empty(AssetId::new(AggregateId::new())),
            }
        }

        fn record_cmd(&self, period_date: NaiveDate, charge: Money) -> LedgerCommand {
            LedgerCommand::RecordCharge(RecordCharge {
                tenant_id: self.tenant_id,
                entry_id: LedgerEntryId::new(),
                period_date,
                charge,
                units_consumed: None,
                original_cost: Money::from_major(12_000),
                depreciable_base: Money::from_major(12_000),
                first_period: Period::of(date(2025, 1, 1)),
                recorded_by: Actor::ScheduledSystem,
                recorded_at: Utc::now(),
            })
        }

        fn record(&mut self, period_date: NaiveDate, charge: Money) -> LedgerEntry {
            let cmd = self.record_cmd(period_date, charge);
            let events = self.ledger.execute(&cmd).unwrap();
            match &events[0] {
                LedgerEvent::ChargeRecorded(e) => e.entry.clone(),
                other => panic!("unexpected event {other:?}"),
            }
        }

        fn reverse_cmd(&self, entry_id: LedgerEntryId, reversal_date: NaiveDate, reason: &str) -> LedgerCommand {
            LedgerCommand::ReverseCharge(ReverseCharge {
                tenant_id: self.tenant_id,
                entry_id,
                reversal_date,
                today: date(2026, 1, 1),
                reason: reason.to_string(),
                min_reason_len: 10,
                reversed_by: Actor::ScheduledSystem,
                reversal_journal_entry: None,
                occurred_at: Utc::now(),
            })
        }
    }

    #[test]
    fn records_chain_before_and_after() {
        let mut fx = Fixture::new();
        let first = fx.record(month_end(0), Money::from_major(1_000));
        let second = fx.record(month_end(1), Money::from_major(1_000));

        assert_eq!(first.accumulated_before, Money::ZERO);
        assert_eq!(second.accumulated_before, first.accumulated_after);
        assert_eq!(second.accumulated_after, Money::from_major(2_000));
        assert_eq!(second.book_value_after, Money::from_major(10_000));
        assert_eq!(fx.ledger.accumulated(), Money::from_major(2_000));
        assert_eq!(fx.ledger.version(), 2);
    }

    #[test]
    fn second_charge_in_same_period_is_duplicate() {
        let mut fx = Fixture::new();
        fx.record(date(2025, 1, 15), Money::from_major(1_000));

        let err = fx
            .ledger
            .handle(&fx.record_cmd(date(2025, 1, 31), Money::from_major(1_000)))
            .unwrap_err();
        assert!(matches!(err, DepreciationError::DuplicatePeriod { .. }));
    }

    #[test]
    fn skipping_a_period_is_rejected() {
        let mut fx = Fixture::new();
        fx.record(month_end(0), Money::from_major(1_000));

        let err = fx
            .ledger
            .handle(&fx.record_cmd(month_end(2), Money::from_major(1_000)))
            .unwrap_err();
        assert!(matches!(err, DepreciationError::InvalidPeriod(msg) if msg.contains("skips")));
    }

    #[test]
    fn first_charge_must_be_start_period() {
        let fx = Fixture::new();
        let err = fx
            .ledger
            .handle(&fx.record_cmd(date(2024, 12, 31), Money::from_major(1_000)))
            .unwrap_err();
        assert!(matches!(err, DepreciationError::InvalidPeriod(msg) if msg.contains("before depreciation start")));

        let err = fx
            .ledger
            .handle(&fx.record_cmd(month_end(1), Money::from_major(1_000)))
            .unwrap_err();
        assert!(matches!(err, DepreciationError::InvalidPeriod(_)));
    }

    #[test]
    fn charge_cannot_exceed_depreciable_base() {
        let mut fx = Fixture::new();
        fx.record(month_end(0), Money::from_major(11_500));
        let err = fx
            .ledger
            .handle(&fx.record_cmd(month_end(1), Money::from_major(501)))
            .unwrap_err();
        assert!(matches!(err, DepreciationError::Domain(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn journal_reference_is_set_once() {
        let mut fx = Fixture::new();
        let entry = fx.record(month_end(0), Money::from_major(1_000));
        let je = JournalEntryId::new();
        let attach = |journal_entry_id| {
            LedgerCommand::AttachJournalEntry(AttachJournalEntry {
                tenant_id: fx.tenant_id,
                entry_id: entry.id,
                journal_entry_id,
                share: PostedShare {
                    expense_account: Account::new("6810", "Depreciation expense", AccountKind::Expense),
                    accumulated_account: Account::new("1590", "Accumulated depreciation", AccountKind::Asset),
                    cost_center: Some("CC-100".to_string()),
                },
                occurred_at: Utc::now(),
            })
        };

        let cmd = attach(je);
        fx.ledger.execute(&cmd).unwrap();
        let posted = fx.ledger.entry(entry.id).unwrap();
        assert_eq!(posted.journal_entry, Some(je));
        assert_eq!(posted.posted_share.as_ref().unwrap().cost_center.as_deref(), Some("CC-100"));

        // Same reference again is a no-op; a different one is a conflict.
        assert!(fx.ledger.handle(&attach(je)).unwrap().is_empty());
        let err = fx.ledger.handle(&attach(JournalEntryId::new())).unwrap_err();
        assert!(matches!(err, DepreciationError::Domain(DomainError::Conflict(_))));
    }

    #[test]
    fn only_latest_active_entry_can_be_reversed() {
        let mut fx = Fixture::new();
        let first = fx.record(month_end(0), Money::from_major(1_000));
        let second = fx.record(month_end(1), Money::from_major(1_000));

        let err = fx
            .ledger
            .handle(&fx.reverse_cmd(first.id, month_end(2), "wrong cost capitalised"))
            .unwrap_err();
        assert!(matches!(err, DepreciationError::InvalidReversal(msg) if msg.contains("reverse it first")));

        let cmd = fx.reverse_cmd(second.id, month_end(2), "wrong cost capitalised");
        fx.ledger.execute(&cmd).unwrap();
        assert_eq!(fx.ledger.accumulated(), Money::from_major(1_000));
        assert_eq!(fx.ledger.entries().len(), 2);
        assert!(fx.ledger.entry(second.id).unwrap().is_reversed());

        let cmd = fx.reverse_cmd(first.id, month_end(2), "wrong cost capitalised");
        fx.ledger.execute(&cmd).unwrap();
        assert_eq!(fx.ledger.accumulated(), Money::ZERO);
    }

    #[test]
    fn reversal_policy_checks_reason_and_dates() {
        let mut fx = Fixture::new();
        let entry = fx.record(month_end(0), Money::from_major(1_000));

        let err = fx.ledger.handle(&fx.reverse_cmd(entry.id, month_end(1), "  typo   ")).unwrap_err();
        assert!(matches!(err, DepreciationError::InvalidReversal(msg) if msg.contains("at least 10")));

        let err = fx
            .ledger
            .handle(&fx.reverse_cmd(entry.id, date(2025, 1, 30), "posted against wrong asset"))
            .unwrap_err();
        assert!(matches!(err, DepreciationError::InvalidReversal(msg) if msg.contains("precedes")));

        let err = fx
            .ledger
            .handle(&fx.reverse_cmd(entry.id, date(2026, 1, 2), "posted against wrong asset"))
            .unwrap_err();
        assert!(matches!(err, DepreciationError::InvalidReversal(msg) if msg.contains("future")));

        let err = fx
            .ledger
            .handle(&fx.reverse_cmd(LedgerEntryId::new(), month_end(1), "posted against wrong asset"))
            .unwrap_err();
        assert!(matches!(err, DepreciationError::EntryNotFound(_)));
    }

    #[test]
    fn reversed_period_can_be_recorded_again() {
        let mut fx = Fixture::new();
        let entry = fx.record(month_end(0), Money::from_major(1_000));
        let cmd = fx.reverse_cmd(entry.id, month_end(0), "recalculation requested");
        fx.ledger.execute(&cmd).unwrap();

        assert!(!fx.ledger.has_entry(Period::of(month_end(0))));
        let again = fx.record(month_end(0), Money::from_major(1_000));
        assert_eq!(again.accumulated_before, Money::ZERO);
        assert_eq!(fx.ledger.entries().len(), 2);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// after == before + charge, and accumulated never decreases without a reversal.
        #[test]
        fn running_balance_identity(charges in prop::collection::vec(1i64..1_000_000i64, 1..12)) {
            let mut fx = Fixture::new();
            let mut previous = Money::ZERO;
            for (i, minor) in charges.iter().enumerate() {
                let entry = fx.record(month_end(i as u32), Money::from_minor(*minor));
                prop_assert_eq!(entry.accumulated_after, entry.accumulated_before + entry.charge);
                prop_assert_eq!(entry.book_value_after, Money::from_major(12_000) - entry.accumulated_after);
                prop_assert!(entry.accumulated_after >= previous);
                previous = entry.accumulated_after;
            }
            prop_assert_eq!(fx.ledger.accumulated(), previous);
        }
    }
}
