//! In-process accounting collaborator.
//!
//! Keeps one `Journal` aggregate per tenant. Used by tests, benches and the
//! CLI; a production deployment plugs its general ledger in behind
//! [`AccountingGateway`].

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use assetbook_accounting::{
    AccountingGateway, CancellationRequest, Journal, JournalCommand, JournalEntry,
    JournalEntryDraft, JournalEntryId, JournalId, PostJournalEntry, PostingError,
    ReverseJournalEntry,
};
use assetbook_core::{Aggregate, AggregateId, TenantId};

/// Serializable image of every tenant's journal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySnapshot {
    pub journals: Vec<Journal>,
}

#[derive(Debug, Default)]
pub struct InMemoryAccountingGateway {
    journals: RwLock<HashMap<TenantId, Journal>>,
    /// When set, every request is refused with this reason.
    rejection: RwLock<Option<String>>,
}

fn poisoned<T>(_: PoisonError<T>) -> PostingError {
    PostingError::rejected("accounting gateway lock poisoned")
}

impl InMemoryAccountingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: GatewaySnapshot) -> Self {
        let journals = snapshot
            .journals
            .into_iter()
            .filter_map(|j| j.tenant_id().map(|t| (t, j)))
            .collect();
        Self {
            journals: RwLock::new(journals),
            rejection: RwLock::new(None),
        }
    }

    pub fn snapshot(&self) -> Result<GatewaySnapshot, PostingError> {
        let map = self.journals.read().map_err(poisoned)?;
        let mut journals: Vec<Journal> = map.values().cloned().collect();
        journals.sort_by_key(|j| j.tenant_id());
        Ok(GatewaySnapshot { journals })
    }

    /// Refuse all further requests (simulates an unavailable ledger).
    pub fn reject_all(&self, reason: impl Into<String>) {
        if let Ok(mut rejection) = self.rejection.write() {
            *rejection = Some(reason.into());
        }
    }

    pub fn accept_all(&self) {
        if let Ok(mut rejection) = self.rejection.write() {
            *rejection = None;
        }
    }

    pub fn entry(&self, tenant_id: TenantId, id: JournalEntryId) -> Option<JournalEntry> {
        let map = self.journals.read().ok()?;
        map.get(&tenant_id).and_then(|j| j.entry(id)).cloned()
    }

    pub fn entries(&self, tenant_id: TenantId) -> Vec<JournalEntry> {
        self.journals
            .read()
            .ok()
            .and_then(|map| map.get(&tenant_id).map(|j| j.entries().cloned().collect()))
            .unwrap_or_default()
    }

    fn check_rejection(&self) -> Result<(), PostingError> {
        match self.rejection.read().map_err(poisoned)?.as_ref() {
            Some(reason) => Err(PostingError::rejected(reason.clone())),
            None => Ok(()),
        }
    }
}

impl AccountingGateway for InMemoryAccountingGateway {
    fn post(&self, draft: JournalEntryDraft) -> Result<JournalEntryId, PostingError> {
        self.check_rejection()?;

        let mut map = self.journals.write().map_err(poisoned)?;
        let journal = map
            .entry(draft.tenant_id)
            .or_insert_with(|| Journal::empty(JournalId::new(AggregateId::new())));

        let entry_id = JournalEntryId::new();
        journal.execute(&JournalCommand::PostJournalEntry(PostJournalEntry {
            entry_id,
            draft,
            occurred_at: Utc::now(),
        }))?;
        Ok(entry_id)
    }

    fn cancel(&self, request: CancellationRequest) -> Result<JournalEntryId, PostingError> {
        self.check_rejection()?;

        let mut map = self.journals.write().map_err(poisoned)?;
        let journal = map
            .get_mut(&request.tenant_id)
            .ok_or(PostingError::NotFound(request.journal_entry_id))?;

        let reversal_id = JournalEntryId::new();
        journal.execute(&JournalCommand::ReverseJournalEntry(ReverseJournalEntry {
            tenant_id: request.tenant_id,
            reversal_id,
            original_id: request.journal_entry_id,
            lines: request.lines,
            reversal_date: request.reversal_date,
            reason: request.reason,
            occurred_at: Utc::now(),
        }))?;
        Ok(reversal_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetbook_accounting::{Account, AccountKind, JournalEntryLine, JournalStatus};
    use assetbook_core::{BranchId, Money};
    use chrono::NaiveDate;

    fn lines(amount: Money) -> Vec<JournalEntryLine> {
        vec![
            JournalEntryLine::debit(Account::new("6100", "Depreciation expense", AccountKind::Expense), amount),
            JournalEntryLine::credit(Account::new("1590", "Accumulated depreciation", AccountKind::Asset), amount),
        ]
    }

    fn draft(tenant_id: TenantId, amount: Money) -> JournalEntryDraft {
        JournalEntryDraft {
            tenant_id,
            branch_id: BranchId::new(),
            entry_date: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            description: "Depreciation 2025-01".to_string(),
            source: "assets.depreciation".to_string(),
            lines: lines(amount),
        }
    }

    fn cancel(tenant_id: TenantId, id: JournalEntryId, amount: Money) -> CancellationRequest {
        CancellationRequest {
            tenant_id,
            journal_entry_id: id,
            lines: lines(amount),
            reversal_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            reason: "charged to wrong asset".to_string(),
        }
    }

    #[test]
    fn partial_then_full_cancellation() {
        let gateway = InMemoryAccountingGateway::new();
        let tenant = TenantId::new();
        let id = gateway.post(draft(tenant, Money::from_major(3_000))).unwrap();

        gateway.cancel(cancel(tenant, id, Money::from_major(1_000))).unwrap();
        assert_eq!(gateway.entry(tenant, id).unwrap().status, JournalStatus::Posted);

        gateway.cancel(cancel(tenant, id, Money::from_major(2_000))).unwrap();
        assert_eq!(gateway.entry(tenant, id).unwrap().status, JournalStatus::Cancelled);
        assert_eq!(gateway.entries(tenant).len(), 3);
    }

    #[test]
    fn rejection_switch() {
        let gateway = InMemoryAccountingGateway::new();
        let tenant = TenantId::new();
        gateway.reject_all("ledger closed for audit");

        let err = gateway.post(draft(tenant, Money::from_major(1))).unwrap_err();
        assert_eq!(err, PostingError::Rejected("ledger closed for audit".to_string()));

        gateway.accept_all();
        assert!(gateway.post(draft(tenant, Money::from_major(1))).is_ok());
    }

    #[test]
    fn cancel_unknown_entry_fails() {
        let gateway = InMemoryAccountingGateway::new();
        let err = gateway
            .cancel(cancel(TenantId::new(), JournalEntryId::new(), Money::from_major(1)))
            .unwrap_err();
        assert!(matches!(err, PostingError::NotFound(_)));
    }

    #[test]
    fn snapshot_round_trip() {
        let gateway = InMemoryAccountingGateway::new();
        let tenant = TenantId::new();
        let id = gateway.post(draft(tenant, Money::from_major(5))).unwrap();

        let json = serde_json::to_string(&gateway.snapshot().unwrap()).unwrap();
        let restored = InMemoryAccountingGateway::from_snapshot(serde_json::from_str(&json).unwrap());
        assert!(restored.entry(tenant, id).is_some());
    }
}
