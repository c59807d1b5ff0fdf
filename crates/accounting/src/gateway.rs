use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use assetbook_core::TenantId;

use crate::error::PostingError;
use crate::journal::{JournalEntryDraft, JournalEntryId, JournalEntryLine};

/// Request to cancel (part of) a posted journal entry.
///
/// `lines` are the share of the original entry being withdrawn, written the way
/// they appear on the original. A batch entry covers many assets, so a single
/// asset's reversal cancels only its own share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationRequest {
    pub tenant_id: TenantId,
    pub journal_entry_id: JournalEntryId,
    pub lines: Vec<JournalEntryLine>,
    pub reversal_date: NaiveDate,
    pub reason: String,
}

/// The general ledger as seen from the depreciation engine.
///
/// Implementations own journal numbering, persistence and approval workflow.
pub trait AccountingGateway: Send + Sync {
    /// Accept a balanced journal entry and return its identifier.
    fn post(&self, draft: JournalEntryDraft) -> Result<JournalEntryId, PostingError>;

    /// Withdraw a share of a posted entry; returns the reversing entry id.
    fn cancel(&self, request: CancellationRequest) -> Result<JournalEntryId, PostingError>;
}

impl<G> AccountingGateway for std::sync::Arc<G>
where
    G: AccountingGateway + ?Sized,
{
    fn post(&self, draft: JournalEntryDraft) -> Result<JournalEntryId, PostingError> {
        (**self).post(draft)
    }

    fn cancel(&self, request: CancellationRequest) -> Result<JournalEntryId, PostingError> {
        (**self).cancel(request)
    }
}
