use thiserror::Error;

use assetbook_core::Money;

use crate::journal::JournalEntryId;

/// Failure at the accounting boundary.
///
/// These never unwind depreciation ledger entries; the caller decides whether
/// the failure is a batch-level warning or a hard error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PostingError {
    #[error("no active branch configured for posting")]
    NoActiveBranch,

    #[error("no {role} account configured for category '{category}'")]
    MissingAccount { category: String, role: &'static str },

    #[error("journal entry must have lines")]
    EmptyEntry,

    #[error("line amount must be positive")]
    NonPositiveAmount,

    #[error("debits ({debit}) must equal credits ({credit})")]
    Unbalanced { debit: Money, credit: Money },

    #[error("journal entry not found: {0}")]
    NotFound(JournalEntryId),

    #[error("journal entry {0} is already cancelled")]
    AlreadyCancelled(JournalEntryId),

    #[error("cancellation of {requested} exceeds remaining {remaining} on {entry}")]
    CancellationExceedsEntry {
        entry: JournalEntryId,
        requested: Money,
        remaining: Money,
    },

    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("accounting subsystem rejected the request: {0}")]
    Rejected(String),
}

impl PostingError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }
}
