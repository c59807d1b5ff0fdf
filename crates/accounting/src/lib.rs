//! Accounting collaborator vocabulary (double-entry journal, event-sourced).
//!
//! The depreciation engine only *calls* the general ledger. This crate holds the
//! shapes exchanged at that boundary plus a pure `Journal` aggregate that
//! validates balanced entries and cancellations.
//!
//! Pure domain logic only: no IO, no persistence concerns.

pub mod error;
pub mod gateway;
pub mod journal;

pub use error::PostingError;
pub use gateway::{AccountingGateway, CancellationRequest};
pub use journal::{
    Account, AccountKind, Journal, JournalCommand, JournalEntry, JournalEntryDraft,
    JournalEntryId, JournalEntryLine, JournalEntryPosted, JournalEntryReversed, JournalEvent,
    JournalId, JournalStatus, PostJournalEntry, ReverseJournalEntry,
};
