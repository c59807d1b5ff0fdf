//! Fixed-asset depreciation domain module (event-sourced).
//!
//! Business rules for periodic depreciation implemented as deterministic domain
//! logic (no IO, no storage):
//!
//! - [`method`]: depreciation policy descriptors
//! - [`asset`]: the depreciable asset and its cached running balances
//! - [`calculator`]: one asset + one period -> charge
//! - [`ledger`]: per-asset append-only ledger of period charges
//!
//! Running balances are always derived by folding the un-reversed ledger
//! entries; the values stored on [`Asset`] are a cache refreshed from the ledger.

pub mod asset;
pub mod calculator;
pub mod error;
pub mod ledger;
pub mod method;
pub mod period;

pub use asset::{Asset, AssetBalances, AssetId, DepreciationStatus, LifecycleStatus, NewAsset};
pub use calculator::{DepreciationCalculator, LedgerPosition, PeriodInput};
pub use error::{DepreciationError, DepreciationResult, ErrorCode};
pub use ledger::{
    AssetLedger, AttachJournalEntry, ChargeRecorded, ChargeReversed, JournalEntryAttached,
    LedgerCommand, LedgerEntry, LedgerEntryId, LedgerEvent, PostedShare, RecordCharge,
    ReverseCharge, ReversalRecord,
};
pub use method::{DepreciationMethod, MethodKind};
pub use period::{Period, last_day_of_previous_month};
