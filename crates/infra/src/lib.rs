//! Infrastructure layer: storage, batch orchestration, posting, configuration.
//!
//! Domain crates stay free of IO; this crate composes them behind the
//! [`store::DepreciationStore`] and
//! [`AccountingGateway`](assetbook_accounting::AccountingGateway) seams.

pub mod batch;
pub mod config;
pub mod gateway;
pub mod posting;
pub mod registry;
pub mod reversal;
pub mod store;


pub use batch::{
    BatchOptions, BatchRequest, BatchResult, BatchRunner, FailedAsset, RecordedCharge, SkipReason,
    SkippedAsset,
};
pub use config::{ConfigError, EngineConfig, PostingConfig, ReversalPolicy};
pub use gateway::{GatewaySnapshot, InMemoryAccountingGateway};
pub use posting::{LedgerPostingAdapter, PostableCharge, PostingOutcome};
pub use registry::{AssetFilter, AssetSelection, Candidate};
pub use reversal::{PeriodReversalResult, ReversalProcessor, ReversalRequest};
pub use store::{AssetHistory, DepreciationStore, InMemoryDepreciationStore, StoreSnapshot};
