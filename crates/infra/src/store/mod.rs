//! Depreciation persistence: assets, their ledgers and the audit stream.

mod in_memory;
mod r#trait;

pub use in_memory::{AssetRecord, InMemoryDepreciationStore, StoreSnapshot};
pub use r#trait::{AssetHistory, DepreciationStore, LedgerEnvelope};
