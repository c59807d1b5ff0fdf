//! JSON state file shared by successive CLI invocations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use assetbook_infra::{
    GatewaySnapshot, InMemoryAccountingGateway, InMemoryDepreciationStore, StoreSnapshot,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workspace {
    pub store: StoreSnapshot,
    pub ledger: GatewaySnapshot,
}

impl Workspace {
    /// Read the state file. A missing file is an empty workspace.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read workspace {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse workspace {}", path.display()))
    }

    pub fn open(self) -> (Arc<InMemoryDepreciationStore>, Arc<InMemoryAccountingGateway>) {
        (
            Arc::new(InMemoryDepreciationStore::from_snapshot(self.store)),
            Arc::new(InMemoryAccountingGateway::from_snapshot(self.ledger)),
        )
    }

    pub fn capture(
        store: &InMemoryDepreciationStore,
        gateway: &InMemoryAccountingGateway,
    ) -> Result<Self> {
        Ok(Self {
            store: store.snapshot().context("failed to snapshot depreciation store")?,
            ledger: gateway.snapshot().context("failed to snapshot journals")?,
        })
    }

    /// Write through a sibling temp file so a crash never leaves a torn file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self).context("failed to encode workspace")?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, raw).with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace workspace {}", path.display()))?;
        Ok(())
    }
}
