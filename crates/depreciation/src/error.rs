//! Depreciation error taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use assetbook_accounting::PostingError;
use assetbook_core::DomainError;

use crate::asset::AssetId;
use crate::ledger::LedgerEntryId;
use crate::period::Period;

pub type DepreciationResult<T> = Result<T, DepreciationError>;

/// Failures of the depreciation engine.
///
/// Inside a batch these are recovered per asset and reported; for a single
/// reversal request they are hard failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DepreciationError {
    /// Future or out-of-sequence period.
    #[error("invalid period: {0}")]
    InvalidPeriod(String),

    /// Units-of-production charge without a positive consumption figure.
    #[error("units of production require a positive units-consumed figure")]
    MissingUnits,

    /// An active charge already exists for the asset in this period.
    #[error("depreciation already recorded for asset {asset} in period {period}")]
    DuplicatePeriod { asset: AssetId, period: Period },

    /// The external accounting subsystem refused or failed the request.
    #[error("posting failed: {0}")]
    PostingFailed(#[from] PostingError),

    /// Bad reversal date, missing reason, or a reversal the ledger cannot accept.
    #[error("invalid reversal: {0}")]
    InvalidReversal(String),

    /// The asset lacks a usable method or method parameters.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("asset not found: {0}")]
    AssetNotFound(AssetId),

    #[error("ledger entry not found: {0}")]
    EntryNotFound(LedgerEntryId),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Stable, reportable error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidPeriod,
    MissingUnits,
    DuplicatePeriod,
    PostingFailed,
    InvalidReversal,
    ConfigurationMissing,
    AssetNotFound,
    EntryNotFound,
    Domain,
}

impl DepreciationError {
    pub fn invalid_period(msg: impl Into<String>) -> Self {
        Self::InvalidPeriod(msg.into())
    }

    pub fn invalid_reversal(msg: impl Into<String>) -> Self {
        Self::InvalidReversal(msg.into())
    }

    pub fn configuration_missing(msg: impl Into<String>) -> Self {
        Self::ConfigurationMissing(msg.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidPeriod(_) => ErrorCode::InvalidPeriod,
            Self::MissingUnits => ErrorCode::MissingUnits,
            Self::DuplicatePeriod { .. } => ErrorCode::DuplicatePeriod,
            Self::PostingFailed(_) => ErrorCode::PostingFailed,
            Self::InvalidReversal(_) => ErrorCode::InvalidReversal,
            Self::ConfigurationMissing(_) => ErrorCode::ConfigurationMissing,
            Self::AssetNotFound(_) => ErrorCode::AssetNotFound,
            Self::EntryNotFound(_) => ErrorCode::EntryNotFound,
            Self::Domain(_) => ErrorCode::Domain,
        }
    }
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(self, f)
    }
}
