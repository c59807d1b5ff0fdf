//! Engine configuration (TOML file + environment overrides).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use assetbook_accounting::{Account, AccountKind};
use assetbook_core::BranchId;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "ASSETBOOK_CONFIG";
/// Environment variable overriding the default posting branch.
pub const BRANCH_ENV: &str = "ASSETBOOK_BRANCH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Account reference as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    pub code: String,
    pub name: String,
}

impl AccountRef {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }

    pub fn to_account(&self, kind: AccountKind) -> Account {
        Account::new(self.code.clone(), self.name.clone(), kind)
    }
}

/// Per-category account overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryAccounts {
    pub expense: Option<AccountRef>,
    pub accumulated: Option<AccountRef>,
}

/// Account mappings and defaults used when posting a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostingConfig {
    /// Branch used when a run does not name one.
    pub default_branch: Option<BranchId>,
    /// Depreciation expense account for categories without an override.
    pub expense_account: Option<AccountRef>,
    /// Accumulated-depreciation (contra-asset) account for categories without an override.
    pub accumulated_account: Option<AccountRef>,
    /// Overrides keyed by asset category (case-insensitive).
    pub categories: BTreeMap<String, CategoryAccounts>,
    pub description_prefix: String,
    /// `source` tag on journal entries created by the engine.
    pub source: String,
}

impl Default for PostingConfig {
    fn default() -> Self {
        Self {
            default_branch: None,
            expense_account: Some(AccountRef::new("6100", "Depreciation expense")),
            accumulated_account: Some(AccountRef::new("1590", "Accumulated depreciation")),
            categories: BTreeMap::new(),
            description_prefix: "Depreciation".to_string(),
            source: "assets.depreciation".to_string(),
        }
    }
}

impl PostingConfig {
    fn category(&self, category: &str) -> Option<&CategoryAccounts> {
        self.categories
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(category))
            .map(|(_, v)| v)
    }

    pub fn expense_for(&self, category: &str) -> Option<Account> {
        self.category(category)
            .and_then(|c| c.expense.as_ref())
            .or(self.expense_account.as_ref())
            .map(|a| a.to_account(AccountKind::Expense))
    }

    pub fn accumulated_for(&self, category: &str) -> Option<Account> {
        self.category(category)
            .and_then(|c| c.accumulated.as_ref())
            .or(self.accumulated_account.as_ref())
            .map(|a| a.to_account(AccountKind::Asset))
    }
}

/// Rules applied to reversal requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReversalPolicy {
    /// Minimum length of the trimmed reason.
    pub min_reason_len: usize,
}

impl Default for ReversalPolicy {
    fn default() -> Self {
        Self { min_reason_len: 10 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub posting: PostingConfig,
    pub reversal: ReversalPolicy,
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the configuration: explicit path, else `ASSETBOOK_CONFIG`,
    /// else built-in defaults; then apply `ASSETBOOK_BRANCH`.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(explicit, |key| std::env::var(key).ok())
    }

    /// [`EngineConfig::load`] with an injectable environment lookup.
    pub fn load_with(
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let from_env = env(CONFIG_ENV).filter(|v| !v.trim().is_empty()).map(PathBuf::from);
        let mut config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        if let Some(raw) = env(BRANCH_ENV).filter(|v| !v.trim().is_empty()) {
            let branch = raw
                .trim()
                .parse::<BranchId>()
                .map_err(|e| ConfigError::Invalid(format!("{BRANCH_ENV}: {e}")))?;
            config.posting.default_branch = Some(branch);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reversal.min_reason_len == 0 {
            return Err(ConfigError::Invalid(
                "reversal.min_reason_len must be at least 1".to_string(),
            ));
        }
        if self.posting.source.trim().is_empty() {
            return Err(ConfigError::Invalid("posting.source cannot be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_file_or_env() {
        let config = EngineConfig::load_with(None, |_| None).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.reversal.min_reason_len, 10);
        assert!(config.posting.default_branch.is_none());
    }

    #[test]
    fn category_override_wins_over_default() {
        let config = EngineConfig::from_toml_str(
            r#"
            [posting]
            description_prefix = "Monthly depreciation"

            [posting.expense_account]
            code = "6100"
            name = "Depreciation expense"

            [posting.categories.vehicles.expense]
            code = "6110"
            name = "Depreciation expense - vehicles"

            [reversal]
            min_reason_len = 15
            "#,
        )
        .unwrap();

        assert_eq!(config.posting.expense_for("VEHICLES").unwrap().code, "6110");
        assert_eq!(config.posting.expense_for("IT").unwrap().code, "6100");
        assert_eq!(config.posting.accumulated_for("VEHICLES").unwrap().code, "1590");
        assert_eq!(config.reversal.min_reason_len, 15);
    }

    #[test]
    fn file_from_env_and_branch_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[reversal]\nmin_reason_len = 12").unwrap();
        let path = file.path().to_string_lossy().to_string();
        let branch = BranchId::new();

        let config = EngineConfig::load_with(None, |key| match key {
            CONFIG_ENV => Some(path.clone()),
            BRANCH_ENV => Some(branch.to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.reversal.min_reason_len, 12);
        assert_eq!(config.posting.default_branch, Some(branch));
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = EngineConfig::load_with(None, |key| (key == BRANCH_ENV).then(|| "not-a-uuid".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[reversal]\nmin_reason_len = 0").unwrap();
        let err = EngineConfig::load_with(Some(file.path()), |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::load_with(Some(Path::new("/nonexistent/assetbook.toml")), |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
