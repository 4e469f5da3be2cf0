use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

pub const DEFAULT_LOG_FILTER: &str = "fintrack=info";
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;
pub const STORE_FILE_NAME: &str = "fintrack.json";

/// Runtime settings for the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub locale: String,
    pub currency: String,

    /// Directory holding the document store. Defaults to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "Config::default_log_filter")]
    pub log_filter: String,

    #[serde(default = "Config::default_max_page_size")]
    pub max_page_size: usize,

    #[serde(default)]
    pub notifications: NotificationSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "en-US".into(),
            currency: "USD".into(),
            data_dir: None,
            log_filter: Self::default_log_filter(),
            max_page_size: Self::default_max_page_size(),
            notifications: NotificationSettings::default(),
        }
    }
}

impl Config {
    pub fn default_log_filter() -> String {
        DEFAULT_LOG_FILTER.into()
    }

    pub fn default_max_page_size() -> usize {
        DEFAULT_MAX_PAGE_SIZE
    }

    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(path) = &self.data_dir {
            return path.clone();
        }

        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        base.join("fintrack")
    }

    pub fn store_path(&self) -> PathBuf {
        self.resolve_data_dir().join(STORE_FILE_NAME)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_page_size == 0 {
            return Err(ConfigError::Invalid("max_page_size must be at least 1".into()));
        }
        if self.currency.trim().is_empty() {
            return Err(ConfigError::Invalid("currency is required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Master switch for every outbound message, budget alerts included.
    #[serde(default = "NotificationSettings::default_enabled")]
    pub enabled: bool,
    /// Send a receipt for every recorded expense and income.
    #[serde(default)]
    pub transaction_receipts: bool,
}

impl NotificationSettings {
    fn default_enabled() -> bool {
        true
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            transaction_receipts: false,
        }
    }
}
