use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::types::ChartKind;

/// Top-level client configuration, loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub chat: ChatConfig,
    pub charts: ChartsConfig,
}

impl AppConfig {
    /// Load configuration from default path (~/.config/datasage/config.toml),
    /// falling back to defaults if the file doesn't exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Write current configuration to the default path.
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Write current configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("datasage")
            .join("config.toml")
    }

    /// Data directory for REPL history and exported reports.
    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("datasage")
    }
}

/// Analysis service endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the analysis service.
    pub base_url: String,
    /// Multipart endpoint that primes the chat engine with a dataset.
    pub upload_path: String,
    /// Question endpoint; the question travels as a query parameter.
    pub chat_path: String,
    /// Multipart endpoint that returns a full analysis report.
    pub report_path: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            upload_path: "/csv-chat/upload/".into(),
            chat_path: "/csv-chat/chat/".into(),
            report_path: "/upload/upload-csv/".into(),
            timeout_secs: 120,
        }
    }
}

/// Where the bearer token comes from. Sources are tried in field order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Literal token (takes precedence).
    pub token: Option<String>,
    /// Environment variable holding the token.
    pub token_env: Option<String>,
    /// File whose trimmed contents are the token.
    pub token_file: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token: None,
            token_env: Some("DATASAGE_TOKEN".into()),
            token_file: None,
        }
    }
}

/// Conversation wording.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Agent turn appended when a query fails. The failure detail itself is
    /// only sent to the notifier.
    pub fallback_message: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            fallback_message: "Our diagnostic engine encountered an error. Please try again."
                .into(),
        }
    }
}

/// Chart display policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartsConfig {
    /// Maximum number of charts shown for one report.
    pub max_displayed_charts: usize,
    /// Chart kinds never shown.
    pub excluded_kinds: Vec<ChartKind>,
    /// Number of equal-width bins for histograms.
    pub histogram_bins: usize,
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            max_displayed_charts: 6,
            excluded_kinds: vec![ChartKind::BoxPlot],
            histogram_bins: 20,
        }
    }
}
