use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::error::ClientError;

/// A single turn in the dataset conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(Role::Agent, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// Dataset lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Empty,
    Uploading,
    Ready,
    Error,
}

/// What the renderer should show. `Querying` is `Ready` with a reply outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Empty,
    Uploading,
    Ready,
    Querying,
    Error,
}

/// A CSV file picked by the user, held in memory for a multipart upload.
#[derive(Debug, Clone)]
pub struct DatasetFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl DatasetFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a dataset from disk, naming it after the file.
    pub async fn read(path: &Path) -> Result<Self, ClientError> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| ClientError::Config(format!("Not a file path: {}", path.display())))?;
        Ok(Self { name, bytes })
    }
}

/// Shape of the dataset the report was computed over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub row_count: u64,
    pub column_count: u64,
    #[serde(default)]
    pub column_names: Vec<String>,
}

/// Generated prose. Every part may be missing from the service response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, alias = "key_insights")]
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// One complete analysis report. Replaced wholesale, never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    pub narrative: Narrative,
    pub chart_specs: Vec<ChartSource>,
    /// Markdown report rendered by the service, when it sends one.
    #[serde(default)]
    pub markdown: Option<String>,
}

/// Chart kinds the analysis service can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Histogram,
    Scatter,
    Heatmap,
    BoxPlot,
    Other,
}

/// Raw description of one chart, as provided by the analysis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChartSource {
    Bar {
        title: String,
        values: Vec<f64>,
        #[serde(default)]
        labels: Option<Vec<String>>,
    },
    Histogram {
        title: String,
        values: Vec<f64>,
    },
    Scatter {
        title: String,
        x: Vec<f64>,
        y: Vec<f64>,
    },
    Heatmap {
        title: String,
        x: Vec<String>,
        y: Vec<String>,
        z: Vec<Vec<f64>>,
    },
    BoxPlot {
        title: String,
        values: Vec<f64>,
    },
    Other {
        kind: String,
        title: String,
    },
}

impl ChartSource {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartSource::Bar { .. } => ChartKind::Bar,
            ChartSource::Histogram { .. } => ChartKind::Histogram,
            ChartSource::Scatter { .. } => ChartKind::Scatter,
            ChartSource::Heatmap { .. } => ChartKind::Heatmap,
            ChartSource::BoxPlot { .. } => ChartKind::BoxPlot,
            ChartSource::Other { .. } => ChartKind::Other,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ChartSource::Bar { title, .. }
            | ChartSource::Histogram { title, .. }
            | ChartSource::Scatter { title, .. }
            | ChartSource::Heatmap { title, .. }
            | ChartSource::BoxPlot { title, .. }
            | ChartSource::Other { title, .. } => title,
        }
    }
}
