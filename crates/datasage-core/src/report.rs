//! One-shot report generation and decoding of the service's report payload.

use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::auth::TokenProvider;
use crate::config::AppConfig;
use crate::error::ClientError;
use crate::notify::Notifier;
use crate::transport::{RequestBody, Transport, TransportError, TransportRequest};
use crate::types::{AnalysisReport, ChartSource, DatasetFile, Narrative, ReportMetadata};

/// `{"message": ..., "result": {...}}`
#[derive(Debug, Deserialize)]
struct ReportEnvelope {
    result: ReportPayload,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReportPayload {
    metadata: Option<MetadataPayload>,
    insights: Option<Narrative>,
    charts: Option<ChartsPayload>,
    report: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetadataPayload {
    rows: u64,
    columns: ColumnsPayload,
}

/// Column names, or just a count from older service builds.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ColumnsPayload {
    Names(Vec<String>),
    Count(u64),
}

impl Default for ColumnsPayload {
    fn default() -> Self {
        ColumnsPayload::Count(0)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChartsPayload {
    charts: Vec<Value>,
}

/// One chart object as the service sends it. `x`/`y` are labels for some
/// kinds and numbers for others, so they stay untyped until the kind is known.
#[derive(Debug, Deserialize)]
struct RawChart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    data: Option<Vec<f64>>,
    #[serde(default)]
    x: Option<Vec<Value>>,
    #[serde(default)]
    y: Option<Vec<Value>>,
    #[serde(default)]
    z: Option<Vec<Vec<f64>>>,
}

impl RawChart {
    fn into_source(self) -> Result<ChartSource, String> {
        let title = self.title;
        match self.kind.as_str() {
            "bar" => match self.data {
                Some(values) => Ok(ChartSource::Bar {
                    title,
                    values,
                    labels: None,
                }),
                None => {
                    let values = numbers(self.y.as_deref().unwrap_or_default())?;
                    let labels = self.x.as_deref().map(labels).transpose()?;
                    Ok(ChartSource::Bar {
                        title,
                        values,
                        labels,
                    })
                }
            },
            "histogram" => Ok(ChartSource::Histogram {
                title,
                values: self.data.unwrap_or_default(),
            }),
            "boxplot" => Ok(ChartSource::BoxPlot {
                title,
                values: self.data.unwrap_or_default(),
            }),
            "scatter" => Ok(ChartSource::Scatter {
                title,
                x: numbers(self.x.as_deref().unwrap_or_default())?,
                y: numbers(self.y.as_deref().unwrap_or_default())?,
            }),
            "heatmap" => Ok(ChartSource::Heatmap {
                title,
                x: labels(self.x.as_deref().unwrap_or_default())?,
                y: labels(self.y.as_deref().unwrap_or_default())?,
                z: self.z.unwrap_or_default(),
            }),
            other => Ok(ChartSource::Other {
                kind: other.to_string(),
                title,
            }),
        }
    }
}

fn numbers(values: &[Value]) -> Result<Vec<f64>, String> {
    values
        .iter()
        .map(|v| v.as_f64().ok_or_else(|| format!("expected a number, got {}", v)))
        .collect()
}

fn labels(values: &[Value]) -> Result<Vec<String>, String> {
    values
        .iter()
        .map(|v| match v {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(format!("expected a label, got {}", other)),
        })
        .collect()
}

/// Decode one chart object. `None` (with a warning) when it cannot be read at all.
fn decode_chart(index: usize, value: Value) -> Option<ChartSource> {
    let decoded = serde_json::from_value::<RawChart>(value)
        .map_err(|e| e.to_string())
        .and_then(RawChart::into_source);
    match decoded {
        Ok(source) => Some(source),
        Err(e) => {
            warn!("Skipping undecodable chart #{}: {}", index, e);
            None
        }
    }
}

/// Decode the report endpoint's response body.
pub fn decode_report(payload: Value) -> Result<AnalysisReport, ClientError> {
    let envelope: ReportEnvelope = serde_json::from_value(payload)
        .map_err(|e| ClientError::Decode(format!("Report payload: {}", e)))?;
    let result = envelope.result;

    let metadata = result
        .metadata
        .map(|m| {
            let (column_count, column_names) = match m.columns {
                ColumnsPayload::Names(names) => (names.len() as u64, names),
                ColumnsPayload::Count(count) => (count, Vec::new()),
            };
            ReportMetadata {
                row_count: m.rows,
                column_count,
                column_names,
            }
        })
        .unwrap_or_default();

    let chart_specs = result
        .charts
        .map(|c| c.charts)
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(i, chart)| decode_chart(i, chart))
        .collect();

    let markdown = match result.report {
        Some(Value::String(md)) if !md.trim().is_empty() => Some(md),
        Some(Value::Object(map)) => map
            .get("markdown")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };

    Ok(AnalysisReport {
        metadata,
        narrative: result.insights.unwrap_or_default(),
        chart_specs,
        markdown,
    })
}

/// Clears the in-flight flag when the request finishes, however it finishes.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Report flow: upload a dataset, receive a full analysis report.
pub struct ReportFlow {
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenProvider>,
    notifier: Arc<dyn Notifier>,
    endpoint: String,
    current: Mutex<Option<AnalysisReport>>,
    in_flight: AtomicBool,
}

impl ReportFlow {
    pub fn new(
        config: &AppConfig,
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            transport,
            tokens,
            notifier,
            endpoint: config.api.report_path.clone(),
            current: Mutex::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    fn current(&self) -> MutexGuard<'_, Option<AnalysisReport>> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The last successfully generated report.
    pub fn current_report(&self) -> Option<AnalysisReport> {
        self.current().clone()
    }

    /// Drop the current report (back to the upload view).
    pub fn clear_report(&self) {
        self.current().take();
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Generate a report for `file`. On success the previous report is
    /// replaced entirely; on failure it is left untouched.
    pub async fn request_report(&self, file: DatasetFile) -> Result<AnalysisReport, ClientError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ClientError::ReportInFlight);
        }
        let _guard = InFlight(&self.in_flight);

        info!("Requesting report for {} ({} bytes)", file.name, file.bytes.len());
        let request = TransportRequest::post(self.endpoint.clone(), RequestBody::csv(file.name, file.bytes))
            .with_token(self.tokens.token());

        let decoded = match self.transport.send(request).await {
            Ok(payload) => decode_report(payload).map_err(|e| TransportError::new(Some(200), e.to_string())),
            Err(e) => Err(e),
        };

        match decoded {
            Ok(report) => {
                info!(
                    "Report ready: {} rows, {} columns, {} charts",
                    report.metadata.row_count,
                    report.metadata.column_count,
                    report.chart_specs.len()
                );
                *self.current() = Some(report.clone());
                self.notifier.notify_success("Analysis report generated");
                Ok(report)
            }
            Err(e) => {
                warn!("Report request failed: {}", e);
                self.notifier
                    .notify_error(&format!("Report generation failed: {}", e.message));
                Err(ClientError::ReportFailure(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FixedToken, RecordingNotifier, ScriptedTransport};
    use serde_json::json;
    use tokio::sync::Notify;

    fn service_payload() -> Value {
        json!({
            "message": "CSV processed successfully",
            "result": {
                "metadata": {
                    "rows": 120,
                    "columns": ["region", "revenue", "units"],
                    "numeric_columns": ["revenue", "units"]
                },
                "eda": {"summary_statistics": {}},
                "charts": {"charts": [
                    {"id": "correlation_heatmap", "type": "heatmap", "title": "Feature Correlation Heatmap",
                     "x": ["revenue", "units"], "y": ["revenue", "units"], "z": [[1.0, 0.8], [0.8, 1.0]]},
                    {"id": "hist_revenue", "type": "histogram", "column": "revenue",
                     "data": [1.0, 2.5, 3.0], "title": "Distribution of revenue"},
                    {"id": "box_revenue", "type": "boxplot", "data": [1.0, 2.5], "title": "Outliers Detection: revenue"},
                    {"id": "bar_region", "type": "bar", "x": ["north", "south"], "y": [70, 50],
                     "title": "Total Counts by region"},
                    {"id": "line_date", "type": "line", "x": ["2024-01-01"], "y": [3], "title": "Trend Analysis: date"},
                    {"id": "scatter_revenue_vs_units", "type": "scatter", "x": [1.0, 2.0], "y": [3.0, 4.0],
                     "title": "Correlation: revenue vs units"}
                ]},
                "insights": {
                    "summary": "Revenue is concentrated in the north.",
                    "key_insights": ["North is 58% of revenue"],
                    "recommendations": ["Expand south sales"]
                },
                "report": "# Report\n\nBody"
            }
        })
    }

    fn flow_with(transport: Arc<ScriptedTransport>) -> (ReportFlow, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let flow = ReportFlow::new(
            &AppConfig::default(),
            transport,
            Arc::new(FixedToken(Some("tok"))),
            notifier.clone(),
        );
        (flow, notifier)
    }

    fn csv() -> DatasetFile {
        DatasetFile::new("sales.csv", b"region,revenue\n".to_vec())
    }

    #[test]
    fn test_decode_service_payload() {
        let report = decode_report(service_payload()).unwrap();

        assert_eq!(report.metadata.row_count, 120);
        assert_eq!(report.metadata.column_count, 3);
        assert_eq!(report.metadata.column_names[0], "region");

        assert_eq!(
            report.narrative.summary.as_deref(),
            Some("Revenue is concentrated in the north.")
        );
        assert_eq!(report.narrative.key_findings, vec!["North is 58% of revenue"]);
        assert!(report.narrative.risks.is_empty());
        assert_eq!(report.markdown.as_deref(), Some("# Report\n\nBody"));

        let kinds: Vec<_> = report.chart_specs.iter().map(|c| c.kind()).collect();
        use crate::types::ChartKind::*;
        assert_eq!(kinds, vec![Heatmap, Histogram, BoxPlot, Bar, Other, Scatter]);

        assert_eq!(
            report.chart_specs[3],
            ChartSource::Bar {
                title: "Total Counts by region".into(),
                values: vec![70.0, 50.0],
                labels: Some(vec!["north".into(), "south".into()]),
            }
        );
        assert!(matches!(
            &report.chart_specs[4],
            ChartSource::Other { kind, .. } if kind == "line"
        ));
    }

    #[test]
    fn test_decode_skips_unreadable_chart_only() {
        let payload = json!({"result": {"charts": {"charts": [
            {"type": "scatter", "x": ["a", "b"], "y": [1, 2], "title": "bad"},
            {"title": "no type"},
            {"type": "bar", "data": [1, 2, 3], "title": "Values"}
        ]}}});
        let report = decode_report(payload).unwrap();
        assert_eq!(report.chart_specs.len(), 1);
        assert_eq!(report.chart_specs[0].title(), "Values");
    }

    #[test]
    fn test_decode_sparse_payload() {
        let report = decode_report(json!({"result": {}})).unwrap();
        assert_eq!(report, AnalysisReport::default());

        let report = decode_report(json!({"result": {"metadata": {"rows": 5, "columns": 2}}})).unwrap();
        assert_eq!(report.metadata.column_count, 2);
        assert!(report.metadata.column_names.is_empty());
    }

    #[test]
    fn test_decode_rejects_missing_envelope() {
        assert!(matches!(
            decode_report(json!({"message": "no result"})),
            Err(ClientError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_request_report_success_sets_current() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(service_payload())]));
        let (flow, notifier) = flow_with(transport.clone());

        let report = flow.request_report(csv()).await.unwrap();
        assert_eq!(report.metadata.row_count, 120);
        assert_eq!(flow.current_report(), Some(report));
        assert_eq!(notifier.successes().len(), 1);
        assert!(!flow.is_in_flight());

        let request = &transport.requests()[0];
        assert_eq!(request.endpoint, "/upload/upload-csv/");
        assert_eq!(request.auth_token.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_request_report_replaces_previous_wholesale() {
        let second = json!({"result": {"metadata": {"rows": 7, "columns": ["a"]}}});
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(service_payload()), Ok(second)]));
        let (flow, _) = flow_with(transport);

        flow.request_report(csv()).await.unwrap();
        flow.request_report(csv()).await.unwrap();

        let current = flow.current_report().unwrap();
        assert_eq!(current.metadata.row_count, 7);
        assert!(current.chart_specs.is_empty());
        assert!(current.narrative.summary.is_none());
    }

    #[tokio::test]
    async fn test_request_report_failure_keeps_previous() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(service_payload()),
            Err(TransportError::new(Some(500), "Internal Server Error")),
        ]));
        let (flow, notifier) = flow_with(transport);

        flow.request_report(csv()).await.unwrap();
        let err = flow.request_report(csv()).await.unwrap_err();

        assert!(matches!(err, ClientError::ReportFailure(_)));
        assert_eq!(flow.current_report().unwrap().metadata.row_count, 120);
        assert_eq!(notifier.errors().len(), 1);
        assert!(!flow.is_in_flight());
    }

    #[tokio::test]
    async fn test_undecodable_report_is_failure() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(json!({"message": "?"}))]));
        let (flow, notifier) = flow_with(transport);

        assert!(matches!(
            flow.request_report(csv()).await,
            Err(ClientError::ReportFailure(_))
        ));
        assert!(flow.current_report().is_none());
        assert_eq!(notifier.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_second_request_while_in_flight_is_rejected() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(ScriptedTransport::gated(vec![Ok(service_payload())], gate.clone()));
        let (flow, _) = flow_with(transport.clone());

        let first = flow.request_report(csv());
        let second = async {
            while !flow.is_in_flight() {
                tokio::task::yield_now().await;
            }
            let outcome = flow.request_report(csv()).await;
            gate.notify_one();
            outcome
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.is_ok());
        assert!(matches!(second, Err(ClientError::ReportInFlight)));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_clear_report() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(service_payload())]));
        let (flow, _) = flow_with(transport);
        flow.request_report(csv()).await.unwrap();
        flow.clear_report();
        assert!(flow.current_report().is_none());
    }
}
