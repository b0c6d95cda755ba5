//! Markdown export of an analysis report.

use chrono::Utc;
use datasage_core::types::AnalysisReport;

use crate::adapter::{RenderKind, RenderableChart};

/// Report generator for creating markdown summaries.
pub struct ReportGenerator;

impl ReportGenerator {
    /// Render `report` as markdown, listing the charts that were displayed.
    pub fn markdown(report: &AnalysisReport, charts: &[RenderableChart]) -> String {
        let mut out = String::new();

        out.push_str(&format!(
            "# Analysis Report\n\n**Generated {}**\n\n",
            Utc::now().format("%B %d, %Y %H:%M UTC")
        ));

        // Overview.
        let meta = &report.metadata;
        out.push_str("## Overview\n\n");
        out.push_str(&format!("- **Rows:** {}\n", meta.row_count));
        out.push_str(&format!("- **Columns:** {}\n", meta.column_count));
        if !meta.column_names.is_empty() {
            let names: Vec<String> = meta.column_names.iter().map(|n| format!("`{}`", n)).collect();
            out.push_str(&format!("- **Fields:** {}\n", names.join(", ")));
        }
        out.push('\n');

        let narrative = &report.narrative;
        if let Some(summary) = narrative.summary.as_deref().filter(|s| !s.trim().is_empty()) {
            out.push_str("## Summary\n\n");
            out.push_str(summary.trim());
            out.push_str("\n\n");
        }

        if !narrative.key_findings.is_empty() {
            out.push_str("## Key Findings\n\n");
            for (i, finding) in narrative.key_findings.iter().enumerate() {
                out.push_str(&format!("{}. {}\n", i + 1, finding));
            }
            out.push('\n');
        }

        push_list(&mut out, "Risks", &narrative.risks);
        push_list(&mut out, "Recommendations", &narrative.recommendations);

        if !charts.is_empty() {
            out.push_str("## Charts\n\n");
            out.push_str("| # | Title | Type | Series |\n");
            out.push_str("|---|-------|------|--------|\n");
            for (i, chart) in charts.iter().enumerate() {
                out.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    i + 1,
                    chart.title.replace('|', "\\|"),
                    kind_label(chart.kind),
                    chart.series.len()
                ));
            }
            out.push('\n');
        }

        if let Some(service) = report.markdown.as_deref().filter(|m| !m.trim().is_empty()) {
            out.push_str("## Service Report\n\n");
            out.push_str(service.trim());
            out.push('\n');
        }

        out
    }
}

fn push_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("## {}\n\n", heading));
    for item in items {
        out.push_str(&format!("- {}\n", item));
    }
    out.push('\n');
}

fn kind_label(kind: RenderKind) -> &'static str {
    match kind {
        RenderKind::Bar => "bar",
        RenderKind::Scatter => "scatter",
        RenderKind::Heatmap => "heatmap",
    }
}
