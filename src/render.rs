//! Terminal rendering of reports and charts.

use datasage_charts::{RenderKind, RenderableChart, SeriesData};
use datasage_core::types::AnalysisReport;

const BAR_WIDTH: usize = 40;
const MAX_ROWS: usize = 12;

pub fn print_report(report: &AnalysisReport, charts: &[RenderableChart]) {
    print!("{}", format_report(report, charts));
}

fn format_report(report: &AnalysisReport, charts: &[RenderableChart]) -> String {
    let mut out = String::new();
    let meta = &report.metadata;
    out.push_str(&format!(
        "\n\x1b[1;36mDataset\x1b[0m: {} rows × {} columns\n",
        meta.row_count, meta.column_count
    ));
    if !meta.column_names.is_empty() {
        out.push_str(&format!("  Fields: {}\n", meta.column_names.join(", ")));
    }

    let narrative = &report.narrative;
    if let Some(summary) = &narrative.summary {
        out.push_str(&format!("\n\x1b[1;36mSummary\x1b[0m\n  {}\n", summary.trim()));
    }
    push_section(&mut out, "Key findings", &narrative.key_findings);
    push_section(&mut out, "Risks", &narrative.risks);
    push_section(&mut out, "Recommendations", &narrative.recommendations);

    if charts.is_empty() {
        out.push_str("\n  No charts to display.\n");
    }
    for chart in charts {
        out.push_str(&format_chart(chart));
    }
    out
}

fn push_section(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\n\x1b[1;36m{}\x1b[0m\n", heading));
    for item in items {
        out.push_str(&format!("  • {}\n", item));
    }
}

fn format_chart(chart: &RenderableChart) -> String {
    let mut out = format!("\n\x1b[1;33m{}\x1b[0m\n", chart.title);
    match chart.kind {
        RenderKind::Bar => {
            let values: Vec<f64> = match chart.series.first().map(|s| &s.data) {
                Some(SeriesData::Values(v)) => v.clone(),
                Some(SeriesData::Counts(c)) => c.iter().map(|&n| n as f64).collect(),
                _ => Vec::new(),
            };
            let labels: Vec<String> = match &chart.categories {
                Some(categories) => categories.clone(),
                None => (1..=values.len()).map(|i| i.to_string()).collect(),
            };
            let max = values.iter().copied().fold(0.0_f64, f64::max);
            let label_width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
            for (label, value) in labels.iter().zip(&values) {
                out.push_str(&format!(
                    "  {:>width$} │{} {}\n",
                    label,
                    bar(*value, max),
                    trim_number(*value),
                    width = label_width
                ));
            }
        }
        RenderKind::Scatter => {
            if let Some(SeriesData::Points(points)) = chart.series.first().map(|s| &s.data) {
                for [x, y] in points.iter().take(MAX_ROWS) {
                    out.push_str(&format!("  ({}, {})\n", trim_number(*x), trim_number(*y)));
                }
                if points.len() > MAX_ROWS {
                    out.push_str(&format!("  … {} more points\n", points.len() - MAX_ROWS));
                }
            }
        }
        RenderKind::Heatmap => {
            for series in &chart.series {
                if let SeriesData::Cells(cells) = &series.data {
                    let row: Vec<String> = cells
                        .iter()
                        .map(|c| format!("{}={}", c.x, trim_number(c.y)))
                        .collect();
                    out.push_str(&format!("  {}: {}\n", series.name, row.join("  ")));
                }
            }
        }
    }
    out
}

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let len = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(len.clamp(1, BAR_WIDTH))
}

fn trim_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}
