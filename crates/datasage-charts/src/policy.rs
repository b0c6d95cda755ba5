//! Which adapted charts make it to the screen.

use datasage_core::config::ChartsConfig;
use datasage_core::types::{ChartKind, ChartSource};
use tracing::{debug, warn};

use crate::adapter::{ChartAdapter, RenderableChart};

/// Display rules applied to a report's chart list.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayPolicy {
    pub max_displayed_charts: usize,
    pub excluded_kinds: Vec<ChartKind>,
}

impl Default for DisplayPolicy {
    fn default() -> Self {
        Self::from_config(&ChartsConfig::default())
    }
}

impl DisplayPolicy {
    pub fn from_config(config: &ChartsConfig) -> Self {
        Self {
            max_displayed_charts: config.max_displayed_charts,
            excluded_kinds: config.excluded_kinds.clone(),
        }
    }

    pub fn excludes(&self, kind: ChartKind) -> bool {
        self.excluded_kinds.contains(&kind)
    }

    /// Adapt `sources` in order, dropping excluded kinds and charts that fail
    /// to adapt, then cap the result at `max_displayed_charts`.
    ///
    /// The cap applies after adaptation, so a malformed chart never takes a
    /// display slot.
    pub fn displayed_charts(
        &self,
        adapter: &ChartAdapter,
        sources: &[ChartSource],
    ) -> Vec<RenderableChart> {
        sources
            .iter()
            .filter(|source| !self.excludes(source.kind()))
            .filter_map(|source| match adapter.adapt(source) {
                Ok(Some(chart)) => Some(chart),
                Ok(None) => {
                    debug!(title = source.title(), kind = ?source.kind(), "Chart has no display form");
                    None
                }
                Err(e) => {
                    warn!(title = source.title(), error = %e, "Skipping chart");
                    None
                }
            })
            .take(self.max_displayed_charts)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::RenderKind;

    fn bar(title: &str) -> ChartSource {
        ChartSource::Bar {
            title: title.into(),
            values: vec![1.0, 2.0],
            labels: None,
        }
    }

    #[test]
    fn test_malformed_chart_is_skipped_in_order() {
        let sources = vec![
            bar("first"),
            ChartSource::Scatter {
                title: "broken".into(),
                x: vec![1.0, 2.0, 3.0],
                y: vec![4.0, 5.0],
            },
            ChartSource::Heatmap {
                title: "third".into(),
                x: vec!["a".into()],
                y: vec!["r".into()],
                z: vec![vec![0.5]],
            },
        ];

        let charts = DisplayPolicy::default().displayed_charts(&ChartAdapter::default(), &sources);

        assert_eq!(charts.len(), 2);
        assert_eq!(charts[0].title, "first");
        assert_eq!(charts[0].kind, RenderKind::Bar);
        assert_eq!(charts[1].title, "third");
        assert_eq!(charts[1].kind, RenderKind::Heatmap);
    }

    #[test]
    fn test_cap_applies_after_adaptation() {
        let mut sources = vec![ChartSource::Histogram {
            title: "empty".into(),
            values: vec![],
        }];
        sources.extend((0..8).map(|i| bar(&format!("bar {}", i))));

        let charts = DisplayPolicy::default().displayed_charts(&ChartAdapter::default(), &sources);

        assert_eq!(charts.len(), 6);
        assert_eq!(charts[0].title, "bar 0");
        assert_eq!(charts[5].title, "bar 5");
    }

    #[test]
    fn test_boxplots_excluded_by_default() {
        let sources = vec![
            ChartSource::BoxPlot {
                title: "spread".into(),
                values: vec![1.0, 2.0],
            },
            ChartSource::Other {
                kind: "line".into(),
                title: "trend".into(),
            },
            bar("kept"),
        ];

        let charts = DisplayPolicy::default().displayed_charts(&ChartAdapter::default(), &sources);
        let titles: Vec<&str> = charts.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["kept"]);
    }

    #[test]
    fn test_policy_from_config() {
        let config = ChartsConfig {
            max_displayed_charts: 1,
            excluded_kinds: vec![ChartKind::Bar],
            histogram_bins: 5,
        };
        let policy = DisplayPolicy::from_config(&config);
        assert!(policy.excludes(ChartKind::Bar));
        assert!(!policy.excludes(ChartKind::BoxPlot));

        let sources = vec![
            bar("dropped"),
            ChartSource::Scatter {
                title: "s1".into(),
                x: vec![1.0],
                y: vec![1.0],
            },
            ChartSource::Scatter {
                title: "s2".into(),
                x: vec![2.0],
                y: vec![2.0],
            },
        ];
        let charts = policy.displayed_charts(&ChartAdapter::new(config.histogram_bins), &sources);
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].title, "s1");
    }

    #[test]
    fn test_zero_cap_shows_nothing() {
        let policy = DisplayPolicy {
            max_displayed_charts: 0,
            excluded_kinds: vec![],
        };
        assert!(policy
            .displayed_charts(&ChartAdapter::default(), &[bar("a")])
            .is_empty());
    }
}
