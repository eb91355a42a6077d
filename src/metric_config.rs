use serde::Serialize;

use crate::models::{MetricBin, MetricSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryField {
    Avg,
    Sum,
    Count,
    Min,
    Max,
}

impl SummaryField {
    pub fn value(self, s: &MetricSummary) -> f64 {
        match self {
            SummaryField::Avg => s.avg,
            SummaryField::Sum => s.sum,
            SummaryField::Count => s.count as f64,
            SummaryField::Min => s.min,
            SummaryField::Max => s.max,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueFormat {
    Integer,
    Fixed { decimals: usize, unit: &'static str },
}

impl ValueFormat {
    pub const SECONDS: ValueFormat = ValueFormat::Fixed { decimals: 2, unit: "s" };
    pub const DOLLARS: ValueFormat = ValueFormat::Fixed { decimals: 2, unit: "$" };

    pub fn format(self, value: f64) -> String {
        match self {
            ValueFormat::Integer => format!("{:.0}", value),
            ValueFormat::Fixed { decimals, unit } => format!("{:.*}{}", decimals, value, unit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub field: SummaryField,
    pub label: String,
    pub format: ValueFormat,
    pub primary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum BinLabel {
    Index,
    Range(ValueFormat),
}

impl BinLabel {
    pub fn label(self, bin: &MetricBin) -> String {
        match self {
            BinLabel::Index => format!("Bin {}", bin.bin_index + 1),
            BinLabel::Range(fmt) => format!("{} - {}", fmt.format(bin.start), fmt.format(bin.end)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PanelKind {
    Summary {
        fields: Vec<FieldSpec>,
    },
    Histogram {
        y_axis_label: String,
        bar_name: String,
        num_bins: u32,
        bin_label: BinLabel,
    },
}

/// One dashboard panel: which metric to query and how to present it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPanelSpec {
    pub metric_name: String,
    pub title: String,
    pub kind: PanelKind,
}

impl MetricPanelSpec {
    pub fn summary(metric_name: &str, title: &str) -> Self {
        Self {
            metric_name: metric_name.to_string(),
            title: title.to_string(),
            kind: PanelKind::Summary { fields: Vec::new() },
        }
    }

    pub fn histogram(metric_name: &str, title: &str, bar_name: &str, num_bins: u32, bin_label: BinLabel) -> Self {
        Self {
            metric_name: metric_name.to_string(),
            title: title.to_string(),
            kind: PanelKind::Histogram {
                y_axis_label: "Count".to_string(),
                bar_name: bar_name.to_string(),
                num_bins,
                bin_label,
            },
        }
    }

    /// Appends a column; no-op on histogram panels.
    pub fn field(mut self, field: SummaryField, label: &str, format: ValueFormat, primary: bool) -> Self {
        if let PanelKind::Summary { fields } = &mut self.kind {
            fields.push(FieldSpec {
                field,
                label: label.to_string(),
                format,
                primary,
            });
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRegistry {
    pub panels: Vec<MetricPanelSpec>,
}

impl MetricRegistry {
    pub fn new(panels: Vec<MetricPanelSpec>) -> Self {
        Self { panels }
    }

    pub fn find(&self, metric_name: &str, histogram: bool) -> Option<&MetricPanelSpec> {
        self.panels.iter().find(|p| {
            p.metric_name == metric_name && matches!(p.kind, PanelKind::Histogram { .. }) == histogram
        })
    }
}

fn latency_summary(metric_name: &str, title: &str, count_label: &str) -> MetricPanelSpec {
    MetricPanelSpec::summary(metric_name, title)
        .field(SummaryField::Count, count_label, ValueFormat::Integer, true)
        .field(SummaryField::Avg, "Average", ValueFormat::SECONDS, false)
        .field(SummaryField::Min, "Min", ValueFormat::SECONDS, false)
        .field(SummaryField::Max, "Max", ValueFormat::SECONDS, false)
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new(vec![
            latency_summary("predictor_latency", "Inference", "Requests"),
            latency_summary("predictor_loading_latency", "Loading Latency", "Count"),
            MetricPanelSpec::summary("predictor_error", "Inference Errors")
                .field(SummaryField::Count, "Count", ValueFormat::Integer, true),
            MetricPanelSpec::summary("predictor_loading_error", "Loading Errors")
                .field(SummaryField::Count, "Count", ValueFormat::Integer, true),
            MetricPanelSpec::histogram(
                "predictor_latency",
                "Predictor Latency Distribution",
                "Predictor latency",
                10,
                BinLabel::Range(ValueFormat::SECONDS),
            ),
            MetricPanelSpec::histogram(
                "predictor_loading_latency",
                "Predictor Loading Latency Distribution",
                "Predictor loading latency",
                10,
                BinLabel::Range(ValueFormat::SECONDS),
            ),
            MetricPanelSpec::histogram(
                "predictor_price",
                "Predictor Price Per Call Distribution",
                "Predictor price per call",
                10,
                BinLabel::Range(ValueFormat::DOLLARS),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_layout() {
        let reg = MetricRegistry::default();
        assert_eq!(reg.panels.len(), 7);
        let inference = reg.find("predictor_latency", false).unwrap();
        assert_eq!(inference.title, "Inference");
        match &inference.kind {
            PanelKind::Summary { fields } => {
                assert_eq!(fields.len(), 4);
                assert!(fields[0].primary);
                assert_eq!(fields[0].label, "Requests");
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert!(reg.find("predictor_price", true).is_some());
        assert!(reg.find("predictor_price", false).is_none());
    }

    #[test]
    fn value_formats() {
        assert_eq!(ValueFormat::Integer.format(41.6), "42");
        assert_eq!(ValueFormat::SECONDS.format(0.1234), "0.12s");
        assert_eq!(ValueFormat::DOLLARS.format(3.0), "3.00$");
    }

    #[test]
    fn bin_labels() {
        let bin = MetricBin { bin_index: 0, start: 0.0, end: 0.25, count: 4 };
        assert_eq!(BinLabel::Index.label(&bin), "Bin 1");
        assert_eq!(BinLabel::Range(ValueFormat::SECONDS).label(&bin), "0.00s - 0.25s");
    }

    #[test]
    fn field_reads_summary() {
        let s = MetricSummary { avg: 1.5, sum: 3.0, count: 2, min: 1.0, max: 2.0 };
        assert_eq!(SummaryField::Count.value(&s), 2.0);
        assert_eq!(SummaryField::Max.value(&s), 2.0);
    }
}
