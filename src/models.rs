use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleSource {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub key: String, // backend id, or "article-<index>" when absent
    pub id: Option<String>,
    pub source: ArticleSource,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub content: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub sentiment: Option<SentimentResult>,
    pub classification: Option<ClassificationResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    Unknown,
}

impl SentimentLabel {
    /// Case-insensitive; anything unrecognized is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "positive" => SentimentLabel::Positive,
            "negative" => SentimentLabel::Negative,
            "neutral" => SentimentLabel::Neutral,
            _ => SentimentLabel::Unknown,
        }
    }
}

/// Feed filter; `All` sends no `sentiment` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentFilter {
    #[default]
    All,
    Positive,
    Neutral,
    Negative,
}

impl SentimentFilter {
    pub fn as_query(self) -> Option<&'static str> {
        match self {
            SentimentFilter::All => None,
            SentimentFilter::Positive => Some("positive"),
            SentimentFilter::Neutral => Some("neutral"),
            SentimentFilter::Negative => Some("negative"),
        }
    }
}

impl std::str::FromStr for SentimentFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "" => Ok(SentimentFilter::All),
            "positive" => Ok(SentimentFilter::Positive),
            "neutral" => Ok(SentimentFilter::Neutral),
            "negative" => Ok(SentimentFilter::Negative),
            other => Err(format!("unknown sentiment filter {:?} (all, positive, neutral, negative)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    pub confidence: Option<f64>, // [0.0, 1.0]
}

/// Index-aligned: `labels[i]` pairs with `scores[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub labels: Vec<String>,
    pub scores: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32, // 1-based, as requested
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn pages_for(total_count: u64, per_page: u32) -> u32 {
        if per_page == 0 {
            return 0;
        }
        total_count.div_ceil(per_page as u64) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictorStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictor {
    pub id: String,
    pub prediction_type: String,
    pub version: u32,
    pub description: String,
    pub traffic_percentage: f64, // [0, 100]
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Predictor {
    pub fn status(&self) -> PredictorStatus {
        if self.traffic_percentage > 0.0 {
            PredictorStatus::Active
        } else {
            PredictorStatus::Inactive
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    TrafficUpdate,
    TrafficDeactivation,
}

impl ActivityKind {
    /// `metric_name` queried on `/metrics` for this kind.
    pub fn metric_name(self) -> &'static str {
        match self {
            ActivityKind::TrafficUpdate => "predictor_traffic_update",
            ActivityKind::TrafficDeactivation => "predictor_traffic_deactivation",
        }
    }

    pub fn default_reason(self) -> &'static str {
        match self {
            ActivityKind::TrafficUpdate => "Traffic allocation updated",
            ActivityKind::TrafficDeactivation => "Traffic deactivated",
        }
    }

    pub fn action_label(self) -> &'static str {
        match self {
            ActivityKind::TrafficUpdate => "TRAFFIC UPDATE",
            ActivityKind::TrafficDeactivation => "TRAFFIC DEACTIVATION",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: ActivityKind,
    pub version: String, // "v<version>"
    pub traffic_value: f64,
    pub reason: String,
    pub prediction_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricBin {
    pub bin_index: u32,
    pub start: f64,
    pub end: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub avg: f64,
    pub sum: f64,
    pub count: u64,
    pub min: f64,
    pub max: f64,
}

impl MetricSummary {
    pub fn zeroed() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSummary {
    pub version: u32,
    pub summary: MetricSummary,
    pub traffic_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionHistogram {
    pub version: u32,
    pub bins: Vec<MetricBin>,
    pub traffic_percentage: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_label_is_case_insensitive() {
        assert_eq!(SentimentLabel::parse("POSITIVE"), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::parse(" Negative "), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::parse("neutral"), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::parse("mixed"), SentimentLabel::Unknown);
        assert_eq!(SentimentLabel::parse(""), SentimentLabel::Unknown);
    }

    #[test]
    fn sentiment_filter_parses_and_maps_to_query() {
        assert_eq!("all".parse::<SentimentFilter>().unwrap().as_query(), None);
        assert_eq!("Negative".parse::<SentimentFilter>().unwrap().as_query(), Some("negative"));
        assert!("happy".parse::<SentimentFilter>().is_err());
    }

    #[test]
    fn predictor_status_follows_traffic() {
        let mut p = Predictor {
            id: "a".into(),
            prediction_type: "sentiment_analysis".into(),
            version: 1,
            description: String::new(),
            traffic_percentage: 0.0,
            created_at: None,
            updated_at: None,
        };
        assert_eq!(p.status(), PredictorStatus::Inactive);
        p.traffic_percentage = 0.5;
        assert_eq!(p.status(), PredictorStatus::Active);
    }

    #[test]
    fn pages_round_up() {
        assert_eq!(Page::<()>::pages_for(0, 12), 0);
        assert_eq!(Page::<()>::pages_for(12, 12), 1);
        assert_eq!(Page::<()>::pages_for(13, 12), 2);
        assert_eq!(Page::<()>::pages_for(5, 0), 0);
    }
}
