use std::collections::HashMap;

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

use crate::models::*;

pub const CATEGORY_THRESHOLD: f64 = 0.70;
pub const MAX_CATEGORIES: usize = 3;
pub const TRAFFIC_SUMMARY_SLOTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Success,
    Error,
    Neutral,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentimentDisplay {
    pub label_text: String,
    pub tone: Tone,
}

pub fn sentiment_display(label: SentimentLabel) -> SentimentDisplay {
    let (label_text, tone) = match label {
        SentimentLabel::Positive => ("😊 Positive", Tone::Success),
        SentimentLabel::Negative => ("😞 Negative", Tone::Error),
        SentimentLabel::Neutral => ("😐 Neutral", Tone::Neutral),
        SentimentLabel::Unknown => ("Unknown", Tone::Default),
    };
    SentimentDisplay {
        label_text: label_text.to_string(),
        tone,
    }
}

/// Same as [`sentiment_display`] for a raw backend string.
pub fn sentiment_display_str(raw: &str) -> SentimentDisplay {
    sentiment_display(SentimentLabel::parse(raw))
}

/// Entries scoring at least `threshold`, highest first (stable on ties), at most `max_count`.
pub fn top_categories(
    classification: Option<&ClassificationResult>,
    threshold: f64,
    max_count: usize,
) -> Vec<CategoryScore> {
    let Some(c) = classification else {
        return Vec::new();
    };
    let mut picked: Vec<CategoryScore> = c
        .labels
        .iter()
        .zip(c.scores.iter())
        .filter(|(_, score)| **score >= threshold)
        .map(|(label, &score)| CategoryScore {
            label: label.clone(),
            score,
        })
        .collect();
    picked.sort_by(|a, b| b.score.total_cmp(&a.score));
    picked.truncate(max_count);
    picked
}

pub fn default_top_categories(classification: Option<&ClassificationResult>) -> Vec<CategoryScore> {
    top_categories(classification, CATEGORY_THRESHOLD, MAX_CATEGORIES)
}

/// Concatenate A then B, order newest first, then cut to `limit`.
pub fn merge_activity_logs(
    stream_a: Vec<ActivityLogEntry>,
    stream_b: Vec<ActivityLogEntry>,
    limit: usize,
) -> Vec<ActivityLogEntry> {
    let mut merged = stream_a;
    merged.extend(stream_b);
    merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    merged.truncate(limit);
    merged
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivityFilter {
    #[default]
    All,
    Updates,
    Deactivations,
}

impl ActivityFilter {
    pub fn admits(self, kind: ActivityKind) -> bool {
        match self {
            ActivityFilter::All => true,
            ActivityFilter::Updates => kind == ActivityKind::TrafficUpdate,
            ActivityFilter::Deactivations => kind == ActivityKind::TrafficDeactivation,
        }
    }
}

impl std::str::FromStr for ActivityFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(ActivityFilter::All),
            "updates" | "update" => Ok(ActivityFilter::Updates),
            "deactivations" | "deactivation" => Ok(ActivityFilter::Deactivations),
            other => Err(format!("unknown log tab {:?} (all, updates, deactivations)", other)),
        }
    }
}

pub fn filter_activity_logs(logs: &[ActivityLogEntry], filter: ActivityFilter) -> Vec<&ActivityLogEntry> {
    logs.iter().filter(|l| filter.admits(l.kind)).collect()
}

static CATEGORY_EMOJI: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("breaking news", "🚨"),
        ("politics", "🏛️"),
        ("economy", "📈"),
        ("business", "💼"),
        ("technology", "💻"),
        ("health", "🏥"),
        ("science", "🔬"),
        ("sports", "⚽"),
        ("entertainment", "🎬"),
        ("world news", "🌍"),
        ("local news", "🏘️"),
        ("opinion", "💭"),
        ("lifestyle", "🌟"),
        ("environment", "🌱"),
        ("military", "⚔️"),
        ("crime", "🚔"),
        ("weather", "🌤️"),
        ("education", "📚"),
    ])
});

const DEFAULT_CATEGORY_EMOJI: &str = "📰";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryDisplay {
    pub emoji: &'static str,
    pub label_text: String,
}

pub fn category_display(category: &str) -> CategoryDisplay {
    let key = category.trim().nfc().collect::<String>().to_lowercase();
    let emoji = CATEGORY_EMOJI.get(key.as_str()).copied().unwrap_or(DEFAULT_CATEGORY_EMOJI);
    let mut chars = category.trim().chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    CategoryDisplay {
        emoji,
        label_text: format!("{} {}", emoji, capitalized),
    }
}

static WORD_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w").unwrap());

/// `news_classification` -> `News Classification`.
pub fn humanize_prediction_type(raw: &str) -> String {
    let spaced = raw.replace('_', " ");
    WORD_START
        .replace_all(&spaced, |caps: &regex::Captures| caps[0].to_uppercase())
        .into_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficSummary {
    pub top: Vec<Predictor>,
    pub active_count: usize,
    pub total_traffic: i64,
}

/// Active deployments by descending traffic; the headline shows at most four.
pub fn traffic_summary(deployments: &[Predictor]) -> TrafficSummary {
    let active: Vec<&Predictor> = deployments
        .iter()
        .filter(|d| d.status() == PredictorStatus::Active)
        .collect();
    let total: f64 = active.iter().map(|d| d.traffic_percentage).sum();
    let top = active
        .iter()
        .sorted_by(|a, b| b.traffic_percentage.total_cmp(&a.traffic_percentage))
        .take(TRAFFIC_SUMMARY_SLOTS)
        .map(|d| (*d).clone())
        .collect();
    TrafficSummary {
        top,
        active_count: active.len(),
        total_traffic: total.round() as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn classification(pairs: &[(&str, f64)]) -> ClassificationResult {
        ClassificationResult {
            labels: pairs.iter().map(|(l, _)| l.to_string()).collect(),
            scores: pairs.iter().map(|(_, s)| *s).collect(),
        }
    }

    fn log(id: &str, secs: i64, kind: ActivityKind) -> ActivityLogEntry {
        ActivityLogEntry {
            id: id.into(),
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            kind,
            version: "v1".into(),
            traffic_value: 50.0,
            reason: kind.default_reason().into(),
            prediction_type: "sentiment_analysis".into(),
        }
    }

    fn predictor(version: u32, traffic: f64) -> Predictor {
        Predictor {
            id: format!("p{}", version),
            prediction_type: "sentiment_analysis".into(),
            version,
            description: String::new(),
            traffic_percentage: traffic,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn sentiment_tones() {
        assert_eq!(sentiment_display_str("POSITIVE").tone, Tone::Success);
        assert_eq!(sentiment_display_str("negative").tone, Tone::Error);
        assert_eq!(sentiment_display_str("Neutral").label_text, "😐 Neutral");
        let unknown = sentiment_display_str("ecstatic");
        assert_eq!(unknown.tone, Tone::Default);
        assert_eq!(unknown.label_text, "Unknown");
    }

    #[test]
    fn top_categories_filters_sorts_and_truncates() {
        let c = classification(&[
            ("sports", 0.71),
            ("politics", 0.95),
            ("economy", 0.69),
            ("business", 0.80),
            ("technology", 0.80),
            ("health", 0.75),
        ]);
        let top = default_top_categories(Some(&c));
        let labels: Vec<&str> = top.iter().map(|t| t.label.as_str()).collect();
        // business and technology tie; original order is kept
        assert_eq!(labels, vec!["politics", "business", "technology"]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let c = classification(&[("crime", 0.70)]);
        assert_eq!(default_top_categories(Some(&c)).len(), 1);
    }

    #[test]
    fn empty_inputs_give_empty_output() {
        assert!(default_top_categories(None).is_empty());
        assert!(default_top_categories(Some(&ClassificationResult::default())).is_empty());
        let low = classification(&[("a", 0.1), ("b", 0.5)]);
        assert!(default_top_categories(Some(&low)).is_empty());
    }

    #[test]
    fn merge_interleaves_by_time_and_truncates_after_merging() {
        let updates = vec![log("u1", 100, ActivityKind::TrafficUpdate), log("u2", 300, ActivityKind::TrafficUpdate)];
        let deacts = vec![log("d1", 200, ActivityKind::TrafficDeactivation), log("d2", 400, ActivityKind::TrafficDeactivation)];
        let merged = merge_activity_logs(updates, deacts, 3);
        let ids: Vec<&str> = merged.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["d2", "u2", "d1"]);
    }

    #[test]
    fn merge_ties_keep_stream_a_first() {
        let merged = merge_activity_logs(
            vec![log("a", 100, ActivityKind::TrafficUpdate)],
            vec![log("b", 100, ActivityKind::TrafficDeactivation)],
            10,
        );
        assert_eq!(merged[0].id, "a");
        assert_eq!(merged[1].id, "b");
    }

    #[test]
    fn activity_filter_tabs() {
        let logs = vec![log("u", 1, ActivityKind::TrafficUpdate), log("d", 2, ActivityKind::TrafficDeactivation)];
        assert_eq!(filter_activity_logs(&logs, ActivityFilter::All).len(), 2);
        assert_eq!(filter_activity_logs(&logs, ActivityFilter::Updates)[0].id, "u");
        assert_eq!(filter_activity_logs(&logs, ActivityFilter::Deactivations)[0].id, "d");
    }

    #[test]
    fn category_display_known_and_fallback() {
        assert_eq!(category_display("Politics").label_text, "🏛️ Politics");
        assert_eq!(category_display("world news").label_text, "🌍 World news");
        let other = category_display("gardening");
        assert_eq!(other.emoji, "📰");
        assert_eq!(other.label_text, "📰 Gardening");
    }

    #[test]
    fn humanize_types() {
        assert_eq!(humanize_prediction_type("news_classification"), "News Classification");
        assert_eq!(humanize_prediction_type("sentiment_analysis"), "Sentiment Analysis");
    }

    #[test]
    fn traffic_summary_counts_active_only() {
        let ds = vec![
            predictor(1, 10.0),
            predictor(2, 0.0),
            predictor(3, 40.4),
            predictor(4, 20.0),
            predictor(5, 29.9),
            predictor(6, 0.1),
        ];
        let s = traffic_summary(&ds);
        assert_eq!(s.active_count, 5);
        assert_eq!(s.total_traffic, 100);
        assert_eq!(s.top.iter().map(|p| p.version).collect::<Vec<_>>(), vec![3, 5, 4, 1]);
    }
}
