use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use crate::api_types::*;
use crate::models::*;

/// ISO-8601 string or wrapped millisecond epoch; anything else is absent.
pub fn normalize_published_at(raw: Option<&ApiDateField>) -> Option<DateTime<Utc>> {
    match raw? {
        ApiDateField::Iso(s) => parse_iso(s),
        ApiDateField::Wrapped { date } => {
            let millis: i64 = date.number_long.trim().parse().ok()?;
            DateTime::from_timestamp_millis(millis)
        }
        ApiDateField::Other(_) => None,
    }
}

fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // offset-less timestamps are read as UTC
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn sentiment_from(raw: &ApiSentimentAnalysis) -> SentimentResult {
    SentimentResult {
        label: raw
            .prediction_value
            .as_deref()
            .map(SentimentLabel::parse)
            .unwrap_or(SentimentLabel::Unknown),
        confidence: raw.prediction_confidence,
    }
}

/// Current `predictions.sentiment_analysis` wins; legacy top-level field is the fallback.
pub fn normalize_sentiment(article: &ApiArticle) -> Option<SentimentResult> {
    article
        .predictions
        .as_ref()
        .and_then(|p| p.sentiment_analysis.as_ref())
        .or(article.sentiment_analysis.as_ref())
        .map(sentiment_from)
}

/// Only the current envelope carries classification. Unequal arrays are truncated to the shorter.
pub fn normalize_classification(article: &ApiArticle) -> Option<ClassificationResult> {
    let value = article
        .predictions
        .as_ref()?
        .news_classification
        .as_ref()?
        .prediction_value
        .as_ref()?;

    let n = value.labels.len().min(value.scores.len());
    if n != value.labels.len() || n != value.scores.len() {
        debug!(
            "Classification arrays differ - labels={}, scores={}, truncating to {}",
            value.labels.len(),
            value.scores.len(),
            n
        );
    }
    Some(ClassificationResult {
        labels: value.labels[..n].to_vec(),
        scores: value.scores[..n].to_vec(),
    })
}

fn object_id(raw: Option<&ApiObjectId>) -> Option<String> {
    let id = match raw? {
        ApiObjectId::Plain(s) => s,
        ApiObjectId::Oid { oid } => oid,
        ApiObjectId::Other(_) => return None,
    };
    Some(id.clone()).filter(|s| !s.is_empty())
}

fn non_empty(s: &Option<String>) -> Option<String> {
    s.as_ref().map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string)
}

/// `index` is the article's position in its page; it keys articles without an id.
pub fn normalize_article(raw: &ApiArticle, index: usize) -> Article {
    let id = object_id(raw.id.as_ref());
    Article {
        key: id.clone().unwrap_or_else(|| format!("article-{}", index)),
        id,
        source: ArticleSource {
            id: non_empty(&raw.source.id),
            name: non_empty(&raw.source.name).unwrap_or_default(),
        },
        author: non_empty(&raw.author),
        title: non_empty(&raw.title),
        description: non_empty(&raw.description),
        url: non_empty(&raw.url),
        image_url: non_empty(&raw.url_to_image),
        content: non_empty(&raw.content),
        published_at: normalize_published_at(raw.published_at.as_ref()),
        created_at: normalize_published_at(raw.created_at.as_ref()),
        updated_at: normalize_published_at(raw.updated_at.as_ref()),
        sentiment: normalize_sentiment(raw),
        classification: normalize_classification(raw),
    }
}

/// `page` and `per_page` come from the request; the server's echo is ignored.
pub fn normalize_article_page(raw: ApiPaginatedArticles, page: u32, per_page: u32) -> Page<Article> {
    if let Some(echoed) = raw.page {
        if echoed != page {
            debug!("Server echoed page={} for requested page={}", echoed, page);
        }
    }
    let total_pages = raw
        .total_pages
        .unwrap_or_else(|| Page::<Article>::pages_for(raw.total_count, per_page));
    let items = raw
        .articles
        .iter()
        .enumerate()
        .map(|(i, a)| normalize_article(a, i))
        .collect();
    Page {
        items,
        total_count: raw.total_count,
        page,
        per_page,
        total_pages,
    }
}

pub fn normalize_predictor(raw: &ApiPredictor) -> Predictor {
    Predictor {
        id: object_id(raw.id.as_ref())
            .unwrap_or_else(|| format!("{}-v{}", raw.prediction_type, raw.predictor_version)),
        prediction_type: raw.prediction_type.clone(),
        version: raw.predictor_version,
        description: raw.predictor_description.trim().to_string(),
        traffic_percentage: raw.traffic_percentage,
        created_at: normalize_published_at(raw.created_at.as_ref()),
        updated_at: normalize_published_at(raw.updated_at.as_ref()),
    }
}

/// Rows without a readable `created_at` cannot be ordered and are dropped.
pub fn normalize_activity_log(raw: &ApiTrafficMetric, kind: ActivityKind) -> Option<ActivityLogEntry> {
    let Some(timestamp) = normalize_published_at(raw.created_at.as_ref()) else {
        debug!("Dropping {} row without timestamp", kind.metric_name());
        return None;
    };
    let reason = non_empty(&raw.description).unwrap_or_else(|| kind.default_reason().to_string());
    Some(ActivityLogEntry {
        id: object_id(raw.id.as_ref())
            .unwrap_or_else(|| format!("{}-{}", kind.metric_name(), timestamp.timestamp_millis())),
        timestamp,
        kind,
        version: format!("v{}", raw.tags.predictor_version),
        traffic_value: raw.metric_value,
        reason,
        prediction_type: raw.tags.prediction_type.clone(),
    })
}

/// `None` is the backend's 404: an explicit zeroed summary.
pub fn normalize_summary(raw: Option<ApiMetricSummary>) -> MetricSummary {
    match raw {
        None => MetricSummary::zeroed(),
        Some(s) => MetricSummary {
            avg: s.avg_value,
            sum: s.sum_value,
            count: s.count.max(0.0).round() as u64,
            min: s.min_value,
            max: s.max_value,
        },
    }
}

/// `None` is the backend's 404: no bins. Bins come back ordered by index.
pub fn normalize_bins(raw: Option<ApiMetricBins>) -> Vec<MetricBin> {
    let mut bins: Vec<MetricBin> = raw
        .map(|r| r.metric_bins)
        .unwrap_or_default()
        .into_iter()
        .map(|b| MetricBin {
            bin_index: b.bin_index,
            start: b.bin_start,
            end: b.bin_end,
            count: b.count,
        })
        .collect();
    bins.sort_by_key(|b| b.bin_index);
    bins
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn article(v: serde_json::Value) -> ApiArticle {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn iso_and_wrapped_epoch_are_the_same_instant() {
        let iso = ApiDateField::Iso("2024-03-01T10:00:00.000Z".into());
        let wrapped = ApiDateField::Wrapped {
            date: ApiNumberLong { number_long: "1709287200000".into() },
        };
        let a = normalize_published_at(Some(&iso)).unwrap();
        let b = normalize_published_at(Some(&wrapped)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn absent_or_unknown_dates_are_none() {
        assert_eq!(normalize_published_at(None), None);
        assert_eq!(normalize_published_at(Some(&ApiDateField::Other(json!(42)))), None);
        assert_eq!(normalize_published_at(Some(&ApiDateField::Iso("yesterday".into()))), None);
        let bad = ApiDateField::Wrapped { date: ApiNumberLong { number_long: "12abc".into() } };
        assert_eq!(normalize_published_at(Some(&bad)), None);
    }

    #[test]
    fn offsetless_and_date_only_strings_parse_as_utc() {
        let a = normalize_published_at(Some(&ApiDateField::Iso("2024-03-01T10:00:00".into()))).unwrap();
        assert_eq!(a, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
        let d = normalize_published_at(Some(&ApiDateField::Iso("2024-03-01".into()))).unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn legacy_and_current_sentiment_normalize_identically() {
        let legacy = article(json!({
            "source": {"name": "AP"},
            "sentiment_analysis": {"prediction_value": "Positive", "prediction_confidence": 0.91}
        }));
        let current = article(json!({
            "source": {"name": "AP"},
            "predictions": {"sentiment_analysis": {"prediction_value": "positive", "prediction_confidence": 0.91}}
        }));
        assert_eq!(normalize_sentiment(&legacy), normalize_sentiment(&current));
        assert_eq!(normalize_sentiment(&legacy).unwrap().label, SentimentLabel::Positive);
    }

    #[test]
    fn current_envelope_wins_over_legacy() {
        let both = article(json!({
            "sentiment_analysis": {"prediction_value": "negative"},
            "predictions": {"sentiment_analysis": {"prediction_value": "neutral"}}
        }));
        assert_eq!(normalize_sentiment(&both).unwrap().label, SentimentLabel::Neutral);

        // envelope present but without sentiment still falls back
        let envelope_only_classification = article(json!({
            "sentiment_analysis": {"prediction_value": "negative"},
            "predictions": {"news_classification": {"prediction_value": {"labels": [], "scores": []}}}
        }));
        assert_eq!(
            normalize_sentiment(&envelope_only_classification).unwrap().label,
            SentimentLabel::Negative
        );
        assert_eq!(normalize_sentiment(&article(json!({}))), None);
    }

    #[test]
    fn classification_has_no_legacy_fallback_and_truncates() {
        assert_eq!(normalize_classification(&article(json!({}))), None);
        let uneven = article(json!({
            "predictions": {"news_classification": {"prediction_value": {
                "labels": ["politics", "economy", "sports"],
                "scores": [0.9, 0.8]
            }}}
        }));
        let c = normalize_classification(&uneven).unwrap();
        assert_eq!(c.labels, vec!["politics", "economy"]);
        assert_eq!(c.scores, vec![0.9, 0.8]);
    }

    #[test]
    fn articles_without_id_get_positional_keys() {
        let raw: ApiPaginatedArticles = serde_json::from_value(json!({
            "articles": [
                {"_id": "abc", "source": {"name": "BBC"}},
                {"source": {"name": "CNN"}, "title": "  "}
            ],
            "total_count": 30,
            "page": 9,
            "per_page": 12,
            "total_pages": 3
        }))
        .unwrap();
        let page = normalize_article_page(raw, 2, 12);
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items[0].key, "abc");
        assert_eq!(page.items[1].key, "article-1");
        assert_eq!(page.items[1].title, None);
    }

    #[test]
    fn total_pages_computed_when_missing() {
        let raw = ApiPaginatedArticles { total_count: 25, ..Default::default() };
        assert_eq!(normalize_article_page(raw, 1, 12).total_pages, 3);
    }

    #[test]
    fn activity_log_reason_falls_back_per_kind() {
        let raw: ApiTrafficMetric = serde_json::from_value(json!({
            "_id": {"$oid": "m1"},
            "metric_name": "predictor_traffic_deactivation",
            "metric_value": 0.0,
            "description": "",
            "tags": {"prediction_type": "sentiment_analysis", "predictor_version": "3"},
            "created_at": {"$date": {"$numberLong": "1700000000000"}}
        }))
        .unwrap();
        let entry = normalize_activity_log(&raw, ActivityKind::TrafficDeactivation).unwrap();
        assert_eq!(entry.reason, "Traffic deactivated");
        assert_eq!(entry.version, "v3");
        assert_eq!(entry.id, "m1");

        let mut no_ts = raw.clone();
        no_ts.created_at = None;
        assert!(normalize_activity_log(&no_ts, ActivityKind::TrafficDeactivation).is_none());
    }

    #[test]
    fn numeric_version_tag_still_decodes() {
        let raw: ApiTrafficMetrics = serde_json::from_value(json!({
            "metrics": [{
                "metric_value": 40.0,
                "tags": {"prediction_type": "sentiment_analysis", "predictor_version": 4},
                "created_at": "2024-03-01T10:00:00Z"
            }]
        }))
        .unwrap();
        let entry = normalize_activity_log(&raw.metrics[0], ActivityKind::TrafficUpdate).unwrap();
        assert_eq!(entry.version, "v4");
        assert_eq!(entry.reason, "Traffic allocation updated");
    }

    #[test]
    fn not_found_summary_and_bins_are_empty() {
        assert_eq!(normalize_summary(None), MetricSummary { avg: 0.0, sum: 0.0, count: 0, min: 0.0, max: 0.0 });
        assert!(normalize_bins(None).is_empty());
    }

    #[test]
    fn bins_are_ordered_by_index() {
        let raw: ApiMetricBins = serde_json::from_value(json!({"metric_bins": [
            {"bin_index": 1, "bin_start": 0.5, "bin_end": 1.0, "count": 3},
            {"bin_index": 0, "bin_start": 0.0, "bin_end": 0.5, "count": 7}
        ]}))
        .unwrap();
        let bins = normalize_bins(Some(raw));
        assert_eq!(bins.iter().map(|b| b.bin_index).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(bins[0].count, 7);
    }
}
