use std::fmt;

use serde::{Deserialize, Serialize};

/// Date as the backend sends it: ISO string or `{"$date": {"$numberLong": "<ms>"}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ApiDateField {
    Iso(String),
    Wrapped {
        #[serde(rename = "$date")]
        date: ApiNumberLong,
    },
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiNumberLong {
    #[serde(rename = "$numberLong")]
    pub number_long: String, // decimal millis since epoch
}

/// Document id: plain string or `{"$oid": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ApiObjectId {
    Plain(String),
    Oid {
        #[serde(rename = "$oid")]
        oid: String,
    },
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSentimentAnalysis {
    #[serde(default)]
    pub prediction_confidence: Option<f64>,
    #[serde(default)]
    pub prediction_value: Option<String>, // "positive" | "negative" | "neutral" (any case)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiClassificationValue {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub scores: Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiNewsClassification {
    #[serde(default)]
    pub prediction_confidence: Option<f64>,
    #[serde(default)]
    pub prediction_value: Option<ApiClassificationValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiPredictions {
    #[serde(default)]
    pub sentiment_analysis: Option<ApiSentimentAnalysis>,
    #[serde(default)]
    pub news_classification: Option<ApiNewsClassification>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiArticle {
    #[serde(default, rename = "_id")]
    pub id: Option<ApiObjectId>,
    #[serde(default)]
    pub source: ApiSource,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub url_to_image: Option<String>,
    #[serde(default)]
    pub published_at: Option<ApiDateField>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub created_at: Option<ApiDateField>,
    #[serde(default)]
    pub updated_at: Option<ApiDateField>,
    #[serde(default)]
    pub sentiment_analysis: Option<ApiSentimentAnalysis>, // legacy shape
    #[serde(default)]
    pub predictions: Option<ApiPredictions>, // current shape
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiPaginatedArticles {
    #[serde(default)]
    pub articles: Vec<ApiArticle>,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub current_page_count: Option<u64>,
    #[serde(default)]
    pub page: Option<u32>, // echoed by the server; not trusted
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiPredictor {
    #[serde(default, rename = "_id")]
    pub id: Option<ApiObjectId>,
    pub prediction_type: String,
    pub predictor_version: u32,
    #[serde(default)]
    pub predictor_description: String,
    #[serde(default)]
    pub traffic_percentage: f64,
    #[serde(default)]
    pub created_at: Option<ApiDateField>,
    #[serde(default)]
    pub updated_at: Option<ApiDateField>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiPredictorsResponse {
    #[serde(default)]
    pub prediction_type: String,
    #[serde(default)]
    pub predictors: Vec<ApiPredictor>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiPredictionTypes {
    #[serde(default)]
    pub prediction_types: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiPredictorVersions {
    #[serde(default)]
    pub prediction_type: String,
    #[serde(default, alias = "predictor_versions")]
    pub versions: Vec<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiMetricTags {
    #[serde(default)]
    pub prediction_type: String,
    #[serde(default)]
    pub predictor_version: ApiVersionTag,
}

/// Version tag on metric rows: `"3"` or `3`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ApiVersionTag {
    Text(String),
    Number(serde_json::Number),
    Other(serde_json::Value),
}

impl Default for ApiVersionTag {
    fn default() -> Self {
        ApiVersionTag::Text(String::new())
    }
}

impl fmt::Display for ApiVersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiVersionTag::Text(s) => f.write_str(s.trim()),
            ApiVersionTag::Number(n) => write!(f, "{}", n),
            ApiVersionTag::Other(_) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTrafficMetric {
    #[serde(default, rename = "_id")]
    pub id: Option<ApiObjectId>,
    #[serde(default)]
    pub metric_name: String,
    #[serde(default)]
    pub metric_value: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: ApiMetricTags,
    #[serde(default)]
    pub created_at: Option<ApiDateField>,
    #[serde(default)]
    pub updated_at: Option<ApiDateField>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiTrafficMetrics {
    #[serde(default)]
    pub metrics: Vec<ApiTrafficMetric>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiMetricSummary {
    #[serde(default)]
    pub avg_value: f64,
    #[serde(default)]
    pub sum_value: f64,
    #[serde(default)]
    pub count: f64,
    #[serde(default)]
    pub min_value: f64,
    #[serde(default)]
    pub max_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMetricBin {
    pub bin_index: u32,
    pub bin_start: f64,
    pub bin_end: f64,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiMetricBins {
    #[serde(default)]
    pub metric_bins: Vec<ApiMetricBin>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn date_field_accepts_both_encodings_and_anything_else() {
        let iso: ApiDateField = serde_json::from_value(json!("2024-03-01T10:00:00Z")).unwrap();
        assert!(matches!(iso, ApiDateField::Iso(_)));

        let wrapped: ApiDateField =
            serde_json::from_value(json!({"$date": {"$numberLong": "1709287200000"}})).unwrap();
        assert!(matches!(wrapped, ApiDateField::Wrapped { .. }));

        let other: ApiDateField = serde_json::from_value(json!(12345)).unwrap();
        assert!(matches!(other, ApiDateField::Other(_)));
    }

    #[test]
    fn article_with_only_required_bits_decodes() {
        let a: ApiArticle = serde_json::from_value(json!({
            "source": {"name": "Reuters"},
            "created_at": "2024-03-01T10:00:00Z",
            "updated_at": "2024-03-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(a.source.name.as_deref(), Some("Reuters"));
        assert!(a.predictions.is_none());
        assert!(a.id.is_none());
    }

    #[test]
    fn predictor_id_decodes_from_oid() {
        let p: ApiPredictor = serde_json::from_value(json!({
            "_id": {"$oid": "65f0c0ffee"},
            "prediction_type": "sentiment_analysis",
            "predictor_version": 2,
            "predictor_description": "distilbert",
            "traffic_percentage": 25.5,
            "created_at": {"$date": {"$numberLong": "1700000000000"}},
            "updated_at": {"$date": {"$numberLong": "1700000000000"}}
        }))
        .unwrap();
        assert_eq!(p.id, Some(ApiObjectId::Oid { oid: "65f0c0ffee".into() }));
        assert_eq!(p.predictor_version, 2);
    }

    #[test]
    fn versions_accept_either_field_name() {
        let v: ApiPredictorVersions =
            serde_json::from_value(json!({"prediction_type": "x", "predictor_versions": [1, 3]})).unwrap();
        assert_eq!(v.versions, vec![1, 3]);
    }
}
