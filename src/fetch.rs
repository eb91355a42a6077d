use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::future::{try_join, try_join_all};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::api::{build_api_url, Endpoint, QueryParams};
use crate::api_types::*;
use crate::derive::merge_activity_logs;
use crate::models::*;
use crate::normalize::*;

/// Status and body of a completed GET.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues GETs. Errors mean the request never produced a status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<RawResponse>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("smart_news_dash/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<RawResponse> {
        let resp = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("Request failed for {}", url))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .with_context(|| format!("Reading body for {}", url))?;
        Ok(RawResponse { status, body })
    }
}

/// Typed access to every backend route.
pub struct ApiClient<T: Transport = HttpTransport> {
    transport: T,
    base: Url,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, base: Url) -> Self {
        Self { transport, base }
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// `Ok(None)` on 404 when `not_found_is_empty`; any other non-2xx is an error.
    async fn get_json<D: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        params: &QueryParams,
        not_found_is_empty: bool,
    ) -> Result<Option<D>> {
        let url = build_api_url(&self.base, endpoint, params);
        let start = std::time::Instant::now();
        debug!("Fetching - endpoint={}, url={}", endpoint, url);

        let resp = match self.transport.get(&url).await {
            Ok(r) => r,
            Err(e) => {
                error!("Transport failure - endpoint={}, error={:#}", endpoint, e);
                return Err(e);
            }
        };

        if resp.status == 404 && not_found_is_empty {
            warn!("No data (404) - endpoint={}, url={}", endpoint, url);
            return Ok(None);
        }

        if !resp.is_success() {
            error!("HTTP failure - endpoint={}, status={}", endpoint, resp.status);
            bail!("HTTP error! status: {}", resp.status);
        }

        let parsed: D = serde_json::from_str(&resp.body)
            .with_context(|| format!("Decoding JSON for {}", url))?;

        info!(
            "Fetch completed - endpoint={}, duration={:.2}s, bytes={}",
            endpoint,
            start.elapsed().as_secs_f32(),
            resp.body.len()
        );
        Ok(Some(parsed))
    }

    async fn get_required<D: DeserializeOwned>(&self, endpoint: Endpoint, params: &QueryParams) -> Result<D> {
        self.get_json(endpoint, params, false)
            .await?
            .with_context(|| format!("Empty response from {}", endpoint))
    }

    /// One page of the feed. The returned page number is the one requested.
    pub async fn fetch_articles(&self, page: u32, per_page: u32, sentiment: SentimentFilter) -> Result<Page<Article>> {
        let page = page.max(1);
        let skip = (page - 1) as u64 * per_page as u64;
        let mut params: QueryParams = vec![("skip", skip.into()), ("limit", per_page.into())];
        if let Some(s) = sentiment.as_query() {
            params.push(("sentiment", s.into()));
        }
        let raw: ApiPaginatedArticles = self.get_required(Endpoint::Articles, &params).await?;
        Ok(normalize_article_page(raw, page, per_page))
    }

    pub async fn fetch_prediction_types(&self) -> Result<Vec<String>> {
        let raw: ApiPredictionTypes = self.get_required(Endpoint::PredictorTypes, &Vec::new()).await?;
        Ok(raw.prediction_types)
    }

    pub async fn fetch_predictors(&self, prediction_type: &str, min_traffic: Option<u32>) -> Result<Vec<Predictor>> {
        let mut params: QueryParams = vec![("prediction_type", prediction_type.into())];
        if let Some(m) = min_traffic {
            params.push(("min_traffic", m.into()));
        }
        let raw: ApiPredictorsResponse = self.get_required(Endpoint::Predictors, &params).await?;
        Ok(raw.predictors.iter().map(normalize_predictor).collect())
    }

    pub async fn fetch_predictor_versions(&self, prediction_type: &str) -> Result<Vec<u32>> {
        let params: QueryParams = vec![("prediction_type", prediction_type.into())];
        let raw: ApiPredictorVersions = self.get_required(Endpoint::PredictorVersions, &params).await?;
        let mut versions = raw.versions;
        versions.sort_unstable();
        versions.dedup();
        Ok(versions)
    }

    pub async fn fetch_activity_logs(
        &self,
        prediction_type: &str,
        kind: ActivityKind,
        limit: usize,
    ) -> Result<Vec<ActivityLogEntry>> {
        let params: QueryParams = vec![
            ("limit", limit.into()),
            ("metric_name", kind.metric_name().into()),
            ("prediction_type", prediction_type.into()),
        ];
        let raw: ApiTrafficMetrics = self.get_required(Endpoint::Metrics, &params).await?;
        Ok(raw
            .metrics
            .iter()
            .filter_map(|m| normalize_activity_log(m, kind))
            .collect())
    }

    /// Both log kinds in parallel, merged newest first, cut to `limit` after merging.
    pub async fn fetch_merged_activity(&self, prediction_type: &str, limit: usize) -> Result<Vec<ActivityLogEntry>> {
        let (updates, deactivations) = try_join(
            self.fetch_activity_logs(prediction_type, ActivityKind::TrafficUpdate, limit),
            self.fetch_activity_logs(prediction_type, ActivityKind::TrafficDeactivation, limit),
        )
        .await?;
        debug!(
            "Activity streams - updates={}, deactivations={}, limit={}",
            updates.len(),
            deactivations.len(),
            limit
        );
        Ok(merge_activity_logs(updates, deactivations, limit))
    }

    async fn summary_raw(
        &self,
        metric_name: &str,
        num_days: u32,
        prediction_type: &str,
        version: u32,
    ) -> Result<Option<ApiMetricSummary>> {
        let params: QueryParams = vec![
            ("metric_name", metric_name.into()),
            ("num_days", num_days.into()),
            ("prediction_type", prediction_type.into()),
            ("predictor_version", version.into()),
        ];
        self.get_json(Endpoint::MetricsSummary, &params, true).await
    }

    async fn bins_raw(
        &self,
        metric_name: &str,
        num_days: u32,
        prediction_type: &str,
        version: u32,
        num_bins: u32,
    ) -> Result<Option<ApiMetricBins>> {
        let params: QueryParams = vec![
            ("metric_name", metric_name.into()),
            ("num_days", num_days.into()),
            ("prediction_type", prediction_type.into()),
            ("predictor_version", version.into()),
            ("num_bins", num_bins.into()),
        ];
        self.get_json(Endpoint::MetricsBins, &params, true).await
    }

    /// 404 yields the zeroed summary.
    pub async fn fetch_metric_summary(
        &self,
        metric_name: &str,
        num_days: u32,
        prediction_type: &str,
        version: u32,
    ) -> Result<MetricSummary> {
        let raw = self.summary_raw(metric_name, num_days, prediction_type, version).await?;
        Ok(normalize_summary(raw))
    }

    /// 404 yields no bins.
    pub async fn fetch_metric_bins(
        &self,
        metric_name: &str,
        num_days: u32,
        prediction_type: &str,
        version: u32,
        num_bins: u32,
    ) -> Result<Vec<MetricBin>> {
        let raw = self.bins_raw(metric_name, num_days, prediction_type, version, num_bins).await?;
        Ok(normalize_bins(raw))
    }

    /// One row per version, fetched in parallel; any failure fails the whole set.
    pub async fn fetch_version_summaries(
        &self,
        metric_name: &str,
        num_days: u32,
        prediction_type: &str,
        versions: &[u32],
        predictors: &[Predictor],
    ) -> Result<Vec<VersionSummary>> {
        let rows = versions.iter().map(|&version| async move {
            let raw = self.summary_raw(metric_name, num_days, prediction_type, version).await?;
            let traffic_percentage = match raw {
                Some(_) => traffic_of(predictors, version),
                None => 0.0,
            };
            Ok::<_, anyhow::Error>(VersionSummary {
                version,
                summary: normalize_summary(raw),
                traffic_percentage,
            })
        });
        try_join_all(rows).await
    }

    /// Histogram per version, fetched in parallel; any failure fails the whole set.
    pub async fn fetch_version_histograms(
        &self,
        metric_name: &str,
        num_days: u32,
        prediction_type: &str,
        num_bins: u32,
        versions: &[u32],
        predictors: &[Predictor],
    ) -> Result<Vec<VersionHistogram>> {
        let rows = versions.iter().map(|&version| async move {
            let raw = self
                .bins_raw(metric_name, num_days, prediction_type, version, num_bins)
                .await?;
            let traffic_percentage = match raw {
                Some(_) => traffic_of(predictors, version),
                None => 0.0,
            };
            Ok::<_, anyhow::Error>(VersionHistogram {
                version,
                bins: normalize_bins(raw),
                traffic_percentage,
            })
        });
        try_join_all(rows).await
    }
}

fn traffic_of(predictors: &[Predictor], version: u32) -> f64 {
    predictors
        .iter()
        .find(|p| p.version == version)
        .map(|p| p.traffic_percentage)
        .unwrap_or(0.0)
}
