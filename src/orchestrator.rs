use anyhow::Result;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::derive::{filter_activity_logs, traffic_summary, ActivityFilter, TrafficSummary};
use crate::fetch::{ApiClient, Transport};
use crate::metric_config::{MetricPanelSpec, MetricRegistry, PanelKind};
use crate::models::*;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "lowercase")]
pub enum ViewState<T> {
    Loading,
    Error(String),
    Ready(T),
}

/// Identifies one issued request; only the latest one may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Request lifecycle for one piece of view data.
///
/// Every `begin` supersedes whatever is in flight. `settle` with an older
/// ticket is dropped, so a slow response can never overwrite a newer one.
#[derive(Debug)]
pub struct Fetched<T> {
    state: ViewState<T>,
    generation: u64,
}

impl<T> Default for Fetched<T> {
    fn default() -> Self {
        Self {
            state: ViewState::Loading,
            generation: 0,
        }
    }
}

impl<T> Fetched<T> {
    pub fn state(&self) -> &ViewState<T> {
        &self.state
    }

    pub fn data(&self) -> Option<&T> {
        match &self.state {
            ViewState::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, ViewState::Loading)
    }

    pub fn begin(&mut self) -> Ticket {
        self.generation += 1;
        self.state = ViewState::Loading;
        Ticket(self.generation)
    }

    /// Returns whether the result was committed.
    pub fn settle(&mut self, ticket: Ticket, result: Result<T>) -> bool {
        if ticket.0 != self.generation {
            debug!(
                "Dropping stale response - ticket={}, current={}",
                ticket.0, self.generation
            );
            return false;
        }
        self.state = match result {
            Ok(v) => ViewState::Ready(v),
            Err(e) => ViewState::Error(format!("{:#}", e)),
        };
        true
    }

    /// Invalidate anything in flight without issuing a new request.
    pub fn abandon(&mut self) {
        self.generation += 1;
    }

    /// Back to `Loading` with nothing in flight.
    pub fn reset(&mut self) {
        self.abandon();
        self.state = ViewState::Loading;
    }
}

/* -------------------------------------------------------------------------- */
/* Article feed                                                               */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy)]
pub struct FeedRequest {
    pub ticket: Ticket,
    pub page: u32,
    pub per_page: u32,
    pub sentiment: SentimentFilter,
}

#[derive(Debug)]
pub struct FeedView {
    page: u32,
    per_page: u32,
    sentiment: SentimentFilter,
    total_pages: u32,
    articles: Fetched<Page<Article>>,
}

impl FeedView {
    pub fn new(per_page: u32) -> Self {
        Self {
            page: 1,
            per_page: per_page.max(1),
            sentiment: SentimentFilter::All,
            total_pages: 0,
            articles: Fetched::default(),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn sentiment(&self) -> SentimentFilter {
        self.sentiment
    }

    /// From the most recent successful response.
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn articles(&self) -> &ViewState<Page<Article>> {
        self.articles.state()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Resets to page 1. Returns whether anything changed.
    pub fn set_sentiment(&mut self, sentiment: SentimentFilter) -> bool {
        if sentiment == self.sentiment {
            return false;
        }
        debug!("Feed filter change - sentiment={:?}, page {} -> 1", sentiment, self.page);
        self.sentiment = sentiment;
        self.page = 1;
        self.articles.reset();
        true
    }

    pub fn next_page(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.page += 1;
        self.articles.reset();
        true
    }

    pub fn prev_page(&mut self) -> bool {
        if !self.has_prev() {
            return false;
        }
        self.page -= 1;
        self.articles.reset();
        true
    }

    /// Jump directly, e.g. from a `--page` flag. Not bounded by `total_pages`.
    pub fn go_to(&mut self, page: u32) {
        let page = page.max(1);
        if page != self.page {
            self.page = page;
            self.articles.reset();
        }
    }

    pub fn begin(&mut self) -> FeedRequest {
        FeedRequest {
            ticket: self.articles.begin(),
            page: self.page,
            per_page: self.per_page,
            sentiment: self.sentiment,
        }
    }

    pub fn settle(&mut self, request: &FeedRequest, result: Result<Page<Article>>) -> bool {
        let total_pages = result.as_ref().ok().map(|p| p.total_pages);
        if !self.articles.settle(request.ticket, result) {
            return false;
        }
        if let Some(t) = total_pages {
            self.total_pages = t;
        }
        true
    }

    pub async fn refresh<T: Transport>(&mut self, client: &ApiClient<T>) -> bool {
        let req = self.begin();
        let result = client.fetch_articles(req.page, req.per_page, req.sentiment).await;
        if let Err(e) = &result {
            warn!("Feed fetch failed - page={}, error={:#}", req.page, e);
        }
        self.settle(&req, result)
    }

    pub fn close(&mut self) {
        self.articles.abandon();
    }
}

/* -------------------------------------------------------------------------- */
/* Deployments                                                                */
/* -------------------------------------------------------------------------- */

#[derive(Debug)]
pub struct DeploymentsView {
    prediction_types: Fetched<Vec<String>>,
    selected: Option<String>,
    deployments: Fetched<Vec<Predictor>>,
    activity: Fetched<Vec<ActivityLogEntry>>,
    log_filter: ActivityFilter,
    log_limit: usize,
}

impl DeploymentsView {
    pub fn new(log_limit: usize) -> Self {
        Self {
            prediction_types: Fetched::default(),
            selected: None,
            deployments: Fetched::default(),
            activity: Fetched::default(),
            log_filter: ActivityFilter::All,
            log_limit,
        }
    }

    pub fn prediction_types(&self) -> &ViewState<Vec<String>> {
        self.prediction_types.state()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn deployments(&self) -> &ViewState<Vec<Predictor>> {
        self.deployments.state()
    }

    pub fn activity(&self) -> &ViewState<Vec<ActivityLogEntry>> {
        self.activity.state()
    }

    pub fn log_filter(&self) -> ActivityFilter {
        self.log_filter
    }

    pub fn set_log_filter(&mut self, filter: ActivityFilter) {
        self.log_filter = filter;
    }

    /// Deployments of the selected type only.
    pub fn visible_deployments(&self) -> Vec<&Predictor> {
        match (self.deployments.data(), self.selected.as_deref()) {
            (Some(ds), Some(sel)) => ds.iter().filter(|d| d.prediction_type == sel).collect(),
            _ => Vec::new(),
        }
    }

    pub fn visible_logs(&self) -> Vec<&ActivityLogEntry> {
        self.activity
            .data()
            .map(|logs| filter_activity_logs(logs, self.log_filter))
            .unwrap_or_default()
    }

    pub fn traffic_summary(&self) -> TrafficSummary {
        let visible: Vec<Predictor> = self.visible_deployments().into_iter().cloned().collect();
        traffic_summary(&visible)
    }

    pub fn select_prediction_type(&mut self, prediction_type: &str) -> bool {
        if self.selected.as_deref() == Some(prediction_type) {
            return false;
        }
        self.selected = Some(prediction_type.to_string());
        self.deployments.reset();
        self.activity.reset();
        true
    }

    /// Loads the type list; the first type is selected when nothing is yet.
    pub async fn load_types<T: Transport>(&mut self, client: &ApiClient<T>) -> bool {
        let ticket = self.prediction_types.begin();
        let result = client.fetch_prediction_types().await;
        let first = result.as_ref().ok().and_then(|ts| ts.first().cloned());
        if !self.prediction_types.settle(ticket, result) {
            return false;
        }
        if self.selected.is_none() {
            if let Some(first) = first {
                self.select_prediction_type(&first);
            }
        }
        true
    }

    /// Deployments and the merged activity log for the selected type, concurrently.
    pub async fn refresh<T: Transport>(&mut self, client: &ApiClient<T>) {
        let Some(selected) = self.selected.clone() else {
            debug!("Deployments refresh skipped - no prediction type selected");
            return;
        };
        let deployments_ticket = self.deployments.begin();
        let activity_ticket = self.activity.begin();

        let (deployments, activity) = futures::join!(
            client.fetch_predictors(&selected, None),
            client.fetch_merged_activity(&selected, self.log_limit),
        );
        info!(
            "Deployments view loaded - type={}, deployments_ok={}, activity_ok={}",
            selected,
            deployments.is_ok(),
            activity.is_ok()
        );
        self.deployments.settle(deployments_ticket, deployments);
        self.activity.settle(activity_ticket, activity);
    }

    pub fn close(&mut self) {
        self.prediction_types.abandon();
        self.deployments.abandon();
        self.activity.abandon();
    }
}

/* -------------------------------------------------------------------------- */
/* Metrics                                                                    */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "rows", rename_all = "snake_case")]
pub enum PanelData {
    Summary(Vec<VersionSummary>),
    Histogram(Vec<VersionHistogram>),
}

impl PanelData {
    fn empty_for(spec: &MetricPanelSpec) -> Self {
        match spec.kind {
            PanelKind::Summary { .. } => PanelData::Summary(Vec::new()),
            PanelKind::Histogram { .. } => PanelData::Histogram(Vec::new()),
        }
    }
}

#[derive(Debug)]
pub struct MetricPanel {
    pub spec: MetricPanelSpec,
    state: Fetched<PanelData>,
}

impl MetricPanel {
    pub fn state(&self) -> &ViewState<PanelData> {
        self.state.state()
    }
}

async fn fetch_panel<T: Transport>(
    client: &ApiClient<T>,
    spec: &MetricPanelSpec,
    num_days: u32,
    prediction_type: &str,
    versions: &[u32],
    predictors: &[Predictor],
) -> Result<PanelData> {
    match &spec.kind {
        PanelKind::Summary { .. } => client
            .fetch_version_summaries(&spec.metric_name, num_days, prediction_type, versions, predictors)
            .await
            .map(PanelData::Summary),
        PanelKind::Histogram { num_bins, .. } => client
            .fetch_version_histograms(&spec.metric_name, num_days, prediction_type, *num_bins, versions, predictors)
            .await
            .map(PanelData::Histogram),
    }
}

#[derive(Debug)]
pub struct MetricsView {
    prediction_types: Fetched<Vec<String>>,
    selected: Option<String>,
    num_days: u32,
    active_only: bool,
    predictors: Fetched<Vec<Predictor>>,
    selected_versions: Vec<u32>,
    panels: Vec<MetricPanel>,
}

impl MetricsView {
    pub fn new(registry: MetricRegistry, num_days: u32) -> Self {
        Self {
            prediction_types: Fetched::default(),
            selected: None,
            num_days,
            active_only: true,
            predictors: Fetched::default(),
            selected_versions: Vec::new(),
            panels: registry
                .panels
                .into_iter()
                .map(|spec| MetricPanel {
                    spec,
                    state: Fetched::default(),
                })
                .collect(),
        }
    }

    pub fn prediction_types(&self) -> &ViewState<Vec<String>> {
        self.prediction_types.state()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn num_days(&self) -> u32 {
        self.num_days
    }

    pub fn active_only(&self) -> bool {
        self.active_only
    }

    pub fn predictors(&self) -> &ViewState<Vec<Predictor>> {
        self.predictors.state()
    }

    pub fn selected_versions(&self) -> &[u32] {
        &self.selected_versions
    }

    pub fn panels(&self) -> &[MetricPanel] {
        &self.panels
    }

    fn invalidate_panels(&mut self) {
        for p in self.panels.iter_mut() {
            p.state.reset();
        }
    }

    /// Clears the available and selected versions.
    pub fn select_prediction_type(&mut self, prediction_type: &str) -> bool {
        if self.selected.as_deref() == Some(prediction_type) {
            return false;
        }
        self.selected = Some(prediction_type.to_string());
        self.predictors.reset();
        self.selected_versions.clear();
        self.invalidate_panels();
        true
    }

    pub fn set_num_days(&mut self, num_days: u32) {
        if num_days != self.num_days {
            self.num_days = num_days;
            self.invalidate_panels();
        }
    }

    /// Needs a predictor reload to take effect.
    pub fn set_active_only(&mut self, active_only: bool) {
        if active_only != self.active_only {
            self.active_only = active_only;
            self.predictors.reset();
            self.invalidate_panels();
        }
    }

    pub fn select_versions(&mut self, versions: &[u32]) {
        let mut v = versions.to_vec();
        v.sort_unstable();
        v.dedup();
        if v != self.selected_versions {
            self.selected_versions = v;
            self.invalidate_panels();
        }
    }

    pub async fn load_types<T: Transport>(&mut self, client: &ApiClient<T>) -> bool {
        let ticket = self.prediction_types.begin();
        let result = client.fetch_prediction_types().await;
        let first = result.as_ref().ok().and_then(|ts| ts.first().cloned());
        if !self.prediction_types.settle(ticket, result) {
            return false;
        }
        if self.selected.is_none() {
            if let Some(first) = first {
                self.select_prediction_type(&first);
            }
        }
        true
    }

    /// Loads versions for the selected type and selects all of them.
    pub async fn load_predictors<T: Transport>(&mut self, client: &ApiClient<T>) -> bool {
        let Some(selected) = self.selected.clone() else {
            return false;
        };
        let ticket = self.predictors.begin();
        let min_traffic = self.active_only.then_some(1);
        let result = client.fetch_predictors(&selected, min_traffic).await;
        let versions: Option<Vec<u32>> = result
            .as_ref()
            .ok()
            .map(|ps| ps.iter().map(|p| p.version).collect());
        if !self.predictors.settle(ticket, result) {
            return false;
        }
        if let Some(v) = versions {
            self.select_versions(&v);
        }
        true
    }

    /// Every panel fetches concurrently; within a panel all versions succeed or the panel fails.
    pub async fn refresh_panels<T: Transport>(&mut self, client: &ApiClient<T>) {
        let selected = match self.selected.clone() {
            Some(s) if !self.selected_versions.is_empty() => s,
            _ => {
                debug!("Metric panels idle - no prediction type or versions selected");
                for p in self.panels.iter_mut() {
                    let ticket = p.state.begin();
                    let empty = PanelData::empty_for(&p.spec);
                    p.state.settle(ticket, Ok(empty));
                }
                return;
            }
        };

        let versions = self.selected_versions.clone();
        let predictors = self.predictors.data().cloned().unwrap_or_default();
        let num_days = self.num_days;

        let jobs: Vec<(Ticket, MetricPanelSpec)> = self
            .panels
            .iter_mut()
            .map(|p| (p.state.begin(), p.spec.clone()))
            .collect();

        let start = std::time::Instant::now();
        let results = join_all(jobs.iter().map(|(_, spec)| {
            fetch_panel(client, spec, num_days, &selected, &versions, &predictors)
        }))
        .await;

        let mut failed = 0usize;
        for ((panel, (ticket, _)), result) in self.panels.iter_mut().zip(jobs.iter()).zip(results) {
            if result.is_err() {
                failed += 1;
            }
            panel.state.settle(*ticket, result);
        }
        info!(
            "Metric panels refreshed - type={}, versions={:?}, panels={}, failed={}, duration={:.2}s",
            selected,
            versions,
            self.panels.len(),
            failed,
            start.elapsed().as_secs_f32()
        );
    }

    pub fn close(&mut self) {
        self.prediction_types.abandon();
        self.predictors.abandon();
        self.invalidate_panels();
    }
}
