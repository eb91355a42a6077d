use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use smart_news_dash::config::{DashConfig, ENV_API_BASE_URL, ENV_DISPLAY_TZ};
use smart_news_dash::derive::ActivityFilter;
use smart_news_dash::export::{write_deployments_snapshot, write_feed_snapshot, write_metrics_snapshot};
use smart_news_dash::fetch::{ApiClient, HttpTransport};
use smart_news_dash::metric_config::MetricRegistry;
use smart_news_dash::models::SentimentFilter;
use smart_news_dash::orchestrator::{DeploymentsView, FeedView, MetricsView, ViewState};
use smart_news_dash::render::{render_deployments, render_feed, render_metrics, render_prediction_types};
use tracing::{debug, info};

/// Smart News Dash - news feed, model deployments and metrics from the terminal
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// API base URL (overrides NEWS_API_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// IANA timezone for displayed dates (overrides NEWS_DASH_TZ)
    #[arg(long)]
    tz: Option<String>,

    /// Also write a JSON snapshot of the view into this directory
    #[arg(long)]
    json: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Paginated article feed with sentiment and category annotations
    Feed {
        /// 1-based page number
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// all | positive | neutral | negative
        #[arg(short, long, default_value = "all")]
        sentiment: SentimentFilter,

        /// Articles per page (default 12)
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Deployed predictor versions and traffic activity
    Deployments {
        /// Prediction type (default: first one the backend lists)
        #[arg(short = 't', long)]
        prediction_type: Option<String>,

        /// Number of activity log entries (default 10)
        #[arg(short, long)]
        limit: Option<usize>,

        /// all | updates | deactivations
        #[arg(long, default_value = "all")]
        tab: ActivityFilter,
    },
    /// Per-version metric summaries and histograms
    Metrics {
        /// Prediction type (default: first one the backend lists)
        #[arg(short = 't', long)]
        prediction_type: Option<String>,

        /// Time window in days (default 14)
        #[arg(short, long)]
        days: Option<u32>,

        /// Include versions that currently receive no traffic
        #[arg(long)]
        all_versions: bool,

        /// Comma-separated versions (default: every listed version)
        #[arg(long, value_delimiter = ',')]
        versions: Vec<u32>,
    },
    /// Available prediction types
    Types,
}

fn resolve_config(args: &Args) -> Result<DashConfig> {
    if args.base_url.is_none() && args.tz.is_none() {
        return DashConfig::from_env();
    }
    let env_base = std::env::var(ENV_API_BASE_URL).ok();
    let env_tz = std::env::var(ENV_DISPLAY_TZ).ok();
    DashConfig::from_values(
        args.base_url.as_deref().or(env_base.as_deref()),
        args.tz.as_deref().or(env_tz.as_deref()),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG wins; NEWS_DASH_LOG is accepted as a plain level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| {
            tracing_subscriber::EnvFilter::try_new(
                std::env::var("NEWS_DASH_LOG").unwrap_or_else(|_| "info".to_string()),
            )
        })
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    let args = Args::parse();
    let cfg = resolve_config(&args)?;
    info!("Starting smart_news_dash - base_url={}", cfg.api_base_url);
    debug!("Parsed args: {:?}", args);

    let client = ApiClient::new(HttpTransport::new()?, cfg.api_base_url.clone());

    match args.command {
        Command::Feed { page, sentiment, per_page } => {
            let mut view = FeedView::new(per_page.unwrap_or(cfg.per_page));
            view.set_sentiment(sentiment);
            view.go_to(page);
            view.refresh(&client).await;
            print!("{}", render_feed(&view, cfg.display_tz));
            if let Some(dir) = &args.json {
                write_feed_snapshot(dir, &view)?;
            }
        }
        Command::Deployments { prediction_type, limit, tab } => {
            let mut view = DeploymentsView::new(limit.unwrap_or(cfg.log_limit));
            if let Some(t) = &prediction_type {
                view.select_prediction_type(t);
            }
            view.set_log_filter(tab);
            view.load_types(&client).await;
            if !matches!(view.prediction_types(), ViewState::Error(_)) {
                view.refresh(&client).await;
            }
            print!("{}", render_deployments(&view, cfg.display_tz));
            if let Some(dir) = &args.json {
                write_deployments_snapshot(dir, &view)?;
            }
        }
        Command::Metrics { prediction_type, days, all_versions, versions } => {
            let mut view = MetricsView::new(MetricRegistry::default(), days.unwrap_or(cfg.metric_days));
            view.set_active_only(!all_versions);
            if let Some(t) = &prediction_type {
                view.select_prediction_type(t);
            }
            view.load_types(&client).await;
            if view.load_predictors(&client).await && !versions.is_empty() {
                view.select_versions(&versions);
            }
            view.refresh_panels(&client).await;
            print!("{}", render_metrics(&view));
            if let Some(dir) = &args.json {
                write_metrics_snapshot(dir, &view)?;
            }
        }
        Command::Types => {
            let types = client.fetch_prediction_types().await?;
            print!("{}", render_prediction_types(&types));
        }
    }

    Ok(())
}
