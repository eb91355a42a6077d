// src/export.rs
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::{fs, path::Path};
use tracing::debug;

use crate::orchestrator::{DeploymentsView, FeedView, MetricsView};

/// Write the feed's current state to `<dir>/feed.json`.
pub fn write_feed_snapshot(dir: &Path, view: &FeedView) -> Result<()> {
    ensure_dir(dir)?;
    let snapshot = json!({
        "generated_at": Utc::now(),
        "page": view.page(),
        "total_pages": view.total_pages(),
        "sentiment": view.sentiment(),
        "has_prev": view.has_prev(),
        "has_next": view.has_next(),
        "articles": view.articles(),
    });
    write_json(dir.join("feed.json"), &snapshot)
}

/// Write deployments, traffic summary and activity log to `<dir>/deployments.json`.
pub fn write_deployments_snapshot(dir: &Path, view: &DeploymentsView) -> Result<()> {
    ensure_dir(dir)?;
    let snapshot = json!({
        "generated_at": Utc::now(),
        "prediction_type": view.selected(),
        "prediction_types": view.prediction_types(),
        "deployments": view.deployments(),
        "traffic_summary": view.traffic_summary(),
        "activity": view.activity(),
    });
    write_json(dir.join("deployments.json"), &snapshot)
}

/// Write every metric panel to `<dir>/metrics.json`.
pub fn write_metrics_snapshot(dir: &Path, view: &MetricsView) -> Result<()> {
    ensure_dir(dir)?;
    let panels: Vec<_> = view
        .panels()
        .iter()
        .map(|p| json!({ "spec": p.spec, "state": p.state() }))
        .collect();
    let snapshot = json!({
        "generated_at": Utc::now(),
        "prediction_type": view.selected(),
        "num_days": view.num_days(),
        "active_only": view.active_only(),
        "versions": view.selected_versions(),
        "panels": panels,
    });
    write_json(dir.join("metrics.json"), &snapshot)
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create {:?}", dir))
}

fn write_json<P: AsRef<Path>, T: ?Sized + Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, serde_json::to_vec_pretty(value)?).with_context(|| format!("write {:?}", path))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_snapshot_is_written_as_loading_before_any_fetch() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("out");
        let view = FeedView::new(12);
        write_feed_snapshot(&dir, &view).unwrap();
        let raw = fs::read_to_string(dir.join("feed.json")).unwrap();
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["page"], 1);
        assert_eq!(v["articles"]["state"], "loading");
    }
}
