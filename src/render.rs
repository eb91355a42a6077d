// src/render.rs
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use itertools::Itertools;

use crate::derive::{category_display, default_top_categories, humanize_prediction_type, sentiment_display};
use crate::metric_config::PanelKind;
use crate::models::*;
use crate::orchestrator::{DeploymentsView, FeedView, MetricsView, PanelData, ViewState};

const BAR_WIDTH: u64 = 30;

fn local_date(ts: &DateTime<Utc>, tz: Tz) -> String {
    ts.with_timezone(&tz).format("%Y-%m-%d").to_string()
}

fn local_datetime(ts: &DateTime<Utc>, tz: Tz) -> String {
    ts.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S %Z").to_string()
}

fn render_state_header<T>(out: &mut String, state: &ViewState<T>, what: &str) -> bool {
    match state {
        ViewState::Loading => {
            out.push_str(&format!("(loading {}...)\n", what));
            false
        }
        ViewState::Error(msg) => {
            out.push_str(&format!("Error loading {}: {}\n", what, msg));
            false
        }
        ViewState::Ready(_) => true,
    }
}

pub fn render_article(a: &Article, tz: Tz) -> String {
    let mut out = String::new();
    out.push_str(&format!("## {}\n", a.title.as_deref().unwrap_or("(untitled)")));

    let mut byline = Vec::new();
    if !a.source.name.is_empty() {
        byline.push(a.source.name.clone());
    }
    if let Some(author) = &a.author {
        byline.push(author.clone());
    }
    if let Some(ts) = &a.published_at {
        byline.push(local_date(ts, tz));
    }
    if !byline.is_empty() {
        out.push_str(&format!("{}\n", byline.join(" | ")));
    }

    if let Some(s) = &a.sentiment {
        let d = sentiment_display(s.label);
        match s.confidence {
            Some(c) => out.push_str(&format!("Sentiment: {} ({:.0}%)\n", d.label_text, c * 100.0)),
            None => out.push_str(&format!("Sentiment: {}\n", d.label_text)),
        }
    }

    let cats = default_top_categories(a.classification.as_ref());
    if !cats.is_empty() {
        let chips = cats
            .iter()
            .map(|c| format!("{} {:.0}%", category_display(&c.label).label_text, c.score * 100.0))
            .join(", ");
        out.push_str(&format!("Categories: {}\n", chips));
    }

    if let Some(desc) = &a.description {
        out.push_str(&format!("\n{}\n", desc));
    }
    if let Some(url) = &a.url {
        out.push_str(&format!("{}\n", url));
    }
    out
}

pub fn render_feed(view: &FeedView, tz: Tz) -> String {
    let mut out = String::new();
    out.push_str("# News Feed\n");
    out.push_str(&format!("Filter: {:?}\n\n", view.sentiment()));

    if !render_state_header(&mut out, view.articles(), "articles") {
        return out;
    }
    if let ViewState::Ready(page) = view.articles() {
        if page.items.is_empty() {
            out.push_str("No articles found.\n");
        }
        for a in &page.items {
            out.push_str(&render_article(a, tz));
            out.push('\n');
        }
        out.push_str(&format!(
            "Page {} of {} ({} articles) | prev: {} | next: {}\n",
            view.page(),
            view.total_pages(),
            page.total_count,
            if view.has_prev() { "yes" } else { "no" },
            if view.has_next() { "yes" } else { "no" },
        ));
    }
    out
}

pub fn render_prediction_types(types: &[String]) -> String {
    let mut out = String::from("# Prediction Types\n");
    for t in types {
        out.push_str(&format!("- {} ({})\n", humanize_prediction_type(t), t));
    }
    out
}

fn render_predictor(p: &Predictor, tz: Tz) -> String {
    let mut out = format!(
        "- Version {} [{}] {}%",
        p.version,
        match p.status() {
            PredictorStatus::Active => "ACTIVE",
            PredictorStatus::Inactive => "INACTIVE",
        },
        p.traffic_percentage
    );
    if let Some(ts) = &p.created_at {
        out.push_str(&format!(" | deployed {}", local_date(ts, tz)));
    }
    out.push('\n');
    if !p.description.is_empty() {
        out.push_str(&format!("  {}\n", p.description));
    }
    out
}

fn render_log_entry(l: &ActivityLogEntry, tz: Tz) -> String {
    format!(
        "- {} {} to {} -> {}% | {} | SUCCESS\n",
        local_datetime(&l.timestamp, tz),
        l.kind.action_label(),
        l.version,
        l.traffic_value,
        l.reason
    )
}

pub fn render_deployments(view: &DeploymentsView, tz: Tz) -> String {
    let mut out = String::new();
    out.push_str("# Deployments\n");
    if !render_state_header(&mut out, view.prediction_types(), "prediction types") {
        return out;
    }
    let Some(selected) = view.selected() else {
        out.push_str("No prediction types available.\n");
        return out;
    };
    out.push_str(&format!("Prediction type: {}\n\n", humanize_prediction_type(selected)));

    out.push_str("## Traffic Distribution\n");
    if render_state_header(&mut out, view.deployments(), "deployments") {
        let summary = view.traffic_summary();
        for d in &summary.top {
            out.push_str(&format!("- v{}: {}%\n", d.version, d.traffic_percentage));
        }
        out.push_str(&format!(
            "Active deployments: {} | Total traffic: {}%\n",
            summary.active_count, summary.total_traffic
        ));

        out.push_str("\n## Versions\n");
        let visible = view.visible_deployments();
        if visible.is_empty() {
            out.push_str("No deployments.\n");
        }
        for p in visible {
            out.push_str(&render_predictor(p, tz));
        }
    }

    out.push_str(&format!("\n## Traffic Activity History ({:?})\n", view.log_filter()));
    if render_state_header(&mut out, view.activity(), "activity") {
        let logs = view.visible_logs();
        if logs.is_empty() {
            out.push_str("No activity recorded.\n");
        }
        for l in logs {
            out.push_str(&render_log_entry(l, tz));
        }
    }
    out
}

fn render_histogram_rows(out: &mut String, kind: &PanelKind, rows: &[VersionHistogram]) {
    let PanelKind::Histogram { bar_name, bin_label, .. } = kind else {
        return;
    };
    for vh in rows {
        out.push_str(&format!("Version {} ({}% traffic) - {}\n", vh.version, vh.traffic_percentage, bar_name));
        if vh.bins.is_empty() {
            out.push_str("  no data\n");
            continue;
        }
        let max = vh.bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);
        for b in &vh.bins {
            let width = (b.count * BAR_WIDTH).div_ceil(max) as usize;
            out.push_str(&format!(
                "  {:<18} {:<30} {}\n",
                bin_label.label(b),
                "#".repeat(width),
                b.count
            ));
        }
    }
}

fn render_summary_rows(out: &mut String, kind: &PanelKind, rows: &[VersionSummary]) {
    let PanelKind::Summary { fields } = kind else {
        return;
    };
    let header = fields.iter().map(|f| format!("{:>10}", f.label)).join(" ");
    out.push_str(&format!("{:<8} {:>9} {}\n", "Version", "Traffic", header));
    for row in rows {
        let values = fields
            .iter()
            .map(|f| {
                let v = f.format.format(f.field.value(&row.summary));
                if f.primary {
                    format!("{:>10}", format!("*{}", v))
                } else {
                    format!("{:>10}", v)
                }
            })
            .join(" ");
        out.push_str(&format!(
            "{:<8} {:>9} {}\n",
            format!("V{}", row.version),
            format!("{}%", row.traffic_percentage),
            values
        ));
    }
}

pub fn render_metrics(view: &MetricsView) -> String {
    let mut out = String::new();
    out.push_str("# Metrics\n");
    if !render_state_header(&mut out, view.prediction_types(), "filter options") {
        return out;
    }
    let Some(selected) = view.selected() else {
        out.push_str("No prediction types available.\n");
        return out;
    };
    out.push_str(&format!(
        "Prediction type: {} | window: {} days | versions: {}\n",
        humanize_prediction_type(selected),
        view.num_days(),
        view.selected_versions().iter().map(|v| format!("v{}", v)).join(", ")
    ));
    if let ViewState::Error(msg) = view.predictors() {
        out.push_str(&format!("Error loading versions: {}\n", msg));
        return out;
    }
    if view.selected_versions().is_empty() {
        out.push_str("Please select both a prediction type and versions to view metrics.\n");
        return out;
    }

    for panel in view.panels() {
        out.push_str(&format!("\n## {}\n", panel.spec.title));
        if !render_state_header(&mut out, panel.state(), "data") {
            continue;
        }
        match panel.state() {
            ViewState::Ready(PanelData::Summary(rows)) if !rows.is_empty() => {
                render_summary_rows(&mut out, &panel.spec.kind, rows)
            }
            ViewState::Ready(PanelData::Histogram(rows)) if !rows.is_empty() => {
                render_histogram_rows(&mut out, &panel.spec.kind, rows)
            }
            _ => out.push_str("No data available\n"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn article() -> Article {
        Article {
            key: "a1".into(),
            id: Some("a1".into()),
            source: ArticleSource { id: None, name: "Reuters".into() },
            author: Some("Jane Roe".into()),
            title: Some("Markets rally".into()),
            description: Some("Stocks climbed.".into()),
            url: Some("https://example.com/a1".into()),
            image_url: None,
            content: None,
            published_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).unwrap()),
            created_at: None,
            updated_at: None,
            sentiment: Some(SentimentResult { label: SentimentLabel::Positive, confidence: Some(0.9) }),
            classification: Some(ClassificationResult {
                labels: vec!["economy".into(), "sports".into()],
                scores: vec![0.88, 0.2],
            }),
        }
    }

    #[test]
    fn article_card_shows_badges_and_local_date() {
        let text = render_article(&article(), chrono_tz::America::New_York);
        assert!(text.contains("## Markets rally"));
        // 02:00 UTC is the previous evening in New York
        assert!(text.contains("2024-02-29"));
        assert!(text.contains("😊 Positive (90%)"));
        assert!(text.contains("📈 Economy 88%"));
        assert!(!text.contains("Sports"));
    }

    #[test]
    fn summary_table_marks_primary_column() {
        let kind = PanelKind::Summary {
            fields: vec![crate::metric_config::FieldSpec {
                field: crate::metric_config::SummaryField::Count,
                label: "Requests".into(),
                format: crate::metric_config::ValueFormat::Integer,
                primary: true,
            }],
        };
        let rows = vec![VersionSummary { version: 2, summary: MetricSummary::zeroed(), traffic_percentage: 0.0 }];
        let mut out = String::new();
        render_summary_rows(&mut out, &kind, &rows);
        assert!(out.contains("V2"));
        assert!(out.contains("*0"));
    }
}
