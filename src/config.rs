use anyhow::{Context, Result};
use chrono_tz::Tz;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "https://smart-news-backend-production.up.railway.app";
pub const ENV_API_BASE_URL: &str = "NEWS_API_BASE_URL";
pub const ENV_DISPLAY_TZ: &str = "NEWS_DASH_TZ";

pub const DEFAULT_PER_PAGE: u32 = 12;
pub const DEFAULT_LOG_LIMIT: usize = 10;
pub const DEFAULT_METRIC_DAYS: u32 = 14;

#[derive(Debug, Clone)]
pub struct DashConfig {
    pub api_base_url: Url,
    pub display_tz: Tz,
    pub per_page: u32,
    pub log_limit: usize,
    pub metric_days: u32,
}

impl DashConfig {
    /// Build from the process environment. Only an unparsable base URL is fatal.
    pub fn from_env() -> Result<Self> {
        Self::from_values(
            std::env::var(ENV_API_BASE_URL).ok().as_deref(),
            std::env::var(ENV_DISPLAY_TZ).ok().as_deref(),
        )
    }

    pub fn from_values(base_url: Option<&str>, tz: Option<&str>) -> Result<Self> {
        let raw_base = match base_url.map(str::trim).filter(|s| !s.is_empty()) {
            Some(b) => b.to_string(),
            None => {
                warn!(
                    "{} is not defined, falling back to production URL {}",
                    ENV_API_BASE_URL, DEFAULT_API_BASE_URL
                );
                DEFAULT_API_BASE_URL.to_string()
            }
        };
        let api_base_url = Url::parse(&raw_base)
            .with_context(|| format!("Invalid API base URL {:?}", raw_base))?;

        let display_tz = parse_tz(tz);
        debug!("Config resolved - base_url={}, tz={}", api_base_url, display_tz);

        Ok(Self {
            api_base_url,
            display_tz,
            per_page: DEFAULT_PER_PAGE,
            log_limit: DEFAULT_LOG_LIMIT,
            metric_days: DEFAULT_METRIC_DAYS,
        })
    }
}

fn parse_tz(raw: Option<&str>) -> Tz {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Tz::UTC,
        Some(name) => name.parse::<Tz>().unwrap_or_else(|_| {
            warn!("Unknown timezone {:?}, using UTC", name);
            Tz::UTC
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_base_url_falls_back_to_production() {
        let cfg = DashConfig::from_values(None, None).unwrap();
        assert_eq!(cfg.api_base_url.as_str(), "https://smart-news-backend-production.up.railway.app/");
        assert_eq!(cfg.display_tz, Tz::UTC);
        assert_eq!(cfg.per_page, 12);
    }

    #[test]
    fn blank_base_url_is_treated_as_missing() {
        let cfg = DashConfig::from_values(Some("  "), None).unwrap();
        assert!(cfg.api_base_url.as_str().starts_with(DEFAULT_API_BASE_URL));
    }

    #[test]
    fn malformed_base_url_fails_at_startup() {
        assert!(DashConfig::from_values(Some("not a url"), None).is_err());
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        let cfg = DashConfig::from_values(Some("http://localhost:8000"), Some("Mars/Olympus")).unwrap();
        assert_eq!(cfg.display_tz, Tz::UTC);
        let cfg = DashConfig::from_values(Some("http://localhost:8000"), Some("America/New_York")).unwrap();
        assert_eq!(cfg.display_tz, chrono_tz::America::New_York);
    }
}
