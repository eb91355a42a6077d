use std::fmt;

use url::Url;

/// Backend routes consumed by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Articles,
    Metrics,
    MetricsSummary,
    MetricsBins,
    Predictors,
    PredictorTypes,
    PredictorVersions,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Articles => "/articles",
            Endpoint::Metrics => "/metrics",
            Endpoint::MetricsSummary => "/metrics/summary",
            Endpoint::MetricsBins => "/metrics/bins",
            Endpoint::Predictors => "/predictors",
            Endpoint::PredictorTypes => "/predictors/types",
            Endpoint::PredictorVersions => "/predictors/versions",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A flat query value: string, number or boolean.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Str(s) => f.write_str(s),
            QueryValue::Int(i) => write!(f, "{}", i),
            QueryValue::Float(x) => write!(f, "{}", x),
            QueryValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(s: &str) -> Self {
        QueryValue::Str(s.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(s: String) -> Self {
        QueryValue::Str(s)
    }
}

impl From<&String> for QueryValue {
    fn from(s: &String) -> Self {
        QueryValue::Str(s.clone())
    }
}

impl From<bool> for QueryValue {
    fn from(b: bool) -> Self {
        QueryValue::Bool(b)
    }
}

impl From<f64> for QueryValue {
    fn from(x: f64) -> Self {
        QueryValue::Float(x)
    }
}

macro_rules! int_query_value {
    ($($t:ty),*) => {
        $(impl From<$t> for QueryValue {
            fn from(i: $t) -> Self {
                QueryValue::Int(i as i64)
            }
        })*
    };
}

int_query_value!(i32, i64, u32, u64, usize);

/// Ordered list of query parameters; order is not part of the URL contract.
pub type QueryParams = Vec<(&'static str, QueryValue)>;

/// Resolve `endpoint` against `base` and append each param in its string form.
pub fn build_api_url(base: &Url, endpoint: Endpoint, params: &[(&str, QueryValue)]) -> String {
    // Endpoint paths are static and absolute, so join cannot fail on a valid base.
    let mut url = base
        .join(endpoint.path())
        .unwrap_or_else(|_| base.clone());
    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, &value.to_string());
        }
    }
    url.to_string()
}
