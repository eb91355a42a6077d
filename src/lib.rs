//! Data-shaping and fetch orchestration for the smart news dashboard: article
//! feed with ML annotations, predictor deployments, and per-version metrics.

pub mod api;
pub mod api_types;
pub mod config;
pub mod derive;
pub mod export;
pub mod fetch;
pub mod metric_config;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod render;
