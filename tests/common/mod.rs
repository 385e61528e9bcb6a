//! Shared test helpers for integration tests.

#![allow(dead_code)]

use lottocover::config::ServiceConfig;
use lottocover::server::{build_router, AppState};

/// Build an Axum test router with default limits.
pub fn build_test_app() -> axum::Router {
    build_router(AppState::new(ServiceConfig::default()))
}

/// Build an Axum test router with a custom configuration.
pub fn build_test_app_with(config: ServiceConfig) -> axum::Router {
    build_router(AppState::new(config))
}

/// `[lo, lo+1, ..., hi]` as a JSON-ready vector.
pub fn numbers(lo: i64, hi: i64) -> Vec<i64> {
    (lo..=hi).collect()
}
