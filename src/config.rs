// ABOUTME: Environment-driven configuration for the analysis pipeline
// ABOUTME: Tunables for retry budget, wall-clock budget, cache sizing, and decision thresholds
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! Pipeline configuration
//!
//! Configuration is environment-only: every tunable has a production-ready
//! default and an override variable. No configuration files are read.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `NUTRILENS_MAX_ATTEMPTS` | 3 | Total model-call attempts per tool invocation |
//! | `NUTRILENS_RETRY_BASE_DELAY_SECS` | 2 | Backoff unit; delay = attempt number x base |
//! | `NUTRILENS_OVERALL_BUDGET_SECS` | 45 | Wall-clock budget for one full analysis |
//! | `NUTRILENS_CACHE_TTL_SECS` | 604800 (7 days) | Result cache entry lifetime |
//! | `NUTRILENS_CACHE_CAPACITY` | 256 | Maximum cached brand lookups |
//! | `NUTRILENS_CONFIDENCE_THRESHOLD` | 0.8 | Secondary analysis triggers at or below this |

use std::env;
use std::time::Duration;

/// Default total attempts per tool invocation
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default backoff unit in seconds (delay = attempt number x base)
const DEFAULT_RETRY_BASE_DELAY_SECS: u64 = 2;
/// Default wall-clock budget for one full orchestrator run
const DEFAULT_OVERALL_BUDGET_SECS: u64 = 45;
/// Default result cache TTL (7 days)
const DEFAULT_CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;
/// Default result cache capacity
const DEFAULT_CACHE_CAPACITY: usize = 256;
/// Confidence at or below this triggers secondary analysis
const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Configuration for the analysis pipeline
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Total model-call attempts per tool invocation (including the first)
    pub max_attempts: u32,
    /// Backoff unit; delay after attempt N is N x this value
    pub retry_base_delay: Duration,
    /// Wall-clock budget for one full orchestrator run
    pub overall_budget: Duration,
    /// Result cache entry lifetime
    pub cache_ttl: Duration,
    /// Maximum number of cached brand lookups
    pub cache_capacity: usize,
    /// Confidence at or below this triggers secondary analysis
    pub confidence_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay: Duration::from_secs(DEFAULT_RETRY_BASE_DELAY_SECS),
            overall_budget: Duration::from_secs(DEFAULT_OVERALL_BUDGET_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

impl AnalysisConfig {
    /// Create configuration from environment variables, falling back to defaults
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: env_parse("NUTRILENS_MAX_ATTEMPTS", defaults.max_attempts),
            retry_base_delay: Duration::from_secs(env_parse(
                "NUTRILENS_RETRY_BASE_DELAY_SECS",
                DEFAULT_RETRY_BASE_DELAY_SECS,
            )),
            overall_budget: Duration::from_secs(env_parse(
                "NUTRILENS_OVERALL_BUDGET_SECS",
                DEFAULT_OVERALL_BUDGET_SECS,
            )),
            cache_ttl: Duration::from_secs(env_parse(
                "NUTRILENS_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL_SECS,
            )),
            cache_capacity: env_parse("NUTRILENS_CACHE_CAPACITY", defaults.cache_capacity),
            confidence_threshold: env_parse(
                "NUTRILENS_CONFIDENCE_THRESHOLD",
                defaults.confidence_threshold,
            ),
        }
    }
}

/// Parse an environment variable, falling back to the default on absence or parse failure
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
