//! # Structured Logging Module
//!
//! Environment-aware structured logging for dispatch diagnostics.

use crate::config::DispatchConfig;
use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let config = DispatchConfig::global();
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| get_log_level(&environment));

        let console = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(EnvFilter::new(&log_level));
        let json = config.logging.json.then(|| {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_filter(EnvFilter::new(&log_level))
        });

        // Use try_init to avoid panic if global subscriber already set
        if tracing_subscriber::registry()
            .with(console)
            .with(json)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            environment = %environment,
            level = %log_level,
            json = config.logging.json,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
pub fn get_environment() -> String {
    std::env::var("MEDIATOR_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
pub fn get_log_level(environment: &str) -> String {
    match environment {
        "test" | "development" => "debug".to_string(),
        "production" => DispatchConfig::global().logging.level.clone(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for a top-level dispatch
pub fn log_dispatch_operation(
    operation: &str,
    policy: &str,
    callback: &str,
    handled: bool,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        policy = %policy,
        callback = %callback,
        handled = handled,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📨 DISPATCH_OPERATION"
    );
}

/// Log structured data for binding registration changes
pub fn log_binding_operation(
    operation: &str,
    policy: &str,
    owner: &str,
    binding: &str,
    status: &str,
) {
    tracing::debug!(
        operation = %operation,
        policy = %policy,
        owner = %owner,
        binding = %binding,
        status = %status,
        timestamp = %Utc::now().to_rfc3339(),
        "📚 BINDING_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}
