use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub static ACCOUNT_OPERATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Register collectors. Calling it again is a no-op.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    if REGISTRY.get().is_some() {
        return Ok(());
    }

    let registry = Registry::new();

    let operations_total = IntCounterVec::new(
        Opts::new(
            "account_operations_total",
            "Total number of account use-case invocations",
        ),
        &["operation", "outcome"],
    )?;
    registry.register(Box::new(operations_total.clone()))?;

    let _ = REGISTRY.set(registry);
    let _ = ACCOUNT_OPERATIONS_TOTAL.set(operations_total);
    Ok(())
}

/// Count one invocation of `operation`.
pub fn record(operation: &str, outcome: &str) {
    if let Some(counter) = ACCOUNT_OPERATIONS_TOTAL.get() {
        counter.with_label_values(&[operation, outcome]).inc();
    }
}

pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Metrics output is not valid UTF-8: {}", e);
            format!("# Failed to convert metrics to string: {}\n", e)
        }
    }
}
