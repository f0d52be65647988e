use tracing_subscriber::EnvFilter;

pub fn init() {
    // Initialize tracing subscriber once, honoring RUST_LOG if set.
    // Default to info level; allow override via RUST_LOG (e.g., "debug").
    // Logs go to stderr so stdio MCP framing on stdout stays clean.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Record a metric through the `metrics` facade and mirror it as a log line.
///
/// Names ending in `_total` are counters; everything else is a histogram.
pub fn log_metric(subject: &str, metric: &str, value: f64) {
    let name = format!("webmcp.{metric}");
    if metric.ends_with("_total") {
        metrics::counter!(name, "subject" => subject.to_string()).increment(value as u64);
    } else {
        metrics::histogram!(name, "subject" => subject.to_string()).record(value);
    }
    tracing::debug!(subject, metric, value, "metric");
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_is_idempotent() {
        super::init();
        super::init();
    }

    #[test]
    fn metrics_without_recorder_are_noops() {
        super::log_metric("add_todo", "invoke_error_total", 1.0);
        super::log_metric("add_todo", "invoke_latency_ms", 12.5);
    }
}
