//! Prometheus metrics for the monitoring engine

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, Counter, CounterVec, Encoder, Gauge,
    TextEncoder,
};

// ── Feed metrics ─────────────────────────────────────────────────────────────

pub static READINGS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!("thermowatch_readings_total", "Readings accepted by the engine").unwrap()
});

pub static READINGS_IGNORED: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "thermowatch_readings_ignored_total",
        "Readings delivered while the engine was not running"
    )
    .unwrap()
});

pub static FEED_ERRORS: Lazy<Counter> = Lazy::new(|| {
    register_counter!("thermowatch_feed_errors_total", "Failed feed fetches").unwrap()
});

pub static CURRENT_TEMPERATURE: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "thermowatch_current_temperature_celsius",
        "Most recent temperature reading"
    )
    .unwrap()
});

pub static IN_RANGE: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "thermowatch_in_range",
        "1 when the latest reading is within thresholds, 0 otherwise"
    )
    .unwrap()
});

pub static HISTORY_LEN: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("thermowatch_history_len", "Readings held in the history ring").unwrap()
});

pub static HISTORY_EVICTIONS: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "thermowatch_history_evictions_total",
        "Readings dropped from the front of a full history ring"
    )
    .unwrap()
});

// ── Alert metrics ────────────────────────────────────────────────────────────

pub static ALERTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "thermowatch_alerts_total",
        "Out-of-range readings by dedup outcome",
        &["status"]
    )
    .unwrap()
});

pub static ALERT_DELIVERY_FAILURES: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "thermowatch_alert_delivery_failures_total",
        "Alerts the notifier failed to deliver"
    )
    .unwrap()
});

// ── Threshold metrics ────────────────────────────────────────────────────────

pub static THRESHOLD_COMMITS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "thermowatch_threshold_commits_total",
        "Threshold commit attempts by outcome",
        &["status"]
    )
    .unwrap()
});

/// Render all registered metrics to Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_includes_registered_metrics() {
        READINGS_TOTAL.inc();
        ALERTS_TOTAL.with_label_values(&["fired"]).inc();
        let text = encode_metrics();
        assert!(text.contains("thermowatch_readings_total"));
        assert!(text.contains("thermowatch_alerts_total{status=\"fired\"}"));
    }
}
