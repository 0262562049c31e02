//! Audit logging for operator-relevant events.
//!
//! All events are emitted via `tracing` with a dedicated target so they can be
//! filtered and formatted (e.g. JSON) separately from diagnostics.

use thermowatch_shared::{ThresholdField, Thresholds};
use tracing::{info, warn};

const AUDIT_TARGET: &str = "thermowatch::audit";

/// Log a successfully persisted threshold change.
pub fn thresholds_committed(field: ThresholdField, previous: &Thresholds, current: &Thresholds) {
    info!(
        target: AUDIT_TARGET,
        event = "thresholds_committed",
        field = %field,
        previous = %previous,
        current = %current,
    );
}

/// Log a rejected threshold edit.
pub fn threshold_rejected(field: ThresholdField, raw: &str, reason: &str) {
    warn!(
        target: AUDIT_TARGET,
        event = "threshold_rejected",
        field = %field,
        raw = %raw,
        reason = %reason,
    );
}

/// Log an engine lifecycle transition.
pub fn lifecycle(state: &str, source: &str) {
    info!(
        target: AUDIT_TARGET,
        event = "engine_lifecycle",
        state = %state,
        source = %source,
    );
}

/// Log admin HTTP request.
pub fn admin_http_request(path: &str, status: u16) {
    info!(
        target: AUDIT_TARGET,
        event = "admin_http_request",
        path = %path,
        status = %status,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// In-memory sink for the JSON formatter.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    impl Captured {
        fn events(&self) -> Vec<serde_json::Value> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    #[test]
    fn test_events_carry_audit_target_and_name() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_writer(captured.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let previous = Thresholds::default();
            let current = Thresholds::new(18.0, 30.0).unwrap();
            thresholds_committed(ThresholdField::Min, &previous, &current);
            threshold_rejected(ThresholdField::Max, "abc", "invalid number");
            lifecycle("running", "simulated feed [15, 35]");
            admin_http_request("/healthz", 200);
        });

        let events = captured.events();
        let names: Vec<&str> = events
            .iter()
            .map(|e| e["fields"]["event"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "thresholds_committed",
                "threshold_rejected",
                "engine_lifecycle",
                "admin_http_request",
            ]
        );
        assert!(events.iter().all(|e| e["target"] == AUDIT_TARGET));

        assert_eq!(events[0]["fields"]["field"], "min");
        assert_eq!(events[0]["fields"]["current"], "[18°C, 30°C]");
        assert_eq!(events[1]["level"], "WARN");
        assert_eq!(events[1]["fields"]["raw"], "abc");
        assert_eq!(events[3]["fields"]["path"], "/healthz");
    }
}
