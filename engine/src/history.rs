//! Bounded history of recent readings.

use std::collections::VecDeque;
use thermowatch_shared::Reading;

/// Number of readings kept when no capacity is configured.
pub const DEFAULT_HISTORY_CAPACITY: usize = 6;

/// Fixed-capacity FIFO of readings in arrival order.
///
/// Every appended reading is kept, including duplicates and readings whose
/// timestamp is older than the previous one. Once full, the oldest entry is
/// dropped for each new one.
#[derive(Debug, Clone)]
pub struct HistoryRing {
    capacity: usize,
    readings: VecDeque<Reading>,
}

impl Default for HistoryRing {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryRing {
    /// Create an empty ring. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            readings: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a reading. Returns how many old readings were evicted.
    pub fn append(&mut self, reading: Reading) -> usize {
        self.readings.push_back(reading);
        let mut evicted = 0;
        while self.readings.len() > self.capacity {
            self.readings.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Owned copy of the readings, oldest first.
    pub fn snapshot(&self) -> Vec<Reading> {
        self.readings.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn reading(value: f64, offset_secs: i64) -> Reading {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Reading::new(value, base + Duration::seconds(offset_secs)).unwrap()
    }

    fn values(ring: &HistoryRing) -> Vec<f64> {
        ring.snapshot().iter().map(Reading::value).collect()
    }

    #[test]
    fn test_keeps_last_n_in_arrival_order() {
        let mut ring = HistoryRing::new(6);
        for i in 0..10 {
            ring.append(reading(i as f64, i));
        }
        assert_eq!(ring.len(), 6);
        assert_eq!(values(&ring), vec![4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_append_reports_evictions() {
        let mut ring = HistoryRing::new(2);
        assert_eq!(ring.append(reading(1.0, 0)), 0);
        assert_eq!(ring.append(reading(2.0, 1)), 0);
        assert_eq!(ring.append(reading(3.0, 2)), 1);
    }

    #[test]
    fn test_accepts_out_of_order_and_duplicates() {
        let mut ring = HistoryRing::new(4);
        ring.append(reading(21.0, 10));
        ring.append(reading(22.0, 5));
        ring.append(reading(22.0, 5));
        assert_eq!(values(&ring), vec![21.0, 22.0, 22.0]);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut ring = HistoryRing::new(3);
        ring.append(reading(1.0, 0));
        let snapshot = ring.snapshot();
        ring.append(reading(2.0, 1));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let mut ring = HistoryRing::new(0);
        assert_eq!(ring.append(reading(1.0, 0)), 0);
        assert_eq!(ring.append(reading(2.0, 1)), 1);
        assert_eq!(values(&ring), vec![2.0]);
    }

    #[test]
    fn test_clear() {
        let mut ring = HistoryRing::default();
        ring.append(reading(1.0, 0));
        ring.clear();
        assert!(ring.is_empty());
    }
}
