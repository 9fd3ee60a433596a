//! Worker statistics
//!
//! Each worker owns its counters and hands them back when it is joined, so
//! nothing here is shared between threads.

use crate::error::ErrorKind;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::info;

const WINDOW_SIZE: usize = 10000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyStats {
    pub min_us: u64,
    pub max_us: u64,
    pub mean_us: f64,
    pub p50_us: u64,
    pub p99_us: u64,
}

/// Sliding window of the most recent latency samples, in microseconds
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    samples: VecDeque<u64>,
}

impl LatencyWindow {
    pub fn new() -> Self {
        LatencyWindow {
            samples: VecDeque::with_capacity(WINDOW_SIZE),
        }
    }

    pub fn record(&mut self, micros: u64) {
        if self.samples.len() >= WINDOW_SIZE {
            self.samples.pop_front();
        }
        self.samples.push_back(micros);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn stats(&self) -> Option<LatencyStats> {
        if self.samples.is_empty() {
            return None;
        }

        let mut sorted: Vec<u64> = self.samples.iter().copied().collect();
        sorted.sort_unstable();

        let mean = sorted.iter().sum::<u64>() as f64 / sorted.len() as f64;
        Some(LatencyStats {
            min_us: sorted[0],
            max_us: sorted[sorted.len() - 1],
            mean_us: mean,
            p50_us: sorted[sorted.len() / 2],
            p99_us: sorted[(sorted.len() * 99) / 100],
        })
    }
}

impl Default for LatencyWindow {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub datagrams: u64,
    pub bytes: u64,
    pub dropped: u64,
    pub read_errors: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessorStats {
    pub packets: u64,
    pub events_delivered: u64,
    /// Decoded but not delivered because the variant is disabled
    pub events_filtered: u64,
    pub truncated: u64,
    pub protocol_violations: u64,
    pub unknown_templates: u64,
    /// Missing packet sequence numbers
    pub sequence_gaps: u64,
    pub duplicates: u64,
    /// Receive to end of dispatch
    pub latency: LatencyWindow,
}

impl ProcessorStats {
    pub fn record_decode_error(&mut self, kind: ErrorKind) {
        match kind {
            ErrorKind::Truncated => self.truncated += 1,
            ErrorKind::ProtocolViolation => self.protocol_violations += 1,
            ErrorKind::UnknownTemplate => self.unknown_templates += 1,
            ErrorKind::Setup | ErrorKind::Read | ErrorKind::QueueFull => {}
        }
    }

    pub fn decode_errors(&self) -> u64 {
        self.truncated + self.protocol_violations + self.unknown_templates
    }
}

/// Combined statistics of one connected period of a session
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub receiver: ReceiverStats,
    pub processor: ProcessorStats,
    pub elapsed: Duration,
}

impl SessionStats {
    pub fn packets_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.processor.packets as f64 / secs
        } else {
            0.0
        }
    }

    pub fn bytes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.receiver.bytes as f64 / secs
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        info!(
            datagrams = self.receiver.datagrams,
            bytes = self.receiver.bytes,
            dropped = self.receiver.dropped,
            read_errors = self.receiver.read_errors,
            packets = self.processor.packets,
            events = self.processor.events_delivered,
            filtered = self.processor.events_filtered,
            decode_errors = self.processor.decode_errors(),
            sequence_gaps = self.processor.sequence_gaps,
            elapsed = ?self.elapsed,
            packets_per_sec = %format!("{:.2}", self.packets_per_sec()),
            "feed session summary"
        );

        if let Some(stats) = self.processor.latency.stats() {
            info!(
                min_us = stats.min_us,
                max_us = stats.max_us,
                mean_us = %format!("{:.2}", stats.mean_us),
                p50_us = stats.p50_us,
                p99_us = stats.p99_us,
                "receive to dispatch latency"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_stats() {
        let mut window = LatencyWindow::new();
        assert!(window.stats().is_none());
        for i in 1..=100 {
            window.record(i);
        }

        let stats = window.stats().unwrap();
        assert_eq!(stats.min_us, 1);
        assert_eq!(stats.max_us, 100);
        assert_eq!(stats.p50_us, 51);
        assert!((stats.mean_us - 50.5).abs() < 1e-9);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut window = LatencyWindow::new();
        for i in 0..(WINDOW_SIZE as u64 + 10) {
            window.record(i);
        }
        assert_eq!(window.len(), WINDOW_SIZE);
        assert_eq!(window.stats().unwrap().min_us, 10);
    }

    #[test]
    fn test_decode_error_counts() {
        let mut stats = ProcessorStats::default();
        stats.record_decode_error(ErrorKind::Truncated);
        stats.record_decode_error(ErrorKind::UnknownTemplate);
        stats.record_decode_error(ErrorKind::ProtocolViolation);
        stats.record_decode_error(ErrorKind::ProtocolViolation);
        assert_eq!(stats.decode_errors(), 4);
        assert_eq!(stats.protocol_violations, 2);
    }

    #[test]
    fn test_rates_without_elapsed_time() {
        let stats = SessionStats::default();
        assert_eq!(stats.packets_per_sec(), 0.0);
        assert_eq!(stats.bytes_per_sec(), 0.0);
    }
}
