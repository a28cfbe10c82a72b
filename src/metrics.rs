//! Metrics reporting for the dispatcher.
//!
//! The producer and the workers only see the [`MetricsSink`] trait. The binary
//! plugs in [`PrometheusSink`], which keeps two series in a private registry:
//!
//! - `worker_jobs_processed_total{worker_id, type}`: jobs completed per worker
//!   and category
//! - `worker_jobs_inflight{type}`: jobs generated but not yet completed
//!
//! Both series are label vectors whose children are atomics, so updates for
//! different labels never contend on a shared lock once a child exists.

use prometheus::proto::Metric;
use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::error::Result;

/// Destination for the counts reported by the producer and the workers.
///
/// Implementations are shared across tasks and must be safe to update
/// concurrently.
pub trait MetricsSink: Send + Sync + 'static {
    /// Record one completed job for `(worker_id, category)`.
    fn increment_processed(&self, worker_id: usize, category: &str);

    /// Adjust the in-flight gauge for `category` by `delta`.
    fn add_in_flight(&self, category: &str, delta: i64);
}

const NAMESPACE: &str = "worker";
const SUBSYSTEM: &str = "jobs";
const PROCESSED_FAMILY: &str = "worker_jobs_processed_total";
const IN_FLIGHT_FAMILY: &str = "worker_jobs_inflight";

#[derive(Clone)]
pub struct PrometheusSink {
    registry: Registry,
    processed: IntCounterVec,
    in_flight: IntGaugeVec,
}

impl PrometheusSink {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let processed = IntCounterVec::new(
            Opts::new(
                "processed_total",
                "Total number of jobs processed by the workers",
            )
            .namespace(NAMESPACE)
            .subsystem(SUBSYSTEM),
            &["worker_id", "type"],
        )?;
        registry.register(Box::new(processed.clone()))?;

        let in_flight = IntGaugeVec::new(
            Opts::new("inflight", "Number of jobs inflight")
                .namespace(NAMESPACE)
                .subsystem(SUBSYSTEM),
            &["type"],
        )?;
        registry.register(Box::new(in_flight.clone()))?;

        Ok(Self {
            registry,
            processed,
            in_flight,
        })
    }

    // Reads go through `gather` and never create a labelled child.

    /// Jobs completed by one worker for one category
    pub fn processed(&self, worker_id: usize, category: &str) -> u64 {
        let worker_id = worker_id.to_string();
        self.series(PROCESSED_FAMILY)
            .iter()
            .filter(|m| has_label(m, "worker_id", &worker_id) && has_label(m, "type", category))
            .map(|m| m.get_counter().get_value() as u64)
            .sum()
    }

    /// Jobs completed across every worker and category
    pub fn processed_total(&self) -> u64 {
        self.series(PROCESSED_FAMILY)
            .iter()
            .map(|m| m.get_counter().get_value() as u64)
            .sum()
    }

    pub fn in_flight(&self, category: &str) -> i64 {
        self.series(IN_FLIGHT_FAMILY)
            .iter()
            .filter(|m| has_label(m, "type", category))
            .map(|m| m.get_gauge().get_value() as i64)
            .sum()
    }

    fn series(&self, family: &str) -> Vec<Metric> {
        self.registry
            .gather()
            .into_iter()
            .filter(|f| f.get_name() == family)
            .flat_map(|f| f.get_metric().to_vec())
            .collect()
    }

    /// Render every series in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

fn has_label(metric: &Metric, name: &str, value: &str) -> bool {
    metric
        .get_label()
        .iter()
        .any(|l| l.get_name() == name && l.get_value() == value)
}

impl MetricsSink for PrometheusSink {
    fn increment_processed(&self, worker_id: usize, category: &str) {
        self.processed
            .with_label_values(&[&worker_id.to_string(), category])
            .inc();
    }

    fn add_in_flight(&self, category: &str, delta: i64) {
        self.in_flight.with_label_values(&[category]).add(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_processed_per_worker_and_category() {
        let sink = PrometheusSink::new().unwrap();
        sink.increment_processed(0, "email");
        sink.increment_processed(0, "email");
        sink.increment_processed(1, "email");
        sink.increment_processed(1, "activation");

        assert_eq!(sink.processed(0, "email"), 2);
        assert_eq!(sink.processed(1, "email"), 1);
        assert_eq!(sink.processed(1, "activation"), 1);
        assert_eq!(sink.processed(2, "email"), 0);
        assert_eq!(sink.processed_total(), 4);
    }

    #[test]
    fn in_flight_moves_both_ways() {
        let sink = PrometheusSink::new().unwrap();
        sink.add_in_flight("transaction", 1);
        sink.add_in_flight("transaction", 1);
        sink.add_in_flight("transaction", -1);
        assert_eq!(sink.in_flight("transaction"), 1);
        assert_eq!(sink.in_flight("email"), 0);
    }

    #[test]
    fn encodes_text_format() {
        let sink = PrometheusSink::new().unwrap();
        sink.increment_processed(3, "email");
        sink.add_in_flight("email", 2);

        let text = sink.encode().unwrap();
        assert!(text.contains("# HELP worker_jobs_processed_total"));
        assert!(text.contains("worker_jobs_processed_total{type=\"email\",worker_id=\"3\"} 1"));
        assert!(text.contains("worker_jobs_inflight{type=\"email\"} 2"));
        assert!(sink.content_type().starts_with("text/plain"));
    }

    #[test]
    fn reading_does_not_create_series() {
        let sink = PrometheusSink::new().unwrap();
        assert_eq!(sink.in_flight("email"), 0);
        assert_eq!(sink.processed(4, "email"), 0);

        let text = sink.encode().unwrap();
        assert!(!text.contains("type=\"email\""), "unexpected series:\n{}", text);
    }

    #[test]
    fn sinks_do_not_share_state() {
        let a = PrometheusSink::new().unwrap();
        let b = PrometheusSink::new().unwrap();
        a.increment_processed(0, "email");
        assert_eq!(b.processed_total(), 0);
    }
}
