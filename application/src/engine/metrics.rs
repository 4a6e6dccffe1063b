//! Per-tool execution metrics.
//!
//! Counters are append-only atomics; each finished execution is recorded
//! exactly once. Reads produce a serialisable snapshot.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
struct ToolCounters {
    executions: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    cache_hits: AtomicU64,
    total_time_us: AtomicU64,
}

/// Read model of one tool's counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMetrics {
    pub tool_id: String,
    pub executions: u64,
    pub successes: u64,
    pub failures: u64,
    pub cache_hits: u64,
    pub total_time_us: u64,
    pub success_rate: f64,
    pub avg_latency_ms: f64,
}

#[derive(Debug, Default)]
pub struct MetricsSink {
    tools: RwLock<HashMap<String, Arc<ToolCounters>>>,
}

impl MetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self, tool_id: &str) -> Arc<ToolCounters> {
        if let Some(counters) = self.tools.read().get(tool_id) {
            return Arc::clone(counters);
        }
        Arc::clone(self.tools.write().entry(tool_id.to_string()).or_default())
    }

    /// Record one finished execution.
    pub fn record(&self, tool_id: &str, success: bool, cache_hit: bool, elapsed: Duration) {
        let counters = self.counters(tool_id);
        counters.executions.fetch_add(1, Ordering::Relaxed);
        if success {
            counters.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            counters.failures.fetch_add(1, Ordering::Relaxed);
        }
        if cache_hit {
            counters.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
        counters
            .total_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn get(&self, tool_id: &str) -> Option<ToolMetrics> {
        self.tools
            .read()
            .get(tool_id)
            .map(|counters| to_metrics(tool_id, counters))
    }

    /// All tools, sorted by id.
    pub fn snapshot(&self) -> Vec<ToolMetrics> {
        let mut metrics: Vec<ToolMetrics> = self
            .tools
            .read()
            .iter()
            .map(|(id, counters)| to_metrics(id, counters))
            .collect();
        metrics.sort_by(|a, b| a.tool_id.cmp(&b.tool_id));
        metrics
    }
}

fn to_metrics(tool_id: &str, counters: &ToolCounters) -> ToolMetrics {
    let executions = counters.executions.load(Ordering::Relaxed);
    let successes = counters.successes.load(Ordering::Relaxed);
    let total_time_us = counters.total_time_us.load(Ordering::Relaxed);
    let (success_rate, avg_latency_ms) = if executions == 0 {
        (0.0, 0.0)
    } else {
        (
            successes as f64 / executions as f64,
            total_time_us as f64 / executions as f64 / 1000.0,
        )
    };
    ToolMetrics {
        tool_id: tool_id.to_string(),
        executions,
        successes,
        failures: counters.failures.load(Ordering::Relaxed),
        cache_hits: counters.cache_hits.load(Ordering::Relaxed),
        total_time_us,
        success_rate,
        avg_latency_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_derive() {
        let metrics = MetricsSink::new();
        metrics.record("comps", true, false, Duration::from_millis(30));
        metrics.record("comps", true, true, Duration::from_millis(0));
        metrics.record("comps", false, false, Duration::from_millis(60));

        let comps = metrics.get("comps").unwrap();
        assert_eq!(comps.executions, 3);
        assert_eq!(comps.successes, 2);
        assert_eq!(comps.failures, 1);
        assert_eq!(comps.cache_hits, 1);
        assert_eq!(comps.total_time_us, 90_000);
        assert!((comps.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!((comps.avg_latency_ms - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_sorted_and_unknown_absent() {
        let metrics = MetricsSink::new();
        metrics.record("zeta", true, false, Duration::ZERO);
        metrics.record("alpha", false, false, Duration::ZERO);

        let ids: Vec<String> = metrics.snapshot().into_iter().map(|m| m.tool_id).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
        assert!(metrics.get("missing").is_none());
    }

    #[test]
    fn test_concurrent_increments() {
        let metrics = Arc::new(MetricsSink::new());
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        metrics.record("comps", true, false, Duration::from_micros(1));
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }
        assert_eq!(metrics.get("comps").unwrap().executions, 1000);
    }
}
