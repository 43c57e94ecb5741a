use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::domain::round2;

const LATENCY_WINDOW: usize = 100;

/// Running counters owned by one orchestrator instance.
#[derive(Debug, Default)]
pub struct OrchestratorMetrics {
    total_evaluations: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    errors: AtomicU64,
    timeouts: AtomicU64,
    latencies_ms: Mutex<VecDeque<f64>>,
}

/// Point-in-time snapshot returned by `get_stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationStats {
    pub total_evaluations: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_ratio: f64,
    pub errors: u64,
    pub timeouts: u64,
    pub average_latency_ms: f64,
}

impl OrchestratorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self, timed_out: bool) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        if timed_out {
            self.timeouts.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Counts a completed evaluation and adds its latency to the rolling window.
    pub fn record_evaluation(&self, latency_ms: f64) {
        self.total_evaluations.fetch_add(1, Ordering::Relaxed);
        let mut window = self
            .latencies_ms
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if window.len() == LATENCY_WINDOW {
            window.pop_front();
        }
        window.push_back(latency_ms);
    }

    pub fn snapshot(&self) -> EvaluationStats {
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let lookups = cache_hits + cache_misses;

        let average_latency_ms = {
            let window = self
                .latencies_ms
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if window.is_empty() {
                0.0
            } else {
                window.iter().sum::<f64>() / window.len() as f64
            }
        };

        EvaluationStats {
            total_evaluations: self.total_evaluations.load(Ordering::Relaxed),
            cache_hits,
            cache_misses,
            cache_hit_ratio: if lookups == 0 {
                0.0
            } else {
                round2(cache_hits as f64 / lookups as f64)
            },
            errors: self.errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            average_latency_ms: round2(average_latency_ms),
        }
    }
}
