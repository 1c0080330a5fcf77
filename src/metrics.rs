//! Advisory per-request performance log.
//!
//! Append-only, keyed by request id, no eviction. Purely diagnostic: the
//! completion path works identically with or without it.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;

/// Outcome of a single request.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceRecord {
    pub model: String,
    pub elapsed_ms: u64,
    pub total_tokens: u32,
    pub tokens_per_second: f64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PerformanceRecord {
    pub fn success(model: String, elapsed_ms: u64, total_tokens: u32) -> Self {
        let tokens_per_second = if elapsed_ms > 0 {
            total_tokens as f64 / (elapsed_ms as f64 / 1000.0)
        } else {
            0.0
        };
        Self {
            model,
            elapsed_ms,
            total_tokens,
            tokens_per_second,
            success: true,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(model: String, elapsed_ms: u64, error: String) -> Self {
        Self {
            model,
            elapsed_ms,
            total_tokens: 0,
            tokens_per_second: 0.0,
            success: false,
            error: Some(error),
            timestamp: Utc::now(),
        }
    }
}

/// Aggregate view over all recorded requests.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceSummary {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub success_rate: f64,
    pub average_latency_ms: f64,
    pub average_tokens_per_second: f64,
}

#[derive(Default)]
pub struct PerformanceLog {
    records: Mutex<HashMap<String, PerformanceRecord>>,
}

impl PerformanceLog {
    pub fn record(&self, request_id: &str, record: PerformanceRecord) {
        self.records.lock().insert(request_id.to_string(), record);
    }

    pub fn get(&self, request_id: &str) -> Option<PerformanceRecord> {
        self.records.lock().get(request_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn summary(&self) -> PerformanceSummary {
        let records = self.records.lock();
        if records.is_empty() {
            return PerformanceSummary::default();
        }

        let successful: Vec<&PerformanceRecord> =
            records.values().filter(|r| r.success).collect();
        let total = records.len();

        let (average_latency_ms, average_tokens_per_second) = if successful.is_empty() {
            (0.0, 0.0)
        } else {
            let n = successful.len() as f64;
            (
                successful.iter().map(|r| r.elapsed_ms as f64).sum::<f64>() / n,
                successful.iter().map(|r| r.tokens_per_second).sum::<f64>() / n,
            )
        };

        PerformanceSummary {
            total_requests: total,
            successful_requests: successful.len(),
            failed_requests: total - successful.len(),
            success_rate: successful.len() as f64 / total as f64,
            average_latency_ms,
            average_tokens_per_second,
        }
    }
}
