//! Prediction statistics for the credit risk service.

use crate::types::risk::RiskCategory;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Latency samples kept before the oldest half is discarded
const MAX_LATENCY_SAMPLES: usize = 10_000;

/// Metrics collector for `/predict`
pub struct PredictionMetrics {
    /// Successful predictions
    pub predictions: AtomicU64,
    /// Requests that failed coercion or scoring
    pub failures: AtomicU64,
    /// Predictions by risk category
    by_category: RwLock<HashMap<RiskCategory, u64>>,
    /// Prediction latencies (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Probability of default distribution buckets
    pd_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PredictionMetrics {
    pub fn new() -> Self {
        Self {
            predictions: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            by_category: RwLock::new(HashMap::new()),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            pd_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, latency: Duration, probability: f64, category: RiskCategory) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency);

        let bucket = ((probability * 10.0) as usize).min(9);
        if let Ok(mut buckets) = self.pd_buckets.write() {
            buckets[bucket] += 1;
        }
        if let Ok(mut by_category) = self.by_category.write() {
            *by_category.entry(category).or_insert(0) += 1;
        }
    }

    /// Record a failed prediction
    pub fn record_failure(&self, latency: Duration) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency);
    }

    fn record_latency(&self, latency: Duration) {
        if let Ok(mut times) = self.latencies.write() {
            times.push(latency.as_micros() as u64);
            if times.len() > MAX_LATENCY_SAMPLES {
                times.drain(0..MAX_LATENCY_SAMPLES / 2);
            }
        }
    }

    /// Get latency statistics
    pub fn latency_stats(&self) -> LatencyStats {
        let Ok(times) = self.latencies.read() else {
            return LatencyStats::default();
        };
        if times.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let percentile = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: percentile(0.50),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Requests per second since startup
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let total = self.predictions.load(Ordering::Relaxed) + self.failures.load(Ordering::Relaxed);
        if elapsed > 0.0 {
            total as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn pd_distribution(&self) -> [u64; 10] {
        self.pd_buckets.read().map(|b| *b).unwrap_or([0; 10])
    }

    pub fn by_category(&self) -> HashMap<RiskCategory, u64> {
        self.by_category
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let predictions = self.predictions.load(Ordering::Relaxed);
        let failures = self.failures.load(Ordering::Relaxed);
        let total = predictions + failures;
        let failure_rate = if total > 0 {
            (failures as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let latency = self.latency_stats();

        info!(
            predictions,
            failures,
            failure_rate = format!("{failure_rate:.1}%"),
            throughput = format!("{:.2} req/s", self.throughput()),
            mean_us = latency.mean_us,
            p50_us = latency.p50_us,
            p95_us = latency.p95_us,
            p99_us = latency.p99_us,
            "Prediction metrics summary"
        );

        let by_category = self.by_category();
        for category in [RiskCategory::Low, RiskCategory::Medium, RiskCategory::High] {
            let count = by_category.get(&category).copied().unwrap_or(0);
            let pct = if predictions > 0 {
                (count as f64 / predictions as f64) * 100.0
            } else {
                0.0
            };
            info!(category = category.as_str(), count, "  {:>6} ({:>5.1}%)", count, pct);
        }

        let distribution = self.pd_distribution();
        let bucket_total: u64 = distribution.iter().sum();
        if bucket_total == 0 {
            return;
        }
        for (i, &count) in distribution.iter().enumerate() {
            let pct = (count as f64 / bucket_total as f64) * 100.0;
            let bar = "█".repeat(((pct / 5.0) as usize).min(20));
            info!(
                "  PD {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
    }
}

impl Default for PredictionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency statistics
#[derive(Debug, Default)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodic metrics summary logger
pub struct MetricsReporter {
    metrics: Arc<PredictionMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PredictionMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // first tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
