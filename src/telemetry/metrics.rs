//! Step timing metrics
//!
//! Rolling statistics over the duration of mode steps.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Step timing statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepStats {
    /// Average step time in milliseconds
    pub avg_ms: f64,
    /// Minimum step time in milliseconds
    pub min_ms: f64,
    /// Maximum step time in milliseconds
    pub max_ms: f64,
    /// 50th percentile (median) step time
    pub p50_ms: f64,
    /// 95th percentile step time
    pub p95_ms: f64,
    /// 99th percentile step time
    pub p99_ms: f64,
    /// Number of samples in the statistics
    pub sample_count: usize,
}

/// Rolling profiler for step durations
pub struct StepProfiler {
    step_times: VecDeque<Duration>,
    max_samples: usize,
    /// Start of the step being timed
    step_start: Option<Instant>,
    /// Start times of completed steps, for the step rate
    step_starts: VecDeque<Instant>,
}

impl Default for StepProfiler {
    fn default() -> Self {
        Self::new()
    }
}

impl StepProfiler {
    pub fn new() -> Self {
        Self::with_capacity(300)
    }

    /// Create a profiler keeping the last `max_samples` steps
    pub fn with_capacity(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            step_times: VecDeque::with_capacity(max_samples),
            max_samples,
            step_start: None,
            step_starts: VecDeque::with_capacity(max_samples),
        }
    }

    /// Mark the beginning of a step
    pub fn begin_step(&mut self) {
        self.step_start = Some(Instant::now());
    }

    /// Mark the end of the step started by `begin_step`
    pub fn end_step(&mut self) {
        if let Some(start) = self.step_start.take() {
            self.step_starts.push_back(start);
            if self.step_starts.len() > self.max_samples {
                self.step_starts.pop_front();
            }
            self.record(start.elapsed());
        }
    }

    /// Record one step duration
    pub fn record(&mut self, duration: Duration) {
        self.step_times.push_back(duration);
        if self.step_times.len() > self.max_samples {
            self.step_times.pop_front();
        }
    }

    pub fn stats(&self) -> StepStats {
        if self.step_times.is_empty() {
            return StepStats::default();
        }

        let mut times: Vec<f64> = self
            .step_times
            .iter()
            .map(|d| d.as_secs_f64() * 1000.0)
            .collect();
        times.sort_by(|a, b| a.total_cmp(b));

        let sum: f64 = times.iter().sum();

        StepStats {
            avg_ms: sum / times.len() as f64,
            min_ms: times.first().copied().unwrap_or(0.0),
            max_ms: times.last().copied().unwrap_or(0.0),
            p50_ms: percentile(&times, 0.50),
            p95_ms: percentile(&times, 0.95),
            p99_ms: percentile(&times, 0.99),
            sample_count: times.len(),
        }
    }

    /// Steps per second over the retained window
    pub fn steps_per_second(&self) -> f64 {
        let (Some(first), Some(last)) = (self.step_starts.front(), self.step_starts.back()) else {
            return 0.0;
        };
        let window = last.duration_since(*first).as_secs_f64();
        if self.step_starts.len() < 2 || window <= 0.0 {
            return 0.0;
        }
        (self.step_starts.len() - 1) as f64 / window
    }

    pub fn last_step_ms(&self) -> f64 {
        self.step_times
            .back()
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }
}

/// Percentile of a sorted slice
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p) as usize;
    sorted[idx]
}
