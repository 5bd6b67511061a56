use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One observed speed estimate. Timestamps cross the wire as epoch
/// milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedSample {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub wpm: u32,
}

impl SpeedSample {
    pub fn new(timestamp: DateTime<Utc>, wpm: u32) -> Self {
        Self { timestamp, wpm }
    }
}

/// Bounded, insertion-ordered speed series. Oldest entries fall off first;
/// consecutive entries never repeat a wpm value and zero is never stored.
#[derive(Debug)]
pub struct SpeedHistory {
    samples: VecDeque<SpeedSample>,
    max_entries: usize,
}

impl SpeedHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            max_entries,
        }
    }

    /// Seed from persisted samples, keeping only the newest `max_entries`.
    pub fn preload(&mut self, samples: Vec<SpeedSample>) {
        self.samples.clear();
        let skip = samples.len().saturating_sub(self.max_entries);
        self.samples.extend(samples.into_iter().skip(skip));
    }

    /// Append a sample unless it is zero or repeats the latest stored
    /// value. Returns true when the buffer changed.
    pub fn record(&mut self, sample: SpeedSample) -> bool {
        if sample.wpm == 0 {
            return false;
        }
        if self.samples.back().is_some_and(|last| last.wpm == sample.wpm) {
            return false;
        }
        self.samples.push_back(sample);
        while self.samples.len() > self.max_entries {
            self.samples.pop_front();
        }
        true
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&SpeedSample> {
        self.samples.back()
    }

    pub fn samples(&self) -> impl Iterator<Item = &SpeedSample> {
        self.samples.iter()
    }

    /// Snapshot in oldest-first order, the shape persisted and sent to the
    /// surface.
    pub fn to_vec(&self) -> Vec<SpeedSample> {
        self.samples.iter().copied().collect()
    }
}

/// Client-side window over a speed series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    LastHour,
    LastDay,
    LastWeek,
    AllTime,
}

impl TimeRange {
    /// Oldest timestamp admitted by this range, if it is bounded.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeRange::LastHour => Some(now - Duration::hours(1)),
            TimeRange::LastDay => Some(now - Duration::days(1)),
            TimeRange::LastWeek => Some(now - Duration::weeks(1)),
            TimeRange::AllTime => None,
        }
    }
}

/// Samples admitted by `range` as of `now`, oldest first.
pub fn filter_range(samples: &[SpeedSample], range: TimeRange, now: DateTime<Utc>) -> Vec<SpeedSample> {
    match range.cutoff(now) {
        Some(cutoff) => samples
            .iter()
            .copied()
            .filter(|s| s.timestamp >= cutoff)
            .collect(),
        None => samples.to_vec(),
    }
}

/// Aggregate statistics over a (usually range-filtered) slice of samples.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySummary {
    pub peak_wpm: u32,
    pub average_wpm: f64,
    pub std_dev: f64,
    pub samples: usize,
}

/// Summarize a slice of samples. The peak skips entries from the first
/// five seconds of the slice so a warm-up spike cannot dominate; the
/// average and deviation cover everything.
pub fn summarize(samples: &[SpeedSample]) -> HistorySummary {
    if samples.is_empty() {
        return HistorySummary {
            peak_wpm: 0,
            average_wpm: 0.0,
            std_dev: 0.0,
            samples: 0,
        };
    }
    let window_start = samples[0].timestamp;
    let peak_wpm = samples
        .iter()
        .filter(|s| s.timestamp - window_start >= Duration::seconds(5))
        .map(|s| s.wpm)
        .max()
        .unwrap_or(0);
    let wpms: Vec<f64> = samples.iter().map(|s| s.wpm as f64).collect();
    HistorySummary {
        peak_wpm,
        average_wpm: mean(&wpms).unwrap_or(0.0),
        std_dev: std_dev(&wpms).unwrap_or(0.0),
        samples: samples.len(),
    }
}

fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

fn std_dev(data: &[f64]) -> Option<f64> {
    let mean = mean(data)?;
    let variance = data
        .iter()
        .map(|value| {
            let diff = mean - *value;
            diff * diff
        })
        .sum::<f64>()
        / data.len() as f64;
    Some(variance.sqrt())
}
