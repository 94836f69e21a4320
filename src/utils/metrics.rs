//! Running counters for training loss and evaluation accuracy.
//!
//! Both are process-local and reset every run; only their derived values are
//! logged or tracked.

use serde::{Deserialize, Serialize};

/// Loss accumulated over a fixed window of batches
#[derive(Debug, Clone)]
pub struct LossWindow {
    interval: usize,
    sum: f64,
    count: usize,
}

impl LossWindow {
    /// Create a window that closes every `interval` batches
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            sum: 0.0,
            count: 0,
        }
    }

    /// Add one batch loss.
    ///
    /// Returns the window average when this batch closes the window, then
    /// starts a new window.
    pub fn push(&mut self, loss: f64) -> Option<f64> {
        self.sum += loss;
        self.count += 1;

        if self.count == self.interval {
            let average = self.sum / self.interval as f64;
            self.reset();
            Some(average)
        } else {
            None
        }
    }

    /// Drop any partial window
    pub fn reset(&mut self) {
        self.sum = 0.0;
        self.count = 0;
    }

    pub fn interval(&self) -> usize {
        self.interval
    }
}

/// Correct/total counter for classification accuracy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccuracyCounter {
    pub correct: usize,
    pub total: usize,
}

impl AccuracyCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a batch result
    pub fn update(&mut self, correct: usize, total: usize) {
        self.correct += correct;
        self.total += total;
    }

    /// Record predictions against labels pairwise
    pub fn update_from_pairs(&mut self, labels: &[usize], predictions: &[usize]) {
        let correct = labels
            .iter()
            .zip(predictions.iter())
            .filter(|(l, p)| l == p)
            .count();
        self.update(correct, labels.len().min(predictions.len()));
    }

    /// Accuracy in [0, 1]; an empty counter reports 0
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}
