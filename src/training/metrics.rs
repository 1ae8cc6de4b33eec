//! Running training statistics and the per-epoch CSV log

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Default number of recent values a [`SmoothedValue`] keeps
pub const DEFAULT_WINDOW: usize = 20;

/// Tracks a series of values, smoothed over a window and globally
#[derive(Debug, Clone)]
pub struct SmoothedValue {
    window: VecDeque<f64>,
    window_size: usize,
    total: f64,
    count: usize,
}

impl SmoothedValue {
    pub fn new(window_size: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(window_size),
            window_size: window_size.max(1),
            total: 0.0,
            count: 0,
        }
    }

    pub fn update(&mut self, value: f64) {
        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(value);
        self.total += value;
        self.count += 1;
    }

    /// Lower median of the window; 0 when empty
    pub fn median(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.window.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        sorted[(sorted.len() - 1) / 2]
    }

    /// Mean of the window; 0 when empty
    pub fn avg(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.window.iter().sum::<f64>() / self.window.len() as f64
    }

    /// Mean of every value since construction; 0 when empty
    pub fn global_avg(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.total / self.count as f64
    }

    pub fn latest(&self) -> Option<f64> {
        self.window.back().copied()
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl fmt::Display for SmoothedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} ({:.4})", self.median(), self.global_avg())
    }
}

/// Named [`SmoothedValue`]s rendered on one line
///
/// Displays as `name: median (global_avg)` entries joined by the delimiter,
/// in name order.
#[derive(Debug, Clone)]
pub struct MetricLogger {
    meters: BTreeMap<String, SmoothedValue>,
    delimiter: String,
    window_size: usize,
}

impl MetricLogger {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            meters: BTreeMap::new(),
            delimiter: delimiter.into(),
            window_size: DEFAULT_WINDOW,
        }
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn update(&mut self, name: &str, value: f64) {
        let window_size = self.window_size;
        self.meters
            .entry(name.to_string())
            .or_insert_with(|| SmoothedValue::new(window_size))
            .update(value);
    }

    pub fn get(&self, name: &str) -> Option<&SmoothedValue> {
        self.meters.get(name)
    }

    /// Drop every meter, e.g. at the start of an epoch
    pub fn reset(&mut self) {
        self.meters.clear();
    }
}

impl fmt::Display for MetricLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (name, meter)) in self.meters.iter().enumerate() {
            if index > 0 {
                f.write_str(&self.delimiter)?;
            }
            write!(f, "{name}: {meter}")?;
        }
        Ok(())
    }
}

/// One row of `metrics.csv`
#[derive(Debug, Clone, PartialEq)]
pub struct EpochMetrics {
    /// 1-based epoch number
    pub epoch: usize,
    /// Mean training loss over the epoch
    pub train_loss: f64,
    pub val_accuracy: f64,
    /// Learning rate used during the epoch
    pub lr: f64,
}

/// Appends [`EpochMetrics`] rows to a CSV file
pub struct EpochLog {
    csv_path: PathBuf,
}

impl EpochLog {
    const HEADER: &'static str = "epoch,train_loss,val_accuracy,lr";

    /// Create `metrics.csv` in `dir`, writing the header if the file is new
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut file = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(file, "{}", Self::HEADER)?;
        }
        Ok(Self { csv_path })
    }

    pub fn path(&self) -> &Path {
        &self.csv_path
    }

    pub fn log(&self, metrics: &EpochMetrics) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            file,
            "{},{:.6},{:.6},{:.8}",
            metrics.epoch, metrics.train_loss, metrics.val_accuracy, metrics.lr
        )?;

        tracing::debug!(
            "Logged epoch {}: train_loss={:.4}, val_accuracy={:.4}",
            metrics.epoch,
            metrics.train_loss,
            metrics.val_accuracy
        );
        Ok(())
    }
}
