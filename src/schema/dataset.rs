//! Data set description: where the velocity series lives and how it is sampled in time.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Relative tolerance (in sample spacings) when mapping a physical time to a sample index.
const INDEX_TOLERANCE: f64 = 1e-9;

/// Time series with uniform temporal spacing between samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesDescription {
    /// Temporal distance between two samples.
    pub temporal_spacing: f64,
    /// Physical time of the first sample.
    pub start_time: f64,
    /// Number of samples in the series.
    pub num_time_steps: usize,
}

impl Default for TimeSeriesDescription {
    fn default() -> Self {
        Self {
            temporal_spacing: 0.1,
            start_time: 0.0,
            num_time_steps: 151,
        }
    }
}

impl TimeSeriesDescription {
    pub fn new(temporal_spacing: f64, start_time: f64, num_time_steps: usize) -> Self {
        Self {
            temporal_spacing,
            start_time,
            num_time_steps,
        }
    }

    /// A series with a single sample describes a steady field.
    #[inline]
    pub fn is_steady(&self) -> bool {
        self.num_time_steps == 1
    }

    /// Physical time of the last sample.
    #[inline]
    pub fn end_time(&self) -> f64 {
        self.start_time + self.num_time_steps.saturating_sub(1) as f64 * self.temporal_spacing
    }

    /// Physical time of sample `index`.
    #[inline]
    pub fn time_of(&self, index: usize) -> f64 {
        self.start_time + index as f64 * self.temporal_spacing
    }

    /// Index of the sample at or before `time`, clamped to the series.
    pub fn index_at_or_before(&self, time: f64) -> usize {
        let relative = (time - self.start_time) / self.temporal_spacing;
        let index = (relative + INDEX_TOLERANCE).floor();
        index.clamp(0.0, self.last_index() as f64) as usize
    }

    /// Index of the sample at or after `time`, clamped to the series.
    pub fn index_at_or_after(&self, time: f64) -> usize {
        let relative = (time - self.start_time) / self.temporal_spacing;
        let index = (relative - INDEX_TOLERANCE).ceil();
        index.clamp(0.0, self.last_index() as f64) as usize
    }

    /// Clamp a signed sample index into the series.
    #[inline]
    pub fn clamp_index(&self, index: i64) -> usize {
        index.clamp(0, self.last_index() as i64) as usize
    }

    #[inline]
    pub fn last_index(&self) -> usize {
        self.num_time_steps.saturating_sub(1)
    }

    /// Whether the closed interval `[from, to]` lies inside the valid temporal range.
    pub fn covers(&self, from: f64, to: f64) -> bool {
        let slack = self.temporal_spacing.abs() * INDEX_TOLERANCE;
        from >= self.start_time - slack && to <= self.end_time() + slack
    }

    /// Physical times of all samples.
    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.num_time_steps).map(|i| self.time_of(i))
    }
}

fn default_prefix() -> String {
    "halfcylinder".to_string()
}

/// Location and naming of a time-dependent data set on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Directory containing all time samples.
    pub base_path: PathBuf,
    /// File name prefix shared by all files of the data set.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Temporal sampling of the velocity series.
    #[serde(default)]
    pub time_series: TimeSeriesDescription,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            prefix: default_prefix(),
            time_series: TimeSeriesDescription::default(),
        }
    }
}

impl DatasetConfig {
    pub fn new<P: AsRef<Path>>(base_path: P, time_series: TimeSeriesDescription) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            prefix: default_prefix(),
            time_series,
        }
    }

    /// Path of the velocity sample at `time`, e.g. `halfcylinder-0.30.am`.
    pub fn velocity_path(&self, time: f64) -> PathBuf {
        self.base_path
            .join(format!("{}-{}.am", self.prefix, format_time(time)))
    }

    /// Path of a derived quantity at `time`, e.g. `halfcylinder-ftle-5.00.am`.
    pub fn quantity_path(&self, quantity: &str, time: f64) -> PathBuf {
        self.base_path
            .join(format!("{}-{}-{}.am", self.prefix, quantity, format_time(time)))
    }
}

/// Times are encoded in file names with two decimals.
fn format_time(time: f64) -> String {
    let formatted = format!("{:.2}", time);
    // "-0.00" would name a different file than the sample at 0.
    if formatted == "-0.00" {
        "0.00".to_string()
    } else {
        formatted
    }
}
