//! Configuration types for FTLE, LIC and derived-field jobs.

use serde::{Deserialize, Serialize};

use super::DatasetConfig;

/// Numerical scheme used to advance a particle by one sub-step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationScheme {
    /// Explicit Euler: one velocity sample per sub-step.
    #[default]
    Euler,
    /// Classic fourth-order Runge-Kutta: four velocity samples per sub-step.
    RungeKutta4,
}

/// Top-level job configuration read by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Input data set.
    pub dataset: DatasetConfig,
    /// Finite-time Lyapunov exponent parameters.
    #[serde(default)]
    pub ftle: FtleConfig,
    /// Line integral convolution parameters.
    #[serde(default)]
    pub lic: LicConfig,
    /// Sample times for magnitude/vorticity output (empty = every sample).
    #[serde(default)]
    pub derived_times: Vec<f64>,
    /// Sample offset on each side of the time derivative used by feature flow.
    #[serde(default = "default_feature_flow_steps")]
    pub feature_flow_steps: usize,
}

fn default_feature_flow_steps() -> usize {
    1
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            ftle: FtleConfig::default(),
            lic: LicConfig::default(),
            derived_times: Vec::new(),
            feature_flow_steps: default_feature_flow_steps(),
        }
    }
}

/// FTLE parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FtleConfig {
    /// Seed lattice resolution (nx, ny, nz).
    pub resolution: [usize; 3],
    /// Signed integration step. Negative values trace backward in time.
    pub step_size: f64,
    /// Start times; one FTLE field is written per entry.
    pub start_times: Vec<f64>,
    /// Integration duration (always positive; direction comes from `step_size`).
    pub duration: f64,
    #[serde(default)]
    pub scheme: IntegrationScheme,
}

impl Default for FtleConfig {
    fn default() -> Self {
        Self {
            resolution: [640, 240, 80],
            step_size: -0.01,
            start_times: (50..60).map(|i| i as f64 * 0.1).collect(),
            duration: 2.0,
            scheme: IntegrationScheme::Euler,
        }
    }
}

fn default_noise_seed() -> u64 {
    0
}

/// LIC parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicConfig {
    /// Step size of each streamline walk (positive; walks go both ways).
    pub step_size: f64,
    /// Maximum number of sub-steps per walk direction.
    pub num_advection_steps: usize,
    /// Seed for the white-noise texture.
    #[serde(default = "default_noise_seed")]
    pub noise_seed: u64,
    #[serde(default)]
    pub scheme: IntegrationScheme,
    /// Sample times to process (empty = every sample).
    #[serde(default)]
    pub times: Vec<f64>,
}

impl Default for LicConfig {
    fn default() -> Self {
        Self {
            step_size: 0.01,
            num_advection_steps: 20,
            noise_seed: default_noise_seed(),
            scheme: IntegrationScheme::Euler,
            times: Vec::new(),
        }
    }
}

impl JobConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let series = &self.dataset.time_series;
        if !(series.temporal_spacing.is_finite() && series.temporal_spacing > 0.0) {
            return Err(ConfigError::InvalidTemporalSpacing);
        }
        if !series.start_time.is_finite() {
            return Err(ConfigError::NonFinite("time_series.start_time"));
        }
        if series.num_time_steps == 0 {
            return Err(ConfigError::EmptySeries);
        }
        if self.derived_times.iter().any(|t| !t.is_finite()) {
            return Err(ConfigError::NonFinite("derived_times"));
        }
        if self.feature_flow_steps == 0 {
            return Err(ConfigError::InvalidFeatureFlowSteps);
        }
        self.ftle.validate()?;
        self.lic.validate()
    }
}

impl FtleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolution.contains(&0) {
            return Err(ConfigError::InvalidResolution(self.resolution));
        }
        if !self.step_size.is_finite() {
            return Err(ConfigError::NonFinite("ftle.step_size"));
        }
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(ConfigError::InvalidDuration(self.duration));
        }
        if self.start_times.iter().any(|t| !t.is_finite()) {
            return Err(ConfigError::NonFinite("ftle.start_times"));
        }
        Ok(())
    }
}

impl LicConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.step_size.is_finite() {
            return Err(ConfigError::NonFinite("lic.step_size"));
        }
        if self.num_advection_steps == 0 {
            return Err(ConfigError::InvalidStepCount);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Temporal spacing must be positive and finite")]
    InvalidTemporalSpacing,
    #[error("Time series must contain at least one sample")]
    EmptySeries,
    #[error("Seed resolution {0:?} must be non-zero on every axis")]
    InvalidResolution([usize; 3]),
    #[error("Duration must be non-negative, got {0}")]
    InvalidDuration(f64),
    #[error("Number of advection steps must be non-zero")]
    InvalidStepCount,
    #[error("Feature flow sample offset must be non-zero")]
    InvalidFeatureFlowSteps,
    #[error("Parameter {0} must be finite")]
    NonFinite(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(JobConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = JobConfig::default();
        config.ftle.resolution = [10, 0, 10];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidResolution(_))
        ));

        let mut config = JobConfig::default();
        config.dataset.time_series.temporal_spacing = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTemporalSpacing)
        ));

        let mut config = JobConfig::default();
        config.ftle.duration = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDuration(_))
        ));

        let mut config = JobConfig::default();
        config.lic.num_advection_steps = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidStepCount)
        ));

        let mut config = JobConfig::default();
        config.feature_flow_steps = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFeatureFlowSteps)
        ));
    }

    #[test]
    fn test_feature_flow_steps_default() {
        let job: JobConfig = serde_json::from_str(r#"{"dataset": {"base_path": "data"}}"#).unwrap();
        assert_eq!(job.feature_flow_steps, 1);
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_scheme_serde() {
        let json = serde_json::to_string(&IntegrationScheme::RungeKutta4).unwrap();
        assert_eq!(json, "\"runge_kutta4\"");
        let lic: LicConfig =
            serde_json::from_str(r#"{"step_size": 0.02, "num_advection_steps": 8}"#).unwrap();
        assert_eq!(lic.scheme, IntegrationScheme::Euler);
        assert!(lic.times.is_empty());
    }
}
