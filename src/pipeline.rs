//! File-to-file batch drivers.
//!
//! Every driver reads velocity samples through the data set naming
//! convention and writes one output file per processed time.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{info, warn};

use crate::amira::{AmiraSeries, read_grid, write_grid};
use crate::compute::{
    ComputeError, FrameSource, Grid, UnsteadyTracer, compute_ftle, compute_lic, feature_flow,
    velocity_magnitude, vorticity_magnitude, white_noise,
};
use crate::schema::{DatasetConfig, FtleConfig, JobConfig, LicConfig};

/// Compute one FTLE field starting at `start_time` and write it to `output`.
pub fn ftle_file<S: FrameSource>(
    tracer: &mut UnsteadyTracer<S>,
    config: &FtleConfig,
    start_time: f64,
    output: &Path,
) -> Result<(), ComputeError> {
    let started = Instant::now();
    let ftle = compute_ftle(tracer, config, start_time)?;
    write_grid(output, &ftle)?;
    info!(
        "Wrote {} ({:.2}s)",
        output.display(),
        started.elapsed().as_secs_f32()
    );
    Ok(())
}

/// LIC of the steady velocity field stored at `velocity_path`, written to `output`.
pub fn lic_file(velocity_path: &Path, output: &Path, config: &LicConfig) -> Result<(), ComputeError> {
    let velocity = read_grid(velocity_path)?;
    let noise = white_noise(&velocity, config.noise_seed)?;
    let lic = compute_lic(&velocity, &noise, config)?;
    write_grid(output, &lic)?;
    info!("Wrote {}", output.display());
    Ok(())
}

/// FTLE for every configured start time. Returns the written paths.
pub fn run_ftle(job: &JobConfig) -> Result<Vec<PathBuf>, ComputeError> {
    let dataset = &job.dataset;
    let mut tracer = UnsteadyTracer::new(AmiraSeries::new(dataset.clone()), dataset.time_series)?
        .with_scheme(job.ftle.scheme);
    info!(
        "FTLE: {} start times, T={}, h={}",
        job.ftle.start_times.len(),
        job.ftle.duration,
        job.ftle.step_size
    );

    let mut written = Vec::with_capacity(job.ftle.start_times.len());
    for &start_time in &job.ftle.start_times {
        let output = dataset.quantity_path("ftle", start_time);
        ftle_file(&mut tracer, &job.ftle, start_time, &output)?;
        written.push(output);
    }
    Ok(written)
}

/// LIC for every selected sample of the series.
pub fn run_lic(job: &JobConfig) -> Result<Vec<PathBuf>, ComputeError> {
    let dataset = &job.dataset;
    let times = selected_times(dataset, &job.lic.times);
    info!("LIC: {} samples", times.len());

    let mut written = Vec::with_capacity(times.len());
    for time in times {
        let output = dataset.quantity_path("lic", time);
        lic_file(&dataset.velocity_path(time), &output, &job.lic)?;
        written.push(output);
    }
    Ok(written)
}

/// Velocity magnitude for every selected sample.
pub fn run_magnitude(job: &JobConfig) -> Result<Vec<PathBuf>, ComputeError> {
    run_derived(job, "magnitude", velocity_magnitude)
}

/// Vorticity magnitude for every selected sample.
pub fn run_vorticity(job: &JobConfig) -> Result<Vec<PathBuf>, ComputeError> {
    run_derived(job, "vorticity", vorticity_magnitude)
}

/// Feature flow for every selected sample.
///
/// The time derivative spans `feature_flow_steps` samples on each side,
/// clamped to the series, so the first and last samples use one-sided
/// differences. Each time is snapped to the sample at or before it.
pub fn run_feature_flow(job: &JobConfig) -> Result<Vec<PathBuf>, ComputeError> {
    let dataset = &job.dataset;
    let series = &dataset.time_series;
    let times = selected_times(dataset, &job.derived_times);
    let steps = job.feature_flow_steps as i64;
    info!("featureflow: {} samples, +-{} steps", times.len(), steps);

    let mut written = Vec::with_capacity(times.len());
    for time in times {
        let index = series.index_at_or_before(time) as i64;
        let [previous, current, next] =
            [index - steps, index, index + steps].map(|i| series.time_of(series.clamp_index(i)));
        let load = |time: f64| {
            read_grid(dataset.velocity_path(time))
                .map_err(|source| ComputeError::FrameLoad { time, source })
        };
        let flow = feature_flow(&load(previous)?, &load(current)?, &load(next)?, next - previous)?;
        let output = dataset.quantity_path("featureflow", current);
        write_grid(&output, &flow)?;
        written.push(output);
    }
    Ok(written)
}

fn run_derived(
    job: &JobConfig,
    quantity: &str,
    derive: fn(&Grid) -> Result<Grid, ComputeError>,
) -> Result<Vec<PathBuf>, ComputeError> {
    let dataset = &job.dataset;
    let times = selected_times(dataset, &job.derived_times);
    info!("{}: {} samples", quantity, times.len());

    let mut written = Vec::with_capacity(times.len());
    for time in times {
        let velocity = read_grid(dataset.velocity_path(time))
            .map_err(|source| ComputeError::FrameLoad { time, source })?;
        let output = dataset.quantity_path(quantity, time);
        write_grid(&output, &derive(&velocity)?)?;
        written.push(output);
    }
    Ok(written)
}

/// Explicit times, or every sample of the series when none are given.
fn selected_times(dataset: &DatasetConfig, times: &[f64]) -> Vec<f64> {
    if times.is_empty() {
        return dataset.time_series.times().collect();
    }
    let series = &dataset.time_series;
    for &time in times {
        if !series.covers(time, time) {
            warn!(
                "t={:.2} is outside the series [{:.2}, {:.2}]",
                time,
                series.start_time,
                series.end_time()
            );
        }
    }
    times.to_vec()
}
