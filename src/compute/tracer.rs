//! Unsteady particle tracer - streams a time series through the temporal
//! window while advecting particles.
//!
//! Only three samples of the series are resident at any time. Advection
//! sub-steps never cross a sample boundary; when the walk reaches the
//! middle slot, the oldest slot is refilled with the next sample and the
//! simulated time is snapped to the new head tag.

use glam::DVec3;
use log::{debug, warn};
use rayon::prelude::*;

use crate::schema::{IntegrationScheme, TimeSeriesDescription};

use super::{Aabb, ComputeError, Grid, GridShape, TemporalWindow};

/// Relative tolerance (in sample spacings) for reaching a target time.
const TIME_TOLERANCE: f64 = 1e-9;

/// Supplier of velocity samples for the tracer.
pub trait FrameSource {
    /// Shape shared by every sample of the series.
    fn frame_shape(&self) -> Result<GridShape, ComputeError>;

    /// Overwrite `frame` with the sample at physical `time`.
    fn load(&self, time: f64, frame: &mut Grid) -> Result<(), ComputeError>;
}

/// Particle positions with their in-domain flags.
///
/// A particle whose flag turned false is frozen at its last valid
/// position for the rest of the trace.
#[derive(Debug, Clone, Default)]
pub struct ParticleSet {
    pub positions: Vec<DVec3>,
    pub in_domain: Vec<bool>,
}

impl ParticleSet {
    /// All particles start out in the domain.
    pub fn new(positions: Vec<DVec3>) -> Self {
        let in_domain = vec![true; positions.len()];
        Self {
            positions,
            in_domain,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of particles still in the domain.
    pub fn active_count(&self) -> usize {
        self.in_domain.iter().filter(|&&f| f).count()
    }
}

pub struct UnsteadyTracer<S: FrameSource> {
    source: S,
    desc: TimeSeriesDescription,
    shape: GridShape,
    window: TemporalWindow,
    scheme: IntegrationScheme,
}

impl<S: FrameSource> UnsteadyTracer<S> {
    /// Create a tracer. Only the frame shape is queried here; no sample is loaded.
    pub fn new(source: S, desc: TimeSeriesDescription) -> Result<Self, ComputeError> {
        let shape = source.frame_shape()?;
        if shape.components != 3 {
            return Err(ComputeError::NotVectorField(shape.components));
        }
        let window = TemporalWindow::new(&shape)?;
        Ok(Self {
            source,
            desc,
            shape,
            window,
            scheme: IntegrationScheme::default(),
        })
    }

    pub fn with_scheme(mut self, scheme: IntegrationScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn set_scheme(&mut self, scheme: IntegrationScheme) {
        self.scheme = scheme;
    }

    #[inline]
    pub fn scheme(&self) -> IntegrationScheme {
        self.scheme
    }

    /// Spatial domain of the series.
    #[inline]
    pub fn bounds(&self) -> &Aabb {
        &self.shape.bounds
    }

    #[inline]
    pub fn shape(&self) -> &GridShape {
        &self.shape
    }

    #[inline]
    pub fn desc(&self) -> &TimeSeriesDescription {
        &self.desc
    }

    #[inline]
    pub fn window(&self) -> &TemporalWindow {
        &self.window
    }

    /// Advect `particles` from `start_time` for `duration`.
    ///
    /// The sign of `step_size` selects forward or backward tracing. If the
    /// requested interval is not covered by the series, every particle is
    /// marked out of domain and `Ok` is returned. Frame load failures abort
    /// the trace with an error.
    pub fn flowmap(
        &mut self,
        particles: &mut ParticleSet,
        step_size: f64,
        start_time: f64,
        duration: f64,
    ) -> Result<(), ComputeError> {
        if step_size == 0.0 {
            return Ok(());
        }

        let direction = step_size.signum();
        let duration = duration.abs();
        let target = start_time + direction * duration;

        if !self.desc.is_steady() {
            let (from, to) = if direction > 0.0 {
                (start_time, target)
            } else {
                (target, start_time)
            };
            if !self.desc.covers(from, to) {
                warn!(
                    "Requested interval [{:.4}, {:.4}] outside series [{:.4}, {:.4}]; all particles leave the domain",
                    from,
                    to,
                    self.desc.start_time,
                    self.desc.end_time()
                );
                particles.in_domain.fill(false);
                return Ok(());
            }
        }

        let bounds = self.shape.bounds;
        particles
            .positions
            .par_iter()
            .zip(particles.in_domain.par_iter_mut())
            .for_each(|(p, flag)| *flag = bounds.contains(*p));

        if self.desc.is_steady() {
            self.window.load_steady(&self.source, self.desc.start_time)?;
            let eps = TIME_TOLERANCE * step_size.abs();
            self.integrate(particles, start_time, target, step_size, eps);
        } else {
            self.trace_unsteady(particles, step_size, start_time, target)?;
        }

        let active = particles.active_count();
        if active == 0 && !particles.is_empty() {
            warn!("All {} particles left the domain", particles.len());
        }
        debug!(
            "Flowmap t={:.4} -> {:.4}: {} of {} particles in domain",
            start_time,
            target,
            active,
            particles.len()
        );
        Ok(())
    }

    fn trace_unsteady(
        &mut self,
        particles: &mut ParticleSet,
        step_size: f64,
        start_time: f64,
        target: f64,
    ) -> Result<(), ComputeError> {
        let desc = self.desc;
        let direction = step_size.signum();
        let offset = direction as i64;
        let eps = TIME_TOLERANCE * desc.temporal_spacing.abs();

        // The first slot pair must enclose the start time in traversal direction.
        let mut frame = if direction > 0.0 {
            desc.index_at_or_before(start_time)
        } else {
            desc.index_at_or_after(start_time)
        } as i64;
        let initial = [0, 1, 2].map(|k| desc.time_of(desc.clamp_index(frame + k * offset)));
        self.window.load_initial(&self.source, initial)?;

        let mut time = start_time;
        loop {
            let boundary = self.window.time_at(1);
            let stop = if direction > 0.0 {
                boundary.min(target)
            } else {
                boundary.max(target)
            };
            time = self.integrate(particles, time, stop, step_size, eps);

            if direction * (target - time) <= eps {
                break;
            }
            if direction * (boundary - self.window.time_at(0)) <= eps {
                // Duplicate tags from clamping at the series end; cannot advance.
                debug_assert!(false, "window stalled at t={}", time);
                warn!("Temporal window stalled at t={:.4}; stopping trace", time);
                break;
            }

            let next = desc.time_of(desc.clamp_index(frame + 3 * offset));
            self.window.rotate(&self.source, next)?;
            frame += offset;
            time = self.window.time_at(0);
        }
        Ok(())
    }

    /// Sub-step from `from` to `to` with at most `|step_size|` per step.
    ///
    /// Returns the time actually reached.
    fn integrate(
        &self,
        particles: &mut ParticleSet,
        from: f64,
        to: f64,
        step_size: f64,
        eps: f64,
    ) -> f64 {
        let direction = step_size.signum();
        let mut time = from;
        while direction * (to - time) > eps {
            let h = direction * step_size.abs().min((to - time).abs());
            self.advect(particles, time, h);
            time += h;
        }
        time
    }

    /// One integration step for every particle still in the domain.
    fn advect(&self, particles: &mut ParticleSet, time: f64, h: f64) {
        let field = &self.window;
        let scheme = self.scheme;
        particles
            .positions
            .par_iter_mut()
            .zip(particles.in_domain.par_iter_mut())
            .for_each(|(position, in_domain)| {
                if !*in_domain {
                    return;
                }
                match scheme.step(field, *position, time, h) {
                    Some(next) => *position = next,
                    None => *in_domain = false,
                }
            });
    }
}
