//! Finite-time Lyapunov exponents from the flow map of a seed lattice.
//!
//! FTLE(x) = ln(sqrt(lambda_max(C))) / T, where C = J^T J is the right
//! Cauchy-Green tensor of the flow-map Jacobian J, estimated with clamped
//! central differences in seed index space.

use glam::{DMat3, DVec3};
use log::info;
use rayon::prelude::*;

use crate::schema::FtleConfig;

use super::{
    Aabb, CentralStencil, ComputeError, FrameSource, Grid, GridError, ParticleSet, UnsteadyTracer,
};

/// Regular seed lattice spanning `bounds` corner to corner, x fastest.
pub fn seed_lattice(bounds: &Aabb, resolution: [usize; 3]) -> Result<Grid, ComputeError> {
    if resolution.contains(&0) {
        return Err(ComputeError::InvalidResolution(resolution));
    }
    Ok(Grid::new(*bounds, resolution, 1)?)
}

/// Trace a seed lattice over the tracer's domain and return the FTLE field.
///
/// The sign of `config.step_size` selects forward (repelling) or backward
/// (attracting) FTLE.
pub fn compute_ftle<S: FrameSource>(
    tracer: &mut UnsteadyTracer<S>,
    config: &FtleConfig,
    start_time: f64,
) -> Result<Grid, ComputeError> {
    let mut output = seed_lattice(tracer.bounds(), config.resolution)?;
    let positions: Vec<DVec3> = (0..output.num_points())
        .into_par_iter()
        .map(|idx| {
            let [x, y, z] = output.coords(idx);
            output.position(x, y, z)
        })
        .collect();
    let mut particles = ParticleSet::new(positions);

    tracer.set_scheme(config.scheme);
    tracer.flowmap(&mut particles, config.step_size, start_time, config.duration)?;
    ftle_from_flowmap(&mut output, &particles, config.duration)?;

    info!(
        "FTLE t={:.2}, T={:.2}: {}x{}x{} seeds, {} still in domain",
        start_time,
        config.duration,
        config.resolution[0],
        config.resolution[1],
        config.resolution[2],
        particles.active_count()
    );
    Ok(output)
}

/// Fill `output` with FTLE values from advected seed positions.
///
/// `particles` holds the flow map of the nodes of `output`, in node order.
/// Seeds with any stencil neighbor outside the domain get 0. `output`
/// must be a scalar grid with one particle (and one flag) per node.
pub fn ftle_from_flowmap(
    output: &mut Grid,
    particles: &ParticleSet,
    duration: f64,
) -> Result<(), GridError> {
    let expected = output.num_points();
    for found in [
        particles.positions.len(),
        particles.in_domain.len(),
        output.data().len(),
    ] {
        if found != expected {
            return Err(GridError::DataLength { expected, found });
        }
    }
    let dims = output.dims();
    let spacing = output.spacing();

    let values: Vec<f32> = (0..output.num_points())
        .into_par_iter()
        .map(|idx| {
            let [x, y, z] = output.coords(idx);
            let stencil = CentralStencil::new(dims, [x, y, z]);
            if stencil
                .neighbors()
                .iter()
                .any(|&n| !particles.in_domain[n])
            {
                return 0.0;
            }
            let jacobian = flowmap_jacobian(&stencil, &particles.positions, spacing);
            let cauchy_green = jacobian.transpose() * jacobian;
            ftle_value(&cauchy_green, duration) as f32
        })
        .collect();

    output.data_mut().copy_from_slice(&values);
    Ok(())
}

/// Flow-map Jacobian; column `i` is the derivative along seed axis `i`.
fn flowmap_jacobian(stencil: &CentralStencil, positions: &[DVec3], spacing: DVec3) -> DMat3 {
    let column = |axis: usize| {
        let span = stencil.span[axis];
        if span == 0 {
            // Collapsed axis: no stretching measured along it.
            return DVec3::AXES[axis];
        }
        (positions[stencil.upper[axis]] - positions[stencil.lower[axis]])
            / (span as f64 * spacing[axis])
    };
    DMat3::from_cols(column(0), column(1), column(2))
}

/// FTLE from a Cauchy-Green tensor.
///
/// Slightly negative eigenvalues from round-off are clamped to zero, and
/// non-finite results (zero eigenvalue or zero duration) map to 0.
pub fn ftle_value(cauchy_green: &DMat3, duration: f64) -> f64 {
    let lambda_max = max_symmetric_eigenvalue(cauchy_green).max(0.0);
    let value = lambda_max.sqrt().ln() / duration.abs();
    if value.is_finite() { value } else { 0.0 }
}

/// Largest eigenvalue of a symmetric 3x3 matrix (closed-form trigonometric solution).
pub fn max_symmetric_eigenvalue(m: &DMat3) -> f64 {
    let (a00, a11, a22) = (m.x_axis.x, m.y_axis.y, m.z_axis.z);
    let (a01, a02, a12) = (m.y_axis.x, m.z_axis.x, m.z_axis.y);

    let off_diagonal = a01 * a01 + a02 * a02 + a12 * a12;
    if off_diagonal == 0.0 {
        return a00.max(a11).max(a22);
    }

    let q = (a00 + a11 + a22) / 3.0;
    let p2 = (a00 - q).powi(2) + (a11 - q).powi(2) + (a22 - q).powi(2) + 2.0 * off_diagonal;
    let p = (p2 / 6.0).sqrt();
    let b = (*m - DMat3::IDENTITY * q) * (1.0 / p);
    let r = (b.determinant() / 2.0).clamp(-1.0, 1.0);
    let phi = r.acos() / 3.0;
    q + 2.0 * p * phi.cos()
}
