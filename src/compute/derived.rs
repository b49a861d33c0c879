//! Fields derived from velocity samples: speed, vorticity and the
//! feature flow of moving critical points.

use glam::{DMat3, DVec3};
use rayon::prelude::*;

use super::{ComputeError, Grid};

/// Relative determinant below which the velocity gradient counts as singular.
const SINGULAR_TOLERANCE: f64 = 1e-12;

fn require_vector(velocity: &Grid) -> Result<(), ComputeError> {
    if velocity.components() == 3 {
        Ok(())
    } else {
        Err(ComputeError::NotVectorField(velocity.components()))
    }
}

/// Pointwise speed |u|.
pub fn velocity_magnitude(velocity: &Grid) -> Result<Grid, ComputeError> {
    require_vector(velocity)?;
    let mut output = velocity.with_components(1)?;
    output
        .data_mut()
        .par_iter_mut()
        .enumerate()
        .for_each(|(idx, value)| *value = velocity.vector(idx).length() as f32);
    Ok(output)
}

/// Magnitude of the curl |∇ × u|, from clamped central differences.
pub fn vorticity_magnitude(velocity: &Grid) -> Result<Grid, ComputeError> {
    require_vector(velocity)?;
    let mut output = velocity.with_components(1)?;
    let spacing = velocity.spacing();

    output
        .data_mut()
        .par_iter_mut()
        .enumerate()
        .for_each(|(idx, value)| {
            let [x, y, z] = velocity.coords(idx);
            let stencil = velocity.stencil(x, y, z);
            // d[axis] = du/d(axis); zero along collapsed axes.
            let d = [0, 1, 2].map(|axis| {
                let span = stencil.span[axis];
                if span == 0 {
                    return DVec3::ZERO;
                }
                (velocity.vector(stencil.upper[axis]) - velocity.vector(stencil.lower[axis]))
                    / (span as f64 * spacing[axis])
            });
            let curl = DVec3::new(d[1].z - d[2].y, d[2].x - d[0].z, d[0].y - d[1].x);
            *value = curl.length() as f32;
        });
    Ok(output)
}

/// Feature flow f = -J^-1 du/dt at every node of `current`.
///
/// J is the velocity gradient of `current` (clamped central differences,
/// unit column along collapsed axes) and du/dt is the central difference
/// `(next - previous) / time_span`. f is the velocity at which a critical
/// point of u would have to move to stay critical. Nodes with a singular
/// gradient, and a zero `time_span`, produce zero.
pub fn feature_flow(
    previous: &Grid,
    current: &Grid,
    next: &Grid,
    time_span: f64,
) -> Result<Grid, ComputeError> {
    require_vector(current)?;
    let shape = current.shape();
    for other in [previous, next] {
        if other.shape() != shape {
            return Err(ComputeError::ShapeMismatch {
                expected: Box::new(shape),
                found: Box::new(other.shape()),
            });
        }
    }

    let mut output = current.with_components(3)?;
    let spacing = current.spacing();
    let inv_span = if time_span == 0.0 { 0.0 } else { 1.0 / time_span };

    output
        .data_mut()
        .par_chunks_mut(3)
        .enumerate()
        .for_each(|(idx, cell)| {
            let [x, y, z] = current.coords(idx);
            let stencil = current.stencil(x, y, z);
            let columns = [0, 1, 2].map(|axis| {
                let span = stencil.span[axis];
                if span == 0 {
                    return DVec3::AXES[axis];
                }
                (current.vector(stencil.upper[axis]) - current.vector(stencil.lower[axis]))
                    / (span as f64 * spacing[axis])
            });
            let jacobian = DMat3::from_cols(columns[0], columns[1], columns[2]);
            let scale = columns.iter().map(|c| c.length()).product::<f64>();
            if !(jacobian.determinant().abs() > SINGULAR_TOLERANCE * scale) {
                return;
            }

            let dudt = (next.vector(idx) - previous.vector(idx)) * inv_span;
            let flow = -(jacobian.inverse() * dudt);
            if flow.is_finite() {
                cell[0] = flow.x as f32;
                cell[1] = flow.y as f32;
                cell[2] = flow.z as f32;
            }
        });
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Aabb;

    fn field(f: impl Fn(DVec3) -> DVec3) -> Grid {
        let mut grid = Grid::new(
            Aabb::new(DVec3::splat(-1.0), DVec3::splat(1.0)),
            [5, 6, 4],
            3,
        )
        .unwrap();
        for idx in 0..grid.num_points() {
            let [x, y, z] = grid.coords(idx);
            let p = grid.position(x, y, z);
            grid.set_vector(idx, f(p));
        }
        grid
    }

    #[test]
    fn test_magnitude() {
        let grid = field(|_| DVec3::new(3.0, 4.0, 0.0));
        let speed = velocity_magnitude(&grid).unwrap();
        assert_eq!(speed.components(), 1);
        assert!(speed.data().iter().all(|&v| (v - 5.0).abs() < 1e-6));
    }

    #[test]
    fn test_solid_body_rotation_vorticity() {
        // u = (-w y, w x, 0) has curl (0, 0, 2w) everywhere, boundary included.
        let w = 1.5;
        let grid = field(|p| DVec3::new(-w * p.y, w * p.x, 0.0));
        let vorticity = vorticity_magnitude(&grid).unwrap();
        for &v in vorticity.data() {
            assert!((v as f64 - 2.0 * w).abs() < 1e-5, "{v}");
        }
    }

    #[test]
    fn test_irrotational_field() {
        let grid = field(|p| DVec3::new(p.x, -p.y, 0.0));
        let vorticity = vorticity_magnitude(&grid).unwrap();
        assert!(vorticity.data().iter().all(|&v| v.abs() < 1e-6));
    }

    #[test]
    fn test_collapsed_axis() {
        let mut grid = Grid::new(
            Aabb::new(DVec3::ZERO, DVec3::new(1.0, 1.0, 0.0)),
            [3, 3, 1],
            3,
        )
        .unwrap();
        for idx in 0..grid.num_points() {
            let [x, y, _] = grid.coords(idx);
            let p = grid.position(x, y, 0);
            grid.set_vector(idx, DVec3::new(-p.y, p.x, 0.0));
        }
        let vorticity = vorticity_magnitude(&grid).unwrap();
        assert!(vorticity.data().iter().all(|&v| (v - 2.0).abs() < 1e-6));
    }

    /// Linear field whose critical point sits at `center + drift * t`.
    fn moving_saddle(center: DVec3, drift: DVec3, t: f64) -> Grid {
        let gradient = DMat3::from_cols(
            DVec3::new(1.0, -0.5, 0.0),
            DVec3::new(2.0, 1.0, 0.25),
            DVec3::new(0.0, 0.0, -1.5),
        );
        field(|p| gradient * (p - center - drift * t))
    }

    #[test]
    fn test_feature_flow_tracks_moving_critical_point() {
        let center = DVec3::new(0.1, -0.2, 0.3);
        let drift = DVec3::new(0.5, -0.25, 1.0);
        let previous = moving_saddle(center, drift, 0.5);
        let current = moving_saddle(center, drift, 1.0);
        let next = moving_saddle(center, drift, 1.5);

        let flow = feature_flow(&previous, &current, &next, 1.0).unwrap();
        assert_eq!(flow.components(), 3);
        for idx in 0..flow.num_points() {
            let f = flow.vector(idx);
            assert!((f - drift).length() < 1e-4, "node {idx}: {f}");
        }
    }

    #[test]
    fn test_feature_flow_singular_gradient_is_zero() {
        // u = (x + t, 0, 0) has a rank-one gradient everywhere.
        let at = |t: f64| field(move |p| DVec3::new(p.x + t, 0.0, 0.0));
        let flow = feature_flow(&at(0.0), &at(0.5), &at(1.0), 1.0).unwrap();
        assert!(flow.data().iter().all(|&v| v == 0.0));

        // A zero time span leaves the field zero as well.
        let steady = moving_saddle(DVec3::ZERO, DVec3::X, 0.0);
        let flow = feature_flow(&steady, &steady, &steady, 0.0).unwrap();
        assert!(flow.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_feature_flow_rejects_mismatched_inputs() {
        let current = moving_saddle(DVec3::ZERO, DVec3::X, 0.0);
        let scalar = current.with_components(1).unwrap();
        assert!(matches!(
            feature_flow(&current, &scalar, &current, 1.0),
            Err(ComputeError::NotVectorField(1))
        ));

        let coarse = Grid::new(*current.bounds(), [5, 6, 3], 3).unwrap();
        match feature_flow(&current, &current, &coarse, 1.0) {
            Err(ComputeError::ShapeMismatch { expected, found }) => {
                assert_eq!(expected.dims, [5, 6, 4]);
                assert_eq!(found.dims, [5, 6, 3]);
            }
            other => panic!("expected shape mismatch, got {:?}", other.map(|g| g.dims())),
        }
    }

    #[test]
    fn test_scalar_input_rejected() {
        let grid = Grid::new(Aabb::new(DVec3::ZERO, DVec3::ONE), [2, 2, 2], 1).unwrap();
        assert!(matches!(
            velocity_magnitude(&grid),
            Err(ComputeError::NotVectorField(1))
        ));
    }
}
