//! Trilinear interpolation on uniform grids.
//!
//! Positions outside the grid are not an error: corner indices are clamped
//! to the lattice, so samples beyond the boundary repeat the edge values.

use glam::DVec3;

use super::Grid;

/// The eight corner indices and blend weights for one sample position.
struct Stencil {
    corners: [usize; 8],
    weights: [f64; 8],
}

impl Stencil {
    #[inline]
    fn new(grid: &Grid, position: DVec3) -> Self {
        let dims = grid.dims();
        let relative = (position - grid.origin()) / grid.spacing();
        let base = relative.floor();
        // Fractional weights come from the unclamped base index.
        let frac = relative - base;

        let mut i0 = [0usize; 3];
        let mut i1 = [0usize; 3];
        for axis in 0..3 {
            let last = (dims[axis] - 1) as f64;
            i0[axis] = base[axis].clamp(0.0, last) as usize;
            i1[axis] = (base[axis] + 1.0).clamp(0.0, last) as usize;
        }

        let flat = |x: usize, y: usize, z: usize| (z * dims[1] + y) * dims[0] + x;
        let (fx, fy, fz) = (frac.x, frac.y, frac.z);

        Self {
            corners: [
                flat(i0[0], i0[1], i0[2]),
                flat(i1[0], i0[1], i0[2]),
                flat(i0[0], i1[1], i0[2]),
                flat(i1[0], i1[1], i0[2]),
                flat(i0[0], i0[1], i1[2]),
                flat(i1[0], i0[1], i1[2]),
                flat(i0[0], i1[1], i1[2]),
                flat(i1[0], i1[1], i1[2]),
            ],
            weights: [
                (1.0 - fx) * (1.0 - fy) * (1.0 - fz),
                fx * (1.0 - fy) * (1.0 - fz),
                (1.0 - fx) * fy * (1.0 - fz),
                fx * fy * (1.0 - fz),
                (1.0 - fx) * (1.0 - fy) * fz,
                fx * (1.0 - fy) * fz,
                (1.0 - fx) * fy * fz,
                fx * fy * fz,
            ],
        }
    }
}

/// Trilinearly sample the first component of `grid` at `position`.
#[inline]
pub fn sample_scalar(grid: &Grid, position: DVec3) -> f64 {
    let stencil = Stencil::new(grid, position);
    stencil
        .corners
        .iter()
        .zip(stencil.weights.iter())
        .map(|(&idx, &w)| w * grid.scalar(idx) as f64)
        .sum()
}

/// Trilinearly sample a 3-component `grid` at `position`.
#[inline]
pub fn sample_vector(grid: &Grid, position: DVec3) -> DVec3 {
    debug_assert_eq!(grid.components(), 3);
    let stencil = Stencil::new(grid, position);
    stencil
        .corners
        .iter()
        .zip(stencil.weights.iter())
        .fold(DVec3::ZERO, |acc, (&idx, &w)| acc + w * grid.vector(idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Aabb;
    use proptest::prelude::*;

    fn ramp_grid() -> Grid {
        // value = x + 10 y + 100 z on a 3x3x3 lattice over [0,2]^3
        let bounds = Aabb::new(DVec3::ZERO, DVec3::splat(2.0));
        let mut grid = Grid::new(bounds, [3, 3, 3], 1).unwrap();
        for idx in 0..grid.num_points() {
            let [x, y, z] = grid.coords(idx);
            grid.set_scalar(idx, (x + 10 * y + 100 * z) as f32);
        }
        grid
    }

    fn vector_grid() -> Grid {
        let bounds = Aabb::new(DVec3::splat(-1.0), DVec3::splat(1.0));
        let mut grid = Grid::new(bounds, [4, 3, 2], 3).unwrap();
        for idx in 0..grid.num_points() {
            let p = grid.position(grid.coords(idx)[0], grid.coords(idx)[1], grid.coords(idx)[2]);
            grid.set_vector(idx, DVec3::new(p.y, -p.x, 2.0 * p.z + 0.5));
        }
        grid
    }

    #[test]
    fn test_scalar_exact_at_nodes() {
        let grid = ramp_grid();
        for idx in 0..grid.num_points() {
            let [x, y, z] = grid.coords(idx);
            let value = sample_scalar(&grid, grid.position(x, y, z));
            assert_eq!(value, grid.scalar(idx) as f64, "node ({x}, {y}, {z})");
        }
    }

    #[test]
    fn test_vector_exact_at_nodes() {
        let grid = vector_grid();
        for idx in 0..grid.num_points() {
            let [x, y, z] = grid.coords(idx);
            let value = sample_vector(&grid, grid.position(x, y, z));
            assert!(
                (value - grid.vector(idx)).length() < 1e-9,
                "node ({x}, {y}, {z}): {value} vs {}",
                grid.vector(idx)
            );
        }
    }

    #[test]
    fn test_scalar_linear_between_nodes() {
        let grid = ramp_grid();
        // Trilinear interpolation reproduces linear functions exactly.
        let value = sample_scalar(&grid, DVec3::new(0.5, 1.25, 1.5));
        assert!((value - (0.5 + 12.5 + 150.0)).abs() < 1e-9);
    }

    #[test]
    fn test_sampling_clamps_outside() {
        let grid = ramp_grid();
        let below = sample_scalar(&grid, DVec3::new(-5.0, 0.0, 0.0));
        assert_eq!(below, 0.0);
        let above = sample_scalar(&grid, DVec3::new(2.0, 2.0, 7.0));
        assert_eq!(above, 222.0);
    }

    proptest! {
        #[test]
        fn test_sample_within_corner_range(
            x in 0.0f64..2.0,
            y in 0.0f64..2.0,
            z in 0.0f64..2.0,
        ) {
            let grid = ramp_grid();
            let value = sample_scalar(&grid, DVec3::new(x, y, z));
            prop_assert!(value >= -1e-9 && value <= 222.0 + 1e-9);
            let expected = x + 10.0 * y + 100.0 * z;
            prop_assert!((value - expected).abs() < 1e-6);
        }
    }
}
