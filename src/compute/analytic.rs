//! Frame source evaluating an analytic velocity function on the lattice.

use std::f64::consts::PI;

use glam::DVec3;
use rayon::prelude::*;

use super::{Aabb, ComputeError, FrameSource, Grid, GridError, GridShape};

/// Synthetic time series: `velocity(position, time)` sampled at every node.
pub struct AnalyticSeries<F> {
    shape: GridShape,
    velocity: F,
}

impl<F> AnalyticSeries<F>
where
    F: Fn(DVec3, f64) -> DVec3 + Sync,
{
    pub fn new(bounds: Aabb, dims: [usize; 3], velocity: F) -> Self {
        Self {
            shape: GridShape {
                bounds,
                dims,
                components: 3,
            },
            velocity,
        }
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Allocate and fill the frame at `time`.
    pub fn frame(&self, time: f64) -> Result<Grid, ComputeError> {
        let mut grid = Grid::zeroed(&self.shape)?;
        self.fill(time, &mut grid);
        Ok(grid)
    }

    fn fill(&self, time: f64, grid: &mut Grid) {
        let origin = grid.origin();
        let spacing = grid.spacing();
        let [nx, ny, _] = grid.dims();
        grid.data_mut()
            .par_chunks_mut(3)
            .enumerate()
            .for_each(|(idx, cell)| {
                let node = DVec3::new(
                    (idx % nx) as f64,
                    ((idx / nx) % ny) as f64,
                    (idx / (nx * ny)) as f64,
                );
                let v = (self.velocity)(origin + node * spacing, time);
                cell[0] = v.x as f32;
                cell[1] = v.y as f32;
                cell[2] = v.z as f32;
            });
    }
}

impl<F> FrameSource for AnalyticSeries<F>
where
    F: Fn(DVec3, f64) -> DVec3 + Sync,
{
    fn frame_shape(&self) -> Result<GridShape, ComputeError> {
        Ok(self.shape)
    }

    fn load(&self, time: f64, frame: &mut Grid) -> Result<(), ComputeError> {
        if frame.data().len() != self.shape.num_values() {
            return Err(GridError::DataLength {
                expected: self.shape.num_values(),
                found: frame.data().len(),
            }
            .into());
        }
        self.fill(time, frame);
        Ok(())
    }
}

/// The periodically forced double gyre on `[0, 2] x [0, 1] x [0, depth]`.
///
/// Planar flow (w = 0) with the usual parameters A = 0.1, eps = 0.25,
/// omega = 2 pi / 10.
pub fn double_gyre(
    dims: [usize; 3],
    depth: f64,
) -> AnalyticSeries<impl Fn(DVec3, f64) -> DVec3 + Sync> {
    const A: f64 = 0.1;
    const EPS: f64 = 0.25;
    let omega = 2.0 * PI / 10.0;
    AnalyticSeries::new(
        Aabb::new(DVec3::ZERO, DVec3::new(2.0, 1.0, depth)),
        dims,
        move |p, t| {
            let a = EPS * (omega * t).sin();
            let b = 1.0 - 2.0 * a;
            let f = a * p.x * p.x + b * p.x;
            let df = 2.0 * a * p.x + b;
            DVec3::new(
                -PI * A * (PI * f).sin() * (PI * p.y).cos(),
                PI * A * (PI * f).cos() * (PI * p.y).sin() * df,
                0.0,
            )
        },
    )
}
