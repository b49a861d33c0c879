//! Particle integration step shared by the unsteady tracer and LIC.

use glam::DVec3;

use crate::schema::IntegrationScheme;

use super::{Aabb, Grid, sample_vector};

/// A velocity field that can be sampled at a position and physical time.
///
/// `None` means the sample position lies outside the spatial domain; the
/// particle that requested it leaves the domain for good.
pub trait VelocityField: Sync {
    fn velocity(&self, position: DVec3, time: f64) -> Option<DVec3>;
}

/// A single time-independent vector grid.
pub struct SteadyField<'a> {
    grid: &'a Grid,
    bounds: Aabb,
}

impl<'a> SteadyField<'a> {
    pub fn new(grid: &'a Grid) -> Self {
        Self {
            grid,
            bounds: *grid.bounds(),
        }
    }
}

impl VelocityField for SteadyField<'_> {
    #[inline]
    fn velocity(&self, position: DVec3, _time: f64) -> Option<DVec3> {
        if !self.bounds.contains(position) {
            return None;
        }
        Some(sample_vector(self.grid, position))
    }
}

impl IntegrationScheme {
    /// Advance `position` from `time` by the signed step `h`.
    ///
    /// Returns `None` as soon as any velocity sample falls outside the domain.
    #[inline]
    pub fn step<F: VelocityField + ?Sized>(
        self,
        field: &F,
        position: DVec3,
        time: f64,
        h: f64,
    ) -> Option<DVec3> {
        let k1 = field.velocity(position, time)?;
        match self {
            IntegrationScheme::Euler => Some(position + h * k1),
            IntegrationScheme::RungeKutta4 => {
                let half = 0.5 * h;
                let k2 = field.velocity(position + half * k1, time + half)?;
                let k3 = field.velocity(position + half * k2, time + half)?;
                let k4 = field.velocity(position + h * k3, time + h)?;
                Some(position + h * (k1 + 2.0 * k2 + 2.0 * k3 + k4) / 6.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Solid-body rotation about the z axis, defined everywhere.
    struct Rotation;

    impl VelocityField for Rotation {
        fn velocity(&self, p: DVec3, _time: f64) -> Option<DVec3> {
            Some(DVec3::new(-p.y, p.x, 0.0))
        }
    }

    /// Velocity equal to time along x, inside the unit cube only.
    struct Accelerating;

    impl VelocityField for Accelerating {
        fn velocity(&self, p: DVec3, time: f64) -> Option<DVec3> {
            Aabb::new(DVec3::ZERO, DVec3::ONE)
                .contains(p)
                .then_some(DVec3::new(time, 0.0, 0.0))
        }
    }

    #[test]
    fn test_euler_step() {
        let p = IntegrationScheme::Euler
            .step(&Rotation, DVec3::new(1.0, 0.0, 0.0), 0.0, 0.1)
            .unwrap();
        assert!((p - DVec3::new(1.0, 0.1, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_rk4_more_accurate_than_euler() {
        let steps = 100;
        let h = std::f64::consts::FRAC_PI_2 / steps as f64;
        let exact = DVec3::new(0.0, 1.0, 0.0);
        let mut euler = DVec3::X;
        let mut rk4 = DVec3::X;
        for i in 0..steps {
            let t = i as f64 * h;
            euler = IntegrationScheme::Euler.step(&Rotation, euler, t, h).unwrap();
            rk4 = IntegrationScheme::RungeKutta4
                .step(&Rotation, rk4, t, h)
                .unwrap();
        }
        assert!((rk4 - exact).length() < 1e-8);
        assert!((euler - exact).length() > 1e-3);
    }

    #[test]
    fn test_rk4_uses_intermediate_times() {
        // dx/dt = t integrates exactly to t^2 / 2 with RK4.
        let p = IntegrationScheme::RungeKutta4
            .step(&Accelerating, DVec3::new(0.0, 0.5, 0.5), 0.0, 0.5)
            .unwrap();
        assert!((p.x - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_step_outside_domain() {
        let outside = DVec3::new(2.0, 0.5, 0.5);
        for scheme in [IntegrationScheme::Euler, IntegrationScheme::RungeKutta4] {
            assert!(scheme.step(&Accelerating, outside, 0.0, 0.1).is_none());
        }
    }

    #[test]
    fn test_steady_field_bounds() {
        let bounds = Aabb::new(DVec3::ZERO, DVec3::ONE);
        let mut grid = Grid::new(bounds, [2, 2, 2], 3).unwrap();
        for idx in 0..grid.num_points() {
            grid.set_vector(idx, DVec3::X);
        }
        let field = SteadyField::new(&grid);
        assert_eq!(field.velocity(DVec3::splat(0.5), 3.0), Some(DVec3::X));
        assert_eq!(field.velocity(DVec3::splat(1.5), 0.0), None);
    }
}
