//! Line integral convolution of a noise texture along a steady velocity field.

use glam::DVec3;
use log::info;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Uniform;
use rayon::prelude::*;

use crate::schema::LicConfig;

use super::{ComputeError, Grid, GridError, SteadyField, VelocityField, sample_scalar};

/// Scalar white noise in `[0, 1)` on the geometry of `like`.
///
/// The same seed always produces the same texture.
pub fn white_noise(like: &Grid, seed: u64) -> Result<Grid, GridError> {
    let mut noise = like.with_components(1)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = Uniform::new(0.0f32, 1.0);
    for value in noise.data_mut() {
        *value = rng.sample(dist);
    }
    Ok(noise)
}

/// Convolve `noise` along the streamlines of `velocity` through every node.
///
/// Each node walks `num_advection_steps` forward and backward. Every
/// successful step adds the noise at the new position weighted by the
/// distance travelled; the node value is the weighted mean, or 0 when no
/// step succeeded.
pub fn compute_lic(
    velocity: &Grid,
    noise: &Grid,
    config: &LicConfig,
) -> Result<Grid, ComputeError> {
    if velocity.components() != 3 {
        return Err(ComputeError::NotVectorField(velocity.components()));
    }
    let mut output = velocity.with_components(1)?;
    if noise.dims() != output.dims() || noise.components() != 1 {
        return Err(GridError::DataLength {
            expected: output.num_points(),
            found: noise.data().len(),
        }
        .into());
    }

    let field = SteadyField::new(velocity);
    let values: Vec<f32> = (0..output.num_points())
        .into_par_iter()
        .map(|idx| {
            let [x, y, z] = output.coords(idx);
            let start = output.position(x, y, z);
            let (fw_sum, fw_weight) = convolve(&field, noise, start, config.step_size, config);
            let (bw_sum, bw_weight) = convolve(&field, noise, start, -config.step_size, config);
            let weight = fw_weight + bw_weight;
            if weight > 0.0 {
                ((fw_sum + bw_sum) / weight) as f32
            } else {
                0.0
            }
        })
        .collect();
    output.data_mut().copy_from_slice(&values);

    info!(
        "LIC {}x{}x{}: {} steps each way, h={}",
        output.dims()[0],
        output.dims()[1],
        output.dims()[2],
        config.num_advection_steps,
        config.step_size
    );
    Ok(output)
}

/// Weighted noise sum and total weight along one direction of a streamline.
fn convolve<F: VelocityField>(
    field: &F,
    noise: &Grid,
    start: DVec3,
    h: f64,
    config: &LicConfig,
) -> (f64, f64) {
    let scheme = config.scheme;
    let mut position = start;
    let mut sum = 0.0;
    let mut weight = 0.0;
    for _ in 0..config.num_advection_steps {
        let Some(next) = scheme.step(field, position, 0.0, h) else {
            break;
        };
        let w = (next - position).length();
        sum += w * sample_scalar(noise, next);
        weight += w;
        position = next;
    }
    (sum, weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Aabb;
    use crate::schema::IntegrationScheme;

    fn velocity_grid(v: DVec3) -> Grid {
        let mut grid = Grid::new(
            Aabb::new(DVec3::ZERO, DVec3::new(2.0, 1.0, 1.0)),
            [9, 5, 3],
            3,
        )
        .unwrap();
        for idx in 0..grid.num_points() {
            grid.set_vector(idx, v);
        }
        grid
    }

    fn config() -> LicConfig {
        LicConfig {
            step_size: 0.05,
            num_advection_steps: 10,
            ..LicConfig::default()
        }
    }

    #[test]
    fn test_white_noise_reproducible() {
        let grid = velocity_grid(DVec3::ZERO);
        let a = white_noise(&grid, 7).unwrap();
        let b = white_noise(&grid, 7).unwrap();
        let c = white_noise(&grid, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.components(), 1);
        assert!(a.data().iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn test_zero_velocity_gives_zero() {
        let grid = velocity_grid(DVec3::ZERO);
        let noise = white_noise(&grid, 1).unwrap();
        let lic = compute_lic(&grid, &noise, &config()).unwrap();
        assert!(lic.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_constant_noise_is_preserved() {
        let grid = velocity_grid(DVec3::new(1.0, 0.5, 0.0));
        let mut noise = grid.with_components(1).unwrap();
        noise.data_mut().fill(0.25);
        for scheme in [IntegrationScheme::Euler, IntegrationScheme::RungeKutta4] {
            let config = LicConfig {
                scheme,
                ..config()
            };
            let lic = compute_lic(&grid, &noise, &config).unwrap();
            for &v in lic.data() {
                assert!((v - 0.25).abs() < 1e-6, "{scheme:?}: {v}");
            }
        }
    }

    #[test]
    fn test_lic_smooths_noise() {
        let grid = velocity_grid(DVec3::X);
        let noise = white_noise(&grid, 3).unwrap();
        let lic = compute_lic(&grid, &noise, &config()).unwrap();

        let variance = |g: &Grid| {
            let n = g.data().len() as f64;
            let mean = g.data().iter().map(|&v| v as f64).sum::<f64>() / n;
            g.data().iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n
        };
        assert!(variance(&lic) < variance(&noise));
        assert!(lic.data().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_rejects_scalar_velocity() {
        let grid = velocity_grid(DVec3::X);
        let noise = white_noise(&grid, 0).unwrap();
        assert!(matches!(
            compute_lic(&noise, &noise, &config()),
            Err(ComputeError::NotVectorField(1))
        ));
    }
}
