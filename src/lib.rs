//! Flow Transport - Lagrangian analysis of time-dependent 3D velocity fields.
//!
//! This crate traces particles through velocity time series stored as
//! uniform grids and derives transport fields from the resulting flow
//! maps: finite-time Lyapunov exponents (FTLE), line integral
//! convolution (LIC), velocity magnitude, vorticity and the feature
//! flow of moving critical points.
//!
//! # Architecture
//!
//! - `schema`: Serde configuration types (data set layout, job parameters)
//! - `compute`: Grids, trilinear sampling, the unsteady tracer and the field engines
//! - `amira`: The AmiraMesh binary grid format used for every input and output
//! - `pipeline`: File-to-file batch drivers used by the CLI
//!
//! Only three samples of a velocity series are resident at a time; the
//! tracer streams the rest from disk as particles advance.
//!
//! # Example
//!
//! ```rust,no_run
//! use flow_transport::{
//!     compute::{UnsteadyTracer, compute_ftle, double_gyre},
//!     schema::{FtleConfig, TimeSeriesDescription},
//! };
//!
//! // Synthetic double gyre sampled every 0.1 time units
//! let source = double_gyre([201, 101, 2], 0.01);
//! let desc = TimeSeriesDescription::new(0.1, 0.0, 201);
//! let mut tracer = UnsteadyTracer::new(source, desc)?;
//!
//! let config = FtleConfig {
//!     resolution: [400, 200, 2],
//!     step_size: 0.01,
//!     start_times: vec![0.0],
//!     duration: 10.0,
//!     ..FtleConfig::default()
//! };
//! let ftle = compute_ftle(&mut tracer, &config, 0.0)?;
//! println!("FTLE nodes: {}", ftle.num_points());
//! # Ok::<(), flow_transport::compute::ComputeError>(())
//! ```

pub mod amira;
pub mod compute;
pub mod pipeline;
pub mod schema;

// Re-export commonly used types
pub use compute::{ComputeError, Grid, ParticleSet, UnsteadyTracer};
pub use schema::{DatasetConfig, JobConfig, TimeSeriesDescription};
