//! Compute module - Particle tracing and field analysis on uniform grids.

mod analytic;
mod derived;
mod error;
mod ftle;
mod grid;
mod integrator;
mod lic;
mod sampling;
mod tracer;
mod window;

pub use analytic::*;
pub use derived::*;
pub use error::*;
pub use ftle::*;
pub use grid::*;
pub use integrator::*;
pub use lic::*;
pub use sampling::*;
pub use tracer::*;
pub use window::*;
