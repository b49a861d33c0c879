//! Errors raised by the tracer and the field engines.

use crate::amira::AmiraError;

use super::{GridError, GridShape};

#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    /// A time sample could not be loaded; the current step must be aborted.
    #[error("Failed to load frame at t={time:.2}: {source}")]
    FrameLoad {
        time: f64,
        #[source]
        source: AmiraError,
    },
    #[error("Velocity field must have 3 components, found {0}")]
    NotVectorField(usize),
    #[error("Seed resolution {0:?} must be non-zero on every axis")]
    InvalidResolution([usize; 3]),
    #[error("Grids do not share a lattice: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Box<GridShape>,
        found: Box<GridShape>,
    },
    #[error(transparent)]
    Grid(#[from] GridError),
    /// Grid file errors outside a frame load (headers, outputs).
    #[error(transparent)]
    Amira(#[from] AmiraError),
}
