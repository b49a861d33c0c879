//! Velocity time series stored as one AmiraMesh file per sample.

use log::debug;

use super::{read_grid_into, read_header};
use crate::compute::{ComputeError, FrameSource, Grid, GridShape};
use crate::schema::DatasetConfig;

/// Frame source reading `<prefix>-<t>.am` files from the data set directory.
#[derive(Debug, Clone)]
pub struct AmiraSeries {
    dataset: DatasetConfig,
}

impl AmiraSeries {
    pub fn new(dataset: DatasetConfig) -> Self {
        Self { dataset }
    }

    pub fn dataset(&self) -> &DatasetConfig {
        &self.dataset
    }
}

impl FrameSource for AmiraSeries {
    /// Shape of the first sample; all samples must share it.
    fn frame_shape(&self) -> Result<GridShape, ComputeError> {
        let time = self.dataset.time_series.start_time;
        read_header(self.dataset.velocity_path(time))
            .map_err(|source| ComputeError::FrameLoad { time, source })
    }

    fn load(&self, time: f64, frame: &mut Grid) -> Result<(), ComputeError> {
        let path = self.dataset.velocity_path(time);
        debug!("Reading {}", path.display());
        read_grid_into(&path, frame).map_err(|source| ComputeError::FrameLoad { time, source })
    }
}
