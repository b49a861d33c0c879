//! Writing grid files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::format::{AmiraError, encode_values, write_header};
use crate::compute::Grid;

/// Write a scalar or vector grid, creating or truncating `path`.
pub fn write_grid<P: AsRef<Path>>(path: P, grid: &Grid) -> Result<(), AmiraError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_grid_to(&mut writer, grid)?;
    writer.flush()?;
    Ok(())
}

/// Write a grid to any output stream.
pub fn write_grid_to<W: Write>(w: &mut W, grid: &Grid) -> Result<(), AmiraError> {
    write_header(w, &grid.shape())?;
    // Encode in slabs to bound the temporary byte buffer.
    const SLAB_VALUES: usize = 1 << 20;
    for slab in grid.data().chunks(SLAB_VALUES) {
        w.write_all(&encode_values(slab))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amira::parse_header;
    use crate::compute::Aabb;
    use glam::DVec3;

    #[test]
    fn test_written_layout() {
        let bounds = Aabb::new(DVec3::ZERO, DVec3::ONE);
        let grid = Grid::from_data(bounds, [2, 1, 1], 1, vec![1.0, 2.0]).unwrap();
        let mut buf = Vec::new();
        write_grid_to(&mut buf, &grid).unwrap();

        let payload = &buf[buf.len() - 8..];
        assert_eq!(&payload[..4], &1.0f32.to_le_bytes());
        assert_eq!(&payload[4..], &2.0f32.to_le_bytes());

        let header = String::from_utf8_lossy(&buf[..buf.len() - 8]);
        assert!(header.ends_with("@1\n"));
        assert_eq!(parse_header(&header).unwrap(), grid.shape());
    }
}
