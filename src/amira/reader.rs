//! Reading grid files.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek};
use std::path::Path;

use super::format::{AmiraError, DATA_SECTION_MARKER, decode_values, parse_header};
use crate::compute::{Grid, GridShape};

/// Headers larger than this are treated as malformed.
const MAX_HEADER_BYTES: usize = 64 * 1024;

/// Read only the header of a grid file.
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<GridShape, AmiraError> {
    let mut reader = BufReader::new(File::open(path)?);
    let (text, _) = read_header_text(&mut reader)?;
    parse_header(&text)
}

/// Read a complete grid file into a newly allocated grid.
///
/// The payload size declared by the header is checked against the file
/// length before anything is allocated.
pub fn read_grid<P: AsRef<Path>>(path: P) -> Result<Grid, AmiraError> {
    let (mut reader, file_len) = open_grid(path)?;
    let shape = read_to_data_section(&mut reader)?;
    check_payload(&mut reader, file_len, &shape)?;
    let mut grid = Grid::zeroed(&shape)?;
    read_values(&mut reader, grid.data_mut())?;
    Ok(grid)
}

/// Read a grid file into an existing grid of identical lattice and component count.
///
/// The grid buffer is reused; on error its contents are unspecified and
/// must not be used.
pub fn read_grid_into<P: AsRef<Path>>(path: P, grid: &mut Grid) -> Result<(), AmiraError> {
    let (mut reader, file_len) = open_grid(path)?;
    let shape = read_to_data_section(&mut reader)?;
    let expected = grid.shape();
    if shape.dims != expected.dims || shape.components != expected.components {
        return Err(AmiraError::ShapeMismatch {
            expected: Box::new(expected),
            found: Box::new(shape),
        });
    }
    check_payload(&mut reader, file_len, &shape)?;
    read_values(&mut reader, grid.data_mut())
}

fn open_grid<P: AsRef<Path>>(path: P) -> Result<(BufReader<File>, u64), AmiraError> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    Ok((BufReader::new(file), file_len))
}

/// Fail with `Truncated` unless the rest of the file holds the whole payload.
fn check_payload<R: Seek>(
    reader: &mut R,
    file_len: u64,
    shape: &GridShape,
) -> Result<(), AmiraError> {
    let available = file_len.saturating_sub(reader.stream_position()?);
    let values = shape
        .dims
        .iter()
        .try_fold(shape.components as u64, |acc, &d| acc.checked_mul(d as u64));
    match values {
        Some(n) if n.checked_mul(4).is_some_and(|bytes| bytes <= available) => Ok(()),
        _ => Err(AmiraError::Truncated {
            expected: values
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(usize::MAX),
            found: usize::try_from(available / 4).unwrap_or(usize::MAX),
        }),
    }
}

/// Parse the header and position the reader at the first data byte.
fn read_to_data_section<R: BufRead>(reader: &mut R) -> Result<GridShape, AmiraError> {
    let (text, has_data) = read_header_text(reader)?;
    let shape = parse_header(&text)?;
    if !has_data {
        return Err(AmiraError::MissingDataSection);
    }
    // The marker line is followed by a single "@1" line.
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;
    if !line.starts_with(b"@1") {
        return Err(AmiraError::MissingDataSection);
    }
    Ok(shape)
}

/// Collect header lines up to the data section marker.
///
/// Returns the header text and whether the marker was found.
fn read_header_text<R: BufRead>(reader: &mut R) -> Result<(String, bool), AmiraError> {
    let mut text = String::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok((text, false));
        }
        let decoded = String::from_utf8_lossy(&line);
        if decoded.starts_with(DATA_SECTION_MARKER) {
            return Ok((text, true));
        }
        text.push_str(&decoded);
        if text.len() > MAX_HEADER_BYTES {
            return Ok((text, false));
        }
    }
}

fn read_values<R: Read>(reader: &mut R, output: &mut [f32]) -> Result<(), AmiraError> {
    let expected_bytes = output.len() * 4;
    let mut bytes = Vec::with_capacity(expected_bytes);
    reader.take(expected_bytes as u64).read_to_end(&mut bytes)?;
    if bytes.len() != expected_bytes {
        return Err(AmiraError::Truncated {
            expected: output.len(),
            found: bytes.len() / 4,
        });
    }
    decode_values(&bytes, output)
}
