//! Header layout and value codec for AmiraMesh uniform lattices.

use std::io::{self, Write};

use glam::DVec3;

use crate::compute::{Aabb, GridError, GridShape};

/// First line of every file.
pub const AMIRA_MAGIC: &str = "# AmiraMesh BINARY-LITTLE-ENDIAN 2.1";

/// Marker preceding the `@1` line and the binary payload.
pub const DATA_SECTION_MARKER: &str = "# Data section follows";

const LATTICE_TAG: &str = "define Lattice";
const BOUNDING_BOX_TAG: &str = "BoundingBox";
const UNIFORM_TAG: &str = "CoordType \"uniform\"";
const SCALAR_TYPE_TAG: &str = "Lattice { float Data }";
const VECTOR_TYPE_TAG: &str = "Lattice { float[";

/// Errors while reading or writing grid files.
#[derive(Debug, thiserror::Error)]
pub enum AmiraError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Missing AmiraMesh binary little-endian header tag")]
    MissingMagic,
    #[error("Lattice definition missing or not positive")]
    InvalidLattice,
    #[error("Only uniform coordinates are supported")]
    NotUniform,
    #[error("Bounding box missing or malformed")]
    InvalidBoundingBox,
    #[error("Bounding box is not ordered (min > max)")]
    UnorderedBoundingBox,
    #[error("Unsupported lattice data type")]
    UnsupportedType,
    #[error("Data section marker not found")]
    MissingDataSection,
    #[error("Truncated data: expected {expected} values, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("File shape {found:?} does not match preallocated grid {expected:?}")]
    ShapeMismatch {
        expected: Box<GridShape>,
        found: Box<GridShape>,
    },
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Parse the ASCII header of a grid file.
pub fn parse_header(text: &str) -> Result<GridShape, AmiraError> {
    if !text.contains(AMIRA_MAGIC) {
        return Err(AmiraError::MissingMagic);
    }

    let lattice: Vec<i64> = numbers_after(text, LATTICE_TAG, 3).ok_or(AmiraError::InvalidLattice)?;
    if lattice.iter().any(|&d| d <= 0) {
        return Err(AmiraError::InvalidLattice);
    }
    let dims = [lattice[0] as usize, lattice[1] as usize, lattice[2] as usize];

    if !text.contains(UNIFORM_TAG) {
        return Err(AmiraError::NotUniform);
    }

    // Stored as xmin xmax ymin ymax zmin zmax.
    let b: Vec<f64> =
        numbers_after(text, BOUNDING_BOX_TAG, 6).ok_or(AmiraError::InvalidBoundingBox)?;
    let bounds = Aabb::new(DVec3::new(b[0], b[2], b[4]), DVec3::new(b[1], b[3], b[5]));
    if !bounds.is_ordered() {
        return Err(AmiraError::UnorderedBoundingBox);
    }

    let components = if text.contains(SCALAR_TYPE_TAG) {
        1
    } else {
        let start = text
            .find(VECTOR_TYPE_TAG)
            .ok_or(AmiraError::UnsupportedType)?
            + VECTOR_TYPE_TAG.len();
        let rest = &text[start..];
        let end = rest.find(']').ok_or(AmiraError::UnsupportedType)?;
        let k: usize = rest[..end]
            .trim()
            .parse()
            .map_err(|_| AmiraError::UnsupportedType)?;
        if k != 1 && k != 3 {
            return Err(AmiraError::UnsupportedType);
        }
        k
    };

    Ok(GridShape {
        bounds,
        dims,
        components,
    })
}

/// Parse `count` whitespace-separated numbers following `tag`.
fn numbers_after<T: std::str::FromStr>(text: &str, tag: &str, count: usize) -> Option<Vec<T>> {
    let start = text.find(tag)? + tag.len();
    let values: Vec<T> = text[start..]
        .split_whitespace()
        .take(count)
        .map(|token| token.trim_end_matches(',').parse().ok())
        .collect::<Option<_>>()?;
    (values.len() == count).then_some(values)
}

/// Write the ASCII header, up to and including the `@1` line.
pub fn write_header<W: Write>(w: &mut W, shape: &GridShape) -> io::Result<()> {
    let [nx, ny, nz] = shape.dims;
    let (min, max) = (shape.bounds.min, shape.bounds.max);
    let type_name = if shape.components == 1 {
        "float".to_string()
    } else {
        format!("float[{}]", shape.components)
    };

    writeln!(w, "{}\n\n", AMIRA_MAGIC)?;
    writeln!(w, "{} {} {} {}\n", LATTICE_TAG, nx, ny, nz)?;
    writeln!(w, "Parameters {{")?;
    writeln!(
        w,
        "Content \"{}x{}x{} {}, uniform coordinates\",",
        nx, ny, nz, type_name
    )?;
    writeln!(
        w,
        "\t{} {} {} {} {} {} {},",
        BOUNDING_BOX_TAG, min.x, max.x, min.y, max.y, min.z, max.z
    )?;
    writeln!(w, "\t{}", UNIFORM_TAG)?;
    writeln!(w, "}}\n")?;
    writeln!(w, "Lattice {{ {} Data }} @1\n", type_name)?;
    writeln!(w, "{}", DATA_SECTION_MARKER)?;
    writeln!(w, "@1")?;
    Ok(())
}

/// Encode f32 values as little-endian bytes.
pub fn encode_values(data: &[f32]) -> Vec<u8> {
    let mut bytes = vec![0u8; data.len() * 4];
    for (chunk, &v) in bytes.chunks_exact_mut(4).zip(data.iter()) {
        chunk.copy_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode little-endian bytes into f32 values.
pub fn decode_values(bytes: &[u8], output: &mut [f32]) -> Result<(), AmiraError> {
    if bytes.len() != output.len() * 4 {
        return Err(AmiraError::Truncated {
            expected: output.len(),
            found: bytes.len() / 4,
        });
    }
    for (v, b) in output.iter_mut().zip(bytes.chunks_exact(4)) {
        *v = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
    }
    Ok(())
}
