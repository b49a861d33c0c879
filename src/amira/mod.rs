//! AmiraMesh grid files, the exchange format for all fields.
//!
//! # File Format
//!
//! ```text
//! # AmiraMesh BINARY-LITTLE-ENDIAN 2.1
//!
//! define Lattice <nx> <ny> <nz>
//!
//! Parameters {
//! Content "<nx>x<ny>x<nz> float[3], uniform coordinates",
//!     BoundingBox <xmin> <xmax> <ymin> <ymax> <zmin> <zmax>,
//!     CoordType "uniform"
//! }
//!
//! Lattice { float[3] Data } @1       (or `Lattice { float Data } @1` for scalars)
//!
//! # Data section follows
//! @1
//! <nx * ny * nz * k little-endian f32 values, x fastest, components interleaved>
//! ```
//!
//! Node spacing is not stored; it is derived from the bounding box and
//! the lattice as `(max - min) / (dim - 1)`.

mod format;
mod reader;
mod series;
mod writer;

pub use format::{
    AMIRA_MAGIC, AmiraError, DATA_SECTION_MARKER, decode_values, encode_values, parse_header,
    write_header,
};
pub use reader::{read_grid, read_grid_into, read_header};
pub use series::AmiraSeries;
pub use writer::{write_grid, write_grid_to};
