//! Uniform 3D grid with scalar or vector values per node.
//!
//! Data is stored as a flat `f32` buffer, x fastest, then y, then z:
//! `((z * ny + y) * nx + x) * components + c`. Vector components of one
//! node are contiguous.

use glam::DVec3;

/// Axis-aligned bounding box (closed on both ends).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Whether `p` lies inside the box, boundary included.
    #[inline]
    pub fn contains(&self, p: DVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    #[inline]
    pub fn extent(&self) -> DVec3 {
        self.max - self.min
    }

    /// Whether `min <= max` on every axis.
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.min.cmple(self.max).all()
    }
}

/// Grid construction errors.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("Grid dimensions {0:?} must be non-zero on every axis")]
    InvalidDimensions([usize; 3]),
    #[error("Unsupported component count {0} (expected 1 or 3)")]
    UnsupportedComponents(usize),
    #[error("Data length {found} does not match grid size {expected}")]
    DataLength { expected: usize, found: usize },
    #[error("Bounding box is not ordered (min > max on some axis)")]
    UnorderedBounds,
}

/// Geometry of a grid without its values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridShape {
    pub bounds: Aabb,
    pub dims: [usize; 3],
    pub components: usize,
}

impl GridShape {
    /// Number of f32 values a grid of this shape stores.
    pub fn num_values(&self) -> usize {
        self.dims.iter().product::<usize>() * self.components
    }
}

/// Dense uniform 3D grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    bounds: Aabb,
    spacing: DVec3,
    dims: [usize; 3],
    components: usize,
    data: Vec<f32>,
}

impl Grid {
    /// Create a zero-filled grid spanning `bounds` corner to corner.
    pub fn new(bounds: Aabb, dims: [usize; 3], components: usize) -> Result<Self, GridError> {
        let len = Self::checked_len(&bounds, dims, components)?;
        Ok(Self {
            spacing: spacing_for(&bounds, dims),
            bounds,
            dims,
            components,
            data: vec![0.0; len],
        })
    }

    /// Create a grid from existing data.
    pub fn from_data(
        bounds: Aabb,
        dims: [usize; 3],
        components: usize,
        data: Vec<f32>,
    ) -> Result<Self, GridError> {
        let expected = Self::checked_len(&bounds, dims, components)?;
        if data.len() != expected {
            return Err(GridError::DataLength {
                expected,
                found: data.len(),
            });
        }
        Ok(Self {
            spacing: spacing_for(&bounds, dims),
            bounds,
            dims,
            components,
            data,
        })
    }

    /// Zero-filled grid of the given shape.
    pub fn zeroed(shape: &GridShape) -> Result<Self, GridError> {
        Self::new(shape.bounds, shape.dims, shape.components)
    }

    pub fn shape(&self) -> GridShape {
        GridShape {
            bounds: self.bounds,
            dims: self.dims,
            components: self.components,
        }
    }

    /// Zero-filled grid with the same geometry and a different component count.
    pub fn with_components(&self, components: usize) -> Result<Self, GridError> {
        Self::new(self.bounds, self.dims, components)
    }

    fn checked_len(bounds: &Aabb, dims: [usize; 3], components: usize) -> Result<usize, GridError> {
        if dims.contains(&0) {
            return Err(GridError::InvalidDimensions(dims));
        }
        if components != 1 && components != 3 {
            return Err(GridError::UnsupportedComponents(components));
        }
        if !bounds.is_ordered() {
            return Err(GridError::UnorderedBounds);
        }
        dims.iter()
            .try_fold(components, |acc, &d| acc.checked_mul(d))
            .ok_or(GridError::InvalidDimensions(dims))
    }

    #[inline]
    pub fn origin(&self) -> DVec3 {
        self.bounds.min
    }

    #[inline]
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Per-axis node distance. Axes with a single node report 1.0.
    #[inline]
    pub fn spacing(&self) -> DVec3 {
        self.spacing
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline]
    pub fn components(&self) -> usize {
        self.components
    }

    /// Number of nodes (nx * ny * nz).
    #[inline]
    pub fn num_points(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Convert (x, y, z) node coordinates to a flat node index.
    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.dims[1] + y) * self.dims[0] + x
    }

    /// Inverse of [`Grid::idx`].
    #[inline]
    pub fn coords(&self, idx: usize) -> [usize; 3] {
        let x = idx % self.dims[0];
        let y = (idx / self.dims[0]) % self.dims[1];
        let z = idx / (self.dims[0] * self.dims[1]);
        [x, y, z]
    }

    /// World position of node (x, y, z).
    #[inline]
    pub fn position(&self, x: usize, y: usize, z: usize) -> DVec3 {
        self.bounds.min + DVec3::new(x as f64, y as f64, z as f64) * self.spacing
    }

    /// Scalar value of a node (first component).
    #[inline]
    pub fn scalar(&self, idx: usize) -> f32 {
        self.data[idx * self.components]
    }

    #[inline]
    pub fn set_scalar(&mut self, idx: usize, value: f32) {
        self.data[idx * self.components] = value;
    }

    /// Vector value of a node. Only meaningful for 3-component grids.
    #[inline]
    pub fn vector(&self, idx: usize) -> DVec3 {
        let base = idx * self.components;
        DVec3::new(
            self.data[base] as f64,
            self.data[base + 1] as f64,
            self.data[base + 2] as f64,
        )
    }

    #[inline]
    pub fn set_vector(&mut self, idx: usize, value: DVec3) {
        let base = idx * self.components;
        self.data[base] = value.x as f32;
        self.data[base + 1] = value.y as f32;
        self.data[base + 2] = value.z as f32;
    }

    /// Clamped central-difference neighbors of node (x, y, z).
    #[inline]
    pub fn stencil(&self, x: usize, y: usize, z: usize) -> CentralStencil {
        CentralStencil::new(self.dims, [x, y, z])
    }
}

fn spacing_for(bounds: &Aabb, dims: [usize; 3]) -> DVec3 {
    let extent = bounds.extent();
    let axis = |i: usize| {
        if dims[i] > 1 {
            extent[i] / (dims[i] - 1) as f64
        } else {
            1.0
        }
    };
    DVec3::new(axis(0), axis(1), axis(2))
}

/// Neighbor indices for central differences with one-sided fallback at edges.
///
/// For each axis the lower and upper neighbor are clamped to the lattice,
/// so at a boundary node one of them is the node itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentralStencil {
    /// Flat indices of the lower neighbor per axis.
    pub lower: [usize; 3],
    /// Flat indices of the upper neighbor per axis.
    pub upper: [usize; 3],
    /// Index distance between upper and lower neighbor per axis (0, 1 or 2).
    pub span: [usize; 3],
}

impl CentralStencil {
    pub fn new(dims: [usize; 3], node: [usize; 3]) -> Self {
        let flat = |c: [usize; 3]| (c[2] * dims[1] + c[1]) * dims[0] + c[0];
        let mut lower = [0; 3];
        let mut upper = [0; 3];
        let mut span = [0; 3];
        for axis in 0..3 {
            let lo = node[axis].saturating_sub(1);
            let hi = (node[axis] + 1).min(dims[axis] - 1);
            let mut lo_node = node;
            let mut hi_node = node;
            lo_node[axis] = lo;
            hi_node[axis] = hi;
            lower[axis] = flat(lo_node);
            upper[axis] = flat(hi_node);
            span[axis] = hi - lo;
        }
        Self { lower, upper, span }
    }

    /// All six neighbor indices.
    pub fn neighbors(&self) -> [usize; 6] {
        [
            self.lower[0],
            self.upper[0],
            self.lower[1],
            self.upper[1],
            self.lower[2],
            self.upper[2],
        ]
    }
}
