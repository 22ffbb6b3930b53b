use std::sync::Arc;

/// A world-coordinate-system descriptor. Opaque to the core beyond the axis
/// type strings (for RA/DEC alias resolution) and the cached pixel area.
/// The actual pixel-to-world conversion is an external library call; it is
/// represented here as an injected closure so the core never links against
/// a WCS library directly (spec §1: "FITS read/write, WCS library calls...
/// touched only through the interfaces in §6").
#[derive(Clone)]
pub struct WcsMeta {
    /// One axis-type string per dimension, e.g. `["RA---TAN", "DEC--TAN"]`.
    pub axis_types: Vec<String>,
    /// Pixel area in arcsec^2, derived from the WCS once by the caller and cached here.
    pub pixel_area_arcsec2: f64,
    /// Pixel -> world coordinate conversion, batched: takes one flat array of
    /// pixel coordinates per dimension and returns the matching world arrays.
    pub convert: Arc<dyn Fn(&[Vec<f64>]) -> Vec<Vec<f64>> + Send + Sync>,
}

impl std::fmt::Debug for WcsMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WcsMeta")
            .field("axis_types", &self.axis_types)
            .field("pixel_area_arcsec2", &self.pixel_area_arcsec2)
            .finish()
    }
}

/// A dense N-dimensional array of 32-bit floats (values image), N in {1,2,3}.
/// Internally always carries three extents; unused trailing dimensions are 1.
#[derive(Debug, Clone)]
pub struct Image {
    pub data: Vec<f32>,
    /// (nx, ny, nz), fastest-varying axis first. Axes beyond `ndim()` are 1.
    pub dims: [usize; 3],
    pub has_blank: bool,
    pub wcs: Option<WcsMeta>,
}

impl Image {
    pub fn new(data: Vec<f32>, dims: [usize; 3]) -> Self {
        assert_eq!(data.len(), dims[0] * dims[1] * dims[2], "image data length does not match dims");
        Image { data, dims, has_blank: false, wcs: None }
    }

    /// Number of genuinely-used dimensions (1, 2, or 3).
    pub fn ndim(&self) -> usize {
        if self.dims[2] > 1 {
            3
        } else if self.dims[1] > 1 {
            2
        } else {
            1
        }
    }

    pub fn len(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A pixel is blank iff it is NaN. `has_blank` is an upstream hint only.
    #[inline]
    pub fn is_blank(value: f32) -> bool {
        value.is_nan()
    }
}

/// A dense N-dimensional array of labels. 0 means "not in any region";
/// k in [1, N] names an object (or, for a clump image, a clump scoped to
/// its host object).
#[derive(Debug, Clone)]
pub struct LabelImage {
    pub data: Vec<u32>,
    pub dims: [usize; 3],
}

impl LabelImage {
    pub fn new(data: Vec<u32>, dims: [usize; 3]) -> Self {
        assert_eq!(data.len(), dims[0] * dims[1] * dims[2], "label image data length does not match dims");
        LabelImage { data, dims }
    }

    pub fn len(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_label(&self) -> u32 {
        self.data.iter().copied().max().unwrap_or(0)
    }
}

/// The minimum axis-aligned bounding box of a labeled region, plus the
/// strides needed to traverse it inside the full image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// 0-based start offset into the full image, per dimension.
    pub start: [usize; 3],
    /// Extents of the tile, per dimension.
    pub size: [usize; 3],
}

impl Tile {
    pub fn new(start: [usize; 3], size: [usize; 3]) -> Self {
        Tile { start, size }
    }

    pub fn ndim(&self) -> usize {
        if self.size[2] > 1 {
            3
        } else if self.size[1] > 1 {
            2
        } else {
            1
        }
    }

    pub fn num_pixels(&self) -> usize {
        self.size[0] * self.size[1] * self.size[2]
    }

    /// Flat index of this tile's pixel `(lx, ly, lz)` (tile-local, 0-based)
    /// inside an image of shape `image_dims`.
    #[inline]
    pub fn flat_index(&self, image_dims: [usize; 3], lx: usize, ly: usize, lz: usize) -> usize {
        let gx = self.start[0] + lx;
        let gy = self.start[1] + ly;
        let gz = self.start[2] + lz;
        gx + image_dims[0] * (gy + image_dims[1] * gz)
    }

    /// 1-based FITS-axis coordinates of tile-local pixel `(lx, ly, lz)`.
    #[inline]
    pub fn fits_coord(&self, lx: usize, ly: usize, lz: usize) -> (f64, f64, f64) {
        (
            (self.start[0] + lx + 1) as f64,
            (self.start[1] + ly + 1) as f64,
            (self.start[2] + lz + 1) as f64,
        )
    }

    /// Iterate the tile as contiguous row-major strips: one strip per (ly, lz)
    /// pair, each `size[0]` pixels long, addressed as `(flat_start, len, ly, lz)`.
    /// This is the "stride-increment scheme" of spec §9: no heap allocation
    /// inside the per-pixel loop, the inner scan stays over contiguous memory.
    pub fn strips(&self, image_dims: [usize; 3]) -> TileStrips {
        TileStrips { tile: *self, image_dims, ly: 0, lz: 0 }
    }
}

pub struct TileStrips {
    tile: Tile,
    image_dims: [usize; 3],
    ly: usize,
    lz: usize,
}

impl Iterator for TileStrips {
    /// (flat_start_index, strip_len, ly, lz)
    type Item = (usize, usize, usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.lz >= self.tile.size[2] {
            return None;
        }
        let flat_start = self.tile.flat_index(self.image_dims, 0, self.ly, self.lz);
        let item = (flat_start, self.tile.size[0], self.ly, self.lz);

        self.ly += 1;
        if self.ly >= self.tile.size[1] {
            self.ly = 0;
            self.lz += 1;
        }
        Some(item)
    }
}
