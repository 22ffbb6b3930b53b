use serde::{Deserialize, Serialize};

use crate::Image;

/// Per-pixel or scalar sky background.
#[derive(Debug, Clone)]
pub enum SkyInput {
    Scalar(f32),
    /// Full-resolution sky image, same shape as the values image.
    FullResolution(Image),
    /// Tile-resolution sky image: one value per coarse tile cell.
    TileResolution { image: Image, tile_size: [usize; 3] },
}

/// Per-pixel or scalar noise (standard deviation, unless `variance` is set).
#[derive(Debug, Clone)]
pub enum NoiseInput {
    Scalar(f32),
    Image(Image),
}

/// Run parameters, serializable so an external config layer (out of scope
/// for this crate, per spec §1) can load and hand them in as plain data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogParams {
    pub zeropoint: f32,
    pub cpscorr: f32,
    pub spatial_resolution: f32,
    pub sigmaclip: Option<(f32, f32)>,
    pub fracmax: (f32, f32),
    pub num_threads: usize,
    pub rng_seed: u64,
    pub upperlimit: bool,
    /// True when the supplied noise image/scalar already holds variance
    /// rather than standard deviation.
    pub variance_input: bool,
}

impl Default for CatalogParams {
    fn default() -> Self {
        CatalogParams {
            zeropoint: 0.0,
            cpscorr: 1.0,
            spatial_resolution: 0.0,
            sigmaclip: None,
            fracmax: (0.5, 0.25),
            num_threads: 1,
            rng_seed: 0,
            upperlimit: false,
            variance_input: false,
        }
    }
}
