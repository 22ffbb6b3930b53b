//! Per-pixel sky and noise lookup (spec §4.3.1 step 9). Both inputs can be a
//! bare scalar or an image; sky additionally allows a coarser "tile
//! resolution" image addressed by dividing the pixel coordinate down.

use catalog_types::{Image, NoiseInput, SkyInput};

pub struct SkyLookup<'a> {
    input: Option<&'a SkyInput>,
}

impl<'a> SkyLookup<'a> {
    pub fn new(input: Option<&'a SkyInput>) -> Self {
        SkyLookup { input }
    }

    /// Sky value at the 0-based global pixel coordinate, or `None` if no sky
    /// input was supplied or the underlying pixel is itself blank.
    pub fn value_at(&self, gx: usize, gy: usize, gz: usize) -> Option<f64> {
        match self.input? {
            SkyInput::Scalar(v) => Some(*v as f64),
            SkyInput::FullResolution(image) => sample(image, gx, gy, gz),
            SkyInput::TileResolution { image, tile_size } => {
                let tx = gx / tile_size[0].max(1);
                let ty = gy / tile_size[1].max(1);
                let tz = gz / tile_size[2].max(1);
                sample(image, tx, ty, tz)
            }
        }
    }
}

pub struct NoiseLookup<'a> {
    input: Option<&'a NoiseInput>,
    variance_input: bool,
}

impl<'a> NoiseLookup<'a> {
    pub fn new(input: Option<&'a NoiseInput>, variance_input: bool) -> Self {
        NoiseLookup { input, variance_input }
    }

    /// Per-pixel variance at the 0-based global coordinate; squares a
    /// standard-deviation input unless the caller flagged it as already
    /// being variance.
    pub fn variance_at(&self, gx: usize, gy: usize, gz: usize) -> Option<f64> {
        let raw = match self.input? {
            NoiseInput::Scalar(v) => Some(*v as f64),
            NoiseInput::Image(image) => sample(image, gx, gy, gz),
        }?;
        if raw.is_nan() {
            return None;
        }
        Some(if self.variance_input { raw } else { raw * raw })
    }
}

fn sample(image: &Image, gx: usize, gy: usize, gz: usize) -> Option<f64> {
    if gx >= image.dims[0] || gy >= image.dims[1] || gz >= image.dims[2] {
        return None;
    }
    let idx = gx + image.dims[0] * (gy + image.dims[1] * gz);
    let v = image.data[idx];
    if v.is_nan() {
        None
    } else {
        Some(v as f64)
    }
}
