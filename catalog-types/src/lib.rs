//! Shared data types for the catalog-generation core: images, tiles, column
//! metadata, run parameters, and the error/warning types crossing the
//! library boundary. The engine itself (column registry, accumulators, pass
//! engine, filler, parallel driver) lives in `catalog-core`.

mod column;
mod error;
mod image;
mod params;
mod request;

pub use column::{Column, ColumnCode, ColumnData, ColumnFormat, ColumnKind, FormatKind};
pub use error::{CatalogError, Warning};
pub use image::{Image, LabelImage, Tile, TileStrips, WcsMeta};
pub use params::{CatalogParams, NoiseInput, SkyInput};
pub use request::{CatalogOutput, CatalogRequest, UpperLimitHook, UpperLimitSample};
