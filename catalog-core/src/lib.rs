//! The catalog-generation core: given a values image, a labeled object
//! image, and optionally a labeled clump image plus sky/noise estimates,
//! compute a per-object (and per-clump) measurement catalog.
//!
//! This is the engine described by spec §2 as five collaborating
//! components: the column registry (C1, [`registry`]), the raw accumulators
//! (C2, [`accumulators`]), the pass engine (C3, [`passes`]), the column
//! filler (C4, [`filler`]), and the parallel driver & post-processor (C5,
//! [`driver`]). [`generate_catalog`] is the single public entry point that
//! wires them together; everything else is `pub` only so the pieces can be
//! unit-tested independently.

pub mod accumulators;
pub mod driver;
pub mod filler;
pub mod inputs;
pub mod passes;
pub mod registry;

use catalog_types::{CatalogError, CatalogOutput, CatalogRequest};

/// Run the measurement engine end to end (spec §6 "There is no wire
/// protocol and no CLI; this core is called as a library function").
pub fn generate_catalog(request: CatalogRequest) -> Result<CatalogOutput, CatalogError> {
    driver::run(request)
}
