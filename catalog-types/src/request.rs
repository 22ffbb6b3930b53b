use std::sync::Arc;

use crate::{CatalogParams, ColumnCode, Column, Image, LabelImage, NoiseInput, SkyInput, Tile, Warning};

/// One Monte-Carlo upper-limit draw for a single object or clump (spec §1:
/// "Random-number generation and the upper-limit Monte-Carlo driver (only
/// its integration point is specified)"). The core never generates these
/// numbers itself; it calls the hook once per row and stores whatever comes
/// back into the `UPPERLIMIT_*` accumulator slots for the filler to format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpperLimitSample {
    pub b: f64,
    pub s: f64,
    pub q: f64,
    pub skew: f64,
}

/// External Monte-Carlo upper-limit callback: `(rng_seed, row_id) -> sample`.
/// `row_id` is the object ID for object rows. Clump rows don't know their
/// final (host-object-sorted) row index until after the post-join clump
/// permutation, so their row_id is instead `(object_id << 32) | local_index`
/// (`local_index` 1-based, scoped to the clump's host object) — stable and
/// reproducible across runs without depending on the order worker threads
/// happen to finish in, which the final row position does depend on. The
/// actual RNG lives behind this closure, supplied by the out-of-scope
/// upper-limit driver — this crate never generates random numbers itself.
pub type UpperLimitHook = Arc<dyn Fn(u64, u64) -> UpperLimitSample + Send + Sync>;

/// Everything `generate_catalog` needs, gathered in one place (spec §6,
/// "Inputs consumed by the core").
pub struct CatalogRequest {
    pub values: Image,
    pub objects: LabelImage,
    pub clumps: Option<LabelImage>,
    pub sky: Option<SkyInput>,
    pub noise: Option<NoiseInput>,
    /// One bounding-box tile per object, in object-ID order.
    pub tiles: Vec<Tile>,
    /// Optional remapping from internal 1-based object label to external
    /// output label, indexed `outlabs[internal_label - 1]`. Applied to the
    /// object catalog's `OBJ_ID` column and the clump catalog's
    /// `HOST_OBJ_ID` column; falls back to the internal label itself for
    /// any index it doesn't cover.
    pub outlabs: Option<Vec<u32>>,
    /// The user's requested columns, in desired output order. The registry
    /// derives both the object and (if clump labels are present) clump
    /// column sets from this single list, dropping entries invalid in a
    /// given context (spec §4.1).
    pub column_request: Vec<ColumnCode>,
    pub params: CatalogParams,
    /// Present only when `params.upperlimit` is set and at least one
    /// `UPPERLIMIT_*` column was requested; validated in `define_and_allocate`.
    pub upperlimit_hook: Option<UpperLimitHook>,
}

/// Everything `generate_catalog` produces (spec §6, "Outputs produced by the core").
#[derive(Debug, Clone)]
pub struct CatalogOutput {
    pub object_columns: Vec<Column>,
    pub clump_columns: Option<Vec<Column>>,
    /// Pixel area, zeropoint, surface-brightness-limit, upper-limit parameters, etc.
    pub metadata: Vec<(String, String)>,
    pub warnings: Vec<Warning>,
}
