use std::fmt;

use crate::ColumnCode;

/// Errors surfaced across the library boundary (spec §7). None of these are
/// recoverable inside the core; each terminates the current `generate_catalog`
/// call with enough context to name the offending column/label.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// A requested column needs world coordinates but the values image has no WCS attached.
    MissingWcs { column: ColumnCode },
    /// An RA/DEC alias could not be matched to a WCS axis type string.
    UnknownWcsAxis { alias: &'static str },
    /// A column was requested for an input of the wrong dimensionality.
    DimensionMismatch { column: ColumnCode, expected: &'static str, got: usize },
    /// A sigma-clip-family column was requested without a (multiplier, tolerance) pair.
    MissingSigmaClipParams { column: ColumnCode },
    /// An upper-limit column was requested without the Monte-Carlo inputs enabled.
    MissingUpperLimit { column: ColumnCode },
    /// The column registry has no entry for this code. Always a programming error.
    UnknownColumnCode { column: ColumnCode },
    /// An internal bookkeeping invariant was violated (e.g. clump cursor mismatch).
    InternalInvariantViolation { detail: String },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::MissingWcs { column } => {
                write!(f, "column {column:?} requires world coordinates but no WCS is attached to the values image")
            }
            CatalogError::UnknownWcsAxis { alias } => {
                write!(f, "could not match alias {alias:?} to any WCS axis type")
            }
            CatalogError::DimensionMismatch { column, expected, got } => {
                write!(f, "column {column:?} requires {expected} input, got {got}-dimensional input")
            }
            CatalogError::MissingSigmaClipParams { column } => {
                write!(f, "column {column:?} requires sigma-clip parameters (multiplier, tolerance) but none were set")
            }
            CatalogError::MissingUpperLimit { column } => {
                write!(f, "column {column:?} requires upper-limit Monte-Carlo inputs but params.upperlimit is false")
            }
            CatalogError::UnknownColumnCode { column } => {
                write!(f, "no registry entry for column {column:?} (this is a bug)")
            }
            CatalogError::InternalInvariantViolation { detail } => {
                write!(f, "internal invariant violated: {detail}")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// Non-fatal conditions collected during a run and delivered alongside the output.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub message: String,
}

impl Warning {
    pub fn new(message: impl Into<String>) -> Self {
        Warning { message: message.into() }
    }
}
