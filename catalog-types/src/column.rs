use serde::{Deserialize, Serialize};

/// A requested (or produced) output column. This is a representative subset
/// of the ~100 columns the real measurement engine this spec distills from
/// supports — every raw accumulator and closed-form formula named in the
/// spec has at least one column exercising it, but the registry is built to
/// make adding another code a one-line metadata entry (see
/// `catalog_core::registry`), not a structural change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnCode {
    ObjId,
    HostObjId,

    Area,
    AreaArcsec2,
    AreaXY,

    Sum,
    SumNoRiver,
    Mean,

    X,
    Y,
    Z,
    GeoX,
    GeoY,
    GeoZ,
    /// Reproduces the source registry's ambiguous fall-through onto `MinValX`
    /// (spec §9 Open Questions) rather than silently "fixing" it.
    ClumpsGeoZ,

    Ra,
    Dec,
    W1,
    W2,

    SemiMajor,
    SemiMinor,
    AxisRatio,
    PositionAngle,
    GeoSemiMajor,
    GeoSemiMinor,
    GeoAxisRatio,
    GeoPositionAngle,

    SurfaceBrightness,
    SurfaceBrightnessError,
    Magnitude,
    MagnitudeError,
    SignalToNoise,

    MinValX,
    MinValY,
    MinValZ,
    MinValNum,
    MaxValX,
    MaxValY,
    MaxValZ,
    MaxValNum,

    Median,
    Maximum,
    HalfSumRadius,
    HalfMaxRadius,
    FracMax1Radius,
    FracMax1Num,
    FracMax2Radius,
    FracMax2Num,

    SigClipMean,
    SigClipMedian,
    SigClipStd,
    SigClipNum,

    SumVariance,
    NumVariance,

    UpperLimitMag,
    UpperLimitSb,
    UpperLimitQuantile,
    UpperLimitSkew,

    RiverNum,
    RiverMean,

    AreaInSlice,
    SumInSlice,
    SumErrorInSlice,
}

/// Column element type, matching the registry's static per-code metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Float,
    /// One value per input slice (3D only): one row holds a `Vec<f32>`.
    VectorFloat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Int,
    Float,
    Exp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnFormat {
    pub kind: FormatKind,
    pub width: u8,
    pub precision: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    I64(Vec<i64>),
    F32(Vec<f32>),
    VecF32(Vec<Vec<f32>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::I64(v) => v.len(),
            ColumnData::F32(v) => v.len(),
            ColumnData::VecF32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub code: ColumnCode,
    pub name: String,
    pub unit: String,
    pub comment: String,
    pub format: ColumnFormat,
    pub data: ColumnData,
}
