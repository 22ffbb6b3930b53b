//! Column Registry (C1, spec §4.1): static metadata for every supported
//! column, and the single entry point that turns a requested column list
//! into allocated output columns plus the per-pass dependency-flag bitmaps.

use catalog_types::{CatalogError, Column, ColumnCode, ColumnData, ColumnFormat, ColumnKind, FormatKind, Warning, WcsMeta};

use crate::accumulators::{Slot, OI_SLOT_COUNT};

pub type SlotMask = [bool; OI_SLOT_COUNT];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DimRestriction {
    ThreeDOnly,
}

/// Static, per-code metadata. One entry drives: output name/unit/comment in
/// each context, element type/format, which OI/CI slots it depends on, and
/// which optional subsystems (WCS, sigma-clip, upper-limit, order pass,
/// vector pass) it requires.
struct ColumnMeta {
    name_obj: Option<&'static str>,
    name_clump: Option<&'static str>,
    unit: &'static str,
    comment_obj: Option<&'static str>,
    comment_clump: Option<&'static str>,
    kind: ColumnKind,
    format: ColumnFormat,
    oi_deps: &'static [Slot],
    needs_river: bool,
    needs_bbox: bool,
    dim_restriction: Option<DimRestriction>,
    needs_wcs: bool,
    needs_sigmaclip: bool,
    needs_upperlimit: bool,
    needs_order_pass: bool,
    needs_vector_pass: bool,
}

const fn fmt_int(width: u8) -> ColumnFormat {
    ColumnFormat { kind: FormatKind::Int, width, precision: 0 }
}

const fn fmt_float(width: u8, precision: u8) -> ColumnFormat {
    ColumnFormat { kind: FormatKind::Float, width, precision }
}

macro_rules! meta {
    (
        name_obj: $name_obj:expr, name_clump: $name_clump:expr, unit: $unit:expr,
        comment_obj: $comment_obj:expr, comment_clump: $comment_clump:expr,
        kind: $kind:expr, format: $format:expr, deps: $deps:expr
        $(, needs_river: $needs_river:expr)?
        $(, needs_bbox: $needs_bbox:expr)?
        $(, dim: $dim:expr)?
        $(, needs_wcs: $needs_wcs:expr)?
        $(, needs_sigmaclip: $needs_sigmaclip:expr)?
        $(, needs_upperlimit: $needs_upperlimit:expr)?
        $(, needs_order_pass: $needs_order_pass:expr)?
        $(, needs_vector_pass: $needs_vector_pass:expr)?
        $(,)?
    ) => {{
        #[allow(unused_mut, unused_assignments)]
        let mut m = ColumnMeta {
            name_obj: $name_obj,
            name_clump: $name_clump,
            unit: $unit,
            comment_obj: $comment_obj,
            comment_clump: $comment_clump,
            kind: $kind,
            format: $format,
            oi_deps: $deps,
            needs_river: false,
            needs_bbox: false,
            dim_restriction: None,
            needs_wcs: false,
            needs_sigmaclip: false,
            needs_upperlimit: false,
            needs_order_pass: false,
            needs_vector_pass: false,
        };
        $(m.needs_river = $needs_river;)?
        $(m.needs_bbox = $needs_bbox;)?
        $(m.dim_restriction = Some($dim);)?
        $(m.needs_wcs = $needs_wcs;)?
        $(m.needs_sigmaclip = $needs_sigmaclip;)?
        $(m.needs_upperlimit = $needs_upperlimit;)?
        $(m.needs_order_pass = $needs_order_pass;)?
        $(m.needs_vector_pass = $needs_vector_pass;)?
        m
    }};
}

fn meta_for(code: ColumnCode) -> ColumnMeta {
    use ColumnCode::*;
    use Slot::*;

    match code {
        ObjId => meta! {
            name_obj: Some("OBJ_ID"), name_clump: Some("OBJ_ID"), unit: "count",
            comment_obj: Some("Row index of this object"), comment_clump: Some("Row index of this clump"),
            kind: ColumnKind::Int, format: fmt_int(8), deps: &[],
        },
        HostObjId => meta! {
            name_obj: None, name_clump: Some("HOST_OBJ_ID"), unit: "count",
            comment_obj: None, comment_clump: Some("ID of the object hosting this clump"),
            kind: ColumnKind::Int, format: fmt_int(8), deps: &[],
        },

        Area => meta! {
            name_obj: Some("AREA"), name_clump: Some("AREA"), unit: "count",
            comment_obj: Some("Number of non-blank labeled pixels"), comment_clump: Some("Number of non-blank labeled pixels"),
            kind: ColumnKind::Int, format: fmt_int(8), deps: &[Num],
        },
        AreaArcsec2 => meta! {
            name_obj: Some("AREA_ARCSEC2"), name_clump: Some("AREA_ARCSEC2"), unit: "arcsec2",
            comment_obj: Some("Area in arcsec^2"), comment_clump: Some("Area in arcsec^2"),
            kind: ColumnKind::Float, format: fmt_float(12, 4), deps: &[Num], needs_wcs: true,
        },
        AreaXY => meta! {
            name_obj: Some("AREAXY"), name_clump: Some("AREAXY"), unit: "count",
            comment_obj: Some("Projected 2D area of a 3D object"), comment_clump: Some("Projected 2D area of a 3D clump"),
            kind: ColumnKind::Int, format: fmt_int(8), deps: &[NumAllXY, NumXY], dim: DimRestriction::ThreeDOnly,
        },

        Sum => meta! {
            name_obj: Some("SUM"), name_clump: Some("SUM"), unit: "counts",
            comment_obj: Some("Sum of sky-subtracted values"), comment_clump: Some("Sum of sky-subtracted values"),
            kind: ColumnKind::Float, format: fmt_float(14, 6), deps: &[Sum, Num],
        },
        SumNoRiver => meta! {
            name_obj: None, name_clump: Some("SUM_NORIVER"), unit: "counts",
            comment_obj: None, comment_clump: Some("Clump sum with the river (local background) subtracted"),
            kind: ColumnKind::Float, format: fmt_float(14, 6), deps: &[Sum, Num], needs_river: true,
        },
        Mean => meta! {
            name_obj: Some("MEAN"), name_clump: Some("MEAN"), unit: "counts",
            comment_obj: Some("Mean pixel value"), comment_clump: Some("Mean pixel value"),
            kind: ColumnKind::Float, format: fmt_float(14, 6), deps: &[Sum, Num],
        },

        X => meta! {
            name_obj: Some("X"), name_clump: Some("X"), unit: "pixel",
            comment_obj: Some("Flux-weighted center, FITS axis 1"), comment_clump: Some("Flux-weighted center, FITS axis 1"),
            kind: ColumnKind::Float, format: fmt_float(12, 3), deps: &[Vx, SumWht, Gx, NumAll],
        },
        Y => meta! {
            name_obj: Some("Y"), name_clump: Some("Y"), unit: "pixel",
            comment_obj: Some("Flux-weighted center, FITS axis 2"), comment_clump: Some("Flux-weighted center, FITS axis 2"),
            kind: ColumnKind::Float, format: fmt_float(12, 3), deps: &[Vy, SumWht, Gy, NumAll],
        },
        Z => meta! {
            name_obj: Some("Z"), name_clump: Some("Z"), unit: "pixel",
            comment_obj: Some("Flux-weighted center, FITS axis 3"), comment_clump: Some("Flux-weighted center, FITS axis 3"),
            kind: ColumnKind::Float, format: fmt_float(12, 3), deps: &[Vz, SumWht, Gz, NumAll], dim: DimRestriction::ThreeDOnly,
        },
        GeoX => meta! {
            name_obj: Some("GEO_X"), name_clump: Some("GEO_X"), unit: "pixel",
            comment_obj: Some("Geometric center, FITS axis 1"), comment_clump: Some("Geometric center, FITS axis 1"),
            kind: ColumnKind::Float, format: fmt_float(12, 3), deps: &[Gx, NumAll],
        },
        GeoY => meta! {
            name_obj: Some("GEO_Y"), name_clump: Some("GEO_Y"), unit: "pixel",
            comment_obj: Some("Geometric center, FITS axis 2"), comment_clump: Some("Geometric center, FITS axis 2"),
            kind: ColumnKind::Float, format: fmt_float(12, 3), deps: &[Gy, NumAll],
        },
        GeoZ => meta! {
            name_obj: Some("GEO_Z"), name_clump: Some("GEO_Z"), unit: "pixel",
            comment_obj: Some("Geometric center, FITS axis 3"), comment_clump: Some("Geometric center, FITS axis 3"),
            kind: ColumnKind::Float, format: fmt_float(12, 3), deps: &[Gz, NumAll], dim: DimRestriction::ThreeDOnly,
        },
        // Reproduces the source registry's fall-through onto MINVALX without
        // a `break` (spec §9 Open Question) rather than silently fixing it:
        // this code shares MinValX's dependencies and, deliberately, its
        // filler behavior (see filler.rs).
        ClumpsGeoZ => meta! {
            name_obj: None, name_clump: Some("CLUMPS_GEO_Z"), unit: "pixel",
            comment_obj: None, comment_clump: Some("Geometric Z center of clumps (falls through to MINVALX, see DESIGN.md)"),
            kind: ColumnKind::Float, format: fmt_float(12, 3), deps: &[MinVx, MinVNum],
        },

        Ra => meta! {
            name_obj: Some("RA"), name_clump: Some("RA"), unit: "deg",
            comment_obj: Some("Right ascension of flux-weighted center"), comment_clump: Some("Right ascension of flux-weighted center"),
            kind: ColumnKind::Float, format: fmt_float(14, 7), deps: &[Vx, Vy, SumWht, Gx, Gy, NumAll], needs_wcs: true,
        },
        Dec => meta! {
            name_obj: Some("DEC"), name_clump: Some("DEC"), unit: "deg",
            comment_obj: Some("Declination of flux-weighted center"), comment_clump: Some("Declination of flux-weighted center"),
            kind: ColumnKind::Float, format: fmt_float(14, 7), deps: &[Vx, Vy, SumWht, Gx, Gy, NumAll], needs_wcs: true,
        },
        W1 => meta! {
            name_obj: Some("W1"), name_clump: Some("W1"), unit: "wcs",
            comment_obj: Some("World coordinate, axis 1"), comment_clump: Some("World coordinate, axis 1"),
            kind: ColumnKind::Float, format: fmt_float(14, 7), deps: &[Vx, SumWht, Gx, NumAll], needs_wcs: true,
        },
        W2 => meta! {
            name_obj: Some("W2"), name_clump: Some("W2"), unit: "wcs",
            comment_obj: Some("World coordinate, axis 2"), comment_clump: Some("World coordinate, axis 2"),
            kind: ColumnKind::Float, format: fmt_float(14, 7), deps: &[Vy, SumWht, Gy, NumAll], needs_wcs: true,
        },

        SemiMajor => meta! {
            name_obj: Some("SEMI_MAJOR"), name_clump: Some("SEMI_MAJOR"), unit: "pixel",
            comment_obj: Some("Flux-weighted semi-major axis"), comment_clump: Some("Flux-weighted semi-major axis"),
            kind: ColumnKind::Float, format: fmt_float(12, 4), deps: &[Vxx, Vyy, Vxy, SumWht, Vx, Vy],
        },
        SemiMinor => meta! {
            name_obj: Some("SEMI_MINOR"), name_clump: Some("SEMI_MINOR"), unit: "pixel",
            comment_obj: Some("Flux-weighted semi-minor axis"), comment_clump: Some("Flux-weighted semi-minor axis"),
            kind: ColumnKind::Float, format: fmt_float(12, 4), deps: &[Vxx, Vyy, Vxy, SumWht, Vx, Vy],
        },
        AxisRatio => meta! {
            name_obj: Some("AXIS_RATIO"), name_clump: Some("AXIS_RATIO"), unit: "frac",
            comment_obj: Some("Flux-weighted semi-minor / semi-major"), comment_clump: Some("Flux-weighted semi-minor / semi-major"),
            kind: ColumnKind::Float, format: fmt_float(10, 4), deps: &[Vxx, Vyy, Vxy, SumWht, Vx, Vy],
        },
        PositionAngle => meta! {
            name_obj: Some("POSITION_ANGLE"), name_clump: Some("POSITION_ANGLE"), unit: "deg",
            comment_obj: Some("Flux-weighted position angle"), comment_clump: Some("Flux-weighted position angle"),
            kind: ColumnKind::Float, format: fmt_float(10, 4), deps: &[Vxx, Vyy, Vxy, SumWht, Vx, Vy],
        },
        GeoSemiMajor => meta! {
            name_obj: Some("GEO_SEMI_MAJOR"), name_clump: Some("GEO_SEMI_MAJOR"), unit: "pixel",
            comment_obj: Some("Geometric semi-major axis"), comment_clump: Some("Geometric semi-major axis"),
            kind: ColumnKind::Float, format: fmt_float(12, 4), deps: &[Gxx, Gyy, Gxy, NumAll, Gx, Gy],
        },
        GeoSemiMinor => meta! {
            name_obj: Some("GEO_SEMI_MINOR"), name_clump: Some("GEO_SEMI_MINOR"), unit: "pixel",
            comment_obj: Some("Geometric semi-minor axis"), comment_clump: Some("Geometric semi-minor axis"),
            kind: ColumnKind::Float, format: fmt_float(12, 4), deps: &[Gxx, Gyy, Gxy, NumAll, Gx, Gy],
        },
        GeoAxisRatio => meta! {
            name_obj: Some("GEO_AXIS_RATIO"), name_clump: Some("GEO_AXIS_RATIO"), unit: "frac",
            comment_obj: Some("Geometric semi-minor / semi-major"), comment_clump: Some("Geometric semi-minor / semi-major"),
            kind: ColumnKind::Float, format: fmt_float(10, 4), deps: &[Gxx, Gyy, Gxy, NumAll, Gx, Gy],
        },
        GeoPositionAngle => meta! {
            name_obj: Some("GEO_POSITION_ANGLE"), name_clump: Some("GEO_POSITION_ANGLE"), unit: "deg",
            comment_obj: Some("Geometric position angle"), comment_clump: Some("Geometric position angle"),
            kind: ColumnKind::Float, format: fmt_float(10, 4), deps: &[Gxx, Gyy, Gxy, NumAll, Gx, Gy],
        },

        SurfaceBrightness => meta! {
            name_obj: Some("SB"), name_clump: Some("SB"), unit: "mag/arcsec2",
            comment_obj: Some("Surface brightness"), comment_clump: Some("Surface brightness"),
            kind: ColumnKind::Float, format: fmt_float(10, 4), deps: &[Sum, Num], needs_wcs: true,
        },
        SurfaceBrightnessError => meta! {
            name_obj: Some("SB_ERR"), name_clump: Some("SB_ERR"), unit: "mag/arcsec2",
            comment_obj: Some("Surface brightness error"), comment_clump: Some("Surface brightness error"),
            kind: ColumnKind::Float, format: fmt_float(10, 4), deps: &[Sum, Num, SumVarPix, NumVarPix], needs_river: true, needs_wcs: true,
        },
        Magnitude => meta! {
            name_obj: Some("MAGNITUDE"), name_clump: Some("MAGNITUDE"), unit: "mag",
            comment_obj: Some("AB magnitude"), comment_clump: Some("AB magnitude"),
            kind: ColumnKind::Float, format: fmt_float(10, 4), deps: &[Sum, Num], needs_river: true,
        },
        MagnitudeError => meta! {
            name_obj: Some("MAGNITUDE_ERR"), name_clump: Some("MAGNITUDE_ERR"), unit: "mag",
            comment_obj: Some("AB magnitude error"), comment_clump: Some("AB magnitude error"),
            kind: ColumnKind::Float, format: fmt_float(10, 4), deps: &[Sum, Num, SumVarPix, NumVarPix], needs_river: true,
        },
        SignalToNoise => meta! {
            name_obj: Some("SN"), name_clump: Some("SN"), unit: "frac",
            comment_obj: Some("Signal to noise ratio"), comment_clump: Some("Signal to noise ratio"),
            kind: ColumnKind::Float, format: fmt_float(12, 4), deps: &[Sum, Num, SumVarPix, NumVarPix], needs_river: true,
        },

        MinValX => meta! {
            name_obj: Some("MIN_VAL_X"), name_clump: Some("MIN_VAL_X"), unit: "pixel",
            comment_obj: Some("Mean X of pixels tied for the minimum value"), comment_clump: Some("Mean X of pixels tied for the minimum value"),
            kind: ColumnKind::Float, format: fmt_float(12, 3), deps: &[MinVx, MinVNum],
        },
        MinValY => meta! {
            name_obj: Some("MIN_VAL_Y"), name_clump: Some("MIN_VAL_Y"), unit: "pixel",
            comment_obj: Some("Mean Y of pixels tied for the minimum value"), comment_clump: Some("Mean Y of pixels tied for the minimum value"),
            kind: ColumnKind::Float, format: fmt_float(12, 3), deps: &[MinVy, MinVNum],
        },
        MinValZ => meta! {
            name_obj: Some("MIN_VAL_Z"), name_clump: Some("MIN_VAL_Z"), unit: "pixel",
            comment_obj: Some("Mean Z of pixels tied for the minimum value"), comment_clump: Some("Mean Z of pixels tied for the minimum value"),
            kind: ColumnKind::Float, format: fmt_float(12, 3), deps: &[MinVz, MinVNum], dim: DimRestriction::ThreeDOnly,
        },
        MinValNum => meta! {
            name_obj: Some("MIN_VAL_NUM"), name_clump: Some("MIN_VAL_NUM"), unit: "count",
            comment_obj: Some("Number of pixels tied for the minimum value"), comment_clump: Some("Number of pixels tied for the minimum value"),
            kind: ColumnKind::Int, format: fmt_int(8), deps: &[MinVNum],
        },
        MaxValX => meta! {
            name_obj: Some("MAX_VAL_X"), name_clump: Some("MAX_VAL_X"), unit: "pixel",
            comment_obj: Some("Mean X of pixels tied for the maximum value"), comment_clump: Some("Mean X of pixels tied for the maximum value"),
            kind: ColumnKind::Float, format: fmt_float(12, 3), deps: &[MaxVx, MaxVNum],
        },
        MaxValY => meta! {
            name_obj: Some("MAX_VAL_Y"), name_clump: Some("MAX_VAL_Y"), unit: "pixel",
            comment_obj: Some("Mean Y of pixels tied for the maximum value"), comment_clump: Some("Mean Y of pixels tied for the maximum value"),
            kind: ColumnKind::Float, format: fmt_float(12, 3), deps: &[MaxVy, MaxVNum],
        },
        MaxValZ => meta! {
            name_obj: Some("MAX_VAL_Z"), name_clump: Some("MAX_VAL_Z"), unit: "pixel",
            comment_obj: Some("Mean Z of pixels tied for the maximum value"), comment_clump: Some("Mean Z of pixels tied for the maximum value"),
            kind: ColumnKind::Float, format: fmt_float(12, 3), deps: &[MaxVz, MaxVNum], dim: DimRestriction::ThreeDOnly,
        },
        MaxValNum => meta! {
            name_obj: Some("MAX_VAL_NUM"), name_clump: Some("MAX_VAL_NUM"), unit: "count",
            comment_obj: Some("Number of pixels tied for the maximum value"), comment_clump: Some("Number of pixels tied for the maximum value"),
            kind: ColumnKind::Int, format: fmt_int(8), deps: &[MaxVNum],
        },

        Median => meta! {
            name_obj: Some("MEDIAN"), name_clump: Some("MEDIAN"), unit: "counts",
            comment_obj: Some("Median pixel value"), comment_clump: Some("Median pixel value"),
            kind: ColumnKind::Float, format: fmt_float(14, 6), deps: &[Median], needs_order_pass: true,
        },
        Maximum => meta! {
            name_obj: Some("MAXIMUM"), name_clump: Some("MAXIMUM"), unit: "counts",
            comment_obj: Some("Mean of the top three pixel values"), comment_clump: Some("Mean of the top three pixel values"),
            kind: ColumnKind::Float, format: fmt_float(14, 6), deps: &[Maximum], needs_order_pass: true,
        },
        HalfSumRadius => meta! {
            name_obj: Some("HALF_SUM_RADIUS"), name_clump: Some("HALF_SUM_RADIUS"), unit: "pixel",
            comment_obj: Some("Radius enclosing half the total flux"), comment_clump: Some("Radius enclosing half the total flux"),
            kind: ColumnKind::Float, format: fmt_float(12, 4), deps: &[HalfSumNum], needs_order_pass: true,
        },
        HalfMaxRadius => meta! {
            name_obj: Some("HALF_MAX_RADIUS"), name_clump: Some("HALF_MAX_RADIUS"), unit: "pixel",
            comment_obj: Some("Radius enclosing pixels above half the maximum"), comment_clump: Some("Radius enclosing pixels above half the maximum"),
            kind: ColumnKind::Float, format: fmt_float(12, 4), deps: &[HalfMaxNum], needs_order_pass: true,
        },
        FracMax1Radius => meta! {
            name_obj: Some("FRAC_MAX1_RADIUS"), name_clump: Some("FRAC_MAX1_RADIUS"), unit: "pixel",
            comment_obj: Some("Radius enclosing pixels above fracmax[0] * maximum"), comment_clump: Some("Radius enclosing pixels above fracmax[0] * maximum"),
            kind: ColumnKind::Float, format: fmt_float(12, 4), deps: &[FracMax1Num], needs_order_pass: true,
        },
        FracMax1Num => meta! {
            name_obj: Some("FRAC_MAX1_NUM"), name_clump: Some("FRAC_MAX1_NUM"), unit: "count",
            comment_obj: Some("Pixels above fracmax[0] * maximum"), comment_clump: Some("Pixels above fracmax[0] * maximum"),
            kind: ColumnKind::Int, format: fmt_int(8), deps: &[FracMax1Num], needs_order_pass: true,
        },
        FracMax2Radius => meta! {
            name_obj: Some("FRAC_MAX2_RADIUS"), name_clump: Some("FRAC_MAX2_RADIUS"), unit: "pixel",
            comment_obj: Some("Radius enclosing pixels above fracmax[1] * maximum"), comment_clump: Some("Radius enclosing pixels above fracmax[1] * maximum"),
            kind: ColumnKind::Float, format: fmt_float(12, 4), deps: &[FracMax2Num], needs_order_pass: true,
        },
        FracMax2Num => meta! {
            name_obj: Some("FRAC_MAX2_NUM"), name_clump: Some("FRAC_MAX2_NUM"), unit: "count",
            comment_obj: Some("Pixels above fracmax[1] * maximum"), comment_clump: Some("Pixels above fracmax[1] * maximum"),
            kind: ColumnKind::Int, format: fmt_int(8), deps: &[FracMax2Num], needs_order_pass: true,
        },

        SigClipMean => meta! {
            name_obj: Some("SIGCLIP_MEAN"), name_clump: Some("SIGCLIP_MEAN"), unit: "counts",
            comment_obj: Some("Sigma-clipped mean"), comment_clump: Some("Sigma-clipped mean, river-subtracted"),
            kind: ColumnKind::Float, format: fmt_float(14, 6), deps: &[SigClipMean], needs_sigmaclip: true, needs_order_pass: true,
        },
        SigClipMedian => meta! {
            name_obj: Some("SIGCLIP_MEDIAN"), name_clump: Some("SIGCLIP_MEDIAN"), unit: "counts",
            comment_obj: Some("Sigma-clipped median"), comment_clump: Some("Sigma-clipped median, river-subtracted"),
            kind: ColumnKind::Float, format: fmt_float(14, 6), deps: &[SigClipMedian], needs_sigmaclip: true, needs_order_pass: true,
        },
        SigClipStd => meta! {
            name_obj: Some("SIGCLIP_STD"), name_clump: Some("SIGCLIP_STD"), unit: "counts",
            comment_obj: Some("Sigma-clipped standard deviation"), comment_clump: Some("Sigma-clipped standard deviation"),
            kind: ColumnKind::Float, format: fmt_float(14, 6), deps: &[SigClipStd], needs_sigmaclip: true, needs_order_pass: true,
        },
        SigClipNum => meta! {
            name_obj: Some("SIGCLIP_NUM"), name_clump: Some("SIGCLIP_NUM"), unit: "count",
            comment_obj: Some("Pixels surviving sigma-clipping"), comment_clump: Some("Pixels surviving sigma-clipping"),
            kind: ColumnKind::Int, format: fmt_int(8), deps: &[SigClipNum], needs_sigmaclip: true, needs_order_pass: true,
        },

        SumVariance => meta! {
            name_obj: Some("SUM_VAR"), name_clump: Some("SUM_VAR"), unit: "counts2",
            comment_obj: Some("Sum of per-pixel variance"), comment_clump: Some("Sum of per-pixel variance"),
            kind: ColumnKind::Float, format: fmt_float(14, 6), deps: &[SumVarPix, NumVarPix],
        },
        NumVariance => meta! {
            name_obj: Some("NUM_VAR"), name_clump: Some("NUM_VAR"), unit: "count",
            comment_obj: Some("Pixels contributing a variance sample"), comment_clump: Some("Pixels contributing a variance sample"),
            kind: ColumnKind::Int, format: fmt_int(8), deps: &[NumVarPix],
        },

        UpperLimitMag => meta! {
            name_obj: Some("UPPERLIMIT_MAG"), name_clump: Some("UPPERLIMIT_MAG"), unit: "mag",
            comment_obj: Some("Upper-limit magnitude"), comment_clump: Some("Upper-limit magnitude"),
            kind: ColumnKind::Float, format: fmt_float(10, 4), deps: &[UpperLimitB], needs_upperlimit: true,
        },
        UpperLimitSb => meta! {
            name_obj: Some("UPPERLIMIT_SB"), name_clump: Some("UPPERLIMIT_SB"), unit: "mag/arcsec2",
            comment_obj: Some("Upper-limit surface brightness"), comment_clump: Some("Upper-limit surface brightness"),
            kind: ColumnKind::Float, format: fmt_float(10, 4), deps: &[UpperLimitS], needs_wcs: true, needs_upperlimit: true,
        },
        UpperLimitQuantile => meta! {
            name_obj: Some("UPPERLIMIT_QUANTILE"), name_clump: Some("UPPERLIMIT_QUANTILE"), unit: "frac",
            comment_obj: Some("Upper-limit quantile"), comment_clump: Some("Upper-limit quantile"),
            kind: ColumnKind::Float, format: fmt_float(10, 4), deps: &[UpperLimitQ], needs_upperlimit: true,
        },
        UpperLimitSkew => meta! {
            name_obj: Some("UPPERLIMIT_SKEW"), name_clump: Some("UPPERLIMIT_SKEW"), unit: "frac",
            comment_obj: Some("Upper-limit skew"), comment_clump: Some("Upper-limit skew"),
            kind: ColumnKind::Float, format: fmt_float(10, 4), deps: &[UpperLimitSkew], needs_upperlimit: true,
        },

        RiverNum => meta! {
            name_obj: None, name_clump: Some("RIVER_NUM"), unit: "count",
            comment_obj: None, comment_clump: Some("Number of river pixels adjacent to this clump"),
            kind: ColumnKind::Int, format: fmt_int(8), deps: &[], needs_river: true,
        },
        RiverMean => meta! {
            name_obj: None, name_clump: Some("RIVER_MEAN"), unit: "counts",
            comment_obj: None, comment_clump: Some("Mean value of river pixels adjacent to this clump"),
            kind: ColumnKind::Float, format: fmt_float(14, 6), deps: &[], needs_river: true,
        },

        AreaInSlice => meta! {
            name_obj: Some("AREA_IN_SLICE"), name_clump: Some("AREA_IN_SLICE"), unit: "count",
            comment_obj: Some("Per-slice pixel count"), comment_clump: Some("Per-slice pixel count"),
            kind: ColumnKind::VectorFloat, format: fmt_int(8), deps: &[], dim: DimRestriction::ThreeDOnly, needs_vector_pass: true,
        },
        SumInSlice => meta! {
            name_obj: Some("SUM_IN_SLICE"), name_clump: Some("SUM_IN_SLICE"), unit: "counts",
            comment_obj: Some("Per-slice value sum"), comment_clump: Some("Per-slice value sum"),
            kind: ColumnKind::VectorFloat, format: fmt_float(14, 6), deps: &[], dim: DimRestriction::ThreeDOnly, needs_vector_pass: true,
        },
        SumErrorInSlice => meta! {
            name_obj: Some("SUM_ERR_IN_SLICE"), name_clump: Some("SUM_ERR_IN_SLICE"), unit: "counts",
            comment_obj: Some("Per-slice sqrt(variance)"), comment_clump: Some("Per-slice sqrt(variance)"),
            kind: ColumnKind::VectorFloat, format: fmt_float(14, 6), deps: &[], dim: DimRestriction::ThreeDOnly, needs_vector_pass: true,
        },
    }
}

/// Per-pass dependency flags plus the allocated output columns, as produced
/// by `define_and_allocate`.
pub struct Registration {
    pub object_columns: Vec<Column>,
    pub clump_columns: Option<Vec<Column>>,
    pub oiflag: SlotMask,
    pub ciflag: SlotMask,
    pub needs_river: bool,
    pub needs_bbox: bool,
    pub needs_order_pass: bool,
    pub needs_vector_pass: bool,
    pub needs_wcs: bool,
    pub pixel_area_arcsec2: f64,
    /// For each requested WCS-world column (`RA`/`DEC`/`W1`/`W2`), the pixel
    /// dimension (0 = X, 1 = Y) whose weighted/geometric centre feeds it.
    /// `W1`/`W2` are fixed to axis 0/1; `RA`/`DEC` resolve dynamically
    /// against `WcsMeta::axis_types` (spec §4.1 "Dispatch rules for aliased
    /// codes"). Consumed by the driver's single batched pixel->world call
    /// (spec §4.5 post-processing step 1).
    pub wcs_axis_for: Vec<(ColumnCode, usize)>,
    /// True when at least one requested column (object or clump) pulls from
    /// the `UPPERLIMIT_*` slots, i.e. the driver must invoke the upper-limit
    /// hook for every row.
    pub needs_upperlimit: bool,
    pub warnings: Vec<Warning>,
}

fn empty_mask() -> SlotMask {
    [false; OI_SLOT_COUNT]
}

fn apply_deps(mask: &mut SlotMask, deps: &[Slot]) {
    for &slot in deps {
        mask[slot as usize] = true;
    }
}

/// Implements spec §4.1 `define_and_allocate`.
pub fn define_and_allocate(
    requested: &[ColumnCode],
    ndim: usize,
    wcs: Option<&WcsMeta>,
    sigmaclip: Option<(f32, f32)>,
    upperlimit: bool,
    num_objects: usize,
    num_clumps: Option<usize>,
) -> Result<Registration, CatalogError> {
    let mut oiflag = empty_mask();
    let mut ciflag = empty_mask();
    let mut needs_river = false;
    let mut needs_bbox = false;
    let mut needs_order_pass = false;
    let mut needs_vector_pass = false;
    let mut needs_wcs = false;
    let mut needs_upperlimit = false;
    let mut warnings = Vec::new();

    let mut object_columns = Vec::with_capacity(requested.len());
    let mut clump_columns = num_clumps.map(|_| Vec::with_capacity(requested.len()));

    let mut pixel_area_arcsec2 = 0.0;
    let mut wcs_axis_for = Vec::new();

    for &code in requested {
        let m = meta_for(code);

        if let Some(DimRestriction::ThreeDOnly) = m.dim_restriction {
            if ndim != 3 {
                return Err(CatalogError::DimensionMismatch { column: code, expected: "3D", got: ndim });
            }
        }

        if m.needs_sigmaclip && sigmaclip.is_none() {
            return Err(CatalogError::MissingSigmaClipParams { column: code });
        }
        if m.needs_upperlimit && !upperlimit {
            return Err(CatalogError::MissingUpperLimit { column: code });
        }
        needs_upperlimit |= m.needs_upperlimit;
        if m.needs_wcs {
            let wcs = wcs.ok_or(CatalogError::MissingWcs { column: code })?;
            if pixel_area_arcsec2 == 0.0 {
                pixel_area_arcsec2 = wcs.pixel_area_arcsec2;
            }
            needs_wcs = true;
        }
        match code {
            ColumnCode::Ra | ColumnCode::Dec => {
                let wcs = wcs.ok_or(CatalogError::MissingWcs { column: code })?;
                let axis = resolve_ra_dec_alias(code, wcs)?;
                wcs_axis_for.push((code, axis));
            }
            ColumnCode::W1 => wcs_axis_for.push((code, 0)),
            ColumnCode::W2 => wcs_axis_for.push((code, 1)),
            _ => {}
        }

        if m.name_obj.is_some() {
            apply_deps(&mut oiflag, m.oi_deps);
            needs_order_pass |= m.needs_order_pass;
            needs_vector_pass |= m.needs_vector_pass;
            object_columns.push(allocate_column(code, &m, false, num_objects));
        }

        if let Some(clump_cols) = clump_columns.as_mut() {
            if m.name_clump.is_some() {
                apply_deps(&mut ciflag, m.oi_deps);
                needs_river |= m.needs_river;
                needs_bbox |= m.needs_bbox;
                needs_order_pass |= m.needs_order_pass;
                needs_vector_pass |= m.needs_vector_pass;
                clump_cols.push(allocate_column(code, &m, true, num_clumps.unwrap_or(0)));
            } else {
                warnings.push(Warning::new(format!(
                    "column {code:?} has no meaning for clumps and was dropped from the clump catalog"
                )));
            }
        } else if m.name_obj.is_none() {
            warnings.push(Warning::new(format!(
                "column {code:?} is clump-only but no clump label image was supplied; dropped"
            )));
        }
    }

    Ok(Registration {
        object_columns,
        clump_columns,
        oiflag,
        ciflag,
        needs_river,
        needs_bbox,
        needs_order_pass,
        needs_vector_pass,
        needs_wcs,
        pixel_area_arcsec2,
        wcs_axis_for,
        needs_upperlimit,
        warnings,
    })
}

fn allocate_column(code: ColumnCode, m: &ColumnMeta, clump: bool, len: usize) -> Column {
    let name = if clump { m.name_clump } else { m.name_obj }.unwrap_or("UNKNOWN").to_string();
    let comment = if clump { m.comment_clump } else { m.comment_obj }.unwrap_or("").to_string();
    let data = match m.kind {
        ColumnKind::Int => ColumnData::I64(vec![0; len]),
        ColumnKind::Float => ColumnData::F32(vec![0.0; len]),
        ColumnKind::VectorFloat => ColumnData::VecF32(vec![Vec::new(); len]),
    };
    Column { code, name, unit: m.unit.to_string(), comment, format: m.format, data }
}

/// RA/DEC alias resolution (spec §4.1 "Dispatch rules for aliased codes"):
/// match the axis-type string case-insensitively against "RA"/"DEC" and
/// resolve to the corresponding W-column axis index.
/// The coordinate-type token of a FITS `CTYPEn`-style axis string: the part
/// before the first `-` (e.g. `"RA"` out of `"RA---TAN"`). FITS pads the
/// coordinate type to 4 characters with trailing dashes before the
/// projection code, so comparing the whole string against `"RA"`/`"DEC"`
/// would never match a real axis; comparing this prefix is what "exact
/// match" means against that convention.
fn axis_coord_type(axis: &str) -> &str {
    axis.split('-').next().unwrap_or(axis)
}

fn resolve_ra_dec_alias(code: ColumnCode, wcs: &WcsMeta) -> Result<usize, CatalogError> {
    let needle = match code {
        ColumnCode::Ra => "RA",
        ColumnCode::Dec => "DEC",
        _ => unreachable!("resolve_ra_dec_alias called with non-alias column"),
    };
    wcs.axis_types
        .iter()
        .position(|axis| axis_coord_type(axis).eq_ignore_ascii_case(needle))
        .ok_or(CatalogError::UnknownWcsAxis { alias: if code == ColumnCode::Ra { "RA" } else { "DEC" } })
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_types::ColumnCode as CC;

    #[test]
    fn simple_object_columns_allocate_correct_lengths() {
        let reg = define_and_allocate(&[CC::Area, CC::Sum, CC::X, CC::Y], 2, None, None, false, 3, None).unwrap();
        assert_eq!(reg.object_columns.len(), 4);
        for col in &reg.object_columns {
            assert_eq!(col.data.len(), 3);
        }
        assert!(reg.clump_columns.is_none());
        assert!(reg.oiflag[Slot::Num as usize]);
        assert!(reg.oiflag[Slot::Vx as usize]);
    }

    #[test]
    fn missing_wcs_for_ra_is_an_error() {
        let err = define_and_allocate(&[CC::Ra], 2, None, None, false, 1, None).unwrap_err();
        assert_eq!(err, CatalogError::MissingWcs { column: CC::Ra });
    }

    #[test]
    fn three_d_only_column_rejected_in_2d() {
        let err = define_and_allocate(&[CC::AreaInSlice], 2, None, None, false, 1, None).unwrap_err();
        assert!(matches!(err, CatalogError::DimensionMismatch { .. }));
    }

    #[test]
    fn sigma_clip_column_without_params_is_an_error() {
        let err = define_and_allocate(&[CC::SigClipMean], 2, None, None, false, 1, None).unwrap_err();
        assert_eq!(err, CatalogError::MissingSigmaClipParams { column: CC::SigClipMean });
    }

    #[test]
    fn clump_only_column_without_clump_image_is_a_warning_not_an_error() {
        let reg = define_and_allocate(&[CC::RiverNum], 2, None, None, false, 1, None).unwrap();
        assert!(reg.object_columns.is_empty());
        assert_eq!(reg.warnings.len(), 1);
    }
}
