//! Column Filler (C4, spec §4.4): turns one object's or clump's raw
//! accumulator block into the final value for every requested column,
//! dispatching on the column code.

use catalog_types::ColumnCode;

use crate::accumulators::{BBox, ClumpAccum, ObjectAccum, RiverAccum, Slot, VectorAccum};

/// Formula inputs that don't live in the accumulator slots (spec §6 `params`).
#[derive(Debug, Clone, Copy)]
pub struct FillContext {
    pub zeropoint: f64,
    pub cpscorr: f64,
    pub spatial_resolution: f64,
    pub pixel_area_arcsec2: f64,
}

/// A filled value before it's cast into the column's storage type.
pub enum FillOutcome {
    Int(i64),
    Float(f32),
    Vector(Vec<f32>),
}

const LN10: f64 = std::f64::consts::LN_10;

fn mag_from_flux(flux: f64, zeropoint: f64) -> f64 {
    if flux > 0.0 {
        zeropoint - 2.5 * flux.log10()
    } else {
        f64::NAN
    }
}

/// Weighted or geometric centre with the spec's fallback rule: use the
/// value-weighted sum when its weight is positive, else the geometric mean.
fn centre(weighted_sum: f64, weight: f64, geo_sum: f64, geo_count: f64) -> f64 {
    if weight > 0.0 {
        weighted_sum / weight
    } else if geo_count > 0.0 {
        geo_sum / geo_count
    } else {
        f64::NAN
    }
}

/// Second-order shape (spec §4.4 "Second-order"): returns
/// `(semi_major, semi_minor, axis_ratio, position_angle_deg)`, or `None`
/// when the weight is non-positive (no usable second moment).
fn shape_from_moments(sxx: f64, syy: f64, sxy: f64, weight: f64, cx: f64, cy: f64, kx: f64, ky: f64) -> Option<(f64, f64, f64, f64)> {
    if weight <= 0.0 {
        return None;
    }
    let dx = cx - kx;
    let dy = cy - ky;
    let xx = sxx / weight - dx * dx;
    let yy = syy / weight - dy * dy;
    let xy = sxy / weight - dx * dy;

    let half_sum = (xx + yy) / 2.0;
    let half_diff = (xx - yy) / 2.0;
    let disc = (half_diff * half_diff + xy * xy).sqrt();

    let semi_major = (half_sum + disc).max(0.0).sqrt();
    let semi_minor = (half_sum - disc).max(0.0).sqrt();
    let axis_ratio = if semi_major > 0.0 { semi_minor / semi_major } else { f64::NAN };
    let position_angle = 0.5 * (2.0 * xy).atan2(xx - yy).to_degrees();
    Some((semi_major, semi_minor, axis_ratio, position_angle))
}

fn radius_from_count(count: f64, axis_ratio: f64) -> f64 {
    let ratio = if axis_ratio.is_finite() && axis_ratio > 0.0 { axis_ratio } else { 1.0 };
    (count / (ratio * std::f64::consts::PI)).sqrt()
}

fn signal_to_noise(sum: f64, num: f64, sumvar: f64, numvar: f64, cpscorr: f64, river_mean: f64, river_var_mean: f64) -> f64 {
    if num <= 0.0 {
        return f64::NAN;
    }
    let i = sum / num;
    let v = if numvar > 0.0 { sumvar / numvar } else { f64::NAN };
    let denom = ((v + river_var_mean) * cpscorr).sqrt();
    if denom > 0.0 {
        (i - river_mean) / denom
    } else {
        f64::NAN
    }
}

fn mag_error(sn: f64) -> f64 {
    if sn > 0.0 {
        2.5 / (sn * LN10)
    } else {
        f64::NAN
    }
}

/// Shared accessor over either an `ObjectAccum` or `ClumpAccum`'s slot block
/// plus whatever clump-only state (river, bbox) is available for the row.
struct Row<'a> {
    get: Box<dyn Fn(Slot) -> f64 + 'a>,
    shift: (f64, f64, f64),
    river: Option<&'a RiverAccum>,
    bbox: Option<&'a BBox>,
}

fn fill_common(code: ColumnCode, row: &Row, ctx: &FillContext) -> FillOutcome {
    use Slot::*;
    let g = |s: Slot| (row.get)(s);
    let (kx, ky, _kz) = row.shift;
    let river_mean = row.river.map(RiverAccum::mean).unwrap_or(0.0);
    let river_var_mean = row.river.map(RiverAccum::var_mean).unwrap_or(0.0);

    match code {
        ColumnCode::ObjId | ColumnCode::HostObjId => FillOutcome::Int(0), // driver fills these directly

        ColumnCode::Area => FillOutcome::Int(g(Num) as i64),
        ColumnCode::AreaArcsec2 => FillOutcome::Float((g(Num) * ctx.pixel_area_arcsec2) as f32),
        ColumnCode::AreaXY => FillOutcome::Int(g(NumXY) as i64),

        // NaN when the object has no non-blank pixels (spec §8 NaN handling),
        // not the accumulator's zero-initialised rest state.
        ColumnCode::Sum => FillOutcome::Float(if g(Num) > 0.0 { g(Sum) as f32 } else { f32::NAN }),
        ColumnCode::SumNoRiver => {
            if g(Num) <= 0.0 {
                FillOutcome::Float(f32::NAN)
            } else {
                let subtract = river_mean * g(Num);
                FillOutcome::Float((g(Sum) - subtract) as f32)
            }
        }
        ColumnCode::Mean => FillOutcome::Float(if g(Num) > 0.0 { (g(Sum) / g(Num)) as f32 } else { f32::NAN }),

        ColumnCode::X | ColumnCode::Ra | ColumnCode::W1 => {
            FillOutcome::Float(centre(g(Vx), g(SumWht), g(Gx), g(NumAll)) as f32)
        }
        ColumnCode::Y | ColumnCode::Dec | ColumnCode::W2 => {
            FillOutcome::Float(centre(g(Vy), g(SumWht), g(Gy), g(NumAll)) as f32)
        }
        ColumnCode::Z => FillOutcome::Float(centre(g(Vz), g(SumWht), g(Gz), g(NumAll)) as f32),
        ColumnCode::GeoX => FillOutcome::Float(if g(NumAll) > 0.0 { (g(Gx) / g(NumAll)) as f32 } else { f32::NAN }),
        ColumnCode::GeoY => FillOutcome::Float(if g(NumAll) > 0.0 { (g(Gy) / g(NumAll)) as f32 } else { f32::NAN }),
        ColumnCode::GeoZ => FillOutcome::Float(if g(NumAll) > 0.0 { (g(Gz) / g(NumAll)) as f32 } else { f32::NAN }),
        // Reproduces the source registry's fall-through bug (spec §9 Open
        // Question): this code shares MINVALX's dependencies *and* its
        // filler output, rather than computing a geometric Z centre.
        ColumnCode::ClumpsGeoZ => {
            FillOutcome::Float(if g(MinVNum) > 0.0 { (g(MinVx) / g(MinVNum)) as f32 } else { f32::NAN })
        }

        ColumnCode::SemiMajor | ColumnCode::SemiMinor | ColumnCode::AxisRatio | ColumnCode::PositionAngle => {
            let cx = centre(g(Vx), g(SumWht), g(Gx), g(NumAll));
            let cy = centre(g(Vy), g(SumWht), g(Gy), g(NumAll));
            let shape = shape_from_moments(g(Vxx), g(Vyy), g(Vxy), g(SumWht), cx, cy, kx, ky);
            let v = match (code, shape) {
                (ColumnCode::SemiMajor, Some((a, ..))) => a,
                (ColumnCode::SemiMinor, Some((_, b, ..))) => b,
                (ColumnCode::AxisRatio, Some((_, _, r, _))) => r,
                (ColumnCode::PositionAngle, Some((.., p))) => p,
                _ => f64::NAN,
            };
            FillOutcome::Float(v as f32)
        }
        ColumnCode::GeoSemiMajor | ColumnCode::GeoSemiMinor | ColumnCode::GeoAxisRatio | ColumnCode::GeoPositionAngle => {
            let cx = if g(NumAll) > 0.0 { g(Gx) / g(NumAll) } else { f64::NAN };
            let cy = if g(NumAll) > 0.0 { g(Gy) / g(NumAll) } else { f64::NAN };
            let shape = shape_from_moments(g(Gxx), g(Gyy), g(Gxy), g(NumAll), cx, cy, kx, ky);
            let v = match (code, shape) {
                (ColumnCode::GeoSemiMajor, Some((a, ..))) => a,
                (ColumnCode::GeoSemiMinor, Some((_, b, ..))) => b,
                (ColumnCode::GeoAxisRatio, Some((_, _, r, _))) => r,
                (ColumnCode::GeoPositionAngle, Some((.., p))) => p,
                _ => f64::NAN,
            };
            FillOutcome::Float(v as f32)
        }

        ColumnCode::SurfaceBrightness => {
            let mag = mag_from_flux(g(Sum), ctx.zeropoint);
            let v = if mag.is_finite() && g(Num) > 0.0 && ctx.pixel_area_arcsec2 > 0.0 {
                mag + 2.5 * (g(Num) * ctx.pixel_area_arcsec2).log10()
            } else {
                f64::NAN
            };
            FillOutcome::Float(v as f32)
        }
        ColumnCode::SurfaceBrightnessError => {
            let sn = signal_to_noise(g(Sum), g(Num), g(SumVarPix), g(NumVarPix), ctx.cpscorr, river_mean, river_var_mean);
            let mag_err = mag_error(sn);
            let v = if g(Num) > 0.0 {
                mag_err + 2.5 * ctx.spatial_resolution / (LN10 * g(Num))
            } else {
                f64::NAN
            };
            FillOutcome::Float(v as f32)
        }
        ColumnCode::Magnitude => FillOutcome::Float(mag_from_flux(g(Sum) - river_mean * g(Num), ctx.zeropoint) as f32),
        ColumnCode::MagnitudeError => {
            let sn = signal_to_noise(g(Sum), g(Num), g(SumVarPix), g(NumVarPix), ctx.cpscorr, river_mean, river_var_mean);
            FillOutcome::Float(mag_error(sn) as f32)
        }
        ColumnCode::SignalToNoise => {
            let sn = signal_to_noise(g(Sum), g(Num), g(SumVarPix), g(NumVarPix), ctx.cpscorr, river_mean, river_var_mean);
            FillOutcome::Float(sn as f32)
        }

        ColumnCode::MinValX => FillOutcome::Float(if g(MinVNum) > 0.0 { (g(MinVx) / g(MinVNum)) as f32 } else { f32::NAN }),
        ColumnCode::MinValY => FillOutcome::Float(if g(MinVNum) > 0.0 { (g(MinVy) / g(MinVNum)) as f32 } else { f32::NAN }),
        ColumnCode::MinValZ => FillOutcome::Float(if g(MinVNum) > 0.0 { (g(MinVz) / g(MinVNum)) as f32 } else { f32::NAN }),
        ColumnCode::MinValNum => FillOutcome::Int(g(MinVNum) as i64),
        ColumnCode::MaxValX => FillOutcome::Float(if g(MaxVNum) > 0.0 { (g(MaxVx) / g(MaxVNum)) as f32 } else { f32::NAN }),
        ColumnCode::MaxValY => FillOutcome::Float(if g(MaxVNum) > 0.0 { (g(MaxVy) / g(MaxVNum)) as f32 } else { f32::NAN }),
        ColumnCode::MaxValZ => FillOutcome::Float(if g(MaxVNum) > 0.0 { (g(MaxVz) / g(MaxVNum)) as f32 } else { f32::NAN }),
        ColumnCode::MaxValNum => FillOutcome::Int(g(MaxVNum) as i64),

        ColumnCode::Median => FillOutcome::Float(g(Median) as f32),
        ColumnCode::Maximum => FillOutcome::Float(g(Maximum) as f32),
        ColumnCode::HalfSumRadius => {
            let cx = centre(g(Vx), g(SumWht), g(Gx), g(NumAll));
            let cy = centre(g(Vy), g(SumWht), g(Gy), g(NumAll));
            let shape = shape_from_moments(g(Vxx), g(Vyy), g(Vxy), g(SumWht), cx, cy, kx, ky);
            let ratio = shape.map(|(_, _, r, _)| r).unwrap_or(1.0);
            FillOutcome::Float(radius_from_count(g(HalfSumNum), ratio) as f32)
        }
        ColumnCode::HalfMaxRadius => {
            let cx = centre(g(Vx), g(SumWht), g(Gx), g(NumAll));
            let cy = centre(g(Vy), g(SumWht), g(Gy), g(NumAll));
            let shape = shape_from_moments(g(Vxx), g(Vyy), g(Vxy), g(SumWht), cx, cy, kx, ky);
            let ratio = shape.map(|(_, _, r, _)| r).unwrap_or(1.0);
            FillOutcome::Float(radius_from_count(g(HalfMaxNum), ratio) as f32)
        }
        ColumnCode::FracMax1Radius => {
            let cx = centre(g(Vx), g(SumWht), g(Gx), g(NumAll));
            let cy = centre(g(Vy), g(SumWht), g(Gy), g(NumAll));
            let shape = shape_from_moments(g(Vxx), g(Vyy), g(Vxy), g(SumWht), cx, cy, kx, ky);
            let ratio = shape.map(|(_, _, r, _)| r).unwrap_or(1.0);
            FillOutcome::Float(radius_from_count(g(FracMax1Num), ratio) as f32)
        }
        ColumnCode::FracMax1Num => FillOutcome::Int(g(FracMax1Num) as i64),
        ColumnCode::FracMax2Radius => {
            let cx = centre(g(Vx), g(SumWht), g(Gx), g(NumAll));
            let cy = centre(g(Vy), g(SumWht), g(Gy), g(NumAll));
            let shape = shape_from_moments(g(Vxx), g(Vyy), g(Vxy), g(SumWht), cx, cy, kx, ky);
            let ratio = shape.map(|(_, _, r, _)| r).unwrap_or(1.0);
            FillOutcome::Float(radius_from_count(g(FracMax2Num), ratio) as f32)
        }
        ColumnCode::FracMax2Num => FillOutcome::Int(g(FracMax2Num) as i64),

        ColumnCode::SigClipMean => FillOutcome::Float(g(SigClipMean) as f32),
        ColumnCode::SigClipMedian => FillOutcome::Float(g(SigClipMedian) as f32),
        ColumnCode::SigClipStd => FillOutcome::Float(g(SigClipStd) as f32),
        ColumnCode::SigClipNum => FillOutcome::Int(g(SigClipNum) as i64),

        ColumnCode::SumVariance => FillOutcome::Float(g(SumVarPix) as f32),
        ColumnCode::NumVariance => FillOutcome::Int(g(NumVarPix) as i64),

        ColumnCode::UpperLimitMag => FillOutcome::Float(mag_from_flux(g(UpperLimitB), ctx.zeropoint) as f32),
        ColumnCode::UpperLimitSb => {
            let mag = mag_from_flux(g(UpperLimitS), ctx.zeropoint);
            let v = if mag.is_finite() && g(Num) > 0.0 && ctx.pixel_area_arcsec2 > 0.0 {
                mag + 2.5 * (g(Num) * ctx.pixel_area_arcsec2).log10()
            } else {
                f64::NAN
            };
            FillOutcome::Float(v as f32)
        }
        ColumnCode::UpperLimitQuantile => FillOutcome::Float(g(UpperLimitQ) as f32),
        ColumnCode::UpperLimitSkew => FillOutcome::Float(g(UpperLimitSkew) as f32),

        ColumnCode::RiverNum => FillOutcome::Int(row.river.map(|r| r.num as i64).unwrap_or(0)),
        ColumnCode::RiverMean => FillOutcome::Float(river_mean as f32),

        ColumnCode::AreaInSlice | ColumnCode::SumInSlice | ColumnCode::SumErrorInSlice => {
            // Vector columns are filled by `fill_vector`, not here.
            FillOutcome::Vector(Vec::new())
        }
    }
}

/// Fills one object row's value for `code`.
pub fn fill_object(code: ColumnCode, oi: &ObjectAccum, ctx: &FillContext) -> FillOutcome {
    let row = Row { get: Box::new(|s| oi.get(s)), shift: oi.shift, river: None, bbox: None };
    fill_common(code, &row, ctx)
}

/// Fills one clump row's value for `code`. `river` is the clump's own
/// boundary statistics (spec §9: the clump STD-style formulas must read the
/// *clump's* accumulators, never the host object's).
pub fn fill_clump(code: ColumnCode, ci: &ClumpAccum, ctx: &FillContext) -> FillOutcome {
    let row = Row { get: Box::new(|s| ci.get(s)), shift: ci.shift, river: Some(&ci.river), bbox: Some(&ci.bbox) };
    fill_common(code, &row, ctx)
}

/// Vector-column filler (spec §4.4 "Vector columns"): casts the per-slice
/// accumulator to the target column type; error-in-slice columns emit
/// `sqrt(variance)` and fall back to NaN when the slice count is zero.
pub fn fill_vector(code: ColumnCode, vector: &VectorAccum) -> Vec<f32> {
    match code {
        ColumnCode::AreaInSlice => vector.num.iter().map(|&v| v as f32).collect(),
        ColumnCode::SumInSlice => vector.sum.iter().map(|&v| v as f32).collect(),
        ColumnCode::SumErrorInSlice => vector
            .sum_var
            .iter()
            .zip(vector.num.iter())
            .map(|(&var, &n)| if n > 0.0 { var.sqrt() as f32 } else { f32::NAN })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulators::ObjectAccum;

    fn ctx() -> FillContext {
        FillContext { zeropoint: 25.0, cpscorr: 1.0, spatial_resolution: 0.0, pixel_area_arcsec2: 1.0 }
    }

    #[test]
    fn area_and_mean_from_raw_slots() {
        let mut oi = ObjectAccum::new((0.0, 0.0, 0.0));
        oi.set(Slot::Num, 25.0);
        oi.set(Slot::Sum, 250.0);
        match fill_object(ColumnCode::Area, &oi, &ctx()) {
            FillOutcome::Int(v) => assert_eq!(v, 25),
            _ => panic!("expected int"),
        }
        match fill_object(ColumnCode::Mean, &oi, &ctx()) {
            FillOutcome::Float(v) => assert_eq!(v, 10.0),
            _ => panic!("expected float"),
        }
    }

    #[test]
    fn magnitude_is_nan_for_nonpositive_flux() {
        let oi = ObjectAccum::new((0.0, 0.0, 0.0));
        match fill_object(ColumnCode::Magnitude, &oi, &ctx()) {
            FillOutcome::Float(v) => assert!(v.is_nan()),
            _ => panic!("expected float"),
        }
    }

    #[test]
    fn weighted_centre_falls_back_to_geometric() {
        let mut oi = ObjectAccum::new((0.0, 0.0, 0.0));
        oi.set(Slot::Gx, 9.0);
        oi.set(Slot::NumAll, 3.0);
        match fill_object(ColumnCode::X, &oi, &ctx()) {
            FillOutcome::Float(v) => assert_eq!(v, 3.0),
            _ => panic!("expected float"),
        }
    }
}
