//! Pass Engine (C3, spec §4.3): the streaming walks over an object's (and,
//! for clumps, its sub-regions') labeled pixels. Four passes, run in order
//! by the driver for each object: `parse_objects`, the nested
//! `parse_vector_dim3` spectrum sweep, `parse_clumps`, and the order-based
//! pass (`collect_object_values` + `order_stats_into`).
//!
//! Resolved Open Question (spec §9 left this ambiguous; recorded here and
//! in DESIGN.md): the projection buffer collapses the spectral (Z) axis,
//! not the glossary's literal "(y,z) columns" wording — that reading is the
//! only one consistent with `AREAXY`/`NUMXY` naming an X-Y sky-plane area.

use catalog_types::{Image, LabelImage, Tile};

use crate::accumulators::{ClumpAccum, ObjectAccum, Slot, VectorAccum};
use crate::inputs::{NoiseLookup, SkyLookup};
use crate::registry::SlotMask;

/// Read-only handles shared by every pass for one object (spec §5 "Shared
/// resources, read-only, shared").
pub struct PassInputs<'a> {
    pub values: &'a Image,
    pub objects: &'a LabelImage,
    pub clumps: Option<&'a LabelImage>,
    pub sky: SkyLookup<'a>,
    pub noise: NoiseLookup<'a>,
}

/// The 2D projection of a 3D object onto its X-Y footprint (glossary
/// "Projection buffer"): 0 = untouched, 1 = labeled in some slice, 2 =
/// labeled and non-blank in some slice. Sized `tile.size[0] x tile.size[1]`.
pub struct ProjectionBuffer {
    data: Vec<u8>,
    dx: usize,
    dy: usize,
}

impl ProjectionBuffer {
    pub fn new(dx: usize, dy: usize) -> Self {
        ProjectionBuffer { data: vec![0u8; dx.max(1) * dy.max(1)], dx: dx.max(1), dy: dy.max(1) }
    }

    #[inline]
    fn idx(&self, lx: usize, ly: usize) -> usize {
        lx + self.dx * ly
    }

    #[inline]
    fn mark_label(&mut self, lx: usize, ly: usize) {
        let i = self.idx(lx, ly);
        if self.data[i] < 1 {
            self.data[i] = 1;
        }
    }

    #[inline]
    fn mark_nonblank(&mut self, lx: usize, ly: usize) {
        let i = self.idx(lx, ly);
        self.data[i] = 2;
    }

    #[inline]
    pub fn status(&self, lx: usize, ly: usize) -> u8 {
        self.data[self.idx(lx, ly)]
    }

    /// `(NUMALLXY, NUMXY)`: count of touched, and of non-blank-touched, cells.
    pub fn counts(&self) -> (f64, f64) {
        let mut all = 0.0;
        let mut nonblank = 0.0;
        for &b in &self.data {
            if b >= 1 {
                all += 1.0;
            }
            if b == 2 {
                nonblank += 1.0;
            }
        }
        (all, nonblank)
    }
}

/// First pass (spec §4.3.1): walk every labeled pixel of the object's tile.
/// Updates `oi` conditional on `oiflag`, fills `projection`, and — when a
/// clump label image is present — accumulates the `C_*` union-of-clumps
/// fingerprint slots (step 10).
pub fn parse_objects(
    tile: &Tile,
    object_id: u32,
    inputs: &PassInputs,
    oiflag: &SlotMask,
    oi: &mut ObjectAccum,
    projection: &mut ProjectionBuffer,
) {
    let dims = inputs.values.dims;
    let (kx, ky) = (oi.shift.0, oi.shift.1);

    for (flat_start, len, ly, lz) in tile.strips(dims) {
        for lx in 0..len {
            let gi = flat_start + lx;
            if inputs.objects.data[gi] != object_id {
                continue;
            }

            oi.add(Slot::NumAll, 1.0);
            projection.mark_label(lx, ly);

            let value = inputs.values.data[gi];
            let blank = value.is_nan();
            let (fx, fy, fz) = tile.fits_coord(lx, ly, lz);

            if !blank {
                oi.add(Slot::Num, 1.0);
                projection.mark_nonblank(lx, ly);
            }

            if oiflag[Slot::Gx as usize] {
                oi.add(Slot::Gx, fx);
            }
            if oiflag[Slot::Gy as usize] {
                oi.add(Slot::Gy, fy);
            }
            if oiflag[Slot::Gz as usize] {
                oi.add(Slot::Gz, fz);
            }
            if oiflag[Slot::Gxx as usize] || oiflag[Slot::Gyy as usize] || oiflag[Slot::Gxy as usize] {
                let (scx, scy) = (fx - kx, fy - ky);
                oi.add(Slot::Gxx, scx * scx);
                oi.add(Slot::Gyy, scy * scy);
                oi.add(Slot::Gxy, scx * scy);
            }

            if !blank && value > 0.0 {
                let v = value as f64;
                if oiflag[Slot::SumWht as usize] || oiflag[Slot::Vx as usize] || oiflag[Slot::Vy as usize] {
                    oi.add(Slot::SumWht, v);
                    oi.add(Slot::Vx, v * fx);
                    oi.add(Slot::Vy, v * fy);
                    oi.add(Slot::Vz, v * fz);
                }
                if oiflag[Slot::Vxx as usize] || oiflag[Slot::Vyy as usize] || oiflag[Slot::Vxy as usize] {
                    let (scx, scy) = (fx - kx, fy - ky);
                    oi.add(Slot::Vxx, v * scx * scx);
                    oi.add(Slot::Vyy, v * scy * scy);
                    oi.add(Slot::Vxy, v * scx * scy);
                }
            }

            if !blank {
                let v = value as f64;
                oi.add(Slot::Sum, v);
                oi.add(Slot::SumP2, v * v);
                oi.update_min(v, (fx, fy, fz));
                oi.update_max(v, (fx, fy, fz));
            }

            let (gx, gy, gz) = (tile.start[0] + lx, tile.start[1] + ly, tile.start[2] + lz);

            if oiflag[Slot::SumSky as usize] {
                if let Some(sky) = inputs.sky.value_at(gx, gy, gz) {
                    oi.add(Slot::NumSky, 1.0);
                    oi.add(Slot::SumSky, sky);
                }
            }
            if oiflag[Slot::SumVarPix as usize] {
                if let Some(var) = inputs.noise.variance_at(gx, gy, gz) {
                    oi.add(Slot::NumVarPix, 1.0);
                    oi.add(Slot::SumVarPix, var);
                }
            }

            if let Some(clumps) = inputs.clumps {
                if clumps.data[gi] > 0 {
                    oi.add(Slot::CNumAll, 1.0);
                    oi.add(Slot::CGx, fx);
                    oi.add(Slot::CGy, fy);
                    oi.add(Slot::CGz, fz);
                    if !blank {
                        let v = value as f64;
                        oi.add(Slot::CNum, 1.0);
                        oi.add(Slot::CSum, v);
                        if value > 0.0 {
                            oi.add(Slot::CNumWht, 1.0);
                            oi.add(Slot::CSumWht, v);
                            oi.add(Slot::CVx, v * fx);
                            oi.add(Slot::CVy, v * fy);
                            oi.add(Slot::CVz, v * fz);
                        }
                    }
                }
            }
        }
    }

    let (numallxy, numxy) = projection.counts();
    oi.set(Slot::NumAllXY, numallxy);
    oi.set(Slot::NumXY, numxy);
}

/// Per-slice (spectrum) pass (spec §4.3.2): only run for 3D inputs with a
/// vector column requested. Spans the object's X-Y footprint across the
/// *entire* cube depth, not just the object's own Z-extent.
pub fn parse_vector_dim3(
    tile: &Tile,
    object_id: u32,
    inputs: &PassInputs,
    projection: &ProjectionBuffer,
) -> VectorAccum {
    let dims = inputs.values.dims;
    let full_depth = dims[2];
    let mut vector = VectorAccum::new(full_depth);

    for z in 0..full_depth {
        let mut num_all = 0.0;
        let mut num = 0.0;
        let mut sum = 0.0;
        let mut sum_var = 0.0;
        let mut num_projected = 0.0;
        let mut num_other = 0.0;
        let mut num_union = 0.0;

        for ly in 0..tile.size[1] {
            for lx in 0..tile.size[0] {
                if projection.status(lx, ly) == 0 {
                    continue;
                }
                let gx = tile.start[0] + lx;
                let gy = tile.start[1] + ly;
                let flat = gx + dims[0] * (gy + dims[1] * z);
                let label = inputs.objects.data[flat];
                if label == 0 {
                    continue;
                }
                let value = inputs.values.data[flat];
                let blank = value.is_nan();

                if label == object_id {
                    num_all += 1.0;
                    num_union += 1.0;
                    if !blank {
                        num += 1.0;
                        sum += value as f64;
                        if let Some(var) = inputs.noise.variance_at(gx, gy, z) {
                            sum_var += var;
                        }
                    }
                } else {
                    num_union += 1.0;
                    num_projected += 1.0;
                    if !blank {
                        num_other += 1.0;
                    }
                }
            }
        }

        vector.num_all[z] = num_all;
        vector.num[z] = num;
        vector.sum[z] = if num > 0.0 { sum } else { f64::NAN };
        vector.sum_var[z] = if num > 0.0 { sum_var } else { f64::NAN };
        vector.sum_all[z] = if num_all > 0.0 { sum } else { f64::NAN };
        vector.num_projected[z] = num_projected;
        vector.num_other[z] = num_other;
        vector.num_union[z] = num_union;
    }

    vector
}

/// Connectivity-`ndim` neighbour offsets (spec §4.3.3 river walk): the full
/// `3^ndim - 1` neighbourhood (corners and edges included, not just face
/// neighbours) — matching the "small scratch array of size `num_neighbours`"
/// the spec calls for. Confirmed against the worked example in spec §8
/// (scenario 3: a 3x3 clump centred in a 5x5 object gives RIVER_NUM=16, the
/// full ring; face-only connectivity would miss the four ring corners,
/// which touch the clump only diagonally, and undercount to 12).
fn neighbor_offsets(ndim: usize) -> &'static [(isize, isize, isize)] {
    const OFFSETS_1D: [(isize, isize, isize); 2] = [(-1, 0, 0), (1, 0, 0)];
    const OFFSETS_2D: [(isize, isize, isize); 8] = [
        (-1, -1, 0), (0, -1, 0), (1, -1, 0),
        (-1, 0, 0), (1, 0, 0),
        (-1, 1, 0), (0, 1, 0), (1, 1, 0),
    ];
    const OFFSETS_3D: [(isize, isize, isize); 26] = [
        (-1, -1, -1), (0, -1, -1), (1, -1, -1),
        (-1, 0, -1), (0, 0, -1), (1, 0, -1),
        (-1, 1, -1), (0, 1, -1), (1, 1, -1),
        (-1, -1, 0), (0, -1, 0), (1, -1, 0),
        (-1, 0, 0), (1, 0, 0),
        (-1, 1, 0), (0, 1, 0), (1, 1, 0),
        (-1, -1, 1), (0, -1, 1), (1, -1, 1),
        (-1, 0, 1), (0, 0, 1), (1, 0, 1),
        (-1, 1, 1), (0, 1, 1), (1, 1, 1),
    ];
    match ndim {
        1 => &OFFSETS_1D,
        2 => &OFFSETS_2D,
        _ => &OFFSETS_3D,
    }
}

/// Second pass (spec §4.3.3): dispatches per-pixel on the clump label.
/// `clumps_in_object` holds one `ClumpAccum` per clump, indexed `C - 1`.
pub fn parse_clumps(
    tile: &Tile,
    object_id: u32,
    inputs: &PassInputs,
    ciflag: &SlotMask,
    needs_river: bool,
    needs_bbox: bool,
    clumps_in_object: &mut [ClumpAccum],
) {
    let clump_labels = match inputs.clumps {
        Some(c) => c,
        None => return,
    };
    let dims = inputs.values.dims;
    let ndim = tile.ndim();
    let offsets = neighbor_offsets(ndim);
    // Scratch buffer of clump labels already credited *for the current river
    // pixel*; sized to the neighbourhood so no heap allocation happens once
    // steady state is reached (spec §9's "reused mutable buffer" note), but
    // keyed by label, not by offset index: the same clump can be reached
    // through more than one of the `num_neighbours` directions, and each
    // must still only be credited once (spec §3, §4.3.3).
    let mut credited: Vec<u32> = Vec::with_capacity(offsets.len());

    for (flat_start, len, ly, lz) in tile.strips(dims) {
        for lx in 0..len {
            let gi = flat_start + lx;
            if inputs.objects.data[gi] != object_id {
                continue;
            }
            let c = clump_labels.data[gi];
            let value = inputs.values.data[gi];
            let blank = value.is_nan();
            let (fx, fy, fz) = tile.fits_coord(lx, ly, lz);
            let (gx, gy, gz) = (tile.start[0] + lx, tile.start[1] + ly, tile.start[2] + lz);

            if c > 0 {
                let ci = &mut clumps_in_object[(c - 1) as usize];
                let (kx, ky) = (ci.shift.0, ci.shift.1);

                ci.add(Slot::NumAll, 1.0);
                if !blank {
                    ci.add(Slot::Num, 1.0);
                }

                if ciflag[Slot::Gx as usize] {
                    ci.add(Slot::Gx, fx);
                }
                if ciflag[Slot::Gy as usize] {
                    ci.add(Slot::Gy, fy);
                }
                if ciflag[Slot::Gz as usize] {
                    ci.add(Slot::Gz, fz);
                }
                if ciflag[Slot::Gxx as usize] || ciflag[Slot::Gyy as usize] || ciflag[Slot::Gxy as usize] {
                    let (scx, scy) = (fx - kx, fy - ky);
                    ci.add(Slot::Gxx, scx * scx);
                    ci.add(Slot::Gyy, scy * scy);
                    ci.add(Slot::Gxy, scx * scy);
                }

                if !blank && value > 0.0 {
                    let v = value as f64;
                    if ciflag[Slot::SumWht as usize] || ciflag[Slot::Vx as usize] || ciflag[Slot::Vy as usize] {
                        ci.add(Slot::SumWht, v);
                        ci.add(Slot::Vx, v * fx);
                        ci.add(Slot::Vy, v * fy);
                        ci.add(Slot::Vz, v * fz);
                    }
                    if ciflag[Slot::Vxx as usize] || ciflag[Slot::Vyy as usize] || ciflag[Slot::Vxy as usize] {
                        let (scx, scy) = (fx - kx, fy - ky);
                        ci.add(Slot::Vxx, v * scx * scx);
                        ci.add(Slot::Vyy, v * scy * scy);
                        ci.add(Slot::Vxy, v * scx * scy);
                    }
                }

                if !blank {
                    let v = value as f64;
                    ci.add(Slot::Sum, v);
                    ci.add(Slot::SumP2, v * v);
                    ci.update_min(v, (fx, fy, fz));
                    ci.update_max(v, (fx, fy, fz));
                }

                if needs_bbox {
                    ci.bbox.update((fx, fy, fz));
                }

                if ciflag[Slot::SumSky as usize] {
                    if let Some(sky) = inputs.sky.value_at(gx, gy, gz) {
                        ci.add(Slot::NumSky, 1.0);
                        ci.add(Slot::SumSky, sky);
                    }
                }
                if ciflag[Slot::SumVarPix as usize] {
                    if let Some(var) = inputs.noise.variance_at(gx, gy, gz) {
                        ci.add(Slot::NumVarPix, 1.0);
                        ci.add(Slot::SumVarPix, var);
                    }
                }
            } else if needs_river && !blank {
                // River pixel: credit every distinct adjacent clump at most
                // once each (spec §4.3.3, §3 invariant "at most once"), even
                // if it's reached through several of the `num_neighbours`
                // directions.
                credited.clear();
                for &(dx, dy, dz) in offsets.iter() {
                    let nx = gx as isize + dx;
                    let ny = gy as isize + dy;
                    let nz = gz as isize + dz;
                    if nx < 0 || ny < 0 || nz < 0 {
                        continue;
                    }
                    let (nx, ny, nz) = (nx as usize, ny as usize, nz as usize);
                    if nx >= dims[0] || ny >= dims[1] || nz >= dims[2] {
                        continue;
                    }
                    let ni = nx + dims[0] * (ny + dims[1] * nz);
                    if inputs.objects.data[ni] != object_id {
                        continue;
                    }
                    let nc = clump_labels.data[ni];
                    if nc == 0 || credited.contains(&nc) {
                        continue;
                    }
                    credited.push(nc);
                    let river = &mut clumps_in_object[(nc - 1) as usize].river;
                    river.num += 1.0;
                    let v = value as f64;
                    river.sum += v;
                    if v < river.min {
                        river.min = v;
                    }
                    if v > river.max {
                        river.max = v;
                    }
                    if let Some(var) = inputs.noise.variance_at(gx, gy, gz) {
                        river.sum_var += var;
                    }
                }
            }
        }
    }
}

/// Gathers the non-blank value array for one object, re-walking its tile
/// (spec §4.3.4: "re-walking the object pixels").
pub fn collect_object_values(tile: &Tile, object_id: u32, inputs: &PassInputs) -> Vec<f64> {
    let dims = inputs.values.dims;
    let mut out = Vec::new();
    for (flat_start, len, _ly, _lz) in tile.strips(dims) {
        for lx in 0..len {
            let gi = flat_start + lx;
            if inputs.objects.data[gi] != object_id {
                continue;
            }
            let v = inputs.values.data[gi];
            if !v.is_nan() {
                out.push(v as f64);
            }
        }
    }
    out
}

/// Gathers the non-blank value array for one clump within its host object's
/// tile.
pub fn collect_clump_values(tile: &Tile, object_id: u32, clump_id: u32, inputs: &PassInputs) -> Vec<f64> {
    let clump_labels = match inputs.clumps {
        Some(c) => c,
        None => return Vec::new(),
    };
    let dims = inputs.values.dims;
    let mut out = Vec::new();
    for (flat_start, len, _ly, _lz) in tile.strips(dims) {
        for lx in 0..len {
            let gi = flat_start + lx;
            if inputs.objects.data[gi] != object_id || clump_labels.data[gi] != clump_id {
                continue;
            }
            let v = inputs.values.data[gi];
            if !v.is_nan() {
                out.push(v as f64);
            }
        }
    }
    out
}

const SIGMA_CLIP_MAX_ITERS: usize = 10;

fn median_of_sorted(sorted: &[f64]) -> f64 {
    sorted[sorted.len() / 2]
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64], mean_val: f64) -> f64 {
    let var = values.iter().map(|v| (v - mean_val) * (v - mean_val)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Iterative sigma-clipping (spec §4.3.4): excludes values farther than
/// `k*sigma` from the running median, stopping when the standard deviation's
/// fractional change drops below `tol` or `SIGMA_CLIP_MAX_ITERS` is reached.
/// Returns `(num, mean, median, std, converged)`.
fn sigma_clip(values: &[f64], k: f32, tol: f32) -> (f64, f64, f64, f64, bool) {
    if values.is_empty() {
        return (0.0, f64::NAN, f64::NAN, f64::NAN, false);
    }
    let mut current = values.to_vec();
    let mut prev_std: Option<f64> = None;
    let mut converged = false;

    for _ in 0..SIGMA_CLIP_MAX_ITERS {
        if current.is_empty() {
            break;
        }
        let m = mean(&current);
        let mut sorted = current.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let med = median_of_sorted(&sorted);
        let std = std_dev(&current, m);

        if let Some(prev) = prev_std {
            if prev > 0.0 && ((prev - std).abs() / prev) < tol as f64 {
                converged = true;
                break;
            }
        }

        let lo = med - k as f64 * std;
        let hi = med + k as f64 * std;
        let next: Vec<f64> = current.iter().copied().filter(|&v| v >= lo && v <= hi).collect();
        if next.len() == current.len() {
            converged = true;
            break;
        }
        prev_std = Some(std);
        current = next;
    }

    let m = mean(&current);
    let mut sorted = current.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let med = median_of_sorted(&sorted);
    let std = std_dev(&current, m);
    (current.len() as f64, m, med, std, converged)
}

/// Count and sum of the top pixels (sorted descending) whose value exceeds
/// `frac * maximum`, stopping at the first pixel below threshold (spec
/// §4.3.4 "Fraction-of-maximum sets").
fn frac_count_sum(desc: &[f64], maximum: f64, frac: f32) -> (f64, f64) {
    let threshold = frac as f64 * maximum;
    let mut count = 0.0;
    let mut sum = 0.0;
    for &v in desc {
        if v > threshold {
            count += 1.0;
            sum += v;
        } else {
            break;
        }
    }
    (count, sum)
}

/// Order-based pass (spec §4.3.4). Writes `MEDIAN`, `MAXIMUM`, half-sum/half-
/// max/frac-max slots, and (when `sigmaclip` is set) the `SIGCLIP_*` slots
/// directly into `oi`/`ci`'s shared slot block. `river_mean` is 0 for
/// objects and the clump's river mean (local background) for clumps.
/// Returns `false` when sigma-clipping was requested but did not converge
/// within the iteration budget (a non-fatal warning, spec §7).
pub fn order_stats_into(
    values: &[f64],
    sigmaclip: Option<(f32, f32)>,
    fracmax: (f32, f32),
    river_mean: f64,
    set: &mut dyn FnMut(Slot, f64),
) -> bool {
    if values.is_empty() {
        for slot in [
            Slot::Median,
            Slot::Maximum,
            Slot::HalfSumNum,
            Slot::HalfMaxNum,
            Slot::HalfMaxSum,
            Slot::FracMax1Num,
            Slot::FracMax1Sum,
            Slot::FracMax2Num,
            Slot::FracMax2Sum,
            Slot::SigClipNum,
            Slot::SigClipMean,
            Slot::SigClipMedian,
            Slot::SigClipStd,
        ] {
            set(slot, f64::NAN);
        }
        set(Slot::SigClipNum, 0.0);
        return true;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let median = median_of_sorted(&sorted);
    set(Slot::Median, median);

    let mut desc = values.to_vec();
    desc.sort_by(|a, b| b.partial_cmp(a).unwrap());
    let maximum = if desc.len() >= 3 { (desc[0] + desc[1] + desc[2]) / 3.0 } else { desc[0] };
    set(Slot::Maximum, maximum);

    let total: f64 = values.iter().sum();
    let target = 0.5 * total;
    let mut cum = 0.0;
    let mut half_sum_num = desc.len() as f64;
    for (i, &v) in desc.iter().enumerate() {
        cum += v;
        if cum > target {
            half_sum_num = (i + 1) as f64;
            break;
        }
    }
    set(Slot::HalfSumNum, half_sum_num);

    let (half_max_num, half_max_sum) = frac_count_sum(&desc, maximum, 0.5);
    set(Slot::HalfMaxNum, half_max_num);
    set(Slot::HalfMaxSum, half_max_sum);

    let (f1_num, f1_sum) = frac_count_sum(&desc, maximum, fracmax.0);
    set(Slot::FracMax1Num, f1_num);
    set(Slot::FracMax1Sum, f1_sum);
    let (f2_num, f2_sum) = frac_count_sum(&desc, maximum, fracmax.1);
    set(Slot::FracMax2Num, f2_num);
    set(Slot::FracMax2Sum, f2_sum);

    let mut converged = true;
    if let Some((k, tol)) = sigmaclip {
        let (num, m, med, std, conv) = sigma_clip(values, k, tol);
        converged = conv;
        set(Slot::SigClipNum, num);
        set(Slot::SigClipMean, m - river_mean);
        set(Slot::SigClipMedian, med - river_mean);
        set(Slot::SigClipStd, std);
    }
    converged
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_types::Image as Img;
    use catalog_types::LabelImage as Lab;

    fn make_inputs(values: Vec<f32>, labels: Vec<u32>, dims: [usize; 3]) -> (Img, Lab) {
        (Img::new(values, dims), Lab::new(labels, dims))
    }

    #[test]
    fn single_isolated_source_matches_spec_scenario_1() {
        let (values, objects) = make_inputs(vec![10.0; 25], vec![1; 25], [5, 5, 1]);
        let inputs = PassInputs {
            values: &values,
            objects: &objects,
            clumps: None,
            sky: SkyLookup::new(None),
            noise: NoiseLookup::new(None, false),
        };
        let tile = Tile::new([0, 0, 0], [5, 5, 1]);
        let mut oiflag = [false; crate::accumulators::OI_SLOT_COUNT];
        oiflag[Slot::Num as usize] = true;
        oiflag[Slot::Sum as usize] = true;
        oiflag[Slot::Vx as usize] = true;
        oiflag[Slot::Vy as usize] = true;
        oiflag[Slot::SumWht as usize] = true;
        oiflag[Slot::Gx as usize] = true;
        oiflag[Slot::Gy as usize] = true;

        let mut oi = ObjectAccum::new((3.0, 3.0, 1.0));
        let mut proj = ProjectionBuffer::new(5, 5);
        parse_objects(&tile, 1, &inputs, &oiflag, &mut oi, &mut proj);

        assert_eq!(oi.get(Slot::Num), 25.0);
        assert_eq!(oi.get(Slot::Sum), 250.0);
        let x = oi.get(Slot::Vx) / oi.get(Slot::SumWht);
        let y = oi.get(Slot::Vy) / oi.get(Slot::SumWht);
        assert_eq!(x, 3.0);
        assert_eq!(y, 3.0);
    }

    #[test]
    fn extrema_ties_average_coordinates() {
        let (values, objects) = make_inputs(vec![7.0; 9], vec![1; 9], [3, 3, 1]);
        let inputs = PassInputs {
            values: &values,
            objects: &objects,
            clumps: None,
            sky: SkyLookup::new(None),
            noise: NoiseLookup::new(None, false),
        };
        let tile = Tile::new([0, 0, 0], [3, 3, 1]);
        let mut oiflag = [false; crate::accumulators::OI_SLOT_COUNT];
        let mut oi = ObjectAccum::new((2.0, 2.0, 1.0));
        let mut proj = ProjectionBuffer::new(3, 3);
        parse_objects(&tile, 1, &inputs, &oiflag, &mut oi, &mut proj);

        assert_eq!(oi.get(Slot::MinVNum), 9.0);
        assert_eq!(oi.get(Slot::MaxVNum), 9.0);
        assert_eq!(oi.get(Slot::MinVx) / oi.get(Slot::MinVNum), 2.0);
    }

    #[test]
    fn order_stats_on_empty_values_are_nan() {
        let mut out = std::collections::HashMap::new();
        let mut set = |slot: Slot, v: f64| {
            out.insert(slot as usize, v);
        };
        order_stats_into(&[], None, (0.5, 0.25), 0.0, &mut set);
        assert!(out[&(Slot::Median as usize)].is_nan());
        assert_eq!(out[&(Slot::SigClipNum as usize)], 0.0);
    }

    #[test]
    fn half_sum_radius_counts_from_the_top() {
        let values = vec![1.0, 1.0, 1.0, 1.0, 100.0];
        let mut out = std::collections::HashMap::new();
        let mut set = |slot: Slot, v: f64| {
            out.insert(slot as usize, v);
        };
        order_stats_into(&values, None, (0.5, 0.25), 0.0, &mut set);
        // total = 104, half = 52; the single 100.0 pixel alone exceeds it.
        assert_eq!(out[&(Slot::HalfSumNum as usize)], 1.0);
    }
}
