//! Parallel Driver & Post-processor (C5, spec §4.5): partitions objects
//! statically across worker threads, runs the full per-object pipeline
//! (passes + filler) on each, then — after a single join barrier —
//! permutes clump rows into host-object order and batch-converts pixel
//! columns to world coordinates.

use std::sync::Mutex;

use catalog_types::{CatalogError, CatalogOutput, CatalogRequest, Column, ColumnCode, ColumnData, LabelImage, Tile, WcsMeta};
use tracing::{debug, info, info_span, warn};

use crate::accumulators::{ClumpAccum, ObjectAccum, VectorAccum};
use crate::filler::{fill_clump, fill_object, fill_vector, FillContext, FillOutcome};
use crate::inputs::{NoiseLookup, SkyLookup};
use crate::passes::{collect_clump_values, collect_object_values, order_stats_into, parse_clumps, parse_objects, parse_vector_dim3, PassInputs, ProjectionBuffer};
use crate::registry::{define_and_allocate, Registration};

/// Highest clump label touching `object_id` inside `tile` (0 if none). Used
/// both to size each object's per-clump accumulator vector and, before that,
/// in the single-threaded pre-scan that sizes the output clump columns.
fn max_clump_label_in_tile(tile: &Tile, object_id: u32, objects: &LabelImage, clumps: &LabelImage) -> u32 {
    let dims = objects.dims;
    let mut max_label = 0;
    for (flat_start, len, _ly, _lz) in tile.strips(dims) {
        for lx in 0..len {
            let gi = flat_start + lx;
            if objects.data[gi] != object_id {
                continue;
            }
            let c = clumps.data[gi];
            if c > max_label {
                max_label = c;
            }
        }
    }
    max_label
}

fn build_pass_inputs<'a>(request: &'a CatalogRequest) -> PassInputs<'a> {
    PassInputs {
        values: &request.values,
        objects: &request.objects,
        clumps: request.clumps.as_ref(),
        sky: SkyLookup::new(request.sky.as_ref()),
        noise: NoiseLookup::new(request.noise.as_ref(), request.params.variance_input),
    }
}

/// Maps an internal 1-based object label to the caller's external output
/// label (spec §3 "after optional re-labeling via `outlabs`", §6
/// `outlabs: Option<Vec<u32>>`). Falls back to the internal label itself
/// when no remapping was supplied, or when the remapping is shorter than
/// the label it's asked to translate.
fn external_label(outlabs: Option<&[u32]>, internal: u32) -> i64 {
    match outlabs {
        Some(labels) => labels.get((internal - 1) as usize).copied().unwrap_or(internal) as i64,
        None => internal as i64,
    }
}

fn write_value(data: &mut ColumnData, row: usize, outcome: FillOutcome) {
    match (data, outcome) {
        (ColumnData::I64(v), FillOutcome::Int(x)) => v[row] = x,
        (ColumnData::F32(v), FillOutcome::Float(x)) => v[row] = x,
        (ColumnData::VecF32(v), FillOutcome::Vector(x)) => v[row] = x,
        _ => {}
    }
}

/// One processed object's row, plus its (still locally-ordered) clump rows.
struct ObjectResult {
    object_id: u32,
    object_values: Vec<FillOutcome>,
    clumps: Vec<ClumpResult>,
}

struct ClumpResult {
    local_index: u32,
    values: Vec<FillOutcome>,
}

fn process_object(
    object_id: u32,
    tile: &Tile,
    request: &CatalogRequest,
    reg: &Registration,
    object_codes: &[ColumnCode],
    clump_codes: &[ColumnCode],
    ctx: &FillContext,
    warnings: &Mutex<Vec<catalog_types::Warning>>,
) -> ObjectResult {
    let inputs = build_pass_inputs(request);
    let shift = tile.fits_coord(0, 0, 0);
    let ndim = request.values.ndim();

    let mut oi = ObjectAccum::new(shift);
    let mut projection = ProjectionBuffer::new(tile.size[0], tile.size[1]);
    parse_objects(tile, object_id, &inputs, &reg.oiflag, &mut oi, &mut projection);

    let vector = if ndim == 3 && reg.needs_vector_pass {
        Some(parse_vector_dim3(tile, object_id, &inputs, &projection))
    } else {
        None
    };

    if reg.needs_order_pass {
        let values = collect_object_values(tile, object_id, &inputs);
        let converged = order_stats_into(&values, request.params.sigmaclip, request.params.fracmax, 0.0, &mut |slot, v| oi.set(slot, v));
        if !converged {
            warnings.lock().unwrap().push(catalog_types::Warning::new(format!(
                "sigma-clipping did not converge within the iteration budget for object {object_id}"
            )));
        }
    }

    if reg.needs_upperlimit {
        if let Some(hook) = &request.upperlimit_hook {
            let sample = hook(request.params.rng_seed, object_id as u64);
            oi.set(crate::accumulators::Slot::UpperLimitB, sample.b);
            oi.set(crate::accumulators::Slot::UpperLimitS, sample.s);
            oi.set(crate::accumulators::Slot::UpperLimitQ, sample.q);
            oi.set(crate::accumulators::Slot::UpperLimitSkew, sample.skew);
        }
    }

    let mut object_values = Vec::with_capacity(object_codes.len());
    for &code in object_codes {
        let outcome = match code {
            ColumnCode::AreaInSlice | ColumnCode::SumInSlice | ColumnCode::SumErrorInSlice => {
                let empty = VectorAccum::new(0);
                FillOutcome::Vector(fill_vector(code, vector.as_ref().unwrap_or(&empty)))
            }
            ColumnCode::ObjId => FillOutcome::Int(external_label(request.outlabs.as_deref(), object_id)),
            _ => fill_object(code, &oi, ctx),
        };
        object_values.push(outcome);
    }

    let mut clumps = Vec::new();
    if let Some(clump_labels) = request.clumps.as_ref() {
        let n = max_clump_label_in_tile(tile, object_id, &request.objects, clump_labels);
        if n > 0 && !clump_codes.is_empty() {
            let mut clumps_in_object: Vec<ClumpAccum> = (0..n).map(|_| ClumpAccum::new(shift)).collect();
            parse_clumps(tile, object_id, &inputs, &reg.ciflag, reg.needs_river, reg.needs_bbox, &mut clumps_in_object);

            for local in 0..n as usize {
                if reg.needs_order_pass {
                    let values = collect_clump_values(tile, object_id, (local + 1) as u32, &inputs);
                    let river_mean = clumps_in_object[local].river.mean();
                    let converged = order_stats_into(&values, request.params.sigmaclip, request.params.fracmax, river_mean, &mut |slot, v| {
                        clumps_in_object[local].set(slot, v)
                    });
                    if !converged {
                        warnings.lock().unwrap().push(catalog_types::Warning::new(format!(
                            "sigma-clipping did not converge within the iteration budget for clump {} of object {object_id}",
                            local + 1
                        )));
                    }
                }
            }

            for local in 0..n as usize {
                if let Some(hook) = &request.upperlimit_hook {
                    if reg.needs_upperlimit {
                        // row_id resolved precisely once this clump's final row
                        // position is known, after the post-join permutation;
                        // here we use the pre-permutation local ordinal as a
                        // stable per-object seed component instead.
                        let sample = hook(request.params.rng_seed, (object_id as u64) << 32 | (local as u64 + 1));
                        let ci = &mut clumps_in_object[local];
                        ci.set(crate::accumulators::Slot::UpperLimitB, sample.b);
                        ci.set(crate::accumulators::Slot::UpperLimitS, sample.s);
                        ci.set(crate::accumulators::Slot::UpperLimitQ, sample.q);
                        ci.set(crate::accumulators::Slot::UpperLimitSkew, sample.skew);
                    }
                }

                let mut values = Vec::with_capacity(clump_codes.len());
                for &code in clump_codes {
                    let outcome = match code {
                        ColumnCode::ObjId => FillOutcome::Int(0), // overwritten post-permutation
                        ColumnCode::HostObjId => FillOutcome::Int(object_id as i64),
                        _ => fill_clump(code, &clumps_in_object[local], ctx),
                    };
                    values.push(outcome);
                }
                clumps.push(ClumpResult { local_index: local as u32, values });
            }
        }
    }

    ObjectResult { object_id, object_values, clumps }
}

fn apply_wcs_conversion(columns: &mut [Column], wcs_axis_for: &[(ColumnCode, usize)], wcs: &WcsMeta) {
    if wcs_axis_for.is_empty() {
        return;
    }
    let mut axes: Vec<usize> = wcs_axis_for.iter().map(|&(_, a)| a).collect();
    axes.sort_unstable();
    axes.dedup();

    let mut pixel_arrays = Vec::with_capacity(axes.len());
    for &axis in &axes {
        let code = wcs_axis_for.iter().find(|&&(_, a)| a == axis).map(|&(c, _)| c);
        let Some(code) = code else { continue };
        let Some(col) = columns.iter().find(|c| c.code == code) else { continue };
        if let ColumnData::F32(values) = &col.data {
            pixel_arrays.push(values.iter().map(|&v| v as f64).collect::<Vec<f64>>());
        }
    }
    if pixel_arrays.len() != axes.len() {
        return;
    }

    let world_arrays = (wcs.convert)(&pixel_arrays);

    for &(code, axis) in wcs_axis_for {
        let Some(pos) = axes.iter().position(|&a| a == axis) else { continue };
        let Some(world) = world_arrays.get(pos) else { continue };
        if let Some(col) = columns.iter_mut().find(|c| c.code == code) {
            if let ColumnData::F32(values) = &mut col.data {
                for (v, w) in values.iter_mut().zip(world.iter()) {
                    *v = *w as f32;
                }
            }
        }
    }
}

/// Implements spec §4.5: static per-thread object partitioning, a single
/// join barrier, then single-threaded post-processing.
pub fn run(request: CatalogRequest) -> Result<CatalogOutput, CatalogError> {
    let ndim = request.values.ndim();
    let num_objects = request.tiles.len();
    let wcs = request.values.wcs.as_ref();

    let span = info_span!("generate_catalog", num_objects, num_threads = request.params.num_threads).entered();

    let num_clumps: usize = match request.clumps.as_ref() {
        Some(clumps) => (0..num_objects)
            .map(|i| max_clump_label_in_tile(&request.tiles[i], (i + 1) as u32, &request.objects, clumps) as usize)
            .sum(),
        None => 0,
    };
    debug!(num_clumps, "pre-scan complete");

    let reg = define_and_allocate(
        &request.column_request,
        ndim,
        wcs,
        request.params.sigmaclip,
        request.params.upperlimit,
        num_objects,
        request.clumps.as_ref().map(|_| num_clumps),
    )?;

    let object_codes: Vec<ColumnCode> = reg.object_columns.iter().map(|c| c.code).collect();
    let clump_codes: Vec<ColumnCode> = reg.clump_columns.as_ref().map(|cols| cols.iter().map(|c| c.code).collect()).unwrap_or_default();

    let ctx = FillContext {
        zeropoint: request.params.zeropoint as f64,
        cpscorr: request.params.cpscorr as f64,
        spatial_resolution: request.params.spatial_resolution as f64,
        pixel_area_arcsec2: reg.pixel_area_arcsec2,
    };

    let num_threads = request.params.num_threads.max(1);
    let chunk_len = ((num_objects + num_threads - 1) / num_threads).max(1);
    let warnings: Mutex<Vec<catalog_types::Warning>> = Mutex::new(reg.warnings.clone());

    let mut object_results: Vec<ObjectResult> = std::thread::scope(|scope| {
        let object_ids: Vec<u32> = (1..=num_objects as u32).collect();
        let mut handles = Vec::new();
        for chunk in object_ids.chunks(chunk_len) {
            let request = &request;
            let reg = &reg;
            let object_codes = &object_codes;
            let clump_codes = &clump_codes;
            let ctx = &ctx;
            let warnings = &warnings;
            handles.push(scope.spawn(move || {
                let _span = info_span!("worker", objects = chunk.len()).entered();
                chunk
                    .iter()
                    .map(|&object_id| {
                        let tile = &request.tiles[(object_id - 1) as usize];
                        process_object(object_id, tile, request, reg, object_codes, clump_codes, ctx, warnings)
                    })
                    .collect::<Vec<_>>()
            }));
        }
        handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
    });

    object_results.sort_by_key(|r| r.object_id);

    let mut object_columns = reg.object_columns;
    for result in &mut object_results {
        let row = (result.object_id - 1) as usize;
        for (j, col) in object_columns.iter_mut().enumerate() {
            let outcome = std::mem::replace(&mut result.object_values[j], FillOutcome::Int(0));
            write_value(&mut col.data, row, outcome);
        }
    }

    let mut clump_columns = reg.clump_columns;
    if let Some(clump_columns) = clump_columns.as_mut() {
        let mut flattened: Vec<(u32, u32, Vec<FillOutcome>)> = Vec::with_capacity(num_clumps);
        for result in &mut object_results {
            for clump in &mut result.clumps {
                let values = std::mem::take(&mut clump.values);
                flattened.push((result.object_id, clump.local_index, values));
            }
        }
        flattened.sort_by_key(|(obj, local, _)| (*obj, *local));

        for (row, (object_id, _local, mut values)) in flattened.into_iter().enumerate() {
            for (j, col) in clump_columns.iter_mut().enumerate() {
                let outcome = match clump_codes[j] {
                    ColumnCode::ObjId => FillOutcome::Int((row + 1) as i64),
                    ColumnCode::HostObjId => FillOutcome::Int(external_label(request.outlabs.as_deref(), object_id)),
                    _ => std::mem::replace(&mut values[j], FillOutcome::Int(0)),
                };
                write_value(&mut col.data, row, outcome);
            }
        }
    }

    if reg.needs_wcs {
        if let Some(wcs) = wcs {
            apply_wcs_conversion(&mut object_columns, &reg.wcs_axis_for, wcs);
            if let Some(clump_columns) = clump_columns.as_mut() {
                apply_wcs_conversion(clump_columns, &reg.wcs_axis_for, wcs);
            }
        }
    }

    info!("catalog generation complete");
    drop(span);

    let warnings = warnings.into_inner().unwrap();
    for w in &warnings {
        warn!(message = %w.message);
    }

    Ok(CatalogOutput {
        object_columns,
        clump_columns,
        metadata: vec![
            ("PIXEL_AREA_ARCSEC2".to_string(), reg.pixel_area_arcsec2.to_string()),
            ("ZEROPOINT".to_string(), request.params.zeropoint.to_string()),
            ("NUM_OBJECTS".to_string(), num_objects.to_string()),
            ("NUM_CLUMPS".to_string(), num_clumps.to_string()),
        ],
        warnings,
    })
}
