//! End-to-end scenarios against the public entry point, spec §8.

use catalog_core::generate_catalog;
use catalog_types::{
    CatalogParams, CatalogRequest, Column, ColumnCode, ColumnData, Image, LabelImage, Tile,
};

fn params() -> CatalogParams {
    CatalogParams { num_threads: 1, ..CatalogParams::default() }
}

fn find<'a>(cols: &'a [Column], code: ColumnCode) -> &'a Column {
    cols.iter().find(|c| c.code == code).unwrap_or_else(|| panic!("column {code:?} not requested"))
}

fn as_f32(col: &Column) -> &[f32] {
    match &col.data {
        ColumnData::F32(v) => v,
        _ => panic!("expected f32 column"),
    }
}

fn as_i64(col: &Column) -> &[i64] {
    match &col.data {
        ColumnData::I64(v) => v,
        _ => panic!("expected i64 column"),
    }
}

#[test]
fn single_isolated_source() {
    let values = Image::new(vec![10.0; 25], [5, 5, 1]);
    let objects = LabelImage::new(vec![1; 25], [5, 5, 1]);
    let request = CatalogRequest {
        values,
        objects,
        clumps: None,
        sky: None,
        noise: None,
        tiles: vec![Tile::new([0, 0, 0], [5, 5, 1])],
        outlabs: None,
        column_request: vec![ColumnCode::Area, ColumnCode::Sum, ColumnCode::Mean, ColumnCode::X, ColumnCode::Y],
        params: params(),
        upperlimit_hook: None,
    };

    let out = generate_catalog(request).unwrap();
    assert_eq!(as_i64(find(&out.object_columns, ColumnCode::Area)), &[25]);
    assert_eq!(as_f32(find(&out.object_columns, ColumnCode::Sum)), &[250.0]);
    assert_eq!(as_f32(find(&out.object_columns, ColumnCode::Mean)), &[10.0]);
    assert_eq!(as_f32(find(&out.object_columns, ColumnCode::X)), &[3.0]);
    assert_eq!(as_f32(find(&out.object_columns, ColumnCode::Y)), &[3.0]);
}

/// Builds a 10x10 image with two non-overlapping 3x3 blocks of value 5.0,
/// labeled 1 at 0-based indices [0,3)x[0,3) (FITS 1..3) and 2 at [5,8)x[5,8) (FITS 6..8).
#[test]
fn two_nonoverlapping_sources() {
    let (nx, ny) = (10, 10);
    let mut values = vec![0.0f32; nx * ny];
    let mut objects = vec![0u32; nx * ny];
    for y in 0..3 {
        for x in 0..3 {
            let i = x + nx * y;
            values[i] = 5.0;
            objects[i] = 1;
        }
    }
    for y in 5..8 {
        for x in 5..8 {
            let i = x + nx * y;
            values[i] = 5.0;
            objects[i] = 2;
        }
    }

    let request = CatalogRequest {
        values: Image::new(values, [nx, ny, 1]),
        objects: LabelImage::new(objects, [nx, ny, 1]),
        clumps: None,
        sky: None,
        noise: None,
        tiles: vec![Tile::new([0, 0, 0], [3, 3, 1]), Tile::new([5, 5, 0], [3, 3, 1])],
        outlabs: None,
        column_request: vec![ColumnCode::Area, ColumnCode::Sum, ColumnCode::X, ColumnCode::Y],
        params: params(),
        upperlimit_hook: None,
    };

    let out = generate_catalog(request).unwrap();
    assert_eq!(as_i64(find(&out.object_columns, ColumnCode::Area)), &[9, 9]);
    assert_eq!(as_f32(find(&out.object_columns, ColumnCode::Sum)), &[45.0, 45.0]);
    assert_eq!(as_f32(find(&out.object_columns, ColumnCode::X)), &[2.0, 7.0]);
    assert_eq!(as_f32(find(&out.object_columns, ColumnCode::Y)), &[2.0, 7.0]);
}

/// A 5x5 object (value 1 everywhere) with a 3x3 clump (value 4) in the
/// centre; the surrounding ring is a one-pixel-wide river.
#[test]
fn clump_with_river_subtraction() {
    let (nx, ny) = (5, 5);
    let values = vec![1.0f32; nx * ny];
    let objects = vec![1u32; nx * ny];
    let mut clumps = vec![0u32; nx * ny];
    let mut values_mut = values.clone();
    for y in 1..4 {
        for x in 1..4 {
            let i = x + nx * y;
            clumps[i] = 1;
            values_mut[i] = 4.0;
        }
    }

    let request = CatalogRequest {
        values: Image::new(values_mut, [nx, ny, 1]),
        objects: LabelImage::new(objects, [nx, ny, 1]),
        clumps: Some(LabelImage::new(clumps, [nx, ny, 1])),
        sky: None,
        noise: None,
        tiles: vec![Tile::new([0, 0, 0], [5, 5, 1])],
        outlabs: None,
        column_request: vec![ColumnCode::Area, ColumnCode::Sum, ColumnCode::SumNoRiver, ColumnCode::RiverNum, ColumnCode::RiverMean],
        params: params(),
        upperlimit_hook: None,
    };

    let out = generate_catalog(request).unwrap();
    let clump_cols = out.clump_columns.unwrap();
    assert_eq!(as_i64(find(&clump_cols, ColumnCode::Area)), &[9]);
    assert_eq!(as_f32(find(&clump_cols, ColumnCode::Sum)), &[36.0]);
    assert_eq!(as_i64(find(&clump_cols, ColumnCode::RiverNum)), &[16]);
    assert_eq!(as_f32(find(&clump_cols, ColumnCode::RiverMean)), &[1.0]);
    // SUM_NORIVER = 36 - river_mean(1.0) * area(9) = 27.
    assert_eq!(as_f32(find(&clump_cols, ColumnCode::SumNoRiver)), &[27.0]);
}

/// A 4x2x2 cube, all ones, single object filling the whole cube. Requests
/// the per-slice AREA_IN_SLICE vector column.
#[test]
fn cube_per_slice_area() {
    let (nx, ny, nz) = (2, 2, 4);
    let values = vec![1.0f32; nx * ny * nz];
    let objects = vec![1u32; nx * ny * nz];

    let request = CatalogRequest {
        values: Image::new(values, [nx, ny, nz]),
        objects: LabelImage::new(objects, [nx, ny, nz]),
        clumps: None,
        sky: None,
        noise: None,
        tiles: vec![Tile::new([0, 0, 0], [nx, ny, nz])],
        outlabs: None,
        column_request: vec![ColumnCode::AreaInSlice],
        params: params(),
        upperlimit_hook: None,
    };

    let out = generate_catalog(request).unwrap();
    let col = find(&out.object_columns, ColumnCode::AreaInSlice);
    match &col.data {
        ColumnData::VecF32(rows) => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0], vec![4.0, 4.0, 4.0, 4.0]);
        }
        _ => panic!("expected vector column"),
    }
}

/// Two objects each with clumps; asserts the clump catalog comes back sorted
/// by ascending host-object ID regardless of the (here, reversed) order the
/// clump labels happen to touch tiles in.
#[test]
fn clumps_sorted_by_host_object_id() {
    let (nx, ny) = (6, 3);
    let mut values = vec![1.0f32; nx * ny];
    let mut objects = vec![0u32; nx * ny];
    let mut clumps = vec![0u32; nx * ny];
    // object 1 occupies columns 0..3, object 2 occupies columns 3..6; each
    // has a single one-pixel clump.
    for y in 0..ny {
        for x in 0..3 {
            objects[x + nx * y] = 1;
        }
        for x in 3..6 {
            objects[x + nx * y] = 2;
        }
    }
    clumps[1 + nx * 1] = 1; // inside object 1
    clumps[4 + nx * 1] = 1; // inside object 2
    values[1 + nx * 1] = 9.0;
    values[4 + nx * 1] = 9.0;

    let request = CatalogRequest {
        values: Image::new(values, [nx, ny, 1]),
        objects: LabelImage::new(objects, [nx, ny, 1]),
        clumps: Some(LabelImage::new(clumps, [nx, ny, 1])),
        sky: None,
        noise: None,
        tiles: vec![Tile::new([0, 0, 0], [3, ny, 1]), Tile::new([3, 0, 0], [3, ny, 1])],
        outlabs: None,
        column_request: vec![ColumnCode::HostObjId],
        params: CatalogParams { num_threads: 2, ..CatalogParams::default() },
        upperlimit_hook: None,
    };

    let out = generate_catalog(request).unwrap();
    let host = as_i64(find(&out.clump_columns.as_ref().unwrap(), ColumnCode::HostObjId));
    for pair in host.windows(2) {
        assert!(pair[0] <= pair[1], "clump rows not in ascending host-object order: {host:?}");
    }
}

/// Two objects with an `outlabs` remapping: the object catalog's `OBJ_ID`
/// and the clump catalog's `HOST_OBJ_ID` must come back as the *external*
/// labels, not the internal 1-based object ids.
#[test]
fn outlabs_remaps_obj_id_and_host_obj_id() {
    let (nx, ny) = (6, 3);
    let mut values = vec![1.0f32; nx * ny];
    let mut objects = vec![0u32; nx * ny];
    let mut clumps = vec![0u32; nx * ny];
    for y in 0..ny {
        for x in 0..3 {
            objects[x + nx * y] = 1;
        }
        for x in 3..6 {
            objects[x + nx * y] = 2;
        }
    }
    clumps[1 + nx * 1] = 1;
    values[1 + nx * 1] = 9.0;

    let request = CatalogRequest {
        values: Image::new(values, [nx, ny, 1]),
        objects: LabelImage::new(objects, [nx, ny, 1]),
        clumps: Some(LabelImage::new(clumps, [nx, ny, 1])),
        sky: None,
        noise: None,
        tiles: vec![Tile::new([0, 0, 0], [3, ny, 1]), Tile::new([3, 0, 0], [3, ny, 1])],
        outlabs: Some(vec![101, 202]),
        column_request: vec![ColumnCode::ObjId, ColumnCode::HostObjId],
        params: params(),
        upperlimit_hook: None,
    };

    let out = generate_catalog(request).unwrap();
    assert_eq!(as_i64(find(&out.object_columns, ColumnCode::ObjId)), &[101, 202]);
    let host = as_i64(find(&out.clump_columns.as_ref().unwrap(), ColumnCode::HostObjId));
    assert_eq!(host, &[101]);
}

/// All nine pixels tied at the same value: MIN/MAX coordinates both average
/// to the region's geometric centre, and both tie-counts equal the area.
#[test]
fn extrema_ties_average_over_the_whole_region() {
    let values = vec![7.0f32; 9];
    let objects = vec![1u32; 9];

    let request = CatalogRequest {
        values: Image::new(values, [3, 3, 1]),
        objects: LabelImage::new(objects, [3, 3, 1]),
        clumps: None,
        sky: None,
        noise: None,
        tiles: vec![Tile::new([0, 0, 0], [3, 3, 1])],
        outlabs: None,
        column_request: vec![ColumnCode::MinValX, ColumnCode::MaxValX, ColumnCode::MinValNum, ColumnCode::MaxValNum],
        params: params(),
        upperlimit_hook: None,
    };

    let out = generate_catalog(request).unwrap();
    assert_eq!(as_f32(find(&out.object_columns, ColumnCode::MinValX)), &[2.0]);
    assert_eq!(as_f32(find(&out.object_columns, ColumnCode::MaxValX)), &[2.0]);
    assert_eq!(as_i64(find(&out.object_columns, ColumnCode::MinValNum)), &[9]);
    assert_eq!(as_i64(find(&out.object_columns, ColumnCode::MaxValNum)), &[9]);
}

/// Non-fatal warnings (spec §7) are both returned in `CatalogOutput::warnings`
/// and emitted live as `tracing` `warn!` events for a caller with a
/// subscriber installed (SPEC_FULL.md ambient-stack logging requirement).
#[test]
fn clump_only_column_warning_is_returned_and_logged() {
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct CapturingWriter(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturingWriter {
        type Writer = Self;
        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    let buf = CapturingWriter::default();
    let subscriber = tracing_subscriber::fmt().with_writer(buf.clone()).with_ansi(false).finish();

    let values = Image::new(vec![1.0f32; 9], [3, 3, 1]);
    let objects = LabelImage::new(vec![1u32; 9], [3, 3, 1]);
    let request = CatalogRequest {
        values,
        objects,
        clumps: None,
        sky: None,
        noise: None,
        tiles: vec![Tile::new([0, 0, 0], [3, 3, 1])],
        outlabs: None,
        column_request: vec![ColumnCode::RiverNum],
        params: params(),
        upperlimit_hook: None,
    };

    let out = tracing::subscriber::with_default(subscriber, || generate_catalog(request).unwrap());

    assert_eq!(out.warnings.len(), 1);
    assert!(out.warnings[0].message.contains("RiverNum"));

    let logged = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
    assert!(logged.contains("RiverNum"), "warning was not emitted as a tracing event: {logged:?}");
}

/// An object whose every pixel is NaN (blank): zero area, NaN sum/median/magnitude.
#[test]
fn all_blank_object_yields_nan_and_zero_area() {
    let values = vec![f32::NAN; 9];
    let objects = vec![1u32; 9];

    let request = CatalogRequest {
        values: Image::new(values, [3, 3, 1]),
        objects: LabelImage::new(objects, [3, 3, 1]),
        clumps: None,
        sky: None,
        noise: None,
        tiles: vec![Tile::new([0, 0, 0], [3, 3, 1])],
        outlabs: None,
        column_request: vec![ColumnCode::Area, ColumnCode::Sum, ColumnCode::Median, ColumnCode::Magnitude],
        params: CatalogParams { zeropoint: 25.0, ..params() },
        upperlimit_hook: None,
    };

    let out = generate_catalog(request).unwrap();
    assert_eq!(as_i64(find(&out.object_columns, ColumnCode::Area)), &[0]);
    assert!(as_f32(find(&out.object_columns, ColumnCode::Sum))[0].is_nan());
    assert!(as_f32(find(&out.object_columns, ColumnCode::Median))[0].is_nan());
    assert!(as_f32(find(&out.object_columns, ColumnCode::Magnitude))[0].is_nan());
}
