//! Tests for grid geometry, cell assignment and blueprints.

use atlas_common::{
    BoundingBox, CellId, Coordinates, Geometry, GridDimensions, ResolutionConfig, TimeRange,
    TimeSlice,
};
use test_utils::{
    assert_approx_eq, assert_coords_approx_eq, bbox, bounds, time_slices, PRODUCTION_PERIODS,
};

fn grid(tuple: (f64, f64, f64, f64), cols: usize, rows: usize) -> GridDimensions {
    GridDimensions::from_bounds(&bounds(tuple), &ResolutionConfig::new(cols, rows)).unwrap()
}

// ============================================================================
// Dimension tests
// ============================================================================

#[test]
fn test_cell_sizes_divide_bounds() {
    let dims = grid(bbox::CENTRE, 4, 2);
    assert_approx_eq!(dims.cell_width, 0.05, 1e-12);
    assert_approx_eq!(dims.cell_height, 0.05, 1e-12);
    assert_eq!(dims.len(), 8);
    assert_eq!(dims.resolution().key(), "4x2");
}

#[test]
fn test_rejects_invalid_bounds() {
    let result = GridDimensions::from_bounds(&bounds(bbox::INVALID), &ResolutionConfig::new(4, 4));
    assert!(result.is_err());
}

#[test]
fn test_padded_production_bounds() {
    let padded = bounds(bbox::AMSTERDAM).pad(0.05);
    let dims = GridDimensions::from_bounds(&padded, &ResolutionConfig::new(75, 75)).unwrap();
    assert_eq!(dims.len(), 5625);
    assert_approx_eq!(dims.min_lon, 4.81 - 0.154447 * 0.05, 1e-9);
}

// ============================================================================
// Cell assignment tests
// ============================================================================

#[test]
fn test_coarser_grid_merges_fine_cells() {
    let fine = grid(bbox::TEN_BY_TEN, 10, 10);
    let coarse = grid(bbox::TEN_BY_TEN, 2, 2);

    let a = Coordinates::new(1.5, 1.5);
    let b = Coordinates::new(3.5, 3.5);

    assert_ne!(fine.cell_for(a), fine.cell_for(b));
    assert_eq!(coarse.cell_for(a), coarse.cell_for(b));
    assert_eq!(coarse.cell_for(a), Some(CellId::new(0, 0)));
}

#[test]
fn test_every_cell_index_is_in_range() {
    let dims = grid(bbox::CENTRE, 7, 3);
    let bounds = dims.bounds();
    for i in 0..20 {
        for j in 0..20 {
            let lon = bounds.min_lon + bounds.width() * i as f64 / 20.0;
            let lat = bounds.min_lat + bounds.height() * j as f64 / 20.0;
            let cell = dims.cell_for(Coordinates::new(lon, lat)).unwrap();
            assert!(cell.index(dims.cols_amount) < dims.len());
        }
    }

    let corner = Coordinates::new(bounds.max_lon, bounds.max_lat);
    assert_eq!(dims.cell_for(corner), Some(CellId::new(2, 6)));
}

#[test]
fn test_outside_point_has_no_cell() {
    let dims = grid(bbox::CENTRE, 10, 10);
    assert!(dims.cell_for(Coordinates::new(4.79, 52.35)).is_none());
    assert!(dims.cell_for(Coordinates::new(4.9, 52.41)).is_none());
}

// ============================================================================
// Blueprint tests
// ============================================================================

#[test]
fn test_blueprint_cells_tile_bounds() {
    let dims = grid(bbox::CENTRE, 3, 3);
    let blueprint = dims.blueprint();
    assert_eq!(blueprint.rows, 3);
    assert_eq!(blueprint.cols, 3);

    for cell in &blueprint.cells {
        if cell.col + 1 < blueprint.cols {
            let right = &blueprint.cells[cell.row * 3 + cell.col + 1];
            assert_approx_eq!(cell.bounds.max_lon, right.bounds.min_lon, 1e-10);
        }
        if cell.row + 1 < blueprint.rows {
            let above = &blueprint.cells[(cell.row + 1) * 3 + cell.col];
            assert_approx_eq!(cell.bounds.max_lat, above.bounds.min_lat, 1e-10);
        }
    }
}

#[test]
fn test_cell_bounds_contain_their_centre() {
    let dims = grid(bbox::TEN_BY_TEN, 5, 5);
    let cell = dims.cell_bounds(2, 3);
    let centre = Coordinates::new(
        (cell.min_lon + cell.max_lon) / 2.0,
        (cell.min_lat + cell.max_lat) / 2.0,
    );
    assert_eq!(dims.cell_for(centre), Some(CellId::new(2, 3)));
}

// ============================================================================
// Time slice tests
// ============================================================================

#[test]
fn test_production_periods() {
    let slices = time_slices(PRODUCTION_PERIODS);
    assert_eq!(slices.len(), 11);
    assert_eq!(slices.last().unwrap().duration_years, 25);

    let range = TimeRange::spanning(&slices).unwrap();
    assert_eq!(range, TimeRange::new("1500-01-01", "2024-12-31"));
}

#[test]
fn test_time_slice_rejects_out_of_range_year() {
    assert!(TimeSlice::new(i32::MAX - 1, i32::MAX).is_err());
}

#[test]
fn test_bounds_string_roundtrip() {
    let parsed = BoundingBox::from_bounds_string("4.8,52.3,5.0,52.4").unwrap();
    assert_eq!(parsed, bounds(bbox::CENTRE));
}

// ============================================================================
// Geometry position tests
// ============================================================================

#[test]
fn test_polygon_positioned_at_centroid() {
    let geometry =
        Geometry::from_wkt("POLYGON((4.8 52.3, 5.0 52.3, 5.0 52.4, 4.8 52.4, 4.8 52.3))").unwrap();
    let position = geometry.position();
    assert_coords_approx_eq!((position.lon, position.lat), (4.9, 52.35), 1e-9);
    assert!(bounds(bbox::CENTRE).contains(position.lon, position.lat));
}

#[test]
fn test_multilinestring_centroid_weighted_by_length() {
    let geometry =
        Geometry::from_wkt("MULTILINESTRING((0 0, 4 0), (0 2, 2 2))").unwrap();
    let position = geometry.position();
    // Length-weighted midpoints: (2,0) with weight 4, (1,2) with weight 2.
    assert_coords_approx_eq!((position.lon, position.lat), (5.0 / 3.0, 2.0 / 3.0), 1e-9);
}
