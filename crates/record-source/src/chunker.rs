//! Partitioning of a bounding box into request regions.

use atlas_common::{AtlasResult, BoundingBox};
use serde::Serialize;

use crate::config::ChunkingConfig;

/// One request region of a run's bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpatialChunk {
    /// Stable id derived from the grid position, e.g. "chunk_1_3"
    pub id: String,
    pub row: usize,
    pub col: usize,
    pub bounds: BoundingBox,
}

/// Split `bounds` into `chunk_rows * chunk_cols` chunks, row-major from the
/// south-west corner.
///
/// With zero overlap the chunks tile `bounds` exactly: adjacent chunks share
/// the very same edge value, and the outermost edges are the input bounds
/// themselves rather than an accumulated sum of steps.
pub fn create_spatial_chunks(
    bounds: &BoundingBox,
    config: &ChunkingConfig,
) -> AtlasResult<Vec<SpatialChunk>> {
    bounds.validate()?;
    config.validate()?;

    let lon_step = bounds.width() / config.chunk_cols as f64;
    let lat_step = bounds.height() / config.chunk_rows as f64;

    let lon_edge = |index: usize| {
        if index == config.chunk_cols {
            bounds.max_lon
        } else {
            bounds.min_lon + index as f64 * lon_step
        }
    };
    let lat_edge = |index: usize| {
        if index == config.chunk_rows {
            bounds.max_lat
        } else {
            bounds.min_lat + index as f64 * lat_step
        }
    };

    let mut chunks = Vec::with_capacity(config.chunk_rows * config.chunk_cols);
    for row in 0..config.chunk_rows {
        for col in 0..config.chunk_cols {
            let chunk_bounds = BoundingBox::new(
                lon_edge(col) - config.overlap,
                lat_edge(row) - config.overlap,
                lon_edge(col + 1) + config.overlap,
                lat_edge(row + 1) + config.overlap,
            )
            .clamp_to(bounds);

            chunks.push(SpatialChunk {
                id: format!("chunk_{}_{}", row, col),
                row,
                col,
                bounds: chunk_bounds,
            });
        }
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunking(rows: usize, cols: usize, overlap: f64) -> ChunkingConfig {
        ChunkingConfig {
            chunk_rows: rows,
            chunk_cols: cols,
            overlap,
            ..Default::default()
        }
    }

    #[test]
    fn test_two_by_two_centre() {
        let bounds = BoundingBox::new(4.8, 52.3, 5.0, 52.4);
        let chunks = create_spatial_chunks(&bounds, &chunking(2, 2, 0.0)).unwrap();

        assert_eq!(chunks.len(), 4);
        for chunk in &chunks {
            assert!((chunk.bounds.width() - 0.1).abs() < 1e-10);
            assert!((chunk.bounds.height() - 0.05).abs() < 1e-10);
        }
        assert_eq!(chunks[0].id, "chunk_0_0");
        assert_eq!(chunks[3].id, "chunk_1_1");
        assert_eq!(chunks[0].bounds.min_lon, 4.8);
        assert_eq!(chunks[3].bounds.max_lat, 52.4);
    }

    #[test]
    fn test_non_square_split_tiles_exactly() {
        let bounds = BoundingBox::new(4.81, 52.2354339, 4.964447, 52.4443);
        let (rows, cols) = (3, 7);
        let chunks = create_spatial_chunks(&bounds, &chunking(rows, cols, 0.0)).unwrap();
        assert_eq!(chunks.len(), rows * cols);

        let at = |row: usize, col: usize| {
            let chunk = &chunks[row * cols + col];
            assert_eq!((chunk.row, chunk.col), (row, col));
            chunk.bounds
        };

        for row in 0..rows {
            for col in 0..cols {
                if col + 1 < cols {
                    assert!((at(row, col).max_lon - at(row, col + 1).min_lon).abs() < 1e-10);
                }
                if row + 1 < rows {
                    assert!((at(row, col).max_lat - at(row + 1, col).min_lat).abs() < 1e-10);
                }
            }
        }

        for row in 0..rows {
            assert!((at(row, 0).min_lon - bounds.min_lon).abs() < 1e-10);
            assert!((at(row, cols - 1).max_lon - bounds.max_lon).abs() < 1e-10);
        }
        for col in 0..cols {
            assert!((at(0, col).min_lat - bounds.min_lat).abs() < 1e-10);
            assert!((at(rows - 1, col).max_lat - bounds.max_lat).abs() < 1e-10);
        }
    }

    #[test]
    fn test_overlap_is_clamped_to_outer_bounds() {
        let bounds = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let chunks = create_spatial_chunks(&bounds, &chunking(2, 2, 1.0)).unwrap();

        assert_eq!(chunks[0].bounds, BoundingBox::new(0.0, 0.0, 6.0, 6.0));
        assert_eq!(chunks[3].bounds, BoundingBox::new(4.0, 4.0, 10.0, 10.0));
    }

    #[test]
    fn test_rejects_invalid_input() {
        let bounds = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(create_spatial_chunks(&bounds, &chunking(0, 2, 0.0)).is_err());
        assert!(create_spatial_chunks(&bounds, &chunking(2, 2, -1.0)).is_err());

        let inverted = BoundingBox::new(10.0, 0.0, 0.0, 10.0);
        assert!(create_spatial_chunks(&inverted, &chunking(2, 2, 0.0)).is_err());
    }
}
