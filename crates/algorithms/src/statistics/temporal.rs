//! Temporal compositing
//!
//! Pixel-wise statistics across a stack of rasters observing the same
//! ground at different dates. Acquisitions need not share a grid: the
//! composite is laid out on a reference grid and every layer is looked up
//! at the reference pixel centers.

use ndarray::Array2;
use orbit_core::crs::Transformer;
use orbit_core::raster::{GeoTransform, Raster};
use orbit_core::{Error, Result};
use rayon::prelude::*;

/// Fraction of a pixel under which a layer edge snaps to the grid line.
const EDGE_SNAP: f64 = 1e-6;

/// Pixel-wise mean across a stack of rasters.
///
/// The output grid has the first layer's cell size, alignment and CRS, and
/// spans the union of every layer's extent. Each output pixel averages the
/// layers holding a valid value at its center, so offset or clipped
/// acquisitions only contribute where they have data. A pixel covered by
/// no valid value stays no-data (NaN).
pub fn temporal_mean(stack: &[Raster<f64>]) -> Result<Raster<f64>> {
    let first = stack.first().ok_or_else(|| Error::InvalidParameter {
        name: "stack",
        value: "0 layers".to_string(),
        reason: "temporal mean needs at least one raster".to_string(),
    })?;

    let layers = stack
        .iter()
        .map(|layer| Ok((layer, to_layer_crs(first, layer)?)))
        .collect::<Result<Vec<_>>>()?;
    let grid = reference_grid(first, stack)?;
    let (rows, cols, transform) = (grid.rows, grid.cols, grid.transform);
    let layers = &layers;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map_iter(|row| {
            (0..cols).map(move |col| {
                let (x, y) = transform.pixel_to_geo(col, row);
                let (sum, count) = layers
                    .iter()
                    .filter_map(|(layer, to_layer)| {
                        let (lx, ly) = to_layer.map_or((x, y), |t| t.transform(x, y));
                        layer.value_at(lx, ly)
                    })
                    .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                if count == 0 {
                    f64::NAN
                } else {
                    sum / count as f64
                }
            })
        })
        .collect();

    let mut output = first.with_same_meta::<f64>(rows, cols);
    output.set_transform(transform);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

struct ReferenceGrid {
    transform: GeoTransform,
    rows: usize,
    cols: usize,
}

/// Reprojection between two layers, when their CRS differ.
fn to_layer_crs(from: &Raster<f64>, to: &Raster<f64>) -> Result<Option<Transformer>> {
    match (from.crs(), to.crs()) {
        (Some(from), Some(to)) if !from.is_equivalent(to) => Ok(Some(Transformer::new(from, to)?)),
        _ => Ok(None),
    }
}

/// The first layer's lattice, widened to whole pixels around every layer.
fn reference_grid(first: &Raster<f64>, stack: &[Raster<f64>]) -> Result<ReferenceGrid> {
    let (mut min_c, mut min_r) = (f64::INFINITY, f64::INFINITY);
    let (mut max_c, mut max_r) = (f64::NEG_INFINITY, f64::NEG_INFINITY);

    for layer in stack {
        let bounds = match to_layer_crs(layer, first)? {
            Some(to_first) => to_first.transform_bbox(&layer.bounds()),
            None => layer.bounds(),
        };
        for (x, y) in bounds.corners() {
            let (c, r) = first.geo_to_pixel(x, y);
            min_c = min_c.min(c);
            max_c = max_c.max(c);
            min_r = min_r.min(r);
            max_r = max_r.max(r);
        }
    }

    if ![min_c, max_c, min_r, max_r].iter().all(|v| v.is_finite()) {
        return Err(Error::InvalidParameter {
            name: "stack",
            value: format!("{:?}", first.transform()),
            reason: "layer extents cannot be placed on the first layer's grid".to_string(),
        });
    }

    let (col_start, col_end) = ((min_c + EDGE_SNAP).floor(), (max_c - EDGE_SNAP).ceil());
    let (row_start, row_end) = ((min_r + EDGE_SNAP).floor(), (max_r - EDGE_SNAP).ceil());
    let cols = (col_end - col_start).max(0.0) as usize;
    let rows = (row_end - row_start).max(0.0) as usize;
    if rows.checked_mul(cols).is_none() {
        return Err(Error::InvalidDimensions { width: cols, height: rows });
    }

    let gt = first.transform();
    let transform = GeoTransform {
        origin_x: gt.origin_x + col_start * gt.pixel_width + row_start * gt.row_rotation,
        origin_y: gt.origin_y + col_start * gt.col_rotation + row_start * gt.pixel_height,
        ..*gt
    };
    Ok(ReferenceGrid { transform, rows, cols })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_of_two_layers() {
        let a = Raster::filled(2, 2, 0.2);
        let b = Raster::filled(2, 2, 0.6);
        let mean = temporal_mean(&[a, b]).unwrap();
        assert_relative_eq!(mean.get(1, 0).unwrap(), 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_cloudy_pixels_ignored() {
        let mut a = Raster::filled(1, 2, 0.3);
        a.set(0, 0, f64::NAN).unwrap();
        let mut b = Raster::filled(1, 2, 0.5);
        b.set(0, 0, f64::NAN).unwrap();
        let c = Raster::filled(1, 2, 0.7);

        let mean = temporal_mean(&[a, b, c]).unwrap();
        assert_relative_eq!(mean.get(0, 0).unwrap(), 0.7, epsilon = 1e-12);
        assert_relative_eq!(mean.get(0, 1).unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_all_nodata_stays_nodata() {
        let a = Raster::filled(1, 1, f64::NAN);
        let mean = temporal_mean(&[a.clone(), a]).unwrap();
        assert!(mean.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_empty_stack_rejected() {
        assert!(matches!(temporal_mean(&[]), Err(Error::InvalidParameter { .. })));
    }

    /// One row of `values` in 1-unit cells starting at `min_x`
    fn strip(min_x: f64, values: &[f64]) -> Raster<f64> {
        Raster::from_vec(values.to_vec(), 1, values.len())
            .unwrap()
            .with_transform(GeoTransform::new(min_x, 1.0, 1.0, -1.0))
    }

    #[test]
    fn test_offset_layers_meet_on_shared_ground() {
        let west = strip(0.0, &[0.5; 4]);
        let east = strip(2.0, &[0.0; 4]);

        let mean = temporal_mean(&[west, east]).unwrap();
        assert_eq!(mean.shape(), (1, 6));
        assert_eq!(mean.transform().origin_x, 0.0);
        let row: Vec<f64> = (0..6).map(|c| mean.get(0, c).unwrap()).collect();
        assert_eq!(row, [0.5, 0.5, 0.25, 0.25, 0.0, 0.0]);
    }

    #[test]
    fn test_clipped_layer_only_counts_where_present() {
        let full = strip(0.0, &[0.0; 4]);
        let clipped = strip(0.0, &[1.0; 2]);

        let mean = temporal_mean(&[full.clone(), clipped]).unwrap();
        assert_eq!(mean.shape(), full.shape());
        assert_eq!(mean.transform(), full.transform());
        assert_relative_eq!(mean.get(0, 1).unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(mean.get(0, 2).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_misaligned_layer_sampled_at_pixel_centers() {
        // shifted by a fraction of a pixel: each center falls in one cell
        let base = strip(0.0, &[0.0, 0.0, 0.0]);
        let shifted = strip(0.4, &[1.0, 2.0, 3.0]);

        let mean = temporal_mean(&[base, shifted]).unwrap();
        assert_eq!(mean.shape(), (1, 4));
        assert_relative_eq!(mean.get(0, 0).unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(mean.get(0, 1).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(mean.get(0, 2).unwrap(), 1.5, epsilon = 1e-12);
        // past the shifted layer's edge at 3.4
        assert!(mean.get(0, 3).unwrap().is_nan());
    }
}
