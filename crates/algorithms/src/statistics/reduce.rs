//! Spatial reduction of an index raster
//!
//! Two read-only reducers over a single-band raster:
//! - [`mean_over_region`]: area-weighted mean over a bounding box, evaluated
//!   on a lattice of `scale`-sized cells and capped by a pixel budget
//! - [`sample_at_point`]: value at a single location

use orbit_core::raster::Raster;
use orbit_core::region::BBox;
use orbit_core::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default reduction scale, in map units
pub const DEFAULT_SCALE: f64 = 10.0;

/// Default pixel budget, `1e13` clamped to the platform word size
pub const DEFAULT_MAX_PIXELS: u64 = 10_000_000_000_000;

/// Parameters for [`mean_over_region`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReduceParams {
    /// Edge length of one reduction cell, in map units
    pub scale: f64,
    /// Maximum number of reduction cells. Larger requests are coarsened.
    pub max_pixels: u64,
}

impl Default for ReduceParams {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

impl ReduceParams {
    pub fn new(scale: f64, max_pixels: u64) -> Self {
        Self { scale, max_pixels }
    }

    fn check(&self) -> Result<()> {
        check_scale(self.scale)?;
        if self.max_pixels == 0 {
            return Err(Error::InvalidParameter {
                name: "max_pixels",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn check_scale(scale: f64) -> Result<()> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "scale",
            value: scale.to_string(),
            reason: "must be a positive number".to_string(),
        });
    }
    Ok(())
}

/// Cells per axis for a bbox at the given scale.
fn lattice_dims(bbox: &BBox, scale: f64) -> (f64, f64) {
    (
        (bbox.width() / scale).ceil().max(1.0),
        (bbox.height() / scale).ceil().max(1.0),
    )
}

/// Pick a scale whose lattice fits in `max_pixels` cells.
///
/// Degrades to coarser cells instead of failing.
fn fit_scale(bbox: &BBox, params: &ReduceParams) -> (f64, usize, usize) {
    let budget = params.max_pixels.min(usize::MAX as u64) as f64;
    let mut scale = params.scale;
    let (mut nx, mut ny) = lattice_dims(bbox, scale);

    if nx * ny > budget {
        let requested = nx * ny;
        while nx * ny > budget {
            scale *= (nx * ny / budget).sqrt().max(1.0 + 1e-9);
            (nx, ny) = lattice_dims(bbox, scale);
        }
        warn!(
            requested_cells = requested,
            max_pixels = params.max_pixels,
            scale = params.scale,
            effective_scale = scale,
            "Pixel budget exceeded, reducing at a coarser scale"
        );
    }

    (scale, nx as usize, ny as usize)
}

/// Area-weighted mean of the valid pixels of `raster` inside `bbox`.
///
/// The bbox is covered by a lattice of `scale x scale` cells anchored at its
/// lower-left corner; edge cells are clipped to the bbox. Each cell takes
/// the value of the raster pixel nearest its center and is weighted by its
/// clipped area. Cells over no-data or outside the raster are skipped.
///
/// Returns `Ok(None)` when no valid pixel falls inside the bbox. The bbox is
/// expected in the raster's CRS.
pub fn mean_over_region(
    raster: &Raster<f64>,
    bbox: &BBox,
    params: &ReduceParams,
) -> Result<Option<f64>> {
    params.check()?;
    bbox.check().map_err(|reason| Error::InvalidParameter {
        name: "bbox",
        value: bbox.to_string(),
        reason,
    })?;

    if raster.bounds().intersection(bbox).is_none() {
        debug!(%bbox, "Region does not overlap the raster");
        return Ok(None);
    }

    let (scale, nx, ny) = fit_scale(bbox, params);

    let (weighted_sum, total_weight) = (0..ny)
        .into_par_iter()
        .map(|j| {
            let y0 = bbox.min_y + j as f64 * scale;
            let y1 = (y0 + scale).min(bbox.max_y);
            let mut sum = 0.0;
            let mut weight = 0.0;
            for i in 0..nx {
                let x0 = bbox.min_x + i as f64 * scale;
                let x1 = (x0 + scale).min(bbox.max_x);
                let area = (x1 - x0) * (y1 - y0);
                if area <= 0.0 {
                    continue;
                }
                if let Some(v) = raster.value_at((x0 + x1) / 2.0, (y0 + y1) / 2.0) {
                    sum += v * area;
                    weight += area;
                }
            }
            (sum, weight)
        })
        .reduce(|| (0.0, 0.0), |a, b| (a.0 + b.0, a.1 + b.1));

    if total_weight <= 0.0 {
        return Ok(None);
    }
    Ok(Some(weighted_sum / total_weight))
}

/// Value of `raster` at `(x, y)`.
///
/// When `scale` is no coarser than the raster's cells this is a plain
/// nearest-pixel lookup. For a coarser scale the raster is viewed as a
/// lattice of `scale`-sized cells anchored at its origin and the mean of the
/// valid pixels whose centers fall in the cell containing the point is
/// returned, falling back to the nearest pixel when that cell has none.
///
/// Returns `Ok(None)` when the point is outside the raster or on no-data.
pub fn sample_at_point(raster: &Raster<f64>, x: f64, y: f64, scale: f64) -> Result<Option<f64>> {
    check_scale(scale)?;

    if raster.pixel_at(x, y).is_none() {
        return Ok(None);
    }

    if scale <= raster.cell_size() {
        return Ok(raster.value_at(x, y));
    }

    let gt = raster.transform();
    let cell_x = ((x - gt.origin_x) / scale).floor();
    let cell_y = ((gt.origin_y - y) / scale).floor();
    let cell = BBox::new(
        gt.origin_x + cell_x * scale,
        gt.origin_y - (cell_y + 1.0) * scale,
        gt.origin_x + (cell_x + 1.0) * scale,
        gt.origin_y - cell_y * scale,
    );

    Ok(window_mean(raster, &cell).or_else(|| raster.value_at(x, y)))
}

/// Mean of the valid pixels whose centers lie in `window` (half-open).
fn window_mean(raster: &Raster<f64>, window: &BBox) -> Option<f64> {
    let extent = raster.bounds().intersection(window)?;
    let (c0, r0) = raster.geo_to_pixel(extent.min_x, extent.max_y);
    let (c1, r1) = raster.geo_to_pixel(extent.max_x, extent.min_y);
    if ![c0, r0, c1, r1].iter().all(|v| v.is_finite()) {
        return None;
    }

    let col_range = c0.min(c1).floor().max(0.0) as usize..(c0.max(c1).ceil() as usize).min(raster.cols());
    let row_range = r0.min(r1).floor().max(0.0) as usize..(r0.max(r1).ceil() as usize).min(raster.rows());

    let mut sum = 0.0;
    let mut count = 0usize;
    for row in row_range {
        for col in col_range.clone() {
            let (px, py) = raster.pixel_to_geo(col, row);
            let inside = px >= window.min_x
                && px < window.max_x
                && py > window.min_y
                && py <= window.max_y;
            if !inside {
                continue;
            }
            if let Some(v) = raster.valid_value(row, col) {
                sum += v;
                count += 1;
            }
        }
    }

    (count > 0).then(|| sum / count as f64)
}
