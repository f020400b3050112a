//! Regular sample grid over a region
//!
//! Grid size follows a fixed rule driven by the bbox area in its own
//! coordinate units:
//!
//! ```text
//! grid_width  = ceil(sqrt(width * height))
//! grid_height = ceil(grid_width / total_points)
//! ```
//!
//! The point count is `grid_width * grid_height`, which only matches
//! `total_points` for particular areas. A 100 square-unit region with 10
//! requested points yields a 10 x 1 grid; a 1 square-degree region yields a
//! single point.

use orbit_core::crs::{Transformer, CRS};
use orbit_core::region::{Region, SamplePoint};
use orbit_core::{Error, Result};
use tracing::{debug, warn};

/// Default number of requested points per region
pub const DEFAULT_TOTAL_POINTS: usize = 10;

/// Point counts above this are logged as suspicious.
const LARGE_GRID: usize = 1_000_000;

/// Grid layout for one region.
#[derive(Debug, Clone)]
pub struct SampleGrid {
    region_id: String,
    min_x: f64,
    min_y: f64,
    delta_x: f64,
    delta_y: f64,
    grid_width: usize,
    grid_height: usize,
    output_crs: CRS,
    transformer: Transformer,
}

impl SampleGrid {
    /// Lay out the grid for `region`, emitting points in `output_crs`.
    pub fn new(region: &Region, total_points: usize, output_crs: &CRS) -> Result<Self> {
        if total_points == 0 {
            return Err(Error::InvalidConfiguration(
                "total point count must be at least 1".to_string(),
            ));
        }
        let transformer = Transformer::new(region.crs(), output_crs)?;

        let bbox = region.bbox();
        let too_large = || Error::InvalidParameter {
            name: "region",
            value: format!("{} x {}", bbox.width(), bbox.height()),
            reason: "bbox area is too large to lay out a sample grid".to_string(),
        };
        let side = bbox.area().sqrt().ceil();
        if !side.is_finite() || side >= usize::MAX as f64 {
            return Err(too_large());
        }
        let grid_width = side as usize;
        let grid_height = grid_width.div_ceil(total_points);

        let count = grid_width.checked_mul(grid_height).ok_or_else(too_large)?;
        if count > LARGE_GRID {
            warn!(
                region = region.id(),
                grid_width,
                grid_height,
                total_points,
                "Grid is much larger than requested, check the catalog CRS units"
            );
        } else {
            debug!(region = region.id(), grid_width, grid_height, "Grid laid out");
        }

        Ok(Self {
            region_id: region.id().to_string(),
            min_x: bbox.min_x,
            min_y: bbox.min_y,
            delta_x: bbox.width() / grid_width.max(1) as f64,
            delta_y: bbox.height() / grid_height.max(1) as f64,
            grid_width,
            grid_height,
            output_crs: output_crs.clone(),
            transformer,
        })
    }

    pub fn grid_width(&self) -> usize {
        self.grid_width
    }

    pub fn grid_height(&self) -> usize {
        self.grid_height
    }

    /// Number of points the grid produces
    pub fn len(&self) -> usize {
        self.grid_width.saturating_mul(self.grid_height)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spacing `(delta_x, delta_y)` in the region's CRS
    pub fn spacing(&self) -> (f64, f64) {
        (self.delta_x, self.delta_y)
    }

    /// A fresh pass over the grid. Each call restarts from the first point.
    pub fn points(&self) -> GridPoints<'_> {
        GridPoints {
            grid: self,
            next: 0,
        }
    }

    /// Point `index` in column-major order (`x` outer, `y` inner).
    fn point(&self, index: usize) -> SamplePoint {
        let i = index / self.grid_height;
        let j = index % self.grid_height;
        let x = self.min_x + self.delta_x * i as f64;
        let y = self.min_y + self.delta_y * j as f64;
        let (x, y) = self.transformer.transform(x, y);
        SamplePoint::new(x, y, self.output_crs.clone(), self.region_id.as_str())
    }
}

/// Lazy iterator over the points of a [`SampleGrid`]
#[derive(Debug, Clone)]
pub struct GridPoints<'a> {
    grid: &'a SampleGrid,
    next: usize,
}

impl Iterator for GridPoints<'_> {
    type Item = SamplePoint;

    fn next(&mut self) -> Option<SamplePoint> {
        if self.next >= self.grid.len() {
            return None;
        }
        let point = self.grid.point(self.next);
        self.next += 1;
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.grid.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridPoints<'_> {}

impl<'a> IntoIterator for &'a SampleGrid {
    type Item = SamplePoint;
    type IntoIter = GridPoints<'a>;

    fn into_iter(self) -> GridPoints<'a> {
        self.points()
    }
}

/// Lay out the grid for `region` and collect its points.
pub fn grid_points(region: &Region, total_points: usize, output_crs: &CRS) -> Result<Vec<SamplePoint>> {
    Ok(SampleGrid::new(region, total_points, output_crs)?.points().collect())
}
