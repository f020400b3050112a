//! Regions of interest and sample points
//!
//! A catalog is an ordered list of labelled rectangles. Both regions and the
//! sample points generated from them live only for a single pipeline run.

use crate::crs::CRS;
use crate::error::{Error, Result};
use geo_types::{coord, Point, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An axis-aligned bounding box `(min_x, min_y, max_x, max_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Smallest box containing every point of the iterator.
    pub fn envelope(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut b = BBox::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for (x, y) in points {
            b.min_x = b.min_x.min(x);
            b.min_y = b.min_y.min(y);
            b.max_x = b.max_x.max(x);
            b.max_y = b.max_y.max(y);
        }
        b
    }

    /// Reason the box is unusable as a region, if any.
    pub fn check(&self) -> std::result::Result<(), String> {
        let coords = [self.min_x, self.min_y, self.max_x, self.max_y];
        if coords.iter().any(|v| !v.is_finite()) {
            return Err("bounds must be finite numbers".to_string());
        }
        if self.min_x >= self.max_x {
            return Err(format!("xmin ({}) must be < xmax ({})", self.min_x, self.max_x));
        }
        if self.min_y >= self.max_y {
            return Err(format!("ymin ({}) must be < ymax ({})", self.min_y, self.max_y));
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Planar area in squared coordinate units
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.min_x, self.min_y),
            (self.min_x, self.max_y),
            (self.max_x, self.min_y),
            (self.max_x, self.max_y),
        ]
    }

    /// Check if two bboxes overlap with non-zero area.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Overlapping part of two boxes, `None` if they do not overlap.
    pub fn intersection(&self, other: &BBox) -> Option<BBox> {
        if !self.intersects(other) {
            return None;
        }
        Some(BBox::new(
            self.min_x.max(other.min_x),
            self.min_y.max(other.min_y),
            self.max_x.min(other.max_x),
            self.max_y.min(other.max_y),
        ))
    }

    /// Inclusive containment test
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.min_x, y: self.min_y },
            coord! { x: self.max_x, y: self.max_y },
        )
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

/// A labelled region of interest from the catalog.
///
/// Immutable once built; the bounding box is guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    id: String,
    bbox: BBox,
    crs: CRS,
}

impl Region {
    /// Build a region, validating its identifier and bounds.
    pub fn new(id: impl Into<String>, bbox: BBox, crs: CRS) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::MalformedRegion {
                row: 0,
                reason: "empty identifier".to_string(),
            });
        }
        bbox.check()
            .map_err(|reason| Error::MalformedRegion { row: 0, reason })?;
        Ok(Self { id, bbox, crs })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bbox(&self) -> &BBox {
        &self.bbox
    }

    /// CRS the bounds are expressed in
    pub fn crs(&self) -> &CRS {
        &self.crs
    }
}

/// A generated sample location tied to the region it was drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    /// Position in `crs`
    pub position: Point<f64>,
    pub crs: CRS,
    pub region_id: String,
}

impl SamplePoint {
    pub fn new(x: f64, y: f64, crs: CRS, region_id: impl Into<String>) -> Self {
        Self {
            position: Point::new(x, y),
            crs,
            region_id: region_id.into(),
        }
    }

    pub fn x(&self) -> f64 {
        self.position.x()
    }

    pub fn y(&self) -> f64 {
        self.position.y()
    }
}
