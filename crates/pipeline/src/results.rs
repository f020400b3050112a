//! Result records of the two batch operations.
//!
//! `None` stands for no-data throughout: a unit of work that found no
//! raster, timed out or had no valid pixel.

use orbit_algorithms::classification::WaterSummary;
use orbit_core::{Region, SamplePoint};
use serde::{Deserialize, Serialize};

/// Mean index of one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionResult {
    pub region_id: String,
    pub mean_index: Option<f64>,
}

impl RegionResult {
    pub fn new(region_id: impl Into<String>, mean_index: Option<f64>) -> Self {
        Self {
            region_id: region_id.into(),
            mean_index,
        }
    }

    pub fn no_data(region_id: impl Into<String>) -> Self {
        Self::new(region_id, None)
    }

    pub fn is_no_data(&self) -> bool {
        self.mean_index.is_none()
    }
}

/// Water decision for one sample point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointResult {
    pub point: SamplePoint,
    pub region_id: String,
    pub is_on_water: Option<bool>,
    /// Sampled index value the decision was taken on
    pub index_value: Option<f64>,
}

impl PointResult {
    pub fn no_data(point: SamplePoint) -> Self {
        let region_id = point.region_id.clone();
        Self {
            point,
            region_id,
            is_on_water: None,
            index_value: None,
        }
    }
}

/// Sample points of one region with their tally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPoints {
    pub region: Region,
    pub points: Vec<PointResult>,
    pub summary: WaterSummary,
}

impl RegionPoints {
    pub fn new(region: Region, points: Vec<PointResult>) -> Self {
        let summary = points.iter().map(|p| p.is_on_water).collect();
        Self { region, points, summary }
    }

    pub fn region_id(&self) -> &str {
        self.region.id()
    }
}
