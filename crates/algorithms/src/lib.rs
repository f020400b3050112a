//! # Orbit Algorithms
//!
//! Raster analysis steps of the orbit pipeline.
//!
//! ## Available Algorithm Categories
//!
//! - **imagery**: normalized difference indices (NDVI, NDWI, MNDWI), VCI
//! - **statistics**: area-weighted region mean, point sampling, temporal mean
//! - **sampling**: regular sample grids over regions
//! - **classification**: water thresholding

pub mod classification;
pub mod imagery;
pub mod sampling;
pub mod statistics;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classification::{is_water, WaterSummary, DEFAULT_WATER_THRESHOLD};
    pub use crate::imagery::{
        mndwi, ndvi, ndwi, normalized_difference, vci, BandPair, SpectralIndex, VegetationState,
    };
    pub use crate::sampling::{grid_points, SampleGrid, DEFAULT_TOTAL_POINTS};
    pub use crate::statistics::{mean_over_region, sample_at_point, temporal_mean, ReduceParams};
    pub use orbit_core::prelude::*;
}
