//! Threshold classification of index values
//!
//! - **water**: NDWI-based water / non-water decision and per-region summary

mod water;

pub use water::{is_water, WaterSummary, DEFAULT_WATER_THRESHOLD};
