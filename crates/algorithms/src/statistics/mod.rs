//! Statistical reductions over index rasters
//!
//! - **reduce**: area-weighted mean over a region, point sampling
//! - **temporal**: pixel-wise composites across acquisition dates

pub mod reduce;
pub mod temporal;

pub use reduce::{mean_over_region, sample_at_point, ReduceParams, DEFAULT_MAX_PIXELS, DEFAULT_SCALE};
pub use temporal::temporal_mean;
