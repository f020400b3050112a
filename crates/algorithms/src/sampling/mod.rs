//! Sample point generation
//!
//! - **grid**: regular lattice of points over a region's bounding box

pub mod grid;

pub use grid::{grid_points, GridPoints, SampleGrid, DEFAULT_TOTAL_POINTS};
