//! # Orbit Core
//!
//! Core types and I/O shared by the orbit spectral-index pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced raster grid with no-data handling
//! - `GeoTransform`: affine pixel <-> map transformation
//! - `CRS`: coordinate reference systems and point/bbox reprojection
//! - `Region`, `BBox`, `SamplePoint`: the catalog data model
//! - Catalog loading (CSV) and single-band GeoTIFF reading

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod region;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use region::{BBox, Region, SamplePoint};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::region::{BBox, Region, SamplePoint};
}
