//! # Orbit Cloud
//!
//! Raster sources for the orbit pipeline.
//!
//! A [`RasterSource`] answers a [`FrameQuery`] (collection, date range,
//! bounds, bands) with time-stamped [`RasterFrame`]s. The pipeline never
//! cares where the pixels come from; this crate provides:
//!
//! - [`MemorySource`]: frames held in memory
//! - [`LocalStore`]: per-band GeoTIFFs in a `<collection>/<date>/<band>.tif`
//!   directory tree, with an LRU cache of decoded bands
//! - [`Selection`]: collapsing several acquisitions into one frame

pub mod cache;
pub mod error;
pub mod frame;
pub mod local;
pub mod memory;
pub mod query;
pub mod source;

pub use error::{CloudError, Result};
pub use frame::RasterFrame;
pub use local::LocalStore;
pub use memory::MemorySource;
pub use query::{DateRange, FrameQuery};
pub use source::{earliest, temporal_mean_frame, RasterSource, Selection};
