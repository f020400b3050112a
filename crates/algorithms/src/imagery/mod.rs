//! Spectral indices from multi-band imagery
//!
//! - **indices**: normalized difference indices (NDVI, NDWI, MNDWI)
//! - **vci**: Vegetation Condition Index and drought classes

mod indices;
mod vci;

pub use indices::{mndwi, ndvi, ndwi, normalized_difference, BandPair, SpectralIndex};
pub use vci::{vci, vci_raster, VegetationState};
