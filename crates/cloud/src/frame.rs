//! Time-stamped multi-band raster tiles.

use crate::error::{CloudError, Result};
use chrono::NaiveDate;
use orbit_core::{BBox, Raster, CRS};
use std::collections::BTreeMap;
use std::fmt;

/// One acquisition of a collection over some extent.
///
/// All bands share the same grid. Frames are read-only once built.
#[derive(Debug, Clone)]
pub struct RasterFrame {
    collection: String,
    acquired: NaiveDate,
    bands: BTreeMap<String, Raster<f64>>,
}

impl RasterFrame {
    pub fn new(collection: impl Into<String>, acquired: NaiveDate) -> Self {
        Self {
            collection: collection.into(),
            acquired,
            bands: BTreeMap::new(),
        }
    }

    /// Add a band; it must match the grid of the bands already present.
    pub fn with_band(mut self, name: impl Into<String>, raster: Raster<f64>) -> Result<Self> {
        self.insert_band(name, raster)?;
        Ok(self)
    }

    pub fn insert_band(&mut self, name: impl Into<String>, raster: Raster<f64>) -> Result<()> {
        if let Some(first) = self.bands.values().next() {
            if first.shape() != raster.shape() || first.transform() != raster.transform() {
                return Err(CloudError::Core(orbit_core::Error::SizeMismatch {
                    er: first.rows(),
                    ec: first.cols(),
                    ar: raster.rows(),
                    ac: raster.cols(),
                }));
            }
        }
        self.bands.insert(name.into(), raster);
        Ok(())
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn acquired(&self) -> NaiveDate {
        self.acquired
    }

    /// Band by name
    pub fn band(&self, name: &str) -> Result<&Raster<f64>> {
        self.bands.get(name).ok_or_else(|| CloudError::MissingBand {
            band: name.to_string(),
            frame: self.to_string(),
        })
    }

    pub fn has_band(&self, name: &str) -> bool {
        self.bands.contains_key(name)
    }

    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(String::as_str)
    }

    /// Map extent of the frame, `None` for a frame without bands.
    pub fn bounds(&self) -> Option<BBox> {
        self.bands.values().next().map(Raster::bounds)
    }

    /// CRS of the frame's grid
    pub fn crs(&self) -> Option<&CRS> {
        self.bands.values().next().and_then(Raster::crs)
    }
}

impl fmt::Display for RasterFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.collection, self.acquired.format("%Y-%m-%d"))
    }
}
