//! Pipeline configuration
//!
//! Loaded from TOML; every section and field is optional and falls back to
//! the settings the two batch operations have always used.
//!
//! ```toml
//! [mean_index]
//! collection = "COPERNICUS/S2_SR"
//! bands = ["B8", "B4"]
//! scale = 10.0
//!
//! [water]
//! threshold = 0.2
//! total_points = 10
//!
//! [runtime]
//! concurrency = 8
//! fetch_timeout_secs = 30.0
//! ```

use crate::error::{PipelineError, Result};
use orbit_algorithms::classification::DEFAULT_WATER_THRESHOLD;
use orbit_algorithms::imagery::BandPair;
use orbit_algorithms::sampling::DEFAULT_TOTAL_POINTS;
use orbit_algorithms::statistics::reduce::{DEFAULT_MAX_PIXELS, DEFAULT_SCALE};
use orbit_core::CRS;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Sentinel-2 surface reflectance
pub const DEFAULT_MEAN_INDEX_COLLECTION: &str = "COPERNICUS/S2_SR";
/// Landsat 8 surface reflectance
pub const DEFAULT_WATER_COLLECTION: &str = "LANDSAT/LC08/C01/T1_SR";
/// Landsat 8 native resolution in meters
pub const DEFAULT_SAMPLE_SCALE: f64 = 30.0;
pub const DEFAULT_FETCH_TIMEOUT_SECS: f64 = 30.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mean_index: MeanIndexConfig,
    pub water: WaterConfig,
    pub runtime: RuntimeConfig,
    pub crs: CrsConfig,
}

/// Settings of the mean-index-per-region operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeanIndexConfig {
    pub collection: String,
    /// `(positive, negative)` band names, NIR/red for NDVI
    pub bands: (String, String),
    /// Reduction cell size in raster units
    pub scale: f64,
    /// Cell budget before the scale is coarsened
    pub max_pixels: u64,
}

impl Default for MeanIndexConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_MEAN_INDEX_COLLECTION.to_string(),
            bands: ("B8".to_string(), "B4".to_string()),
            scale: DEFAULT_SCALE,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

impl MeanIndexConfig {
    pub fn band_pair(&self) -> BandPair {
        BandPair::new(self.bands.0.as_str(), self.bands.1.as_str())
    }
}

/// Settings of the water classification operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterConfig {
    pub collection: String,
    /// `(positive, negative)` band names, green/NIR for NDWI
    pub bands: (String, String),
    /// Index value above which a point is water
    pub threshold: f64,
    /// Requested points per region; see the grid sizing rule
    pub total_points: usize,
    /// Sampling resolution in raster units
    pub sample_scale: f64,
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_WATER_COLLECTION.to_string(),
            bands: ("B3".to_string(), "B5".to_string()),
            threshold: DEFAULT_WATER_THRESHOLD,
            total_points: DEFAULT_TOTAL_POINTS,
            sample_scale: DEFAULT_SAMPLE_SCALE,
        }
    }
}

impl WaterConfig {
    pub fn band_pair(&self) -> BandPair {
        BandPair::new(self.bands.0.as_str(), self.bands.1.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Regions processed at once
    pub concurrency: usize,
    /// Limit on a single raster source call
    pub fetch_timeout_secs: f64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

impl RuntimeConfig {
    /// The per-call limit; values too large for a `Duration` saturate.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.fetch_timeout_secs).unwrap_or(Duration::MAX)
    }
}

/// EPSG codes of the catalog bounds and of emitted sample points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrsConfig {
    pub source: u32,
    pub output: u32,
}

impl Default for CrsConfig {
    fn default() -> Self {
        Self { source: 4326, output: 4326 }
    }
}

impl CrsConfig {
    pub fn source_crs(&self) -> CRS {
        CRS::from_epsg(self.source)
    }

    pub fn output_crs(&self) -> CRS {
        CRS::from_epsg(self.output)
    }
}

impl PipelineConfig {
    /// Parse a TOML document. The result is not validated yet.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML file. The result is not validated yet.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| PipelineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "Loaded pipeline config");
        Ok(config)
    }

    /// Check every setting, reporting all problems at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        let mean = &self.mean_index;
        check_collection("mean_index.collection", &mean.collection, &mut errors);
        check_bands("mean_index.bands", &mean.bands, &mut errors);
        check_positive("mean_index.scale", mean.scale, &mut errors);
        if mean.max_pixels == 0 {
            errors.push("mean_index.max_pixels must be at least 1".to_string());
        }

        let water = &self.water;
        check_collection("water.collection", &water.collection, &mut errors);
        check_bands("water.bands", &water.bands, &mut errors);
        check_positive("water.sample_scale", water.sample_scale, &mut errors);
        if let Err(e) = check_threshold(water.threshold) {
            errors.push(format!("water.{e}"));
        }
        if water.total_points == 0 {
            errors.push("water.total_points must be at least 1".to_string());
        }

        if self.runtime.concurrency == 0 {
            errors.push("runtime.concurrency must be at least 1".to_string());
        }
        let timeout = self.runtime.fetch_timeout_secs;
        check_positive("runtime.fetch_timeout_secs", timeout, &mut errors);
        if timeout.is_finite() && Duration::try_from_secs_f64(timeout).is_err() {
            errors.push(format!("runtime.fetch_timeout_secs is too large, got {timeout}"));
        }

        for (name, code) in [("crs.source", self.crs.source), ("crs.output", self.crs.output)] {
            if let Err(e) = CRS::from_epsg(code).projection() {
                errors.push(format!("{name}: {e}"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::InvalidConfiguration(errors.join("; ")))
        }
    }
}

/// A water threshold must be a finite NDWI value.
pub fn check_threshold(threshold: f64) -> std::result::Result<(), String> {
    if !threshold.is_finite() || !(-1.0..=1.0).contains(&threshold) {
        return Err(format!("threshold must be within [-1, 1], got {threshold}"));
    }
    Ok(())
}

/// Two distinct, non-empty band names.
pub fn check_band_pair(bands: &BandPair) -> std::result::Result<(), String> {
    if bands.positive.trim().is_empty() || bands.negative.trim().is_empty() {
        return Err("band names must not be empty".to_string());
    }
    if bands.positive == bands.negative {
        return Err(format!("bands must differ, got {} twice", bands.positive));
    }
    Ok(())
}

fn check_bands(name: &str, bands: &(String, String), errors: &mut Vec<String>) {
    if let Err(e) = check_band_pair(&BandPair::new(bands.0.as_str(), bands.1.as_str())) {
        errors.push(format!("{name}: {e}"));
    }
}

fn check_collection(name: &str, collection: &str, errors: &mut Vec<String>) {
    if collection.trim().is_empty() {
        errors.push(format!("{name} must not be empty"));
    }
}

fn check_positive(name: &str, value: f64, errors: &mut Vec<String>) {
    if !value.is_finite() || value <= 0.0 {
        errors.push(format!("{name} must be a positive number, got {value}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.mean_index.collection, "COPERNICUS/S2_SR");
        assert_eq!(config.mean_index.scale, 10.0);
        assert_eq!(config.water.threshold, 0.2);
        assert_eq!(config.water.total_points, 10);
        assert_eq!(config.water.sample_scale, 30.0);
        assert!(config.runtime.concurrency >= 1);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [water]
            threshold = 0.3
            bands = ["B3", "B6"]

            [runtime]
            concurrency = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.water.threshold, 0.3);
        assert_eq!(config.water.band_pair(), BandPair::new("B3", "B6"));
        assert_eq!(config.water.total_points, 10);
        assert_eq!(config.runtime.concurrency, 2);
        assert_eq!(config.mean_index, MeanIndexConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let mut config = PipelineConfig::default();
        config.water.threshold = 1.5;
        config.water.total_points = 0;
        config.mean_index.bands = ("B4".to_string(), "B4".to_string());
        config.runtime.concurrency = 0;
        config.crs.output = 2154;

        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("water.threshold"), "{msg}");
        assert!(msg.contains("water.total_points"), "{msg}");
        assert!(msg.contains("mean_index.bands"), "{msg}");
        assert!(msg.contains("runtime.concurrency"), "{msg}");
        assert!(msg.contains("crs.output"), "{msg}");
    }

    #[test]
    fn test_nan_threshold_rejected() {
        assert!(check_threshold(f64::NAN).is_err());
        assert!(check_threshold(-1.0).is_ok());
        assert!(check_threshold(1.0).is_ok());
    }

    #[test]
    fn test_oversized_timeout_rejected() {
        let mut config = PipelineConfig::default();
        config.runtime.fetch_timeout_secs = 1e20;
        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("runtime.fetch_timeout_secs"), "{msg}");
        assert_eq!(config.runtime.fetch_timeout(), Duration::MAX);

        config.runtime.fetch_timeout_secs = 86_400.0;
        config.validate().unwrap();
        assert_eq!(config.runtime.fetch_timeout(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_bad_toml() {
        let err = PipelineConfig::from_toml_str("[water]\nthreshold = \"high\"").unwrap_err();
        assert!(matches!(err, PipelineError::ConfigParse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orbit.toml");
        std::fs::write(&path, "[crs]\nsource = 32633\n").unwrap();
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.crs.source_crs().epsg(), Some(32633));
        assert!(PipelineConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
