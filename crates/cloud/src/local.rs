//! A raster source backed by band files on disk.
//!
//! Layout: `<root>/<collection>/<YYYY-MM-DD>/<band>.tif`, one single-band
//! GeoTIFF per band and acquisition. Scenes are clipped to the query bounds
//! before being returned.

use crate::cache::{SceneCache, SceneKey};
use crate::error::{CloudError, Result};
use crate::frame::RasterFrame;
use crate::query::{parse_date, FrameQuery};
use crate::source::RasterSource;
use async_trait::async_trait;
use chrono::NaiveDate;
use orbit_core::crs::Transformer;
use orbit_core::io::read_geotiff;
use orbit_core::{Raster, CRS};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Default number of decoded bands kept in memory
pub const DEFAULT_CACHE_BANDS: usize = 32;

/// Directory-backed [`RasterSource`].
pub struct LocalStore {
    root: PathBuf,
    cache: Mutex<SceneCache>,
}

impl LocalStore {
    /// Open a store rooted at `root`; the directory must exist.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_cache_capacity(root, DEFAULT_CACHE_BANDS)
    }

    pub fn with_cache_capacity(root: impl Into<PathBuf>, capacity: usize) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(CloudError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("store root {} is not a directory", root.display()),
            )));
        }
        Ok(Self {
            root,
            cache: Mutex::new(SceneCache::new(capacity)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of one band file
    pub fn band_path(&self, collection: &str, acquired: NaiveDate, band: &str) -> PathBuf {
        self.root
            .join(collection)
            .join(acquired.format("%Y-%m-%d").to_string())
            .join(format!("{band}.tif"))
    }

    /// Acquisition dates present for a collection, ascending.
    pub async fn acquisitions(&self, collection: &str) -> Result<Vec<NaiveDate>> {
        let dir = self.root.join(collection);
        if !tokio::fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }

        let mut dates = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            match name.to_str().map(parse_date) {
                Some(Ok(date)) => dates.push(date),
                _ => debug!(entry = ?name, "Skipping non-date directory"),
            }
        }
        dates.sort();
        Ok(dates)
    }

    fn cached(&self, key: &SceneKey) -> Option<Arc<Raster<f64>>> {
        self.cache.lock().ok()?.get(key)
    }

    /// Decode a band, going through the scene cache.
    async fn load_band(&self, key: SceneKey) -> Result<Arc<Raster<f64>>> {
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let path = self.band_path(&key.collection, key.acquired, &key.band);
        let raster = tokio::task::spawn_blocking(move || read_geotiff::<f64, _>(&path))
            .await
            .map_err(|e| CloudError::Io(std::io::Error::other(e)))??;
        let raster = Arc::new(raster);

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, Arc::clone(&raster));
        }
        Ok(raster)
    }

    /// Build the clipped frame for one acquisition, `None` if it does not
    /// cover the query or lacks a band.
    async fn load_frame(&self, query: &FrameQuery, acquired: NaiveDate) -> Result<Option<RasterFrame>> {
        let mut frame = RasterFrame::new(query.collection.as_str(), acquired);

        for band in &query.bands {
            if !self.band_path(&query.collection, acquired, band).is_file() {
                warn!(collection = %query.collection, %acquired, band, "Acquisition lacks band, skipping");
                return Ok(None);
            }

            let scene = self
                .load_band(SceneKey::new(&query.collection, acquired, band))
                .await?;
            let scene_crs: CRS = scene.crs().cloned().unwrap_or_default();
            let bounds = Transformer::new(&query.crs, &scene_crs)?.transform_bbox(&query.bounds);

            match scene.crop(&bounds) {
                Some(window) => frame.insert_band(band.as_str(), window)?,
                None => return Ok(None),
            }
        }
        Ok(Some(frame))
    }
}

#[async_trait]
impl RasterSource for LocalStore {
    async fn fetch(&self, query: &FrameQuery) -> Result<Vec<RasterFrame>> {
        let dates: Vec<NaiveDate> = self
            .acquisitions(&query.collection)
            .await?
            .into_iter()
            .filter(|d| query.dates.contains(*d))
            .collect();

        let mut frames = Vec::new();
        for acquired in dates {
            if let Some(frame) = self.load_frame(query, acquired).await? {
                frames.push(frame);
            }
        }

        debug!(query = %query, frames = frames.len(), "Local store answered");
        if frames.is_empty() {
            return Err(query.no_data(format!(
                "no acquisition under {} covers the query",
                self.root.join(&query.collection).display()
            )));
        }
        Ok(frames)
    }

    fn name(&self) -> &str {
        "local"
    }
}
