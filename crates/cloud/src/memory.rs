//! A raster source over frames held in memory.

use crate::error::Result;
use crate::frame::RasterFrame;
use crate::query::FrameQuery;
use crate::source::RasterSource;
use async_trait::async_trait;
use orbit_core::crs::Transformer;
use orbit_core::CRS;
use tracing::debug;

/// Serves a fixed set of frames. Useful for tests and for scenes that
/// were loaded up front.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    frames: Vec<RasterFrame>,
}

impl MemorySource {
    pub fn new(frames: Vec<RasterFrame>) -> Self {
        Self { frames }
    }

    pub fn push(&mut self, frame: RasterFrame) {
        self.frames.push(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn matches(frame: &RasterFrame, query: &FrameQuery) -> Result<bool> {
        if frame.collection() != query.collection || !query.dates.contains(frame.acquired()) {
            return Ok(false);
        }
        let Some(footprint) = frame.bounds() else {
            return Ok(false);
        };
        // bands without a CRS are taken as WGS84
        let frame_crs: CRS = frame.crs().cloned().unwrap_or_default();
        let bounds = Transformer::new(&query.crs, &frame_crs)?.transform_bbox(&query.bounds);
        Ok(footprint.intersects(&bounds))
    }
}

#[async_trait]
impl RasterSource for MemorySource {
    async fn fetch(&self, query: &FrameQuery) -> Result<Vec<RasterFrame>> {
        let mut found = Vec::new();
        for frame in &self.frames {
            if !Self::matches(frame, query)? {
                continue;
            }
            // Fail on a matching frame that lacks a band instead of hiding it
            for band in &query.bands {
                frame.band(band)?;
            }
            found.push(frame.clone());
        }

        debug!(query = %query, frames = found.len(), "Memory source answered");
        if found.is_empty() {
            return Err(query.no_data("no frame matches the query"));
        }
        Ok(found)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

impl FromIterator<RasterFrame> for MemorySource {
    fn from_iter<I: IntoIterator<Item = RasterFrame>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudError;
    use crate::query::DateRange;
    use chrono::NaiveDate;
    use orbit_core::{BBox, GeoTransform, Raster};

    fn frame(collection: &str, month: u32, day: u32) -> RasterFrame {
        let band = Raster::filled(10, 10, 0.5)
            .with_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0))
            .with_crs(CRS::wgs84());
        RasterFrame::new(collection, NaiveDate::from_ymd_opt(2021, month, day).unwrap())
            .with_band("B8", band.clone())
            .unwrap()
            .with_band("B4", band)
            .unwrap()
    }

    fn query(month: u32, bounds: BBox, bands: &[&str]) -> FrameQuery {
        FrameQuery::new("S2", DateRange::month(2021, month).unwrap(), bounds, CRS::wgs84(), bands)
    }

    #[tokio::test]
    async fn test_filters_by_collection_date_and_footprint() {
        let source: MemorySource = [frame("S2", 6, 3), frame("S2", 7, 1), frame("L8", 6, 5)]
            .into_iter()
            .collect();

        let found = source
            .fetch(&query(6, BBox::new(1.0, 1.0, 2.0, 2.0), &["B8", "B4"]))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].acquired().to_string(), "2021-06-03");

        let err = source
            .fetch(&query(6, BBox::new(50.0, 50.0, 60.0, 60.0), &["B8"]))
            .await
            .unwrap_err();
        assert!(err.is_no_data());
    }

    #[tokio::test]
    async fn test_missing_band_is_an_error() {
        let source = MemorySource::new(vec![frame("S2", 6, 3)]);
        let err = source
            .fetch(&query(6, BBox::new(1.0, 1.0, 2.0, 2.0), &["B11"]))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::MissingBand { .. }));
    }
}
