//! The raster source contract and frame selection policies.

use crate::error::{CloudError, Result};
use crate::frame::RasterFrame;
use crate::query::FrameQuery;
use async_trait::async_trait;
use orbit_algorithms::statistics::temporal_mean;
use tracing::debug;

/// Anything that can answer a [`FrameQuery`] with raster frames.
///
/// Implementations must be safe to call concurrently. A query with no
/// matching frame fails with [`CloudError::NoData`]; every returned frame
/// carries all requested bands.
#[async_trait]
pub trait RasterSource: Send + Sync {
    async fn fetch(&self, query: &FrameQuery) -> Result<Vec<RasterFrame>>;

    /// Short name for logs
    fn name(&self) -> &str {
        "raster source"
    }
}

/// How a multi-frame answer is collapsed into one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The earliest acquisition
    Earliest,
    /// Pixel-wise mean of every acquisition
    TemporalMean,
}

impl Selection {
    pub fn apply(self, frames: Vec<RasterFrame>, query: &FrameQuery) -> Result<RasterFrame> {
        match self {
            Selection::Earliest => earliest(frames, query),
            Selection::TemporalMean => temporal_mean_frame(frames, query),
        }
    }
}

/// The earliest frame; ties keep the first one returned by the source.
pub fn earliest(frames: Vec<RasterFrame>, query: &FrameQuery) -> Result<RasterFrame> {
    let count = frames.len();
    let frame = frames
        .into_iter()
        .reduce(|best, f| if f.acquired() < best.acquired() { f } else { best })
        .ok_or_else(|| query.no_data(format!("no frame in {}", query.dates)))?;
    debug!(frame = %frame, candidates = count, "Selected earliest frame");
    Ok(frame)
}

/// One frame holding the pixel-wise mean of each requested band.
///
/// The composite is dated at the earliest acquisition. Frames may be offset
/// or clipped differently: each band is composited on the union of the
/// frames' extents, and a frame only counts where it has data.
pub fn temporal_mean_frame(frames: Vec<RasterFrame>, query: &FrameQuery) -> Result<RasterFrame> {
    let first = frames
        .iter()
        .min_by_key(|f| f.acquired())
        .ok_or_else(|| query.no_data(format!("no frame in {}", query.dates)))?;

    let mut composite = RasterFrame::new(first.collection(), first.acquired());
    for band in &query.bands {
        let stack = frames
            .iter()
            .map(|f| f.band(band).cloned())
            .collect::<Result<Vec<_>>>()?;
        composite.insert_band(band.as_str(), temporal_mean(&stack).map_err(CloudError::Core)?)?;
    }

    debug!(frames = frames.len(), dates = %query.dates, "Built temporal mean composite");
    Ok(composite)
}
