//! The two batch operations over a region catalog.
//!
//! Regions are independent units of work. Up to `runtime.concurrency` of
//! them are in flight at once, each source call is bounded by
//! `runtime.fetch_timeout_secs`, and results come back in catalog order. A
//! region that fails for any reason (no data, timeout, missing band, bad
//! raster) yields no-data and the batch goes on.

use crate::config::{check_band_pair, check_threshold, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::results::{PointResult, RegionPoints, RegionResult};
use futures::stream::{self, StreamExt};
use orbit_algorithms::classification::is_water;
use orbit_algorithms::imagery::{normalized_difference, BandPair};
use orbit_algorithms::sampling::SampleGrid;
use orbit_algorithms::statistics::{mean_over_region, sample_at_point, ReduceParams};
use orbit_cloud::{CloudError, DateRange, FrameQuery, RasterFrame, RasterSource, Selection};
use orbit_core::crs::Transformer;
use orbit_core::{Raster, Region, SamplePoint};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

type UnitResult<T> = std::result::Result<T, CloudError>;

/// Runs batches against one raster source with one configuration.
pub struct Orchestrator {
    config: PipelineConfig,
    source: Arc<dyn RasterSource>,
}

impl Orchestrator {
    /// Validate `config` and bind it to `source`.
    pub fn new(config: PipelineConfig, source: Arc<dyn RasterSource>) -> Result<Self> {
        config.validate()?;
        debug!(
            source = source.name(),
            concurrency = config.runtime.concurrency,
            timeout = ?config.runtime.fetch_timeout(),
            "Orchestrator ready"
        );
        Ok(Self { config, source })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Mean normalized difference of `bands` inside each region.
    ///
    /// Uses the earliest acquisition of `collection` in the given calendar
    /// month. Returns one result per region, in input order.
    pub async fn compute_mean_index_per_region(
        &self,
        regions: &[Region],
        collection: &str,
        year: i32,
        month: u32,
        bands: &BandPair,
    ) -> Result<Vec<RegionResult>> {
        check_band_pair(bands).map_err(PipelineError::InvalidConfiguration)?;
        let dates = DateRange::month(year, month)
            .map_err(|e| PipelineError::InvalidConfiguration(e.to_string()))?;
        let params = ReduceParams::new(self.config.mean_index.scale, self.config.mean_index.max_pixels);

        let started = Instant::now();
        let results: Vec<RegionResult> = stream::iter(regions)
            .map(|region| self.mean_for_region(region, collection, dates, bands, params))
            .buffered(self.config.runtime.concurrency)
            .collect()
            .await;

        info!(
            collection,
            %dates,
            regions = results.len(),
            with_data = results.iter().filter(|r| !r.is_no_data()).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Mean index batch finished"
        );
        Ok(results)
    }

    /// Classify a grid of points per region as water / non-water.
    ///
    /// The index is computed on the pixel-wise mean of every acquisition of
    /// `collection` in `dates`, using the configured water bands. A point is
    /// water when its sampled value is strictly above `threshold`.
    pub async fn classify_points_as_water(
        &self,
        regions: &[Region],
        collection: &str,
        dates: DateRange,
        threshold: f64,
    ) -> Result<Vec<RegionPoints>> {
        check_threshold(threshold).map_err(PipelineError::InvalidConfiguration)?;
        let bands = self.config.water.band_pair();
        let output_crs = self.config.crs.output_crs();

        // Layout happens up front so a failed fetch still reports its points
        let grids = regions
            .iter()
            .map(|region| SampleGrid::new(region, self.config.water.total_points, &output_crs))
            .collect::<orbit_core::Result<Vec<_>>>()?;

        let started = Instant::now();
        let results: Vec<RegionPoints> = stream::iter(regions.iter().zip(grids))
            .map(|(region, grid)| self.water_for_region(region, grid, collection, dates, &bands, threshold))
            .buffered(self.config.runtime.concurrency)
            .collect()
            .await;

        info!(
            collection,
            %dates,
            regions = results.len(),
            points = results.iter().map(|r| r.summary.sampled).sum::<usize>(),
            water = results.iter().map(|r| r.summary.water).sum::<usize>(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Water classification batch finished"
        );
        Ok(results)
    }

    async fn mean_for_region(
        &self,
        region: &Region,
        collection: &str,
        dates: DateRange,
        bands: &BandPair,
        params: ReduceParams,
    ) -> RegionResult {
        let query = FrameQuery::new(collection, dates, *region.bbox(), region.crs().clone(), &bands.names());
        match self.region_mean(region, &query, bands, params).await {
            Ok(mean) => {
                debug!(region = region.id(), ?mean, "Region reduced");
                RegionResult::new(region.id(), mean)
            }
            Err(e) => {
                log_unit_failure(region.id(), &e);
                RegionResult::no_data(region.id())
            }
        }
    }

    async fn region_mean(
        &self,
        region: &Region,
        query: &FrameQuery,
        bands: &BandPair,
        params: ReduceParams,
    ) -> UnitResult<Option<f64>> {
        let frame = Selection::Earliest.apply(self.fetch(query).await?, query)?;
        let bands = bands.clone();
        let region = region.clone();

        run_blocking(move || {
            let index = band_index(&frame, &bands)?;
            let raster_crs = index.crs().cloned().unwrap_or_default();
            let bbox = Transformer::new(region.crs(), &raster_crs)?.transform_bbox(region.bbox());
            Ok(mean_over_region(&index, &bbox, &params)?)
        })
        .await
    }

    async fn water_for_region(
        &self,
        region: &Region,
        grid: SampleGrid,
        collection: &str,
        dates: DateRange,
        bands: &BandPair,
        threshold: f64,
    ) -> RegionPoints {
        let points: Vec<SamplePoint> = grid.points().collect();
        let query = FrameQuery::new(collection, dates, *region.bbox(), region.crs().clone(), &bands.names());

        match self.sample_region(&query, bands, points.clone(), threshold).await {
            Ok(results) => RegionPoints::new(region.clone(), results),
            Err(e) => {
                log_unit_failure(region.id(), &e);
                RegionPoints::new(region.clone(), points.into_iter().map(PointResult::no_data).collect())
            }
        }
    }

    async fn sample_region(
        &self,
        query: &FrameQuery,
        bands: &BandPair,
        points: Vec<SamplePoint>,
        threshold: f64,
    ) -> UnitResult<Vec<PointResult>> {
        let frame = Selection::TemporalMean.apply(self.fetch(query).await?, query)?;
        let bands = bands.clone();
        let output_crs = self.config.crs.output_crs();
        let scale = self.config.water.sample_scale;

        run_blocking(move || {
            let index = band_index(&frame, &bands)?;
            let raster_crs = index.crs().cloned().unwrap_or_default();
            let to_raster = Transformer::new(&output_crs, &raster_crs)?;
            Ok(points
                .into_par_iter()
                .map(|point| classify_point(&index, &to_raster, point, scale, threshold))
                .collect())
        })
        .await
    }

    /// One source call, bounded by the configured timeout.
    async fn fetch(&self, query: &FrameQuery) -> UnitResult<Vec<RasterFrame>> {
        let after = self.config.runtime.fetch_timeout();
        match tokio::time::timeout(after, self.source.fetch(query)).await {
            Ok(frames) => frames,
            Err(_) => Err(CloudError::Timeout { after }),
        }
    }
}

fn band_index(frame: &RasterFrame, bands: &BandPair) -> UnitResult<Raster<f64>> {
    Ok(normalized_difference(
        frame.band(&bands.positive)?,
        frame.band(&bands.negative)?,
    )?)
}

fn classify_point(
    index: &Raster<f64>,
    to_raster: &Transformer,
    point: SamplePoint,
    scale: f64,
    threshold: f64,
) -> PointResult {
    let (x, y) = to_raster.transform(point.x(), point.y());
    let index_value = match sample_at_point(index, x, y, scale) {
        Ok(value) => value.filter(|v| v.is_finite()),
        Err(e) => {
            debug!(region = %point.region_id, error = %e, "Point sampling failed");
            None
        }
    };

    PointResult {
        region_id: point.region_id.clone(),
        is_on_water: is_water(index_value, threshold),
        index_value,
        point,
    }
}

/// Raster math runs off the async workers.
async fn run_blocking<T, F>(f: F) -> UnitResult<T>
where
    F: FnOnce() -> UnitResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CloudError::Io(std::io::Error::other(e)))?
}

fn log_unit_failure(region: &str, err: &CloudError) {
    match err {
        CloudError::Timeout { after } => {
            warn!(region, ?after, "Raster source timed out, recording no-data")
        }
        CloudError::NoData { .. } => info!(region, reason = %err, "No data for region"),
        _ => warn!(region, error = %err, "Region failed, recording no-data"),
    }
}
