//! End-to-end batches against in-memory and deliberately slow sources.

use approx::assert_relative_eq;
use async_trait::async_trait;
use chrono::NaiveDate;
use orbit_algorithms::imagery::BandPair;
use orbit_cloud::{DateRange, FrameQuery, MemorySource, RasterFrame, RasterSource};
use orbit_core::{BBox, GeoTransform, Raster, Region, CRS};
use orbit_pipeline::{Orchestrator, PipelineConfig, PipelineError};
use std::sync::Arc;
use std::time::Duration;

/// 24 x 24 cells of 0.5 degrees covering (-1, -1) .. (11, 11).
fn band(value_at: impl Fn(f64) -> f64) -> Raster<f64> {
    let gt = GeoTransform::new(-1.0, 11.0, 0.5, -0.5);
    let mut data = Vec::with_capacity(24 * 24);
    for _row in 0..24 {
        for col in 0..24 {
            data.push(value_at(-1.0 + (col as f64 + 0.5) * 0.5));
        }
    }
    Raster::from_vec(data, 24, 24)
        .unwrap()
        .with_transform(gt)
        .with_crs(CRS::wgs84())
}

/// 24 rows of 0.5 degree cells from y = 11 down, `cols` wide from `min_x`.
fn strip(min_x: f64, cols: usize, value: f64) -> Raster<f64> {
    Raster::filled(24, cols, value)
        .with_transform(GeoTransform::new(min_x, 11.0, 0.5, -0.5))
        .with_crs(CRS::wgs84())
}

/// Landsat-like frame over `cols` cells from `min_x` with a uniform NDWI
fn l8_strip(day: u32, min_x: f64, cols: usize, green: f64) -> RasterFrame {
    RasterFrame::new("L8", date(2015, 7, day))
        .with_band("B3", strip(min_x, cols, green))
        .unwrap()
        .with_band("B5", strip(min_x, cols, 0.25))
        .unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Sentinel-2 like frame whose NDVI is 0.5 everywhere
fn s2_frame(day: u32) -> RasterFrame {
    RasterFrame::new("S2", date(2021, 4, day))
        .with_band("B8", band(|_| 0.75))
        .unwrap()
        .with_band("B4", band(|_| 0.25))
        .unwrap()
}

/// Landsat-like frame with water west of x = 5
fn l8_frame(day: u32, water_green: f64) -> RasterFrame {
    RasterFrame::new("L8", date(2015, 6, day))
        .with_band("B3", band(move |x| if x < 5.0 { water_green } else { 0.25 }))
        .unwrap()
        .with_band("B5", band(|_| 0.25))
        .unwrap()
}

fn region(id: &str, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Region {
    Region::new(id, BBox::new(min_x, min_y, max_x, max_y), CRS::wgs84()).unwrap()
}

fn config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.runtime.concurrency = 2;
    config.water.sample_scale = 0.5;
    config.water.bands = ("B3".to_string(), "B5".to_string());
    config
}

fn ndvi_bands() -> BandPair {
    BandPair::new("B8", "B4")
}

fn year_2015() -> DateRange {
    DateRange::parse("2015-01-01", "2015-12-31").unwrap()
}

/// Stalls on queries north of y = 0.5, answers the rest at once.
struct SlowNorth(MemorySource);

#[async_trait]
impl RasterSource for SlowNorth {
    async fn fetch(&self, query: &FrameQuery) -> orbit_cloud::Result<Vec<RasterFrame>> {
        if query.bounds.min_y >= 0.5 {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        self.0.fetch(query).await
    }
}

#[tokio::test]
async fn test_constant_index_mean() {
    let source = MemorySource::new(vec![s2_frame(12)]);
    let orchestrator = Orchestrator::new(config(), Arc::new(source)).unwrap();

    let results = orchestrator
        .compute_mean_index_per_region(&[region("A", 0.0, 0.0, 1.0, 1.0)], "S2", 2021, 4, &ndvi_bands())
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].region_id, "A");
    assert_relative_eq!(results[0].mean_index.unwrap(), 0.5, epsilon = 1e-12);
}

#[tokio::test]
async fn test_missing_region_does_not_abort_batch() {
    let source = MemorySource::new(vec![s2_frame(3), s2_frame(20)]);
    let orchestrator = Orchestrator::new(config(), Arc::new(source)).unwrap();
    let regions = [
        region("first", 0.0, 0.0, 1.0, 1.0),
        region("offshore", 50.0, 50.0, 51.0, 51.0),
        region("third", 2.0, 2.0, 4.0, 3.0),
    ];

    let results = orchestrator
        .compute_mean_index_per_region(&regions, "S2", 2021, 4, &ndvi_bands())
        .await
        .unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.region_id.as_str()).collect();
    assert_eq!(ids, ["first", "offshore", "third"]);
    assert!(results[0].mean_index.is_some());
    assert!(results[1].is_no_data());
    assert!(results[2].mean_index.is_some());
}

#[tokio::test]
async fn test_wrong_month_or_band_is_no_data() {
    let source = MemorySource::new(vec![s2_frame(12)]);
    let orchestrator = Orchestrator::new(config(), Arc::new(source)).unwrap();
    let regions = [region("A", 0.0, 0.0, 1.0, 1.0)];

    let may = orchestrator
        .compute_mean_index_per_region(&regions, "S2", 2021, 5, &ndvi_bands())
        .await
        .unwrap();
    assert!(may[0].is_no_data());

    let swir = orchestrator
        .compute_mean_index_per_region(&regions, "S2", 2021, 4, &BandPair::new("B8", "B11"))
        .await
        .unwrap();
    assert!(swir[0].is_no_data());
}

#[tokio::test]
async fn test_timeout_counts_as_no_data() {
    let mut config = config();
    config.runtime.fetch_timeout_secs = 0.05;
    let source = SlowNorth(MemorySource::new(vec![s2_frame(12)]));
    let orchestrator = Orchestrator::new(config, Arc::new(source)).unwrap();
    let regions = [
        region("slow", 0.0, 0.5, 1.0, 1.5),
        region("fast", 0.0, 0.0, 1.0, 0.4),
    ];

    let results = orchestrator
        .compute_mean_index_per_region(&regions, "S2", 2021, 4, &ndvi_bands())
        .await
        .unwrap();

    assert_eq!(results[0].region_id, "slow");
    assert!(results[0].is_no_data());
    assert_relative_eq!(results[1].mean_index.unwrap(), 0.5, epsilon = 1e-12);
}

#[tokio::test]
async fn test_batch_fatal_arguments() {
    let orchestrator = Orchestrator::new(config(), Arc::new(MemorySource::default())).unwrap();
    let regions = [region("A", 0.0, 0.0, 1.0, 1.0)];

    let month = orchestrator
        .compute_mean_index_per_region(&regions, "S2", 2021, 13, &ndvi_bands())
        .await;
    assert!(matches!(month, Err(PipelineError::InvalidConfiguration(_))));

    let bands = orchestrator
        .compute_mean_index_per_region(&regions, "S2", 2021, 4, &BandPair::new("B4", "B4"))
        .await;
    assert!(matches!(bands, Err(PipelineError::InvalidConfiguration(_))));

    let threshold = orchestrator
        .classify_points_as_water(&regions, "L8", year_2015(), 2.0)
        .await;
    assert!(matches!(threshold, Err(PipelineError::InvalidConfiguration(_))));
}

#[test]
fn test_invalid_config_rejected_before_work() {
    let mut config = config();
    config.water.total_points = 0;
    let err = Orchestrator::new(config, Arc::new(MemorySource::default())).err().unwrap();
    assert!(matches!(err, PipelineError::InvalidConfiguration(_)));
}

#[test]
fn test_unrepresentable_timeout_rejected() {
    let mut config = config();
    config.runtime.fetch_timeout_secs = 1e20;
    let err = Orchestrator::new(config, Arc::new(MemorySource::default())).err().unwrap();
    assert!(matches!(err, PipelineError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn test_water_points_over_temporal_mean() {
    // 1.0 and 0.5 average to 0.75 -> NDWI 0.5 on the water side, 0 elsewhere
    let source = MemorySource::new(vec![l8_frame(5, 1.0), l8_frame(21, 0.5)]);
    let orchestrator = Orchestrator::new(config(), Arc::new(source)).unwrap();
    // area 100 with 10 requested points -> 10 x 1 grid along y = 0
    let regions = [region("shore", 0.0, 0.0, 10.0, 10.0)];

    let results = orchestrator
        .classify_points_as_water(&regions, "L8", year_2015(), 0.2)
        .await
        .unwrap();

    let shore = &results[0];
    assert_eq!(shore.region_id(), "shore");
    assert_eq!(shore.points.len(), 10);
    for (i, p) in shore.points.iter().enumerate() {
        assert_relative_eq!(p.point.x(), i as f64, epsilon = 1e-12);
        assert_relative_eq!(p.point.y(), 0.0, epsilon = 1e-12);
        assert_eq!(p.region_id, "shore");
        assert_eq!(p.is_on_water, Some(i < 5), "point {i}");
    }
    assert_relative_eq!(shore.points[0].index_value.unwrap(), 0.5, epsilon = 1e-12);
    assert_eq!(shore.summary.water, 5);
    assert_eq!(shore.summary.fraction(), Some(0.5));
}

#[tokio::test]
async fn test_threshold_is_strict() {
    let source = MemorySource::new(vec![l8_frame(5, 0.75)]);
    let orchestrator = Orchestrator::new(config(), Arc::new(source)).unwrap();
    let regions = [region("shore", 0.0, 0.0, 10.0, 10.0)];

    let at = orchestrator
        .classify_points_as_water(&regions, "L8", year_2015(), 0.5)
        .await
        .unwrap();
    assert_eq!(at[0].summary.water, 0);
    assert_eq!(at[0].summary.no_data, 0);

    let below = orchestrator
        .classify_points_as_water(&regions, "L8", year_2015(), 0.49)
        .await
        .unwrap();
    assert_eq!(below[0].summary.water, 5);
}

#[tokio::test]
async fn test_points_off_the_raster_are_no_data() {
    let source = MemorySource::new(vec![l8_frame(5, 0.75)]);
    let orchestrator = Orchestrator::new(config(), Arc::new(source)).unwrap();
    let regions = [
        region("edge", 8.5, 0.0, 18.5, 10.0),
        region("nowhere", 60.0, 60.0, 70.0, 70.0),
    ];

    let results = orchestrator
        .classify_points_as_water(&regions, "L8", year_2015(), 0.2)
        .await
        .unwrap();

    // x = 8.5, 9.5, 10.5 fall on dry land, the rest past the raster edge
    let edge = &results[0];
    assert_eq!(edge.summary.sampled, 10);
    assert_eq!(edge.summary.no_data, 7);
    assert_eq!(edge.summary.water, 0);
    assert_eq!(edge.points[0].is_on_water, Some(false));

    // no frame at all: every point is still reported
    let nowhere = &results[1];
    assert_eq!(nowhere.points.len(), 10);
    assert!(nowhere.points.iter().all(|p| p.is_on_water.is_none()));
    assert_eq!(nowhere.summary.fraction(), None);
}

#[tokio::test]
async fn test_offset_acquisitions_composite_on_shared_ground() {
    // NDWI 0.5 over x -1..10, NDWI 0 over x 5..15
    let source = MemorySource::new(vec![l8_strip(2, -1.0, 22, 0.75), l8_strip(18, 5.0, 20, 0.25)]);
    let orchestrator = Orchestrator::new(config(), Arc::new(source)).unwrap();
    let regions = [region("shore", 0.0, 0.0, 10.0, 10.0)];

    let results = orchestrator
        .classify_points_as_water(&regions, "L8", year_2015(), 0.4)
        .await
        .unwrap();

    let shore = &results[0];
    assert_eq!(shore.summary.no_data, 0);
    for p in &shore.points[..5] {
        assert_relative_eq!(p.index_value.unwrap(), 0.5, epsilon = 1e-12);
    }
    // green averages to 0.5 over red 0.25 where both cover
    for p in &shore.points[5..] {
        assert_relative_eq!(p.index_value.unwrap(), 1.0 / 3.0, epsilon = 1e-12);
    }
    assert_eq!(shore.summary.water, 5);
}

#[tokio::test]
async fn test_clipped_acquisition_keeps_region_sampled() {
    // the second scene stops at x = 4
    let source = MemorySource::new(vec![l8_strip(2, -1.0, 22, 0.75), l8_strip(18, -1.0, 10, 0.25)]);
    let orchestrator = Orchestrator::new(config(), Arc::new(source)).unwrap();
    let regions = [region("shore", 0.0, 0.0, 10.0, 10.0)];

    let results = orchestrator
        .classify_points_as_water(&regions, "L8", year_2015(), 0.4)
        .await
        .unwrap();

    let shore = &results[0];
    assert_eq!(shore.summary.no_data, 0);
    for p in &shore.points[..4] {
        assert_relative_eq!(p.index_value.unwrap(), 1.0 / 3.0, epsilon = 1e-12);
    }
    for p in &shore.points[4..] {
        assert_relative_eq!(p.index_value.unwrap(), 0.5, epsilon = 1e-12);
    }
    assert_eq!(shore.summary.water, 6);
}
