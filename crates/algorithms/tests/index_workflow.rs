//! End-to-end checks of the raster steps on GeoTIFF band files.
//!
//! Builds a small synthetic scene: the western half is a lake (high green,
//! low NIR), the eastern half is cropland (low green, high NIR).

use approx::assert_relative_eq;
use orbit_algorithms::classification::{is_water, WaterSummary};
use orbit_algorithms::imagery::{ndvi, ndwi};
use orbit_algorithms::sampling::SampleGrid;
use orbit_algorithms::statistics::{mean_over_region, sample_at_point, temporal_mean, ReduceParams};
use orbit_core::io::{read_geotiff, write_geotiff};
use orbit_core::{BBox, GeoTransform, Raster, Region, CRS};

const SIZE: usize = 20;

/// 20 x 20 band of 1-unit pixels covering (0, 0) - (20, 20)
fn band(west: f64, east: f64) -> Raster<f64> {
    let mut r = Raster::new(SIZE, SIZE)
        .with_transform(GeoTransform::new(0.0, SIZE as f64, 1.0, -1.0))
        .with_crs(CRS::wgs84());
    for row in 0..SIZE {
        for col in 0..SIZE {
            let v = if col < SIZE / 2 { west } else { east };
            r.set(row, col, v).unwrap();
        }
    }
    r
}

fn write_and_read(dir: &tempfile::TempDir, name: &str, raster: &Raster<f64>) -> Raster<f64> {
    let path = dir.path().join(name);
    write_geotiff(raster, &path).unwrap();
    read_geotiff::<f64, _>(&path).unwrap()
}

#[test]
fn test_ndwi_from_geotiff_bands() {
    let dir = tempfile::tempdir().unwrap();
    let green = write_and_read(&dir, "B3.tif", &band(0.09, 0.05));
    let nir = write_and_read(&dir, "B5.tif", &band(0.01, 0.30));

    assert_eq!(green.crs().and_then(CRS::epsg), Some(4326));

    let index = ndwi(&green, &nir).unwrap();
    let params = ReduceParams::new(1.0, 10_000);

    let lake = mean_over_region(&index, &BBox::new(0.0, 0.0, 10.0, 20.0), &params)
        .unwrap()
        .unwrap();
    let crops = mean_over_region(&index, &BBox::new(10.0, 0.0, 20.0, 20.0), &params)
        .unwrap()
        .unwrap();

    // f32 storage loses some precision
    assert_relative_eq!(lake, 0.8, epsilon = 1e-5);
    assert!(crops < 0.0);
}

#[test]
fn test_grid_sampling_over_lake_shore() {
    let index = ndwi(&band(0.09, 0.05), &band(0.01, 0.30)).unwrap();
    let region = Region::new("shore", BBox::new(0.0, 0.0, 20.0, 20.0), CRS::wgs84()).unwrap();

    // area 400 -> 20 columns, ceil(20 / 10) = 2 rows
    let grid = SampleGrid::new(&region, 10, &CRS::wgs84()).unwrap();
    assert_eq!(grid.len(), 40);

    let summary: WaterSummary = grid
        .points()
        .map(|p| is_water(sample_at_point(&index, p.x(), p.y(), 1.0).unwrap(), 0.2))
        .collect();

    assert_eq!(summary.sampled, 40);
    // points at y = 0 sit on the bottom edge, which is still inside the raster
    assert_eq!(summary.no_data, 0);
    assert_eq!(summary.water, 20);
    assert_eq!(summary.fraction(), Some(0.5));
}

#[test]
fn test_temporal_mean_then_reduce() {
    let mut cloudy = band(0.5, 0.5);
    for row in 0..SIZE {
        cloudy.set(row, 0, f64::NAN).unwrap();
    }
    let clear = band(0.3, 0.3);

    let composite = temporal_mean(&[cloudy, clear]).unwrap();
    assert_relative_eq!(composite.get(0, 0).unwrap(), 0.3, epsilon = 1e-12);
    assert_relative_eq!(composite.get(0, 5).unwrap(), 0.4, epsilon = 1e-12);
}

#[test]
fn test_constant_index_region_mean() {
    let index = ndvi(&band(0.75, 0.75), &band(0.25, 0.25)).unwrap();
    let mean = mean_over_region(&index, &BBox::new(0.0, 0.0, 1.0, 1.0), &ReduceParams::default())
        .unwrap();
    assert_relative_eq!(mean.unwrap(), 0.5, epsilon = 1e-12);
}
