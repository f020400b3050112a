//! Normalized difference indices
//!
//! Every index here has the form `(A - B) / (A + B)` over two single-band
//! rasters of the same scene.

use ndarray::Array2;
use orbit_core::raster::Raster;
use orbit_core::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported normalized difference indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpectralIndex {
    /// Normalized Difference Vegetation Index
    Ndvi,
    /// Normalized Difference Water Index (McFeeters)
    Ndwi,
    /// Modified NDWI (Xu, uses SWIR)
    Mndwi,
}

/// The two bands of a normalized difference, by asset/band name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandPair {
    /// Band `A`, the positive term of the numerator
    pub positive: String,
    /// Band `B`, the negative term of the numerator
    pub negative: String,
}

impl BandPair {
    pub fn new(positive: impl Into<String>, negative: impl Into<String>) -> Self {
        Self {
            positive: positive.into(),
            negative: negative.into(),
        }
    }

    /// Both band names, in fetch order
    pub fn names(&self) -> [&str; 2] {
        [&self.positive, &self.negative]
    }
}

impl SpectralIndex {
    /// Conventional band pair for the index.
    ///
    /// NDVI uses Sentinel-2 NIR/Red (`B8`, `B4`); NDWI and MNDWI use
    /// Landsat 8 Green against NIR (`B3`, `B5`) or SWIR1 (`B3`, `B6`).
    pub fn default_bands(self) -> BandPair {
        match self {
            SpectralIndex::Ndvi => BandPair::new("B8", "B4"),
            SpectralIndex::Ndwi => BandPair::new("B3", "B5"),
            SpectralIndex::Mndwi => BandPair::new("B3", "B6"),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SpectralIndex::Ndvi => "NDVI",
            SpectralIndex::Ndwi => "NDWI",
            SpectralIndex::Mndwi => "MNDWI",
        }
    }
}

impl fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SpectralIndex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ndvi" => Ok(SpectralIndex::Ndvi),
            "ndwi" => Ok(SpectralIndex::Ndwi),
            "mndwi" => Ok(SpectralIndex::Mndwi),
            other => Err(Error::InvalidParameter {
                name: "index",
                value: other.to_string(),
                reason: "expected ndvi, ndwi or mndwi".to_string(),
            }),
        }
    }
}

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// The output is NaN (no-data) wherever either input is no-data or
/// `band_a + band_b` is zero, so it never contains infinities. For
/// non-negative inputs every valid value lies in `[-1, 1]`.
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    if band_a.shape() != band_b.shape() {
        return Err(Error::SizeMismatch {
            er: band_a.rows(),
            ec: band_a.cols(),
            ar: band_b.rows(),
            ac: band_b.cols(),
        });
    }

    let (rows, cols) = band_a.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map_iter(|row| {
            (0..cols).map(move |col| {
                match (band_a.valid_value(row, col), band_b.valid_value(row, col)) {
                    (Some(a), Some(b)) if a + b != 0.0 => {
                        let value = (a - b) / (a + b);
                        if value.is_finite() {
                            value
                        } else {
                            f64::NAN
                        }
                    }
                    _ => f64::NAN,
                }
            })
        })
        .collect();

    let mut output = band_a.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// Dense vegetation sits around 0.6 to 0.9, bare soil 0.1 to 0.2, water and
/// clouds below 0.
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

/// Normalized Difference Water Index (McFeeters, 1996)
///
/// `NDWI = (Green - NIR) / (Green + NIR)`
///
/// Positive values indicate open water.
pub fn ndwi(green: &Raster<f64>, nir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(green, nir)
}

/// Modified Normalized Difference Water Index (Xu, 2006)
///
/// `MNDWI = (Green - SWIR) / (Green + SWIR)`
pub fn mndwi(green: &Raster<f64>, swir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(green, swir)
}
