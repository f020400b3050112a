//! Vegetation Condition Index
//!
//! `VCI = (VI - VI_min) / (VI_max - VI_min) * 100`
//!
//! Compares the current vegetation index of a pixel against the range seen
//! in the same period of previous years. Low values indicate drought stress.

use ndarray::Zip;
use orbit_core::raster::Raster;
use orbit_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Drought class derived from a VCI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VegetationState {
    Normal,
    LightDrought,
    Drought,
    SevereDrought,
    ExtremeDrought,
}

impl VegetationState {
    /// Classify a VCI value in `[0, 100]`.
    ///
    /// Classes are 10-point bands: `[40, 100]` normal, `[30, 40)` light
    /// drought, `[20, 30)` drought, `[10, 20)` severe, `[0, 10)` extreme.
    pub fn classify(vci: f64) -> Result<Self> {
        if !(0.0..=100.0).contains(&vci) {
            return Err(Error::InvalidParameter {
                name: "vci",
                value: vci.to_string(),
                reason: "must be between 0 and 100".to_string(),
            });
        }
        Ok(if vci >= 40.0 {
            VegetationState::Normal
        } else if vci >= 30.0 {
            VegetationState::LightDrought
        } else if vci >= 20.0 {
            VegetationState::Drought
        } else if vci >= 10.0 {
            VegetationState::SevereDrought
        } else {
            VegetationState::ExtremeDrought
        })
    }

    pub fn label(self) -> &'static str {
        match self {
            VegetationState::Normal => "normal",
            VegetationState::LightDrought => "light drought",
            VegetationState::Drought => "drought",
            VegetationState::SevereDrought => "severe drought",
            VegetationState::ExtremeDrought => "extreme drought",
        }
    }
}

/// VCI of a single value.
///
/// Fails when the historical range is empty (`max <= min`) or any input is
/// not finite.
pub fn vci(value: f64, min: f64, max: f64) -> Result<f64> {
    if !(value.is_finite() && min.is_finite() && max.is_finite()) {
        return Err(Error::InvalidParameter {
            name: "vci",
            value: format!("{value} in [{min}, {max}]"),
            reason: "inputs must be finite".to_string(),
        });
    }
    if max <= min {
        return Err(Error::InvalidParameter {
            name: "vci",
            value: format!("[{min}, {max}]"),
            reason: "historical max must exceed min".to_string(),
        });
    }
    Ok((value - min) / (max - min) * 100.0)
}

/// Pixel-wise VCI from a current index raster and historical min/max rasters.
pub fn vci_raster(
    current: &Raster<f64>,
    hist_min: &Raster<f64>,
    hist_max: &Raster<f64>,
) -> Result<Raster<f64>> {
    for other in [hist_min, hist_max] {
        if other.shape() != current.shape() {
            return Err(Error::SizeMismatch {
                er: current.rows(),
                ec: current.cols(),
                ar: other.rows(),
                ac: other.cols(),
            });
        }
    }

    let (rows, cols) = current.shape();
    let mut output = current.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));

    Zip::from(output.data_mut())
        .and(current.data())
        .and(hist_min.data())
        .and(hist_max.data())
        .par_for_each(|out, &v, &lo, &hi| {
            *out = vci(v, lo, hi).unwrap_or(f64::NAN);
        });

    Ok(output)
}
