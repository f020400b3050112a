use serde::{Deserialize, Serialize};

/// NDWI above which a sample counts as open water
pub const DEFAULT_WATER_THRESHOLD: f64 = 0.2;

/// Water decision for one sampled index value.
///
/// Strictly greater than `threshold`; `None` passes no-data through.
pub fn is_water(value: Option<f64>, threshold: f64) -> Option<bool> {
    value.filter(|v| v.is_finite()).map(|v| v > threshold)
}

/// Tally of water decisions for the points of one region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WaterSummary {
    /// Points sampled, including no-data
    pub sampled: usize,
    /// Points classified as water
    pub water: usize,
    /// Points without a valid sample
    pub no_data: usize,
}

impl WaterSummary {
    pub fn record(&mut self, decision: Option<bool>) {
        self.sampled += 1;
        match decision {
            Some(true) => self.water += 1,
            Some(false) => {}
            None => self.no_data += 1,
        }
    }

    /// Points with a valid sample
    pub fn valid(&self) -> usize {
        self.sampled - self.no_data
    }

    /// Share of valid points on water, `None` if no point was valid.
    pub fn fraction(&self) -> Option<f64> {
        let valid = self.valid();
        (valid > 0).then(|| self.water as f64 / valid as f64)
    }
}

impl FromIterator<Option<bool>> for WaterSummary {
    fn from_iter<I: IntoIterator<Item = Option<bool>>>(iter: I) -> Self {
        let mut summary = WaterSummary::default();
        for decision in iter {
            summary.record(decision);
        }
        summary
    }
}
