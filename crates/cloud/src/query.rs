//! Frame queries: what to fetch, when and where.

use crate::error::{CloudError, Result};
use chrono::{Datelike, NaiveDate};
use orbit_core::{BBox, CRS};
use serde::{Deserialize, Serialize};
use std::fmt;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Half-open range of acquisition dates `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range; `end` must be after `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end <= start {
            return Err(CloudError::InvalidQuery(format!(
                "date range end {end} must be after start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// All of one calendar month.
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| CloudError::InvalidQuery(format!("invalid month {year}-{month}")))?;
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .ok_or_else(|| CloudError::InvalidQuery(format!("invalid month {year}-{month}")))?;
        Self::new(start, end)
    }

    /// Parse `YYYY-MM-DD` bounds, end exclusive.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// First day not in the range
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// Number of days covered
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Whether the range is exactly one calendar month.
    pub fn is_month(&self) -> bool {
        self.start.day() == 1
            && Self::month(self.start.year(), self.start.month()).is_ok_and(|m| m == *self)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map_err(|e| CloudError::InvalidQuery(format!("bad date '{text}': {e}")))
}

/// A request for frames of one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameQuery {
    pub collection: String,
    pub dates: DateRange,
    /// Area of interest, in `crs`
    pub bounds: BBox,
    pub crs: CRS,
    /// Bands every returned frame must carry
    pub bands: Vec<String>,
}

impl FrameQuery {
    pub fn new(
        collection: impl Into<String>,
        dates: DateRange,
        bounds: BBox,
        crs: CRS,
        bands: &[&str],
    ) -> Self {
        Self {
            collection: collection.into(),
            dates,
            bounds,
            crs,
            bands: bands.iter().map(|b| b.to_string()).collect(),
        }
    }

    /// No-data error for this query.
    pub fn no_data(&self, reason: impl Into<String>) -> CloudError {
        CloudError::no_data(self.collection.as_str(), reason)
    }
}

impl fmt::Display for FrameQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({}) bands {:?}",
            self.collection, self.dates, self.bounds, self.crs, self.bands
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_range() {
        let june = DateRange::month(2021, 6).unwrap();
        assert_eq!(june.start(), date(2021, 6, 1));
        assert_eq!(june.end(), date(2021, 7, 1));
        assert!(june.contains(date(2021, 6, 30)));
        assert!(!june.contains(date(2021, 7, 1)));
        assert_eq!(june.days(), 30);
        assert!(june.is_month());
    }

    #[test]
    fn test_december_rolls_over() {
        let dec = DateRange::month(2020, 12).unwrap();
        assert_eq!(dec.end(), date(2021, 1, 1));
        assert_eq!(dec.to_string(), "2020-12-01/2021-01-01");
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(DateRange::month(2021, 13).is_err());
        assert!(DateRange::month(2021, 0).is_err());
        assert!(DateRange::parse("2021-06-10", "2021-06-10").is_err());
        assert!(DateRange::parse("2021-06-10", "June").is_err());
    }

    #[test]
    fn test_parse() {
        let r = DateRange::parse("2019-01-01", " 2020-01-01 ").unwrap();
        assert_eq!(r.days(), 365);
        assert!(!r.is_month());
    }
}
