//! Coordinate Reference System handling and reprojection

mod reproject;

use crate::error::{Error, Result};
use crate::region::BBox;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use reproject::{
    parse_utm_epsg, utm_to_wgs84, web_mercator_to_wgs84, wgs84_to_utm, wgs84_to_web_mercator,
};

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// EPSG code if known
    epsg: Option<u32>,
    /// WKT representation, kept for display when no EPSG code is available
    wkt: Option<String>,
}

/// Projections the pipeline can convert between without external libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// EPSG:4326, longitude/latitude degrees
    Geographic,
    /// EPSG:3857
    WebMercator,
    /// EPSG:326xx / 327xx
    Utm { zone: u32, north: bool },
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            wkt: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            epsg: None,
            wkt: Some(wkt.into()),
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }
        false
    }

    /// Resolve the projection math for this CRS.
    pub fn projection(&self) -> Result<Projection> {
        match self.epsg {
            Some(4326) => Ok(Projection::Geographic),
            Some(3857) => Ok(Projection::WebMercator),
            Some(code) => parse_utm_epsg(code)
                .map(|(zone, north)| Projection::Utm { zone, north })
                .ok_or_else(|| Error::UnsupportedCrs(self.identifier())),
            None => Err(Error::UnsupportedCrs(self.identifier())),
        }
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", &wkt[..wkt.len().min(50)]);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl Projection {
    /// Projected coordinates to WGS84 (lon, lat)
    pub fn to_wgs84(self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Projection::Geographic => (x, y),
            Projection::WebMercator => web_mercator_to_wgs84(x, y),
            Projection::Utm { zone, north } => utm_to_wgs84(x, y, zone, north),
        }
    }

    /// WGS84 (lon, lat) to projected coordinates
    pub fn from_wgs84(self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Projection::Geographic => (lon, lat),
            Projection::WebMercator => wgs84_to_web_mercator(lon, lat),
            Projection::Utm { zone, north } => wgs84_to_utm(lon, lat, zone, north),
        }
    }
}

/// Reprojects coordinates between two CRS, pivoting through WGS84.
#[derive(Debug, Clone, Copy)]
pub struct Transformer {
    from: Projection,
    to: Projection,
    identity: bool,
}

impl Transformer {
    /// Build a transformer; fails if either CRS has no supported projection.
    pub fn new(from: &CRS, to: &CRS) -> Result<Self> {
        let identity = from.is_equivalent(to);
        let from_proj = from.projection()?;
        let to_proj = to.projection()?;
        Ok(Self {
            from: from_proj,
            to: to_proj,
            identity: identity || from_proj == to_proj,
        })
    }

    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        if self.identity {
            return (x, y);
        }
        let (lon, lat) = self.from.to_wgs84(x, y);
        self.to.from_wgs84(lon, lat)
    }

    /// Envelope of the four transformed corners of a bbox.
    ///
    /// Transforming all corners handles the non-linear distortion of UTM
    /// better than transforming only min/max.
    pub fn transform_bbox(&self, bbox: &BBox) -> BBox {
        if self.identity {
            return *bbox;
        }
        BBox::envelope(
            bbox.corners()
                .into_iter()
                .map(|(x, y)| self.transform(x, y)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(4326);
        assert_eq!(crs.epsg(), Some(4326));
        assert_eq!(crs.identifier(), "EPSG:4326");
        assert!(crs.is_equivalent(&CRS::wgs84()));
    }

    #[test]
    fn test_projection_lookup() {
        assert_eq!(CRS::wgs84().projection().unwrap(), Projection::Geographic);
        assert_eq!(
            CRS::from_epsg(32633).projection().unwrap(),
            Projection::Utm { zone: 33, north: true }
        );
        assert!(CRS::from_epsg(2154).projection().is_err());
        assert!(CRS::from_wkt("LOCAL_CS[\"x\"]").projection().is_err());
    }

    #[test]
    fn test_identity_transform() {
        let t = Transformer::new(&CRS::wgs84(), &CRS::wgs84()).unwrap();
        assert_eq!(t.transform(12.5, 41.9), (12.5, 41.9));
    }

    #[test]
    fn test_utm_to_wgs84_point() {
        let t = Transformer::new(&CRS::from_epsg(32630), &CRS::wgs84()).unwrap();
        let (lon, lat) = t.transform(440_298.94, 4_474_257.31);
        assert_relative_eq!(lon, -3.7037, epsilon = 1e-5);
        assert_relative_eq!(lat, 40.4168, epsilon = 1e-5);
    }

    #[test]
    fn test_transform_bbox_madrid() {
        let t = Transformer::new(&CRS::wgs84(), &CRS::from_epsg(32630)).unwrap();
        let b = t.transform_bbox(&BBox::new(-3.75, 40.40, -3.70, 40.45));
        let width = b.width();
        assert!(b.min_x > 100_000.0);
        assert!(width > 3_000.0 && width < 6_000.0, "width ~4km, got {width}");
    }
}
