//! Main Raster type

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use crate::region::BBox;
use ndarray::{s, Array2};

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores one spectral band (or one derived index) of a scene
/// together with its transform, CRS and no-data marker.
///
/// # Example
///
/// ```ignore
/// use orbit_core::{GeoTransform, Raster};
///
/// let mut red: Raster<f64> = Raster::filled(100, 100, 0.12);
/// red.set_transform(GeoTransform::new(500_000.0, 4_200_000.0, 10.0, -10.0));
/// let value = red.value_at(500_055.0, 4_199_945.0);
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Create a zeroed raster of another cell type sharing transform and CRS
    pub fn with_same_meta<U: RasterElement>(&self, rows: usize, cols: usize) -> Raster<U> {
        Raster {
            data: Array2::zeros((rows, cols)),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: None,
        }
    }

    /// Builder-style transform setter
    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Builder-style CRS setter
    pub fn with_crs(mut self, crs: CRS) -> Self {
        self.crs = Some(crs);
        self
    }

    // Dimensions

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    // Metadata

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Map extent covered by the raster
    pub fn bounds(&self) -> BBox {
        self.transform.bounds(self.cols(), self.rows())
    }

    // Coordinate conversion

    /// Map coordinates of the center of pixel (col, row)
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Fractional pixel coordinates `(col, row)` of a map position
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.transform.geo_to_pixel(x, y)
    }

    /// `(row, col)` of the pixel containing a map position, if inside the grid.
    ///
    /// The extent is closed: a position on the right or bottom edge maps to
    /// the last column or row.
    pub fn pixel_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (col, row) = self.geo_to_pixel(x, y);
        if !col.is_finite() || !row.is_finite() || col < 0.0 || row < 0.0 {
            return None;
        }
        let (rows, cols) = (self.rows() as f64, self.cols() as f64);
        if col > cols || row > rows || self.is_empty() {
            return None;
        }
        let col = col.floor().min(cols - 1.0) as usize;
        let row = row.floor().min(rows - 1.0) as usize;
        Some((row, col))
    }

    // Value checks

    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Value at (row, col) as `f64`, or `None` for no-data / out of range
    pub fn valid_value(&self, row: usize, col: usize) -> Option<f64> {
        let value = self.data.get((row, col)).copied()?;
        if self.is_nodata(value) {
            return None;
        }
        value.to_f64().filter(|v| v.is_finite())
    }

    /// Nearest-pixel value at a map position
    pub fn value_at(&self, x: f64, y: f64) -> Option<f64> {
        let (row, col) = self.pixel_at(x, y)?;
        self.valid_value(row, col)
    }

    /// Number of cells holding a valid value
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !self.is_nodata(**v)).count()
    }

    /// Sub-raster covering `bbox`, widened to whole pixels.
    ///
    /// Returns `None` when the bbox does not overlap the raster.
    pub fn crop(&self, bbox: &BBox) -> Option<Raster<T>> {
        let extent = self.bounds().intersection(bbox)?;
        let (c0, r0) = self.geo_to_pixel(extent.min_x, extent.max_y);
        let (c1, r1) = self.geo_to_pixel(extent.max_x, extent.min_y);
        if ![c0, r0, c1, r1].iter().all(|v| v.is_finite()) {
            return None;
        }

        let col_start = c0.min(c1).floor().max(0.0) as usize;
        let col_end = (c0.max(c1).ceil() as usize).min(self.cols());
        let row_start = r0.min(r1).floor().max(0.0) as usize;
        let row_end = (r0.max(r1).ceil() as usize).min(self.rows());
        if col_start >= col_end || row_start >= row_end {
            return None;
        }

        let data = self
            .data
            .slice(s![row_start..row_end, col_start..col_end])
            .to_owned();
        let (origin_x, origin_y) = self.transform.pixel_to_geo_corner(col_start, row_start);
        Some(Raster {
            data,
            transform: GeoTransform {
                origin_x,
                origin_y,
                ..self.transform
            },
            crs: self.crs.clone(),
            nodata: self.nodata,
        })
    }

    /// Convert to an `f64` raster, mapping no-data cells to NaN.
    pub fn to_f64(&self) -> Raster<f64> {
        let nodata = self.nodata;
        let data = self.data.mapv(|v| {
            if v.is_nodata(nodata) {
                f64::NAN
            } else {
                v.to_f64().unwrap_or(f64::NAN)
            }
        });
        Raster {
            data,
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: Some(f64::NAN),
        }
    }
}
