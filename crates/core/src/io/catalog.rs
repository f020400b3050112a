//! Region catalog loading
//!
//! A catalog is a table with an identifier column (`path`, `name` or `id`)
//! and four numeric bounds `xmin, ymin, xmax, ymax`. Loading is all or
//! nothing: the first bad row aborts with [`Error::MalformedRegion`].

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::region::{BBox, Region};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Accepted header names for the identifier column, in priority order.
const ID_COLUMNS: [&str; 3] = ["path", "name", "id"];
const BOUND_COLUMNS: [&str; 4] = ["xmin", "ymin", "xmax", "ymax"];

/// One unparsed catalog row.
///
/// Fields are kept as text so that numeric validation happens in one place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogRow {
    pub id: Option<String>,
    pub xmin: Option<String>,
    pub ymin: Option<String>,
    pub xmax: Option<String>,
    pub ymax: Option<String>,
}

impl CatalogRow {
    pub fn new(id: &str, xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            id: Some(id.to_string()),
            xmin: Some(xmin.to_string()),
            ymin: Some(ymin.to_string()),
            xmax: Some(xmax.to_string()),
            ymax: Some(ymax.to_string()),
        }
    }
}

/// Turn already-parsed rows into regions.
///
/// `row` numbers in errors are 1-based positions in `rows`.
pub fn load_regions<I>(rows: I, crs: &CRS) -> Result<Vec<Region>>
where
    I: IntoIterator<Item = CatalogRow>,
{
    let mut seen = HashSet::new();
    let mut regions = Vec::new();

    for (idx, row) in rows.into_iter().enumerate() {
        let row_no = idx + 1;
        let malformed = |reason: String| Error::MalformedRegion { row: row_no, reason };

        let id = row
            .id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| malformed("missing identifier".to_string()))?
            .to_string();

        let bound = |name: &str, value: &Option<String>| -> Result<f64> {
            let text = value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| malformed(format!("missing {name}")))?;
            text.parse::<f64>()
                .map_err(|_| malformed(format!("{name} is not numeric: '{text}'")))
        };

        let bbox = BBox::new(
            bound("xmin", &row.xmin)?,
            bound("ymin", &row.ymin)?,
            bound("xmax", &row.xmax)?,
            bound("ymax", &row.ymax)?,
        );
        bbox.check().map_err(malformed)?;

        if !seen.insert(id.clone()) {
            return Err(malformed(format!("duplicate identifier '{id}'")));
        }

        regions.push(Region::new(id, bbox, crs.clone()).map_err(|e| match e {
            Error::MalformedRegion { reason, .. } => malformed(reason),
            other => other,
        })?);
    }

    debug!(count = regions.len(), "Loaded region catalog");
    Ok(regions)
}

/// Parse CSV rows (with a header line) from any reader.
pub fn read_catalog_rows<R: Read>(reader: R) -> Result<Vec<CatalogRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.to_ascii_lowercase())
        .collect();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let id_col = ID_COLUMNS
        .iter()
        .find_map(|name| column(*name))
        .ok_or_else(|| Error::MalformedRegion {
            row: 0,
            reason: format!("header has no identifier column (one of {:?})", ID_COLUMNS),
        })?;
    let mut bound_cols = [0usize; 4];
    for (slot, name) in bound_cols.iter_mut().zip(BOUND_COLUMNS) {
        *slot = column(name).ok_or_else(|| Error::MalformedRegion {
            row: 0,
            reason: format!("header has no '{name}' column"),
        })?;
    }

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let field = |i: usize| record.get(i).map(str::to_string);
        rows.push(CatalogRow {
            id: field(id_col),
            xmin: field(bound_cols[0]),
            ymin: field(bound_cols[1]),
            xmax: field(bound_cols[2]),
            ymax: field(bound_cols[3]),
        });
    }
    Ok(rows)
}

/// Read and validate a CSV catalog file.
pub fn read_catalog<P: AsRef<Path>>(path: P, crs: &CRS) -> Result<Vec<Region>> {
    let file = std::fs::File::open(path.as_ref())?;
    load_regions(read_catalog_rows(file)?, crs)
}
