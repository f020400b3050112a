//! I/O for region catalogs and band rasters

mod catalog;
mod geotiff;

pub use catalog::{load_regions, read_catalog, read_catalog_rows, CatalogRow};
pub use geotiff::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer,
};
