//! # Orbit Pipeline
//!
//! Composes catalog regions, a raster source and the index algorithms into
//! the two batch operations:
//!
//! - **mean index per region**: earliest acquisition of a month, normalized
//!   difference, area-weighted mean over each region
//! - **water points**: temporal mean over a date range, NDWI, a sample grid
//!   per region thresholded into water / non-water
//!
//! ```no_run
//! use orbit_cloud::LocalStore;
//! use orbit_pipeline::{Orchestrator, PipelineConfig};
//! use std::sync::Arc;
//!
//! # async fn run(regions: Vec<orbit_core::Region>) -> anyhow::Result<()> {
//! let config = PipelineConfig::default();
//! let bands = config.mean_index.band_pair();
//! let store = LocalStore::open("/data/scenes")?;
//! let orchestrator = Orchestrator::new(config, Arc::new(store))?;
//! let _means = orchestrator
//!     .compute_mean_index_per_region(&regions, "COPERNICUS/S2_SR", 2021, 4, &bands)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod results;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use orchestrator::Orchestrator;
pub use results::{PointResult, RegionPoints, RegionResult};
