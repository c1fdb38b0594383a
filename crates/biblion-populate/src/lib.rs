//! Biblion Populate - population planning over virtual sources
//!
//! Ties the corpus adapters to the store: a [`Catalog`] of configured
//! sources, the identifier [linker], the [`Planner`] that materialises one
//! virtual table into a destination table, and [`run_jobs`] for running
//! independent populations side by side.
//!
//! # Example
//!
//! ```no_run
//! use biblion_core::CancelToken;
//! use biblion_populate::{Catalog, Config, Planner, PopulationRequest, WriteMode};
//!
//! let config = Config::load().unwrap();
//! let catalog = Catalog::from_config(&config.sources);
//! let store = config.store.open().unwrap();
//! let planner = Planner::new(&catalog, &store).batch_size(config.populate.batch_size);
//!
//! let req = PopulationRequest::new("works", "works")
//!     .key_prefix("10.1000/")
//!     .filter("published_year >= 2020".parse().unwrap())
//!     .mode(WriteMode::CreateOrReplace);
//! let report = planner.populate(&req, &CancelToken::new()).unwrap();
//! println!("{} rows", report.rows_written);
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod linker;
pub mod planner;
pub mod runner;
pub mod selection;

// Re-exports for convenience
pub use catalog::Catalog;
pub use config::Config;
pub use error::PopulateError;
pub use linker::{LinkCache, LinkEvent, LinkPolicy, LinkSpec, LinkTarget, Lookup};
pub use planner::{Planner, PopulationReport, PopulationRequest, WriteMode};
pub use runner::{RunSummary, run_jobs};
pub use selection::{Comparison, Condition};
