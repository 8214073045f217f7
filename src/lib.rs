//! wbi_tidy
//!
//! Fetch World Bank indicator time series for all countries, reduce every
//! observation to a tidy `(country, year, value)` row and write one CSV file per
//! indicator. Pairs with the `wbi-tidy` binary.
//!
//! ### Features
//! - Automatic pagination of the `country/all/indicator/{id}` endpoint
//! - Explicit missing values (`NA` in the output) instead of silent coercion
//! - One concurrent pipeline per indicator; failures are collected, not swallowed
//!
//! ### Example
//! ```no_run
//! use std::sync::Arc;
//! use wbi_tidy::{Client, pipeline};
//!
//! # async fn run() -> wbi_tidy::Result<()> {
//! let client = Arc::new(Client::default());
//! let files = pipeline::fetch_and_save_many(
//!     client,
//!     pipeline::DEFAULT_PREFIX,
//!     ["SP.POP.TOTL", "NY.GDP.MKTP.CD"],
//! )
//! .await?;
//! for f in files {
//!     println!("{} rows -> {}", f.rows, f.path.display());
//! }
//! # Ok(()) }
//! ```

pub mod api;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod storage;

pub use api::{Client, PageSource};
pub use error::{Error, PipelineFailure, Result};
pub use models::{Indicator, ObservationValue, RawObservation, TidyRow};
