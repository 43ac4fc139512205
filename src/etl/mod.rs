//! Core ETL abstractions for paginated harvesting
//!
//! This module provides the trait definitions the pagination driver is built
//! on: a page-at-a-time extractor, a fan-out transformer and an append-only
//! loader.

mod extract;
mod load;
mod pipeline;
mod transform;

pub use extract::{Page, PageExtractor};
pub use load::Loader;
pub use pipeline::{CollectionReport, DriverSettings, PaginationDriver};
pub use transform::Transformer;
