//! Storage sinks for generated datasets.
//!
//! A sink receives the dataset in three phases: `begin_run` (connectivity
//! check and staging setup, before anything is written), batched `write_*`
//! calls, and `finish_run` (atomic publish). A batch is committed as a single
//! unit; a failed batch is fatal and the run is rerun idempotently.

pub mod csv;
pub mod errors;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use seedmart_core::{CustomerDim, DateDim, ProductDim, RunConfig, SalesFact, StoreDim};

pub use crate::csv::CsvSink;
pub use crate::errors::SinkError;
pub use crate::memory::MemorySink;
pub use crate::postgres::PostgresSink;

/// Trait implemented by storage sinks that can publish a generated dataset.
#[async_trait]
pub trait SalesSink: Send {
    /// Verify connectivity and prepare staging state. Called before any
    /// write; a failure here leaves prior generations untouched.
    async fn begin_run(&mut self, config: &RunConfig) -> Result<(), SinkError>;

    async fn write_dates(&mut self, rows: &[DateDim]) -> Result<(), SinkError>;

    async fn write_stores(&mut self, rows: &[StoreDim]) -> Result<(), SinkError>;

    async fn write_products(&mut self, rows: &[ProductDim]) -> Result<(), SinkError>;

    async fn write_customers(&mut self, rows: &[CustomerDim]) -> Result<(), SinkError>;

    async fn write_facts(&mut self, rows: &[SalesFact]) -> Result<(), SinkError>;

    /// Atomically publish the staged generation, replacing the previous one.
    async fn finish_run(&mut self) -> Result<(), SinkError>;
}
