//! In-memory sink backing the test suite.

use async_trait::async_trait;

use seedmart_core::{CustomerDim, DateDim, ProductDim, RunConfig, SalesFact, StoreDim};

use crate::SalesSink;
use crate::errors::SinkError;

/// Collects every written row; `finished` flips once the generation is
/// published.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub dates: Vec<DateDim>,
    pub stores: Vec<StoreDim>,
    pub products: Vec<ProductDim>,
    pub customers: Vec<CustomerDim>,
    pub facts: Vec<SalesFact>,
    pub began: bool,
    pub finished: bool,
    pub fact_batches: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SalesSink for MemorySink {
    async fn begin_run(&mut self, _config: &RunConfig) -> Result<(), SinkError> {
        // Idempotent regeneration: a new run replaces anything staged before.
        *self = Self {
            began: true,
            ..Self::default()
        };
        Ok(())
    }

    async fn write_dates(&mut self, rows: &[DateDim]) -> Result<(), SinkError> {
        self.dates.extend_from_slice(rows);
        Ok(())
    }

    async fn write_stores(&mut self, rows: &[StoreDim]) -> Result<(), SinkError> {
        self.stores.extend_from_slice(rows);
        Ok(())
    }

    async fn write_products(&mut self, rows: &[ProductDim]) -> Result<(), SinkError> {
        self.products.extend_from_slice(rows);
        Ok(())
    }

    async fn write_customers(&mut self, rows: &[CustomerDim]) -> Result<(), SinkError> {
        self.customers.extend_from_slice(rows);
        Ok(())
    }

    async fn write_facts(&mut self, rows: &[SalesFact]) -> Result<(), SinkError> {
        self.facts.extend_from_slice(rows);
        self.fact_batches += 1;
        Ok(())
    }

    async fn finish_run(&mut self) -> Result<(), SinkError> {
        if !self.began {
            return Err(SinkError::Misuse("finish before begin_run".to_string()));
        }
        self.finished = true;
        Ok(())
    }
}
