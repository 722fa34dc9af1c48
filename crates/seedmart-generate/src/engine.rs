//! Generation engine.
//!
//! Orchestrates a full run: config -> streams -> dimensions -> profiles ->
//! fact stream -> validator -> sink. Fact generation is split into fixed-size
//! partitions with independently derived streams; worker count only changes
//! scheduling, never output. Dimensions are fully generated and frozen before
//! the first fact draw.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::NaiveDate;
use tokio::sync::mpsc;
use tracing::{debug, info};

use seedmart_core::{CustomerDim, RunConfig, SalesFact, Stage, StreamFactory};
use seedmart_sink::SalesSink;

use crate::dimensions;
use crate::errors::GenerationError;
use crate::model::{RunReport, TableReport};
use crate::profiles;
use crate::sampler::{Dimensions, FactSampler, round2};
use crate::validate::validate_fact;

/// Cooperative run-abort signal, checked between batches only. A batch in
/// flight always completes; an aborted run never swaps staging in, so the
/// previous generation stays visible.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One fixed-size slice of the fact index space.
#[derive(Debug, Clone, Copy)]
pub struct PartitionSpec {
    pub index: u64,
    pub first_row: u64,
    pub rows: u64,
}

/// Frozen pre-fact state: dimensions, profile-derived sampling tables, and
/// the run configuration. Shareable across worker threads.
pub struct PreparedRun {
    config: RunConfig,
    dims: Dimensions,
    sampler: FactSampler,
}

impl PreparedRun {
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    /// The canonical partition list; fixed by config, not by worker count.
    pub fn partitions(&self) -> Vec<PartitionSpec> {
        let mut parts = Vec::new();
        let mut first_row = 0;
        let mut index = 0;
        while first_row < self.config.num_sales {
            let rows = self.config.partition_rows.min(self.config.num_sales - first_row);
            parts.push(PartitionSpec {
                index,
                first_row,
                rows,
            });
            index += 1;
            first_row += rows;
        }
        parts
    }

    /// Generate and validate one partition of the fact stream. Returns the
    /// rows and the number of regenerated draws.
    pub fn generate_partition(
        &self,
        part: &PartitionSpec,
    ) -> Result<(Vec<SalesFact>, u64), GenerationError> {
        let mut rng = StreamFactory::new(self.config.seed).fact_partition(part.index);
        let mut rows = Vec::with_capacity(part.rows as usize);
        let mut retries = 0;

        for offset in 0..part.rows {
            let row_index = part.first_row + offset;
            let sale_id = row_index as i64 + 1;
            let mut attempts = 0;
            let fact = loop {
                let fact = self.sampler.sample(&self.config, &self.dims, sale_id, &mut rng)?;
                match validate_fact(&fact, &self.dims, &self.config) {
                    Ok(()) => break fact,
                    Err(reason) => {
                        attempts += 1;
                        retries += 1;
                        if attempts > self.config.max_row_retries {
                            return Err(GenerationError::RetriesExhausted {
                                row_index,
                                attempts,
                                reason,
                            });
                        }
                        debug!(row_index, attempts, reason = %reason, "row regenerated");
                    }
                }
            };
            rows.push(fact);
        }

        Ok((rows, retries))
    }
}

/// Entry point for running a full generation against a sink.
pub struct GenerationEngine {
    config: RunConfig,
}

impl GenerationEngine {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Generate and freeze everything the fact stream samples against.
    pub fn prepare(&self) -> Result<PreparedRun, GenerationError> {
        self.config.validate()?;
        let factory = StreamFactory::new(self.config.seed);

        let dates = dimensions::date::generate(&self.config);
        let stores = dimensions::store::generate(&self.config, &mut factory.stage(Stage::StoreDim))?;
        let products =
            dimensions::product::generate(&self.config, &mut factory.stage(Stage::ProductDim))?;
        let customers =
            dimensions::customer::generate(&self.config, &mut factory.stage(Stage::CustomerDim));
        let profiles = profiles::assign(&self.config, &mut factory.stage(Stage::Profiles));

        let dims = Dimensions::new(dates, stores, products, customers);
        let sampler = FactSampler::new(&self.config, &dims, &profiles)?;

        Ok(PreparedRun {
            config: self.config.clone(),
            dims,
            sampler,
        })
    }

    pub async fn run<S: SalesSink + Send>(
        &self,
        sink: &mut S,
        abort: &AbortFlag,
    ) -> Result<RunReport, GenerationError> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let config = &self.config;

        info!(
            run_id = %run_id,
            seed = config.seed,
            stores = config.num_stores,
            products = config.num_products,
            customers = config.num_customers,
            sales = config.num_sales,
            days = config.date_range_days,
            "generation started"
        );

        let prepared = Arc::new(self.prepare()?);
        sink.begin_run(config).await?;

        let dims = prepared.dims();
        for chunk in dims.dates.chunks(config.batch_size) {
            sink.write_dates(chunk).await?;
        }
        info!(table = "dim_date", rows = dims.dates.len(), "dimension written");

        for chunk in dims.stores.chunks(config.batch_size) {
            sink.write_stores(chunk).await?;
        }
        info!(table = "dim_store", rows = dims.stores.len(), "dimension written");

        for chunk in dims.products.chunks(config.batch_size) {
            sink.write_products(chunk).await?;
        }
        info!(table = "dim_product", rows = dims.products.len(), "dimension written");

        let mut aggregates = CustomerAggregates::new(dims.customers.len());
        let (facts_written, retries_total) = if config.pipeline_depth > 0 {
            stream_facts_pipelined(config, &prepared, sink, abort, &mut aggregates).await?
        } else {
            stream_facts_sequential(config, &prepared, sink, abort, &mut aggregates).await?
        };
        info!(
            table = "fact_sales",
            rows = facts_written,
            retries = retries_total,
            "fact stream written"
        );

        // Customers go last: their lifetime aggregates are derived from the
        // fact stream, never sampled.
        let customers = aggregates.apply(&dims.customers);
        for chunk in customers.chunks(config.batch_size) {
            sink.write_customers(chunk).await?;
        }
        info!(table = "dim_customer", rows = customers.len(), "dimension written");

        sink.finish_run().await?;

        let elapsed = start.elapsed();
        let duration_ms = elapsed.as_millis() as u64;
        let rows_per_sec = if elapsed.as_secs_f64() > 0.0 {
            facts_written as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let report = RunReport {
            run_id: run_id.clone(),
            seed: config.seed,
            tables: vec![
                table_report("dim_date", dims.dates.len() as u64),
                table_report("dim_store", dims.stores.len() as u64),
                table_report("dim_product", dims.products.len() as u64),
                table_report("dim_customer", customers.len() as u64),
                table_report("fact_sales", facts_written),
            ],
            facts_generated: facts_written,
            retries_total,
            duration_ms,
            rows_per_sec,
        };

        info!(
            run_id = %run_id,
            facts = facts_written,
            retries = retries_total,
            duration_ms,
            "generation completed"
        );

        Ok(report)
    }
}

fn table_report(table: &str, rows: u64) -> TableReport {
    TableReport {
        table: table.to_string(),
        rows,
    }
}

async fn stream_facts_sequential<S: SalesSink + Send>(
    config: &RunConfig,
    prepared: &Arc<PreparedRun>,
    sink: &mut S,
    abort: &AbortFlag,
    aggregates: &mut CustomerAggregates,
) -> Result<(u64, u64), GenerationError> {
    let partitions = prepared.partitions();
    let workers = config.workers.max(1);
    let mut facts_written = 0;
    let mut retries_total = 0;

    for wave in partitions.chunks(workers) {
        if abort.is_set() {
            return Err(GenerationError::Aborted);
        }
        let results = generate_wave(prepared, wave)?;
        for (rows, retries) in results {
            retries_total += retries;
            for chunk in rows.chunks(config.batch_size) {
                if abort.is_set() {
                    return Err(GenerationError::Aborted);
                }
                aggregates.observe(chunk);
                sink.write_facts(chunk).await?;
                facts_written += chunk.len() as u64;
                debug!(rows = chunk.len(), total = facts_written, "fact batch committed");
            }
        }
    }

    Ok((facts_written, retries_total))
}

/// Pipelined mode: a blocking producer generates batches into a bounded
/// channel (backpressure at `pipeline_depth` in-flight batches) while the
/// writer commits them in order.
async fn stream_facts_pipelined<S: SalesSink + Send>(
    config: &RunConfig,
    prepared: &Arc<PreparedRun>,
    sink: &mut S,
    abort: &AbortFlag,
    aggregates: &mut CustomerAggregates,
) -> Result<(u64, u64), GenerationError> {
    let (tx, mut rx) = mpsc::channel::<Vec<SalesFact>>(config.pipeline_depth);
    let producer_prepared = Arc::clone(prepared);
    let producer_abort = abort.clone();
    let batch_size = config.batch_size;
    let workers = config.workers.max(1);

    let producer = tokio::task::spawn_blocking(move || -> Result<u64, GenerationError> {
        let partitions = producer_prepared.partitions();
        let mut retries_total = 0;
        for wave in partitions.chunks(workers) {
            let results = generate_wave(&producer_prepared, wave)?;
            for (rows, retries) in results {
                retries_total += retries;
                for chunk in rows.chunks(batch_size) {
                    if producer_abort.is_set() {
                        return Err(GenerationError::Aborted);
                    }
                    if tx.blocking_send(chunk.to_vec()).is_err() {
                        // Writer dropped the receiver after a fatal error.
                        return Ok(retries_total);
                    }
                }
            }
        }
        Ok(retries_total)
    });

    let mut facts_written = 0;
    while let Some(rows) = rx.recv().await {
        aggregates.observe(&rows);
        sink.write_facts(&rows).await?;
        facts_written += rows.len() as u64;
        debug!(rows = rows.len(), total = facts_written, "fact batch committed");
    }

    let retries_total = producer
        .await
        .map_err(|_| GenerationError::WorkerPanic)??;
    Ok((facts_written, retries_total))
}

/// Generate a wave of partitions, one thread each; results come back in
/// canonical partition order regardless of completion order.
fn generate_wave(
    prepared: &PreparedRun,
    wave: &[PartitionSpec],
) -> Result<Vec<(Vec<SalesFact>, u64)>, GenerationError> {
    if wave.len() == 1 {
        return Ok(vec![prepared.generate_partition(&wave[0])?]);
    }
    std::thread::scope(|scope| {
        let handles: Vec<_> = wave
            .iter()
            .map(|part| scope.spawn(move || prepared.generate_partition(part)))
            .collect();
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.join().map_err(|_| GenerationError::WorkerPanic)??);
        }
        Ok(results)
    })
}

/// Lifetime aggregates accumulated from the fact stream. Returns contribute
/// (negatively) to spend; only regular sales count as purchases.
struct CustomerAggregates {
    purchases: Vec<i64>,
    spend: Vec<f64>,
    first: Vec<Option<NaiveDate>>,
    last: Vec<Option<NaiveDate>>,
}

impl CustomerAggregates {
    fn new(num_customers: usize) -> Self {
        Self {
            purchases: vec![0; num_customers],
            spend: vec![0.0; num_customers],
            first: vec![None; num_customers],
            last: vec![None; num_customers],
        }
    }

    fn observe(&mut self, rows: &[SalesFact]) {
        for fact in rows {
            let Some(customer_id) = fact.customer_id else {
                continue;
            };
            let index = customer_id as usize - 1;
            self.spend[index] += fact.net_amount;
            if !fact.is_return {
                self.purchases[index] += 1;
                let date = fact.sale_date;
                self.first[index] = Some(self.first[index].map_or(date, |d| d.min(date)));
                self.last[index] = Some(self.last[index].map_or(date, |d| d.max(date)));
            }
        }
    }

    fn apply(&self, customers: &[CustomerDim]) -> Vec<CustomerDim> {
        customers
            .iter()
            .map(|customer| {
                let index = customer.customer_id as usize - 1;
                CustomerDim {
                    lifetime_purchases: self.purchases[index],
                    lifetime_spend: round2(self.spend[index]),
                    first_purchase_date: self.first[index],
                    last_purchase_date: self.last[index],
                    ..customer.clone()
                }
            })
            .collect()
    }
}
