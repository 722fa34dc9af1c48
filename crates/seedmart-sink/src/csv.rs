//! CSV file sink for offline runs.
//!
//! Writes one file per table into the output directory. Files are truncated
//! on `begin_run`, so re-running into the same directory reproduces the same
//! bytes instead of appending.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use seedmart_core::{CustomerDim, DateDim, ProductDim, RunConfig, SalesFact, StoreDim};

use crate::SalesSink;
use crate::errors::SinkError;

const FILES: &[&str] = &[
    "dim_date.csv",
    "dim_store.csv",
    "dim_product.csv",
    "dim_customer.csv",
    "fact_sales.csv",
];

type TableWriter = csv::Writer<BufWriter<File>>;

struct Writers {
    dates: TableWriter,
    stores: TableWriter,
    products: TableWriter,
    customers: TableWriter,
    facts: TableWriter,
}

/// Sink writing each table as a CSV file.
pub struct CsvSink {
    out_dir: PathBuf,
    writers: Option<Writers>,
}

impl CsvSink {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            writers: None,
        }
    }

    fn writers(&mut self) -> Result<&mut Writers, SinkError> {
        self.writers
            .as_mut()
            .ok_or_else(|| SinkError::Misuse("write before begin_run".to_string()))
    }
}

fn open_writer(dir: &Path, name: &str, header: &[&str]) -> Result<TableWriter, SinkError> {
    let file = File::create(dir.join(name))?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    writer.write_record(header)?;
    Ok(writer)
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}

fn opt_date(value: Option<chrono::NaiveDate>) -> String {
    value.map(|d| d.to_string()).unwrap_or_default()
}

#[async_trait]
impl SalesSink for CsvSink {
    async fn begin_run(&mut self, _config: &RunConfig) -> Result<(), SinkError> {
        fs::create_dir_all(&self.out_dir)?;
        self.writers = Some(Writers {
            dates: open_writer(
                &self.out_dir,
                "dim_date.csv",
                &[
                    "date_id",
                    "date_value",
                    "day_of_week",
                    "day_name",
                    "week_of_year",
                    "month",
                    "month_name",
                    "quarter",
                    "fiscal_quarter",
                    "year",
                    "fiscal_year",
                    "is_weekend",
                    "is_holiday",
                ],
            )?,
            stores: open_writer(
                &self.out_dir,
                "dim_store.csv",
                &[
                    "store_id",
                    "store_name",
                    "store_code",
                    "region",
                    "country",
                    "city",
                    "latitude",
                    "longitude",
                    "store_type",
                    "opening_date",
                    "status",
                ],
            )?,
            products: open_writer(
                &self.out_dir,
                "dim_product.csv",
                &[
                    "product_id",
                    "product_name",
                    "product_code",
                    "category",
                    "subcategory",
                    "unit_cost",
                    "list_price",
                    "valid_from",
                    "valid_to",
                    "is_current",
                ],
            )?,
            customers: open_writer(
                &self.out_dir,
                "dim_customer.csv",
                &[
                    "customer_id",
                    "loyalty_member",
                    "join_date",
                    "country",
                    "status",
                    "lifetime_purchases",
                    "lifetime_spend",
                    "first_purchase_date",
                    "last_purchase_date",
                ],
            )?,
            facts: open_writer(
                &self.out_dir,
                "fact_sales.csv",
                &[
                    "sale_id",
                    "store_id",
                    "product_id",
                    "customer_id",
                    "sale_date",
                    "quantity",
                    "unit_price",
                    "total_amount",
                    "discount_pct",
                    "discount_amount",
                    "net_amount",
                    "cost_amount",
                    "margin_amount",
                    "payment_method",
                    "is_return",
                ],
            )?,
        });
        Ok(())
    }

    async fn write_dates(&mut self, rows: &[DateDim]) -> Result<(), SinkError> {
        let writers = self.writers()?;
        for row in rows {
            writers.dates.write_record([
                row.date_id.to_string(),
                row.date_value.to_string(),
                row.day_of_week.to_string(),
                row.day_name.clone(),
                row.week_of_year.to_string(),
                row.month.to_string(),
                row.month_name.clone(),
                row.quarter.to_string(),
                row.fiscal_quarter.to_string(),
                row.year.to_string(),
                row.fiscal_year.to_string(),
                row.is_weekend.to_string(),
                row.is_holiday.to_string(),
            ])?;
        }
        Ok(())
    }

    async fn write_stores(&mut self, rows: &[StoreDim]) -> Result<(), SinkError> {
        let writers = self.writers()?;
        for row in rows {
            writers.stores.write_record([
                row.store_id.to_string(),
                row.store_name.clone(),
                row.store_code.clone(),
                row.region.clone(),
                row.country.clone(),
                row.city.clone(),
                format!("{:.6}", row.latitude),
                format!("{:.6}", row.longitude),
                row.store_type.as_str().to_string(),
                row.opening_date.to_string(),
                row.status.clone(),
            ])?;
        }
        Ok(())
    }

    async fn write_products(&mut self, rows: &[ProductDim]) -> Result<(), SinkError> {
        let writers = self.writers()?;
        for row in rows {
            writers.products.write_record([
                row.product_id.to_string(),
                row.product_name.clone(),
                row.product_code.clone(),
                row.category.as_str().to_string(),
                row.subcategory.clone(),
                money(row.unit_cost),
                money(row.list_price),
                row.valid_from.to_string(),
                opt_date(row.valid_to),
                row.is_current.to_string(),
            ])?;
        }
        Ok(())
    }

    async fn write_customers(&mut self, rows: &[CustomerDim]) -> Result<(), SinkError> {
        let writers = self.writers()?;
        for row in rows {
            writers.customers.write_record([
                row.customer_id.to_string(),
                row.loyalty_member.to_string(),
                opt_date(row.join_date),
                row.country.clone(),
                row.status.clone(),
                row.lifetime_purchases.to_string(),
                money(row.lifetime_spend),
                opt_date(row.first_purchase_date),
                opt_date(row.last_purchase_date),
            ])?;
        }
        Ok(())
    }

    async fn write_facts(&mut self, rows: &[SalesFact]) -> Result<(), SinkError> {
        let writers = self.writers()?;
        for row in rows {
            writers.facts.write_record([
                row.sale_id.to_string(),
                row.store_id.to_string(),
                row.product_id.to_string(),
                row.customer_id.map(|id| id.to_string()).unwrap_or_default(),
                row.sale_date.to_string(),
                row.quantity.to_string(),
                money(row.unit_price),
                money(row.total_amount),
                money(row.discount_pct),
                money(row.discount_amount),
                money(row.net_amount),
                money(row.cost_amount),
                money(row.margin_amount),
                row.payment_method.as_str().to_string(),
                row.is_return.to_string(),
            ])?;
        }
        Ok(())
    }

    async fn finish_run(&mut self) -> Result<(), SinkError> {
        let Some(mut writers) = self.writers.take() else {
            return Err(SinkError::Misuse("finish before begin_run".to_string()));
        };
        writers.dates.flush()?;
        writers.stores.flush()?;
        writers.products.flush()?;
        writers.customers.flush()?;
        writers.facts.flush()?;

        let mut bytes_written = 0;
        for name in FILES {
            bytes_written += fs::metadata(self.out_dir.join(name))?.len();
        }
        info!(
            dir = %self.out_dir.display(),
            bytes_written,
            "csv dataset written"
        );
        Ok(())
    }
}
