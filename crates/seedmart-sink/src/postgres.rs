//! PostgreSQL sink with staging-and-swap idempotency.
//!
//! Each run writes a complete generation into `<table>__staging` tables and
//! publishes it in one transaction: drop the previous generation, rename
//! staging to the active names, install foreign keys and query indexes.
//! Re-running with the same configuration converges to the same end state;
//! an aborted run never swaps, so the previous generation stays visible.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use seedmart_core::{CustomerDim, DateDim, ProductDim, RunConfig, SalesFact, StoreDim};

use crate::SalesSink;
use crate::errors::SinkError;

/// Rows per INSERT statement; keeps bind counts well under the wire limit.
const INSERT_CHUNK_ROWS: usize = 2_000;

const STAGING_DDL: &[&str] = &[
    "CREATE TABLE dim_date__staging (
        date_id INTEGER PRIMARY KEY,
        date_value DATE NOT NULL UNIQUE,
        day_of_week SMALLINT NOT NULL,
        day_name TEXT NOT NULL,
        week_of_year SMALLINT NOT NULL,
        month SMALLINT NOT NULL,
        month_name TEXT NOT NULL,
        quarter SMALLINT NOT NULL,
        fiscal_quarter SMALLINT NOT NULL,
        year INTEGER NOT NULL,
        fiscal_year INTEGER NOT NULL,
        is_weekend BOOLEAN NOT NULL,
        is_holiday BOOLEAN NOT NULL
    )",
    "CREATE TABLE dim_store__staging (
        store_id INTEGER PRIMARY KEY,
        store_name TEXT NOT NULL,
        store_code TEXT NOT NULL,
        region TEXT NOT NULL,
        country TEXT NOT NULL,
        city TEXT NOT NULL,
        latitude DOUBLE PRECISION NOT NULL,
        longitude DOUBLE PRECISION NOT NULL,
        store_type TEXT NOT NULL,
        opening_date DATE NOT NULL,
        status TEXT NOT NULL
    )",
    "CREATE TABLE dim_product__staging (
        product_id INTEGER NOT NULL,
        product_name TEXT NOT NULL,
        product_code TEXT NOT NULL,
        category TEXT NOT NULL,
        subcategory TEXT NOT NULL,
        unit_cost NUMERIC(12, 2) NOT NULL CHECK (unit_cost > 0),
        list_price NUMERIC(12, 2) NOT NULL CHECK (list_price > 0),
        valid_from DATE NOT NULL,
        valid_to DATE,
        is_current BOOLEAN NOT NULL,
        PRIMARY KEY (product_id, valid_from)
    )",
    "CREATE TABLE dim_customer__staging (
        customer_id INTEGER PRIMARY KEY,
        loyalty_member BOOLEAN NOT NULL,
        join_date DATE,
        country TEXT NOT NULL,
        status TEXT NOT NULL,
        lifetime_purchases BIGINT NOT NULL,
        lifetime_spend NUMERIC(14, 2) NOT NULL,
        first_purchase_date DATE,
        last_purchase_date DATE
    )",
    "CREATE TABLE fact_sales__staging (
        sale_id BIGINT PRIMARY KEY,
        store_id INTEGER NOT NULL,
        product_id INTEGER NOT NULL,
        customer_id INTEGER,
        sale_date DATE NOT NULL,
        quantity INTEGER NOT NULL CHECK (quantity <> 0),
        unit_price NUMERIC(12, 2) NOT NULL,
        total_amount NUMERIC(12, 2) NOT NULL,
        discount_pct NUMERIC(5, 2) NOT NULL,
        discount_amount NUMERIC(12, 2) NOT NULL,
        net_amount NUMERIC(12, 2) NOT NULL,
        cost_amount NUMERIC(12, 2) NOT NULL,
        margin_amount NUMERIC(12, 2) NOT NULL,
        payment_method TEXT NOT NULL,
        is_return BOOLEAN NOT NULL,
        CHECK (abs(net_amount - cost_amount - margin_amount) <= 0.01),
        CHECK (CASE WHEN is_return
               THEN quantity < 0 AND net_amount <= 0 AND cost_amount < 0
               ELSE quantity > 0 AND net_amount >= 0 AND cost_amount > 0 END)
    )",
];

const TABLES: &[&str] = &[
    "dim_date",
    "dim_store",
    "dim_product",
    "dim_customer",
    "fact_sales",
];

/// Publish script, run in one transaction. Renamed tables keep their primary
/// key indexes, so those are renamed back to the active names too.
/// `fact_sales.product_id` has no foreign key: SCD-2 keeps `product_id`
/// non-unique in `dim_product`.
const SWAP_STATEMENTS: &[&str] = &[
    "DROP TABLE IF EXISTS fact_sales CASCADE",
    "DROP TABLE IF EXISTS dim_customer CASCADE",
    "DROP TABLE IF EXISTS dim_product CASCADE",
    "DROP TABLE IF EXISTS dim_store CASCADE",
    "DROP TABLE IF EXISTS dim_date CASCADE",
    "ALTER TABLE dim_date__staging RENAME TO dim_date",
    "ALTER TABLE dim_store__staging RENAME TO dim_store",
    "ALTER TABLE dim_product__staging RENAME TO dim_product",
    "ALTER TABLE dim_customer__staging RENAME TO dim_customer",
    "ALTER TABLE fact_sales__staging RENAME TO fact_sales",
    "ALTER INDEX dim_date__staging_pkey RENAME TO dim_date_pkey",
    "ALTER INDEX dim_date__staging_date_value_key RENAME TO dim_date_date_value_key",
    "ALTER INDEX dim_store__staging_pkey RENAME TO dim_store_pkey",
    "ALTER INDEX dim_product__staging_pkey RENAME TO dim_product_pkey",
    "ALTER INDEX dim_customer__staging_pkey RENAME TO dim_customer_pkey",
    "ALTER INDEX fact_sales__staging_pkey RENAME TO fact_sales_pkey",
    "ALTER TABLE fact_sales ADD CONSTRAINT fk_fact_sales_store
        FOREIGN KEY (store_id) REFERENCES dim_store (store_id)",
    "ALTER TABLE fact_sales ADD CONSTRAINT fk_fact_sales_customer
        FOREIGN KEY (customer_id) REFERENCES dim_customer (customer_id)",
    "ALTER TABLE fact_sales ADD CONSTRAINT fk_fact_sales_date
        FOREIGN KEY (sale_date) REFERENCES dim_date (date_value)",
    "CREATE INDEX idx_fact_sales_date ON fact_sales (sale_date)",
    "CREATE INDEX idx_fact_sales_store ON fact_sales (store_id)",
    "CREATE INDEX idx_fact_sales_product ON fact_sales (product_id)",
    "CREATE INDEX idx_fact_sales_customer ON fact_sales (customer_id)",
    "CREATE INDEX idx_fact_sales_store_product_date
        ON fact_sales (store_id, product_id, sale_date)",
];

/// Sink writing into PostgreSQL through a pre-configured pool.
pub struct PostgresSink {
    pool: PgPool,
}

impl PostgresSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SalesSink for PostgresSink {
    async fn begin_run(&mut self, _config: &RunConfig) -> Result<(), SinkError> {
        // Connectivity probe before any DDL; a dead sink must not disturb
        // the previous generation.
        sqlx::query("SELECT 1").execute(&self.pool).await?;

        for table in TABLES {
            sqlx::query(&format!("DROP TABLE IF EXISTS {table}__staging CASCADE"))
                .execute(&self.pool)
                .await?;
        }
        for ddl in STAGING_DDL {
            sqlx::query(ddl).execute(&self.pool).await?;
        }
        info!(tables = TABLES.len(), "staging tables created");
        Ok(())
    }

    async fn write_dates(&mut self, rows: &[DateDim]) -> Result<(), SinkError> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO dim_date__staging (date_id, date_value, day_of_week, day_name, \
                 week_of_year, month, month_name, quarter, fiscal_quarter, year, fiscal_year, \
                 is_weekend, is_holiday) ",
            );
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.date_id)
                    .push_bind(row.date_value)
                    .push_bind(row.day_of_week as i16)
                    .push_bind(&row.day_name)
                    .push_bind(row.week_of_year as i16)
                    .push_bind(row.month as i16)
                    .push_bind(&row.month_name)
                    .push_bind(row.quarter as i16)
                    .push_bind(row.fiscal_quarter as i16)
                    .push_bind(row.year)
                    .push_bind(row.fiscal_year)
                    .push_bind(row.is_weekend)
                    .push_bind(row.is_holiday);
            });
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn write_stores(&mut self, rows: &[StoreDim]) -> Result<(), SinkError> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO dim_store__staging (store_id, store_name, store_code, region, \
                 country, city, latitude, longitude, store_type, opening_date, status) ",
            );
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.store_id)
                    .push_bind(&row.store_name)
                    .push_bind(&row.store_code)
                    .push_bind(&row.region)
                    .push_bind(&row.country)
                    .push_bind(&row.city)
                    .push_bind(row.latitude)
                    .push_bind(row.longitude)
                    .push_bind(row.store_type.as_str())
                    .push_bind(row.opening_date)
                    .push_bind(&row.status);
            });
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn write_products(&mut self, rows: &[ProductDim]) -> Result<(), SinkError> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO dim_product__staging (product_id, product_name, product_code, \
                 category, subcategory, unit_cost, list_price, valid_from, valid_to, is_current) ",
            );
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.product_id)
                    .push_bind(&row.product_name)
                    .push_bind(&row.product_code)
                    .push_bind(row.category.as_str())
                    .push_bind(&row.subcategory)
                    .push_bind(row.unit_cost)
                    .push_bind(row.list_price)
                    .push_bind(row.valid_from)
                    .push_bind(row.valid_to)
                    .push_bind(row.is_current);
            });
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn write_customers(&mut self, rows: &[CustomerDim]) -> Result<(), SinkError> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO dim_customer__staging (customer_id, loyalty_member, join_date, \
                 country, status, lifetime_purchases, lifetime_spend, first_purchase_date, \
                 last_purchase_date) ",
            );
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.customer_id)
                    .push_bind(row.loyalty_member)
                    .push_bind(row.join_date)
                    .push_bind(&row.country)
                    .push_bind(&row.status)
                    .push_bind(row.lifetime_purchases)
                    .push_bind(row.lifetime_spend)
                    .push_bind(row.first_purchase_date)
                    .push_bind(row.last_purchase_date);
            });
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn write_facts(&mut self, rows: &[SalesFact]) -> Result<(), SinkError> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO fact_sales__staging (sale_id, store_id, product_id, customer_id, \
                 sale_date, quantity, unit_price, total_amount, discount_pct, discount_amount, \
                 net_amount, cost_amount, margin_amount, payment_method, is_return) ",
            );
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.sale_id)
                    .push_bind(row.store_id)
                    .push_bind(row.product_id)
                    .push_bind(row.customer_id)
                    .push_bind(row.sale_date)
                    .push_bind(row.quantity)
                    .push_bind(row.unit_price)
                    .push_bind(row.total_amount)
                    .push_bind(row.discount_pct)
                    .push_bind(row.discount_amount)
                    .push_bind(row.net_amount)
                    .push_bind(row.cost_amount)
                    .push_bind(row.margin_amount)
                    .push_bind(row.payment_method.as_str())
                    .push_bind(row.is_return);
            });
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn finish_run(&mut self) -> Result<(), SinkError> {
        let mut tx = self.pool.begin().await?;
        for statement in SWAP_STATEMENTS {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        info!("staging generation published");
        Ok(())
    }
}
