use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::StoreType;

/// A region in the configured region set with its sampling weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionWeight {
    pub name: String,
    pub weight: f64,
}

/// A store type with its sampling weight and baseline traffic factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreTypeWeight {
    pub store_type: StoreType,
    pub weight: f64,
    pub traffic: f64,
}

/// Immutable configuration for one generation run.
///
/// Resolved once (defaults, then environment, then caller overrides) before
/// any generation stage starts; "today" is resolved into an explicit
/// `start_date` so a stored configuration replays to identical output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub num_stores: u32,
    pub num_products: u32,
    pub num_customers: u32,
    pub num_sales: u64,
    pub date_range_days: u32,
    /// First day of the horizon; the horizon is `[start_date, start_date + date_range_days)`.
    pub start_date: NaiveDate,
    pub seed: u64,
    pub batch_size: usize,
    /// Probability that a generated customer is a loyalty member.
    pub p_loyalty_member: f64,
    /// Probability that a sale is attributed to a customer from the loyalty pool.
    pub p_loyalty_sale: f64,
    pub p_discount: f64,
    pub discount_pct_min: f64,
    pub discount_pct_max: f64,
    pub p_return: f64,
    /// Consecutive regenerations allowed for a single fact row before the run aborts.
    pub max_row_retries: u32,
    /// Toggle for the price-change (SCD) simulation on the product dimension.
    pub price_changes: bool,
    /// Fraction of products receiving a second validity interval when enabled.
    pub price_change_fraction: f64,
    pub regions: Vec<RegionWeight>,
    pub store_types: Vec<StoreTypeWeight>,
    pub peak_months: Vec<u32>,
    pub peak_month_boost: f64,
    pub weekend_boost: f64,
    /// Weights for quantities 1..=5.
    pub quantity_weights: [f64; 5],
    /// Store opening dates fall in this window before `start_date`.
    pub opening_window_days: u32,
    /// Loyalty join dates fall in this window before `start_date`.
    pub join_window_days: u32,
    /// Fixed fact-partition size; independent of worker count so output is too.
    pub partition_rows: u64,
    pub workers: usize,
    /// Maximum in-flight batches in pipelined mode; 0 disables pipelining.
    pub pipeline_depth: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            num_stores: 50,
            num_products: 500,
            num_customers: 10_000,
            num_sales: 1_000_000,
            date_range_days: 730,
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            seed: 42,
            batch_size: 10_000,
            p_loyalty_member: 0.7,
            p_loyalty_sale: 0.8,
            p_discount: 0.5,
            discount_pct_min: 5.0,
            discount_pct_max: 40.0,
            p_return: 0.05,
            max_row_retries: 5,
            price_changes: false,
            price_change_fraction: 0.2,
            regions: default_regions(),
            store_types: default_store_types(),
            peak_months: vec![11, 12],
            peak_month_boost: 1.8,
            weekend_boost: 1.5,
            quantity_weights: [0.52, 0.22, 0.13, 0.08, 0.05],
            opening_window_days: 3_650,
            join_window_days: 1_000,
            partition_rows: 65_536,
            workers: 1,
            pipeline_depth: 0,
        }
    }
}

fn default_regions() -> Vec<RegionWeight> {
    [
        ("North", 0.25),
        ("South", 0.20),
        ("East", 0.20),
        ("West", 0.20),
        ("Central", 0.15),
    ]
    .into_iter()
    .map(|(name, weight)| RegionWeight {
        name: name.to_string(),
        weight,
    })
    .collect()
}

fn default_store_types() -> Vec<StoreTypeWeight> {
    vec![
        StoreTypeWeight {
            store_type: StoreType::Flagship,
            weight: 0.10,
            traffic: 1.6,
        },
        StoreTypeWeight {
            store_type: StoreType::Standard,
            weight: 0.70,
            traffic: 1.0,
        },
        StoreTypeWeight {
            store_type: StoreType::Outlet,
            weight: 0.20,
            traffic: 0.7,
        },
    ]
}

/// Caller-supplied overrides applied on top of defaults and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub num_stores: Option<u32>,
    pub num_products: Option<u32>,
    pub num_customers: Option<u32>,
    pub num_sales: Option<u64>,
    pub date_range_days: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub seed: Option<u64>,
    pub batch_size: Option<usize>,
    pub p_loyalty_sale: Option<f64>,
    pub p_discount: Option<f64>,
    pub p_return: Option<f64>,
    pub price_changes: Option<bool>,
    pub workers: Option<usize>,
    pub pipeline_depth: Option<usize>,
}

impl RunConfig {
    /// Resolve the effective configuration: defaults, then the environment
    /// variables of the seeding contract, then explicit overrides.
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.apply(overrides);
        if overrides.start_date.is_none() {
            config.start_date =
                Utc::now().date_naive() - Duration::days(i64::from(config.date_range_days));
        }
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(value) = env_parse::<u32>("NUM_STORES")? {
            self.num_stores = value;
        }
        if let Some(value) = env_parse::<u32>("NUM_PRODUCTS")? {
            self.num_products = value;
        }
        if let Some(value) = env_parse::<u32>("NUM_CUSTOMERS")? {
            self.num_customers = value;
        }
        if let Some(value) = env_parse::<u64>("NUM_SALES")? {
            self.num_sales = value;
        }
        if let Some(value) = env_parse::<u32>("DATE_RANGE_DAYS")? {
            self.date_range_days = value;
        }
        if let Some(value) = env_parse::<u64>("RANDOM_SEED")? {
            self.seed = value;
        }
        Ok(())
    }

    fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(value) = overrides.num_stores {
            self.num_stores = value;
        }
        if let Some(value) = overrides.num_products {
            self.num_products = value;
        }
        if let Some(value) = overrides.num_customers {
            self.num_customers = value;
        }
        if let Some(value) = overrides.num_sales {
            self.num_sales = value;
        }
        if let Some(value) = overrides.date_range_days {
            self.date_range_days = value;
        }
        if let Some(value) = overrides.start_date {
            self.start_date = value;
        }
        if let Some(value) = overrides.seed {
            self.seed = value;
        }
        if let Some(value) = overrides.batch_size {
            self.batch_size = value;
        }
        if let Some(value) = overrides.p_loyalty_sale {
            self.p_loyalty_sale = value;
        }
        if let Some(value) = overrides.p_discount {
            self.p_discount = value;
        }
        if let Some(value) = overrides.p_return {
            self.p_return = value;
        }
        if let Some(value) = overrides.price_changes {
            self.price_changes = value;
        }
        if let Some(value) = overrides.workers {
            self.workers = value;
        }
        if let Some(value) = overrides.pipeline_depth {
            self.pipeline_depth = value;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_stores == 0
            || self.num_products == 0
            || self.num_customers == 0
            || self.num_sales == 0
        {
            return Err(Error::InvalidConfig(
                "entity counts must be positive".to_string(),
            ));
        }
        if self.date_range_days == 0 {
            return Err(Error::InvalidConfig(
                "date range must cover at least one day".to_string(),
            ));
        }
        if self.batch_size == 0 || self.partition_rows == 0 {
            return Err(Error::InvalidConfig(
                "batch size and partition size must be positive".to_string(),
            ));
        }
        if self.max_row_retries == 0 {
            return Err(Error::InvalidConfig(
                "max_row_retries must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("p_loyalty_member", self.p_loyalty_member),
            ("p_loyalty_sale", self.p_loyalty_sale),
            ("p_discount", self.p_discount),
            ("p_return", self.p_return),
            ("price_change_fraction", self.price_change_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if !(0.0..=100.0).contains(&self.discount_pct_min)
            || !(0.0..=100.0).contains(&self.discount_pct_max)
            || self.discount_pct_min > self.discount_pct_max
        {
            return Err(Error::InvalidConfig(format!(
                "discount range [{}, {}] is not a valid percentage range",
                self.discount_pct_min, self.discount_pct_max
            )));
        }
        validate_weights("regions", self.regions.iter().map(|r| r.weight))?;
        validate_weights("store_types", self.store_types.iter().map(|s| s.weight))?;
        validate_weights("quantity_weights", self.quantity_weights.iter().copied())?;
        if self.store_types.iter().any(|s| s.traffic <= 0.0) {
            return Err(Error::InvalidConfig(
                "store traffic factors must be positive".to_string(),
            ));
        }
        if self.peak_months.iter().any(|m| !(1..=12).contains(m)) {
            return Err(Error::InvalidConfig(
                "peak months must be within 1..=12".to_string(),
            ));
        }
        if self.peak_month_boost <= 0.0 || self.weekend_boost <= 0.0 {
            return Err(Error::InvalidConfig(
                "seasonal boosts must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Last day of the horizon (inclusive).
    pub fn end_date(&self) -> NaiveDate {
        self.start_date + Duration::days(i64::from(self.date_range_days) - 1)
    }
}

fn validate_weights(name: &str, weights: impl Iterator<Item = f64>) -> Result<()> {
    let mut total = 0.0;
    let mut any = false;
    for weight in weights {
        any = true;
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "{name} weights must be finite and non-negative"
            )));
        }
        total += weight;
    }
    if !any || total <= 0.0 {
        return Err(Error::InvalidConfig(format!(
            "{name} weights must contain at least one positive entry"
        )));
    }
    Ok(())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            Error::InvalidConfig(format!("environment variable {key} has invalid value '{raw}'"))
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        RunConfig::default().validate().expect("defaults valid");
    }

    #[test]
    fn rejects_zero_counts() {
        let mut config = RunConfig::default();
        config.num_products = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_discount_range() {
        let mut config = RunConfig::default();
        config.discount_pct_min = 50.0;
        config.discount_pct_max = 10.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_probability() {
        let mut config = RunConfig::default();
        config.p_return = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn end_date_is_inclusive() {
        let mut config = RunConfig::default();
        config.date_range_days = 1;
        assert_eq!(config.end_date(), config.start_date);
    }
}
