//! Fact sampler.
//!
//! Draws one transaction per target row against the frozen dimensions. The
//! per-row draw order is fixed: date, store, product (re-drawing the
//! date/product pair when no product version is valid on the drawn date),
//! customer, quantity, discount, return flag, payment method. All weighted
//! categorical tables are precomputed once per run.

use chrono::NaiveDate;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

use seedmart_core::{
    CustomerDim, DateDim, DrawStream, PaymentMethod, ProductDim, RunConfig, SalesFact, StoreDim,
};

use crate::errors::GenerationError;
use crate::profiles::BehaviorProfiles;

/// Frozen dimension rows with a per-product version index. Built once,
/// before fact generation begins; nothing here mutates afterwards.
#[derive(Debug, Clone)]
pub struct Dimensions {
    pub dates: Vec<DateDim>,
    pub stores: Vec<StoreDim>,
    pub products: Vec<ProductDim>,
    pub customers: Vec<CustomerDim>,
    versions: Vec<Vec<usize>>,
}

impl Dimensions {
    pub fn new(
        dates: Vec<DateDim>,
        stores: Vec<StoreDim>,
        products: Vec<ProductDim>,
        customers: Vec<CustomerDim>,
    ) -> Self {
        let num_products = products
            .iter()
            .map(|p| p.product_id as usize)
            .max()
            .unwrap_or(0);
        let mut versions = vec![Vec::new(); num_products];
        for (index, product) in products.iter().enumerate() {
            versions[product.product_id as usize - 1].push(index);
        }
        Self {
            dates,
            stores,
            products,
            customers,
            versions,
        }
    }

    pub fn num_products(&self) -> usize {
        self.versions.len()
    }

    /// The product version valid on `date`, if any.
    pub fn product_version_on(&self, product_id: i32, date: NaiveDate) -> Option<&ProductDim> {
        if product_id < 1 {
            return None;
        }
        let slots = self.versions.get(product_id as usize - 1)?;
        slots
            .iter()
            .map(|index| &self.products[*index])
            .find(|version| version.valid_on(date))
    }
}

/// Quantity distributions by monetary tier; higher tiers flatten the base
/// weights so high-value customers skew toward larger baskets.
const QUANTITY_TIER_EXPONENTS: [f64; 3] = [1.0, 0.5, 0.25];

pub struct FactSampler {
    date_index: WeightedIndex<f64>,
    store_index: WeightedIndex<f64>,
    product_by_month: Vec<WeightedIndex<f64>>,
    customer_index: WeightedIndex<f64>,
    quantity_tiers: Vec<WeightedIndex<f64>>,
    customer_tier: Vec<u8>,
}

impl FactSampler {
    pub fn new(
        config: &RunConfig,
        dims: &Dimensions,
        profiles: &BehaviorProfiles,
    ) -> Result<Self, GenerationError> {
        let date_index = weighted("date weights", dims.dates.iter().map(|d| date_weight(config, d)))?;

        let store_index = weighted(
            "store weights",
            dims.stores.iter().map(|store| {
                config
                    .store_types
                    .iter()
                    .find(|t| t.store_type == store.store_type)
                    .map(|t| t.traffic)
                    .unwrap_or(1.0)
            }),
        )?;

        let mut product_by_month = Vec::with_capacity(12);
        for month in 0..12 {
            product_by_month.push(weighted(
                "product seasonal weights",
                profiles.products.iter().map(|p| p.seasonal[month]),
            )?);
        }

        let customer_index = weighted(
            "customer pool weights",
            profiles.customers.iter().map(|c| c.purchase_rate),
        )?;

        let quantity_tiers = QUANTITY_TIER_EXPONENTS
            .iter()
            .map(|exponent| {
                weighted(
                    "quantity weights",
                    config.quantity_weights.iter().map(|w| w.powf(*exponent)),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let customer_tier = profiles
            .customers
            .iter()
            .map(|profile| {
                if profile.monetary_scale < 1.5 {
                    0
                } else if profile.monetary_scale < 3.0 {
                    1
                } else {
                    2
                }
            })
            .collect();

        Ok(Self {
            date_index,
            store_index,
            product_by_month,
            customer_index,
            quantity_tiers,
            customer_tier,
        })
    }

    pub fn sample(
        &self,
        config: &RunConfig,
        dims: &Dimensions,
        sale_id: i64,
        rng: &mut DrawStream,
    ) -> Result<SalesFact, GenerationError> {
        let mut date_row = &dims.dates[self.date_index.sample(rng)];
        let store = &dims.stores[self.store_index.sample(rng)];

        let mut resolved = None;
        for _ in 0..=config.max_row_retries {
            let month = date_row.month as usize - 1;
            let product_id = self.product_by_month[month].sample(rng) as i32 + 1;
            match dims.product_version_on(product_id, date_row.date_value) {
                Some(version) => {
                    resolved = Some((product_id, version));
                    break;
                }
                // No version valid on this date: re-draw the pair from the
                // next draws in the stream.
                None => date_row = &dims.dates[self.date_index.sample(rng)],
            }
        }
        let (product_id, version) = resolved.ok_or_else(|| GenerationError::RetriesExhausted {
            row_index: sale_id as u64 - 1,
            attempts: config.max_row_retries,
            reason: "no valid product version for any sampled date".to_string(),
        })?;

        let customer_id = if rng.chance(config.p_loyalty_sale) {
            Some(self.customer_index.sample(rng) as i32 + 1)
        } else {
            None
        };

        let tier = customer_id
            .map(|id| self.customer_tier[id as usize - 1] as usize)
            .unwrap_or(0);
        let mut quantity = self.quantity_tiers[tier].sample(rng) as i32 + 1;

        let unit_price = version.list_price;
        let total = quantity as f64 * unit_price;
        let discount_pct = if rng.chance(config.p_discount) {
            rng.random_range(config.discount_pct_min..=config.discount_pct_max)
        } else {
            0.0
        };
        let discount = total * discount_pct / 100.0;

        // Margin comes from the unrounded amounts; rounding happens last and
        // the validator re-checks the 0.01 tolerance on the stored values.
        let net = total - discount;
        let cost = quantity as f64 * version.unit_cost;
        let margin = net - cost;

        let mut net_amount = round2(net);
        let mut cost_amount = round2(cost);
        let mut margin_amount = round2(margin);

        let is_return = rng.chance(config.p_return);
        if is_return {
            quantity = -quantity;
            net_amount = -net_amount;
            cost_amount = -cost_amount;
            margin_amount = -margin_amount;
        }

        let payment_method = PaymentMethod::ALL[rng.random_range(0..PaymentMethod::ALL.len())];

        Ok(SalesFact {
            sale_id,
            store_id: store.store_id,
            product_id,
            customer_id,
            sale_date: date_row.date_value,
            quantity,
            unit_price,
            total_amount: round2(total),
            discount_pct: round2(discount_pct),
            discount_amount: round2(discount),
            net_amount,
            cost_amount,
            margin_amount,
            payment_method,
            is_return,
        })
    }
}

fn weighted(
    what: &str,
    weights: impl Iterator<Item = f64>,
) -> Result<WeightedIndex<f64>, GenerationError> {
    WeightedIndex::new(weights)
        .map_err(|err| GenerationError::InvalidConfig(format!("{what}: {err}")))
}

fn date_weight(config: &RunConfig, date: &DateDim) -> f64 {
    let mut weight = 1.0;
    if config.peak_months.contains(&date.month) {
        weight *= config.peak_month_boost;
    }
    if date.is_weekend {
        weight *= config.weekend_boost;
    }
    weight
}

/// Round to 2 decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimensions;
    use crate::profiles;
    use seedmart_core::{Stage, StreamFactory};

    fn prepared(config: &RunConfig) -> (Dimensions, FactSampler) {
        let factory = StreamFactory::new(config.seed);
        let dates = dimensions::date::generate(config);
        let stores =
            dimensions::store::generate(config, &mut factory.stage(Stage::StoreDim)).unwrap();
        let products =
            dimensions::product::generate(config, &mut factory.stage(Stage::ProductDim)).unwrap();
        let customers =
            dimensions::customer::generate(config, &mut factory.stage(Stage::CustomerDim));
        let profiles = profiles::assign(config, &mut factory.stage(Stage::Profiles));
        let dims = Dimensions::new(dates, stores, products, customers);
        let sampler = FactSampler::new(config, &dims, &profiles).unwrap();
        (dims, sampler)
    }

    fn small_config() -> RunConfig {
        let mut config = RunConfig::default();
        config.num_stores = 5;
        config.num_products = 10;
        config.num_customers = 20;
        config.num_sales = 100;
        config.date_range_days = 365;
        config
    }

    #[test]
    fn sampled_rows_stay_in_range() {
        let config = small_config();
        let (dims, sampler) = prepared(&config);
        let mut rng = StreamFactory::new(config.seed).fact_partition(0);
        for sale_id in 1..=200 {
            let fact = sampler.sample(&config, &dims, sale_id, &mut rng).unwrap();
            assert!((1..=5).contains(&fact.store_id));
            assert!((1..=10).contains(&fact.product_id));
            if let Some(id) = fact.customer_id {
                assert!((1..=20).contains(&id));
            }
            assert!((1..=5).contains(&fact.quantity.abs()));
            assert!(fact.sale_date >= config.start_date);
            assert!(fact.sale_date <= config.end_date());
        }
    }

    #[test]
    fn margin_identity_holds_after_rounding() {
        let config = small_config();
        let (dims, sampler) = prepared(&config);
        let mut rng = StreamFactory::new(config.seed).fact_partition(0);
        for sale_id in 1..=500 {
            let fact = sampler.sample(&config, &dims, sale_id, &mut rng).unwrap();
            let drift = (fact.net_amount - fact.cost_amount - fact.margin_amount).abs();
            // Independent rounding drifts the identity by at most one cent.
            assert!(drift <= 0.01 + 1e-9, "drift {drift} on sale {sale_id}");
        }
    }

    #[test]
    fn pricing_matches_the_valid_product_version() {
        let mut config = small_config();
        config.price_changes = true;
        config.price_change_fraction = 1.0;
        let (dims, sampler) = prepared(&config);
        let mut rng = StreamFactory::new(config.seed).fact_partition(0);
        for sale_id in 1..=300 {
            let fact = sampler.sample(&config, &dims, sale_id, &mut rng).unwrap();
            let version = dims
                .product_version_on(fact.product_id, fact.sale_date)
                .expect("version valid on sale date");
            assert_eq!(fact.unit_price, version.list_price);
            let expected_cost = round2(fact.quantity.abs() as f64 * version.unit_cost);
            assert!((fact.cost_amount.abs() - expected_cost).abs() < 0.01);
        }
    }

    #[test]
    fn round2_behaves() {
        assert_eq!(round2(1.006), 1.01);
        assert_eq!(round2(2.0), 2.0);
        assert_eq!(round2(-3.456), -3.46);
    }
}
