//! Behavioral profile assigner.
//!
//! Draws the latent per-entity parameters that skew the fact stream: a
//! heavy-tailed purchase rate and monetary scale per customer, and a 12-slot
//! seasonal demand vector per product (category base popularity times the
//! category's seasonal curve). Profiles are assigned once, after the
//! dimensions are generated, and never mutated.

use seedmart_core::{Category, CustomerProfile, DrawStream, ProductProfile, RunConfig};

use crate::dimensions::product::category_for;

/// Immutable behavior profiles for one run, indexed by id minus one.
#[derive(Debug, Clone)]
pub struct BehaviorProfiles {
    pub customers: Vec<CustomerProfile>,
    pub products: Vec<ProductProfile>,
}

/// Draw order: all customer profiles (rate, then scale, per customer), then
/// all product profiles (one popularity draw per product).
pub fn assign(config: &RunConfig, rng: &mut DrawStream) -> BehaviorProfiles {
    let customers = (0..config.num_customers)
        .map(|_| CustomerProfile {
            purchase_rate: rng.pareto(1.0, 1.2).min(1_000.0),
            monetary_scale: rng.pareto(1.0, 2.5).min(50.0),
        })
        .collect();

    let products = (0..config.num_products as usize)
        .map(|index| {
            let popularity = rng.pareto(1.0, 1.5).min(100.0);
            let curve = seasonal_curve(category_for(index));
            let mut seasonal = [0.0; 12];
            for (slot, base) in seasonal.iter_mut().zip(curve) {
                *slot = popularity * base;
            }
            ProductProfile { seasonal }
        })
        .collect();

    BehaviorProfiles {
        customers,
        products,
    }
}

/// Relative monthly demand per category, January first. Textiles peak in the
/// transitional seasons, seasonal goods at mid-summer and mid-winter,
/// accessories stay near-flat with a December gift bump.
fn seasonal_curve(category: Category) -> [f64; 12] {
    match category {
        Category::Textile => [
            0.8, 0.8, 1.3, 1.4, 1.0, 0.7, 0.6, 0.8, 1.3, 1.4, 1.0, 1.1,
        ],
        Category::Accessories => [
            0.9, 0.9, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.1, 1.5,
        ],
        Category::Seasonal => [
            1.4, 1.2, 0.8, 0.7, 0.9, 1.3, 1.5, 1.4, 0.8, 0.7, 1.2, 1.5,
        ],
    }
}
