//! Invariant validator.
//!
//! Every fact row passes through here before it joins the active batch. A
//! violation is reported as a reason string; the engine regenerates the row
//! from the next draws in the stream, bounded by `max_row_retries`.

use seedmart_core::{RunConfig, SalesFact};

use crate::sampler::Dimensions;

/// Allowed drift between `net - cost` and the stored margin: at most one
/// cent. Rounding net, cost and margin independently legitimately drifts the
/// identity by exactly 0.01 on a quarter of rows, so the bound is inclusive.
pub const MARGIN_TOLERANCE: f64 = 0.01;

/// Absorbs binary representation noise on exact one-cent drifts.
const FLOAT_EPSILON: f64 = 1e-9;

/// Allowed drift between the stored cost and `quantity * unit_cost` of the
/// validity-matched product version.
const COST_TOLERANCE: f64 = 0.01;

pub fn validate_fact(
    fact: &SalesFact,
    dims: &Dimensions,
    config: &RunConfig,
) -> Result<(), String> {
    if fact.sale_date < config.start_date || fact.sale_date > config.end_date() {
        return Err(format!("sale_date {} outside horizon", fact.sale_date));
    }
    if fact.store_id < 1 || fact.store_id as usize > dims.stores.len() {
        return Err(format!("store_id {} unresolved", fact.store_id));
    }
    if let Some(customer_id) = fact.customer_id
        && (customer_id < 1 || customer_id as usize > dims.customers.len())
    {
        return Err(format!("customer_id {customer_id} unresolved"));
    }

    let version = dims
        .product_version_on(fact.product_id, fact.sale_date)
        .ok_or_else(|| {
            format!(
                "product_id {} has no version valid on {}",
                fact.product_id, fact.sale_date
            )
        })?;

    if fact.is_return {
        if fact.quantity >= 0 {
            return Err(format!("return with non-negative quantity {}", fact.quantity));
        }
        if fact.net_amount > 0.0 {
            return Err(format!("return with positive net_amount {}", fact.net_amount));
        }
        if fact.cost_amount >= 0.0 {
            return Err(format!(
                "return with non-negative cost_amount {}",
                fact.cost_amount
            ));
        }
    } else {
        if fact.quantity <= 0 {
            return Err(format!("non-positive quantity {}", fact.quantity));
        }
        if fact.net_amount < 0.0 {
            return Err(format!("negative net_amount {}", fact.net_amount));
        }
        if fact.cost_amount <= 0.0 {
            return Err(format!("non-positive cost_amount {}", fact.cost_amount));
        }
    }

    let margin_drift = (fact.net_amount - fact.cost_amount - fact.margin_amount).abs();
    if margin_drift > MARGIN_TOLERANCE + FLOAT_EPSILON {
        return Err(format!("margin drift {margin_drift:.4} exceeds tolerance"));
    }

    let expected_cost = fact.quantity.abs() as f64 * version.unit_cost;
    if (fact.cost_amount.abs() - expected_cost).abs() >= COST_TOLERANCE {
        return Err(format!(
            "cost_amount {} does not match quantity x unit_cost {}",
            fact.cost_amount, expected_cost
        ));
    }

    Ok(())
}
