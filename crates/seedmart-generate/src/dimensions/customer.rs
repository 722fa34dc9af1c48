use chrono::Duration;
use rand::Rng;

use seedmart_core::{CustomerDim, DrawStream, RunConfig};

/// Draw `num_customers` records. Per customer, the draw order is: loyalty
/// flag, then (members only) the join offset. Join dates land before dataset
/// start, so they precede any simulated activity; lifetime aggregates start
/// zeroed and are derived from the fact stream after generation.
pub fn generate(config: &RunConfig, rng: &mut DrawStream) -> Vec<CustomerDim> {
    let window = i64::from(config.join_window_days.max(1));
    let mut rows = Vec::with_capacity(config.num_customers as usize);
    for customer_id in 1..=config.num_customers as i32 {
        let loyalty_member = rng.chance(config.p_loyalty_member);
        let join_date = loyalty_member.then(|| {
            let offset = rng.random_range(1..=window);
            config.start_date - Duration::days(offset)
        });
        rows.push(CustomerDim {
            customer_id,
            loyalty_member,
            join_date,
            country: "USA".to_string(),
            status: "Active".to_string(),
            lifetime_purchases: 0,
            lifetime_spend: 0.0,
            first_purchase_date: None,
            last_purchase_date: None,
        });
    }
    rows
}
