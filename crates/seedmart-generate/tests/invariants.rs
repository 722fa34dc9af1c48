use std::collections::HashMap;

use chrono::Datelike;

use seedmart_core::RunConfig;
use seedmart_generate::{AbortFlag, GenerationEngine};
use seedmart_sink::MemorySink;

fn base_config() -> RunConfig {
    let mut config = RunConfig::default();
    config.num_stores = 10;
    config.num_products = 30;
    config.num_customers = 100;
    config.num_sales = 3_000;
    config.date_range_days = 365;
    config.batch_size = 500;
    config
}

async fn run_into_memory(config: &RunConfig) -> MemorySink {
    let engine = GenerationEngine::new(config.clone());
    let mut sink = MemorySink::new();
    engine
        .run(&mut sink, &AbortFlag::new())
        .await
        .expect("run generation");
    sink
}

#[tokio::test]
async fn invariant_closure_holds_for_every_row() {
    let config = base_config();
    let sink = run_into_memory(&config).await;
    assert_eq!(sink.facts.len() as u64, config.num_sales);

    for fact in &sink.facts {
        if fact.is_return {
            assert!(fact.quantity < 0, "return quantity must be negative");
            assert!(fact.net_amount <= 0.0);
            assert!(fact.cost_amount < 0.0);
        } else {
            assert!(fact.quantity > 0, "sale quantity must be positive");
            assert!(fact.net_amount >= 0.0);
            assert!(fact.cost_amount > 0.0);
        }
        assert!((1..=5).contains(&fact.quantity.abs()));
        let drift = (fact.net_amount - fact.cost_amount - fact.margin_amount).abs();
        assert!(
            drift <= 0.01 + 1e-9,
            "margin drift {drift} on sale {}",
            fact.sale_id
        );

        if fact.discount_pct > 0.0 {
            assert!(fact.discount_pct >= config.discount_pct_min - 0.01);
            assert!(fact.discount_pct <= config.discount_pct_max + 0.01);
        } else {
            assert_eq!(fact.discount_amount, 0.0);
        }
        assert!(fact.sale_date >= config.start_date);
        assert!(fact.sale_date <= config.end_date());
    }
}

#[tokio::test]
async fn foreign_keys_resolve_within_dimensions() {
    let config = base_config();
    let sink = run_into_memory(&config).await;

    let store_ids: Vec<i32> = sink.stores.iter().map(|s| s.store_id).collect();
    let customer_ids: Vec<i32> = sink.customers.iter().map(|c| c.customer_id).collect();

    for fact in &sink.facts {
        assert!(store_ids.contains(&fact.store_id));
        if let Some(customer_id) = fact.customer_id {
            assert!(customer_ids.contains(&customer_id));
        }
        let version = sink
            .products
            .iter()
            .find(|p| p.product_id == fact.product_id && p.valid_on(fact.sale_date));
        assert!(
            version.is_some(),
            "sale {} references product {} with no valid version",
            fact.sale_id,
            fact.product_id
        );
    }
}

#[tokio::test]
async fn sale_ids_are_unique_and_dense() {
    let config = base_config();
    let sink = run_into_memory(&config).await;
    let mut ids: Vec<i64> = sink.facts.iter().map(|f| f.sale_id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len() as u64, config.num_sales);
    assert_eq!(ids.first(), Some(&1));
    assert_eq!(ids.last(), Some(&(config.num_sales as i64)));
}

#[tokio::test]
async fn peak_months_outsell_the_baseline() {
    let mut config = base_config();
    config.num_sales = 20_000;
    let sink = run_into_memory(&config).await;

    let mut peak_days = 0u64;
    let mut off_days = 0u64;
    for date in &sink.dates {
        if config.peak_months.contains(&date.month) {
            peak_days += 1;
        } else {
            off_days += 1;
        }
    }

    let mut peak_sales = 0u64;
    let mut off_sales = 0u64;
    for fact in &sink.facts {
        if config.peak_months.contains(&fact.sale_date.month()) {
            peak_sales += 1;
        } else {
            off_sales += 1;
        }
    }

    let peak_rate = peak_sales as f64 / peak_days as f64;
    let off_rate = off_sales as f64 / off_days as f64;
    assert!(
        peak_rate > off_rate * 1.3,
        "peak {peak_rate:.2}/day vs off-peak {off_rate:.2}/day"
    );
}

#[tokio::test]
async fn customer_aggregates_derive_from_the_fact_stream() {
    let config = base_config();
    let sink = run_into_memory(&config).await;

    let mut purchases: HashMap<i32, i64> = HashMap::new();
    let mut spend: HashMap<i32, f64> = HashMap::new();
    for fact in &sink.facts {
        let Some(customer_id) = fact.customer_id else {
            continue;
        };
        *spend.entry(customer_id).or_default() += fact.net_amount;
        if !fact.is_return {
            *purchases.entry(customer_id).or_default() += 1;
        }
    }

    for customer in &sink.customers {
        let expected_purchases = purchases.get(&customer.customer_id).copied().unwrap_or(0);
        assert_eq!(customer.lifetime_purchases, expected_purchases);

        let expected_spend = spend.get(&customer.customer_id).copied().unwrap_or(0.0);
        assert!(
            (customer.lifetime_spend - expected_spend).abs() < 0.01,
            "customer {} spend {} vs fact stream {}",
            customer.customer_id,
            customer.lifetime_spend,
            expected_spend
        );
        if customer.lifetime_purchases > 0 {
            let first = customer.first_purchase_date.expect("first purchase date");
            let last = customer.last_purchase_date.expect("last purchase date");
            assert!(first <= last);
        }
    }
}

#[tokio::test]
async fn returns_stay_a_small_minority() {
    let mut config = base_config();
    config.num_sales = 10_000;
    let sink = run_into_memory(&config).await;
    let returns = sink.facts.iter().filter(|f| f.is_return).count() as f64;
    let share = returns / sink.facts.len() as f64;
    assert!((share - config.p_return).abs() < 0.02);
}
