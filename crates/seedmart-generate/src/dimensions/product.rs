use chrono::Duration;
use rand::Rng;

use seedmart_core::{Category, DrawStream, ProductDim, RunConfig};

use crate::errors::GenerationError;
use crate::sampler::round2;

const TAXONOMY: [(Category, [&str; 5]); 3] = [
    (
        Category::Textile,
        ["T-Shirt", "Dress", "Pants", "Jacket", "Sweater"],
    ),
    (
        Category::Accessories,
        ["Hat", "Scarf", "Bag", "Shoes", "Gloves"],
    ),
    (
        Category::Seasonal,
        ["Swimwear", "Thermal", "Snow Boots", "Sunglasses", "Winter Coat"],
    ),
];

/// Category for the product at a zero-based index; shared with the profile
/// assigner so seasonal curves line up with the generated rows.
pub(crate) fn category_for(index: usize) -> Category {
    TAXONOMY[index % TAXONOMY.len()].0
}

fn cost_floor(category: Category) -> f64 {
    match category {
        Category::Textile => 8.0,
        Category::Accessories => 5.0,
        Category::Seasonal => 12.0,
    }
}

fn margin_range(category: Category) -> (f64, f64) {
    match category {
        Category::Textile => (1.8, 2.8),
        Category::Accessories => (1.5, 3.0),
        Category::Seasonal => (1.6, 2.6),
    }
}

/// Draw `num_products` records across the fixed taxonomy. Per product, the
/// draw order is: unit cost, margin multiplier, then (with price changes
/// enabled) the change toggle, change offset and price adjustment.
///
/// With the price-change simulation on, a selected product owns two rows
/// with disjoint validity intervals covering the horizon; otherwise a single
/// open-ended current version.
pub fn generate(
    config: &RunConfig,
    rng: &mut DrawStream,
) -> Result<Vec<ProductDim>, GenerationError> {
    let span = i64::from(config.date_range_days);
    let mut rows = Vec::with_capacity(config.num_products as usize);

    for index in 0..config.num_products as usize {
        let product_id = index as i32 + 1;
        let (category, subcategories) = TAXONOMY[index % TAXONOMY.len()];
        let subcategory = subcategories[(index / TAXONOMY.len()) % subcategories.len()];
        let product_name = format!(
            "{} - {}{}",
            subcategory,
            letter(index % 26),
            letter((index / 26) % 26)
        );
        let product_code = format!("PRD{product_id:05}");

        let floor = cost_floor(category);
        let unit_cost = round2(rng.pareto(floor, 2.2).min(floor * 8.0));
        let (multiplier_min, multiplier_max) = margin_range(category);
        let multiplier = rng.random_range(multiplier_min..=multiplier_max);
        let list_price = round2(unit_cost * multiplier);

        let base = ProductDim {
            product_id,
            product_name,
            product_code,
            category,
            subcategory: subcategory.to_string(),
            unit_cost,
            list_price,
            valid_from: config.start_date,
            valid_to: None,
            is_current: true,
        };

        // A mid-horizon change needs at least one day on each side.
        if config.price_changes && span >= 4 && rng.chance(config.price_change_fraction) {
            let change_offset = rng.random_range(span / 4..=span * 3 / 4).max(1);
            let change_date = config.start_date + Duration::days(change_offset);
            let adjustment = rng.random_range(0.9..=1.3);
            let adjusted_price = round2(list_price * adjustment);

            rows.push(ProductDim {
                valid_to: Some(change_date - Duration::days(1)),
                is_current: false,
                ..base.clone()
            });
            rows.push(ProductDim {
                list_price: adjusted_price,
                valid_from: change_date,
                ..base
            });
        } else {
            rows.push(base);
        }
    }
    Ok(rows)
}

fn letter(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedmart_core::{Stage, StreamFactory};

    fn config(products: u32, price_changes: bool) -> RunConfig {
        let mut config = RunConfig::default();
        config.num_products = products;
        config.price_changes = price_changes;
        config
    }

    #[test]
    fn exact_count_without_price_changes() {
        let config = config(97, false);
        let mut rng = StreamFactory::new(config.seed).stage(Stage::ProductDim);
        let rows = generate(&config, &mut rng).expect("generate products");
        assert_eq!(rows.len(), 97);
        for row in &rows {
            assert!(row.unit_cost > 0.0);
            assert!(row.list_price >= row.unit_cost * 1.5 - 0.01);
            assert!(row.list_price <= row.unit_cost * 3.0 + 0.01);
            assert!(row.is_current);
            assert!(row.valid_to.is_none());
        }
    }

    #[test]
    fn taxonomy_cycles_over_categories() {
        let config = config(9, false);
        let mut rng = StreamFactory::new(config.seed).stage(Stage::ProductDim);
        let rows = generate(&config, &mut rng).expect("generate products");
        assert_eq!(rows[0].category, Category::Textile);
        assert_eq!(rows[1].category, Category::Accessories);
        assert_eq!(rows[2].category, Category::Seasonal);
        assert_eq!(rows[3].category, Category::Textile);
    }

    #[test]
    fn price_change_versions_cover_horizon() {
        let mut config = config(10, true);
        config.price_change_fraction = 1.0;
        let mut rng = StreamFactory::new(config.seed).stage(Stage::ProductDim);
        let rows = generate(&config, &mut rng).expect("generate products");
        assert_eq!(rows.len(), 20);

        for product_id in 1..=10 {
            let versions: Vec<_> = rows
                .iter()
                .filter(|row| row.product_id == product_id)
                .collect();
            assert_eq!(versions.len(), 2);
            let closed = versions.iter().find(|v| v.valid_to.is_some()).unwrap();
            let open = versions.iter().find(|v| v.valid_to.is_none()).unwrap();
            assert!(!closed.is_current);
            assert!(open.is_current);
            assert_eq!(closed.valid_from, config.start_date);
            assert_eq!(
                closed.valid_to.unwrap() + Duration::days(1),
                open.valid_from
            );
        }
    }
}
