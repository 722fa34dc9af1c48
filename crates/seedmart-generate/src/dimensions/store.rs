use chrono::Duration;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

use seedmart_core::{DrawStream, RunConfig, StoreDim};

use crate::errors::GenerationError;

/// Draw `num_stores` records. Per store, the draw order is: region,
/// store type, latitude, longitude, opening offset.
pub fn generate(
    config: &RunConfig,
    rng: &mut DrawStream,
) -> Result<Vec<StoreDim>, GenerationError> {
    let region_index = WeightedIndex::new(config.regions.iter().map(|r| r.weight))
        .map_err(|err| GenerationError::InvalidConfig(format!("region weights: {err}")))?;
    let type_index = WeightedIndex::new(config.store_types.iter().map(|s| s.weight))
        .map_err(|err| GenerationError::InvalidConfig(format!("store type weights: {err}")))?;

    let mut rows = Vec::with_capacity(config.num_stores as usize);
    for store_id in 1..=config.num_stores as i32 {
        let region = config.regions[region_index.sample(rng)].name.clone();
        let store_type = config.store_types[type_index.sample(rng)].store_type;
        let latitude = rng.random_range(30.0..=48.0);
        let longitude = rng.random_range(-120.0..=-70.0);
        let opening_offset = rng.random_range(1..=i64::from(config.opening_window_days.max(1)));

        rows.push(StoreDim {
            store_id,
            store_name: format!("Store {store_id} - {region}"),
            store_code: format!("ST{store_id:04}"),
            city: format!("City_{}_{}", region, store_id % 10),
            region,
            country: "USA".to_string(),
            latitude,
            longitude,
            store_type,
            opening_date: config.start_date - Duration::days(opening_offset),
            status: "Active".to_string(),
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedmart_core::{Stage, StreamFactory};

    fn small_config() -> RunConfig {
        let mut config = RunConfig::default();
        config.num_stores = 25;
        config
    }

    #[test]
    fn every_store_belongs_to_a_configured_region() {
        let config = small_config();
        let mut rng = StreamFactory::new(config.seed).stage(Stage::StoreDim);
        let rows = generate(&config, &mut rng).expect("generate stores");
        assert_eq!(rows.len(), 25);
        for row in &rows {
            assert!(config.regions.iter().any(|r| r.name == row.region));
            assert_eq!(row.store_code, format!("ST{:04}", row.store_id));
        }
    }

    #[test]
    fn stores_open_before_dataset_start() {
        let config = small_config();
        let mut rng = StreamFactory::new(config.seed).stage(Stage::StoreDim);
        let rows = generate(&config, &mut rng).expect("generate stores");
        for row in &rows {
            assert!(row.opening_date < config.start_date);
        }
    }
}
