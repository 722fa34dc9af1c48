use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Store format within the configured retail network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    Flagship,
    Standard,
    Outlet,
}

impl StoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreType::Flagship => "Flagship",
            StoreType::Standard => "Standard",
            StoreType::Outlet => "Outlet",
        }
    }
}

/// Top-level product category of the fixed taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Textile,
    Accessories,
    Seasonal,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Textile => "Textile",
            Category::Accessories => "Accessories",
            Category::Seasonal => "Seasonal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    DebitCard,
    MobilePay,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::CreditCard,
        PaymentMethod::DebitCard,
        PaymentMethod::MobilePay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::CreditCard => "Credit Card",
            PaymentMethod::DebitCard => "Debit Card",
            PaymentMethod::MobilePay => "Mobile Pay",
        }
    }
}

/// One calendar day of the horizon. Every field is a pure function of
/// `date_value`; nothing here is sampled or mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateDim {
    /// `YYYYMMDD` integer key.
    pub date_id: i32,
    pub date_value: NaiveDate,
    /// ISO day of week, 1 = Monday .. 7 = Sunday.
    pub day_of_week: u32,
    pub day_name: String,
    pub week_of_year: u32,
    pub month: u32,
    pub month_name: String,
    pub quarter: u32,
    pub fiscal_quarter: u32,
    pub year: i32,
    pub fiscal_year: i32,
    pub is_weekend: bool,
    pub is_holiday: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDim {
    pub store_id: i32,
    pub store_name: String,
    pub store_code: String,
    pub region: String,
    pub country: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub store_type: StoreType,
    pub opening_date: NaiveDate,
    pub status: String,
}

/// One product version. SCD-2: a product with a simulated price change owns
/// two rows with disjoint validity intervals covering the horizon, exactly
/// one of them current (`valid_to` = None).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDim {
    pub product_id: i32,
    pub product_name: String,
    pub product_code: String,
    pub category: Category,
    pub subcategory: String,
    pub unit_cost: f64,
    pub list_price: f64,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
    pub is_current: bool,
}

impl ProductDim {
    /// Whether this version is valid on `date` (intervals are inclusive).
    pub fn valid_on(&self, date: NaiveDate) -> bool {
        date >= self.valid_from && self.valid_to.is_none_or(|to| date <= to)
    }
}

/// Customer with derived lifetime aggregates. The aggregates are recomputed
/// from the fact stream after generation, never independently sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerDim {
    pub customer_id: i32,
    pub loyalty_member: bool,
    pub join_date: Option<NaiveDate>,
    pub country: String,
    pub status: String,
    pub lifetime_purchases: i64,
    pub lifetime_spend: f64,
    pub first_purchase_date: Option<NaiveDate>,
    pub last_purchase_date: Option<NaiveDate>,
}

/// One transaction at the grain of the fact table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesFact {
    pub sale_id: i64,
    pub store_id: i32,
    pub product_id: i32,
    /// None for non-member walk-in sales.
    pub customer_id: Option<i32>,
    pub sale_date: NaiveDate,
    pub quantity: i32,
    pub unit_price: f64,
    pub total_amount: f64,
    pub discount_pct: f64,
    pub discount_amount: f64,
    pub net_amount: f64,
    pub cost_amount: f64,
    pub margin_amount: f64,
    pub payment_method: PaymentMethod,
    pub is_return: bool,
}

/// Latent purchase behavior assigned to a customer at creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    /// Relative weight of this customer in the loyalty sale pool.
    pub purchase_rate: f64,
    /// Monetary scale; tilts the quantity distribution for high-value customers.
    pub monetary_scale: f64,
}

/// Latent demand profile assigned to a product at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductProfile {
    /// Demand weight per calendar month, January first.
    pub seasonal: [f64; 12],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_validity_is_inclusive() {
        let version = ProductDim {
            product_id: 1,
            product_name: "T-Shirt - AA".to_string(),
            product_code: "PRD00001".to_string(),
            category: Category::Textile,
            subcategory: "T-Shirt".to_string(),
            unit_cost: 10.0,
            list_price: 25.0,
            valid_from: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            valid_to: Some(NaiveDate::from_ymd_opt(2023, 6, 30).unwrap()),
            is_current: false,
        };
        assert!(version.valid_on(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()));
        assert!(version.valid_on(NaiveDate::from_ymd_opt(2023, 6, 30).unwrap()));
        assert!(!version.valid_on(NaiveDate::from_ymd_opt(2023, 7, 1).unwrap()));
        assert!(!version.valid_on(NaiveDate::from_ymd_opt(2022, 12, 31).unwrap()));
    }

    #[test]
    fn open_ended_version_is_valid_forever() {
        let version = ProductDim {
            product_id: 1,
            product_name: "Hat - AB".to_string(),
            product_code: "PRD00001".to_string(),
            category: Category::Accessories,
            subcategory: "Hat".to_string(),
            unit_cost: 8.0,
            list_price: 19.0,
            valid_from: NaiveDate::from_ymd_opt(2023, 7, 1).unwrap(),
            valid_to: None,
            is_current: true,
        };
        assert!(version.valid_on(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()));
        assert!(!version.valid_on(NaiveDate::from_ymd_opt(2023, 6, 30).unwrap()));
    }
}
