use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub buying_price: Decimal,
    #[serde(default)]
    pub weighted_cost: Decimal,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default = "default_vat_rate")]
    pub vat_rate: Decimal,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_vat_rate() -> Decimal {
    Decimal::from(20)
}
