use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Sale,
    Return,
    Cancel,
    Purchase, // stock purchase / supplier invoice
}

impl TransactionType {
    pub fn label(self) -> &'static str {
        match self {
            TransactionType::Sale => "SALE",
            TransactionType::Return => "RETURN",
            TransactionType::Cancel => "CANCEL",
            TransactionType::Purchase => "PURCHASE",
        }
    }

    /// Sign applied to commission and shipping when they are rendered.
    /// The stored amounts are always absolute.
    pub fn deduction_sign(self) -> i8 {
        match self {
            TransactionType::Sale | TransactionType::Purchase => -1,
            // reversed order: fees flow back
            TransactionType::Return | TransactionType::Cancel => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub transaction_date: DateTime<Utc>,
    pub marketplace_id: i64,
    #[serde(default)]
    pub marketplace_name: Option<String>,
    pub order_number: String,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_sku: Option<String>,
    pub quantity: i32,
    pub sale_price: Decimal,
    #[serde(default)]
    pub commission_amount: Decimal,
    #[serde(default)]
    pub shipping_cost: Decimal,
    pub cost_at_transaction: Decimal,
    pub net_profit: Decimal,
    pub transaction_type: TransactionType,
}

impl Transaction {
    pub fn is_sale(&self) -> bool {
        self.transaction_type == TransactionType::Sale
    }

    /// Line cost, saturating at the `Decimal` bounds.
    pub fn total_cost(&self) -> Decimal {
        self.cost_at_transaction.saturating_mul(Decimal::from(self.quantity))
    }

    // Profit as the dashboard computes it from raw fields
    pub fn gross_profit(&self) -> Decimal {
        let deductions = self
            .total_cost()
            .saturating_add(self.commission_amount)
            .saturating_add(self.shipping_cost);
        self.sale_price.saturating_sub(deductions)
    }
}
