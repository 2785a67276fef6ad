use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::TransactionType;

// ==================== Bulk create (one order, many lines) ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionCommon {
    pub marketplace: Option<i64>,
    pub transaction_date: NaiveDate,
    pub order_number: String,
    pub transaction_type: TransactionType,
    pub shipping_cost: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionItem {
    pub product: Option<i64>,
    pub quantity: i32,
    pub sale_price: Option<Decimal>,
    pub commission_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkCreateTransactionsRequest {
    pub common: TransactionCommon,
    pub items: Vec<TransactionItem>,
}

impl BulkCreateTransactionsRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.items.is_empty() {
            return Err(AppError::validation("Order must contain at least one item"));
        }
        if self.common.marketplace.is_none() {
            return Err(AppError::validation("Marketplace is required"));
        }
        if self.common.order_number.trim().is_empty() {
            return Err(AppError::validation("Order number is required"));
        }
        if self.common.shipping_cost.is_sign_negative() {
            return Err(AppError::validation("Shipping cost cannot be negative"));
        }

        for item in &self.items {
            if item.product.is_none() {
                return Err(AppError::validation("Every item needs a product"));
            }
            match item.sale_price {
                None => return Err(AppError::validation("Every item needs a sale price")),
                Some(p) if p.is_sign_negative() => {
                    return Err(AppError::validation("Sale price cannot be negative"))
                }
                Some(_) => {}
            }
            if item.quantity <= 0 {
                return Err(AppError::validation("Quantity must be greater than 0"));
            }
            if item.commission_amount.is_sign_negative() {
                return Err(AppError::validation("Commission cannot be negative"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<i64>,
}
