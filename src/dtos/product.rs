// src/dtos/product.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    pub buying_price: Decimal,
    pub stock_quantity: i32,
}

impl CreateProductRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.sku.trim().is_empty() {
            return Err(AppError::validation("SKU is required"));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Product name is required"));
        }
        if self.buying_price.is_sign_negative() {
            return Err(AppError::validation("Buying price cannot be negative"));
        }
        if self.stock_quantity < 0 {
            return Err(AppError::validation("Stock quantity cannot be negative"));
        }
        Ok(())
    }
}

// Full update from the product form (PUT)
pub type UpdateProductRequest = CreateProductRequest;
