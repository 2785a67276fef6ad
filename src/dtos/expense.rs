use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::ExpenseCategory;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateExpenseRequest {
    pub category: ExpenseCategory,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub expense_date: Option<NaiveDate>,
}

impl CreateExpenseRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        match self.amount {
            None => return Err(AppError::validation("Amount is required")),
            Some(a) if a.is_sign_negative() => {
                return Err(AppError::validation("Amount cannot be negative"))
            }
            Some(_) => {}
        }
        if self.expense_date.is_none() {
            return Err(AppError::validation("Expense date is required"));
        }
        Ok(())
    }
}
