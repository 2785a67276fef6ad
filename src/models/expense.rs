use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseCategory {
    Rent,
    Salary,
    Electricity,
    Water,
    Internet,
    Loan,
    Premium,
    Tax,
    Marketing,
    #[default]
    Other,
}

impl ExpenseCategory {
    pub fn display_name(self) -> &'static str {
        match self {
            ExpenseCategory::Rent => "Rent",
            ExpenseCategory::Salary => "Salary / Staff",
            ExpenseCategory::Electricity => "Electricity Bill",
            ExpenseCategory::Water => "Water Bill",
            ExpenseCategory::Internet => "Internet / Phone",
            ExpenseCategory::Loan => "Loan Payment",
            ExpenseCategory::Premium => "Bonus Payment",
            ExpenseCategory::Tax => "Tax Payment",
            ExpenseCategory::Marketing => "Advertising / Marketing",
            ExpenseCategory::Other => "Other Overheads",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub category: ExpenseCategory,
    #[serde(default)]
    pub category_display: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub amount: Decimal,
    pub expense_date: NaiveDate,
}
