pub mod expense;
pub mod marketplace;
pub mod product;
pub mod record;
pub mod transaction;

pub use expense::{Expense, ExpenseCategory};
pub use marketplace::Marketplace;
pub use product::Product;
pub use record::{EditableRecord, FieldValue};
pub use transaction::{Transaction, TransactionType};
