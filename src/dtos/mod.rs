pub mod dashboard;
pub mod expense;
pub mod product;
pub mod transaction;
