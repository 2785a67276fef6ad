// src/lib.rs
pub mod api;
pub mod config;
pub mod display;
pub mod dtos;
pub mod editing;
pub mod error;
pub mod metrics;
pub mod models;
pub mod sorting;
pub mod views;

pub use config::Config;
pub use error::AppError;
