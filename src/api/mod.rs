// src/api/mod.rs
//! The REST collaborator the views talk to.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::dtos::dashboard::{DashboardStats, Period};
use crate::dtos::transaction::BulkCreateTransactionsRequest;
use crate::error::AppError;
use crate::models::FieldValue;

pub use self::http::HttpStore;
pub use self::memory::MemoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Products,
    Transactions,
    Expenses,
    Marketplaces,
}

impl Resource {
    /// Collection path relative to the API root, with the trailing slash the
    /// API expects.
    pub fn path(self) -> &'static str {
        match self {
            Resource::Products => "products/",
            Resource::Transactions => "finance/transactions/",
            Resource::Expenses => "finance/expenses/",
            Resource::Marketplaces => "integrations/list/",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Resource::Products => "product",
            Resource::Transactions => "transaction",
            Resource::Expenses => "expense",
            Resource::Marketplaces => "marketplace",
        }
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Full read of a collection, no pagination.
    async fn fetch_all(&self, resource: Resource) -> Result<Vec<Value>, AppError>;

    /// Single-field update. Only `{field: value}` goes over the wire.
    async fn partial_update(
        &self,
        resource: Resource,
        id: i64,
        field: &str,
        value: &FieldValue,
    ) -> Result<Value, AppError>;

    async fn create(&self, resource: Resource, record: Value) -> Result<Value, AppError>;

    async fn update(&self, resource: Resource, id: i64, record: Value) -> Result<Value, AppError>;

    /// `AppError::Conflict` when the record is still referenced elsewhere.
    async fn delete(&self, resource: Resource, id: i64) -> Result<(), AppError>;

    async fn bulk_delete(&self, resource: Resource, ids: &[i64]) -> Result<(), AppError>;

    async fn bulk_create_transactions(&self, batch: &BulkCreateTransactionsRequest) -> Result<(), AppError>;

    async fn dashboard(&self, period: Period) -> Result<DashboardStats, AppError>;
}

/// `fetch_all` decoded into a model type.
pub async fn fetch_typed<T, S>(store: &S, resource: Resource) -> Result<Vec<T>, AppError>
where
    T: DeserializeOwned,
    S: RemoteStore + ?Sized,
{
    store
        .fetch_all(resource)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(AppError::from))
        .collect()
}
