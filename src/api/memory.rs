// src/api/memory.rs
//! In-process store with the same contract as the REST API. Used for demos
//! and tests; it can be told to fail updates or to answer slowly.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use ::http::StatusCode;
use async_trait::async_trait;
use chrono::{NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::{RemoteStore, Resource};
use crate::dtos::dashboard::{DashboardStats, Period};
use crate::dtos::transaction::BulkCreateTransactionsRequest;
use crate::error::AppError;
use crate::metrics;
use crate::models::{Expense, FieldValue, Transaction};

#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    FetchAll(Resource),
    PartialUpdate { resource: Resource, id: i64, field: String, value: FieldValue },
    Create(Resource),
    Update(Resource, i64),
    Delete(Resource, i64),
    BulkDelete(Resource, Vec<i64>),
    BulkCreateTransactions(usize),
    Dashboard(Period),
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<Resource, Vec<Value>>>,
    protected: Mutex<HashSet<(Resource, i64)>>,
    calls: Mutex<Vec<StoreCall>>,
    latency: Mutex<Option<Duration>>,
    next_id: AtomicI64,
    fail_updates: AtomicBool,
    fail_fetches: AtomicBool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // a panicking test thread must not wedge the store
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn row_id(row: &Value) -> Option<i64> {
    row.get("id").and_then(Value::as_i64)
}

fn row_refers_to(row: &Value, keys: &[&str], id: i64) -> bool {
    keys.iter().any(|k| row.get(*k).and_then(Value::as_i64) == Some(id))
}

fn decimal_field(row: &Value, key: &str) -> Decimal {
    row.get(key)
        .and_then(|v| serde_json::from_value::<Decimal>(v.clone()).ok())
        .unwrap_or_default()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { next_id: AtomicI64::new(1), ..Default::default() }
    }

    /// Adds a row, assigning an id when it has none. Returns the id.
    pub fn insert(&self, resource: Resource, mut row: Value) -> i64 {
        let id = match row_id(&row) {
            Some(id) => {
                self.next_id.fetch_max(id + 1, Ordering::SeqCst);
                id
            }
            None => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                if let Value::Object(obj) = &mut row {
                    obj.insert("id".to_string(), Value::from(id));
                }
                id
            }
        };
        lock(&self.tables).entry(resource).or_default().push(row);
        id
    }

    pub fn rows(&self, resource: Resource) -> Vec<Value> {
        lock(&self.tables).get(&resource).cloned().unwrap_or_default()
    }

    pub fn row(&self, resource: Resource, id: i64) -> Option<Value> {
        self.rows(resource).into_iter().find(|r| row_id(r) == Some(id))
    }

    /// Marks a record as referenced by data the store does not model.
    pub fn protect(&self, resource: Resource, id: i64) {
        lock(&self.protected).insert((resource, id));
    }

    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        *lock(&self.latency) = latency;
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.calls).clone()
    }

    pub fn update_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, StoreCall::PartialUpdate { .. }))
            .count()
    }

    async fn enter(&self, call: StoreCall) {
        lock(&self.calls).push(call);
        let latency = *lock(&self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn is_referenced(&self, resource: Resource, id: i64) -> bool {
        if lock(&self.protected).contains(&(resource, id)) {
            return true;
        }
        let keys: &[&str] = match resource {
            Resource::Products => &["product", "product_id"],
            Resource::Marketplaces => &["marketplace", "marketplace_id"],
            Resource::Transactions | Resource::Expenses => return false,
        };
        lock(&self.tables)
            .get(&Resource::Transactions)
            .is_some_and(|rows| rows.iter().any(|r| row_refers_to(r, keys, id)))
    }

    fn typed<T: serde::de::DeserializeOwned>(&self, resource: Resource) -> Result<Vec<T>, AppError> {
        self.rows(resource)
            .into_iter()
            .map(|r| serde_json::from_value(r).map_err(AppError::from))
            .collect()
    }

    fn name_of(&self, resource: Resource, id: i64) -> Option<String> {
        self.row(resource, id)
            .and_then(|r| r.get("name").and_then(Value::as_str).map(str::to_string))
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    #[instrument(skip(self))]
    async fn fetch_all(&self, resource: Resource) -> Result<Vec<Value>, AppError> {
        self.enter(StoreCall::FetchAll(resource)).await;
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(AppError::remote(StatusCode::SERVICE_UNAVAILABLE, "store unavailable"));
        }
        Ok(self.rows(resource))
    }

    #[instrument(skip(self, value))]
    async fn partial_update(
        &self,
        resource: Resource,
        id: i64,
        field: &str,
        value: &FieldValue,
    ) -> Result<Value, AppError> {
        self.enter(StoreCall::PartialUpdate {
            resource,
            id,
            field: field.to_string(),
            value: value.clone(),
        })
        .await;
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AppError::remote(StatusCode::INTERNAL_SERVER_ERROR, "update rejected"));
        }

        let mut tables = lock(&self.tables);
        let row = tables
            .get_mut(&resource)
            .and_then(|rows| rows.iter_mut().find(|r| row_id(r) == Some(id)))
            .ok_or_else(|| AppError::not_found(format!("{} not found", resource.label())))?;
        if let Value::Object(obj) = row {
            obj.insert(field.to_string(), value.to_json());
        }
        debug!(id, field, "Applied partial update");
        Ok(row.clone())
    }

    #[instrument(skip(self, record))]
    async fn create(&self, resource: Resource, record: Value) -> Result<Value, AppError> {
        self.enter(StoreCall::Create(resource)).await;
        if !record.is_object() {
            return Err(AppError::validation("Record must be a JSON object"));
        }
        let id = self.insert(resource, record);
        self.row(resource, id)
            .ok_or_else(|| AppError::not_found(format!("{} not found", resource.label())))
    }

    #[instrument(skip(self, record))]
    async fn update(&self, resource: Resource, id: i64, record: Value) -> Result<Value, AppError> {
        self.enter(StoreCall::Update(resource, id)).await;
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AppError::remote(StatusCode::INTERNAL_SERVER_ERROR, "update rejected"));
        }
        let Value::Object(fields) = record else {
            return Err(AppError::validation("Record must be a JSON object"));
        };

        let mut tables = lock(&self.tables);
        let row = tables
            .get_mut(&resource)
            .and_then(|rows| rows.iter_mut().find(|r| row_id(r) == Some(id)))
            .ok_or_else(|| AppError::not_found(format!("{} not found", resource.label())))?;
        if let Value::Object(obj) = row {
            for (k, v) in fields.into_iter().filter(|(k, _)| k != "id") {
                obj.insert(k, v);
            }
        }
        Ok(row.clone())
    }

    #[instrument(skip(self))]
    async fn delete(&self, resource: Resource, id: i64) -> Result<(), AppError> {
        self.enter(StoreCall::Delete(resource, id)).await;
        if self.is_referenced(resource, id) {
            return Err(AppError::conflict(format!(
                "{} {id} is referenced by other records",
                resource.label()
            )));
        }

        let mut tables = lock(&self.tables);
        let rows = tables.entry(resource).or_default();
        let before = rows.len();
        rows.retain(|r| row_id(r) != Some(id));
        if rows.len() == before {
            return Err(AppError::not_found(format!("{} not found", resource.label())));
        }
        Ok(())
    }

    #[instrument(skip(self, ids))]
    async fn bulk_delete(&self, resource: Resource, ids: &[i64]) -> Result<(), AppError> {
        self.enter(StoreCall::BulkDelete(resource, ids.to_vec())).await;
        if let Some(id) = ids.iter().copied().find(|id| self.is_referenced(resource, *id)) {
            return Err(AppError::conflict(format!(
                "{} {id} is referenced by other records",
                resource.label()
            )));
        }

        let doomed: HashSet<i64> = ids.iter().copied().collect();
        lock(&self.tables)
            .entry(resource)
            .or_default()
            .retain(|r| row_id(r).map_or(true, |id| !doomed.contains(&id)));
        Ok(())
    }

    #[instrument(skip(self, batch))]
    async fn bulk_create_transactions(&self, batch: &BulkCreateTransactionsRequest) -> Result<(), AppError> {
        self.enter(StoreCall::BulkCreateTransactions(batch.items.len())).await;
        batch.validate()?;

        let common = &batch.common;
        let marketplace_id = common.marketplace.unwrap_or_default();
        let date = common.transaction_date.and_time(NaiveTime::MIN).and_utc();

        for (line, item) in batch.items.iter().enumerate() {
            let product_id = item.product.unwrap_or_default();
            let product = self
                .row(Resource::Products, product_id)
                .ok_or_else(|| AppError::not_found(format!("Product {product_id} not found")))?;

            let unit_cost = decimal_field(&product, "weighted_cost");
            let sale_price = item.sale_price.unwrap_or_default();
            // order shipping is charged once, on the first line
            let shipping = if line == 0 { common.shipping_cost } else { Decimal::ZERO };
            let net_profit =
                sale_price - (unit_cost * Decimal::from(item.quantity) + item.commission_amount + shipping);

            self.insert(
                Resource::Transactions,
                json!({
                    "transaction_date": date,
                    "marketplace_id": marketplace_id,
                    "marketplace_name": self.name_of(Resource::Marketplaces, marketplace_id),
                    "order_number": common.order_number,
                    "product_id": product_id,
                    "product_name": product.get("name"),
                    "product_sku": product.get("sku"),
                    "quantity": item.quantity,
                    "sale_price": sale_price,
                    "commission_amount": item.commission_amount,
                    "shipping_cost": shipping,
                    "cost_at_transaction": unit_cost,
                    "net_profit": net_profit,
                    "transaction_type": common.transaction_type,
                }),
            );
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn dashboard(&self, period: Period) -> Result<DashboardStats, AppError> {
        self.enter(StoreCall::Dashboard(period)).await;
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(AppError::remote(StatusCode::SERVICE_UNAVAILABLE, "store unavailable"));
        }
        let transactions: Vec<Transaction> = self.typed(Resource::Transactions)?;
        let expenses: Vec<Expense> = self.typed(Resource::Expenses)?;
        Ok(metrics::dashboard_stats(&transactions, &expenses, period, Utc::now().date_naive()))
    }
}
