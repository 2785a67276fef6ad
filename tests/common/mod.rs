// tests/common/mod.rs
//! A throwaway REST server over `MemoryStore`, shaped like the finance API,
//! plus fixtures shared by the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use retail_ledger::api::{MemoryStore, RemoteStore, Resource};
use retail_ledger::dtos::dashboard::{DashboardStats, Period};
use retail_ledger::dtos::transaction::{BulkCreateTransactionsRequest, BulkDeleteRequest};
use retail_ledger::models::FieldValue;
use retail_ledger::AppError;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct MockState {
    pub store: Arc<MemoryStore>,
    /// Every write body the server received, with its method and path.
    pub received: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MockState {
    fn record(&self, what: String, body: Value) {
        self.received.lock().unwrap().push((what, body));
    }
}

pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

// ==================== Handlers ====================

// GET /api/products/
async fn list_products(State(state): State<MockState>) -> Result<Json<Vec<Value>>, ApiError> {
    Ok(Json(state.store.fetch_all(Resource::Products).await?))
}

// POST /api/products/
async fn create_product(State(state): State<MockState>, Json(body): Json<Value>) -> Result<Json<Value>, ApiError> {
    state.record("POST products/".into(), body.clone());
    Ok(Json(state.store.create(Resource::Products, body).await?))
}

// PATCH /api/products/{id}/ - one field at a time
async fn patch_product(
    Path(id): Path<i64>,
    State(state): State<MockState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    state.record(format!("PATCH products/{id}/"), body.clone());
    let Some((field, value)) = body.as_object().and_then(|o| o.iter().next()) else {
        return Err(AppError::validation("empty update").into());
    };
    let value: FieldValue = serde_json::from_value(value.clone()).map_err(AppError::from)?;
    Ok(Json(state.store.partial_update(Resource::Products, id, field, &value).await?))
}

// DELETE /api/products/{id}/
async fn delete_product(Path(id): Path<i64>, State(state): State<MockState>) -> Result<StatusCode, ApiError> {
    state.store.delete(Resource::Products, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/finance/transactions/bulk_delete/
async fn bulk_delete_transactions(
    State(state): State<MockState>,
    Json(body): Json<BulkDeleteRequest>,
) -> Result<StatusCode, ApiError> {
    state.record("POST finance/transactions/bulk_delete/".into(), json!({ "ids": body.ids }));
    state.store.bulk_delete(Resource::Transactions, &body.ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/finance/transactions/bulk_create/
async fn bulk_create_transactions(
    State(state): State<MockState>,
    Json(body): Json<BulkCreateTransactionsRequest>,
) -> Result<StatusCode, ApiError> {
    state.record(
        "POST finance/transactions/bulk_create/".into(),
        serde_json::to_value(&body).map_err(AppError::from)?,
    );
    state.store.bulk_create_transactions(&body).await?;
    Ok(StatusCode::CREATED)
}

#[derive(Deserialize)]
struct DashboardQuery {
    period: Period,
}

// GET /api/finance/dashboard/?period=daily|monthly
async fn dashboard(
    State(state): State<MockState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(state.store.dashboard(query.period).await?))
}

// ==================== Router ====================

pub fn routes() -> Router<MockState> {
    Router::new()
        .route("/api/products/", get(list_products).post(create_product))
        .route("/api/products/{id}/", axum::routing::patch(patch_product).delete(delete_product))
        .route("/api/finance/transactions/bulk_delete/", post(bulk_delete_transactions))
        .route("/api/finance/transactions/bulk_create/", post(bulk_create_transactions))
        .route("/api/finance/dashboard/", get(dashboard))
}

/// Serves the mock API on an ephemeral port. Returns the API root URL.
pub async fn serve(store: Arc<MemoryStore>) -> (String, MockState) {
    let state = MockState { store, received: Arc::new(Mutex::new(Vec::new())) };
    let app = routes().with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/api"), state)
}

// ==================== Fixtures ====================

pub fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert(Resource::Marketplaces, json!({ "id": 1, "name": "Trendyol" }));
    store.insert(
        Resource::Products,
        json!({ "id": 1, "sku": "MUG-1", "name": "Mug", "buying_price": "40.00", "weighted_cost": "40.00", "stock_quantity": 4 }),
    );
    store.insert(
        Resource::Products,
        json!({ "id": 2, "sku": "CUP-1", "name": "Cup", "buying_price": "5.00", "weighted_cost": "5.00", "stock_quantity": 10 }),
    );
    store
}

/// A sale of product 1, which makes that product undeletable.
pub fn sell_mug(store: &MemoryStore) -> i64 {
    store.insert(
        Resource::Transactions,
        json!({
            "transaction_date": "2025-06-10T12:00:00Z",
            "marketplace_id": 1,
            "marketplace_name": "Trendyol",
            "order_number": "ORD-1",
            "product_id": 1,
            "product_name": "Mug",
            "quantity": 1,
            "sale_price": "100.00",
            "commission_amount": "15.00",
            "shipping_cost": "0",
            "cost_at_transaction": "40.00",
            "net_profit": "45.00",
            "transaction_type": "SALE"
        }),
    )
}
