// src/api/http.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use super::{RemoteStore, Resource};
use crate::dtos::dashboard::{DashboardStats, Period};
use crate::dtos::transaction::{BulkCreateTransactionsRequest, BulkDeleteRequest};
use crate::error::AppError;
use crate::models::FieldValue;

const UA: &str = concat!("retail-ledger/", env!("CARGO_PKG_VERSION"));

/// REST client for the finance API.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
}

impl HttpStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(UA)
            .build()?;
        let mut base_url = base_url.trim_end_matches('/').to_string();
        base_url.push('/');
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, resource: Resource) -> String {
        format!("{}{}", self.base_url, resource.path())
    }

    fn item_url(&self, resource: Resource, id: i64) -> String {
        format!("{}{}{}/", self.base_url, resource.path(), id)
    }

    fn action_url(&self, resource: Resource, action: &str) -> String {
        format!("{}{}{}/", self.base_url, resource.path(), action)
    }
}

/// Turns a non-success response into the matching error kind.
async fn check(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);
    warn!(%status, %message, "Remote store rejected request");

    Err(match status {
        StatusCode::NOT_FOUND => AppError::not_found(message),
        StatusCode::CONFLICT => AppError::conflict(message),
        _ if mentions_protected_reference(&body) => AppError::conflict(message),
        StatusCode::BAD_REQUEST => AppError::validation(message),
        _ => AppError::remote(status, message),
    })
}

// Referential-integrity refusals from the API do not always come back as 409
fn mentions_protected_reference(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("protected") || lower.contains("referenced")
}

/// `detail` or `error` when the API sends one, otherwise every field error
/// as `FIELD: message` lines, otherwise the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(obj)) => {
            for key in ["detail", "error"] {
                if let Some(Value::String(msg)) = obj.get(key) {
                    return msg.clone();
                }
            }
            field_errors(&obj)
        }
        _ if body.trim().is_empty() => "no response body".to_string(),
        _ => body.trim().to_string(),
    }
}

fn field_errors(obj: &Map<String, Value>) -> String {
    obj.iter()
        .map(|(field, errors)| {
            let text = match errors {
                Value::Array(items) => items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                    .collect::<Vec<_>>()
                    .join(", "),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}: {}", field.to_uppercase(), text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl RemoteStore for HttpStore {
    #[instrument(skip(self), fields(resource = resource.path()))]
    async fn fetch_all(&self, resource: Resource) -> Result<Vec<Value>, AppError> {
        let response = self.client.get(self.collection_url(resource)).send().await?;
        let rows: Vec<Value> = check(response).await?.json().await?;
        debug!(count = rows.len(), "Fetched collection");
        Ok(rows)
    }

    #[instrument(skip(self, value), fields(resource = resource.path()))]
    async fn partial_update(
        &self,
        resource: Resource,
        id: i64,
        field: &str,
        value: &FieldValue,
    ) -> Result<Value, AppError> {
        let mut body = Map::new();
        body.insert(field.to_string(), value.to_json());

        let response = self
            .client
            .patch(self.item_url(resource, id))
            .json(&Value::Object(body))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    #[instrument(skip(self, record), fields(resource = resource.path()))]
    async fn create(&self, resource: Resource, record: Value) -> Result<Value, AppError> {
        let response = self
            .client
            .post(self.collection_url(resource))
            .json(&record)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    #[instrument(skip(self, record), fields(resource = resource.path()))]
    async fn update(&self, resource: Resource, id: i64, record: Value) -> Result<Value, AppError> {
        let response = self
            .client
            .put(self.item_url(resource, id))
            .json(&record)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    #[instrument(skip(self), fields(resource = resource.path()))]
    async fn delete(&self, resource: Resource, id: i64) -> Result<(), AppError> {
        let response = self.client.delete(self.item_url(resource, id)).send().await?;
        check(response).await?;
        Ok(())
    }

    #[instrument(skip(self, ids), fields(resource = resource.path(), count = ids.len()))]
    async fn bulk_delete(&self, resource: Resource, ids: &[i64]) -> Result<(), AppError> {
        let body = BulkDeleteRequest { ids: ids.to_vec() };
        let response = self
            .client
            .post(self.action_url(resource, "bulk_delete"))
            .json(&body)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    #[instrument(skip(self, batch), fields(order = %batch.common.order_number, items = batch.items.len()))]
    async fn bulk_create_transactions(&self, batch: &BulkCreateTransactionsRequest) -> Result<(), AppError> {
        let response = self
            .client
            .post(self.action_url(Resource::Transactions, "bulk_create"))
            .json(batch)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn dashboard(&self, period: Period) -> Result<DashboardStats, AppError> {
        let response = self
            .client
            .get(format!("{}finance/dashboard/", self.base_url))
            .query(&[("period", period.as_query())])
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }
}
