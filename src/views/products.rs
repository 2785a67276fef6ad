// src/views/products.rs
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument, warn};

use super::{load_records, ActionOutcome, LoadState};
use crate::api::{RemoteStore, Resource};
use crate::config::Config;
use crate::display::{render_cell, CellKind, DEFAULT_TEXT_LIMIT};
use crate::dtos::product::{CreateProductRequest, UpdateProductRequest};
use crate::editing::{EditOutcome, EditableTable, Notice, Notifier};
use crate::error::AppError;
use crate::models::{EditableRecord, FieldValue};
use crate::sorting::{product_matches, sort_products, ProductSortKey, SortConfig};

pub struct ProductsView {
    store: Arc<dyn RemoteStore>,
    notifier: Arc<dyn Notifier>,
    table: EditableTable,
    state: LoadState,
    text_limit: usize,
    pub search: String,
    pub sort: SortConfig<ProductSortKey>,
}

impl ProductsView {
    pub fn new(store: Arc<dyn RemoteStore>, notifier: Arc<dyn Notifier>) -> Self {
        let table = EditableTable::new(Resource::Products, Arc::clone(&store), Arc::clone(&notifier));
        Self {
            store,
            notifier,
            table,
            state: LoadState::Loading,
            text_limit: DEFAULT_TEXT_LIMIT,
            search: String::new(),
            sort: SortConfig::default(),
        }
    }

    /// Applies the saved-flag duration and text cell limit from `config`.
    pub fn configured(self, config: &Config) -> Self {
        self.with_saved_flag(config.saved_flag)
            .with_text_limit(config.text_truncate_limit)
    }

    pub fn with_saved_flag(mut self, duration: Duration) -> Self {
        self.table = self.table.with_saved_flag(duration);
        self
    }

    pub fn with_text_limit(mut self, limit: usize) -> Self {
        self.text_limit = limit;
        self
    }

    /// A cell as the table shows it.
    pub fn cell_text(&self, id: i64, field: &str) -> Option<String> {
        let kind = match field {
            "buying_price" | "weighted_cost" => CellKind::Number,
            _ => CellKind::Text,
        };
        self.table.value(id, field).map(|v| render_cell(&v, kind, self.text_limit))
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// The inline-edit table behind the page.
    pub fn table(&self) -> &EditableTable {
        &self.table
    }

    // GET /products/
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> LoadState {
        match load_records(self.store.as_ref(), Resource::Products).await {
            Ok(records) => {
                self.table.replace_records(records);
                self.state = LoadState::Ready;
            }
            Err(e) => error!(?e, "Failed to fetch products"),
        }
        self.state
    }

    /// Rows matching the search box, in the chosen column order.
    pub fn visible(&self) -> Vec<EditableRecord> {
        let mut rows: Vec<EditableRecord> = self
            .table
            .records()
            .into_iter()
            .filter(|p| product_matches(p, &self.search))
            .collect();
        sort_products(&mut rows, &self.sort);
        rows
    }

    pub fn sort_by(&mut self, key: ProductSortKey) {
        self.sort.toggle(key);
    }

    // PATCH /products/{id}/
    pub async fn apply_edit(&self, id: i64, field: &str, value: impl Into<FieldValue>) -> EditOutcome {
        self.table.apply_edit(id, field, value.into()).await
    }

    // POST /products/
    #[instrument(skip(self, form), fields(sku = %form.sku))]
    pub async fn create(&mut self, form: CreateProductRequest) -> ActionOutcome {
        if let Err(e) = form.validate() {
            self.notifier.notify(Notice::ValidationFailed(e.to_string()));
            return ActionOutcome::Invalid;
        }
        let result = match serde_json::to_value(&form) {
            Ok(body) => self.store.create(Resource::Products, body).await,
            Err(e) => Err(AppError::from(e)),
        };
        self.after_save(result, Notice::Created { label: "product" }).await
    }

    // PUT /products/{id}/ - modal edit, every field at once
    #[instrument(skip(self, form))]
    pub async fn replace(&mut self, id: i64, form: UpdateProductRequest) -> ActionOutcome {
        if let Err(e) = form.validate() {
            self.notifier.notify(Notice::ValidationFailed(e.to_string()));
            return ActionOutcome::Invalid;
        }
        let result = match serde_json::to_value(&form) {
            Ok(body) => self.store.update(Resource::Products, id, body).await,
            Err(e) => Err(AppError::from(e)),
        };
        self.after_save(result, Notice::Updated { label: "product" }).await
    }

    async fn after_save(&mut self, result: Result<serde_json::Value, AppError>, done: Notice) -> ActionOutcome {
        match result {
            Ok(_) => {
                self.notifier.notify(done);
                self.load().await;
                ActionOutcome::Done
            }
            Err(e) => {
                error!(?e, "Failed to save product");
                self.notifier.notify(Notice::CreateFailed(e.to_string()));
                ActionOutcome::Failed
            }
        }
    }

    // DELETE /products/{id}/
    #[instrument(skip(self))]
    pub async fn delete(&mut self, id: i64) -> ActionOutcome {
        match self.store.delete(Resource::Products, id).await {
            Ok(()) => {
                self.table.remove(id);
                info!(id, "Product deleted");
                self.notifier.notify(Notice::Deleted(1));
                ActionOutcome::Done
            }
            Err(e) if e.is_conflict() => {
                warn!(id, error = %e, "Product is still referenced");
                self.notifier.notify(Notice::DeleteProtected { label: "product" });
                ActionOutcome::Refused
            }
            Err(e) => {
                error!(?e, "Failed to delete product");
                self.notifier.notify(Notice::DeleteFailed);
                ActionOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryStore;
    use crate::editing::RecordingNotifier;
    use rust_decimal::Decimal;
    use serde_json::json;

    async fn loaded() -> (ProductsView, Arc<MemoryStore>, Arc<RecordingNotifier>) {
        let store = Arc::new(MemoryStore::new());
        store.insert(Resource::Products, json!({ "id": 1, "sku": "MUG-1", "name": "Mug", "buying_price": "40.00", "stock_quantity": 4 }));
        store.insert(Resource::Products, json!({ "id": 2, "sku": "CUP-1", "name": "Cup", "buying_price": "5.00", "stock_quantity": 10 }));
        let notifier = Arc::new(RecordingNotifier::new());
        let mut view = ProductsView::new(store.clone(), notifier.clone());
        assert_eq!(view.load().await, LoadState::Ready);
        (view, store, notifier)
    }

    #[tokio::test]
    async fn search_and_sort_shape_visible_rows() {
        let (mut view, _, _) = loaded().await;
        view.sort_by(ProductSortKey::BuyingPrice);
        let ids: Vec<i64> = view.visible().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);

        view.search = "mug".into();
        let ids: Vec<i64> = view.visible().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[tokio::test]
    async fn create_without_name_sends_nothing() {
        let (mut view, store, notifier) = loaded().await;
        let form = CreateProductRequest { sku: "NEW-1".into(), ..Default::default() };

        assert_eq!(view.create(form).await, ActionOutcome::Invalid);
        assert!(store.calls().iter().all(|c| !matches!(c, crate::api::memory::StoreCall::Create(_))));
        assert_eq!(notifier.take(), vec![Notice::ValidationFailed("Product name is required".into())]);
    }

    #[tokio::test]
    async fn create_reloads_the_list() {
        let (mut view, _, _) = loaded().await;
        let form = CreateProductRequest {
            sku: "PLT-1".into(),
            name: "Plate".into(),
            buying_price: Decimal::new(1250, 2),
            stock_quantity: 3,
        };

        assert_eq!(view.create(form).await, ActionOutcome::Done);
        assert_eq!(view.table().len(), 3);
    }

    #[tokio::test]
    async fn cells_render_with_the_configured_limit() {
        let (view, _, _) = loaded().await;
        let config = Config { text_truncate_limit: 2, ..Config::default() };
        let view = view.configured(&config);

        assert_eq!(view.cell_text(1, "name").as_deref(), Some("Mu…"));
        assert_eq!(view.cell_text(2, "sku").as_deref(), Some("CU…"));
        assert_eq!(view.cell_text(1, "buying_price").as_deref(), Some("40.00"));
        assert_eq!(view.cell_text(9, "name"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn saved_flag_follows_the_config() {
        let (view, _, _) = loaded().await;
        let config = Config { saved_flag: Duration::from_millis(500), ..Config::default() };
        let view = view.configured(&config);

        assert_eq!(view.apply_edit(2, "name", "Tea Cup").await, EditOutcome::Saved);
        assert!(view.table().is_recently_saved(2));

        tokio::time::sleep(Duration::from_millis(500)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert!(!view.table().is_recently_saved(2));
    }

    #[tokio::test]
    async fn failed_fetch_stays_loading() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_fetches(true);
        let mut view = ProductsView::new(store, Arc::new(RecordingNotifier::new()));
        assert_eq!(view.load().await, LoadState::Loading);
        assert!(view.visible().is_empty());
    }
}
