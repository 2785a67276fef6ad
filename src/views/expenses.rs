// src/views/expenses.rs
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{error, instrument};

use super::{load_records, ActionOutcome, LoadState};
use crate::api::{RemoteStore, Resource};
use crate::config::Config;
use crate::display::{render_cell, CellKind, DEFAULT_TEXT_LIMIT};
use crate::dtos::expense::CreateExpenseRequest;
use crate::editing::{EditOutcome, EditableTable, Notice, Notifier};
use crate::error::AppError;
use crate::models::{EditableRecord, FieldValue};
use crate::sorting::expense_matches;

pub struct ExpensesView {
    store: Arc<dyn RemoteStore>,
    notifier: Arc<dyn Notifier>,
    table: EditableTable,
    state: LoadState,
    text_limit: usize,
    pub search: String,
}

fn amount_of(expense: &EditableRecord) -> Decimal {
    match expense.get("amount") {
        Some(FieldValue::Text(s)) => Decimal::from_str(s.trim()).unwrap_or_default(),
        Some(FieldValue::Number(n)) => Decimal::from_f64(*n).unwrap_or_default(),
        _ => Decimal::ZERO,
    }
}

impl ExpensesView {
    pub fn new(store: Arc<dyn RemoteStore>, notifier: Arc<dyn Notifier>) -> Self {
        let table = EditableTable::new(Resource::Expenses, Arc::clone(&store), Arc::clone(&notifier));
        Self {
            store,
            notifier,
            table,
            state: LoadState::Loading,
            text_limit: DEFAULT_TEXT_LIMIT,
            search: String::new(),
        }
    }

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

    pub fn cell_text(&self, id: i64, field: &str) -> Option<String> {
        let kind = if field == "amount" { CellKind::Number } else { CellKind::Text };
        self.table.value(id, field).map(|v| render_cell(&v, kind, self.text_limit))
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn table(&self) -> &EditableTable {
        &self.table
    }

    // GET /finance/expenses/
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> LoadState {
        match load_records(self.store.as_ref(), Resource::Expenses).await {
            Ok(records) => {
                self.table.replace_records(records);
                self.state = LoadState::Ready;
            }
            Err(e) => error!(?e, "Failed to fetch expenses"),
        }
        self.state
    }

    pub fn visible(&self) -> Vec<EditableRecord> {
        self.table
            .records()
            .into_iter()
            .filter(|e| expense_matches(e, &self.search))
            .collect()
    }

    /// Sum of the rows the search currently shows.
    pub fn visible_total(&self) -> Decimal {
        self.visible().iter().map(amount_of).sum()
    }

    // PATCH /finance/expenses/{id}/
    pub async fn apply_edit(&self, id: i64, field: &str, value: impl Into<FieldValue>) -> EditOutcome {
        self.table.apply_edit(id, field, value.into()).await
    }

    // POST /finance/expenses/
    #[instrument(skip(self, form), fields(category = ?form.category))]
    pub async fn create(&mut self, form: CreateExpenseRequest) -> ActionOutcome {
        if let Err(e) = form.validate() {
            self.notifier.notify(Notice::ValidationFailed(e.to_string()));
            return ActionOutcome::Invalid;
        }
        let result = match serde_json::to_value(&form) {
            Ok(body) => self.store.create(Resource::Expenses, body).await,
            Err(e) => Err(AppError::from(e)),
        };
        match result {
            Ok(_) => {
                self.notifier.notify(Notice::Created { label: "expense" });
                self.load().await;
                ActionOutcome::Done
            }
            Err(e) => {
                error!(?e, "Failed to create expense");
                self.notifier.notify(Notice::CreateFailed(e.to_string()));
                ActionOutcome::Failed
            }
        }
    }

    // DELETE /finance/expenses/{id}/
    #[instrument(skip(self))]
    pub async fn delete(&mut self, id: i64) -> ActionOutcome {
        match self.store.delete(Resource::Expenses, id).await {
            Ok(()) => {
                self.table.remove(id);
                self.notifier.notify(Notice::Deleted(1));
                ActionOutcome::Done
            }
            Err(e) => {
                error!(?e, "Failed to delete expense");
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
    use crate::models::ExpenseCategory;
    use chrono::NaiveDate;
    use serde_json::json;

    async fn loaded() -> (ExpensesView, Arc<MemoryStore>, Arc<RecordingNotifier>) {
        let store = Arc::new(MemoryStore::new());
        store.insert(Resource::Expenses, json!({ "id": 1, "category": "RENT", "category_display": "Rent", "description": "Shop", "amount": "1500.00", "expense_date": "2025-06-01" }));
        store.insert(Resource::Expenses, json!({ "id": 2, "category": "INTERNET", "category_display": "Internet", "description": null, "amount": "49.90", "expense_date": "2025-06-03" }));
        store.insert(Resource::Expenses, json!({ "id": 3, "category": "OTHER", "category_display": "Other", "description": "Internet cafe", "amount": 10, "expense_date": "2025-06-04" }));
        let notifier = Arc::new(RecordingNotifier::new());
        let mut view = ExpensesView::new(store.clone(), notifier.clone());
        assert_eq!(view.load().await, LoadState::Ready);
        (view, store, notifier)
    }

    #[tokio::test]
    async fn total_follows_search() {
        let (mut view, _, _) = loaded().await;
        assert_eq!(view.visible_total(), Decimal::new(155990, 2));

        view.search = "internet".into();
        assert_eq!(view.visible().len(), 2);
        assert_eq!(view.visible_total(), Decimal::new(5990, 2));
    }

    #[tokio::test]
    async fn amount_is_required() {
        let (mut view, _, notifier) = loaded().await;
        let form = CreateExpenseRequest {
            category: ExpenseCategory::Tax,
            expense_date: NaiveDate::from_ymd_opt(2025, 6, 5),
            ..Default::default()
        };

        assert_eq!(view.create(form).await, ActionOutcome::Invalid);
        assert_eq!(notifier.take(), vec![Notice::ValidationFailed("Amount is required".into())]);
    }

    #[tokio::test]
    async fn description_is_cut_at_the_configured_limit() {
        let (view, _, _) = loaded().await;
        let view = view.configured(&Config { text_truncate_limit: 8, ..Config::default() });

        assert_eq!(view.cell_text(3, "description").as_deref(), Some("Internet…"));
        assert_eq!(view.cell_text(1, "description").as_deref(), Some("Shop"));
        assert_eq!(view.cell_text(3, "amount").as_deref(), Some("10.00"));
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let (mut view, store, _) = loaded().await;
        assert_eq!(view.delete(2).await, ActionOutcome::Done);
        assert!(view.table().record(2).is_none());
        assert!(store.row(Resource::Expenses, 2).is_none());
    }
}
