// src/views/finance.rs
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};

use super::{ActionOutcome, LoadState};
use crate::api::{fetch_typed, RemoteStore, Resource};
use crate::dtos::transaction::BulkCreateTransactionsRequest;
use crate::editing::{Notice, Notifier};
use crate::error::AppError;
use crate::metrics::{compute_metrics, round_money, Metrics};
use crate::models::{Marketplace, Product, Transaction};
use crate::sorting::{sort_transactions, SortConfig, SortDirection, TransactionFilter, TransactionSortKey};

// Sale price the order form proposes for a freshly picked product
const SUGGESTED_MARKUP: Decimal = Decimal::from_parts(15, 0, 0, false, 1);

pub struct FinanceView {
    store: Arc<dyn RemoteStore>,
    notifier: Arc<dyn Notifier>,
    transactions: Vec<Transaction>,
    marketplaces: Vec<Marketplace>,
    products: Vec<Product>,
    selected: Vec<i64>,
    state: LoadState,
    pub filter: TransactionFilter,
    pub sort: SortConfig<TransactionSortKey>,
}

impl FinanceView {
    pub fn new(store: Arc<dyn RemoteStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            transactions: Vec::new(),
            marketplaces: Vec::new(),
            products: Vec::new(),
            selected: Vec::new(),
            state: LoadState::Loading,
            filter: TransactionFilter::default(),
            sort: SortConfig { key: None, direction: SortDirection::Desc },
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Options for the marketplace filter.
    pub fn marketplaces(&self) -> &[Marketplace] {
        &self.marketplaces
    }

    // GET /finance/transactions/ + GET /integrations/list/
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> LoadState {
        let store = self.store.as_ref();
        let (transactions, marketplaces) = tokio::join!(
            fetch_typed::<Transaction, _>(store, Resource::Transactions),
            fetch_typed::<Marketplace, _>(store, Resource::Marketplaces),
        );

        match (transactions, marketplaces) {
            (Ok(transactions), Ok(marketplaces)) => {
                info!(count = transactions.len(), "Loaded transactions");
                self.transactions = transactions;
                self.marketplaces = marketplaces;
                self.selected.clear();
                self.state = LoadState::Ready;
            }
            (Err(e), _) | (_, Err(e)) => error!(?e, "Failed to fetch finance data"),
        }
        self.state
    }

    /// Products for the order form. The page itself does not need them.
    #[instrument(skip(self))]
    pub async fn load_form_options(&mut self) -> Result<&[Product], AppError> {
        self.products = fetch_typed(self.store.as_ref(), Resource::Products).await?;
        Ok(&self.products)
    }

    /// Half again the product's buying price; `None` for unknown products.
    pub fn suggested_sale_price(&self, product_id: i64) -> Option<Decimal> {
        self.products
            .iter()
            .find(|p| p.id == product_id)
            .map(|p| round_money(p.buying_price * SUGGESTED_MARKUP))
    }

    // ==================== Table ====================

    pub fn sort_by(&mut self, key: TransactionSortKey) {
        self.sort.toggle(key);
    }

    pub fn visible(&self) -> Vec<Transaction> {
        let mut rows: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|tx| self.filter.matches(tx))
            .cloned()
            .collect();
        sort_transactions(&mut rows, &self.sort);
        rows
    }

    /// Visible rows with their derived columns.
    pub fn rows(&self) -> Vec<(Transaction, Metrics)> {
        self.visible()
            .into_iter()
            .map(|tx| {
                let metrics = compute_metrics(&tx);
                (tx, metrics)
            })
            .collect()
    }

    // ==================== Selection ====================

    pub fn selected(&self) -> &[i64] {
        &self.selected
    }

    pub fn is_selected(&self, id: i64) -> bool {
        self.selected.contains(&id)
    }

    pub fn toggle(&mut self, id: i64) {
        if let Some(pos) = self.selected.iter().position(|s| *s == id) {
            self.selected.remove(pos);
        } else {
            self.selected.push(id);
        }
    }

    /// Selects exactly the rows the current filter shows.
    pub fn select_all_visible(&mut self) {
        self.selected = self.visible().iter().map(|tx| tx.id).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    // ==================== Actions ====================

    // DELETE /finance/transactions/{id}/
    #[instrument(skip(self))]
    pub async fn delete(&mut self, id: i64) -> ActionOutcome {
        match self.store.delete(Resource::Transactions, id).await {
            Ok(()) => {
                self.transactions.retain(|tx| tx.id != id);
                self.selected.retain(|s| *s != id);
                self.notifier.notify(Notice::Deleted(1));
                ActionOutcome::Done
            }
            Err(e) => {
                error!(?e, "Failed to delete transaction");
                self.notifier.notify(Notice::DeleteFailed);
                ActionOutcome::Failed
            }
        }
    }

    // POST /finance/transactions/bulk_delete/
    #[instrument(skip(self), fields(count = self.selected.len()))]
    pub async fn bulk_delete(&mut self) -> ActionOutcome {
        if self.selected.is_empty() {
            return ActionOutcome::Skipped;
        }
        match self.store.bulk_delete(Resource::Transactions, &self.selected).await {
            Ok(()) => {
                let removed = std::mem::take(&mut self.selected);
                self.transactions.retain(|tx| !removed.contains(&tx.id));
                info!(count = removed.len(), "Transactions deleted");
                self.notifier.notify(Notice::Deleted(removed.len()));
                ActionOutcome::Done
            }
            Err(e) => {
                warn!(error = %e, "Bulk delete failed");
                self.notifier.notify(Notice::DeleteFailed);
                ActionOutcome::Failed
            }
        }
    }

    // POST /finance/transactions/bulk_create/
    #[instrument(skip(self, batch), fields(order = %batch.common.order_number))]
    pub async fn create(&mut self, batch: BulkCreateTransactionsRequest) -> ActionOutcome {
        if let Err(e) = batch.validate() {
            self.notifier.notify(Notice::ValidationFailed(e.to_string()));
            return ActionOutcome::Invalid;
        }
        match self.store.bulk_create_transactions(&batch).await {
            Ok(()) => {
                self.notifier.notify(Notice::Created { label: "transaction" });
                self.load().await;
                ActionOutcome::Done
            }
            Err(e) => {
                error!(?e, "Failed to create transactions");
                self.notifier.notify(Notice::CreateFailed(e.to_string()));
                ActionOutcome::Failed
            }
        }
    }
}
