// src/main.rs
use std::sync::Arc;

use dotenvy::dotenv;
use retail_ledger::api::{HttpStore, RemoteStore};
use retail_ledger::display::{format_money, format_signed};
use retail_ledger::editing::LogNotifier;
use retail_ledger::views::{ExpensesView, LiveDashboard, LoadState, ProductsView};
use retail_ledger::Config;
use tracing_subscriber::fmt::init as tracing_init;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_init();

    // Load environment variables
    dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return;
        }
    };

    let http = match HttpStore::new(&config.api_url, config.http_timeout) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client");
            return;
        }
    };
    tracing::info!(api = %http.base_url(), "Finance API");
    let store: Arc<dyn RemoteStore> = Arc::new(http);
    let notifier = Arc::new(LogNotifier);

    let mut products = ProductsView::new(Arc::clone(&store), notifier.clone()).configured(&config);
    if products.load().await == LoadState::Ready {
        for row in products.visible() {
            tracing::info!(
                sku = %products.cell_text(row.id, "sku").unwrap_or_default(),
                name = %products.cell_text(row.id, "name").unwrap_or_default(),
                buying_price = %products.cell_text(row.id, "buying_price").unwrap_or_default(),
                "Product"
            );
        }
    }

    let mut expenses = ExpensesView::new(Arc::clone(&store), notifier).configured(&config);
    if expenses.load().await == LoadState::Ready {
        tracing::info!(
            count = expenses.table().len(),
            total = %format_money(expenses.visible_total()),
            "Expenses"
        );
    }

    let live = LiveDashboard::spawn(store, config.dashboard_period, config.dashboard_refresh);
    let mut updates = live.subscribe();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let latest = updates.borrow_and_update().clone();
                if let Some(stats) = latest {
                    tracing::info!(
                        period = %live.period(),
                        sales = %format_money(stats.total_sales),
                        gross = %format_signed(stats.gross_profit),
                        expenses = %format_money(stats.total_expenses),
                        net = %format_signed(stats.net_profit),
                        recent = stats.recent_transactions.len(),
                        "Dashboard"
                    );
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    // a panicked refresh loop is logged by stop
    live.stop().await.ok();
}
