// src/views/mod.rs
//! Page-level state: what each screen holds and the actions it offers.
//! Actions never return errors; they report through the notifier and hand
//! back an [`ActionOutcome`].

pub mod dashboard;
pub mod expenses;
pub mod finance;
pub mod products;

use crate::api::{RemoteStore, Resource};
use crate::error::AppError;
use crate::models::EditableRecord;

pub use dashboard::{DashboardView, LiveDashboard};
pub use expenses::ExpensesView;
pub use finance::FinanceView;
pub use products::ProductsView;

/// A view stays `Loading` until its first successful fetch. A failed fetch
/// is logged and not retried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Loading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Done,
    /// Rejected locally, no request sent.
    Invalid,
    /// The store refused because other records still depend on this one.
    Refused,
    Failed,
    /// Nothing to do (empty selection and the like).
    Skipped,
}

pub(crate) async fn load_records(
    store: &dyn RemoteStore,
    resource: Resource,
) -> Result<Vec<EditableRecord>, AppError> {
    store
        .fetch_all(resource)
        .await?
        .iter()
        .map(EditableRecord::from_json)
        .collect()
}
