// src/sorting.rs
use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::metrics::compute_metrics;
use crate::models::{EditableRecord, ExpenseCategory, FieldValue, Transaction};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortConfig<K> {
    pub key: Option<K>,
    pub direction: SortDirection,
}

impl<K> Default for SortConfig<K> {
    fn default() -> Self {
        Self { key: None, direction: SortDirection::Asc }
    }
}

impl<K: Copy + PartialEq> SortConfig<K> {
    pub fn by(key: K, direction: SortDirection) -> Self {
        Self { key: Some(key), direction }
    }

    /// Clicking a column header: the same ascending column flips to
    /// descending, anything else starts ascending.
    pub fn toggle(&mut self, key: K) {
        self.direction = if self.key == Some(key) && self.direction == SortDirection::Asc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        self.key = Some(key);
    }

    fn apply(&self, ord: Ordering) -> Ordering {
        match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

fn lower(s: Option<&str>) -> String {
    s.unwrap_or_default().to_lowercase()
}

// ==================== Transactions ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionSortKey {
    TransactionDate,
    OrderNumber,
    ProductName,
    MarketplaceName,
    SalePrice,
    CommissionAmount,
    CommissionRate,
    ShippingCost,
    NetProfit,
    ProfitMargin,
}

enum SortValue {
    Time(DateTime<Utc>),
    Number(Decimal),
    Text(String),
}

impl SortValue {
    fn compare(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Time(a), SortValue::Time(b)) => a.cmp(b),
            (SortValue::Number(a), SortValue::Number(b)) => a.cmp(b),
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            // keys never mix kinds
            _ => Ordering::Equal,
        }
    }
}

fn transaction_value(tx: &Transaction, key: TransactionSortKey) -> SortValue {
    use TransactionSortKey::*;
    match key {
        TransactionDate => SortValue::Time(tx.transaction_date),
        OrderNumber => SortValue::Text(tx.order_number.to_lowercase()),
        ProductName => SortValue::Text(lower(tx.product_name.as_deref())),
        MarketplaceName => SortValue::Text(lower(tx.marketplace_name.as_deref())),
        SalePrice => SortValue::Number(tx.sale_price),
        CommissionAmount => SortValue::Number(tx.commission_amount),
        CommissionRate => SortValue::Number(compute_metrics(tx).commission_rate),
        ShippingCost => SortValue::Number(tx.shipping_cost),
        NetProfit => SortValue::Number(tx.net_profit),
        ProfitMargin => SortValue::Number(compute_metrics(tx).profit_margin),
    }
}

/// Stable sort; rows that compare equal keep their fetched order.
pub fn sort_transactions(rows: &mut [Transaction], config: &SortConfig<TransactionSortKey>) {
    let Some(key) = config.key else { return };
    rows.sort_by(|a, b| config.apply(transaction_value(a, key).compare(&transaction_value(b, key))));
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub search: String,
    pub marketplace_id: Option<i64>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        let needle = self.search.to_lowercase();
        let matches_search = tx.order_number.to_lowercase().contains(&needle)
            || tx
                .product_name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(&needle));
        let matches_marketplace = self.marketplace_id.map_or(true, |id| tx.marketplace_id == id);

        matches_search && matches_marketplace
    }
}

// ==================== Editable rows (products, expenses) ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSortKey {
    Sku,
    Name,
    BuyingPrice,
    WeightedCost,
    StockQuantity,
}

impl ProductSortKey {
    pub fn field(self) -> &'static str {
        match self {
            ProductSortKey::Sku => "sku",
            ProductSortKey::Name => "name",
            ProductSortKey::BuyingPrice => "buying_price",
            ProductSortKey::WeightedCost => "weighted_cost",
            ProductSortKey::StockQuantity => "stock_quantity",
        }
    }

    fn numeric(self) -> bool {
        matches!(
            self,
            ProductSortKey::BuyingPrice | ProductSortKey::WeightedCost | ProductSortKey::StockQuantity
        )
    }
}

fn record_text(record: &EditableRecord, field: &str) -> String {
    record.get(field).map(|v| v.to_string().to_lowercase()).unwrap_or_default()
}

// Values that are not numbers sort after every number, whichever the direction
fn compare_numbers(a: Option<f64>, b: Option<f64>, config: &SortConfig<ProductSortKey>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => config.apply(a.total_cmp(&b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn sort_products(rows: &mut [EditableRecord], config: &SortConfig<ProductSortKey>) {
    let Some(key) = config.key else { return };
    let field = key.field();
    rows.sort_by(|a, b| {
        if key.numeric() {
            compare_numbers(
                a.get(field).and_then(FieldValue::as_number),
                b.get(field).and_then(FieldValue::as_number),
                config,
            )
        } else {
            config.apply(record_text(a, field).cmp(&record_text(b, field)))
        }
    });
}

pub fn product_matches(product: &EditableRecord, search: &str) -> bool {
    let needle = search.to_lowercase();
    record_text(product, "name").contains(&needle) || record_text(product, "sku").contains(&needle)
}

pub fn expense_matches(expense: &EditableRecord, search: &str) -> bool {
    let needle = search.to_lowercase();
    expense_category_label(expense).to_lowercase().contains(&needle)
        || record_text(expense, "description").contains(&needle)
}

/// Server label when present, otherwise the local name of the category code.
pub fn expense_category_label(expense: &EditableRecord) -> String {
    if let Some(FieldValue::Text(label)) = expense.get("category_display") {
        return label.clone();
    }
    match expense.get("category") {
        Some(FieldValue::Text(code)) => serde_json::from_value::<ExpenseCategory>(code.as_str().into())
            .map(|c| c.display_name().to_string())
            .unwrap_or_else(|_| code.clone()),
        _ => String::new(),
    }
}
