// src/metrics.rs
//! Derived figures for transactions and the profit/loss dashboard.
//!
//! Nothing here is stored. Every value is recomputed from the raw fields of
//! a transaction, so the functions are pure and cheap enough to run inside a
//! sort comparator.

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::dtos::dashboard::{ChartPoint, DashboardStats, NameRef, Period, RecentTransaction};
use crate::models::{Expense, Transaction};

/// Margin reported for rows with no sale price. Lower than any real margin,
/// so those rows sink to the bottom of a descending sort (and rise to the
/// top of an ascending one).
pub const PROFIT_MARGIN_SENTINEL: Decimal = Decimal::MIN;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub commission_rate: Decimal,
    pub profit_margin: Decimal,
    pub net_profit: Decimal,
    pub total_cost: Decimal,
}

impl Metrics {
    pub fn has_margin(&self) -> bool {
        self.profit_margin != PROFIT_MARGIN_SENTINEL
    }

    // Zero-price rows show a 0 margin in tables
    pub fn margin_for_display(&self) -> Decimal {
        if self.has_margin() {
            self.profit_margin
        } else {
            Decimal::ZERO
        }
    }
}

pub fn compute_metrics(tx: &Transaction) -> Metrics {
    let total_cost = tx.total_cost();
    let priced = tx.sale_price > Decimal::ZERO;

    let commission_rate = if priced {
        percent_of(tx.commission_amount, tx.sale_price).unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };
    let profit_margin = if priced {
        percent_of(tx.net_profit, tx.sale_price).unwrap_or(PROFIT_MARGIN_SENTINEL)
    } else {
        PROFIT_MARGIN_SENTINEL
    };

    Metrics {
        commission_rate,
        profit_margin,
        net_profit: tx.net_profit,
        total_cost,
    }
}

fn percent_of(part: Decimal, whole: Decimal) -> Option<Decimal> {
    part.checked_div(whole)?.checked_mul(HUNDRED)
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// ==================== Dashboard aggregates ====================

/// Sales, gross profit, expenses and net profit over everything loaded.
/// Only SALE rows contribute to sales and gross profit.
pub fn summarize(transactions: &[Transaction], expenses: &[Expense]) -> DashboardStats {
    let sales = transactions.iter().filter(|t| t.is_sale());

    let total_sales = saturating_sum(sales.clone().map(|t| t.sale_price));
    let gross_profit = saturating_sum(sales.map(Transaction::gross_profit));
    let total_expenses = expense_total(expenses);

    DashboardStats {
        total_sales,
        gross_profit,
        total_expenses,
        net_profit: gross_profit.saturating_sub(total_expenses),
        chart_data: Vec::new(),
        recent_transactions: Vec::new(),
    }
}

pub fn expense_total(expenses: &[Expense]) -> Decimal {
    saturating_sum(expenses.iter().map(|e| e.amount))
}

fn saturating_sum(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Gross profit per bucket: the last 30 days, or the last 12 months,
/// oldest first and ending with the bucket that contains `today`.
pub fn profit_series(transactions: &[Transaction], period: Period, today: NaiveDate) -> Vec<ChartPoint> {
    match period {
        Period::Daily => (0..30)
            .rev()
            .map(|back| {
                let day = today - Duration::days(back);
                let profit = bucket_profit(transactions, |d| d == day);
                ChartPoint { date: day.format("%d/%m").to_string(), profit }
            })
            .collect(),
        Period::Monthly => (0..12)
            .rev()
            .map(|back| {
                let (year, month) = months_back(today, back);
                let profit = bucket_profit(transactions, |d| d.year() == year && d.month() == month);
                ChartPoint { date: format!("{month}/{year}"), profit }
            })
            .collect(),
    }
}

fn bucket_profit(transactions: &[Transaction], in_bucket: impl Fn(NaiveDate) -> bool) -> Decimal {
    let total = saturating_sum(
        transactions
            .iter()
            .filter(|t| t.is_sale() && in_bucket(t.transaction_date.date_naive()))
            .map(Transaction::gross_profit),
    );
    round_money(total)
}

fn months_back(today: NaiveDate, back: u32) -> (i32, u32) {
    let index = today.year() * 12 + today.month0() as i32 - back as i32;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// Newest `limit` transactions by date, ties broken by id.
pub fn recent(transactions: &[Transaction], limit: usize) -> Vec<RecentTransaction> {
    let mut sorted: Vec<&Transaction> = transactions.iter().collect();
    sorted.sort_by(|a, b| {
        b.transaction_date
            .cmp(&a.transaction_date)
            .then_with(|| b.id.cmp(&a.id))
    });

    sorted
        .into_iter()
        .take(limit)
        .map(|t| RecentTransaction {
            id: t.id,
            transaction_type: t.transaction_type,
            transaction_date: t.transaction_date,
            sale_price: t.sale_price,
            product_details: NameRef {
                name: t.product_name.clone().unwrap_or_else(|| "Deleted product".to_string()),
            },
            marketplace_details: NameRef {
                name: t.marketplace_name.clone().unwrap_or_else(|| "-".to_string()),
            },
        })
        .collect()
}

/// Full dashboard payload, as the REST API would return it.
pub fn dashboard_stats(
    transactions: &[Transaction],
    expenses: &[Expense],
    period: Period,
    today: NaiveDate,
) -> DashboardStats {
    DashboardStats {
        chart_data: profit_series(transactions, period, today),
        recent_transactions: recent(transactions, 5),
        ..summarize(transactions, expenses)
    }
}
