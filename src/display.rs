// src/display.rs
//! Rendered projections of stored values. None of these functions change the
//! value they are given.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::metrics::{round_money, Metrics};
use crate::models::{FieldValue, TransactionType};

pub const ELLIPSIS: char = '…';

/// Characters a text cell shows before it is cut.
pub const DEFAULT_TEXT_LIMIT: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Text,
    Number,
}

pub fn format_money(amount: Decimal) -> String {
    format!("{:.2}", round_money(amount))
}

/// Two fixed digits; anything that does not read as a number renders as
/// `0.00`.
pub fn format_number(value: &FieldValue) -> String {
    value
        .as_number()
        .and_then(Decimal::from_f64)
        .map(format_money)
        .unwrap_or_else(|| "0.00".to_string())
}

/// Commission and shipping carry their direction only here.
pub fn format_deduction(amount: Decimal, kind: TransactionType) -> String {
    let signed = if kind.deduction_sign() < 0 { -amount.abs() } else { amount.abs() };
    format_signed(signed)
}

pub fn format_signed(amount: Decimal) -> String {
    if amount.is_sign_negative() && !amount.is_zero() {
        format!("-{}", format_money(amount.abs()))
    } else {
        format!("+{}", format_money(amount))
    }
}

pub fn format_percent(pct: Decimal) -> String {
    let rounded = pct.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.1}%")
}

pub fn format_margin(metrics: &Metrics) -> String {
    format_percent(metrics.margin_for_display())
}

pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push(ELLIPSIS);
    out
}

pub fn render_cell(value: &FieldValue, kind: CellKind, limit: usize) -> String {
    match kind {
        CellKind::Number => format_number(value),
        CellKind::Text => truncate(&value.to_string(), limit),
    }
}
