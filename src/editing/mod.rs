// src/editing/mod.rs
//! Inline editing of table cells with optimistic local writes.

pub mod cell;
pub mod notice;
pub mod table;

pub use cell::{CellKey, EditableCell};
pub use notice::{LogNotifier, Notice, Notifier, RecordingNotifier};
pub use table::{EditOutcome, EditableTable};
