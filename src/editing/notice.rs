// src/editing/notice.rs
use std::sync::Mutex;

use tracing::{info, warn};

/// User-facing messages produced by view actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    UpdateFailed,
    // delete refused because other data still points at the record
    DeleteProtected { label: &'static str },
    DeleteFailed,
    Deleted(usize),
    Created { label: &'static str },
    Updated { label: &'static str },
    CreateFailed(String),
    ValidationFailed(String),
}

impl Notice {
    pub fn is_failure(&self) -> bool {
        !matches!(
            self,
            Notice::Deleted(_) | Notice::Created { .. } | Notice::Updated { .. }
        )
    }

    pub fn message(&self) -> String {
        match self {
            Notice::UpdateFailed => "Update failed!".to_string(),
            Notice::DeleteProtected { label } => format!(
                "This {label} could not be deleted. Records referenced by past transactions \
                 are kept for financial consistency."
            ),
            Notice::DeleteFailed => "Could not delete.".to_string(),
            Notice::Deleted(1) => "Record deleted.".to_string(),
            Notice::Deleted(n) => format!("{n} records deleted."),
            Notice::Created { label } => format!("New {label} saved."),
            Notice::Updated { label } => format!("The {label} was updated."),
            Notice::CreateFailed(reason) => format!("Could not save:\n{reason}"),
            Notice::ValidationFailed(reason) => reason.clone(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        if notice.is_failure() {
            warn!(?notice, "{}", notice.message());
        } else {
            info!(?notice, "{}", notice.message());
        }
    }
}

/// Keeps every notice in memory, for callers that render them later.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(|p| p.into_inner()))
    }

    pub fn snapshot(&self) -> Vec<Notice> {
        self.notices.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap_or_else(|p| p.into_inner()).push(notice);
    }
}
