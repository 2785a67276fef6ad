// src/editing/cell.rs
use crate::models::FieldValue;

/// One field of one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellKey {
    pub id: i64,
    pub field: String,
}

impl CellKey {
    pub fn new(id: i64, field: &str) -> Self {
        Self { id, field: field.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
enum CellState {
    #[default]
    Viewing,
    Editing { original: FieldValue, draft: FieldValue },
}

/// Viewing/Editing state of a single cell.
///
/// Leaving edit mode by blur or confirm commits the draft, cancel throws it
/// away. A commit only produces a value when the draft differs from the
/// value the edit started from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditableCell {
    state: CellState,
}

impl EditableCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, CellState::Editing { .. })
    }

    pub fn draft(&self) -> Option<&FieldValue> {
        match &self.state {
            CellState::Editing { draft, .. } => Some(draft),
            CellState::Viewing => None,
        }
    }

    /// Enter edit mode with the draft seeded from `current`. A cell that is
    /// already editing keeps its draft.
    pub fn activate(&mut self, current: &FieldValue) {
        if self.is_editing() {
            return;
        }
        self.state = CellState::Editing {
            original: current.clone(),
            draft: current.clone(),
        };
    }

    pub fn input(&mut self, value: FieldValue) {
        if let CellState::Editing { draft, .. } = &mut self.state {
            *draft = value;
        }
    }

    pub fn blur(&mut self) -> Option<FieldValue> {
        self.commit()
    }

    pub fn confirm(&mut self) -> Option<FieldValue> {
        self.commit()
    }

    pub fn cancel(&mut self) {
        self.state = CellState::Viewing;
    }

    fn commit(&mut self) -> Option<FieldValue> {
        match std::mem::take(&mut self.state) {
            CellState::Editing { original, draft } if !draft.loosely_eq(&original) => Some(draft),
            _ => None,
        }
    }
}
