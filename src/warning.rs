//! Non-fatal warnings collected during loading, layout and drawing.
//!
//! Warnings never interrupt rendering: each one is logged through `tracing`
//! when raised and kept so the caller can report them after the run.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WarningKind {
    UnknownShape,
    UnknownBlockMethod,
    UnknownSectionMethod,
    UnknownTitleMethod,
    UnknownOption,
    SectionTooTall,
    UndefinedStyle,
    StyleCycle,
    MissingImage,
    MissingWatermark,
    EmptySection,
    EmptyBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Warnings {
    items: Vec<Warning>,
}

impl Warnings {
    pub fn push(&mut self, kind: WarningKind, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(kind = ?kind, "{message}");
        self.items.push(Warning { kind, message });
    }

    pub fn extend(&mut self, other: Warnings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.items.iter()
    }

    pub fn count(&self, kind: WarningKind) -> usize {
        self.items.iter().filter(|w| w.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.items
    }
}
