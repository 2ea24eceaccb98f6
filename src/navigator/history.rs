//! Navigation history: append-only log of step transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a transition happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationReason {
    Forward,
    Back,
    Jump,
}

impl std::fmt::Display for NavigationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Forward => "forward",
            Self::Back => "back",
            Self::Jump => "jump",
        };
        write!(f, "{s}")
    }
}

/// A single recorded transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationHistoryEntry {
    pub from: usize,
    pub to: usize,
    pub timestamp: DateTime<Utc>,
    pub reason: NavigationReason,
}

/// Transition log, capped at `max_entries` (oldest dropped first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationHistory {
    entries: Vec<NavigationHistoryEntry>,
    max_entries: usize,
}

impl NavigationHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Rebuild from stored entries, keeping only the newest `max_entries`.
    pub fn from_entries(entries: Vec<NavigationHistoryEntry>, max_entries: usize) -> Self {
        let mut history = Self {
            entries,
            max_entries: max_entries.max(1),
        };
        history.truncate();
        history
    }

    /// Append a transition and return a copy of it.
    pub fn record(
        &mut self,
        from: usize,
        to: usize,
        reason: NavigationReason,
    ) -> NavigationHistoryEntry {
        let entry = NavigationHistoryEntry {
            from,
            to,
            timestamp: Utc::now(),
            reason,
        };
        self.entries.push(entry.clone());
        self.truncate();
        entry
    }

    fn truncate(&mut self) {
        if self.entries.len() > self.max_entries {
            let drain_count = self.entries.len() - self.max_entries;
            self.entries.drain(..drain_count);
        }
    }

    /// Most recent forward-moving transition that entered `index`.
    ///
    /// Back transitions are ignored, as are jumps to an earlier step: following
    /// either would send "previous" forward again.
    pub fn last_entry_into(&self, index: usize) -> Option<&NavigationHistoryEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.to == index && e.from < e.to && e.reason != NavigationReason::Back)
    }

    pub fn count(&self, reason: NavigationReason) -> usize {
        self.entries.iter().filter(|e| e.reason == reason).count()
    }

    pub fn entries(&self) -> &[NavigationHistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
