//! Transition journal kept by every cursor.
//!
//! Records which state changes a cursor went through and when. The journal
//! is bounded: once it holds `limit` records the oldest are dropped.

use super::state::StateId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

/// Number of records a cursor keeps unless told otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 256;

/// Record of a single state change.
#[derive(Clone, Debug, Serialize)]
pub struct TransitionRecord {
    /// The state being left
    pub from: StateId,
    /// The state being entered
    pub to: StateId,
    /// When the change completed
    pub timestamp: DateTime<Utc>,
    /// Zero-based tick of the owning cursor in which the change happened
    pub tick: u64,
}

/// Ordered, bounded history of state changes.
#[derive(Clone, Debug, Serialize)]
pub struct StateHistory {
    transitions: VecDeque<TransitionRecord>,
    limit: usize,
}

impl Default for StateHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHistory {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// History that keeps at most `limit` records. A limit of zero keeps
    /// nothing.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            transitions: VecDeque::new(),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Append a record, evicting the oldest ones past the limit.
    pub fn record(&mut self, transition: TransitionRecord) {
        if self.limit == 0 {
            return;
        }
        while self.transitions.len() >= self.limit {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    /// States traversed: the first retained `from`, then every `to`.
    pub fn path(&self) -> Vec<StateId> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(first) = self.transitions.front() {
            path.push(first.from);
        }
        path.extend(self.transitions.iter().map(|t| t.to));
        path
    }

    /// Time between the first and last retained records.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.transitions.front()?, self.transitions.back()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.transitions.back()
    }

    pub fn transitions(&self) -> impl ExactSizeIterator<Item = &TransitionRecord> {
        self.transitions.iter()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (StateId, StateId, StateId) {
        (
            StateId::new(0, 0, "Initial"),
            StateId::new(0, 1, "Processing"),
            StateId::new(0, 2, "Complete"),
        )
    }

    fn record(from: StateId, to: StateId, tick: u64) -> TransitionRecord {
        TransitionRecord {
            from,
            to,
            timestamp: Utc::now(),
            tick,
        }
    }

    #[test]
    fn new_history_is_empty() {
        let history = StateHistory::new();
        assert!(history.is_empty());
        assert!(history.path().is_empty());
        assert!(history.duration().is_none());
        assert_eq!(history.limit(), DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn path_returns_state_sequence() {
        let (initial, processing, complete) = ids();
        let mut history = StateHistory::new();
        history.record(record(initial, processing, 0));
        history.record(record(processing, complete, 3));

        assert_eq!(history.path(), vec![initial, processing, complete]);
        assert_eq!(history.last().map(|t| t.tick), Some(3));
    }

    #[test]
    fn limit_evicts_oldest_records() {
        let (initial, processing, complete) = ids();
        let mut history = StateHistory::with_limit(2);
        history.record(record(initial, processing, 0));
        history.record(record(processing, complete, 1));
        history.record(record(complete, initial, 2));

        assert_eq!(history.len(), 2);
        assert_eq!(history.path(), vec![processing, complete, initial]);
    }

    #[test]
    fn zero_limit_keeps_nothing() {
        let (initial, processing, _) = ids();
        let mut history = StateHistory::with_limit(0);
        history.record(record(initial, processing, 0));
        assert!(history.is_empty());
    }

    #[test]
    fn duration_calculates_elapsed_time() {
        let (initial, processing, complete) = ids();
        let mut history = StateHistory::new();
        let start = Utc::now();
        history.record(TransitionRecord {
            from: initial,
            to: processing,
            timestamp: start,
            tick: 0,
        });
        history.record(TransitionRecord {
            from: processing,
            to: complete,
            timestamp: start + chrono::Duration::milliseconds(10),
            tick: 1,
        });

        assert_eq!(history.duration(), Some(Duration::from_millis(10)));
    }

    #[test]
    fn history_serializes_state_names() {
        let (initial, processing, _) = ids();
        let mut history = StateHistory::new();
        history.record(record(initial, processing, 0));

        let json = serde_json::to_value(&history).unwrap();
        assert_eq!(json["transitions"][0]["from"]["name"], "Initial");
        assert_eq!(json["transitions"][0]["to"]["name"], "Processing");
    }
}
