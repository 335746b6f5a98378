//! Append-only action log.
//!
//! Owned by the host and injected into the action evaluator, which reads
//! a short recent window for alert dedup. Entries are never mutated or
//! deleted; display layers truncate for themselves.

use chrono::{DateTime, Duration, Utc};

use crate::types::{ActionKind, ActionRecord, Asset};

#[derive(Debug, Default)]
pub struct ActionLog {
    records: Vec<ActionRecord>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Append a record. Append-only: there is no removal API.
    pub fn append(&mut self, record: ActionRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The last `count` records, oldest first.
    pub fn recent(&self, count: usize) -> &[ActionRecord] {
        let start = self.records.len().saturating_sub(count);
        &self.records[start..]
    }

    /// Whether any of the last `lookback` records is a matching action for
    /// `asset` issued within `window` before `now`. Wall-clock based, not
    /// tick based.
    pub fn contains_recent(
        &self,
        asset: Asset,
        kind: ActionKind,
        lookback: usize,
        window: Duration,
        now: DateTime<Utc>,
    ) -> bool {
        self.recent(lookback).iter().any(|r| {
            r.from_asset == asset && r.kind == kind && now - r.issued_at < window
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
