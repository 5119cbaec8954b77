//! Query history management

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use uuid::Uuid;

/// Default number of entries kept
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// A single query history entry
#[derive(Clone, Debug, Serialize)]
pub struct QueryHistoryEntry {
    /// Unique identifier
    pub id: Uuid,

    /// The AQL query
    pub query: String,

    /// Number of bind variables sent with the query
    pub bind_var_count: usize,

    /// Connection configuration this was run against
    pub connection_id: Option<Uuid>,

    /// When the query was executed
    pub executed_at: DateTime<Utc>,

    /// Execution duration in milliseconds
    pub duration_ms: u64,

    /// Number of records returned
    pub record_count: Option<u64>,

    /// Error message if failed
    pub error: Option<String>,

    /// Whether the query succeeded
    pub success: bool,
}

impl QueryHistoryEntry {
    /// Create a successful history entry
    pub fn success(
        query: String,
        bind_var_count: usize,
        connection_id: Option<Uuid>,
        duration_ms: u64,
        record_count: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            query,
            bind_var_count,
            connection_id,
            executed_at: Utc::now(),
            duration_ms,
            record_count: Some(record_count),
            error: None,
            success: true,
        }
    }

    /// Create a failed history entry
    pub fn failure(
        query: String,
        bind_var_count: usize,
        connection_id: Option<Uuid>,
        duration_ms: u64,
        error: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            query,
            bind_var_count,
            connection_id,
            executed_at: Utc::now(),
            duration_ms,
            record_count: None,
            error: Some(error),
            success: false,
        }
    }
}

/// Query history manager
pub struct QueryHistory {
    /// History entries (most recent first)
    entries: VecDeque<QueryHistoryEntry>,

    /// Maximum entries to keep
    max_entries: usize,
}

impl QueryHistory {
    /// Create a new query history
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
        }
    }

    /// Add an entry to history
    pub fn add(&mut self, entry: QueryHistoryEntry) {
        tracing::debug!(
            entry_id = %entry.id,
            success = entry.success,
            duration_ms = entry.duration_ms,
            "adding query to history"
        );
        self.entries.push_front(entry);
        while self.entries.len() > self.max_entries {
            self.entries.pop_back();
        }
    }

    /// Get all entries, most recent first
    pub fn entries(&self) -> impl Iterator<Item = &QueryHistoryEntry> {
        self.entries.iter()
    }

    /// The `limit` most recent entries
    pub fn recent(&self, limit: usize) -> Vec<QueryHistoryEntry> {
        self.entries.iter().take(limit).cloned().collect()
    }

    /// Search history by query text
    pub fn search(&self, text: &str) -> impl Iterator<Item = &QueryHistoryEntry> {
        let text_lower = text.to_lowercase();
        self.entries
            .iter()
            .filter(move |e| e.query.to_lowercase().contains(&text_lower))
    }

    /// Clear all history
    pub fn clear(&mut self) {
        let count = self.entries.len();
        tracing::info!(entries_cleared = count, "clearing query history");
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }
}

impl Default for QueryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
