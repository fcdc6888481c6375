//! Extraction cursor kept per entity kind.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::rows::SourceRow;

/// Progress marker of one entity kind's extraction.
///
/// `last_batch_ids` holds every id already emitted with a timestamp equal to
/// `last_seen_timestamp`, so the next fetch can skip them at the boundary
/// without skipping rows that share the timestamp but were never emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorState {
    pub last_seen_timestamp: DateTime<Utc>,
    pub last_batch_ids: BTreeSet<Uuid>,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            last_seen_timestamp: DateTime::UNIX_EPOCH,
            last_batch_ids: BTreeSet::new(),
        }
    }
}

impl CursorState {
    pub fn new(last_seen_timestamp: DateTime<Utc>, last_batch_ids: BTreeSet<Uuid>) -> Self {
        Self {
            last_seen_timestamp,
            last_batch_ids,
        }
    }

    /// Ids to exclude at the boundary timestamp.
    pub fn exclude_ids(&self) -> Vec<Uuid> {
        self.last_batch_ids.iter().copied().collect()
    }

    /// Move the cursor past a loaded batch.
    ///
    /// The timestamp never moves backwards. When the batch ends on the
    /// current boundary timestamp the id sets are merged.
    ///
    /// Returns `true` if the cursor changed.
    pub fn advance(&mut self, rows: &[SourceRow]) -> bool {
        let Some(max_ts) = rows.iter().map(SourceRow::updated_or_created).max() else {
            return false;
        };

        if max_ts < self.last_seen_timestamp {
            return false;
        }

        let ids_at_max = rows
            .iter()
            .filter(|row| row.updated_or_created() == max_ts)
            .map(SourceRow::id);

        if max_ts == self.last_seen_timestamp {
            let before = self.last_batch_ids.len();
            self.last_batch_ids.extend(ids_at_max);
            return self.last_batch_ids.len() != before;
        }

        self.last_seen_timestamp = max_ts;
        self.last_batch_ids = ids_at_max.collect();
        true
    }
}
