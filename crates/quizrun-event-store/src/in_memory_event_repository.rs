//! In-process implementation of the `EventRepository` trait.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quizrun_core::error::DomainError;
use quizrun_core::repository::{EventRepository, StoredEvent};

/// Event repository holding every stream in memory.
///
/// Applies the same optimistic concurrency rule as the `PostgreSQL` store: an
/// append succeeds only when `expected_version` equals the sequence number of
/// the last event already in the stream.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    streams: RwLock<BTreeMap<Uuid, Vec<StoredEvent>>>,
}

impl InMemoryEventRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of events stored across all streams.
    pub async fn event_count(&self) -> usize {
        self.streams.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self
            .streams
            .read()
            .await
            .get(&aggregate_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_events(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut streams = self.streams.write().await;
        let stream = streams.entry(aggregate_id).or_default();
        let actual = stream.last().map_or(0, |e| e.sequence_number);
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }
        stream.extend_from_slice(events);
        Ok(())
    }

    async fn list_aggregate_ids(&self) -> Result<Vec<Uuid>, DomainError> {
        Ok(self
            .streams
            .read()
            .await
            .iter()
            .filter(|(_, events)| !events.is_empty())
            .map(|(id, _)| *id)
            .collect())
    }
}
