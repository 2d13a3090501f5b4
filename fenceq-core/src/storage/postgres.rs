use super::{EventStorage, StorageError, new_event_id};
use crate::entities::child_event::InsertChildEvent;
use crate::entities::index_event::{
    GetIndexEvent, InsertIndexEvent, ListIndexEventsByState, UpdateIndexEventState,
};
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use fenceq_sdk::event::{ChildEvent, Event, EventId, ProcessingState, StoredChildEvent, StoredEvent};
use kanau::processor::Processor;
use sqlx::PgPool;

/// Event storage backed by Postgres.
#[derive(Clone)]
pub struct PgEventStorage {
    db: DatabaseProcessor,
}

impl PgEventStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            db: DatabaseProcessor { pool },
        }
    }
}

#[async_trait]
impl EventStorage for PgEventStorage {
    async fn store(&self, event: Event) -> Result<StoredEvent, StorageError> {
        let id = new_event_id()?;
        self.db
            .process(InsertIndexEvent {
                id: id.clone(),
                event: event.clone(),
            })
            .await?;
        Ok(StoredEvent::new(event, id, ProcessingState::Unprocessed))
    }

    async fn get(&self, id: &EventId) -> Result<Option<StoredEvent>, StorageError> {
        let row = self.db.process(GetIndexEvent { id: id.clone() }).await?;
        Ok(row.map(|r| r.into_stored()).transpose()?)
    }

    async fn get_by_states(
        &self,
        states: &[ProcessingState],
        limit: usize,
    ) -> Result<Vec<StoredEvent>, StorageError> {
        let rows = self
            .db
            .process(ListIndexEventsByState {
                states: states.to_vec(),
                limit: i64::try_from(limit).unwrap_or(i64::MAX),
            })
            .await?;
        rows.into_iter()
            .map(|row| row.into_stored().map_err(StorageError::from))
            .collect()
    }

    async fn set_state(
        &self,
        id: &EventId,
        expected: ProcessingState,
        new: ProcessingState,
        updater: Option<&str>,
    ) -> Result<bool, StorageError> {
        let updated = self
            .db
            .process(UpdateIndexEventState {
                id: id.clone(),
                expected,
                new,
                updater: updater.map(str::to_string),
                updated_at: time::OffsetDateTime::now_utc(),
            })
            .await?;
        Ok(updated)
    }

    async fn store_child(
        &self,
        child: ChildEvent,
        state: ProcessingState,
        message: Option<String>,
    ) -> Result<StoredChildEvent, StorageError> {
        let stored = StoredChildEvent::new(
            child,
            new_event_id()?,
            state,
            time::OffsetDateTime::now_utc(),
            message,
        )?;
        self.db
            .process(InsertChildEvent {
                id: stored.id().clone(),
                child: stored.child().clone(),
                state,
                stored_at: stored.stored_at(),
                message: stored.message().map(str::to_string),
            })
            .await?;
        Ok(stored)
    }
}
