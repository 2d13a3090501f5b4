use super::EventColumns;
use crate::framework::DatabaseProcessor;
use fenceq_sdk::ValidationError;
use fenceq_sdk::event::{Event, EventId, ProcessingState, StoredEvent, UpdateInfo};
use kanau::processor::Processor;

const SELECT_COLUMNS: &str = r#"
    SELECT
        id, storage_code, event_timestamp, event_type, access_group, object_id,
        version, new_name, is_public, overwrite_existing_data, state, updated_at, updater
    FROM index_events
"#;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct IndexEventRow {
    pub id: String,
    #[sqlx(flatten)]
    pub columns: EventColumns,
    pub state: String,
    pub updated_at: Option<time::OffsetDateTime>,
    pub updater: Option<String>,
}

impl IndexEventRow {
    pub fn into_stored(self) -> Result<StoredEvent, ValidationError> {
        let id = EventId::new(&self.id)?;
        let state: ProcessingState = self.state.parse()?;
        let stored = StoredEvent::new(self.columns.into_event()?, id, state);
        Ok(match self.updated_at {
            Some(updated_at) => stored.with_update(UpdateInfo {
                updated_at,
                updater: self.updater,
            }),
            None => stored,
        })
    }
}

#[derive(Debug, Clone)]
/// Insert a new event in the `UNPROCESSED` state.
pub struct InsertIndexEvent {
    pub id: EventId,
    pub event: Event,
}

impl Processor<InsertIndexEvent> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertIndexEvent")]
    async fn process(&self, insert: InsertIndexEvent) -> Result<(), sqlx::Error> {
        let columns = EventColumns::from_event(&insert.event);
        sqlx::query(
            r#"
            INSERT INTO index_events
                (id, storage_code, event_timestamp, event_type, access_group, object_id,
                 version, new_name, is_public, overwrite_existing_data, state)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(insert.id.as_str())
        .bind(columns.storage_code)
        .bind(columns.event_timestamp)
        .bind(columns.event_type)
        .bind(columns.access_group)
        .bind(columns.object_id)
        .bind(columns.version)
        .bind(columns.new_name)
        .bind(columns.is_public)
        .bind(columns.overwrite_existing_data)
        .bind(ProcessingState::Unprocessed.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Fetch one event by id.
pub struct GetIndexEvent {
    pub id: EventId,
}

impl Processor<GetIndexEvent> for DatabaseProcessor {
    type Output = Option<IndexEventRow>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetIndexEvent")]
    async fn process(&self, query: GetIndexEvent) -> Result<Option<IndexEventRow>, sqlx::Error> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = $1");
        sqlx::query_as::<_, IndexEventRow>(&sql)
            .bind(query.id.as_str())
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// List events in any of the given states, oldest first.
pub struct ListIndexEventsByState {
    pub states: Vec<ProcessingState>,
    pub limit: i64,
}

impl Processor<ListIndexEventsByState> for DatabaseProcessor {
    type Output = Vec<IndexEventRow>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListIndexEventsByState")]
    async fn process(
        &self,
        query: ListIndexEventsByState,
    ) -> Result<Vec<IndexEventRow>, sqlx::Error> {
        if query.states.is_empty() || query.limit <= 0 {
            return Ok(Vec::new());
        }
        let states: Vec<String> = query.states.iter().map(ToString::to_string).collect();
        let sql = format!(
            "{SELECT_COLUMNS} WHERE state = ANY($1) ORDER BY event_timestamp, id LIMIT $2"
        );
        sqlx::query_as::<_, IndexEventRow>(&sql)
            .bind(states)
            .bind(query.limit)
            .fetch_all(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// Move an event from `expected` to `new`.
///
/// Returns `false` when the event does not exist or is not in `expected`.
pub struct UpdateIndexEventState {
    pub id: EventId,
    pub expected: ProcessingState,
    pub new: ProcessingState,
    pub updater: Option<String>,
    pub updated_at: time::OffsetDateTime,
}

impl Processor<UpdateIndexEventState> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpdateIndexEventState")]
    async fn process(&self, update: UpdateIndexEventState) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE index_events
            SET state = $3, updated_at = $4, updater = $5
            WHERE id = $1 AND state = $2
            "#,
        )
        .bind(update.id.as_str())
        .bind(update.expected.as_str())
        .bind(update.new.as_str())
        .bind(update.updated_at)
        .bind(update.updater)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
