use super::EventColumns;
use crate::framework::DatabaseProcessor;
use fenceq_sdk::event::{ChildEvent, EventId, ProcessingState};
use kanau::processor::Processor;

#[derive(Debug, Clone)]
/// Record the terminal outcome of a child event.
pub struct InsertChildEvent {
    pub id: EventId,
    pub child: ChildEvent,
    pub state: ProcessingState,
    pub stored_at: time::OffsetDateTime,
    pub message: Option<String>,
}

impl Processor<InsertChildEvent> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertChildEvent")]
    async fn process(&self, insert: InsertChildEvent) -> Result<(), sqlx::Error> {
        let columns = EventColumns::from_event(insert.child.event());
        sqlx::query(
            r#"
            INSERT INTO index_child_events
                (id, parent_id, storage_code, event_timestamp, event_type, access_group,
                 object_id, version, new_name, is_public, overwrite_existing_data,
                 state, stored_at, message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(insert.id.as_str())
        .bind(insert.child.parent_id().as_str())
        .bind(columns.storage_code)
        .bind(columns.event_timestamp)
        .bind(columns.event_type)
        .bind(columns.access_group)
        .bind(columns.object_id)
        .bind(columns.version)
        .bind(columns.new_name)
        .bind(columns.is_public)
        .bind(columns.overwrite_existing_data)
        .bind(insert.state.as_str())
        .bind(insert.stored_at)
        .bind(insert.message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
