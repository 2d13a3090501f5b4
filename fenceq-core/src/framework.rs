use sqlx::PgPool;

/// Executes the database queries defined in [`crate::entities`].
#[derive(Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}
