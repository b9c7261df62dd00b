use sqlx::PgPool;

/// Postgres-backed store. Every entity query is a `Processor` impl on this type.
#[derive(Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

impl DatabaseProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
