use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(30))
        .connect(database_url)
        .await
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS lost_items (
        id TEXT PRIMARY KEY,
        item_name TEXT NOT NULL,
        description TEXT,
        category TEXT NOT NULL,
        date_found TEXT NOT NULL,
        location_found TEXT NOT NULL,
        photo_url TEXT,
        finder_name TEXT,
        finder_email TEXT,
        status TEXT NOT NULL,
        data_creator TEXT NOT NULL,
        data_updater TEXT NOT NULL,
        create_time TEXT NOT NULL,
        update_time TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_lost_items_status ON lost_items (status)",
    r#"
    CREATE TABLE IF NOT EXISTS claims (
        id TEXT PRIMARY KEY,
        item_id TEXT NOT NULL,
        student_name TEXT NOT NULL,
        student_id TEXT NOT NULL,
        student_email TEXT NOT NULL,
        grade TEXT NOT NULL,
        homeroom_teacher TEXT NOT NULL,
        pickup_time_slot TEXT NOT NULL,
        claim_status TEXT NOT NULL,
        data_creator TEXT NOT NULL,
        data_updater TEXT NOT NULL,
        create_time TEXT NOT NULL,
        update_time TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_claims_item_id ON claims (item_id)",
];

/// Create the remote tables if they do not exist yet.
///
/// `claims.item_id` has no foreign key; the referenced item may be missing remotely.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
