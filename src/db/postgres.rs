use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::{ClaimModel, ClaimRow, ClaimStatus, ItemModel, ItemRow, ItemStatus};

use super::Repository;

const ITEM_COLUMNS: &str = "id, item_name, description, category, date_found, location_found, \
     photo_url, finder_name, finder_email, status, data_creator, data_updater, \
     create_time, update_time";

const CLAIM_COLUMNS: &str = "id, item_id, student_name, student_id, student_email, grade, \
     homeroom_teacher, pickup_time_slot, claim_status, data_creator, data_updater, \
     create_time, update_time";

pub struct PgItemRepository {
    pool: PgPool,
}

impl PgItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, sql: &str, bind: Option<Bind<'_>>) -> AppResult<Vec<ItemModel>> {
        let query = sqlx::query_as::<_, ItemRow>(sql);
        let query = match bind {
            Some(Bind::Text(value)) => query.bind(value),
            Some(Bind::TextArray(values)) => query.bind(values),
            None => query,
        };
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(ItemModel::try_from).collect()
    }
}

enum Bind<'a> {
    Text(&'a str),
    TextArray(&'a [String]),
}

fn upsert_item_sql() -> String {
    format!(
        "INSERT INTO lost_items ({}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         ON CONFLICT (id) DO UPDATE SET \
         item_name = EXCLUDED.item_name, description = EXCLUDED.description, \
         category = EXCLUDED.category, date_found = EXCLUDED.date_found, \
         location_found = EXCLUDED.location_found, photo_url = EXCLUDED.photo_url, \
         finder_name = EXCLUDED.finder_name, finder_email = EXCLUDED.finder_email, \
         status = EXCLUDED.status, data_updater = EXCLUDED.data_updater, \
         update_time = EXCLUDED.update_time",
        ITEM_COLUMNS
    )
}

fn bind_item<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    item: &'q ItemModel,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(&item.id)
        .bind(&item.item_name)
        .bind(item.description.as_deref())
        .bind(item.category.as_str())
        .bind(&item.date_found)
        .bind(&item.location_found)
        .bind(item.photo_url.as_deref())
        .bind(item.finder_name.as_deref())
        .bind(item.finder_email.as_deref())
        .bind(item.status.as_str())
        .bind(&item.data_creator)
        .bind(&item.data_updater)
        .bind(&item.create_time)
        .bind(&item.update_time)
}

#[async_trait::async_trait]
impl Repository<ItemModel> for PgItemRepository {
    async fn insert(&self, records: &[ItemModel]) -> AppResult<()> {
        let sql = format!(
            "INSERT INTO lost_items ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
            ITEM_COLUMNS
        );
        let mut tx = self.pool.begin().await?;
        for item in records {
            bind_item(sqlx::query(&sql), item).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_all(&self) -> AppResult<Vec<ItemModel>> {
        let sql = format!(
            "SELECT {} FROM lost_items ORDER BY create_time DESC",
            ITEM_COLUMNS
        );
        self.fetch(&sql, None).await
    }

    async fn get_by_status(&self, status: ItemStatus) -> AppResult<Vec<ItemModel>> {
        let sql = format!(
            "SELECT {} FROM lost_items WHERE status = $1 ORDER BY create_time DESC",
            ITEM_COLUMNS
        );
        self.fetch(&sql, Some(Bind::Text(status.as_str()))).await
    }

    async fn get_by_ids(&self, ids: &[String]) -> AppResult<Vec<ItemModel>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {} FROM lost_items WHERE id = ANY($1)", ITEM_COLUMNS);
        self.fetch(&sql, Some(Bind::TextArray(ids))).await
    }

    async fn set_by_id(&self, id: &str, record: &ItemModel) -> AppResult<()> {
        if record.id != id {
            return Err(AppError::InvalidInput(format!(
                "record id {} does not match {}",
                record.id, id
            )));
        }
        let sql = upsert_item_sql();
        bind_item(sqlx::query(&sql), record)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> AppResult<()> {
        let rows_affected = sqlx::query("DELETE FROM lost_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if rows_affected == 0 {
            tracing::debug!("Remote item already absent: id={}", id);
        }
        Ok(())
    }

    fn backend_tag(&self) -> &'static str {
        "postgres"
    }
}

pub struct PgClaimRepository {
    pool: PgPool,
}

impl PgClaimRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, sql: &str, bind: Option<Bind<'_>>) -> AppResult<Vec<ClaimModel>> {
        let query = sqlx::query_as::<_, ClaimRow>(sql);
        let query = match bind {
            Some(Bind::Text(value)) => query.bind(value),
            Some(Bind::TextArray(values)) => query.bind(values),
            None => query,
        };
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(ClaimModel::try_from).collect()
    }
}

fn upsert_claim_sql() -> String {
    format!(
        "INSERT INTO claims ({}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         ON CONFLICT (id) DO UPDATE SET \
         item_id = EXCLUDED.item_id, student_name = EXCLUDED.student_name, \
         student_id = EXCLUDED.student_id, student_email = EXCLUDED.student_email, \
         grade = EXCLUDED.grade, homeroom_teacher = EXCLUDED.homeroom_teacher, \
         pickup_time_slot = EXCLUDED.pickup_time_slot, claim_status = EXCLUDED.claim_status, \
         data_updater = EXCLUDED.data_updater, update_time = EXCLUDED.update_time",
        CLAIM_COLUMNS
    )
}

fn bind_claim<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    claim: &'q ClaimModel,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(&claim.id)
        .bind(&claim.item_id)
        .bind(&claim.student_name)
        .bind(&claim.student_id)
        .bind(&claim.student_email)
        .bind(&claim.grade)
        .bind(&claim.homeroom_teacher)
        .bind(&claim.pickup_time_slot)
        .bind(claim.claim_status.as_str())
        .bind(&claim.data_creator)
        .bind(&claim.data_updater)
        .bind(&claim.create_time)
        .bind(&claim.update_time)
}

#[async_trait::async_trait]
impl Repository<ClaimModel> for PgClaimRepository {
    async fn insert(&self, records: &[ClaimModel]) -> AppResult<()> {
        let sql = format!(
            "INSERT INTO claims ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
            CLAIM_COLUMNS
        );
        let mut tx = self.pool.begin().await?;
        for claim in records {
            bind_claim(sqlx::query(&sql), claim).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_all(&self) -> AppResult<Vec<ClaimModel>> {
        let sql = format!("SELECT {} FROM claims ORDER BY create_time DESC", CLAIM_COLUMNS);
        self.fetch(&sql, None).await
    }

    async fn get_by_status(&self, status: ClaimStatus) -> AppResult<Vec<ClaimModel>> {
        let sql = format!(
            "SELECT {} FROM claims WHERE claim_status = $1 ORDER BY create_time DESC",
            CLAIM_COLUMNS
        );
        self.fetch(&sql, Some(Bind::Text(status.as_str()))).await
    }

    async fn get_by_ids(&self, ids: &[String]) -> AppResult<Vec<ClaimModel>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {} FROM claims WHERE id = ANY($1)", CLAIM_COLUMNS);
        self.fetch(&sql, Some(Bind::TextArray(ids))).await
    }

    async fn set_by_id(&self, id: &str, record: &ClaimModel) -> AppResult<()> {
        if record.id != id {
            return Err(AppError::InvalidInput(format!(
                "record id {} does not match {}",
                record.id, id
            )));
        }
        let sql = upsert_claim_sql();
        bind_claim(sqlx::query(&sql), record)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM claims WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn backend_tag(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_sql_binds_every_column() {
        let item_cols = ITEM_COLUMNS.split(',').count();
        assert_eq!(item_cols, 14);
        assert!(upsert_item_sql().contains("$14"));

        let claim_cols = CLAIM_COLUMNS.split(',').count();
        assert_eq!(claim_cols, 13);
        assert!(upsert_claim_sql().contains("$13"));
    }
}
