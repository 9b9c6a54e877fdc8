use async_trait::async_trait;
use sqlx::sqlite::{Sqlite, SqlitePool};
use sqlx::QueryBuilder;
use std::collections::HashMap;
use tracing::info;

use super::execution;
use crate::error::{StoreError, StoreResult};
use crate::model::{EntityId, Rating};
use crate::repository::Repository;

pub struct SqlRatingRepository {
    pool: SqlitePool,
}

impl SqlRatingRepository {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<Rating> for SqlRatingRepository {
    async fn save(&self, rating: Rating) -> StoreResult<Rating> {
        let result = sqlx::query("INSERT INTO ratings(name) VALUES (?)")
            .bind(&rating.name)
            .execute(&self.pool)
            .await
            .map_err(|e| execution("insert rating", e))?;
        let id = result.last_insert_rowid();
        info!(rating_id = id, name = %rating.name, "rating created");
        Ok(Rating::new(id, rating.name))
    }

    async fn update(&self, rating: Rating) -> StoreResult<Rating> {
        let result = sqlx::query("UPDATE ratings SET name = ? WHERE id = ?")
            .bind(&rating.name)
            .bind(rating.id)
            .execute(&self.pool)
            .await
            .map_err(|e| execution("update rating", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "rating update for unknown id {}: {:?}",
                rating.id, rating
            )));
        }
        info!(rating_id = rating.id, "rating updated");
        Ok(rating)
    }

    async fn delete(&self, rating: &Rating) -> StoreResult<Option<Rating>> {
        let deleted = match self.find_by_id(rating.id).await? {
            Some(deleted) => deleted,
            None => return Ok(None),
        };

        sqlx::query("DELETE FROM ratings WHERE id = ?")
            .bind(rating.id)
            .execute(&self.pool)
            .await
            .map_err(|e| execution("delete rating", e))?;

        info!(rating_id = rating.id, "rating deleted");
        Ok(Some(deleted))
    }

    async fn find_by_id(&self, id: EntityId) -> StoreResult<Option<Rating>> {
        let row = sqlx::query_as::<_, (EntityId, String)>(
            "SELECT id, name FROM ratings WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| execution("select rating by id", e))?;
        Ok(row.map(|(id, name)| Rating::new(id, name)))
    }

    async fn find_all(&self) -> StoreResult<Vec<Rating>> {
        let rows = sqlx::query_as::<_, (EntityId, String)>(
            "SELECT id, name FROM ratings ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| execution("select all ratings", e))?;
        Ok(rows.into_iter().map(|(id, name)| Rating::new(id, name)).collect())
    }

    async fn find_by_ids(&self, ids: &[EntityId]) -> StoreResult<Vec<Rating>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id, name FROM ratings WHERE id IN (");
        let mut separated = qb.separated(",");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let rows = qb
            .build_query_as::<(EntityId, String)>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| execution("select ratings by ids", e))?;

        let by_id: HashMap<EntityId, String> = rows.into_iter().collect();
        Ok(ids
            .iter()
            .filter_map(|id| by_id.get(id).map(|name| Rating::new(*id, name.clone())))
            .collect())
    }

    async fn find_first_n_top_rows(&self, n: i64) -> StoreResult<Vec<Rating>> {
        if n <= 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, (EntityId, String)>(
            "SELECT r.id, r.name FROM ratings r \
             LEFT JOIN films f ON f.rating_id = r.id \
             GROUP BY r.id \
             ORDER BY COUNT(f.id) DESC, r.id ASC \
             LIMIT ?",
        )
        .bind(n)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| execution("select top ratings", e))?;

        Ok(rows.into_iter().map(|(id, name)| Rating::new(id, name)).collect())
    }
}
