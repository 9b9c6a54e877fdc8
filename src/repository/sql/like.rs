use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use tracing::info;

use super::execution;
use crate::error::StoreResult;
use crate::model::{EntityId, Like};
use crate::repository::LikeRepository;

pub struct SqlLikeRepository {
    pool: SqlitePool,
}

impl SqlLikeRepository {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LikeRepository for SqlLikeRepository {
    async fn add(&self, like: Like) -> StoreResult<Option<Like>> {
        let result = sqlx::query("INSERT OR IGNORE INTO likes(user_id, film_id) VALUES (?, ?)")
            .bind(like.user_id)
            .bind(like.film_id)
            .execute(&self.pool)
            .await
            .map_err(|e| execution("insert like", e))?;

        if result.rows_affected() > 0 {
            info!(user_id = like.user_id, film_id = like.film_id, "like added");
            Ok(Some(like))
        } else {
            Ok(None)
        }
    }

    async fn remove(&self, like: &Like) -> StoreResult<Option<Like>> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = ? AND film_id = ?")
            .bind(like.user_id)
            .bind(like.film_id)
            .execute(&self.pool)
            .await
            .map_err(|e| execution("delete like", e))?;
        Ok((result.rows_affected() > 0).then_some(*like))
    }

    async fn exists(&self, like: &Like) -> StoreResult<bool> {
        let row = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM likes WHERE user_id = ? AND film_id = ?",
        )
        .bind(like.user_id)
        .bind(like.film_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| execution("select like", e))?;
        Ok(row.is_some())
    }

    async fn for_film(&self, film_id: EntityId) -> StoreResult<Vec<Like>> {
        let rows = sqlx::query_as::<_, (EntityId, EntityId)>(
            "SELECT user_id, film_id FROM likes WHERE film_id = ? ORDER BY user_id",
        )
        .bind(film_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| execution("select likes by film", e))?;
        Ok(rows
            .into_iter()
            .map(|(user_id, film_id)| Like::new(user_id, film_id))
            .collect())
    }

    async fn for_user(&self, user_id: EntityId) -> StoreResult<Vec<Like>> {
        let rows = sqlx::query_as::<_, (EntityId, EntityId)>(
            "SELECT user_id, film_id FROM likes WHERE user_id = ? ORDER BY film_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| execution("select likes by user", e))?;
        Ok(rows
            .into_iter()
            .map(|(user_id, film_id)| Like::new(user_id, film_id))
            .collect())
    }

    async fn delete_all_for_film(&self, film_id: EntityId) -> StoreResult<()> {
        sqlx::query("DELETE FROM likes WHERE film_id = ?")
            .bind(film_id)
            .execute(&self.pool)
            .await
            .map_err(|e| execution("delete likes by film", e))?;
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: EntityId) -> StoreResult<()> {
        sqlx::query("DELETE FROM likes WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| execution("delete likes by user", e))?;
        Ok(())
    }
}
