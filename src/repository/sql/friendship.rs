use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use tracing::info;

use super::execution;
use crate::error::StoreResult;
use crate::model::{EntityId, Friendship, FriendshipStatus};
use crate::repository::FriendshipRepository;

pub struct SqlFriendshipRepository {
    pool: SqlitePool,
}

impl SqlFriendshipRepository {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FriendshipRepository for SqlFriendshipRepository {
    async fn add(&self, friendship: Friendship) -> StoreResult<Option<Friendship>> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO friendships(user_id, friend_id, status) VALUES (?, ?, ?)",
        )
        .bind(friendship.user_id)
        .bind(friendship.friend_id)
        .bind(FriendshipStatus::Requested.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| execution("insert friendship", e))?;

        if result.rows_affected() > 0 {
            info!(
                user_id = friendship.user_id,
                friend_id = friendship.friend_id,
                "friendship requested"
            );
            Ok(Some(Friendship::requested(
                friendship.user_id,
                friendship.friend_id,
            )))
        } else {
            Ok(None)
        }
    }

    async fn remove(&self, friendship: &Friendship) -> StoreResult<Option<Friendship>> {
        let stored = self.find(friendship.user_id, friendship.friend_id).await?;
        let stored = match stored {
            Some(stored) => stored,
            None => return Ok(None),
        };

        sqlx::query("DELETE FROM friendships WHERE user_id = ? AND friend_id = ?")
            .bind(friendship.user_id)
            .bind(friendship.friend_id)
            .execute(&self.pool)
            .await
            .map_err(|e| execution("delete friendship", e))?;
        Ok(Some(stored))
    }

    async fn exists(&self, friendship: &Friendship) -> StoreResult<bool> {
        let row = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM friendships WHERE user_id = ? AND friend_id = ?",
        )
        .bind(friendship.user_id)
        .bind(friendship.friend_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| execution("select friendship", e))?;
        Ok(row.is_some())
    }

    async fn find(
        &self,
        user_id: EntityId,
        friend_id: EntityId,
    ) -> StoreResult<Option<Friendship>> {
        let status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM friendships WHERE user_id = ? AND friend_id = ?",
        )
        .bind(user_id)
        .bind(friend_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| execution("select friendship status", e))?;

        match status {
            Some(status) => Ok(Some(Friendship {
                user_id,
                friend_id,
                status: status.parse()?,
            })),
            None => Ok(None),
        }
    }

    async fn set_status(
        &self,
        user_id: EntityId,
        friend_id: EntityId,
        status: FriendshipStatus,
    ) -> StoreResult<Option<Friendship>> {
        let result = sqlx::query(
            "UPDATE friendships SET status = ? WHERE user_id = ? AND friend_id = ?",
        )
        .bind(status.as_str())
        .bind(user_id)
        .bind(friend_id)
        .execute(&self.pool)
        .await
        .map_err(|e| execution("update friendship status", e))?;

        Ok((result.rows_affected() > 0).then_some(Friendship {
            user_id,
            friend_id,
            status,
        }))
    }

    async fn for_user(&self, user_id: EntityId) -> StoreResult<Vec<Friendship>> {
        let rows = sqlx::query_as::<_, (EntityId, String)>(
            "SELECT friend_id, status FROM friendships WHERE user_id = ? ORDER BY friend_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| execution("select friendships by user", e))?;

        rows.into_iter()
            .map(|(friend_id, status)| {
                Ok(Friendship {
                    user_id,
                    friend_id,
                    status: status.parse()?,
                })
            })
            .collect()
    }

    async fn delete_all_for_user(&self, user_id: EntityId) -> StoreResult<()> {
        sqlx::query("DELETE FROM friendships WHERE user_id = ? OR friend_id = ?")
            .bind(user_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| execution("delete friendships by user", e))?;
        Ok(())
    }
}
