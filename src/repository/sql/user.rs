use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::try_join_all;
use sqlx::sqlite::{Sqlite, SqlitePool};
use sqlx::QueryBuilder;
use std::collections::HashMap;
use tracing::info;

use super::execution;
use crate::error::{StoreError, StoreResult};
use crate::model::{EntityId, User};
use crate::repository::Repository;

/// (id, email, login, name, birthday)
type UserBase = (EntityId, String, String, String, NaiveDate);

const SELECT_USER: &str = "SELECT u.id, u.email, u.login, u.name, u.birthday FROM users u";

pub struct SqlUserRepository {
    pool: SqlitePool,
}

impl SqlUserRepository {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Join a base row with its friendship and like edges into a fresh
    /// aggregate.
    async fn assemble(&self, base: UserBase) -> StoreResult<User> {
        let (id, email, login, name, birthday) = base;

        let friends = sqlx::query_scalar::<_, EntityId>(
            "SELECT friend_id FROM friendships WHERE user_id = ? ORDER BY friend_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| execution("select friends of user", e))?
        .into_iter()
        .collect();

        let liked_films = sqlx::query_scalar::<_, EntityId>(
            "SELECT film_id FROM likes WHERE user_id = ? ORDER BY film_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| execution("select likes of user", e))?
        .into_iter()
        .collect();

        Ok(User {
            id: Some(id),
            email,
            login,
            name,
            birthday,
            friends,
            liked_films,
        })
    }

    async fn assemble_all(&self, rows: Vec<UserBase>) -> StoreResult<Vec<User>> {
        try_join_all(rows.into_iter().map(|row| self.assemble(row))).await
    }
}

#[async_trait]
impl Repository<User> for SqlUserRepository {
    async fn save(&self, user: User) -> StoreResult<User> {
        let user = user.normalized();

        let result = sqlx::query(
            "INSERT INTO users(email, login, name, birthday) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.email)
        .bind(&user.login)
        .bind(&user.name)
        .bind(user.birthday)
        .execute(&self.pool)
        .await
        .map_err(|e| execution("insert user", e))?;
        let id = result.last_insert_rowid();

        info!(user_id = id, login = %user.login, "user created");
        self.find_by_id(id).await?.ok_or_else(|| {
            StoreError::Execution(format!("user {} vanished after insert", id))
        })
    }

    async fn update(&self, user: User) -> StoreResult<User> {
        let id = user.id.ok_or_else(|| {
            StoreError::NotFound(format!("user update without id: {:?}", user))
        })?;
        let user = user.normalized();

        let result = sqlx::query(
            "UPDATE users SET email = ?, login = ?, name = ?, birthday = ? WHERE id = ?",
        )
        .bind(&user.email)
        .bind(&user.login)
        .bind(&user.name)
        .bind(user.birthday)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| execution("update user", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "user update for unknown id {}: {:?}",
                id, user
            )));
        }

        info!(user_id = id, "user updated");
        self.find_by_id(id).await?.ok_or_else(|| {
            StoreError::Execution(format!("user {} vanished after update", id))
        })
    }

    async fn delete(&self, user: &User) -> StoreResult<Option<User>> {
        let id = match user.id {
            Some(id) => id,
            None => return Ok(None),
        };

        let deleted = match self.find_by_id(id).await? {
            Some(deleted) => deleted,
            None => return Ok(None),
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| execution("begin user delete", e))?;

        // Friendship edges go in both directions.
        sqlx::query("DELETE FROM friendships WHERE user_id = ? OR friend_id = ?")
            .bind(id)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| execution("delete friendships of user", e))?;
        sqlx::query("DELETE FROM likes WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| execution("delete likes of user", e))?;
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| execution("delete user", e))?;

        tx.commit()
            .await
            .map_err(|e| execution("commit user delete", e))?;

        info!(user_id = id, "user deleted");
        Ok(Some(deleted))
    }

    async fn find_by_id(&self, id: EntityId) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserBase>(&format!("{} WHERE u.id = ?", SELECT_USER))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| execution("select user by id", e))?;

        match row {
            Some(row) => Ok(Some(self.assemble(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_all(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserBase>(&format!("{} ORDER BY u.id", SELECT_USER))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| execution("select all users", e))?;
        self.assemble_all(rows).await
    }

    async fn find_by_ids(&self, ids: &[EntityId]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!("{} WHERE u.id IN (", SELECT_USER));
        let mut separated = qb.separated(",");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let rows = qb
            .build_query_as::<UserBase>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| execution("select users by ids", e))?;

        let mut by_id = HashMap::with_capacity(rows.len());
        for user in self.assemble_all(rows).await? {
            if let Some(id) = user.id {
                by_id.insert(id, user);
            }
        }
        Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
    }

    async fn find_first_n_top_rows(&self, n: i64) -> StoreResult<Vec<User>> {
        if n <= 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, UserBase>(&format!(
            "{} LEFT JOIN friendships fr ON fr.user_id = u.id \
             GROUP BY u.id \
             ORDER BY COUNT(fr.friend_id) DESC, u.id ASC \
             LIMIT ?",
            SELECT_USER
        ))
        .bind(n)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| execution("select top users", e))?;

        self.assemble_all(rows).await
    }
}
