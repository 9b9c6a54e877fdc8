use async_trait::async_trait;
use sqlx::sqlite::{Sqlite, SqlitePool};
use sqlx::QueryBuilder;
use std::collections::HashMap;
use tracing::info;

use super::execution;
use crate::error::{StoreError, StoreResult};
use crate::model::{EntityId, Genre};
use crate::repository::Repository;

pub struct SqlGenreRepository {
    pool: SqlitePool,
}

impl SqlGenreRepository {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<Genre> for SqlGenreRepository {
    async fn save(&self, genre: Genre) -> StoreResult<Genre> {
        let result = sqlx::query("INSERT INTO genres(name) VALUES (?)")
            .bind(&genre.name)
            .execute(&self.pool)
            .await
            .map_err(|e| execution("insert genre", e))?;
        let id = result.last_insert_rowid();
        info!(genre_id = id, name = %genre.name, "genre created");
        Ok(Genre::new(id, genre.name))
    }

    async fn update(&self, genre: Genre) -> StoreResult<Genre> {
        let result = sqlx::query("UPDATE genres SET name = ? WHERE id = ?")
            .bind(&genre.name)
            .bind(genre.id)
            .execute(&self.pool)
            .await
            .map_err(|e| execution("update genre", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "genre update for unknown id {}: {:?}",
                genre.id, genre
            )));
        }
        info!(genre_id = genre.id, "genre updated");
        Ok(genre)
    }

    async fn delete(&self, genre: &Genre) -> StoreResult<Option<Genre>> {
        let deleted = match self.find_by_id(genre.id).await? {
            Some(deleted) => deleted,
            None => return Ok(None),
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| execution("begin genre delete", e))?;

        sqlx::query("DELETE FROM film_genres WHERE genre_id = ?")
            .bind(genre.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| execution("delete film references of genre", e))?;
        sqlx::query("DELETE FROM genres WHERE id = ?")
            .bind(genre.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| execution("delete genre", e))?;

        tx.commit()
            .await
            .map_err(|e| execution("commit genre delete", e))?;

        info!(genre_id = genre.id, "genre deleted");
        Ok(Some(deleted))
    }

    async fn find_by_id(&self, id: EntityId) -> StoreResult<Option<Genre>> {
        let row = sqlx::query_as::<_, (EntityId, String)>(
            "SELECT id, name FROM genres WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| execution("select genre by id", e))?;
        Ok(row.map(|(id, name)| Genre::new(id, name)))
    }

    async fn find_all(&self) -> StoreResult<Vec<Genre>> {
        let rows = sqlx::query_as::<_, (EntityId, String)>(
            "SELECT id, name FROM genres ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| execution("select all genres", e))?;
        Ok(rows.into_iter().map(|(id, name)| Genre::new(id, name)).collect())
    }

    async fn find_by_ids(&self, ids: &[EntityId]) -> StoreResult<Vec<Genre>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id, name FROM genres WHERE id IN (");
        let mut separated = qb.separated(",");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let rows = qb
            .build_query_as::<(EntityId, String)>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| execution("select genres by ids", e))?;

        let by_id: HashMap<EntityId, String> = rows.into_iter().collect();
        Ok(ids
            .iter()
            .filter_map(|id| by_id.get(id).map(|name| Genre::new(*id, name.clone())))
            .collect())
    }

    async fn find_first_n_top_rows(&self, n: i64) -> StoreResult<Vec<Genre>> {
        if n <= 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, (EntityId, String)>(
            "SELECT g.id, g.name FROM genres g \
             LEFT JOIN film_genres fg ON fg.genre_id = g.id \
             GROUP BY g.id \
             ORDER BY COUNT(fg.film_id) DESC, g.id ASC \
             LIMIT ?",
        )
        .bind(n)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| execution("select top genres", e))?;

        Ok(rows.into_iter().map(|(id, name)| Genre::new(id, name)).collect())
    }
}
