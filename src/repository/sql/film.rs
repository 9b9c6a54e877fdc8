use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::try_join_all;
use sqlx::sqlite::{Sqlite, SqlitePool};
use sqlx::QueryBuilder;
use std::collections::HashMap;
use tracing::info;

use super::execution;
use crate::error::{StoreError, StoreResult};
use crate::model::{EntityId, Film, Genre, Rating};
use crate::repository::Repository;

/// Base film row joined with its optional rating:
/// (id, name, description, release_date, duration, rating_id, rating_name)
type FilmBase = (
    EntityId,
    String,
    String,
    NaiveDate,
    i32,
    Option<EntityId>,
    Option<String>,
);

const SELECT_FILM: &str = "\
    SELECT f.id, f.name, f.description, f.release_date, f.duration, \
           r.id AS rating_id, r.name AS rating_name \
    FROM films f LEFT JOIN ratings r ON r.id = f.rating_id";

pub struct SqlFilmRepository {
    pool: SqlitePool,
}

impl SqlFilmRepository {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Join a base row with its like edges and genre references into a
    /// fresh aggregate.
    async fn assemble(&self, base: FilmBase) -> StoreResult<Film> {
        let (id, name, description, release_date, duration, rating_id, rating_name) = base;

        let liked_by = sqlx::query_scalar::<_, EntityId>(
            "SELECT user_id FROM likes WHERE film_id = ? ORDER BY user_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| execution("select likes for film", e))?
        .into_iter()
        .collect();

        let genres = sqlx::query_as::<_, (EntityId, String)>(
            "SELECT g.id, g.name FROM film_genres fg \
             JOIN genres g ON g.id = fg.genre_id \
             WHERE fg.film_id = ? ORDER BY g.id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| execution("select genres for film", e))?
        .into_iter()
        .map(|(genre_id, genre_name)| Genre::new(genre_id, genre_name))
        .collect();

        let rating = match (rating_id, rating_name) {
            (Some(rating_id), Some(rating_name)) => Some(Rating::new(rating_id, rating_name)),
            _ => None,
        };

        Ok(Film {
            id: Some(id),
            name,
            description,
            release_date,
            duration,
            rating,
            genres,
            liked_by,
        })
    }

    async fn assemble_all(&self, rows: Vec<FilmBase>) -> StoreResult<Vec<Film>> {
        try_join_all(rows.into_iter().map(|row| self.assemble(row))).await
    }
}

#[async_trait]
impl Repository<Film> for SqlFilmRepository {
    async fn save(&self, film: Film) -> StoreResult<Film> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| execution("begin film insert", e))?;

        let result = sqlx::query(
            "INSERT INTO films(name, description, release_date, duration, rating_id) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&film.name)
        .bind(&film.description)
        .bind(film.release_date)
        .bind(film.duration)
        .bind(film.rating.as_ref().map(|r| r.id))
        .execute(&mut *tx)
        .await
        .map_err(|e| execution("insert film", e))?;
        let id = result.last_insert_rowid();

        for genre in &film.genres {
            sqlx::query("INSERT OR IGNORE INTO film_genres(film_id, genre_id) VALUES (?, ?)")
                .bind(id)
                .bind(genre.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| execution("insert film genre", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| execution("commit film insert", e))?;

        info!(film_id = id, name = %film.name, "film created");
        self.find_by_id(id).await?.ok_or_else(|| {
            StoreError::Execution(format!("film {} vanished after insert", id))
        })
    }

    async fn update(&self, film: Film) -> StoreResult<Film> {
        let id = film.id.ok_or_else(|| {
            StoreError::NotFound(format!("film update without id: {:?}", film))
        })?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| execution("begin film update", e))?;

        let result = sqlx::query(
            "UPDATE films SET name = ?, description = ?, release_date = ?, \
             duration = ?, rating_id = ? WHERE id = ?",
        )
        .bind(&film.name)
        .bind(&film.description)
        .bind(film.release_date)
        .bind(film.duration)
        .bind(film.rating.as_ref().map(|r| r.id))
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| execution("update film", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "film update for unknown id {}: {:?}",
                id, film
            )));
        }

        // An empty genre payload means "not supplied": the stored set
        // carries over. A supplied set replaces it atomically.
        if !film.genres.is_empty() {
            sqlx::query("DELETE FROM film_genres WHERE film_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| execution("clear film genres", e))?;
            for genre in &film.genres {
                sqlx::query("INSERT OR IGNORE INTO film_genres(film_id, genre_id) VALUES (?, ?)")
                    .bind(id)
                    .bind(genre.id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| execution("insert film genre", e))?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| execution("commit film update", e))?;

        info!(film_id = id, "film updated");
        self.find_by_id(id).await?.ok_or_else(|| {
            StoreError::Execution(format!("film {} vanished after update", id))
        })
    }

    async fn delete(&self, film: &Film) -> StoreResult<Option<Film>> {
        let id = match film.id {
            Some(id) => id,
            None => return Ok(None),
        };

        // Snapshot the aggregate before the cascade so the caller sees
        // the film as it was.
        let deleted = match self.find_by_id(id).await? {
            Some(deleted) => deleted,
            None => return Ok(None),
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| execution("begin film delete", e))?;

        sqlx::query("DELETE FROM likes WHERE film_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| execution("delete likes of film", e))?;
        sqlx::query("DELETE FROM film_genres WHERE film_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| execution("delete genres of film", e))?;
        sqlx::query("DELETE FROM films WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| execution("delete film", e))?;

        tx.commit()
            .await
            .map_err(|e| execution("commit film delete", e))?;

        info!(film_id = id, "film deleted");
        Ok(Some(deleted))
    }

    async fn find_by_id(&self, id: EntityId) -> StoreResult<Option<Film>> {
        let row = sqlx::query_as::<_, FilmBase>(&format!("{} WHERE f.id = ?", SELECT_FILM))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| execution("select film by id", e))?;

        match row {
            Some(row) => Ok(Some(self.assemble(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_all(&self) -> StoreResult<Vec<Film>> {
        let rows = sqlx::query_as::<_, FilmBase>(&format!("{} ORDER BY f.id", SELECT_FILM))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| execution("select all films", e))?;
        self.assemble_all(rows).await
    }

    async fn find_by_ids(&self, ids: &[EntityId]) -> StoreResult<Vec<Film>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!("{} WHERE f.id IN (", SELECT_FILM));
        let mut separated = qb.separated(",");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let rows = qb
            .build_query_as::<FilmBase>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| execution("select films by ids", e))?;

        let mut by_id = HashMap::with_capacity(rows.len());
        for film in self.assemble_all(rows).await? {
            if let Some(id) = film.id {
                by_id.insert(id, film);
            }
        }
        // Request order, unknown ids dropped.
        Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
    }

    async fn find_first_n_top_rows(&self, n: i64) -> StoreResult<Vec<Film>> {
        if n <= 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, FilmBase>(&format!(
            "{} LEFT JOIN likes l ON l.film_id = f.id \
             GROUP BY f.id \
             ORDER BY COUNT(l.user_id) DESC, f.id ASC \
             LIMIT ?",
            SELECT_FILM
        ))
        .bind(n)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| execution("select top films", e))?;

        self.assemble_all(rows).await
    }
}
