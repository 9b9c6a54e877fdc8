mod film;
mod friendship;
mod genre;
mod like;
mod rating;
mod user;

pub use film::SqlFilmRepository;
pub use friendship::SqlFriendshipRepository;
pub use genre::SqlGenreRepository;
pub use like::SqlLikeRepository;
pub use rating::SqlRatingRepository;
pub use user::SqlUserRepository;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::CatalogStore;
use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::model::EntityId;

/// Reference rows every fresh store carries. The transient engine seeds
/// the same data so both engines agree on the low id range.
pub(crate) const SEED_GENRES: &[(EntityId, &str)] = &[
    (1, "Comedy"),
    (2, "Drama"),
    (3, "Cartoon"),
    (4, "Thriller"),
    (5, "Documentary"),
    (6, "Action"),
];

pub(crate) const SEED_RATINGS: &[(EntityId, &str)] = &[
    (1, "G"),
    (2, "PG"),
    (3, "PG-13"),
    (4, "R"),
    (5, "NC-17"),
];

/// Wrap a backing-engine failure with the operation that hit it.
pub(crate) fn execution(operation: &str, err: sqlx::Error) -> StoreError {
    StoreError::Execution(format!("{}: {}", operation, err))
}

pub(crate) async fn connect(config: &Config) -> StoreResult<CatalogStore> {
    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .connect(&config.database.url)
        .await
        .map_err(|e| {
            StoreError::Configuration(format!(
                "failed to connect to {}: {}",
                config.database.url, e
            ))
        })?;
    build(pool).await
}

/// Single-connection pool over a private in-memory database. More than
/// one pooled connection would each open its own empty database.
pub(crate) async fn in_memory_pool() -> StoreResult<SqlitePool> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .map_err(|e| StoreError::Configuration(format!("failed to open in-memory SQLite: {}", e)))
}

pub(crate) async fn build(pool: SqlitePool) -> StoreResult<CatalogStore> {
    initialize(&pool).await?;
    Ok(CatalogStore {
        films: Arc::new(SqlFilmRepository::new(pool.clone())),
        users: Arc::new(SqlUserRepository::new(pool.clone())),
        genres: Arc::new(SqlGenreRepository::new(pool.clone())),
        ratings: Arc::new(SqlRatingRepository::new(pool.clone())),
        likes: Arc::new(SqlLikeRepository::new(pool.clone())),
        friendships: Arc::new(SqlFriendshipRepository::new(pool)),
    })
}

/// Create the relational layout when absent: one table per entity kind,
/// one join table per association kind, plus the seed rows. Safe to run
/// against an already-initialized database.
pub(crate) async fn initialize(pool: &SqlitePool) -> StoreResult<()> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS ratings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS genres (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS films (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            release_date TEXT NOT NULL,
            duration INTEGER NOT NULL,
            rating_id INTEGER REFERENCES ratings(id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL,
            login TEXT NOT NULL,
            name TEXT NOT NULL,
            birthday TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS film_genres (
            film_id INTEGER NOT NULL,
            genre_id INTEGER NOT NULL,
            PRIMARY KEY (film_id, genre_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS likes (
            user_id INTEGER NOT NULL,
            film_id INTEGER NOT NULL,
            PRIMARY KEY (user_id, film_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS friendships (
            user_id INTEGER NOT NULL,
            friend_id INTEGER NOT NULL,
            status TEXT NOT NULL,
            PRIMARY KEY (user_id, friend_id)
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_likes_film ON likes(film_id)",
        "CREATE INDEX IF NOT EXISTS idx_friendships_friend ON friendships(friend_id)",
        "CREATE INDEX IF NOT EXISTS idx_film_genres_genre ON film_genres(genre_id)",
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| execution("create schema", e))?;
    }

    for (id, name) in SEED_GENRES {
        sqlx::query("INSERT OR IGNORE INTO genres(id, name) VALUES (?, ?)")
            .bind(id)
            .bind(name)
            .execute(pool)
            .await
            .map_err(|e| execution("seed genres", e))?;
    }
    for (id, name) in SEED_RATINGS {
        sqlx::query("INSERT OR IGNORE INTO ratings(id, name) VALUES (?, ?)")
            .bind(id)
            .bind(name)
            .execute(pool)
            .await
            .map_err(|e| execution("seed ratings", e))?;
    }

    info!("relational schema ready");
    Ok(())
}
