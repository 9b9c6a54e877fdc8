pub mod memory;
pub mod sql;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;

use crate::config::Config;
use crate::error::StoreResult;
use crate::model::{EntityId, Film, Friendship, FriendshipStatus, Genre, Like, Rating, User};

/// Uniform contract every entity store implements, once per backing
/// engine. Absence is reported as `None`; only structural failures and
/// updates against unknown ids surface as errors.
#[async_trait]
pub trait Repository<T>: Send + Sync {
    /// Persist a new entity and assign its surrogate id. Returns the
    /// freshly assembled aggregate.
    async fn save(&self, entity: T) -> StoreResult<T>;

    /// Replace an existing entity. Fails with `StoreError::NotFound` when
    /// the id is missing or unknown. Association-derived collections
    /// survive the replacement unless the payload supplies them.
    async fn update(&self, entity: T) -> StoreResult<T>;

    /// Remove an entity together with every edge referencing it. Returns
    /// the aggregate as it was stored, or `None` if it never existed.
    async fn delete(&self, entity: &T) -> StoreResult<Option<T>>;

    async fn find_by_id(&self, id: EntityId) -> StoreResult<Option<T>>;

    async fn find_all(&self) -> StoreResult<Vec<T>>;

    /// Bulk lookup preserving request order; unknown ids are dropped
    /// silently rather than failing the call.
    async fn find_by_ids(&self, ids: &[EntityId]) -> StoreResult<Vec<T>>;

    /// The `n` entities with the most association edges, descending,
    /// ties broken by ascending id. Entities without edges count zero and
    /// still participate. `n <= 0` yields an empty result.
    async fn find_first_n_top_rows(&self, n: i64) -> StoreResult<Vec<T>>;
}

/// Set-like storage of (user, film) like edges, queryable per endpoint.
#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Insert an edge. `None` means the pair already existed; the call is
    /// a no-op, not an error.
    async fn add(&self, like: Like) -> StoreResult<Option<Like>>;

    /// Remove an edge. `None` means the pair was absent.
    async fn remove(&self, like: &Like) -> StoreResult<Option<Like>>;

    async fn exists(&self, like: &Like) -> StoreResult<bool>;

    async fn for_film(&self, film_id: EntityId) -> StoreResult<Vec<Like>>;

    async fn for_user(&self, user_id: EntityId) -> StoreResult<Vec<Like>>;

    /// Cascade hook for film deletion.
    async fn delete_all_for_film(&self, film_id: EntityId) -> StoreResult<()>;

    /// Cascade hook for user deletion.
    async fn delete_all_for_user(&self, user_id: EntityId) -> StoreResult<()>;
}

/// Directed (user, friend) edges with a status column. Only `Requested`
/// is written on add; the status never restricts lookups.
#[async_trait]
pub trait FriendshipRepository: Send + Sync {
    /// Insert an edge with status `Requested`. `None` means the pair
    /// already existed; the call is a no-op, not an error.
    async fn add(&self, friendship: Friendship) -> StoreResult<Option<Friendship>>;

    async fn remove(&self, friendship: &Friendship) -> StoreResult<Option<Friendship>>;

    async fn exists(&self, friendship: &Friendship) -> StoreResult<bool>;

    /// Look up one edge, returning its stored status.
    async fn find(
        &self,
        user_id: EntityId,
        friend_id: EntityId,
    ) -> StoreResult<Option<Friendship>>;

    /// Flip the status of an existing edge; `None` if the edge is absent.
    async fn set_status(
        &self,
        user_id: EntityId,
        friend_id: EntityId,
        status: FriendshipStatus,
    ) -> StoreResult<Option<Friendship>>;

    /// Outgoing edges for a user.
    async fn for_user(&self, user_id: EntityId) -> StoreResult<Vec<Friendship>>;

    /// Cascade hook for user deletion: drops every edge touching the
    /// user, both directions.
    async fn delete_all_for_user(&self, user_id: EntityId) -> StoreResult<()>;
}

/// Bundle of repository handles over one backing engine. The two
/// constructions are behaviorally identical observable stores; the
/// conformance suite exercises both through this struct.
pub struct CatalogStore {
    pub films: Arc<dyn Repository<Film>>,
    pub users: Arc<dyn Repository<User>>,
    pub genres: Arc<dyn Repository<Genre>>,
    pub ratings: Arc<dyn Repository<Rating>>,
    pub likes: Arc<dyn LikeRepository>,
    pub friendships: Arc<dyn FriendshipRepository>,
}

impl CatalogStore {
    /// Transient engine: process-local collections, seeded reference data.
    pub fn in_memory() -> Self {
        memory::build()
    }

    /// Durable engine against the configured database, creating schema
    /// and seed rows when absent.
    pub async fn connect(config: &Config) -> StoreResult<Self> {
        sql::connect(config).await
    }

    /// Durable engine over an existing pool.
    pub async fn sqlite(pool: SqlitePool) -> StoreResult<Self> {
        sql::build(pool).await
    }

    /// Durable engine over a private in-memory SQLite database. Single
    /// connection, since every pooled connection would otherwise open its
    /// own empty database.
    pub async fn sqlite_in_memory() -> StoreResult<Self> {
        sql::build(sql::in_memory_pool().await?).await
    }
}
