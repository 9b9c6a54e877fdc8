mod film;
mod friendship;
mod genre;
mod like;
mod rating;
mod user;

pub use film::MemoryFilmRepository;
pub use friendship::MemoryFriendshipRepository;
pub use genre::MemoryGenreRepository;
pub use like::MemoryLikeRepository;
pub use rating::MemoryRatingRepository;
pub use user::MemoryUserRepository;

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::CatalogStore;
use crate::ids::SequenceGenerator;
use crate::model::{EntityId, FriendshipStatus};

/// Stored film row: scalar fields plus reference ids. The derived
/// collections live in the edge sets and are joined back on every read.
#[derive(Debug, Clone)]
pub(crate) struct FilmRow {
    pub id: EntityId,
    pub name: String,
    pub description: String,
    pub release_date: NaiveDate,
    pub duration: i32,
    pub rating_id: Option<EntityId>,
    pub genre_ids: BTreeSet<EntityId>,
}

#[derive(Debug, Clone)]
pub(crate) struct UserRow {
    pub id: EntityId,
    pub email: String,
    pub login: String,
    pub name: String,
    pub birthday: NaiveDate,
}

/// Every collection of the transient engine, one `RwLock` per collection.
/// Id sequences are atomic so handing out a key never waits on a
/// collection lock. Edge sets key on the ordered id pair.
pub(crate) struct MemoryState {
    pub films: RwLock<HashMap<EntityId, FilmRow>>,
    pub users: RwLock<HashMap<EntityId, UserRow>>,
    pub genres: RwLock<BTreeMap<EntityId, String>>,
    pub ratings: RwLock<BTreeMap<EntityId, String>>,
    /// (user_id, film_id)
    pub likes: RwLock<HashSet<(EntityId, EntityId)>>,
    /// (user_id, friend_id) -> status
    pub friendships: RwLock<HashMap<(EntityId, EntityId), FriendshipStatus>>,
    pub film_ids: SequenceGenerator,
    pub user_ids: SequenceGenerator,
    pub genre_ids: SequenceGenerator,
    pub rating_ids: SequenceGenerator,
}

impl MemoryState {
    /// Fresh state carrying the same reference rows the durable schema
    /// ships with; generators start past the seed range.
    pub fn seeded() -> Arc<Self> {
        let genres: BTreeMap<EntityId, String> = super::sql::SEED_GENRES
            .iter()
            .map(|(id, name)| (*id, name.to_string()))
            .collect();
        let ratings: BTreeMap<EntityId, String> = super::sql::SEED_RATINGS
            .iter()
            .map(|(id, name)| (*id, name.to_string()))
            .collect();
        let next_genre_id = genres.keys().max().copied().unwrap_or(0) + 1;
        let next_rating_id = ratings.keys().max().copied().unwrap_or(0) + 1;

        Arc::new(Self {
            films: RwLock::new(HashMap::new()),
            users: RwLock::new(HashMap::new()),
            genres: RwLock::new(genres),
            ratings: RwLock::new(ratings),
            likes: RwLock::new(HashSet::new()),
            friendships: RwLock::new(HashMap::new()),
            film_ids: SequenceGenerator::starting_at(1),
            user_ids: SequenceGenerator::starting_at(1),
            genre_ids: SequenceGenerator::starting_at(next_genre_id),
            rating_ids: SequenceGenerator::starting_at(next_rating_id),
        })
    }
}

pub(crate) fn build() -> CatalogStore {
    let state = MemoryState::seeded();
    CatalogStore {
        films: Arc::new(MemoryFilmRepository::new(Arc::clone(&state))),
        users: Arc::new(MemoryUserRepository::new(Arc::clone(&state))),
        genres: Arc::new(MemoryGenreRepository::new(Arc::clone(&state))),
        ratings: Arc::new(MemoryRatingRepository::new(Arc::clone(&state))),
        likes: Arc::new(MemoryLikeRepository::new(Arc::clone(&state))),
        friendships: Arc::new(MemoryFriendshipRepository::new(state)),
    }
}
