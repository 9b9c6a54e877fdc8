use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::MemoryState;
use crate::error::{StoreError, StoreResult};
use crate::model::{EntityId, Genre};
use crate::repository::Repository;

pub struct MemoryGenreRepository {
    state: Arc<MemoryState>,
}

impl MemoryGenreRepository {
    pub(crate) fn new(state: Arc<MemoryState>) -> Self {
        Self { state }
    }

    /// Films referencing each genre. Zero-usage genres are not in the map.
    async fn usage_counts(&self) -> HashMap<EntityId, usize> {
        let films = self.state.films.read().await;
        let mut counts = HashMap::new();
        for row in films.values() {
            for genre_id in &row.genre_ids {
                *counts.entry(*genre_id).or_insert(0) += 1;
            }
        }
        counts
    }
}

#[async_trait]
impl Repository<Genre> for MemoryGenreRepository {
    async fn save(&self, genre: Genre) -> StoreResult<Genre> {
        let id = self.state.genre_ids.next_id();
        self.state
            .genres
            .write()
            .await
            .insert(id, genre.name.clone());
        info!(genre_id = id, name = %genre.name, "genre created");
        Ok(Genre::new(id, genre.name))
    }

    async fn update(&self, genre: Genre) -> StoreResult<Genre> {
        let mut genres = self.state.genres.write().await;
        if !genres.contains_key(&genre.id) {
            return Err(StoreError::NotFound(format!(
                "genre update for unknown id {}: {:?}",
                genre.id, genre
            )));
        }
        genres.insert(genre.id, genre.name.clone());
        info!(genre_id = genre.id, "genre updated");
        Ok(genre)
    }

    async fn delete(&self, genre: &Genre) -> StoreResult<Option<Genre>> {
        let removed = self.state.genres.write().await.remove(&genre.id);
        match removed {
            Some(name) => {
                // Cascade: films stop referencing the deleted genre.
                let mut films = self.state.films.write().await;
                for row in films.values_mut() {
                    row.genre_ids.remove(&genre.id);
                }
                info!(genre_id = genre.id, "genre deleted");
                Ok(Some(Genre::new(genre.id, name)))
            }
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: EntityId) -> StoreResult<Option<Genre>> {
        Ok(self
            .state
            .genres
            .read()
            .await
            .get(&id)
            .map(|name| Genre::new(id, name.clone())))
    }

    async fn find_all(&self) -> StoreResult<Vec<Genre>> {
        Ok(self
            .state
            .genres
            .read()
            .await
            .iter()
            .map(|(id, name)| Genre::new(*id, name.clone()))
            .collect())
    }

    async fn find_by_ids(&self, ids: &[EntityId]) -> StoreResult<Vec<Genre>> {
        let genres = self.state.genres.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| genres.get(id).map(|name| Genre::new(*id, name.clone())))
            .collect())
    }

    async fn find_first_n_top_rows(&self, n: i64) -> StoreResult<Vec<Genre>> {
        if n <= 0 {
            return Ok(Vec::new());
        }
        let counts = self.usage_counts().await;
        let mut genres = self.find_all().await?;
        genres.sort_by(|a, b| {
            let usage_a = counts.get(&a.id).copied().unwrap_or(0);
            let usage_b = counts.get(&b.id).copied().unwrap_or(0);
            usage_b.cmp(&usage_a).then(a.id.cmp(&b.id))
        });
        genres.truncate(n as usize);
        Ok(genres)
    }
}
