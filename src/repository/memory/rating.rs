use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::MemoryState;
use crate::error::{StoreError, StoreResult};
use crate::model::{EntityId, Rating};
use crate::repository::Repository;

pub struct MemoryRatingRepository {
    state: Arc<MemoryState>,
}

impl MemoryRatingRepository {
    pub(crate) fn new(state: Arc<MemoryState>) -> Self {
        Self { state }
    }

    async fn usage_counts(&self) -> HashMap<EntityId, usize> {
        let films = self.state.films.read().await;
        let mut counts = HashMap::new();
        for row in films.values() {
            if let Some(rating_id) = row.rating_id {
                *counts.entry(rating_id).or_insert(0) += 1;
            }
        }
        counts
    }
}

#[async_trait]
impl Repository<Rating> for MemoryRatingRepository {
    async fn save(&self, rating: Rating) -> StoreResult<Rating> {
        let id = self.state.rating_ids.next_id();
        self.state
            .ratings
            .write()
            .await
            .insert(id, rating.name.clone());
        info!(rating_id = id, name = %rating.name, "rating created");
        Ok(Rating::new(id, rating.name))
    }

    async fn update(&self, rating: Rating) -> StoreResult<Rating> {
        let mut ratings = self.state.ratings.write().await;
        if !ratings.contains_key(&rating.id) {
            return Err(StoreError::NotFound(format!(
                "rating update for unknown id {}: {:?}",
                rating.id, rating
            )));
        }
        ratings.insert(rating.id, rating.name.clone());
        info!(rating_id = rating.id, "rating updated");
        Ok(rating)
    }

    async fn delete(&self, rating: &Rating) -> StoreResult<Option<Rating>> {
        let removed = self.state.ratings.write().await.remove(&rating.id);
        match removed {
            Some(name) => {
                info!(rating_id = rating.id, "rating deleted");
                Ok(Some(Rating::new(rating.id, name)))
            }
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: EntityId) -> StoreResult<Option<Rating>> {
        Ok(self
            .state
            .ratings
            .read()
            .await
            .get(&id)
            .map(|name| Rating::new(id, name.clone())))
    }

    async fn find_all(&self) -> StoreResult<Vec<Rating>> {
        Ok(self
            .state
            .ratings
            .read()
            .await
            .iter()
            .map(|(id, name)| Rating::new(*id, name.clone()))
            .collect())
    }

    async fn find_by_ids(&self, ids: &[EntityId]) -> StoreResult<Vec<Rating>> {
        let ratings = self.state.ratings.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| ratings.get(id).map(|name| Rating::new(*id, name.clone())))
            .collect())
    }

    async fn find_first_n_top_rows(&self, n: i64) -> StoreResult<Vec<Rating>> {
        if n <= 0 {
            return Ok(Vec::new());
        }
        let counts = self.usage_counts().await;
        let mut ratings = self.find_all().await?;
        ratings.sort_by(|a, b| {
            let usage_a = counts.get(&a.id).copied().unwrap_or(0);
            let usage_b = counts.get(&b.id).copied().unwrap_or(0);
            usage_b.cmp(&usage_a).then(a.id.cmp(&b.id))
        });
        ratings.truncate(n as usize);
        Ok(ratings)
    }
}
