use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::MemoryState;
use crate::error::StoreResult;
use crate::model::{EntityId, Like};
use crate::repository::LikeRepository;

pub struct MemoryLikeRepository {
    state: Arc<MemoryState>,
}

impl MemoryLikeRepository {
    pub(crate) fn new(state: Arc<MemoryState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl LikeRepository for MemoryLikeRepository {
    async fn add(&self, like: Like) -> StoreResult<Option<Like>> {
        let inserted = self
            .state
            .likes
            .write()
            .await
            .insert((like.user_id, like.film_id));
        if inserted {
            info!(user_id = like.user_id, film_id = like.film_id, "like added");
            Ok(Some(like))
        } else {
            Ok(None)
        }
    }

    async fn remove(&self, like: &Like) -> StoreResult<Option<Like>> {
        let removed = self
            .state
            .likes
            .write()
            .await
            .remove(&(like.user_id, like.film_id));
        Ok(removed.then_some(*like))
    }

    async fn exists(&self, like: &Like) -> StoreResult<bool> {
        Ok(self
            .state
            .likes
            .read()
            .await
            .contains(&(like.user_id, like.film_id)))
    }

    async fn for_film(&self, film_id: EntityId) -> StoreResult<Vec<Like>> {
        let likes = self.state.likes.read().await;
        let mut edges: Vec<Like> = likes
            .iter()
            .filter(|(_, f)| *f == film_id)
            .map(|(u, f)| Like::new(*u, *f))
            .collect();
        edges.sort_by_key(|l| l.user_id);
        Ok(edges)
    }

    async fn for_user(&self, user_id: EntityId) -> StoreResult<Vec<Like>> {
        let likes = self.state.likes.read().await;
        let mut edges: Vec<Like> = likes
            .iter()
            .filter(|(u, _)| *u == user_id)
            .map(|(u, f)| Like::new(*u, *f))
            .collect();
        edges.sort_by_key(|l| l.film_id);
        Ok(edges)
    }

    async fn delete_all_for_film(&self, film_id: EntityId) -> StoreResult<()> {
        self.state
            .likes
            .write()
            .await
            .retain(|(_, f)| *f != film_id);
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: EntityId) -> StoreResult<()> {
        self.state
            .likes
            .write()
            .await
            .retain(|(u, _)| *u != user_id);
        Ok(())
    }
}
