use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tracing::info;

use super::MemoryState;
use crate::error::StoreResult;
use crate::model::{EntityId, Friendship, FriendshipStatus};
use crate::repository::FriendshipRepository;

pub struct MemoryFriendshipRepository {
    state: Arc<MemoryState>,
}

impl MemoryFriendshipRepository {
    pub(crate) fn new(state: Arc<MemoryState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl FriendshipRepository for MemoryFriendshipRepository {
    async fn add(&self, friendship: Friendship) -> StoreResult<Option<Friendship>> {
        let mut friendships = self.state.friendships.write().await;
        match friendships.entry(friendship.key()) {
            Entry::Occupied(_) => Ok(None),
            Entry::Vacant(slot) => {
                slot.insert(FriendshipStatus::Requested);
                info!(
                    user_id = friendship.user_id,
                    friend_id = friendship.friend_id,
                    "friendship requested"
                );
                Ok(Some(Friendship::requested(
                    friendship.user_id,
                    friendship.friend_id,
                )))
            }
        }
    }

    async fn remove(&self, friendship: &Friendship) -> StoreResult<Option<Friendship>> {
        let removed = self
            .state
            .friendships
            .write()
            .await
            .remove(&friendship.key());
        Ok(removed.map(|status| Friendship {
            user_id: friendship.user_id,
            friend_id: friendship.friend_id,
            status,
        }))
    }

    async fn exists(&self, friendship: &Friendship) -> StoreResult<bool> {
        Ok(self
            .state
            .friendships
            .read()
            .await
            .contains_key(&friendship.key()))
    }

    async fn find(
        &self,
        user_id: EntityId,
        friend_id: EntityId,
    ) -> StoreResult<Option<Friendship>> {
        Ok(self
            .state
            .friendships
            .read()
            .await
            .get(&(user_id, friend_id))
            .map(|status| Friendship {
                user_id,
                friend_id,
                status: *status,
            }))
    }

    async fn set_status(
        &self,
        user_id: EntityId,
        friend_id: EntityId,
        status: FriendshipStatus,
    ) -> StoreResult<Option<Friendship>> {
        let mut friendships = self.state.friendships.write().await;
        match friendships.entry((user_id, friend_id)) {
            Entry::Occupied(mut slot) => {
                slot.insert(status);
                Ok(Some(Friendship {
                    user_id,
                    friend_id,
                    status,
                }))
            }
            Entry::Vacant(_) => Ok(None),
        }
    }

    async fn for_user(&self, user_id: EntityId) -> StoreResult<Vec<Friendship>> {
        let friendships = self.state.friendships.read().await;
        let mut edges: Vec<Friendship> = friendships
            .iter()
            .filter(|((u, _), _)| *u == user_id)
            .map(|((u, f), status)| Friendship {
                user_id: *u,
                friend_id: *f,
                status: *status,
            })
            .collect();
        edges.sort_by_key(|f| f.friend_id);
        Ok(edges)
    }

    async fn delete_all_for_user(&self, user_id: EntityId) -> StoreResult<()> {
        self.state
            .friendships
            .write()
            .await
            .retain(|(u, f), _| *u != user_id && *f != user_id);
        Ok(())
    }
}
