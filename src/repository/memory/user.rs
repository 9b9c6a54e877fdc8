use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::{MemoryState, UserRow};
use crate::error::{StoreError, StoreResult};
use crate::model::{EntityId, User};
use crate::repository::Repository;

pub struct MemoryUserRepository {
    state: Arc<MemoryState>,
}

impl MemoryUserRepository {
    pub(crate) fn new(state: Arc<MemoryState>) -> Self {
        Self { state }
    }

    fn row_from_payload(id: EntityId, user: &User) -> UserRow {
        UserRow {
            id,
            email: user.email.clone(),
            login: user.login.clone(),
            name: user.name.clone(),
            birthday: user.birthday,
        }
    }

    /// Join a stored row with its friendship and like edges into a fresh
    /// aggregate.
    async fn assemble(&self, row: &UserRow) -> User {
        let friends = {
            let friendships = self.state.friendships.read().await;
            friendships
                .keys()
                .filter(|(user_id, _)| *user_id == row.id)
                .map(|(_, friend_id)| *friend_id)
                .collect()
        };

        let liked_films = {
            let likes = self.state.likes.read().await;
            likes
                .iter()
                .filter(|(user_id, _)| *user_id == row.id)
                .map(|(_, film_id)| *film_id)
                .collect()
        };

        User {
            id: Some(row.id),
            email: row.email.clone(),
            login: row.login.clone(),
            name: row.name.clone(),
            birthday: row.birthday,
            friends,
            liked_films,
        }
    }
}

#[async_trait]
impl Repository<User> for MemoryUserRepository {
    async fn save(&self, user: User) -> StoreResult<User> {
        let user = user.normalized();
        let id = self.state.user_ids.next_id();
        let row = Self::row_from_payload(id, &user);
        self.state.users.write().await.insert(id, row.clone());
        info!(user_id = id, login = %row.login, "user created");
        Ok(self.assemble(&row).await)
    }

    async fn update(&self, user: User) -> StoreResult<User> {
        let id = user.id.ok_or_else(|| {
            StoreError::NotFound(format!("user update without id: {:?}", user))
        })?;
        let user = user.normalized();

        let row = {
            let mut users = self.state.users.write().await;
            if !users.contains_key(&id) {
                return Err(StoreError::NotFound(format!(
                    "user update for unknown id {}: {:?}",
                    id, user
                )));
            }
            let row = Self::row_from_payload(id, &user);
            users.insert(id, row.clone());
            row
        };

        info!(user_id = id, "user updated");
        Ok(self.assemble(&row).await)
    }

    async fn delete(&self, user: &User) -> StoreResult<Option<User>> {
        let id = match user.id {
            Some(id) => id,
            None => return Ok(None),
        };

        let row = self.state.users.write().await.remove(&id);
        match row {
            Some(row) => {
                let deleted = self.assemble(&row).await;
                self.state
                    .friendships
                    .write()
                    .await
                    .retain(|(user_id, friend_id), _| *user_id != id && *friend_id != id);
                self.state
                    .likes
                    .write()
                    .await
                    .retain(|(user_id, _)| *user_id != id);
                info!(user_id = id, "user deleted");
                Ok(Some(deleted))
            }
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: EntityId) -> StoreResult<Option<User>> {
        let row = { self.state.users.read().await.get(&id).cloned() };
        match row {
            Some(row) => Ok(Some(self.assemble(&row).await)),
            None => Ok(None),
        }
    }

    async fn find_all(&self) -> StoreResult<Vec<User>> {
        let mut rows: Vec<UserRow> = { self.state.users.read().await.values().cloned().collect() };
        rows.sort_by_key(|row| row.id);

        let mut users = Vec::with_capacity(rows.len());
        for row in &rows {
            users.push(self.assemble(row).await);
        }
        Ok(users)
    }

    async fn find_by_ids(&self, ids: &[EntityId]) -> StoreResult<Vec<User>> {
        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = self.find_by_id(*id).await? {
                users.push(user);
            }
        }
        Ok(users)
    }

    async fn find_first_n_top_rows(&self, n: i64) -> StoreResult<Vec<User>> {
        if n <= 0 {
            return Ok(Vec::new());
        }
        let mut users = self.find_all().await?;
        users.sort_by(|a, b| {
            b.friends
                .len()
                .cmp(&a.friends.len())
                .then(a.id.cmp(&b.id))
        });
        users.truncate(n as usize);
        Ok(users)
    }
}
