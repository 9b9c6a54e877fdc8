use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::EntityId;
use crate::error::StoreError;

/// A user's like on a film. Pure set membership, no payload; the pair
/// either exists or it does not.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Like {
    pub user_id: EntityId,
    pub film_id: EntityId,
}

impl Like {
    pub fn new(user_id: EntityId, film_id: EntityId) -> Self {
        Self { user_id, film_id }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FriendshipStatus {
    Requested,
    Confirmed,
}

impl FriendshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendshipStatus::Requested => "REQUESTED",
            FriendshipStatus::Confirmed => "CONFIRMED",
        }
    }
}

impl FromStr for FriendshipStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REQUESTED" => Ok(FriendshipStatus::Requested),
            "CONFIRMED" => Ok(FriendshipStatus::Confirmed),
            other => Err(StoreError::Execution(format!(
                "unknown friendship status '{}'",
                other
            ))),
        }
    }
}

/// Directed friendship edge. Storage keys on the (user_id, friend_id)
/// pair; the status rides along and never restricts lookups.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Friendship {
    pub user_id: EntityId,
    pub friend_id: EntityId,
    pub status: FriendshipStatus,
}

impl Friendship {
    /// The edge as written by this layer: a fresh request.
    pub fn requested(user_id: EntityId, friend_id: EntityId) -> Self {
        Self {
            user_id,
            friend_id,
            status: FriendshipStatus::Requested,
        }
    }

    pub fn key(&self) -> (EntityId, EntityId) {
        (self.user_id, self.friend_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_storage_form() {
        for status in [FriendshipStatus::Requested, FriendshipStatus::Confirmed] {
            assert_eq!(status.as_str().parse::<FriendshipStatus>().unwrap(), status);
        }
        assert!("FROGGED".parse::<FriendshipStatus>().is_err());
    }
}
