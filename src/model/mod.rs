pub mod edge;
pub mod film;
pub mod reference;
pub mod user;

pub use edge::{Friendship, FriendshipStatus, Like};
pub use film::Film;
pub use reference::{Genre, Rating};
pub use user::User;

/// Surrogate key assigned by a store on first save. Never reused.
pub type EntityId = i64;
