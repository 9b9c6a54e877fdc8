// Filmgraph - relationship-aware repository layer for a social movie catalog

// Domain value types - films, users, reference rows, association edges
pub mod model;

// Repository contract and the two storage engines behind it
pub mod repository;

// Common utilities
pub mod config;
pub mod error;
pub mod ids;

// Re-exports for convenience
pub use config::Config;
pub use error::{StoreError, StoreResult};
pub use repository::{CatalogStore, FriendshipRepository, LikeRepository, Repository};
