use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{EntityId, Genre, Rating};
use crate::error::{StoreError, StoreResult};

/// Nothing can predate the first public film screening.
static EARLIEST_RELEASE: Lazy<NaiveDate> =
    Lazy::new(|| NaiveDate::from_ymd_opt(1895, 12, 28).unwrap());

const MAX_DESCRIPTION_CHARS: usize = 200;

/// A film aggregate. `liked_by` is derived from Like edges on every read
/// and is ignored on write payloads; `genres` and `rating` are persisted
/// references.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Film {
    pub id: Option<EntityId>,
    pub name: String,
    pub description: String,
    pub release_date: NaiveDate,
    /// Running time in minutes.
    pub duration: i32,
    #[serde(default)]
    pub rating: Option<Rating>,
    #[serde(default)]
    pub genres: BTreeSet<Genre>,
    #[serde(default)]
    pub liked_by: BTreeSet<EntityId>,
}

impl Film {
    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }

    /// Field-level invariants. Offered to the service layer; the stores
    /// themselves accept whatever reaches them.
    pub fn validate(&self) -> StoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(StoreError::Validation("film name must not be blank".into()));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(StoreError::Validation(format!(
                "film description exceeds {} characters",
                MAX_DESCRIPTION_CHARS
            )));
        }
        if self.release_date < *EARLIEST_RELEASE {
            return Err(StoreError::Validation(format!(
                "release date {} predates the first film screening ({})",
                self.release_date, *EARLIEST_RELEASE
            )));
        }
        if self.duration <= 0 {
            return Err(StoreError::Validation(
                "film duration must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn film() -> Film {
        Film {
            id: None,
            name: "Arrival".to_string(),
            description: "A linguist decodes an alien language.".to_string(),
            release_date: NaiveDate::from_ymd_opt(2016, 11, 11).unwrap(),
            duration: 116,
            rating: None,
            genres: BTreeSet::new(),
            liked_by: BTreeSet::new(),
        }
    }

    #[test]
    fn test_valid_film_passes() {
        assert!(film().validate().is_ok());
    }

    #[test]
    fn test_release_date_floor_is_inclusive() {
        let mut f = film();
        f.release_date = NaiveDate::from_ymd_opt(1895, 12, 28).unwrap();
        assert!(f.validate().is_ok());

        f.release_date = NaiveDate::from_ymd_opt(1895, 12, 27).unwrap();
        assert!(f.validate().is_err());
    }

    #[test]
    fn test_description_length_limit() {
        let mut f = film();
        f.description = "d".repeat(200);
        assert!(f.validate().is_ok());

        f.description = "d".repeat(201);
        assert!(f.validate().is_err());
    }

    #[test]
    fn test_blank_name_and_nonpositive_duration_rejected() {
        let mut f = film();
        f.name = "   ".to_string();
        assert!(f.validate().is_err());

        let mut f = film();
        f.duration = 0;
        assert!(f.validate().is_err());
    }

    #[test]
    fn test_deserializes_from_api_shape() {
        let f: Film = serde_json::from_str(
            r#"{
                "id": null,
                "name": "Stalker",
                "description": "Three men walk into the Zone.",
                "release_date": "1979-05-25",
                "duration": 162,
                "rating": {"id": 4, "name": "R"},
                "genres": [{"id": 2, "name": "Drama"}]
            }"#,
        )
        .unwrap();
        assert_eq!(f.duration, 162);
        assert_eq!(f.genres.iter().next().unwrap().id, 2);
        assert!(f.liked_by.is_empty());
    }
}
