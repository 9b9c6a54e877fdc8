use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::EntityId;
use crate::error::{StoreError, StoreResult};

static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// A user aggregate. `friends` and `liked_films` are derived from the
/// association stores on every read and ignored on write payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Option<EntityId>,
    pub email: String,
    pub login: String,
    /// Display name. A blank name is replaced by the login when the store
    /// persists the user.
    #[serde(default)]
    pub name: String,
    pub birthday: NaiveDate,
    #[serde(default)]
    pub friends: BTreeSet<EntityId>,
    #[serde(default)]
    pub liked_films: BTreeSet<EntityId>,
}

impl User {
    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.login
        } else {
            &self.name
        }
    }

    /// Blank display names fall back to the login. Applied by both
    /// engines before a row is written.
    pub(crate) fn normalized(mut self) -> Self {
        if self.name.trim().is_empty() {
            self.name = self.login.clone();
        }
        self
    }

    /// Field-level invariants. Offered to the service layer; the stores
    /// themselves accept whatever reaches them.
    pub fn validate(&self) -> StoreResult<()> {
        if self.email.trim().is_empty() || !EMAIL_SHAPE.is_match(&self.email) {
            return Err(StoreError::Validation(format!(
                "'{}' is not a usable email address",
                self.email
            )));
        }
        if self.login.is_empty() || self.login.chars().any(char::is_whitespace) {
            return Err(StoreError::Validation(
                "login must be non-empty and free of whitespace".into(),
            ));
        }
        if self.birthday >= Utc::now().date_naive() {
            return Err(StoreError::Validation(
                "birthday must lie in the past".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: None,
            email: "ana@example.com".to_string(),
            login: "ana".to_string(),
            name: "Ana".to_string(),
            birthday: NaiveDate::from_ymd_opt(1990, 4, 2).unwrap(),
            friends: BTreeSet::new(),
            liked_films: BTreeSet::new(),
        }
    }

    #[test]
    fn test_valid_user_passes() {
        assert!(user().validate().is_ok());
    }

    #[test]
    fn test_email_shape_is_checked() {
        for bad in ["", "not-an-email", "a@b", "two @words.com"] {
            let mut u = user();
            u.email = bad.to_string();
            assert!(u.validate().is_err(), "accepted '{}'", bad);
        }
    }

    #[test]
    fn test_login_rejects_embedded_whitespace() {
        let mut u = user();
        u.login = "an a".to_string();
        assert!(u.validate().is_err());

        u.login = String::new();
        assert!(u.validate().is_err());
    }

    #[test]
    fn test_birthday_must_be_past() {
        let mut u = user();
        u.birthday = Utc::now().date_naive();
        assert!(u.validate().is_err());
    }

    #[test]
    fn test_blank_name_falls_back_to_login() {
        let mut u = user();
        u.name = "  ".to_string();
        assert_eq!(u.display_name(), "ana");
        assert_eq!(u.normalized().name, "ana");
    }
}
