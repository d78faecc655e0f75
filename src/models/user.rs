//! User account record.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};
use crate::models::Record;

/// A user account. `username` is unique and doubles as a lookup key.
///
/// `password` holds whatever credential digest the caller computed; hashing
/// happens outside this crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
}

impl Record for User {
    type Id = i64;

    const ENTITY: &'static str = "user";
    const COLLECTION: &'static str = "users";
    const ALIAS_FIELD: Option<&'static str> = Some("username");

    fn id(&self) -> Option<&i64> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn alias(&self) -> Option<&str> {
        Some(self.username.as_str()).filter(|u| !u.is_empty())
    }

    fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(ServiceError::Validation("username is required".into()));
        }
        if self.password.is_empty() {
            return Err(ServiceError::Validation("password is required".into()));
        }
        Ok(())
    }

    fn merge(&mut self, patch: Self) -> bool {
        let mut touched = false;
        if !patch.username.is_empty() {
            self.username = patch.username;
            touched = true;
        }
        if !patch.password.is_empty() {
            self.password = patch.password;
            touched = true;
        }
        touched
    }

    fn search_text(&self) -> String {
        self.username.clone()
    }

    // Credentials never reach the index.
    fn index_view(&self) -> Self {
        Self {
            password: String::new(),
            ..self.clone()
        }
    }
}
