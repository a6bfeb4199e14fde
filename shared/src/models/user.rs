//! User account models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Password-free view of an account, safe to keep in a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Free text, normally `"lat,lng"`
    pub location: String,
}

/// A stored account including its password hash
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub profile: UserProfile,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn id(&self) -> Uuid {
        self.profile.id
    }

    pub fn email(&self) -> &str {
        &self.profile.email
    }
}

/// Signup form submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub password: String,
}

/// Login form submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Emails are unique regardless of case
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
