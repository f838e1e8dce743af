use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;
use crate::error::{Error, Result};
use crate::handlers::Payload;
use crate::ids::DocumentId;
use crate::repository::Resource;
use crate::validation::{not_blank, ValidationErrors, EMAIL_PATTERN};
use validator::Validate;

/// A registered account as stored, password hashed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    /// Lowercased, unique
    pub email: String,
    /// Argon2id PHC string
    pub password: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// A user as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

impl Resource for User {
    const COLLECTION: &'static str = "users";
    const LABEL: &'static str = "user";
    const ID_PREFIX: &'static str = "usr";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Validated registration, password still in clear text
#[derive(Clone, Validate)]
pub struct Registration {
    #[validate(custom(function = "not_blank", message = "Please add a name"))]
    pub name: String,
    #[validate(custom(function = "not_blank", message = "Please add an email"))]
    #[validate(regex(path = *EMAIL_PATTERN, code = "INVALID_FORMAT", message = "Please add a valid email"))]
    pub email: String,
    #[validate(custom(function = "not_blank", message = "Please add a password"))]
    #[validate(length(min = 6, code = "TOO_SHORT", message = "Password must be at least 6 characters"))]
    password: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Registration {
    pub fn from_payload(payload: &Payload) -> std::result::Result<Self, ValidationErrors> {
        let name = payload.trimmed("name").unwrap_or_default();
        let email = payload.trimmed("email").unwrap_or_default().to_lowercase();
        let password = payload.text("password").unwrap_or_default();

        let registration = Self { name, email, password };
        ValidationErrors::check("User", &registration)?;
        Ok(registration)
    }

    /// Hashes the password; CPU heavy, run off the async workers
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: DocumentId::generate(User::ID_PREFIX).into(),
            name: self.name,
            email: self.email,
            password: hash_password(&self.password)?,
            created_at: timestamp::now(),
        })
    }
}

/// Argon2id hash with a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("Failed to hash password: {e}")))
}

impl User {
    /// Whether `password` matches the stored hash
    pub fn verify_password(&self, password: &str) -> Result<bool> {
        let parsed = PasswordHash::new(&self.password)
            .map_err(|e| Error::Internal(format!("Invalid password hash: {e}")))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Internal(format!("Password verification failed: {e}"))),
        }
    }
}
