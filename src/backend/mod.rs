//! The backend-as-a-service seam: accounts, sessions and the three row
//! collections (`profiles`, `schools`, `directors`).
//!
//! [`SqliteBackend`] keeps everything in a local SQLite file and is what the
//! test-suite runs against. [`RestBackend`] talks to a Supabase-compatible
//! deployment (GoTrue under `/auth/v1`, PostgREST under `/rest/v1`).

pub mod rest;
pub mod sqlite;

pub use rest::RestBackend;
pub use sqlite::SqliteBackend;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::Role;
use crate::error::AppError;
use crate::models::{
    AccountMetadata, Director, DirectorRow, DirectorUpdate, NewDirector, NewSchool, Profile,
    School,
};

/// An authenticated identity as the backend reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    #[serde(rename = "user_metadata", default)]
    pub metadata: serde_json::Value,
}

impl AuthUser {
    pub fn account_metadata(&self) -> Option<AccountMetadata> {
        serde_json::from_value(self.metadata.clone()).ok()
    }

    pub fn role_hint(&self) -> Option<Role> {
        self.metadata.get("role")?.as_str()?.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

#[rocket::async_trait]
pub trait Backend: Send + Sync {
    /// Public sign-up. Fails with [`AppError::Conflict`] when the email is taken.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &AccountMetadata,
    ) -> Result<AuthUser, AppError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AppError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError>;

    /// Privileged account creation, email pre-confirmed.
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        metadata: &AccountMetadata,
    ) -> Result<AuthUser, AppError>;

    async fn delete_account(&self, user_id: &str) -> Result<(), AppError>;

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError>;

    async fn fetch_school(&self, school_id: &str) -> Result<Option<School>, AppError>;

    async fn upsert_school(&self, school: &NewSchool) -> Result<(), AppError>;

    async fn delete_school(&self, school_id: &str) -> Result<(), AppError>;

    /// All directors with their joined profile and school, newest first.
    async fn list_directors(&self) -> Result<Vec<DirectorRow>, AppError>;

    async fn insert_director(&self, director: &NewDirector) -> Result<Director, AppError>;

    async fn update_director(&self, id: &str, update: &DirectorUpdate) -> Result<(), AppError>;

    async fn delete_director(&self, id: &str) -> Result<(), AppError>;

    /// Drops expired backend sessions, returning how many went away.
    async fn purge_expired_sessions(&self) -> Result<u64, AppError> {
        Ok(0)
    }
}

pub type SharedBackend = Arc<dyn Backend>;
