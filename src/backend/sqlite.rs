use chrono::{Duration, NaiveDateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{AuthSession, AuthUser, Backend};
use crate::error::AppError;
use crate::models::{
    AccountMetadata, DbDirectorRow, DbProfile, DbSchool, Director, DirectorRow, DirectorUpdate,
    NewDirector, NewSchool, Profile, School,
};

#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: Pool<Sqlite>,
    session_ttl: Duration,
}

#[derive(sqlx::FromRow)]
struct DbAccount {
    id: String,
    email: String,
    password: String,
    metadata: String,
}

/// A concurrent sign-up can slip past the email lookup and hit the unique
/// index instead; that is still an "already registered" failure.
pub(crate) fn conflict_on_duplicate(error: sqlx::Error, email: &str) -> AppError {
    match error {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(format!("User already registered: {}", email))
        }
        other => AppError::Database(other),
    }
}

impl SqliteBackend {
    pub fn new(pool: Pool<Sqlite>, session_ttl: Duration) -> Self {
        Self { pool, session_ttl }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub fn generate_token() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(48)
            .map(char::from)
            .collect()
    }

    #[instrument(skip_all, fields(email))]
    async fn insert_account(
        &self,
        email: &str,
        password: &str,
        metadata: &AccountMetadata,
    ) -> Result<AuthUser, AppError> {
        info!("Creating account");
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_scalar::<_, String>("SELECT id FROM accounts WHERE email = ?")
            .bind(email)
            .fetch_optional(&mut *tx)
            .await?;

        if existing.is_some() {
            return Err(AppError::Conflict(format!(
                "User already registered: {}",
                email
            )));
        }

        let id = Uuid::new_v4().to_string();
        let hashed_password = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
        let metadata_json = serde_json::to_value(metadata)?;
        let now = Utc::now().naive_utc();

        sqlx::query(
            "INSERT INTO accounts (id, email, password, metadata, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(email)
        .bind(hashed_password)
        .bind(metadata_json.to_string())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_duplicate(e, email))?;

        // Stands in for the hosted backend's on-signup trigger.
        sqlx::query(
            "INSERT INTO profiles
             (id, first_name, last_name, phone_number, school_id, role, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, TRUE, ?, ?)",
        )
        .bind(&id)
        .bind(&metadata.first_name)
        .bind(&metadata.last_name)
        .bind(&metadata.phone_number)
        .bind(&metadata.school_id)
        .bind(metadata.role.as_str())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AuthUser {
            id,
            email: Some(email.to_string()),
            metadata: metadata_json,
        })
    }

    #[instrument(skip(self, token))]
    async fn create_session(
        &self,
        account_id: &str,
        token: &str,
        expires_at: NaiveDateTime,
    ) -> Result<i64, AppError> {
        info!("Creating user session");

        let res = sqlx::query(
            "INSERT INTO user_sessions (account_id, token, expires_at) VALUES (?, ?, ?)",
        )
        .bind(account_id)
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(res.last_insert_rowid())
    }
}

#[rocket::async_trait]
impl Backend for SqliteBackend {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &AccountMetadata,
    ) -> Result<AuthUser, AppError> {
        self.insert_account(email, password, metadata).await
    }

    #[instrument(skip_all, fields(email))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        info!("Authenticating account");
        let account = sqlx::query_as::<_, DbAccount>(
            "SELECT id, email, password, metadata FROM accounts WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let account = match account {
            Some(account) if bcrypt::verify(password, &account.password).unwrap_or(false) => {
                account
            }
            _ => {
                return Err(AppError::Authentication(
                    "Invalid login credentials".to_string(),
                ));
            }
        };

        let token = Self::generate_token();
        let expires_at = Utc::now() + self.session_ttl;
        self.create_session(&account.id, &token, expires_at.naive_utc())
            .await?;

        Ok(AuthSession {
            access_token: token,
            expires_at,
            user: AuthUser {
                id: account.id,
                email: Some(account.email),
                metadata: serde_json::from_str(&account.metadata).unwrap_or_default(),
            },
        })
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        info!("Invalidating session");

        sqlx::query("DELETE FROM user_sessions WHERE token = ?")
            .bind(access_token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        metadata: &AccountMetadata,
    ) -> Result<AuthUser, AppError> {
        self.insert_account(email, password, metadata).await
    }

    #[instrument(skip(self))]
    async fn delete_account(&self, user_id: &str) -> Result<(), AppError> {
        info!("Deleting account");
        let res = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Account {} not found", user_id)));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        info!("Fetching profile");
        let row = sqlx::query_as::<_, DbProfile>(
            "SELECT id, first_name, last_name, phone_number, school_id, role, is_active, created_at, updated_at
             FROM profiles WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Profile::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn fetch_school(&self, school_id: &str) -> Result<Option<School>, AppError> {
        let row = sqlx::query_as::<_, DbSchool>(
            "SELECT school_id, school_name, director_id, is_active FROM schools WHERE school_id = ?",
        )
        .bind(school_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(School::from))
    }

    #[instrument(skip(self))]
    async fn upsert_school(&self, school: &NewSchool) -> Result<(), AppError> {
        info!("Upserting school");
        sqlx::query(
            "INSERT INTO schools (school_id, school_name, director_id) VALUES (?, ?, ?)
             ON CONFLICT (school_id) DO UPDATE
             SET school_name = excluded.school_name, director_id = excluded.director_id",
        )
        .bind(&school.school_id)
        .bind(&school.school_name)
        .bind(&school.director_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_school(&self, school_id: &str) -> Result<(), AppError> {
        info!("Deleting school");
        sqlx::query("DELETE FROM schools WHERE school_id = ?")
            .bind(school_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_directors(&self) -> Result<Vec<DirectorRow>, AppError> {
        info!("Listing directors");
        let rows = sqlx::query_as::<_, DbDirectorRow>(
            "SELECT d.id, d.user_id, d.school_id, d.created_by, d.is_active, d.created_at, d.updated_at,
                    p.first_name, p.last_name, p.phone_number, s.school_name
             FROM directors d
             LEFT JOIN profiles p ON p.id = d.user_id
             LEFT JOIN schools s ON s.school_id = d.school_id
             ORDER BY d.created_at DESC, d.rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DirectorRow::from).collect())
    }

    #[instrument(skip(self))]
    async fn insert_director(&self, director: &NewDirector) -> Result<Director, AppError> {
        info!("Inserting director");
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO directors (id, user_id, school_id, created_by, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, TRUE, ?, ?)",
        )
        .bind(&id)
        .bind(&director.user_id)
        .bind(&director.school_id)
        .bind(&director.created_by)
        .bind(now.naive_utc())
        .bind(now.naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(Director {
            id,
            user_id: director.user_id.clone(),
            school_id: director.school_id.clone(),
            created_by: director.created_by.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    #[instrument(skip(self))]
    async fn update_director(&self, id: &str, update: &DirectorUpdate) -> Result<(), AppError> {
        info!("Updating director");
        let now = Utc::now().naive_utc();
        let res = sqlx::query(
            "UPDATE directors
             SET is_active = COALESCE(?, is_active),
                 school_id = COALESCE(?, school_id),
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(update.is_active)
        .bind(&update.school_id)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if res.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Director {} not found", id)));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_director(&self, id: &str) -> Result<(), AppError> {
        info!("Deleting director");
        let res = sqlx::query("DELETE FROM directors WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Director {} not found", id)));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn purge_expired_sessions(&self) -> Result<u64, AppError> {
        info!("Cleaning expired sessions");

        let now = Utc::now().naive_utc();

        let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
