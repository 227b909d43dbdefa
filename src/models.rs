use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub school_id: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbProfile {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub school_id: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl TryFrom<DbProfile> for Profile {
    type Error = AppError;

    fn try_from(db: DbProfile) -> Result<Self, Self::Error> {
        let role = db
            .role
            .as_deref()
            .unwrap_or("student")
            .parse::<Role>()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok(Self {
            id: db.id.unwrap_or_default(),
            first_name: db.first_name.unwrap_or_default(),
            last_name: db.last_name.unwrap_or_default(),
            phone_number: db.phone_number,
            school_id: db.school_id.unwrap_or_default(),
            role,
            is_active: db.is_active.unwrap_or(true),
            created_at: to_utc(db.created_at),
            updated_at: to_utc(db.updated_at),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    pub school_id: String,
    pub school_name: String,
    pub director_id: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbSchool {
    pub school_id: Option<String>,
    pub school_name: Option<String>,
    pub director_id: Option<String>,
    pub is_active: Option<bool>,
}

impl From<DbSchool> for School {
    fn from(db: DbSchool) -> Self {
        Self {
            school_id: db.school_id.unwrap_or_default(),
            school_name: db.school_name.unwrap_or_default(),
            director_id: db.director_id,
            is_active: db.is_active.unwrap_or(true),
        }
    }
}

/// Upsert payload for `schools`, keyed by `school_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSchool {
    pub school_id: String,
    pub school_name: String,
    pub director_id: Option<String>,
}

impl From<School> for NewSchool {
    fn from(school: School) -> Self {
        Self {
            school_id: school.school_id,
            school_name: school.school_name,
            director_id: school.director_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Director {
    pub id: String,
    pub user_id: Option<String>,
    pub school_id: String,
    pub created_by: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectorProfile {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectorSchool {
    pub school_name: String,
}

/// A director joined with its profile (via `user_id`) and school (via `school_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectorRow {
    #[serde(flatten)]
    pub director: Director,
    #[serde(rename = "profiles", default)]
    pub profile: Option<DirectorProfile>,
    #[serde(rename = "schools", default)]
    pub school: Option<DirectorSchool>,
}

impl DirectorRow {
    pub fn first_name(&self) -> &str {
        self.profile.as_ref().map_or("", |p| p.first_name.as_str())
    }

    pub fn last_name(&self) -> &str {
        self.profile.as_ref().map_or("", |p| p.last_name.as_str())
    }

    pub fn phone_number(&self) -> Option<&str> {
        self.profile.as_ref().and_then(|p| p.phone_number.as_deref())
    }

    pub fn school_name(&self) -> &str {
        self.school.as_ref().map_or("", |s| s.school_name.as_str())
    }
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbDirectorRow {
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub school_id: Option<String>,
    pub created_by: Option<String>,
    pub is_active: Option<bool>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub school_name: Option<String>,
}

impl From<DbDirectorRow> for DirectorRow {
    fn from(db: DbDirectorRow) -> Self {
        // LEFT JOINs: a missing profile or school shows up as all-NULL columns
        let profile = match (db.first_name, db.last_name) {
            (None, None) => None,
            (first_name, last_name) => Some(DirectorProfile {
                first_name: first_name.unwrap_or_default(),
                last_name: last_name.unwrap_or_default(),
                phone_number: db.phone_number,
            }),
        };

        Self {
            director: Director {
                id: db.id.unwrap_or_default(),
                user_id: db.user_id,
                school_id: db.school_id.unwrap_or_default(),
                created_by: db.created_by,
                is_active: db.is_active.unwrap_or(true),
                created_at: to_utc(db.created_at),
                updated_at: to_utc(db.updated_at),
            },
            profile,
            school: db
                .school_name
                .map(|school_name| DirectorSchool { school_name }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDirector {
    pub user_id: Option<String>,
    pub school_id: String,
    pub created_by: Option<String>,
}

/// Field updates for one director row. `None` leaves the column alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectorUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_id: Option<String>,
}

impl DirectorUpdate {
    pub fn is_empty(&self) -> bool {
        self.is_active.is_none() && self.school_id.is_none()
    }
}

/// Metadata attached to a backend account at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountMetadata {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub school_id: String,
    pub role: Role,
}

fn default_active() -> bool {
    true
}

fn to_utc(value: Option<NaiveDateTime>) -> DateTime<Utc> {
    value
        .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
        .unwrap_or_else(Utc::now)
}
