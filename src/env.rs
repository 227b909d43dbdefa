use std::path::Path;

use tracing::{info, warn};

use crate::error::AppError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://edumanage.db?mode=rwc";

pub fn load_environment() -> Result<(), Box<dyn std::error::Error>> {
    let is_production =
        dotenvy::var("ROCKET_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    };

    for env_file in env_files {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        warn!("Warning: Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)?;
    info!("Loaded environment from: {}", path);
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    Sqlite {
        database_url: String,
    },
    Remote {
        url: String,
        anon_key: String,
        service_role_key: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    pub kind: BackendKind,
    pub session_ttl_hours: i64,
}

impl BackendSettings {
    pub fn from_env() -> Result<Self, AppError> {
        let session_ttl_hours = match std::env::var("SESSION_TTL_HOURS") {
            Ok(value) => value.trim().parse::<i64>().map_err(|_| {
                AppError::Validation(format!("SESSION_TTL_HOURS is not a number: {}", value))
            })?,
            Err(_) => 1,
        };

        let backend = std::env::var("EDUMANAGE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let kind = match backend.trim().to_lowercase().as_str() {
            "sqlite" => BackendKind::Sqlite {
                database_url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            },
            "remote" => BackendKind::Remote {
                url: required("SUPABASE_URL")?,
                anon_key: required("SUPABASE_ANON_KEY")?,
                service_role_key: required("SUPABASE_SERVICE_ROLE_KEY")?,
            },
            other => {
                return Err(AppError::Validation(format!(
                    "Unknown EDUMANAGE_BACKEND: {}",
                    other
                )));
            }
        };

        Ok(Self {
            kind,
            session_ttl_hours,
        })
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }
}

fn required(key: &str) -> Result<String, AppError> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::Validation(format!("{} must be set", key))),
    }
}
