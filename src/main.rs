#[macro_use]
extern crate rocket;

mod accessors;
mod api;
mod auth;
mod backend;
mod database;
mod env;
mod error;
mod models;
mod state;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;
mod views;

use api::{
    api_create_director, api_dashboard, api_delete_director, api_demo_admin, api_edit_director,
    api_get_theme, api_landing, api_list_directors, api_login, api_logout, api_me, api_profile,
    api_set_theme, api_signup, api_toggle_director, api_update_director, health,
};
use auth::{SessionRegistry, unauthorized_api};
use backend::{RestBackend, SharedBackend, SqliteBackend};
use env::{BackendKind, BackendSettings};
use error::AppError;
use rocket::{Build, Rocket, tokio};
use state::AppState;
use std::sync::Arc;
use telemetry::{TelemetryFairing, init_tracing};
use thiserror::Error;
use tracing::{error, info};
use views::admin::forbidden_api;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Environment error: {0}")]
    Environment(String),
    #[error("Application error: {0}")]
    App(#[from] AppError),
    #[error("Launch failed: {0}")]
    Launch(#[from] rocket::Error),
}

#[rocket::main]
async fn main() -> Result<(), Error> {
    env::load_environment().map_err(|e| Error::Environment(e.to_string()))?;
    let _telemetry = init_tracing();

    let settings = BackendSettings::from_env()?;
    let backend = build_backend(&settings).await?;
    let state = AppState::new(backend);

    spawn_session_purge(state.backend.clone(), state.sessions.clone());

    init_rocket(state).await.launch().await?;
    Ok(())
}

async fn build_backend(settings: &BackendSettings) -> Result<SharedBackend, Error> {
    match &settings.kind {
        BackendKind::Sqlite { database_url } => {
            info!("Using SQLite backend");
            let pool = database::connect(database_url).await?;
            Ok(Arc::new(SqliteBackend::new(pool, settings.session_ttl())))
        }
        BackendKind::Remote {
            url,
            anon_key,
            service_role_key,
        } => {
            info!(url = %url, "Using remote backend");
            Ok(Arc::new(RestBackend::new(url, anon_key, service_role_key)?))
        }
    }
}

/// Drops expired sessions from the registry and the backend once an hour.
fn spawn_session_purge(backend: SharedBackend, sessions: Arc<SessionRegistry>) {
    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;

        loop {
            let closed = sessions.purge_expired().await;
            if closed > 0 {
                info!("Closed {} expired sessions", closed);
            }

            match backend.purge_expired_sessions().await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired backend sessions", count);
                    }
                }
                Err(e) => {
                    error!("Failed to clean expired sessions: {}", e);
                }
            }

            tokio::time::sleep(tokio::time::Duration::from_secs(3600)).await;
        }
    });
}

pub async fn init_rocket(state: AppState) -> Rocket<Build> {
    info!("Starting EduManage");

    rocket::build()
        .manage(state)
        .mount(
            "/api",
            routes![
                api_landing,
                api_login,
                api_signup,
                api_demo_admin,
                api_logout,
                api_me,
                api_profile,
                api_dashboard,
                api_get_theme,
                api_set_theme,
                api_list_directors,
                api_create_director,
                api_update_director,
                api_toggle_director,
                api_edit_director,
                api_delete_director,
            ],
        )
        .register("/api", catchers![unauthorized_api, forbidden_api])
        .mount("/api", routes![health])
        .attach(TelemetryFairing)
}
