use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use rocket::Request;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::request::{FromRequest, Outcome};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{Instrument, info, warn};

use super::{Permission, Role};
use crate::backend::AuthSession;
use crate::error::AppError;
use crate::models::Profile;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session_token";

/// Everything the screens know about the signed-in user.
///
/// Created by [`SessionRegistry::open`] at sign-in and dropped by
/// [`SessionRegistry::close`] at sign-out; nothing else holds it.
#[derive(Debug, Clone, Serialize)]
pub struct SessionContext {
    #[serde(skip)]
    pub token: String,
    pub user_id: String,
    pub email: Option<String>,
    pub role: Role,
    pub display_name: String,
    pub school_id: String,
    pub login_time: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) backend_token: String,
}

impl SessionContext {
    pub fn is_valid(&self) -> bool {
        Utc::now() < self.expires_at
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.has_permission(permission)
    }

    pub fn require_permission(&self, permission: Permission) -> Result<(), Status> {
        if self.role.has_permission(permission) {
            Ok(())
        } else {
            warn!(
                user_id = %self.user_id,
                role = %self.role,
                permission = ?permission,
                "Permission denied"
            );
            Err(Status::Forbidden)
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionContext>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate_token() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect()
    }

    /// Opens a session for a backend sign-in. The profile, when it loaded,
    /// is authoritative for role and name; account metadata is the fallback.
    pub async fn open(&self, auth: AuthSession, profile: Option<&Profile>) -> SessionContext {
        let metadata = auth.user.account_metadata();

        let role = profile
            .map(|p| p.role)
            .or_else(|| auth.user.role_hint())
            .unwrap_or(Role::Student);

        let display_name = match (profile, &metadata) {
            (Some(profile), _) if !profile.display_name().is_empty() => profile.display_name(),
            (_, Some(meta)) if !meta.first_name.is_empty() || !meta.last_name.is_empty() => {
                format!("{} {}", meta.first_name, meta.last_name)
                    .trim()
                    .to_string()
            }
            _ => format!("Utilisateur {}", role),
        };

        let school_id = profile
            .map(|p| p.school_id.clone())
            .or_else(|| metadata.map(|m| m.school_id))
            .unwrap_or_default();

        let context = SessionContext {
            token: Self::generate_token(),
            user_id: auth.user.id,
            email: auth.user.email,
            role,
            display_name,
            school_id,
            login_time: Utc::now(),
            expires_at: auth.expires_at,
            backend_token: auth.access_token,
        };

        info!(user_id = %context.user_id, role = %context.role, "Session opened");
        self.sessions
            .write()
            .await
            .insert(context.token.clone(), context.clone());

        context
    }

    pub async fn get(&self, token: &str) -> Option<SessionContext> {
        let session = self.sessions.read().await.get(token).cloned()?;
        if session.is_valid() {
            Some(session)
        } else {
            warn!(user_id = %session.user_id, "Session expired");
            self.sessions.write().await.remove(token);
            None
        }
    }

    pub async fn close(&self, token: &str) -> Option<SessionContext> {
        let closed = self.sessions.write().await.remove(token);
        if let Some(session) = &closed {
            info!(user_id = %session.user_id, "Session closed");
        }
        closed
    }

    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.is_valid());
        before - sessions.len()
    }
}

pub fn session_cookie(context: &SessionContext) -> Cookie<'static> {
    let remaining = (context.expires_at - Utc::now()).num_seconds().max(0);
    Cookie::build((SESSION_COOKIE, context.token.clone()))
        .same_site(SameSite::Lax)
        .http_only(true)
        .max_age(rocket::time::Duration::seconds(remaining))
        .build()
}

pub fn session_token(cookies: &CookieJar<'_>) -> Option<String> {
    cookies
        .get_private(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SessionContext {
    type Error = AppError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        resolve_session(request)
            .instrument(tracing::info_span!("session_guard"))
            .await
    }
}

async fn resolve_session(request: &Request<'_>) -> Outcome<SessionContext, AppError> {
    let Some(token) = session_token(request.cookies()) else {
        return Outcome::Error((
            Status::Unauthorized,
            AppError::Authentication("No session cookie".to_string()),
        ));
    };

    let state = match request.rocket().state::<AppState>() {
        Some(state) => state,
        None => {
            tracing::error!("Application state not found in managed state");
            return Outcome::Error((
                Status::InternalServerError,
                AppError::Internal("Application state missing".to_string()),
            ));
        }
    };

    match state.sessions.get(&token).await {
        Some(session) => {
            tracing::debug!(user_id = %session.user_id, role = %session.role, "Session resolved");
            Outcome::Success(session)
        }
        None => {
            warn!("Unknown or expired session token");
            Outcome::Error((
                Status::Unauthorized,
                AppError::Authentication("Invalid session token".to_string()),
            ))
        }
    }
}

#[catch(401)]
pub fn unauthorized_api(_req: &Request) -> Custom<Json<Value>> {
    let error_json = json!({
        "error": "Unauthorized",
        "message": "Authentication required",
        "redirect_url": "/login"
    });

    Custom(Status::Unauthorized, Json(error_json))
}
