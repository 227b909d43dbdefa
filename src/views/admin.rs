use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::accessors::ProfileAccessor;
use crate::auth::{Role, SessionContext};
use crate::error::AppError;
use crate::models::{DirectorRow, Profile};
use crate::state::AppState;

/// Who gets to see the admin console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "target", rename_all = "lowercase")]
pub enum AdminGate {
    /// Profile unknown: show the "unauthorized" placeholder and no data.
    Pending,
    Authorized,
    Redirect(&'static str),
}

impl AdminGate {
    pub fn evaluate(profile: &ProfileAccessor) -> Self {
        if profile.is_loading() {
            return AdminGate::Pending;
        }

        match profile.profile().map(|p| p.role) {
            None => AdminGate::Pending,
            Some(Role::Admin) => AdminGate::Authorized,
            Some(Role::Director | Role::Teacher | Role::Student) => {
                AdminGate::Redirect("/dashboard")
            }
        }
    }
}

/// A signed-in session whose profile passed the admin gate.
pub struct AdminSession {
    pub session: SessionContext,
    pub profile: Profile,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminSession {
    type Error = AppError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let session = match request.guard::<SessionContext>().await {
            Outcome::Success(session) => session,
            Outcome::Error(e) => return Outcome::Error(e),
            Outcome::Forward(status) => return Outcome::Forward(status),
        };

        let Some(state) = request.rocket().state::<AppState>() else {
            return Outcome::Error((
                Status::InternalServerError,
                AppError::Internal("Application state missing".to_string()),
            ));
        };

        let accessor = state.profile_for(Some(&session)).await;
        let gate = *request.local_cache(|| AdminGate::evaluate(&accessor));

        match (gate, accessor.into_profile()) {
            (AdminGate::Authorized, Some(profile)) => {
                Outcome::Success(AdminSession { session, profile })
            }
            (gate, _) => {
                warn!(user_id = %session.user_id, ?gate, "Admin console refused");
                Outcome::Error((
                    Status::Forbidden,
                    AppError::Authorization("Admin access required".to_string()),
                ))
            }
        }
    }
}

#[catch(403)]
pub fn forbidden_api(req: &Request) -> Custom<Json<Value>> {
    let gate = *req.local_cache(|| AdminGate::Pending);

    let error_json = match gate {
        AdminGate::Redirect(target) => json!({
            "error": "Forbidden",
            "message": "Admin access required",
            "gate": gate,
            "redirect_url": target
        }),
        AdminGate::Pending | AdminGate::Authorized => json!({
            "error": "Forbidden",
            "message": "unauthorized",
            "gate": gate
        }),
    };

    Custom(Status::Forbidden, Json(error_json))
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectorTableRow {
    pub id: String,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub school_name: String,
    pub school_id: String,
    pub phone_number: Option<String>,
    pub is_active: bool,
    pub status_label: &'static str,
}

impl From<&DirectorRow> for DirectorTableRow {
    fn from(row: &DirectorRow) -> Self {
        Self {
            id: row.director.id.clone(),
            display_name: format!("{} {}", row.first_name(), row.last_name())
                .trim()
                .to_string(),
            first_name: row.first_name().to_string(),
            last_name: row.last_name().to_string(),
            school_name: row.school_name().to_string(),
            school_id: row.director.school_id.clone(),
            phone_number: row.phone_number().map(str::to_string),
            is_active: row.director.is_active,
            status_label: if row.director.is_active {
                "Actif"
            } else {
                "Inactif"
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectorsConsole {
    pub search: String,
    pub count: usize,
    pub directors: Vec<DirectorTableRow>,
}

/// Case-insensitive substring match on first name, last name, school name
/// and school id. A blank term matches everything.
pub fn filter_directors<'a>(rows: &'a [DirectorRow], search: &str) -> Vec<&'a DirectorRow> {
    let term = search.trim().to_lowercase();
    if term.is_empty() {
        return rows.iter().collect();
    }

    rows.iter()
        .filter(|row| {
            [
                row.first_name(),
                row.last_name(),
                row.school_name(),
                row.director.school_id.as_str(),
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
        })
        .collect()
}

pub fn directors_console(rows: &[DirectorRow], search: Option<&str>) -> DirectorsConsole {
    let search = search.unwrap_or_default();
    let directors: Vec<DirectorTableRow> = filter_directors(rows, search)
        .into_iter()
        .map(DirectorTableRow::from)
        .collect();

    DirectorsConsole {
        search: search.to_string(),
        count: directors.len(),
        directors,
    }
}
