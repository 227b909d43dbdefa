use rocket::State;
use rocket::http::{Cookie, CookieJar, Status};
use rocket::serde::{Deserialize, Serialize, json::Json};
use serde_json::{Value, json};
use tracing::{debug, info};
use validator::Validate;

use crate::accessors::{Collection, DirectorDraft, DirectorMutation};
use crate::auth::{self, SESSION_COOKIE, SessionContext, SignUp, session_cookie, session_token};
use crate::error::AppError;
use crate::models::{Director, DirectorUpdate, Profile};
use crate::state::AppState;
use crate::validation::{
    ApiError, AppErrorExt, JsonValidateExt, PermissionCheckExt, ToValidationResponse, not_blank,
};
use crate::views::admin::{AdminSession, DirectorsConsole, directors_console};
use crate::views::dashboard::{DashboardPage, DashboardView, build_page};
use crate::views::landing::{LandingContent, landing_content};
use crate::views::theme::Theme;

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(custom(function = "not_blank", message = "Email is required"))]
    email: String,
    #[validate(custom(function = "not_blank", message = "Password is required"))]
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: Option<SessionContext>,
    pub error: Option<String>,
    pub redirect_url: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(custom(function = "not_blank", message = "Email is required"))]
    email: String,
    #[validate(custom(function = "not_blank", message = "Password is required"))]
    password: String,
    #[validate(custom(function = "not_blank", message = "First name is required"))]
    first_name: String,
    #[validate(custom(function = "not_blank", message = "Last name is required"))]
    last_name: String,
    #[validate(custom(function = "not_blank", message = "Phone number is required"))]
    phone_number: String,
    #[validate(custom(function = "not_blank", message = "School ID is required"))]
    school_id: String,
}

#[derive(Deserialize, Validate)]
pub struct CreateDirectorRequest {
    #[validate(custom(function = "not_blank", message = "First name is required"))]
    first_name: String,
    #[validate(custom(function = "not_blank", message = "Last name is required"))]
    last_name: String,
    #[validate(custom(function = "not_blank", message = "School name is required"))]
    school_name: String,
    #[validate(custom(function = "not_blank", message = "School ID is required"))]
    school_id: String,
    #[validate(custom(function = "not_blank", message = "Phone number is required"))]
    phone_number: String,
    #[validate(custom(function = "not_blank", message = "Password is required"))]
    password: String,
}

impl From<CreateDirectorRequest> for DirectorDraft {
    fn from(request: CreateDirectorRequest) -> Self {
        Self {
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            school_name: request.school_name.trim().to_string(),
            school_id: request.school_id.trim().to_string(),
            phone_number: request.phone_number.trim().to_string(),
            password: request.password,
        }
    }
}

#[derive(Serialize)]
pub struct MutationResponse<T> {
    pub success: bool,
    pub data: T,
    pub invalidated: &'static [Collection],
}

impl<T> MutationResponse<T> {
    fn new(mutation: DirectorMutation, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            invalidated: mutation.invalidates(),
        })
    }
}

#[derive(Serialize)]
pub struct ToggleResult {
    pub id: String,
    pub is_active: bool,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub loading: bool,
    pub profile: Option<Profile>,
}

#[derive(Serialize, Deserialize)]
pub struct ThemePreference {
    pub theme: Option<Theme>,
}

#[get("/health")]
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[get("/landing")]
pub async fn api_landing() -> Json<LandingContent> {
    Json(landing_content())
}

#[post("/login", data = "<login>")]
pub async fn api_login(
    login: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    state: &State<AppState>,
) -> Result<Json<LoginResponse>, ApiError> {
    let validated = login.validate_custom()?;

    match auth::sign_in(
        &state.backend,
        &state.sessions,
        &validated.email,
        &validated.password,
    )
    .await
    {
        Ok(session) => {
            cookies.add_private(session_cookie(&session));

            Ok(Json(LoginResponse {
                success: true,
                redirect_url: Some(session.role.landing_route().to_string()),
                user: Some(session),
                error: None,
            }))
        }
        Err(AppError::Authentication(msg)) => {
            info!(message = %msg, "Sign-in refused");
            Ok(Json(LoginResponse {
                success: false,
                user: None,
                error: Some("Invalid login credentials".to_string()),
                redirect_url: None,
            }))
        }
        Err(e) => Err(e.to_validation_response()),
    }
}

#[post("/signup", data = "<registration>")]
pub async fn api_signup(
    registration: Json<SignupRequest>,
    state: &State<AppState>,
) -> Result<(Status, Json<Value>), ApiError> {
    let validated = registration.validate_custom()?;

    let user = auth::sign_up(
        &state.backend,
        SignUp {
            email: validated.email,
            password: validated.password,
            first_name: validated.first_name,
            last_name: validated.last_name,
            phone_number: validated.phone_number,
            school_id: validated.school_id,
        },
    )
    .await
    .validate_custom()?;

    Ok((
        Status::Created,
        Json(json!({
            "success": true,
            "user_id": user.id,
            "message": "Compte créé avec succès",
        })),
    ))
}

#[post("/demo-admin")]
pub async fn api_demo_admin(state: &State<AppState>) -> Result<Json<Value>, ApiError> {
    auth::provision_demo_admin(&state.backend)
        .await
        .validate_custom()?;

    Ok(Json(json!({
        "success": true,
        "email": auth::DEMO_ADMIN_EMAIL,
        "school_id": auth::DEMO_SCHOOL_ID,
    })))
}

#[post("/logout")]
pub async fn api_logout(cookies: &CookieJar<'_>, state: &State<AppState>) -> Json<Value> {
    if let Some(token) = session_token(cookies) {
        auth::sign_out(&state.backend, &state.sessions, &token).await;
    }

    cookies.remove_private(Cookie::build(SESSION_COOKIE));

    Json(json!({
        "success": true,
        "message": "À bientôt !",
        "redirect_url": "/login",
    }))
}

#[get("/me")]
pub async fn api_me(session: SessionContext) -> Json<SessionContext> {
    Json(session)
}

#[get("/profile")]
pub async fn api_profile(
    session: SessionContext,
    state: &State<AppState>,
) -> Json<ProfileResponse> {
    let accessor = state.profile_for(Some(&session)).await;

    Json(ProfileResponse {
        loading: accessor.is_loading(),
        profile: accessor.into_profile(),
    })
}

#[get("/dashboard?<view>")]
pub async fn api_dashboard(
    view: Option<&str>,
    session: SessionContext,
    cookies: &CookieJar<'_>,
) -> Result<Json<DashboardPage>, ApiError> {
    let view = match view {
        Some(name) => name
            .parse::<DashboardView>()
            .map_err(|_| Status::NotFound.to_validation_response())?,
        None => DashboardView::Dashboard,
    };

    session
        .require_permission(view.required_permission())
        .validate_custom()?;

    Ok(Json(build_page(&session, view, Theme::from_cookies(cookies))))
}

#[get("/preferences/theme")]
pub async fn api_get_theme(cookies: &CookieJar<'_>) -> Json<ThemePreference> {
    Json(ThemePreference {
        theme: Some(Theme::from_cookies(cookies)),
    })
}

/// Sets the theme, or flips it when the body names none.
#[put("/preferences/theme", data = "<preference>")]
pub async fn api_set_theme(
    preference: Json<ThemePreference>,
    cookies: &CookieJar<'_>,
) -> Json<ThemePreference> {
    let theme = preference
        .into_inner()
        .theme
        .unwrap_or_else(|| Theme::from_cookies(cookies).toggled());
    theme.store(cookies);

    Json(ThemePreference { theme: Some(theme) })
}

#[get("/admin/directors?<search>")]
pub async fn api_list_directors(
    search: Option<&str>,
    admin: AdminSession,
    state: &State<AppState>,
) -> Json<DirectorsConsole> {
    debug!(admin_id = %admin.profile.id, search = ?search, "Listing directors");
    let rows = state.directors.refresh().await;
    Json(directors_console(&rows, search))
}

#[post("/admin/directors", data = "<request>")]
pub async fn api_create_director(
    request: Json<CreateDirectorRequest>,
    admin: AdminSession,
    state: &State<AppState>,
) -> Result<(Status, Json<MutationResponse<Director>>), ApiError> {
    let validated = request.validate_custom()?;

    let director = state
        .directors
        .create(&DirectorDraft::from(validated), &admin.session.user_id)
        .await
        .validate_custom()?;

    Ok((
        Status::Created,
        MutationResponse::new(DirectorMutation::Create, director),
    ))
}

#[patch("/admin/directors/<id>", data = "<update>")]
pub async fn api_update_director(
    id: &str,
    update: Json<DirectorUpdate>,
    _admin: AdminSession,
    state: &State<AppState>,
) -> Result<Json<MutationResponse<()>>, ApiError> {
    state
        .directors
        .update(id, &update.into_inner())
        .await
        .validate_custom()?;

    Ok(MutationResponse::new(DirectorMutation::Update, ()))
}

#[post("/admin/directors/<id>/toggle")]
pub async fn api_toggle_director(
    id: &str,
    _admin: AdminSession,
    state: &State<AppState>,
) -> Result<Json<MutationResponse<ToggleResult>>, ApiError> {
    let is_active = state.directors.toggle_status(id).await.validate_custom()?;

    Ok(MutationResponse::new(
        DirectorMutation::Toggle,
        ToggleResult {
            id: id.to_string(),
            is_active,
        },
    ))
}

#[post("/admin/directors/<id>/edit")]
pub async fn api_edit_director(id: &str, _admin: AdminSession) -> ApiError {
    info!(director_id = %id, "Director edit requested");
    Status::NotImplemented.to_validation_response()
}

#[delete("/admin/directors/<id>")]
pub async fn api_delete_director(
    id: &str,
    _admin: AdminSession,
    state: &State<AppState>,
) -> Result<Json<MutationResponse<()>>, ApiError> {
    state.directors.delete(id).await.validate_custom()?;

    Ok(MutationResponse::new(DirectorMutation::Delete, ()))
}
