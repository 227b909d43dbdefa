use tracing::{info, instrument, warn};

use super::{Role, SessionContext, SessionRegistry};
use crate::accessors::ProfileAccessor;
use crate::backend::{AuthUser, SharedBackend};
use crate::error::AppError;
use crate::models::{AccountMetadata, NewSchool};

pub const DEMO_ADMIN_EMAIL: &str = "admin@edumanage.com";
pub const DEMO_ADMIN_PASSWORD: &str = "admin2024";
pub const DEMO_SCHOOL_ID: &str = "EDU001";
pub const DEMO_SCHOOL_NAME: &str = "École Primaire Les Roses";

/// Public sign-up form, already checked for blank fields.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub school_id: String,
}

/// Signs in against the backend, loads the profile and opens a session.
///
/// A profile that fails to load does not block sign-in; the session falls
/// back to the account metadata for role and name.
#[instrument(skip(backend, registry, password))]
pub async fn sign_in(
    backend: &SharedBackend,
    registry: &SessionRegistry,
    email: &str,
    password: &str,
) -> Result<SessionContext, AppError> {
    let auth = backend.sign_in(email.trim(), password).await?;

    let mut profile = ProfileAccessor::new(backend.clone());
    profile.load(&auth.user.id).await;

    let context = registry.open(auth, profile.profile()).await;
    info!(user_id = %context.user_id, role = %context.role, "User signed in");

    Ok(context)
}

#[instrument(skip_all, fields(email = %form.email))]
pub async fn sign_up(backend: &SharedBackend, form: SignUp) -> Result<AuthUser, AppError> {
    let metadata = AccountMetadata {
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        phone_number: Some(form.phone_number.trim().to_string()),
        school_id: form.school_id.trim().to_string(),
        role: Role::Student,
    };

    let user = backend
        .sign_up(form.email.trim(), &form.password, &metadata)
        .await?;
    info!(user_id = %user.id, "Account created");

    Ok(user)
}

/// Makes sure the demo admin account and its school exist.
///
/// An already registered admin counts as success, so calling this twice is
/// harmless.
#[instrument(skip(backend))]
pub async fn provision_demo_admin(backend: &SharedBackend) -> Result<(), AppError> {
    let metadata = AccountMetadata {
        first_name: "Admin".to_string(),
        last_name: "EduManage".to_string(),
        phone_number: None,
        school_id: DEMO_SCHOOL_ID.to_string(),
        role: Role::Admin,
    };

    match backend
        .sign_up(DEMO_ADMIN_EMAIL, DEMO_ADMIN_PASSWORD, &metadata)
        .await
    {
        Ok(user) => info!(user_id = %user.id, "Demo admin created"),
        Err(e) if e.is_already_registered() => info!("Demo admin already registered"),
        Err(e) => return Err(e),
    }

    let existing = backend.fetch_school(DEMO_SCHOOL_ID).await?;
    backend
        .upsert_school(&NewSchool {
            school_id: DEMO_SCHOOL_ID.to_string(),
            school_name: DEMO_SCHOOL_NAME.to_string(),
            director_id: existing.and_then(|school| school.director_id),
        })
        .await
}

/// Removes the local session and tells the backend. A backend failure is
/// logged only; the local session is gone either way.
#[instrument(skip_all)]
pub async fn sign_out(
    backend: &SharedBackend,
    registry: &SessionRegistry,
    token: &str,
) -> Option<SessionContext> {
    let closed = registry.close(token).await?;

    if let Err(e) = backend.sign_out(&closed.backend_token).await {
        warn!(user_id = %closed.user_id, error = %e, "Backend sign-out failed");
    }

    Some(closed)
}
