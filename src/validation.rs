use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::instrument;
use validator::{Validate, ValidationError};

use crate::accessors::CreateDirectorError;
use crate::error::AppError;

pub type ApiError = Custom<Json<ValidationResponse>>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ValidationResponse {
    pub status: String,
    pub errors: HashMap<String, Vec<String>>,
}

impl ValidationResponse {
    pub fn new(errors: HashMap<String, Vec<String>>) -> Self {
        Self {
            status: "error".to_string(),
            errors,
        }
    }

    pub fn with_error(field: &str, message: &str) -> Self {
        let mut errors = HashMap::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        Self::new(errors)
    }
}

/// Required-field check: anything that is empty after trimming is missing.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

pub trait ToValidationResponse {
    fn to_validation_response(self) -> ApiError;
}

impl ToValidationResponse for AppError {
    #[instrument]
    fn to_validation_response(self) -> ApiError {
        self.log_and_record("API Validation Error");
        let status = self.status_code();

        let (field, message) = match &self {
            AppError::Database(db_err) => ("database", format!("Database error: {}", db_err)),
            AppError::Authentication(msg) => {
                ("authentication", format!("Authentication error: {}", msg))
            }
            AppError::Authorization(msg) => {
                ("authorization", format!("Permission denied: {}", msg))
            }
            AppError::NotFound(msg) => ("resource", format!("Not found: {}", msg)),
            AppError::Validation(msg) => ("request", msg.clone()),
            AppError::Conflict(msg) => ("email", msg.clone()),
            AppError::ExternalService(msg) => ("service", format!("Service error: {}", msg)),
            AppError::Internal(_) => ("server", "Internal server error".to_string()),
        };

        Custom(status, Json(ValidationResponse::with_error(field, &message)))
    }
}

impl ToValidationResponse for Status {
    #[instrument]
    fn to_validation_response(self) -> ApiError {
        let (field, message) = match self.code {
            403 => (
                "permission",
                "You don't have permission to perform this action",
            ),
            401 => ("authentication", "Authentication required"),
            404 => ("resource", "Resource not found"),
            409 => ("resource", "Resource already exists"),
            400 => ("request", "Bad request"),
            422 => ("validation", "Validation failed"),
            501 => ("feature", "Coming soon"),
            500 => ("server", "Internal server error"),
            503 => ("service", "Service unavailable"),
            _ => ("error", "An error occurred"),
        };

        Custom(self, Json(ValidationResponse::with_error(field, message)))
    }
}

/// The failing step is the error's field, so the form can say which part of
/// the creation went wrong.
impl ToValidationResponse for CreateDirectorError {
    fn to_validation_response(self) -> ApiError {
        let status = self.source.status_code();
        let message = self.to_string();

        Custom(
            status,
            Json(ValidationResponse::with_error(self.step.as_str(), &message)),
        )
    }
}

#[derive(Debug)]
pub struct ValidationErrorWrapper(pub validator::ValidationErrors);

impl From<ValidationErrorWrapper> for ApiError {
    #[instrument]
    fn from(wrapper: ValidationErrorWrapper) -> Self {
        let errors = wrapper.0;
        let mut error_map = HashMap::new();

        for (field, field_errors) in errors.field_errors() {
            let error_messages: Vec<String> = field_errors
                .iter()
                .map(|error| {
                    error
                        .message
                        .clone()
                        .unwrap_or_else(|| "Invalid value".into())
                        .to_string()
                })
                .collect();

            error_map.insert(field.to_string(), error_messages);
        }

        Custom(
            Status::UnprocessableEntity,
            Json(ValidationResponse::new(error_map)),
        )
    }
}

pub trait JsonValidateExt<T> {
    fn validate_custom(self) -> Result<T, ApiError>;
}

impl<T: Validate> JsonValidateExt<T> for Json<T> {
    fn validate_custom(self) -> Result<T, ApiError> {
        let inner = self.into_inner();
        inner
            .validate()
            .map_err(|e| ApiError::from(ValidationErrorWrapper(e)))?;
        Ok(inner)
    }
}

pub trait AppErrorExt<T> {
    fn validate_custom(self) -> Result<T, ApiError>;
}

impl<T> AppErrorExt<T> for Result<T, AppError> {
    fn validate_custom(self) -> Result<T, ApiError> {
        self.map_err(|e| e.to_validation_response())
    }
}

impl<T> AppErrorExt<T> for Result<T, CreateDirectorError> {
    fn validate_custom(self) -> Result<T, ApiError> {
        self.map_err(|e| e.to_validation_response())
    }
}

pub trait PermissionCheckExt<T> {
    fn validate_custom(self) -> Result<T, ApiError>;
}

impl<T> PermissionCheckExt<T> for Result<T, Status> {
    fn validate_custom(self) -> Result<T, ApiError> {
        self.map_err(|status| status.to_validation_response())
    }
}
