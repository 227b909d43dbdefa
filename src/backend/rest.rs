use chrono::{Duration, TimeZone, Utc};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{info, instrument};
use url::Url;

use super::{AuthSession, AuthUser, Backend};
use crate::error::AppError;
use crate::models::{
    AccountMetadata, Director, DirectorRow, DirectorUpdate, NewDirector, NewSchool, Profile,
    School,
};

const DIRECTOR_SELECT: &str = "*,profiles:user_id(first_name,last_name,phone_number),schools:school_id(school_name)";

/// Client for a Supabase-compatible deployment.
///
/// Auth calls that act for the public (sign-up, sign-in) carry the anon key;
/// admin account calls and every table call carry the service-role key, since
/// this service enforces its own role checks before reaching the backend.
#[derive(Debug, Clone)]
pub struct RestBackend {
    base_url: Url,
    anon_key: String,
    service_role_key: String,
    http_client: Client,
}

#[derive(Deserialize)]
struct SessionPayload {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

#[derive(Deserialize, Default)]
struct ErrorPayload {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    code: Option<Value>,
}

impl ErrorPayload {
    fn text(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .or(self.message.as_deref())
            .or(self.error_description.as_deref())
    }

    fn code(&self) -> Option<String> {
        self.error_code
            .clone()
            .or_else(|| match &self.code {
                Some(Value::String(code)) => Some(code.clone()),
                _ => None,
            })
            .or_else(|| self.error.clone())
    }
}

impl RestBackend {
    pub fn new(base_url: &str, anon_key: &str, service_role_key: &str) -> Result<Self, AppError> {
        let mut normalized = base_url.trim_end_matches('/').to_string();
        normalized.push('/');

        Ok(Self {
            base_url: Url::parse(&normalized)?,
            anon_key: anon_key.to_string(),
            service_role_key: service_role_key.to_string(),
            http_client: Client::new(),
        })
    }

    fn auth_url(&self, path: &str) -> Result<Url, AppError> {
        Ok(self.base_url.join("auth/v1/")?.join(path)?)
    }

    fn table_url(&self, table: &str, filters: &[(&str, String)]) -> Result<Url, AppError> {
        let mut url = self.base_url.join("rest/v1/")?.join(table)?;
        if !filters.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in filters {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, key: &str) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header("apikey", key)
            .header(AUTHORIZATION, format!("Bearer {}", key))
    }

    fn table_request(&self, method: Method, url: Url, prefer: Option<&'static str>) -> RequestBuilder {
        let mut headers = HeaderMap::new();
        if let Some(prefer) = prefer {
            headers.insert(
                HeaderName::from_static("prefer"),
                HeaderValue::from_static(prefer),
            );
        }
        self.request(method, url, &self.service_role_key)
            .headers(headers)
    }

    async fn send(request: RequestBuilder) -> Result<Response, AppError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());
        Err(Self::classify(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, AppError> {
        let response = Self::send(request).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    fn classify(status: StatusCode, body: &str) -> AppError {
        let payload: ErrorPayload = serde_json::from_str(body).unwrap_or_default();
        let message = payload.text().unwrap_or(body).to_string();
        let code = payload.code().unwrap_or_default();
        let lowered = message.to_lowercase();

        let already_registered = code == "user_already_exists"
            || code == "email_exists"
            || lowered.contains("already registered")
            || lowered.contains("already been registered");

        if already_registered {
            return AppError::Conflict(message);
        }

        match status {
            StatusCode::CONFLICT => AppError::Conflict(message),
            StatusCode::NOT_FOUND => AppError::NotFound(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Authorization(message),
            StatusCode::BAD_REQUEST if code == "invalid_grant" || code == "invalid_credentials" => {
                AppError::Authentication(message)
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                AppError::Validation(message)
            }
            _ => AppError::ExternalService(format!("{} ({})", message, status)),
        }
    }

    fn single_row<T>(rows: Vec<T>, what: &str) -> Result<T, AppError> {
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("{} not found", what)))
    }
}

#[rocket::async_trait]
impl Backend for RestBackend {
    #[instrument(skip_all, fields(email))]
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &AccountMetadata,
    ) -> Result<AuthUser, AppError> {
        info!("Signing up account");
        let payload = json!({
            "email": email,
            "password": password,
            "data": metadata,
        });

        let body: Value = Self::send_json(
            self.request(Method::POST, self.auth_url("signup")?, &self.anon_key)
                .json(&payload),
        )
        .await?;

        // With email confirmation on, GoTrue answers with the bare user.
        let user = match body.get("user") {
            Some(user) => user.clone(),
            None => body,
        };
        Ok(serde_json::from_value(user)?)
    }

    #[instrument(skip_all, fields(email))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        info!("Signing in account");
        let mut url = self.auth_url("token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let session: SessionPayload = Self::send_json(
            self.request(Method::POST, url, &self.anon_key)
                .json(&json!({ "email": email, "password": password })),
        )
        .await?;

        let expires_at = session
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(|| Utc::now() + Duration::seconds(session.expires_in.unwrap_or(3600)));

        Ok(AuthSession {
            access_token: session.access_token,
            expires_at,
            user: session.user,
        })
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        info!("Signing out session");
        Self::send(
            self.http_client
                .post(self.auth_url("logout")?)
                .header("apikey", &self.anon_key)
                .header(AUTHORIZATION, format!("Bearer {}", access_token)),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip_all, fields(email))]
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        metadata: &AccountMetadata,
    ) -> Result<AuthUser, AppError> {
        info!("Creating account through admin API");
        let payload = json!({
            "email": email,
            "password": password,
            "email_confirm": true,
            "user_metadata": metadata,
        });

        Self::send_json(
            self.request(
                Method::POST,
                self.auth_url("admin/users")?,
                &self.service_role_key,
            )
            .json(&payload),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_account(&self, user_id: &str) -> Result<(), AppError> {
        info!("Deleting account through admin API");
        let url = self.auth_url(&format!("admin/users/{}", user_id))?;
        Self::send(self.request(Method::DELETE, url, &self.service_role_key)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        info!("Fetching profile");
        let url = self.table_url(
            "profiles",
            &[("select", "*".to_string()), ("id", format!("eq.{}", user_id))],
        )?;
        let rows: Vec<Profile> = Self::send_json(self.table_request(Method::GET, url, None)).await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn fetch_school(&self, school_id: &str) -> Result<Option<School>, AppError> {
        let url = self.table_url(
            "schools",
            &[
                ("select", "*".to_string()),
                ("school_id", format!("eq.{}", school_id)),
            ],
        )?;
        let rows: Vec<School> = Self::send_json(self.table_request(Method::GET, url, None)).await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn upsert_school(&self, school: &NewSchool) -> Result<(), AppError> {
        info!("Upserting school");
        let url = self.table_url("schools", &[("on_conflict", "school_id".to_string())])?;
        Self::send(
            self.table_request(
                Method::POST,
                url,
                Some("resolution=merge-duplicates,return=minimal"),
            )
            .json(school),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_school(&self, school_id: &str) -> Result<(), AppError> {
        info!("Deleting school");
        let url = self.table_url("schools", &[("school_id", format!("eq.{}", school_id))])?;
        Self::send(self.table_request(Method::DELETE, url, Some("return=minimal"))).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_directors(&self) -> Result<Vec<DirectorRow>, AppError> {
        info!("Listing directors");
        let url = self.table_url(
            "directors",
            &[
                ("select", DIRECTOR_SELECT.to_string()),
                ("order", "created_at.desc".to_string()),
            ],
        )?;
        Self::send_json(self.table_request(Method::GET, url, None)).await
    }

    #[instrument(skip(self))]
    async fn insert_director(&self, director: &NewDirector) -> Result<Director, AppError> {
        info!("Inserting director");
        let url = self.table_url("directors", &[])?;
        let rows: Vec<Director> = Self::send_json(
            self.table_request(Method::POST, url, Some("return=representation"))
                .json(director),
        )
        .await?;
        Self::single_row(rows, "Inserted director")
    }

    #[instrument(skip(self))]
    async fn update_director(&self, id: &str, update: &DirectorUpdate) -> Result<(), AppError> {
        info!("Updating director");
        let url = self.table_url("directors", &[("id", format!("eq.{}", id))])?;
        let rows: Vec<Director> = Self::send_json(
            self.table_request(Method::PATCH, url, Some("return=representation"))
                .json(update),
        )
        .await?;
        Self::single_row(rows, &format!("Director {}", id)).map(|_| ())
    }

    #[instrument(skip(self))]
    async fn delete_director(&self, id: &str) -> Result<(), AppError> {
        info!("Deleting director");
        let url = self.table_url("directors", &[("id", format!("eq.{}", id))])?;
        let rows: Vec<Director> = Self::send_json(self.table_request(
            Method::DELETE,
            url,
            Some("return=representation"),
        ))
        .await?;
        Self::single_row(rows, &format!("Director {}", id)).map(|_| ())
    }
}
