use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::auth::Role;
use crate::backend::SharedBackend;
use crate::error::AppError;
use crate::models::{
    AccountMetadata, Director, DirectorRow, DirectorUpdate, NewDirector, NewSchool, School,
};

/// Row collections a mutation can leave out of date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Directors,
    Schools,
    Profiles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectorMutation {
    Create,
    Update,
    Delete,
    Toggle,
}

impl DirectorMutation {
    pub fn invalidates(self) -> &'static [Collection] {
        match self {
            DirectorMutation::Create => &[
                Collection::Directors,
                Collection::Schools,
                Collection::Profiles,
            ],
            DirectorMutation::Update | DirectorMutation::Delete | DirectorMutation::Toggle => {
                &[Collection::Directors]
            }
        }
    }
}

/// Everything the admin supplies to create a director.
#[derive(Debug, Clone)]
pub struct DirectorDraft {
    pub first_name: String,
    pub last_name: String,
    pub school_name: String,
    pub school_id: String,
    pub phone_number: String,
    pub password: String,
}

/// `first.last@schoolid.edu`, lowercased with all whitespace removed.
///
/// Names containing spaces therefore map to a different address than a
/// plain lowercasing would give ("Jean Pierre" becomes `jeanpierre`, not
/// `jean pierre`). Accounts created by tools that only lowercase will not
/// match the address derived here.
pub fn derive_director_email(first_name: &str, last_name: &str, school_id: &str) -> String {
    let squash = |value: &str| -> String {
        value
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase()
    };

    format!(
        "{}.{}@{}.edu",
        squash(first_name),
        squash(last_name),
        squash(school_id)
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CreateStep {
    Account,
    School,
    Director,
}

impl CreateStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreateStep::Account => "account",
            CreateStep::School => "school",
            CreateStep::Director => "director",
        }
    }
}

impl fmt::Display for CreateStep {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Creating director failed at the {step} step: {source}")]
pub struct CreateDirectorError {
    pub step: CreateStep,
    #[source]
    pub source: AppError,
}

impl CreateDirectorError {
    fn at(step: CreateStep) -> impl FnOnce(AppError) -> Self {
        move |source| Self { step, source }
    }
}

/// Undo actions registered by completed create steps.
#[derive(Debug)]
enum Compensation {
    DeleteAccount(String),
    RestoreSchool(School),
    DeleteSchool(String),
}

#[derive(Debug)]
struct DirectorsCache {
    rows: Vec<DirectorRow>,
    settled: bool,
    stale: HashSet<Collection>,
}

impl Default for DirectorsCache {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            settled: false,
            stale: HashSet::from([Collection::Directors]),
        }
    }
}

/// Directors joined with profile and school, cached until a mutation
/// invalidates them.
pub struct DirectorsAccessor {
    backend: SharedBackend,
    cache: RwLock<DirectorsCache>,
}

impl DirectorsAccessor {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            cache: RwLock::new(DirectorsCache::default()),
        }
    }

    /// The cached list, re-read first when the directors collection is stale.
    ///
    /// Only reflects writes made through this accessor. Screens showing the
    /// table call [`DirectorsAccessor::refresh`] so rows written elsewhere
    /// appear.
    pub async fn list(&self) -> Vec<DirectorRow> {
        {
            let cache = self.cache.read().await;
            if !cache.stale.contains(&Collection::Directors) {
                return cache.rows.clone();
            }
        }

        self.refresh().await
    }

    /// Re-reads the directors collection. On failure the previous list stays
    /// and the collection remains stale.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Vec<DirectorRow> {
        let mut cache = self.cache.write().await;

        match self.backend.list_directors().await {
            Ok(rows) => {
                info!(count = rows.len(), "Directors loaded");
                cache.rows = rows;
                cache.stale.remove(&Collection::Directors);
            }
            Err(e) => e.log_and_record("Listing directors"),
        }
        cache.settled = true;

        cache.rows.clone()
    }

    pub async fn is_loading(&self) -> bool {
        !self.cache.read().await.settled
    }

    pub async fn stale_collections(&self) -> HashSet<Collection> {
        self.cache.read().await.stale.clone()
    }

    async fn invalidate(&self, mutation: DirectorMutation) {
        let mut cache = self.cache.write().await;
        cache.stale.extend(mutation.invalidates().iter().copied());
    }

    /// Runs account creation, school upsert and director insert in order.
    ///
    /// The first failing step stops the chain. Completed steps are then
    /// undone newest first, and the error still names the failing step.
    #[instrument(skip(self, draft), fields(school_id = %draft.school_id))]
    pub async fn create(
        &self,
        draft: &DirectorDraft,
        created_by: &str,
    ) -> Result<Director, CreateDirectorError> {
        let mut compensations = Vec::new();
        let result = self.run_create(draft, created_by, &mut compensations).await;

        match result {
            Ok(director) => {
                info!(director_id = %director.id, "Director created");
                self.invalidate(DirectorMutation::Create).await;
                Ok(director)
            }
            Err(err) => {
                err.source
                    .log_and_record(&format!("Create director ({} step)", err.step));
                if !compensations.is_empty() {
                    self.compensate(compensations).await;
                    self.invalidate(DirectorMutation::Create).await;
                }
                Err(err)
            }
        }
    }

    async fn run_create(
        &self,
        draft: &DirectorDraft,
        created_by: &str,
        compensations: &mut Vec<Compensation>,
    ) -> Result<Director, CreateDirectorError> {
        let email = derive_director_email(&draft.first_name, &draft.last_name, &draft.school_id);
        let metadata = AccountMetadata {
            first_name: draft.first_name.clone(),
            last_name: draft.last_name.clone(),
            phone_number: Some(draft.phone_number.clone()),
            school_id: draft.school_id.clone(),
            role: Role::Director,
        };

        let account = self
            .backend
            .create_account(&email, &draft.password, &metadata)
            .await
            .map_err(CreateDirectorError::at(CreateStep::Account))?;
        compensations.push(Compensation::DeleteAccount(account.id.clone()));

        let previous = self
            .backend
            .fetch_school(&draft.school_id)
            .await
            .map_err(CreateDirectorError::at(CreateStep::School))?;
        self.backend
            .upsert_school(&NewSchool {
                school_id: draft.school_id.clone(),
                school_name: draft.school_name.clone(),
                director_id: Some(account.id.clone()),
            })
            .await
            .map_err(CreateDirectorError::at(CreateStep::School))?;
        compensations.push(match previous {
            Some(school) => Compensation::RestoreSchool(school),
            None => Compensation::DeleteSchool(draft.school_id.clone()),
        });

        self.backend
            .insert_director(&NewDirector {
                user_id: Some(account.id),
                school_id: draft.school_id.clone(),
                created_by: Some(created_by.to_string()),
            })
            .await
            .map_err(CreateDirectorError::at(CreateStep::Director))
    }

    async fn compensate(&self, compensations: Vec<Compensation>) {
        for compensation in compensations.into_iter().rev() {
            let outcome = match &compensation {
                Compensation::DeleteAccount(user_id) => self.backend.delete_account(user_id).await,
                Compensation::RestoreSchool(school) => {
                    self.backend
                        .upsert_school(&NewSchool::from(school.clone()))
                        .await
                }
                Compensation::DeleteSchool(school_id) => {
                    self.backend.delete_school(school_id).await
                }
            };

            match outcome {
                Ok(()) => info!(?compensation, "Compensation applied"),
                Err(e) => warn!(?compensation, error = %e, "Compensation failed"),
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn update(&self, id: &str, update: &DirectorUpdate) -> Result<(), AppError> {
        if update.is_empty() {
            return Err(AppError::Validation("No fields to update".to_string()));
        }

        self.backend.update_director(id, update).await?;
        self.invalidate(DirectorMutation::Update).await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.backend.delete_director(id).await?;
        self.invalidate(DirectorMutation::Delete).await;
        Ok(())
    }

    /// Flips `is_active` and returns the new value.
    #[instrument(skip(self))]
    pub async fn toggle_status(&self, id: &str) -> Result<bool, AppError> {
        let current = self
            .refresh()
            .await
            .into_iter()
            .find(|row| row.director.id == id)
            .map(|row| row.director.is_active)
            .ok_or_else(|| AppError::NotFound(format!("Director {} not found", id)))?;

        let update = DirectorUpdate {
            is_active: Some(!current),
            school_id: None,
        };
        self.backend.update_director(id, &update).await?;
        self.invalidate(DirectorMutation::Toggle).await;

        Ok(!current)
    }
}
