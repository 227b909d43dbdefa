use tracing::{debug, instrument, warn};

use crate::auth::SessionContext;
use crate::backend::SharedBackend;
use crate::models::Profile;

/// Holds the profile row of one signed-in user.
///
/// Lives as long as the request or flow that created it; nothing is cached
/// beyond that.
pub struct ProfileAccessor {
    backend: SharedBackend,
    user_id: Option<String>,
    profile: Option<Profile>,
    loading: bool,
}

impl ProfileAccessor {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            user_id: None,
            profile: None,
            loading: true,
        }
    }

    /// Loads the profile for the session, or settles empty when signed out.
    pub async fn load_for(&mut self, session: Option<&SessionContext>) {
        match session {
            Some(session) => self.load(&session.user_id).await,
            None => {
                self.user_id = None;
                self.profile = None;
                self.loading = false;
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn load(&mut self, user_id: &str) {
        self.user_id = Some(user_id.to_string());
        self.loading = true;

        self.profile = match self.backend.fetch_profile(user_id).await {
            Ok(Some(profile)) => {
                debug!(role = %profile.role, "Profile loaded");
                Some(profile)
            }
            Ok(None) => {
                warn!("No profile row for user");
                None
            }
            Err(e) => {
                e.log_and_record("Fetching profile");
                None
            }
        };

        self.loading = false;
    }

    pub async fn refetch(&mut self) {
        if let Some(user_id) = self.user_id.clone() {
            self.load(&user_id).await;
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn into_profile(self) -> Option<Profile> {
        self.profile
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }
}
