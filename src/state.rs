use std::sync::Arc;

use crate::accessors::{DirectorsAccessor, ProfileAccessor};
use crate::auth::{SessionContext, SessionRegistry};
use crate::backend::SharedBackend;

/// Shared state managed by Rocket.
pub struct AppState {
    pub backend: SharedBackend,
    pub sessions: Arc<SessionRegistry>,
    pub directors: DirectorsAccessor,
}

impl AppState {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            directors: DirectorsAccessor::new(backend.clone()),
            sessions: Arc::new(SessionRegistry::new()),
            backend,
        }
    }

    /// A fresh profile accessor already loaded for `session`.
    pub async fn profile_for(&self, session: Option<&SessionContext>) -> ProfileAccessor {
        let mut accessor = ProfileAccessor::new(self.backend.clone());
        accessor.load_for(session).await;
        accessor
    }
}
