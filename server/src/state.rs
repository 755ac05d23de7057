use std::sync::Arc;

use crate::auth::session::SessionStore;
use crate::services::Services;

/// Shared by every handler. Cloning is cheap: all members are handles.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(services: Services, sessions: SessionStore) -> Self {
        Self {
            services,
            sessions: Arc::new(sessions),
        }
    }
}
