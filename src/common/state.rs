// Application state shared across all modules

use std::sync::Arc;

use crate::common::config::AppConfig;
use crate::registry::RegistryClient;
use crate::session::{PendingSignIns, RefreshCoordinator, SessionRefresher, SessionStore};

/// Application state containing configuration and services
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub refresher: Arc<SessionRefresher>,
    pub sessions: Arc<dyn SessionStore>,
    pub coordinator: Arc<RefreshCoordinator>,
    pub pending_sign_ins: Arc<PendingSignIns>,
    pub registry: Arc<RegistryClient>,
}
