use std::sync::Arc;

use crate::backend::Backend;
use crate::config::Config;
use crate::i18n::Catalog;
use crate::mailer::Mailer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// BaaS access. `SupabaseClient` in production, an in-memory fake in tests.
    pub backend: Arc<dyn Backend>,
    pub mailer: Arc<dyn Mailer>,
    pub catalog: Arc<Catalog>,
    pub config: Config,
}
