use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::email::Mailer;
use crate::render::PdfRenderer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Headless-browser PDF renderer. Trait object so tests can swap in a fake.
    pub renderer: Arc<dyn PdfRenderer>,
    /// Transactional email provider. Same seam as the renderer.
    pub mailer: Arc<dyn Mailer>,
}
