//! Application state: the content catalog, the durable progress store, the
//! transient navigation session, and the AI gateway.
//!
//! Both mutable parts sit behind a mutex so there is exactly one writer at a
//! time. Handlers never hold a lock while waiting on the AI service.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::catalog::{Catalog, CatalogError};
use crate::config::{load_app_config_from_env, resolve_profile_path};
use crate::gateway::{AiGateway, GenerativeModel};
use crate::gemini::Gemini;
use crate::progress::{ProfileStorage, ProgressStore};
use crate::session::Session;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub progress: Arc<Mutex<ProgressStore>>,
    pub session: Arc<Mutex<Session>>,
    pub gateway: AiGateway,
}

impl AppState {
    /// Build state from env: load config, catalog, saved profile, and the Gemini client.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Result<Self, CatalogError> {
        // Load TOML config if provided (prompts, storage path, extra courses).
        let cfg_opt = load_app_config_from_env();
        let prompts = cfg_opt
            .as_ref()
            .map(|c| c.prompts.clone())
            .unwrap_or_default();

        let mut catalog = Catalog::builtin()?;
        if let Some(cfg) = &cfg_opt {
            catalog.extend(cfg.courses.clone());
        }
        for course in catalog.courses() {
            info!(target: "catalog", course = %course.id, chapters = course.chapters.len(), "Startup course inventory");
        }

        let storage = ProfileStorage::new(resolve_profile_path(cfg_opt.as_ref()));
        info!(target: "progress", path = %storage.path().display(), "Using profile storage");
        let store = ProgressStore::open(storage);

        // Build optional Gemini client (if API key present).
        let gemini = Gemini::from_env();
        if let Some(g) = &gemini {
            info!(target: "codebuddy_backend", base_url = %g.base_url, text_model = %g.text_model, speech_model = %g.speech_model, voice = %g.voice, "Gemini enabled.");
        } else {
            info!(target: "codebuddy_backend", "Gemini disabled (no GEMINI_API_KEY). AI features return placeholders.");
        }
        let model = gemini.map(|g| Arc::new(g) as Arc<dyn GenerativeModel>);

        Ok(Self::from_parts(catalog, store, AiGateway::new(model, prompts)))
    }

    /// Assemble state from ready-made parts. The session starts fresh.
    pub fn from_parts(catalog: Catalog, store: ProgressStore, gateway: AiGateway) -> Self {
        Self {
            catalog: Arc::new(catalog),
            progress: Arc::new(Mutex::new(store)),
            session: Arc::new(Mutex::new(Session::new())),
            gateway,
        }
    }
}
