//! CodeBuddy backend: course catalog, local practice checking, persisted
//! learner progress, navigation session, and an AI gateway with safe fallbacks.

pub mod audio;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod gateway;
pub mod gemini;
pub mod logic;
pub mod progress;
pub mod protocol;
pub mod routes;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod util;
pub mod validation;

pub use routes::build_router;
pub use state::AppState;
