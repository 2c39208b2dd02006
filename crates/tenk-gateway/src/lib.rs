//! HTTP front end: speech-to-text upload, supported languages, and dashboard
//! requests handed to the workflow worker, behind optional bearer auth.

mod error;
mod handlers;
mod languages;
mod queue;
mod router;
mod server;

pub use error::GatewayError;
pub use languages::{SUPPORTED_AUDIO_TYPES, SUPPORTED_LANGUAGES, resolve_language};
pub use queue::DashboardRequest;
pub use server::GatewayServer;
