//! Configuration, question decomposition, retrieval fan-out, and dashboard rendering.

pub mod bootstrap;
pub mod config;
pub mod coordinator;
pub mod dashboard;
pub mod decompose;
pub mod pipeline;
pub mod vault;
pub mod workflow;

pub use bootstrap::AppBuilder;
pub use config::Config;
pub use pipeline::{Dashboard, WorkflowError};
pub use workflow::Workflow;
