// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod broadcast;
pub mod config;
pub mod engine;
pub mod estimator;
pub mod events;
pub mod feedback;
pub mod heatmap;
pub mod history;
pub mod protocol;
pub mod runtime;
pub mod store;
