//! Terminal host for the assistant client.
mod app;
mod commands;
mod host;
mod logging;
mod render;
mod settings;

pub use app::run_app;
