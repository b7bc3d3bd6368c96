pub mod core;
pub mod forum;
pub mod main_module;
pub mod security;
#[cfg(test)]
pub mod tests;

pub use crate::core::config::AppConfig;
pub use crate::core::shared::state::AppState;
pub use crate::main_module::{build_router, run_axum_server};
