// src/core/mod.rs
//! Infrastructure shared by the services: configuration, persistence, file
//! system, the language-model client and templates.

pub mod config_manager;
pub mod database;
pub mod fs_ops;
pub mod service_client;
pub mod template_engine;

pub use config_manager::AppConfig;
pub use database::Database;
pub use fs_ops::FsOps;
pub use template_engine::TemplateEngine;
