pub mod auth;
pub mod cli;
pub mod core;
pub mod error;
pub mod fetcher;
pub mod generation;
pub mod logging;
pub mod profile_import;
pub mod renderer;
pub mod session_store;
pub mod types;
pub mod utils;
pub mod web;

pub use error::{CvResult, CvToolError};
pub use web::start_web_server;
