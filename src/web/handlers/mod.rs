pub mod auth_handlers;
pub mod fetch_handlers;
pub mod generation_handlers;
pub mod profile_handlers;
pub mod system_handlers;

pub use auth_handlers::*;
pub use fetch_handlers::*;
pub use generation_handlers::*;
pub use profile_handlers::*;
pub use system_handlers::*;
