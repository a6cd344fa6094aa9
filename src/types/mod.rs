// src/types/mod.rs
pub mod profile;
pub mod response;
pub mod session;

pub use profile::{Certification, Education, Experience, Profile};
pub use session::{GenerationSession, SessionSummary};
