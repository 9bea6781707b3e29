//! Command handlers for the Syllabus CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod chat;
pub mod courses;
pub mod ingest;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use courses::{ClearCommand, CoursesCommand};
pub use ingest::IngestCommand;
