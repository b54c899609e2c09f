//! Wildcarder - seeded wildcard/template expansion for prompt text

pub mod engine;
pub mod error;
pub mod init;
pub mod paths;
pub mod processor;
pub mod resolver;
pub mod store;

pub use engine::Engine;
pub use error::{FixSuggestion, WildcardError};
pub use paths::SearchRoots;
pub use processor::{ProcessOutput, ProcessRequest, WildcardProcessor};
pub use resolver::{find_best_match, MatchScore};
pub use store::WildcardStore;
