//! CardForge Common Library
//!
//! Shared code for the CardForge service including:
//! - Database models, the store contract and its implementations
//! - Proposal generator abstraction
//! - Generation, acceptance, history and flashcard services
//! - Error types and handling
//! - Configuration management
//! - Caller identity extraction
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod dto;
pub mod errors;
pub mod extract;
pub mod generator;
pub mod metrics;
pub mod pagination;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{FlashcardStore, MemoryStore, Repository};
pub use errors::{AppError, Result};
pub use generator::ProposalGenerator;
pub use services::AppServices;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
