//! API handlers module

pub mod error_logs;
pub mod flashcards;
pub mod generations;
pub mod health;
