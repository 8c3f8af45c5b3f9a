//! Mindset Storage crate - SQLite persistence for profiles and history.
//!
//! Provides a WAL-mode SQLite database with migrations and the repository
//! implementations behind the ProfileStore and HistoryStore ports.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{HistoryRepository, ProfileRepository};
