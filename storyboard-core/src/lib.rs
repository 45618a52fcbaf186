//! Core library for Storyboard.
//!
//! This crate provides the domain models and database operations for
//! Storyboard, independent of any transport layer (HTTP, WebSocket, etc.).
//!
//! # Usage
//!
//! ```no_run
//! use storyboard_core::db::Database;
//! use storyboard_core::models::*;
//!
//! let db = Database::open_default()?;
//! db.migrate()?;
//!
//! let projects = db.list_projects()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod db;
pub mod error;
pub mod models;

// Re-export commonly used types at crate root
pub use db::Database;
pub use error::StoreError;
