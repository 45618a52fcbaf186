//! Storyboard: collaborative story tracking with agent runs and live presence.
//!
//! The transport layers over [`storyboard_core`]: the REST API (`api`), the
//! PRD Markdown renderer (`markdown`), and the presence room server (`party`).
//! One axum router serves both the HTTP and WebSocket surfaces.

pub mod api;
pub mod markdown;
pub mod party;
