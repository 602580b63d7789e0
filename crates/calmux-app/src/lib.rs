//! Calmux HTTP application: router, handlers, middleware, and the
//! file-backed directory collaborator.

pub mod app;
pub mod config;
pub mod directory;
pub mod error;
pub mod middleware;
pub mod state;
