//! HTTP surface for the Lore knowledge base.
//!
//! Exposes the [`KnowledgeCoordinator`](lore_knowledge::KnowledgeCoordinator)
//! as JSON endpoints under `/knowledge/`, each answering with an
//! [`ApiResponse`] envelope.

pub mod config;
pub mod routes;
pub mod server;

pub use config::LoreConfig;
pub use routes::ApiResponse;
pub use server::{build_router, build_state, serve, AppState, RequestSettings};
