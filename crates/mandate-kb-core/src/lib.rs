//! # Mandate KB Core
//!
//! Runtime-agnostic logic for the mandate knowledge base: data models,
//! chunking, the in-memory document store, similarity ranking, topic
//! detection, per-session conversation state, and the capability traits
//! for embedding and text generation backends.
//!
//! This crate contains no tokio, HTTP client, or filesystem I/O. Concrete
//! providers, connectors and the response pipeline live in the `mandate-kb`
//! application crate.

pub mod chunk;
pub mod conversation;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod models;
pub mod search;
pub mod store;
pub mod topic;
