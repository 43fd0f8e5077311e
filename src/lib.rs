//! # Mandate knowledge base
//!
//! A conversational assistant that answers questions about the Khoisan
//! First Nations mandate from a small corpus of posts, website copy and
//! the mandate text itself.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌───────────────┐
//! │ Connectors  │──▶│   Ingest    │──▶│ DocumentStore │
//! │ builtin/FS  │   │ Chunk+Embed │   │  (in memory)  │
//! └─────────────┘   └─────────────┘   └───────┬───────┘
//!                                             │
//!                 ┌───────────────────────────┤
//!                 ▼                           ▼
//!          ┌─────────────┐             ┌─────────────┐
//!          │  Retrieval  │────────────▶│  Composer   │──▶ reply
//!          │ override/KNN│             │ stage chain │
//!          └─────────────┘             └─────────────┘
//! ```
//!
//! The [`assistant::Assistant`] ties these together and keeps one
//! conversation state per session. The CLI (`kb`) and the HTTP
//! [`server`] are both thin layers over it.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`assistant`] | Host-facing entry point: respond, refresh, sessions |
//! | [`compose`] | Response composer and its stages |
//! | [`config`] | TOML configuration parsing |
//! | [`connector_builtin`] | Bundled corpus |
//! | [`connector_fs`] | Filesystem connector |
//! | [`embedding`] | Embedding providers and the lazily initialized embedder |
//! | [`generation`] | OpenRouter text generation |
//! | [`ingest`] | Batched embed-and-store |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`retrieval`] | Keyword override, similarity and first-K retrieval |
//! | [`scheduler`] | Periodic refresh |
//! | [`server`] | HTTP chat server |
//! | [`traits`] | Connector trait and registry |
//!
//! Models, chunking, the store, ranking, topics and conversation state
//! live in the `mandate-kb-core` crate.

pub mod assistant;
pub mod compose;
pub mod config;
pub mod connector_builtin;
pub mod connector_fs;
pub mod embedding;
pub mod generation;
pub mod ingest;
pub mod logging;
pub mod retrieval;
pub mod scheduler;
pub mod server;
pub mod traits;
