//! # knowledge-agent
//!
//! A local RAG knowledge base: ingest web pages, YouTube transcripts,
//! and documents (PDF, DOCX, plain text) into a SQLite-backed vector
//! store, then answer questions with citations by retrieving the most
//! similar chunks and forwarding them to the OpenAI chat API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────┐
//! │   Loaders    │──▶│   Pipeline    │──▶│  SQLite    │
//! │ web/yt/file  │   │ Chunk+Embed  │   │  vectors  │
//! └──────────────┘   └──────────────┘   └─────┬─────┘
//!                                             │
//!                         ┌───────────────────┤
//!                         ▼                   ▼
//!                    ┌──────────┐       ┌──────────┐
//!                    │   CLI    │       │   HTTP   │
//!                    │   (ka)   │       │   (UI)   │
//!                    └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ka init                                        # create database
//! ka ingest web https://example.com/article      # ingest a page
//! ka ingest file ./paper.pdf                     # ingest a document
//! ka ask "What does the article conclude?"       # cited answer
//! ka serve                                       # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration with documented defaults |
//! | [`models`] | Core data types |
//! | [`loader_web`] | Web page loader |
//! | [`loader_youtube`] | YouTube transcript loader |
//! | [`loader_file`] | Uploaded-file loader |
//! | [`extract`] | PDF/DOCX/TXT text extraction |
//! | [`chunk`] | Sliding-window token chunking |
//! | [`embedding`] | Embedding client abstraction |
//! | [`chat`] | Chat-completion client abstraction |
//! | [`store`] | Vector store adapter over SQLite |
//! | [`answer`] | Retrieval, prompt assembly, citations |
//! | [`server`] | HTTP JSON API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod answer;
pub mod chat;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod ingest;
pub mod loader_file;
pub mod loader_web;
pub mod loader_youtube;
pub mod migrate;
pub mod models;
pub mod server;
pub mod sources;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
