//! # Quarry
//!
//! A local-first hybrid retrieval pipeline for document corpora.
//!
//! Quarry indexes a directory of documents (PDF, Markdown, plain text) into
//! SQLite incrementally — only files whose content fingerprint changed are
//! re-processed — and answers queries by fusing lexical keyword scoring with
//! vector similarity search, then re-ranking the best candidates with a
//! pairwise relevance model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────┐   ┌──────────┐
//! │  Corpus  │──▶│    Pipeline       │──▶│  SQLite   │
//! │ pdf/md/  │   │ extract → chunk  │   │ chunks +  │
//! │   txt    │   │ → embed → store  │   │  vectors  │
//! └──────────┘   └──────────────────┘   └────┬─────┘
//!                                            │
//!                        query ──▶ lexical + vector
//!                                      │
//!                                    fuse ──▶ rerank ──▶ results
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! qry init                       # create database
//! qry index                      # index changed documents
//! qry query "capital of France"  # hybrid retrieval
//! qry stats                      # index health overview
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Pipeline failure taxonomy |
//! | [`models`] | Core data types |
//! | [`corpus`] | Filesystem corpus discovery |
//! | [`extract`] | Text extraction (PDF, Markdown, plain text) |
//! | [`fingerprint`] | Content fingerprints and the incremental plan |
//! | [`chunk`] | Paragraph-boundary text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`lexical`] | In-process lexical scoring |
//! | [`fusion`] | Weighted lexical + vector fusion |
//! | [`rerank`] | Pairwise re-ranking |
//! | [`index`] | Indexing pipeline orchestration |
//! | [`query`] | Query pipeline orchestration |
//! | [`store`] | Storage traits |
//! | [`sqlite_store`] | SQLite storage backend |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`stats`] | Index statistics reporting |

pub mod chunk;
pub mod config;
pub mod corpus;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod fusion;
pub mod index;
pub mod lexical;
pub mod migrate;
pub mod models;
pub mod query;
pub mod rerank;
pub mod sqlite_store;
pub mod stats;
pub mod store;
