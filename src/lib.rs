//! Fabric Server Library
//!
//! Multi-tenant storage for generation runs: sessions with ordered logs and
//! zip-ingested assets, plus app-scoped logs and objects. The binary in
//! `main.rs` wires configuration, stores and the router together; the
//! modules are public so integration tests can build the same router.
//!
//! # Modules
//!
//! - `routes`: HTTP surface and request extractors
//! - `db`: SQLite metadata store
//! - `storage`: blob store backends (local filesystem, S3-compatible)
//! - `archive`: zip decoding, path sanitizing and archive building

pub mod archive;
pub mod auth;
pub mod config;
pub mod content;
pub mod cors;
pub mod db;
pub mod error;
pub mod ingest;
pub mod reconcile;
pub mod routes;
pub mod state;
pub mod storage;
