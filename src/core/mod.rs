//! Shared infrastructure for tutorpath.
//!
//! Configuration, errors, the durable store plumbing (SQLite connection, broker,
//! schema), the audit trail and per-session locking live here. Tutoring logic
//! lives in [`crate::plugins`].

pub mod assets;
pub mod audit;
pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod rpc;
pub mod schemas;
pub mod session_lock;
pub mod store;
pub mod time;
