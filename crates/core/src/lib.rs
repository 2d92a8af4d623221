//! Core types and the cache orchestrator for swcache.
//!
//! This crate provides:
//! - Cache stores with SQLite and in-memory backends
//! - Route classification and the fetch strategies
//! - Lifecycle, message, push and sync handling
//! - Unified error types and layered configuration

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod routes;
pub mod worker;

pub use cache::{CacheDb, CacheEntry, CacheStorage, MemoryStorage};
pub use config::AppConfig;
pub use error::Error;
pub use http::{Request, RequestMode, Response};
pub use routes::{RouteClass, RouteTable, Strategy};
pub use worker::{CacheOrchestrator, Collaborators};
