//! Network transport for swcache.
//!
//! This crate provides the reqwest-backed [`HttpNetwork`], the production
//! implementation of the orchestrator's `Network` seam.

pub mod fetch;

pub use fetch::{FetchConfig, HttpNetwork};
