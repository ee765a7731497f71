//! orgcfg: Hierarchical Configuration Resolution
//!
//! Configuration documents attached to nodes of a per-organization tree, resolved into an
//! effective configuration by deep-merging along the root-to-node lineage. Every write is
//! versioned and recorded in a hash-chained audit trail.

pub mod api;
pub mod audit;
pub mod cache;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod guardrails;
pub mod identity;
pub mod logging;
pub mod merge;
pub mod service;
pub mod store;
pub mod tree;
pub mod types;
