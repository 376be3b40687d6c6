//! Distributed Search Engine Backend
//!
//! This library crate defines the core modules that make up the distributed
//! system. It serves as the foundation for the binary executable (`main.rs`),
//! which runs one of three roles per process.
//!
//! ## Architecture Modules
//! The system is composed of loosely coupled subsystems:
//!
//! - **`barrel`**: The storage node. Holds one replica of the inverted index,
//!   link graph, reference counts and raw page records; replicates writes to
//!   its peers with single-hop fan-out and merges full peer state on join.
//! - **`gateway`**: The coordination layer. Owns the crawl frontier (dedup +
//!   depth-bounded blocking queue) and the barrel registry, routes read
//!   queries to liveness-probed barrels, and brokers full-mesh introduction.
//! - **`crawler`**: The data intake loop. Pops frontier urls, fetches and
//!   parses pages, re-submits discovered links and pushes records to barrels.
//! - **`site`**: The page record and its replication envelope.
//! - **`rpc`**: Retrying HTTP helpers used for every inter-process call.
//! - **`config`**: Process configuration, loaded once at startup.

pub mod barrel;
pub mod config;
pub mod crawler;
pub mod gateway;
pub mod rpc;
pub mod site;
