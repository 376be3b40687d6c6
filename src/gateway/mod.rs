//! Gateway
//!
//! Owns the crawl frontier and the barrel registry.
//!
//! ## Core Concepts
//! - **Frontier**: dedup + depth-gated queue with a blocking dequeue;
//!   crawlers suspend on `popqueue` until work arrives.
//! - **Routing**: read queries go to a uniformly random barrel, probed for
//!   liveness on use; unresponsive barrels are evicted.
//! - **Introduction**: on registration the gateway broadcasts peer handles
//!   so every barrel holds a direct handle to every other barrel.

pub mod frontier;
pub mod handlers;
pub mod protocol;
pub mod service;

#[cfg(test)]
mod tests;
