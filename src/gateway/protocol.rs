//! Gateway Wire Protocol
//!
//! Endpoints and Data Transfer Objects for the gateway-facing contract:
//! frontier submissions, the blocking dequeue, routed read queries, and
//! barrel registration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// --- API Endpoints ---

/// Client url submission. Resets the discovery-depth counter.
pub const ENDPOINT_INDEX: &str = "/index";
/// Crawler-discovered url submission, gated by the depth counter.
pub const ENDPOINT_QUEUE: &str = "/queue";
/// Blocking dequeue: the response arrives when a url is available.
pub const ENDPOINT_POPQUEUE: &str = "/popqueue";
/// Keyword search routed to a random live barrel.
pub const ENDPOINT_SEARCH: &str = "/search";
/// Incoming-links query routed to a random live barrel.
pub const ENDPOINT_LINKED: &str = "/linked";
/// Current barrel registry; also the barrel registration collection.
pub const ENDPOINT_BARRELS: &str = "/barrels";
pub const ENDPOINT_REGISTER_BARREL: &str = "/barrels/register";

// --- Data Transfer Objects ---

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexUrlRequest {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueueUrlRequest {
    pub url: String,
}

/// Whether the url was admitted to the frontier. Duplicates and
/// depth-limited discoveries report `queued: false`.
#[derive(Debug, Serialize, Deserialize)]
pub struct EnqueueResponse {
    pub queued: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PopResponse {
    pub url: String,
}

/// Whitespace-separated search terms, as typed by the client.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct LinkedParams {
    pub url: String,
}

/// Ranked urls. Empty both for "no matches" and "no live barrel"; callers
/// cannot distinguish the two.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResultsResponse {
    pub urls: Vec<String>,
}

/// Barrel registration: an addressable handle resolved through the registry.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterBarrelRequest {
    pub id: u32,
    pub endpoint: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterBarrelResponse {
    pub accepted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnsubscribeResponse {
    pub removed: bool,
}

/// The registry map handed to joining barrels and crawlers.
#[derive(Debug, Serialize, Deserialize)]
pub struct BarrelsResponse {
    pub barrels: HashMap<u32, String>,
}
