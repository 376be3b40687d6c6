//! Barrel Wire Protocol
//!
//! Endpoints and Data Transfer Objects for the node-facing contract: stores,
//! queries, liveness probes, peer introduction, and the full-state snapshot
//! used only for join-time peer sync.
//!
//! These structures are serialized as JSON and sent over HTTP.

use crate::site::SiteRecord;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// --- API Endpoints ---

/// Write path: accepts a `RecordEnvelope`. Unpropagated envelopes fan out.
pub const ENDPOINT_STORE: &str = "/store";
/// AND-semantics keyword query over the inverted index.
pub const ENDPOINT_SEARCH: &str = "/search";
/// Referrers of one url, ranked like search results.
pub const ENDPOINT_LINKED: &str = "/linked";
/// Liveness probe. Succeeds whenever the process is alive.
pub const ENDPOINT_PING: &str = "/ping";
/// Internal: full-state dump for join-time peer sync.
pub const ENDPOINT_SNAPSHOT: &str = "/internal/snapshot";
/// Internal: peer introduction, invoked by the gateway at join time.
pub const ENDPOINT_REGISTER_PEER: &str = "/internal/register_peer";

// --- Data Transfer Objects ---

/// Acknowledgment for store calls. `accepted` is false only for records the
/// barrel refused outright (empty url); replication failures never reach the
/// caller.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoreResponse {
    pub accepted: bool,
}

/// Keyword query. Terms are matched case-insensitively with AND semantics:
/// a url must contain every term to be returned.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    pub words: Vec<String>,
}

/// Ranked url list shared by both query types.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub urls: Vec<String>,
}

/// Incoming-links query for one target url.
#[derive(Debug, Serialize, Deserialize)]
pub struct LinkedRequest {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkedResponse {
    pub urls: Vec<String>,
}

/// Probe query string; `from` identifies the caller in the log line.
#[derive(Debug, Deserialize)]
pub struct PingParams {
    pub from: Option<String>,
}

/// Peer introduction payload: an addressable handle, not a shared object.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterPeerRequest {
    pub id: u32,
    pub endpoint: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterPeerResponse {
    pub accepted: bool,
}

/// Complete barrel state: the raw record set plus every derived map.
///
/// Sent once per join to the syncing barrel, which merges it: records by url
/// with remote winning, posting sets and referrer lists by union, reference
/// counts by max, texts filling gaps only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub records: HashMap<String, SiteRecord>,
    pub inverted_index: HashMap<String, HashSet<String>>,
    pub url_references: HashMap<String, u64>,
    pub incoming_links: HashMap<String, Vec<String>>,
    pub url_texts: HashMap<String, String>,
}
