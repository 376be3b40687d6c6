//! Gateway service: the barrel registry, probe-on-use read routing, and the
//! full-mesh introduction broadcast performed when a barrel joins.
//!
//! Probe-on-use is the system's only failure detector for reads: there is no
//! background heartbeat. A barrel that fails its probe during selection is
//! evicted and never re-admitted automatically.

use crate::barrel::protocol::{
    ENDPOINT_LINKED, ENDPOINT_PING, ENDPOINT_REGISTER_PEER, ENDPOINT_SEARCH, LinkedRequest,
    LinkedResponse, RegisterPeerRequest, SearchRequest, SearchResponse,
};
use crate::config::Config;
use crate::rpc::RpcClient;

use anyhow::Result;
use dashmap::DashMap;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

pub struct GatewayService {
    /// barrel id -> endpoint
    pub barrels: DashMap<u32, String>,
    rpc: RpcClient,
}

impl GatewayService {
    pub fn new(config: &Config) -> Arc<Self> {
        Arc::new(Self {
            barrels: DashMap::new(),
            rpc: RpcClient::new(config),
        })
    }

    /// Admits a barrel: rejects duplicate ids, probes the endpoint, then
    /// introduces the newcomer and every existing barrel to each other so
    /// the mesh stays full.
    pub async fn register_ibs(&self, id: u32, endpoint: String) -> Result<()> {
        if self.barrels.contains_key(&id) {
            anyhow::bail!("barrel id {} is already registered", id);
        }
        if !self.probe(&endpoint).await {
            anyhow::bail!("barrel {} at {} did not answer the admission probe", id, endpoint);
        }

        self.barrels.insert(id, endpoint.clone());
        tracing::info!("Barrel {} registered at {}", id, endpoint);

        self.introduce_all(id, &endpoint).await;
        Ok(())
    }

    /// Explicit deregistration.
    pub fn unsubscribe_ibs(&self, id: u32) -> bool {
        if self.barrels.remove(&id).is_some() {
            tracing::info!("Barrel {} removed from the registry", id);
            true
        } else {
            tracing::info!("Barrel {} not found in the registry", id);
            false
        }
    }

    pub fn get_barrels(&self) -> HashMap<u32, String> {
        self.barrels
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Tells every existing barrel about the newcomer and the newcomer about
    /// every existing barrel. Best-effort: a failed introduction is logged;
    /// the join-time sync re-broadcast covers stragglers.
    async fn introduce_all(&self, new_id: u32, new_endpoint: &str) {
        let others: Vec<(u32, String)> = self
            .barrels
            .iter()
            .filter(|entry| *entry.key() != new_id)
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        for (other_id, other_endpoint) in others {
            self.send_introduction(&other_endpoint, new_id, new_endpoint).await;
            self.send_introduction(new_endpoint, other_id, &other_endpoint).await;
        }
    }

    async fn send_introduction(&self, to_endpoint: &str, peer_id: u32, peer_endpoint: &str) {
        let url = format!("{}{}", to_endpoint, ENDPOINT_REGISTER_PEER);
        let payload = RegisterPeerRequest {
            id: peer_id,
            endpoint: peer_endpoint.to_string(),
        };

        match self.rpc.post_with_retry(url, &payload).await {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => {
                tracing::warn!(
                    "Introduction of barrel {} to {} answered {}",
                    peer_id,
                    to_endpoint,
                    resp.status()
                );
            }
            Err(e) => {
                tracing::warn!("Introduction of barrel {} to {} failed: {}", peer_id, to_endpoint, e);
            }
        }
    }

    async fn probe(&self, endpoint: &str) -> bool {
        let url = format!("{}{}?from=gateway", endpoint, ENDPOINT_PING);
        match self.rpc.get_with_retry(url).await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Uniform random choice among registered barrels, probing before use
    /// and evicting barrels that stop answering. `None` means the registry
    /// is exhausted.
    pub async fn pick_live_barrel(&self) -> Option<(u32, String)> {
        let mut candidates: Vec<(u32, String)> = self
            .barrels
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        while !candidates.is_empty() {
            let idx = rand::thread_rng().gen_range(0..candidates.len());
            let (id, endpoint) = candidates.swap_remove(idx);

            if self.probe(&endpoint).await {
                tracing::debug!("Selected barrel {} for routing", id);
                return Some((id, endpoint));
            }

            tracing::warn!("Barrel {} is not responding, removing from the registry", id);
            self.barrels.remove(&id);
        }

        tracing::warn!("No live barrel available");
        None
    }

    /// Routes a keyword search to a random live barrel. No live barrel or a
    /// failed call degrade to an empty result, never an error.
    pub async fn return_pages_by_words(&self, words: &str) -> Vec<String> {
        let Some((id, endpoint)) = self.pick_live_barrel().await else {
            return Vec::new();
        };

        let terms: Vec<String> = words.split_whitespace().map(str::to_string).collect();
        let url = format!("{}{}", endpoint, ENDPOINT_SEARCH);

        match self.rpc.post_with_retry(url, &SearchRequest { words: terms }).await {
            Ok(resp) if resp.status().is_success() => match resp.json::<SearchResponse>().await {
                Ok(body) => body.urls,
                Err(e) => {
                    tracing::warn!("Search response from barrel {} unreadable: {}", id, e);
                    Vec::new()
                }
            },
            Ok(resp) => {
                tracing::warn!("Search on barrel {} answered {}", id, resp.status());
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Search on barrel {} failed: {}", id, e);
                Vec::new()
            }
        }
    }

    /// Routes an incoming-links query to a random live barrel.
    pub async fn return_linked_urls(&self, target: &str) -> Vec<String> {
        let Some((id, endpoint)) = self.pick_live_barrel().await else {
            return Vec::new();
        };

        let url = format!("{}{}", endpoint, ENDPOINT_LINKED);
        let payload = LinkedRequest {
            url: target.to_string(),
        };

        match self.rpc.post_with_retry(url, &payload).await {
            Ok(resp) if resp.status().is_success() => match resp.json::<LinkedResponse>().await {
                Ok(body) => body.urls,
                Err(e) => {
                    tracing::warn!("Linked response from barrel {} unreadable: {}", id, e);
                    Vec::new()
                }
            },
            Ok(resp) => {
                tracing::warn!("Linked query on barrel {} answered {}", id, resp.status());
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Linked query on barrel {} failed: {}", id, e);
                Vec::new()
            }
        }
    }
}
