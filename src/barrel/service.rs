//! Barrel service: local processing plus single-hop replication.
//!
//! A store that arrives unpropagated is indexed locally, persisted, and then
//! fanned out once to every known peer as a propagated copy. Fan-out is
//! best-effort: an unreachable peer gets one liveness probe and is evicted
//! from this barrel's registry if that also fails; the original caller never
//! sees the failure.

use crate::barrel::protocol::{
    ENDPOINT_PING, ENDPOINT_SNAPSHOT, ENDPOINT_STORE, StateSnapshot,
};
use crate::barrel::state::BarrelState;
use crate::barrel::store::SnapshotStore;
use crate::config::Config;
use crate::gateway::protocol::{
    BarrelsResponse, ENDPOINT_BARRELS, ENDPOINT_REGISTER_BARREL, RegisterBarrelRequest,
};
use crate::rpc::RpcClient;
use crate::site::RecordEnvelope;

use anyhow::Result;
use dashmap::DashMap;
use std::sync::Arc;

pub struct Barrel {
    pub id: u32,
    /// Our own advertised endpoint, handed to the gateway at registration.
    pub endpoint: String,
    pub state: BarrelState,
    /// peer id -> endpoint. Full mesh: built by gateway introductions,
    /// shrunk only by failed liveness probes.
    pub peers: DashMap<u32, String>,
    store: SnapshotStore,
    rpc: RpcClient,
    gateway_addr: String,
}

impl Barrel {
    /// Creates the barrel and loads its persisted record set, rebuilding the
    /// derived maps by replay. A missing snapshot means an empty barrel.
    pub fn new(id: u32, endpoint: String, gateway_addr: String, config: &Config) -> Arc<Self> {
        let store = SnapshotStore::new(&config.data_dir, id);
        let state = BarrelState::new();

        let loaded = store.load();
        if !loaded.is_empty() {
            state.replace_records(loaded);
            tracing::info!(
                "[barrel {}] reindexed {} records from snapshot",
                id,
                state.record_count()
            );
        }

        Arc::new(Self {
            id,
            endpoint,
            state,
            peers: DashMap::new(),
            store,
            rpc: RpcClient::new(config),
            gateway_addr,
        })
    }

    /// The node-facing write path. Returns whether the record was accepted;
    /// replication outcomes never affect the answer.
    pub async fn store_record(&self, envelope: RecordEnvelope) -> bool {
        if envelope.record.url.trim().is_empty() {
            tracing::warn!("[barrel {}] rejecting record with empty url", self.id);
            return false;
        }

        tracing::info!(
            "[barrel {}] store for {} (propagated={})",
            self.id,
            envelope.record.url,
            envelope.propagated
        );

        if !self.state.process_local(&envelope.record) {
            return false;
        }
        self.persist();

        // Single-hop: a propagated copy is never fanned out again
        if !envelope.propagated {
            self.propagate(RecordEnvelope::propagated_copy(&envelope.record)).await;
        }

        true
    }

    fn persist(&self) {
        let records = self.state.records();
        self.store.save(&records);
    }

    /// Best-effort single-hop fan-out of an already-marked copy. A peer that
    /// fails the store and the follow-up probe is evicted.
    pub async fn propagate(&self, envelope: RecordEnvelope) {
        let peers: Vec<(u32, String)> = self
            .peers
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        if peers.is_empty() {
            return;
        }

        tracing::debug!(
            "[barrel {}] propagating {} to {} peers",
            self.id,
            envelope.record.url,
            peers.len()
        );

        for (peer_id, peer_endpoint) in peers {
            let url = format!("{}{}", peer_endpoint, ENDPOINT_STORE);
            let delivered = match self.rpc.post_with_retry(url, &envelope).await {
                Ok(resp) => resp.status().is_success(),
                Err(e) => {
                    tracing::warn!(
                        "[barrel {}] failed to propagate to barrel {}: {}",
                        self.id,
                        peer_id,
                        e
                    );
                    false
                }
            };

            if !delivered && !self.probe_peer(&peer_endpoint).await {
                tracing::warn!(
                    "[barrel {}] barrel {} not answering probes, evicting",
                    self.id,
                    peer_id
                );
                self.peers.remove(&peer_id);
            }
        }
    }

    /// Liveness probe; true iff the peer answered.
    pub async fn probe_peer(&self, peer_endpoint: &str) -> bool {
        let url = format!("{}{}?from=barrel-{}", peer_endpoint, ENDPOINT_PING, self.id);
        match self.rpc.get_with_retry(url).await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Records a peer handle. A barrel never registers itself.
    pub fn register_peer(&self, peer_id: u32, peer_endpoint: String) -> bool {
        if peer_id == self.id {
            tracing::debug!("[barrel {}] ignoring self-registration", self.id);
            return false;
        }
        tracing::info!(
            "[barrel {}] registering peer barrel {} at {}",
            self.id,
            peer_id,
            peer_endpoint
        );
        self.peers.insert(peer_id, peer_endpoint);
        true
    }

    /// Announces this barrel to the gateway, which probes it and introduces
    /// it and every existing barrel to each other.
    pub async fn register_with_gateway(&self) -> Result<()> {
        let url = format!("{}{}", self.gateway_addr, ENDPOINT_REGISTER_BARREL);
        let payload = RegisterBarrelRequest {
            id: self.id,
            endpoint: self.endpoint.clone(),
        };

        let resp = self.rpc.post_with_retry(url, &payload).await?;
        if !resp.status().is_success() {
            anyhow::bail!(
                "gateway refused registration of barrel {}: {}",
                self.id,
                resp.status()
            );
        }

        tracing::info!("[barrel {}] registered with gateway", self.id);
        Ok(())
    }

    /// Join-time sync: fetch the registry from the gateway (minus self),
    /// probe candidates in turn, merge the full state of the first live
    /// peer, then re-broadcast our own records so barrels that joined
    /// earlier converge too. Single-hop fan-out alone never heals them.
    pub async fn bootstrap(&self) -> Result<()> {
        let registry = self.fetch_registry().await?;
        let candidates: Vec<(u32, String)> = registry
            .into_iter()
            .filter(|(peer_id, _)| *peer_id != self.id)
            .collect();

        if candidates.is_empty() {
            tracing::info!("[barrel {}] no other barrels to sync from", self.id);
            return Ok(());
        }

        for (peer_id, peer_endpoint) in &candidates {
            self.register_peer(*peer_id, peer_endpoint.clone());
        }

        let mut synced = false;
        for (peer_id, peer_endpoint) in &candidates {
            if !self.probe_peer(peer_endpoint).await {
                tracing::warn!(
                    "[barrel {}] barrel {} not answering, trying next",
                    self.id,
                    peer_id
                );
                continue;
            }

            match self.pull_snapshot(peer_endpoint).await {
                Ok(snapshot) => {
                    tracing::info!(
                        "[barrel {}] merging {} records from barrel {}",
                        self.id,
                        snapshot.records.len(),
                        peer_id
                    );
                    self.state.merge_snapshot(snapshot);
                    synced = true;
                    // First live peer only; the mesh converges via re-broadcast
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        "[barrel {}] snapshot pull from barrel {} failed: {}",
                        self.id,
                        peer_id,
                        e
                    );
                }
            }
        }

        if !synced {
            tracing::warn!("[barrel {}] could not sync from any existing barrel", self.id);
        }
        self.persist();

        let records = self.state.records();
        if !records.is_empty() {
            tracing::info!(
                "[barrel {}] re-broadcasting {} records after merge",
                self.id,
                records.len()
            );
            for record in records.values() {
                self.propagate(RecordEnvelope::propagated_copy(record)).await;
            }
        }

        Ok(())
    }

    async fn fetch_registry(&self) -> Result<std::collections::HashMap<u32, String>> {
        let url = format!("{}{}", self.gateway_addr, ENDPOINT_BARRELS);
        let resp = self.rpc.get_with_retry(url).await?;
        if !resp.status().is_success() {
            anyhow::bail!("registry fetch failed: {}", resp.status());
        }
        let body: BarrelsResponse = resp.json().await?;
        Ok(body.barrels)
    }

    async fn pull_snapshot(&self, peer_endpoint: &str) -> Result<StateSnapshot> {
        let url = format!("{}{}", peer_endpoint, ENDPOINT_SNAPSHOT);
        let resp = self.rpc.get_with_retry(url).await?;
        if !resp.status().is_success() {
            anyhow::bail!("snapshot pull failed: {}", resp.status());
        }
        Ok(resp.json().await?)
    }
}
