//! Crawler
//!
//! Thin glue between the frontier and the barrels: pops a url from the
//! gateway, fetches and parses it, feeds discovered links back to the
//! frontier, and stores the parsed record on a random barrel. Every per-url
//! failure is logged and the loop moves on; nothing here is fatal.

pub mod fetch;

#[cfg(test)]
mod tests;

use crate::barrel::protocol::{ENDPOINT_STORE, StoreResponse};
use crate::config::Config;
use crate::gateway::protocol::{
    BarrelsResponse, ENDPOINT_BARRELS, ENDPOINT_POPQUEUE, ENDPOINT_QUEUE, EnqueueResponse,
    PopResponse, QueueUrlRequest,
};
use crate::rpc::RpcClient;
use crate::site::{RecordEnvelope, SiteRecord};
use self::fetch::PageLimits;

use anyhow::Result;
use rand::Rng;
use std::time::Duration;

pub struct Crawler {
    label: String,
    gateway_addr: String,
    rpc: RpcClient,
    fetch_client: reqwest::Client,
    /// Separate client with no timeout: `popqueue` blocks until work arrives.
    pop_client: reqwest::Client,
    limits: PageLimits,
}

impl Crawler {
    pub fn new(gateway_addr: String, config: &Config) -> Result<Self> {
        let fetch_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.fetch_timeout_ms))
            .build()?;

        Ok(Self {
            label: format!("crawler-{}", uuid::Uuid::new_v4()),
            gateway_addr,
            rpc: RpcClient::new(config),
            fetch_client,
            pop_client: reqwest::Client::new(),
            limits: PageLimits {
                max_text: config.max_text_len,
                max_tokens: config.max_tokens_len,
                max_links: config.max_links_len,
            },
        })
    }

    pub async fn run(&self) {
        tracing::info!("{} started against {}", self.label, self.gateway_addr);

        loop {
            let url = match self.pop_url().await {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("popqueue failed: {}, retrying", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            if let Err(e) = self.crawl_one(&url).await {
                tracing::warn!("Crawl of {} failed: {}", url, e);
            }
        }
    }

    /// Blocks on the gateway until a url is available.
    async fn pop_url(&self) -> Result<String> {
        let url = format!("{}{}", self.gateway_addr, ENDPOINT_POPQUEUE);
        let resp = self.pop_client.get(url).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("popqueue answered {}", resp.status());
        }
        let body: PopResponse = resp.json().await?;
        Ok(body.url)
    }

    pub async fn crawl_one(&self, page_url: &str) -> Result<()> {
        tracing::info!("{} fetching {}", self.label, page_url);
        let record = fetch::fetch_page(&self.fetch_client, page_url, &self.limits).await?;

        // Discovered links go back to the frontier; the gateway dedups and
        // applies the depth gate
        for link in record.links.split_whitespace() {
            self.submit_discovered(link).await;
        }

        self.store_on_barrel(record).await;
        Ok(())
    }

    async fn submit_discovered(&self, link: &str) {
        let url = format!("{}{}", self.gateway_addr, ENDPOINT_QUEUE);
        let payload = QueueUrlRequest {
            url: link.to_string(),
        };

        match self.rpc.post_with_retry(url, &payload).await {
            Ok(resp) if resp.status().is_success() => {
                if let Ok(body) = resp.json::<EnqueueResponse>().await
                    && body.queued
                {
                    tracing::debug!("Queued discovered url {}", link);
                }
            }
            Ok(resp) => tracing::warn!("Queueing {} answered {}", link, resp.status()),
            Err(e) => tracing::warn!("Queueing {} failed: {}", link, e),
        }
    }

    /// Stores the record on a random barrel from the gateway registry.
    async fn store_on_barrel(&self, record: SiteRecord) {
        let barrels = match self.fetch_barrels().await {
            Ok(barrels) if !barrels.is_empty() => barrels,
            Ok(_) => {
                tracing::warn!("No barrels registered, dropping record for {}", record.url);
                return;
            }
            Err(e) => {
                tracing::warn!("Registry fetch failed, dropping record for {}: {}", record.url, e);
                return;
            }
        };

        let idx = rand::thread_rng().gen_range(0..barrels.len());
        let (barrel_id, endpoint) = &barrels[idx];
        let url = format!("{}{}", endpoint, ENDPOINT_STORE);
        let envelope = RecordEnvelope::first_write(record);

        match self.rpc.post_with_retry(url, &envelope).await {
            Ok(resp) if resp.status().is_success() => {
                if let Ok(body) = resp.json::<StoreResponse>().await
                    && !body.accepted
                {
                    tracing::warn!("Barrel {} refused record for {}", barrel_id, envelope.record.url);
                }
            }
            Ok(resp) => {
                tracing::warn!(
                    "Store of {} on barrel {} answered {}",
                    envelope.record.url,
                    barrel_id,
                    resp.status()
                );
            }
            Err(e) => {
                tracing::warn!("Store of {} on barrel {} failed: {}", envelope.record.url, barrel_id, e);
            }
        }
    }

    async fn fetch_barrels(&self) -> Result<Vec<(u32, String)>> {
        let url = format!("{}{}", self.gateway_addr, ENDPOINT_BARRELS);
        let resp = self.rpc.get_with_retry(url).await?;
        if !resp.status().is_success() {
            anyhow::bail!("registry fetch answered {}", resp.status());
        }
        let body: BarrelsResponse = resp.json().await?;
        Ok(body.barrels.into_iter().collect())
    }
}
