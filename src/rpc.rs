//! HTTP helpers for inter-process calls.
//!
//! Every remote call in the system goes through these bounded-retry wrappers.
//! Retries apply to transport failures only; an HTTP error status is returned
//! to the caller, who decides what it means. Backoff doubles per attempt with
//! a little jitter to prevent thundering herds.

use crate::config::Config;
use anyhow::Result;
use serde::Serialize;
use std::time::Duration;

#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    timeout: Duration,
    attempts: usize,
    base_delay_ms: u64,
}

impl RpcClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            timeout: Duration::from_millis(config.request_timeout_ms),
            attempts: config.retry_attempts.max(1),
            base_delay_ms: config.retry_base_delay_ms.max(1),
        }
    }

    pub async fn post_with_retry<T: Serialize>(
        &self,
        url: String,
        payload: &T,
    ) -> Result<reqwest::Response> {
        let mut delay_ms = self.base_delay_ms;

        for attempt in 0..self.attempts {
            let response = self
                .http
                .post(url.clone())
                .json(payload)
                .timeout(self.timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == self.attempts {
                        return Err(anyhow::anyhow!(e));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }

    pub async fn get_with_retry(&self, url: String) -> Result<reqwest::Response> {
        let mut delay_ms = self.base_delay_ms;

        for attempt in 0..self.attempts {
            let response = self.http.get(url.clone()).timeout(self.timeout).send().await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == self.attempts {
                        return Err(anyhow::anyhow!(e));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quick_config() -> Config {
        Config {
            retry_attempts: 2,
            retry_base_delay_ms: 1,
            request_timeout_ms: 500,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_get_returns_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let rpc = RpcClient::new(&quick_config());
        let resp = rpc.get_with_retry(format!("{}/ping", server.uri())).await.unwrap();
        assert!(resp.status().is_success());
    }

    #[tokio::test]
    async fn test_error_status_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let rpc = RpcClient::new(&quick_config());
        let resp = rpc.get_with_retry(format!("{}/ping", server.uri())).await.unwrap();
        assert_eq!(resp.status().as_u16(), 500);
    }

    #[tokio::test]
    async fn test_unreachable_host_exhausts_attempts() {
        let rpc = RpcClient::new(&quick_config());
        // Port 1 refuses connections
        let result = rpc.get_with_retry("http://127.0.0.1:1/ping".to_string()).await;
        assert!(result.is_err());
    }
}
