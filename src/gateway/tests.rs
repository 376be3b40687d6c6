//! Gateway Module Tests
//!
//! Validates the frontier semantics and the failure-aware read routing.
//!
//! ## Test Scopes
//! - **Frontier**: dedup, blocking pop, the discovery-depth gate and its
//!   reset on client submissions.
//! - **Service**: registration, full-mesh introduction, probe-on-use
//!   selection with eviction, empty-result degradation.

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::gateway::frontier::Frontier;
    use crate::gateway::service::GatewayService;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> Config {
        Config {
            retry_attempts: 1,
            retry_base_delay_ms: 1,
            request_timeout_ms: 500,
            ..Config::default()
        }
    }

    // ============================================================
    // FRONTIER TESTS
    // ============================================================

    #[tokio::test]
    async fn test_client_url_pops_exactly_once() {
        let frontier = Frontier::new(10);

        assert!(frontier.client_index_url("http://a.com/"));
        // A repeat submission before the pop is a no-op
        assert!(!frontier.client_index_url("http://a.com/"));

        assert_eq!(frontier.pop().await, "http://a.com/");
        assert_eq!(frontier.pending(), 0);

        // Popped urls stay seen
        assert!(!frontier.client_index_url("http://a.com/"));
    }

    #[tokio::test]
    async fn test_pop_blocks_until_url_arrives() {
        let frontier = Arc::new(Frontier::new(10));

        // Nothing queued: pop must not return
        let blocked = tokio::time::timeout(Duration::from_millis(50), frontier.pop()).await;
        assert!(blocked.is_err());

        // A waiting pop wakes up when a url is submitted
        let waiter = {
            let frontier = frontier.clone();
            tokio::spawn(async move { frontier.pop().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        frontier.client_index_url("http://a.com/");

        let url = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("pop should have woken up")
            .unwrap();
        assert_eq!(url, "http://a.com/");
    }

    #[tokio::test]
    async fn test_depth_gate_drops_excess_discoveries() {
        let frontier = Frontier::new(3);
        frontier.client_index_url("http://root.com/");

        assert!(frontier.queue_discovered("http://d1.com/"));
        assert!(frontier.queue_discovered("http://d2.com/"));
        assert!(frontier.queue_discovered("http://d3.com/"));
        // The budget is spent: the fourth discovery is silently dropped
        assert!(!frontier.queue_discovered("http://d4.com/"));

        // A fresh client submission re-arms the gate
        frontier.client_index_url("http://root2.com/");
        assert!(frontier.queue_discovered("http://d4.com/"));
    }

    #[tokio::test]
    async fn test_discovered_urls_are_deduped() {
        let frontier = Frontier::new(10);

        assert!(frontier.queue_discovered("http://a.com/"));
        assert!(!frontier.queue_discovered("http://a.com/"));
        // The duplicate did not consume budget
        assert_eq!(frontier.pending(), 1);
        assert_eq!(frontier.seen(), 1);
    }

    #[tokio::test]
    async fn test_empty_urls_are_rejected() {
        let frontier = Frontier::new(10);
        assert!(!frontier.client_index_url(""));
        assert!(!frontier.queue_discovered("  "));
        assert_eq!(frontier.pending(), 0);
    }

    #[tokio::test]
    async fn test_queue_preserves_fifo_order() {
        let frontier = Frontier::new(10);
        frontier.client_index_url("http://a.com/");
        frontier.client_index_url("http://b.com/");

        assert_eq!(frontier.pop().await, "http://a.com/");
        assert_eq!(frontier.pop().await, "http://b.com/");
    }

    // ============================================================
    // SERVICE TESTS - registration
    // ============================================================

    async fn live_barrel() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_register_admits_live_barrel() {
        let service = GatewayService::new(&test_config());
        let barrel = live_barrel().await;

        service.register_ibs(1, barrel.uri()).await.unwrap();
        assert_eq!(service.get_barrels().get(&1), Some(&barrel.uri()));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_id() {
        let service = GatewayService::new(&test_config());
        let barrel = live_barrel().await;

        service.register_ibs(1, barrel.uri()).await.unwrap();
        assert!(service.register_ibs(1, barrel.uri()).await.is_err());
    }

    #[tokio::test]
    async fn test_register_rejects_unreachable_barrel() {
        let service = GatewayService::new(&test_config());

        assert!(
            service
                .register_ibs(1, "http://127.0.0.1:1".to_string())
                .await
                .is_err()
        );
        assert!(service.get_barrels().is_empty());
    }

    #[tokio::test]
    async fn test_register_broadcasts_introductions() {
        let service = GatewayService::new(&test_config());

        let first = live_barrel().await;
        Mock::given(method("POST"))
            .and(path("/internal/register_peer"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&first)
            .await;

        let second = live_barrel().await;
        Mock::given(method("POST"))
            .and(path("/internal/register_peer"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&second)
            .await;

        service.register_ibs(1, first.uri()).await.unwrap();
        // The second registration introduces both barrels to each other
        service.register_ibs(2, second.uri()).await.unwrap();
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_barrel() {
        let service = GatewayService::new(&test_config());
        let barrel = live_barrel().await;

        service.register_ibs(1, barrel.uri()).await.unwrap();
        assert!(service.unsubscribe_ibs(1));
        assert!(!service.unsubscribe_ibs(1));
        assert!(service.get_barrels().is_empty());
    }

    // ============================================================
    // SERVICE TESTS - routing
    // ============================================================

    #[tokio::test]
    async fn test_dead_barrel_is_evicted_and_never_selected_again() {
        let service = GatewayService::new(&test_config());

        let live = live_barrel().await;
        service.barrels.insert(1, live.uri());
        // Barrel 2 died after registration
        service.barrels.insert(2, "http://127.0.0.1:1".to_string());

        // Selection always lands on the live barrel; once the dead one is
        // probed it is evicted for good
        for _ in 0..20 {
            let picked = service.pick_live_barrel().await;
            assert_eq!(picked.map(|(id, _)| id), Some(1));
            if !service.barrels.contains_key(&2) {
                break;
            }
        }
        assert!(service.barrels.contains_key(&1));
    }

    #[tokio::test]
    async fn test_exhausted_registry_yields_none() {
        let service = GatewayService::new(&test_config());
        service.barrels.insert(1, "http://127.0.0.1:1".to_string());

        assert!(service.pick_live_barrel().await.is_none());
        assert!(service.barrels.is_empty());
    }

    #[tokio::test]
    async fn test_search_with_no_barrels_returns_empty() {
        let service = GatewayService::new(&test_config());
        assert!(service.return_pages_by_words("cat dog").await.is_empty());
        assert!(service.return_linked_urls("http://a.com/").await.is_empty());
    }

    #[tokio::test]
    async fn test_search_routes_to_live_barrel() {
        let service = GatewayService::new(&test_config());

        let barrel = live_barrel().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "urls": ["http://a.com/"] })),
            )
            .mount(&barrel)
            .await;
        service.barrels.insert(1, barrel.uri());

        let urls = service.return_pages_by_words("cat dog").await;
        assert_eq!(urls, vec!["http://a.com/"]);
    }

    #[tokio::test]
    async fn test_linked_routes_to_live_barrel() {
        let service = GatewayService::new(&test_config());

        let barrel = live_barrel().await;
        Mock::given(method("POST"))
            .and(path("/linked"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "urls": ["http://r.com/"] })),
            )
            .mount(&barrel)
            .await;
        service.barrels.insert(1, barrel.uri());

        let urls = service.return_linked_urls("http://a.com/").await;
        assert_eq!(urls, vec!["http://r.com/"]);
    }

    #[tokio::test]
    async fn test_barrel_error_degrades_to_empty_result() {
        let service = GatewayService::new(&test_config());

        let barrel = live_barrel().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&barrel)
            .await;
        service.barrels.insert(1, barrel.uri());

        assert!(service.return_pages_by_words("cat").await.is_empty());
        // A failed query does not evict a barrel that still answers probes
        assert!(service.barrels.contains_key(&1));
    }
}
