//! Crawler Module Tests
//!
//! Exercises the fetch path and the pop -> parse -> queue -> store loop
//! against mocked HTTP endpoints.

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::crawler::Crawler;
    use crate::crawler::fetch::{PageLimits, fetch_page};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> Config {
        Config {
            retry_attempts: 1,
            retry_base_delay_ms: 1,
            request_timeout_ms: 500,
            fetch_timeout_ms: 1000,
            ..Config::default()
        }
    }

    fn limits() -> PageLimits {
        PageLimits {
            max_text: 64_000,
            max_tokens: 64_000,
            max_links: 32_000,
        }
    }

    fn html_page(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.to_string().into_bytes(), "text/html")
    }

    #[tokio::test]
    async fn test_fetch_page_builds_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(html_page(
                r#"<html><head><title>Cats</title></head>
                   <body><p>All about cats.</p><a href="/dogs">dogs</a></body></html>"#,
            ))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let page_url = format!("{}/page", server.uri());
        let record = fetch_page(&client, &page_url, &limits()).await.unwrap();

        assert_eq!(record.url, page_url);
        assert_eq!(record.title, "cats");
        assert_eq!(record.text, "all about cats.");
        assert_eq!(record.links, format!("{}/dogs", server.uri()));
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let result = fetch_page(&client, &format!("{}/gone", server.uri()), &limits()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fetch_non_html_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_string("{}"),
            )
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let result = fetch_page(&client, &format!("{}/data", server.uri()), &limits()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_crawl_one_queues_links_and_stores_record() {
        let site = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/start"))
            .respond_with(html_page(
                r#"<html><head><title>Start</title></head>
                   <body><p>words</p>
                   <a href="/p1">one</a><a href="/p2">two</a></body></html>"#,
            ))
            .mount(&site)
            .await;

        let barrel = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/store"))
            .and(body_partial_json(serde_json::json!({ "propagated": false })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "accepted": true })),
            )
            .expect(1)
            .mount(&barrel)
            .await;

        let gateway = MockServer::start().await;
        // Both discovered links come back to the frontier
        Mock::given(method("POST"))
            .and(path("/queue"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "queued": true })),
            )
            .expect(2)
            .mount(&gateway)
            .await;
        Mock::given(method("GET"))
            .and(path("/barrels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "barrels": { "1": barrel.uri() }
            })))
            .mount(&gateway)
            .await;

        let crawler = Crawler::new(gateway.uri(), &test_config()).unwrap();
        crawler
            .crawl_one(&format!("{}/start", site.uri()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_crawl_failure_is_not_fatal() {
        let gateway = MockServer::start().await;
        let crawler = Crawler::new(gateway.uri(), &test_config()).unwrap();

        // Unreachable page: the error surfaces to the loop, which logs it
        let result = crawler.crawl_one("http://127.0.0.1:1/nope").await;
        assert!(result.is_err());
    }
}
