//! HTTP client for an Elasticsearch-compatible engine.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info};

use histograph_types::SearchSettings;

use crate::compile::{to_ndjson, BulkActionPair};
use crate::engine::{BulkResponse, CreateOutcome, SearchEngine};
use crate::error::SearchError;

const ALREADY_EXISTS: [&str; 2] = [
    "resource_already_exists_exception",
    "index_already_exists_exception",
];

/// Engine client speaking the Elasticsearch REST API.
pub struct ElasticClient {
    client: Client,
    base_url: String,
}

impl ElasticClient {
    /// Build a client from settings.
    ///
    /// Bulk calls carry their own timeout; the client-wide timeout only
    /// bounds index creation and pings.
    pub fn new(settings: &SearchSettings) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| SearchError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.url.trim_end_matches('/').to_string(),
        })
    }
}

fn is_already_exists(status: StatusCode, body: &str) -> bool {
    if status != StatusCode::BAD_REQUEST {
        return false;
    }
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["type"].as_str().map(str::to_string))
        .is_some_and(|kind| ALREADY_EXISTS.iter().any(|known| *known == kind))
}

#[async_trait]
impl SearchEngine for ElasticClient {
    async fn create_index(&self, name: &str, mapping: &Value) -> Result<CreateOutcome, SearchError> {
        let url = format!("{}/{}", self.base_url, name);
        let response = self.client.put(&url).json(mapping).send().await?;

        let status = response.status();
        if status.is_success() {
            info!(index = %name, "Created index");
            return Ok(CreateOutcome::Created);
        }

        let body = response.text().await.unwrap_or_default();
        if is_already_exists(status, &body) {
            debug!(index = %name, "Index already exists");
            return Ok(CreateOutcome::AlreadyExists);
        }
        Err(SearchError::from_status(status.as_u16(), body))
    }

    async fn bulk(
        &self,
        actions: &[BulkActionPair],
        timeout: Duration,
    ) -> Result<BulkResponse, SearchError> {
        let body = to_ndjson(actions)?;
        let url = format!("{}/_bulk", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/x-ndjson")
            .timeout(timeout)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::from_status(status.as_u16(), body));
        }

        response
            .json::<BulkResponse>()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))
    }

    async fn ping(&self) -> Result<(), SearchError> {
        let response = self.client.get(&self.base_url).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SearchError::from_status(status.as_u16(), body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use histograph_types::{Acknowledgement, Command, Operation, Structure};
    use serde_json::json;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(uri: String) -> ElasticClient {
        ElasticClient::new(&SearchSettings {
            url: uri,
            ..Default::default()
        })
        .unwrap()
    }

    fn actions() -> Vec<BulkActionPair> {
        compile(&[
            Acknowledgement::new(Structure::Node, Command::node(Operation::Add, "ds1", "a")),
            Acknowledgement::new(Structure::Node, Command::node(Operation::Remove, "ds1", "b")),
        ])
    }

    #[tokio::test]
    async fn test_create_index() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/ds1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(server.uri())
            .create_index("ds1", &json!({}))
            .await
            .unwrap();
        assert_eq!(outcome, CreateOutcome::Created);
    }

    #[tokio::test]
    async fn test_create_index_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/ds1"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"type": "resource_already_exists_exception", "reason": "index [ds1] already exists"},
                "status": 400
            })))
            .mount(&server)
            .await;

        let outcome = client(server.uri())
            .create_index("ds1", &json!({}))
            .await
            .unwrap();
        assert_eq!(outcome, CreateOutcome::AlreadyExists);
    }

    #[tokio::test]
    async fn test_create_index_other_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"type": "invalid_index_name_exception"}
            })))
            .mount(&server)
            .await;

        let err = client(server.uri())
            .create_index("Bad", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Status { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_bulk_sends_ndjson() {
        let server = MockServer::start().await;
        let expected = to_ndjson(&actions()).unwrap();
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .and(header("content-type", "application/x-ndjson"))
            .and(body_string(expected))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "took": 3,
                "errors": false,
                "items": [
                    {"index": {"_index": "ds1", "_id": "a", "status": 201}},
                    {"delete": {"_index": "ds1", "_id": "b", "status": 200}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(server.uri())
            .bulk(&actions(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(response.took, 3);
        assert_eq!(response.items.len(), 2);
    }

    #[tokio::test]
    async fn test_bulk_429_is_capacity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(ResponseTemplate::new(429).set_body_string("too many requests"))
            .mount(&server)
            .await;

        let err = client(server.uri())
            .bulk(&actions(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.is_capacity());
    }

    #[tokio::test]
    async fn test_bulk_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"took": 1, "errors": false, "items": []}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let err = client(server.uri())
            .bulk(&actions(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Timeout(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_ping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tagline": "You Know, for Search"})))
            .mount(&server)
            .await;

        assert!(client(server.uri()).ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_is_transient() {
        let err = client("http://127.0.0.1:9".to_string()).ping().await.unwrap_err();
        assert!(err.is_transient());
    }
}
