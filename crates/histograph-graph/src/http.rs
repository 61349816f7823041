//! HTTP graph store client.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use histograph_types::{Acknowledgement, Command, GraphSettings, Structure};

use crate::error::GraphError;
use crate::store::GraphStore;

/// Body returned by `POST /commands`.
#[derive(Debug, Deserialize)]
struct RegisterResponse {
    structure: Structure,
    #[serde(rename = "requestId", default)]
    request_id: Option<String>,
}

/// Graph store reached over HTTP.
///
/// Each command is POSTed as JSON to `{url}/commands`, with basic auth when
/// credentials are configured.
pub struct HttpGraphStore {
    client: Client,
    base_url: String,
    credentials: Option<(String, SecretString)>,
}

impl HttpGraphStore {
    /// Build a client from settings.
    pub fn new(settings: &GraphSettings) -> Result<Self, GraphError> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| GraphError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.url.trim_end_matches('/').to_string(),
            credentials: settings.credentials(),
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some((user, password)) => request.basic_auth(user, Some(password.expose_secret())),
            None => request,
        }
    }
}

#[async_trait]
impl GraphStore for HttpGraphStore {
    async fn register(&self, command: &Command) -> Result<Acknowledgement, GraphError> {
        let url = format!("{}/commands", self.base_url);
        let response = self
            .authorize(self.client.post(&url).json(command))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GraphError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: RegisterResponse = response
            .json()
            .await
            .map_err(|e| GraphError::Decode(e.to_string()))?;

        debug!(
            dataset = %command.dataset,
            structure = %body.structure,
            request_id = ?body.request_id,
            "Command registered"
        );

        let ack = Acknowledgement::new(body.structure, command.clone());
        Ok(match body.request_id {
            Some(id) => ack.with_request_id(id),
            None => ack,
        })
    }

    async fn check(&self) -> Result<(), GraphError> {
        let response = self.authorize(self.client.get(&self.base_url)).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(GraphError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}
