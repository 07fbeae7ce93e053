use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::EnvironmentConfig;
use crate::error::ProviderError;
use crate::model::{MultimediaPresentation, Tenant, TopographicalTable};

use super::ConfigurationProvider;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Reachability of the configuration server as of the last request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Unknown,
    Connected,
    Disconnected,
}

/// Talks to the exhibit configuration server's REST API.
///
/// Every request carries `Authorization: Bearer <api_token>`. A 404 maps to
/// [`ProviderError::NotFound`]; any other non-success status or transport
/// failure marks the connection as disconnected.
pub struct HttpConfigurationProvider {
    client: Client,
    api_url: String,
    api_token: String,
    state: Mutex<ConnectionState>,
}

impl HttpConfigurationProvider {
    pub fn new(env: &EnvironmentConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, env))
    }

    pub fn with_client(client: Client, env: &EnvironmentConfig) -> Self {
        let mut api_url = env.api_url.clone();
        if !api_url.ends_with('/') {
            api_url.push('/');
        }
        Self {
            client,
            api_url,
            api_token: env.api_token.clone(),
            state: Mutex::new(ConnectionState::Unknown),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn send(&self, path: &str) -> Result<reqwest::Response, ProviderError> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = match self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                warn!(%url, error = %e, "configuration server unreachable");
                return Err(e.into());
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            self.set_state(ConnectionState::Connected);
            return Err(ProviderError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            self.set_state(ConnectionState::Disconnected);
            warn!(%url, status = status.as_u16(), "configuration server returned an error");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url,
            });
        }
        self.set_state(ConnectionState::Connected);
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let body = self.send(path).await?.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ProviderError::Decode(format!("{path}: {e}")))
    }
}

#[async_trait]
impl ConfigurationProvider for HttpConfigurationProvider {
    async fn fetch_tenants(&self) -> Result<Vec<Tenant>, ProviderError> {
        self.get_json("tenants").await
    }

    async fn fetch_table(&self, id: Uuid) -> Result<TopographicalTable, ProviderError> {
        self.get_json(&format!("topographical-table/{id}")).await
    }

    async fn fetch_presentation(&self, id: Uuid) -> Result<MultimediaPresentation, ProviderError> {
        self.get_json(&format!("multimediapresentation/{id}")).await
    }

    async fn fetch_media(&self, id: &str) -> Result<Vec<u8>, ProviderError> {
        let body = self.send(&format!("media/{id}/display")).await?.bytes().await?;
        Ok(body.to_vec())
    }
}
