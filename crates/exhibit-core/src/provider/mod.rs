//! Network tier: where configuration comes from when no cached copy is usable.

mod http;

pub use http::{ConnectionState, HttpConfigurationProvider};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ProviderError;
use crate::model::{MultimediaPresentation, Tenant, TopographicalTable};

#[async_trait]
pub trait ConfigurationProvider: Send + Sync {
    async fn fetch_tenants(&self) -> Result<Vec<Tenant>, ProviderError>;

    async fn fetch_table(&self, id: Uuid) -> Result<TopographicalTable, ProviderError>;

    async fn fetch_presentation(&self, id: Uuid) -> Result<MultimediaPresentation, ProviderError>;

    /// Raw bytes of a media file. Providers without a media endpoint report
    /// every file as missing.
    async fn fetch_media(&self, id: &str) -> Result<Vec<u8>, ProviderError> {
        Err(ProviderError::NotFound(format!("media {id}")))
    }
}
