use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::CacheError;
use crate::model::{MultimediaPresentation, Tenant, TopographicalTable};
use crate::provider::ConfigurationProvider;

use super::media::MediaCache;
use super::tiered::TieredCache;

pub const TENANTS_KEY: &str = "tenants";

pub fn table_key(id: Uuid) -> String {
    format!("table_{id}")
}

pub fn presentation_key(id: Uuid) -> String {
    format!("presentation_{id}")
}

/// Typed access to exhibit configuration: every lookup goes through the
/// tiered cache under a stable key, with the provider as the network tier.
#[derive(Clone)]
pub struct CachedConfiguration {
    cache: Arc<TieredCache>,
    media: Arc<MediaCache>,
    provider: Arc<dyn ConfigurationProvider>,
}

impl CachedConfiguration {
    pub fn new(
        cache: Arc<TieredCache>,
        media: Arc<MediaCache>,
        provider: Arc<dyn ConfigurationProvider>,
    ) -> Self {
        Self {
            cache,
            media,
            provider,
        }
    }

    pub fn cache(&self) -> &TieredCache {
        &self.cache
    }

    pub fn media_cache(&self) -> &MediaCache {
        &self.media
    }

    pub async fn tenants(&self) -> Result<Vec<Tenant>, CacheError> {
        self.cache
            .get(TENANTS_KEY, || self.provider.fetch_tenants())
            .await
    }

    pub async fn table(&self, id: Uuid) -> Result<TopographicalTable, CacheError> {
        self.cache
            .get(&table_key(id), || self.provider.fetch_table(id))
            .await
    }

    pub async fn presentation(&self, id: Uuid) -> Result<MultimediaPresentation, CacheError> {
        self.cache
            .get(&presentation_key(id), || self.provider.fetch_presentation(id))
            .await
    }

    pub async fn media(&self, id: &str) -> Result<Vec<u8>, CacheError> {
        self.media.get(id, || self.provider.fetch_media(id)).await
    }

    /// Download every media file `presentation` refers to that is not on
    /// disk yet, so playback does not wait on the network. Failures are
    /// logged and skipped. Returns how many files are available locally.
    pub async fn prefetch_media(&self, presentation: &MultimediaPresentation) -> usize {
        let ids: BTreeSet<&str> = presentation
            .presentation_items
            .iter()
            .filter_map(|item| {
                item.media_file
                    .as_ref()
                    .map(|m| m.id.as_str())
                    .or(item.media_file_id.as_deref())
            })
            .collect();

        let mut available = 0;
        for id in ids {
            match self.media(id).await {
                Ok(bytes) => {
                    debug!(media = id, bytes = bytes.len(), "media ready");
                    available += 1;
                }
                Err(e) => warn!(media = id, error = %e, "media prefetch failed"),
            }
        }
        available
    }

    /// Drop the cached copy of a presentation so the next lookup refetches.
    pub async fn invalidate_presentation(&self, id: Uuid) {
        self.cache.invalidate(&presentation_key(id)).await;
    }
}
