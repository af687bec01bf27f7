//! Mock media metadata source for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::classifier::{MediaFacts, MediaType};
use crate::metadata::{MediaMetadata, MetadataError};

/// Mock implementation of the MediaMetadata trait.
///
/// Unknown ids resolve to `None`. Every lookup is recorded.
#[derive(Debug, Default)]
pub struct MockMediaMetadata {
    facts: Arc<RwLock<HashMap<(MediaType, u32), MediaFacts>>>,
    lookups: Arc<RwLock<Vec<(MediaType, u32)>>>,
    next_error: Arc<RwLock<Option<MetadataError>>>,
}

impl MockMediaMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Facts returned for an id.
    pub async fn set_facts(&self, media_type: MediaType, id: u32, facts: MediaFacts) {
        self.facts.write().await.insert((media_type, id), facts);
    }

    /// Make the next lookup fail with the given error.
    pub async fn set_next_error(&self, error: MetadataError) {
        *self.next_error.write().await = Some(error);
    }

    /// Lookups made so far.
    pub async fn lookups(&self) -> Vec<(MediaType, u32)> {
        self.lookups.read().await.clone()
    }
}

#[async_trait]
impl MediaMetadata for MockMediaMetadata {
    async fn lookup(
        &self,
        media_type: MediaType,
        external_id: u32,
    ) -> Result<Option<MediaFacts>, MetadataError> {
        self.lookups.write().await.push((media_type, external_id));
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(self
            .facts
            .read()
            .await
            .get(&(media_type, external_id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_lookup() {
        let metadata = MockMediaMetadata::new();
        metadata
            .set_facts(MediaType::Tv, 7, fixtures::media_facts(&[18], &["KR"], None))
            .await;

        assert!(metadata.lookup(MediaType::Tv, 7).await.unwrap().is_some());
        assert!(metadata.lookup(MediaType::Movie, 7).await.unwrap().is_none());
        assert_eq!(metadata.lookups().await.len(), 2);
    }

    #[tokio::test]
    async fn test_next_error() {
        let metadata = MockMediaMetadata::new();
        metadata.set_next_error(MetadataError::RateLimitExceeded).await;

        assert!(metadata.lookup(MediaType::Tv, 7).await.is_err());
        assert!(metadata.lookup(MediaType::Tv, 7).await.is_ok());
    }
}
