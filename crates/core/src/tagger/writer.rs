//! Applies a [`TagCategoryDelta`] to one torrent.

use std::collections::BTreeSet;

use tracing::{info, warn};

use super::delta::TagCategoryDelta;
use crate::metrics::record_write;
use crate::torrent_client::{DownloadClient, DownloadClientError};

/// Write a delta through the client's API.
///
/// Tag writes are not retried. A missing category is created and the set
/// retried once. On failure the first error is returned after both halves
/// have been attempted.
pub async fn apply(
    client: &dyn DownloadClient,
    hash: &str,
    delta: &TagCategoryDelta,
) -> Result<(), DownloadClientError> {
    let caps = client.capabilities();

    let (effective_tags, tags_result) = if delta.tags.is_empty() {
        (delta.tags.clone(), Ok(()))
    } else if caps.tag_union {
        let result = client.set_tags(hash, &delta.tags).await;
        record_write("tags", &result);
        (delta.tags.clone(), result)
    } else {
        match merged_tags(client, hash, delta).await {
            Ok(merged) => {
                let result = client.set_tags(hash, &merged).await;
                record_write("tags", &result);
                (merged, result)
            }
            Err(e) => (Vec::new(), Err(e)),
        }
    };

    if let Err(e) = &tags_result {
        warn!(
            client = %client.name(),
            hash = %hash,
            "Failed to set tags: {}", e
        );
    }

    let category_result = match &delta.category {
        Some(category) if caps.independent_categories => {
            set_category_with_create(client, hash, category).await
        }
        Some(category) => {
            warn!(
                client = %client.name(),
                hash = %hash,
                "Client has no categories, not setting {}", category
            );
            Ok(())
        }
        None => Ok(()),
    };

    if let Err(e) = &category_result {
        warn!(
            client = %client.name(),
            hash = %hash,
            "Failed to set category: {}", e
        );
    }

    let category = match (&delta.category, &category_result) {
        (Some(c), Ok(())) if caps.independent_categories => c.as_str(),
        _ => "",
    };
    info!(
        client = %client.name(),
        hash = %hash,
        "Torrent updated: tags [{}] category [{}]",
        effective_tags.join(","),
        category
    );

    tags_result.and(category_result)
}

/// Union of the torrent's existing tags and the new ones, for clients
/// whose tag write replaces the whole set.
async fn merged_tags(
    client: &dyn DownloadClient,
    hash: &str,
    delta: &TagCategoryDelta,
) -> Result<Vec<String>, DownloadClientError> {
    let original = match &delta.original_tags {
        Some(tags) => tags.clone(),
        None => client.get_tags(hash).await?,
    };

    let merged: BTreeSet<String> = original.into_iter().chain(delta.tags.iter().cloned()).collect();
    Ok(merged.into_iter().collect())
}

async fn set_category_with_create(
    client: &dyn DownloadClient,
    hash: &str,
    category: &str,
) -> Result<(), DownloadClientError> {
    let result = client.set_category(hash, category).await;
    record_write("category", &result);

    match result {
        Err(DownloadClientError::CategoryNotFound(_)) => {
            warn!(
                client = %client.name(),
                hash = %hash,
                "Category {} missing, creating it and retrying", category
            );
            let created = client.create_category(category).await;
            record_write("create_category", &created);
            if let Err(e) = created {
                // It may exist by now; the retry decides.
                warn!("Failed to create category {}: {}", category, e);
            }

            let retried = client.set_category(hash, category).await;
            record_write("category", &retried);
            retried
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDownloadClient, MockWrite};
    use crate::torrent_client::ClientBackend;

    fn delta(tags: &[&str], category: Option<&str>) -> TagCategoryDelta {
        TagCategoryDelta {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            category: category.map(str::to_string),
            original_tags: None,
        }
    }

    #[tokio::test]
    async fn test_qbittorrent_adds_tags_and_sets_existing_category() {
        let client = MockDownloadClient::new("qb", ClientBackend::QBittorrent);
        client.add_category("TV/Chinese").await;
        client
            .add_torrent(crate::testing::fixtures::torrent("h1", "Show", 10, 1))
            .await;

        apply(&client, "h1", &delta(&["HDSky"], Some("TV/Chinese")))
            .await
            .unwrap();

        let writes = client.writes().await;
        assert_eq!(
            writes,
            vec![
                MockWrite::SetTags {
                    hash: "h1".to_string(),
                    tags: vec!["HDSky".to_string()]
                },
                MockWrite::SetCategory {
                    hash: "h1".to_string(),
                    category: "TV/Chinese".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_category_is_created_then_retried() {
        let client = MockDownloadClient::new("qb", ClientBackend::QBittorrent);
        client
            .add_torrent(crate::testing::fixtures::torrent("h1", "Show", 10, 1))
            .await;

        apply(&client, "h1", &delta(&[], Some("TV/Kids"))).await.unwrap();

        let writes = client.writes().await;
        assert_eq!(writes.len(), 2);
        assert_eq!(
            writes[0],
            MockWrite::CreateCategory {
                name: "TV/Kids".to_string()
            }
        );
        assert_eq!(
            client.get_category("h1").await.unwrap().as_deref(),
            Some("TV/Kids")
        );
    }

    #[tokio::test]
    async fn test_second_category_failure_is_reported() {
        let client = MockDownloadClient::new("qb", ClientBackend::QBittorrent);
        client
            .add_torrent(crate::testing::fixtures::torrent("h1", "Show", 10, 1))
            .await;
        client.set_category_creation_fails(true).await;

        let result = apply(&client, "h1", &delta(&[], Some("TV/Kids"))).await;

        assert!(matches!(
            result,
            Err(DownloadClientError::CategoryNotFound(_))
        ));
        assert_eq!(client.get_category("h1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_replace_only_client_writes_union() {
        let client = MockDownloadClient::new("tr", ClientBackend::Transmission);
        let mut torrent = crate::testing::fixtures::torrent("h1", "Show", 10, 1);
        torrent.tags = ["existing".to_string()].into_iter().collect();
        client.add_torrent(torrent).await;

        apply(&client, "h1", &delta(&["HDSky"], None)).await.unwrap();

        let tags = client.get_tags("h1").await.unwrap();
        assert!(tags.contains("existing"));
        assert!(tags.contains("HDSky"));
        assert_eq!(
            client.writes().await,
            vec![MockWrite::SetTags {
                hash: "h1".to_string(),
                tags: vec!["HDSky".to_string(), "existing".to_string()]
            }]
        );
    }

    #[tokio::test]
    async fn test_replace_only_client_ignores_category() {
        let client = MockDownloadClient::new("tr", ClientBackend::Transmission);
        client
            .add_torrent(crate::testing::fixtures::torrent("h1", "Show", 10, 1))
            .await;

        apply(&client, "h1", &delta(&[], Some("TV/Kids"))).await.unwrap();
        assert!(client.writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_tag_failure_still_attempts_category() {
        let client = MockDownloadClient::new("qb", ClientBackend::QBittorrent);
        client.add_category("TV/Kids").await;
        client
            .add_torrent(crate::testing::fixtures::torrent("h1", "Show", 10, 1))
            .await;
        client
            .set_next_error(DownloadClientError::ApiError("boom".to_string()))
            .await;

        let result = apply(&client, "h1", &delta(&["HDSky"], Some("TV/Kids"))).await;

        assert!(matches!(result, Err(DownloadClientError::ApiError(_))));
        assert_eq!(
            client.get_category("h1").await.unwrap().as_deref(),
            Some("TV/Kids")
        );
    }
}
