//! Download client abstraction.
//!
//! This module provides a `DownloadClient` trait for reading torrents and
//! writing tags/categories across backends (qBittorrent, Transmission).

mod qbittorrent;
mod transmission;
mod types;

pub use qbittorrent::QBittorrentClient;
pub use transmission::TransmissionClient;
pub use types::*;

use std::sync::Arc;

use crate::config::ClientConfig;

/// Build the adapter matching a client's configured backend.
pub fn create_client(
    config: &ClientConfig,
) -> Result<Arc<dyn DownloadClient>, DownloadClientError> {
    let client: Arc<dyn DownloadClient> = match config.backend {
        ClientBackend::QBittorrent => Arc::new(QBittorrentClient::new(config.clone())?),
        ClientBackend::Transmission => Arc::new(TransmissionClient::new(config.clone())?),
    };
    Ok(client)
}
