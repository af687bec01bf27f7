use std::sync::Arc;
use seedsort_core::{Config, SanitizedConfig, ScanService};

/// Shared application state
pub struct AppState {
    config: Config,
    scans: Arc<ScanService>,
}

impl AppState {
    pub fn new(config: Config, scans: Arc<ScanService>) -> Self {
        Self { config, scans }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn scans(&self) -> &Arc<ScanService> {
        &self.scans
    }
}
