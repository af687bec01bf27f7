//! Entry point shared by the scheduler, the HTTP API and startup.
//!
//! Allows at most one full scan at a time and exposes its cancel flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tracing::{info, warn};

use crate::metrics::{SCANS_TOTAL, SCAN_DURATION};
use crate::torrent_client::DownloadClient;

use super::scanner::Tagger;
use super::types::{RunContext, ScanReport, ScanTrigger, TaggerError, TorrentAddedEvent, TorrentOutcome};

/// Runs scans and events against the configured clients.
pub struct ScanService {
    tagger: Arc<Tagger>,
    clients: Vec<Arc<dyn DownloadClient>>,
    active: Mutex<Option<Arc<AtomicBool>>>,
}

impl ScanService {
    pub fn new(tagger: Arc<Tagger>, clients: Vec<Arc<dyn DownloadClient>>) -> Self {
        Self {
            tagger,
            clients,
            active: Mutex::new(None),
        }
    }

    pub fn tagger(&self) -> &Tagger {
        &self.tagger
    }

    pub fn clients(&self) -> &[Arc<dyn DownloadClient>] {
        &self.clients
    }

    /// Run a full scan.
    ///
    /// Returns [`TaggerError::AlreadyRunning`] if another scan is active.
    pub async fn run_scan(&self, trigger: ScanTrigger) -> Result<ScanReport, TaggerError> {
        let ctx = RunContext::new(self.clients.clone());
        let _guard = self.begin(&ctx)?;

        info!("Starting {} scan", trigger.as_str());
        let started = Instant::now();
        let result = self.tagger.scan(&ctx).await;
        SCAN_DURATION.observe(started.elapsed().as_secs_f64());

        let label = match &result {
            Ok(report) if report.cancelled => "cancelled",
            Ok(_) => "completed",
            Err(e) => {
                warn!("{} scan failed: {}", trigger.as_str(), e);
                "failed"
            }
        };
        SCANS_TOTAL
            .with_label_values(&[trigger.as_str(), label])
            .inc();

        result
    }

    /// Request cancellation of the running scan.
    ///
    /// Returns false if no scan is running.
    pub fn cancel(&self) -> bool {
        match self.lock().as_ref() {
            Some(flag) => {
                info!("Cancelling running scan");
                flag.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.lock().is_some()
    }

    /// Classify a single newly added torrent. Runs alongside scans.
    pub async fn handle_event(
        &self,
        event: &TorrentAddedEvent,
    ) -> Result<TorrentOutcome, TaggerError> {
        let ctx = RunContext::new(self.clients.clone());
        self.tagger.classify_added(&ctx, event).await
    }

    fn begin(&self, ctx: &RunContext) -> Result<ActiveScan<'_>, TaggerError> {
        let mut active = self.lock();
        if active.is_some() {
            return Err(TaggerError::AlreadyRunning);
        }
        *active = Some(ctx.cancel_handle());
        Ok(ActiveScan {
            active: &self.active,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<AtomicBool>>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Clears the active slot when the scan ends, including on panic or drop.
struct ActiveScan<'a> {
    active: &'a Mutex<Option<Arc<AtomicBool>>>,
}

impl Drop for ActiveScan<'_> {
    fn drop(&mut self) {
        *self.active.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
