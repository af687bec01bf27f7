use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Local;
use futures::future::BoxFuture;
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::Trigger;

/// Work run on every scheduled fire.
pub type ScanJob = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Background loop firing a job per [`Trigger`].
pub struct Scheduler {
    trigger: Trigger,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Scheduler {
    pub fn new(trigger: Trigger) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            trigger,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Spawn the schedule loop. Jobs run inline, so a slow scan delays
    /// the next fire rather than overlapping it.
    pub fn start(&self, job: ScanJob) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Scheduler already running");
            return;
        }

        let trigger = self.trigger.clone();
        let running = Arc::clone(&self.running);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        info!("Scheduler started ({})", trigger);

        tokio::spawn(async move {
            loop {
                let Some(delay) = trigger.next_delay(Local::now()) else {
                    warn!("Schedule {} has no upcoming fire time, stopping", trigger);
                    break;
                };

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Scheduler received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        info!("Scheduled scan triggered");
                        job().await;
                    }
                }
            }
            running.store(false, Ordering::SeqCst);
            info!("Scheduler stopped");
        });
    }

    /// Stop the loop. A job already running finishes first.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counting_job(counter: Arc<AtomicUsize>) -> ScanJob {
        Arc::new(move || -> BoxFuture<'static, ()> {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test]
    async fn test_interval_fires_repeatedly() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::new(Trigger::Interval(Duration::from_millis(10)));

        scheduler.start(counting_job(Arc::clone(&counter)));
        assert!(scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(200)).await;
        scheduler.stop();

        assert!(counter.load(Ordering::SeqCst) >= 2);
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_stop_before_first_fire() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::new(Trigger::Interval(Duration::from_secs(3600)));

        scheduler.start(counting_job(Arc::clone(&counter)));
        scheduler.stop();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
