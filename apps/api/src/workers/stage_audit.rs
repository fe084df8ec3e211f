use crate::application::lifecycle::{dto::StageDuplicate, use_case::PictureLifecycle};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

/// Periodically looks for keys present in more than one stage store.
///
/// Such keys are the trace of a transfer or block whose source delete
/// failed. The worker only reports them; reconciliation is manual.
pub struct StageAuditWorker {
    lifecycle: Arc<PictureLifecycle>,
    origins: Vec<String>,
    interval_seconds: u64,
}

impl StageAuditWorker {
    pub fn new(lifecycle: Arc<PictureLifecycle>, origins: Vec<String>, interval_seconds: u64) -> Self {
        Self {
            lifecycle,
            origins,
            interval_seconds: interval_seconds.max(10),
        }
    }

    pub async fn start(&self) {
        info!(
            origins = ?self.origins,
            interval_seconds = self.interval_seconds,
            "Stage audit worker started"
        );
        loop {
            self.run_once().await;
            tokio::time::sleep(Duration::from_secs(self.interval_seconds)).await;
        }
    }

    /// Scans every configured origin once and returns what was found.
    pub async fn run_once(&self) -> Vec<StageDuplicate> {
        let mut found = Vec::new();
        for origin in &self.origins {
            match self.lifecycle.find_cross_stage_duplicates(origin).await {
                Ok(duplicates) => {
                    debug!(%origin, count = duplicates.len(), "Stage audit pass");
                    for dup in &duplicates {
                        warn!(key = %dup.key, stages = ?dup.stages, "Picture present in several stages");
                    }
                    found.extend(duplicates);
                }
                Err(e) => error!(%origin, "Stage audit failed: {}", e),
            }
        }
        found
    }
}
