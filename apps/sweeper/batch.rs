use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::{
    config::{BatchConfig, DeleteErrorPolicy},
    errors::SweepError,
    models::export::PostExport,
    twitter_api::PostApi,
};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub attempted: usize,
    pub deleted: usize,
    pub unparsable: usize,
    pub delete_failures: usize,
    pub pauses: usize,
}

/// Deletes every post listed in an export file. No age or allowlist checks.
pub struct BatchDeleter<A> {
    api: A,
    config: BatchConfig,
}

impl<A: PostApi> BatchDeleter<A> {
    pub fn new(api: A, config: BatchConfig) -> Self {
        Self { api, config }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    #[instrument(skip(self), fields(export_path = %self.config.export_path.display()))]
    pub async fn run(&self) -> Result<BatchSummary, SweepError> {
        let export = PostExport::load(&self.config.export_path).map_err(|source| {
            error!(error = ?source, "Failed to load post export");
            SweepError::Export {
                path: self.config.export_path.clone(),
                source,
            }
        })?;
        info!(ids = export.tweets.len(), "Post export loaded");

        self.delete_all(&export.tweets).await
    }

    /// Pauses before every item whose index is a non-zero multiple of
    /// `pause_every`, so 450 ids with the default cadence pause twice.
    pub async fn delete_all(&self, ids: &[String]) -> Result<BatchSummary, SweepError> {
        let mut summary = BatchSummary::default();

        for (index, raw_id) in ids.iter().enumerate() {
            if index > 0 && index % self.config.pause_every.get() == 0 {
                info!(index, pause = ?self.config.pause, "Pausing for rate limits");
                sleep(self.config.pause).await;
                summary.pauses += 1;
            }
            summary.attempted += 1;

            let id = match raw_id.parse::<u64>() {
                Ok(id) => id,
                Err(e) => {
                    warn!(raw_id = %raw_id, error = %e, "Skipping unparsable post id");
                    summary.unparsable += 1;
                    continue;
                }
            };

            match self.api.delete_post(id).await {
                Ok(()) => {
                    info!(post_id = id, "Deleted post");
                    summary.deleted += 1;
                }
                Err(source) => match self.config.delete_error_policy {
                    DeleteErrorPolicy::Skip => {
                        warn!(post_id = id, error = ?source, "Failed to delete post, skipping");
                        summary.delete_failures += 1;
                    }
                    DeleteErrorPolicy::Halt => {
                        error!(post_id = id, error = ?source, "Failed to delete post");
                        return Err(SweepError::Delete { id, source });
                    }
                },
            }
        }

        info!(
            attempted = summary.attempted,
            deleted = summary.deleted,
            unparsable = summary.unparsable,
            delete_failures = summary.delete_failures,
            "Finished deleting from export"
        );

        Ok(summary)
    }
}
