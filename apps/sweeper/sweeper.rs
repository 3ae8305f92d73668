use chrono::{TimeDelta, Utc};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::{
    config::{DeleteErrorPolicy, SweepConfig},
    errors::SweepError,
    models::posts::Post,
    twitter_api::PostApi,
};

/// Result of sweeping a single page.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    /// Id of the post with the largest age in the page, used as `max_id` for
    /// the next fetch. `None` only for an empty page.
    pub cursor: Option<u64>,
    pub deleted: usize,
    pub kept: usize,
    pub delete_failures: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepSummary {
    pub fetches: usize,
    pub pages: usize,
    pub deleted: usize,
    pub kept: usize,
    pub delete_failures: usize,
}

pub struct Sweeper<A> {
    api: A,
    config: SweepConfig,
}

impl<A: PostApi> Sweeper<A> {
    pub fn new(api: A, config: SweepConfig) -> Self {
        Self { api, config }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Sweeps the timeline from the newest page backwards until a fetch
    /// returns one post or none. Any fetch or sweep error stops the run.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<SweepSummary, SweepError> {
        let mut summary = SweepSummary::default();

        let mut page = self.fetch_page(None, &mut summary).await?;

        while page.len() > 1 {
            let outcome = self.sweep_page(&page).await?;
            summary.pages += 1;
            summary.deleted += outcome.deleted;
            summary.kept += outcome.kept;
            summary.delete_failures += outcome.delete_failures;

            let Some(cursor) = outcome.cursor else {
                break;
            };

            info!(
                cursor,
                deleted = outcome.deleted,
                delay = ?self.config.page_delay,
                "Finished page, sleeping before the next one"
            );
            sleep(self.config.page_delay).await;

            page = self.fetch_page(Some(cursor), &mut summary).await?;
        }

        info!(
            pages = summary.pages,
            deleted = summary.deleted,
            kept = summary.kept,
            delete_failures = summary.delete_failures,
            "No more posts to delete"
        );

        Ok(summary)
    }

    async fn fetch_page(
        &self,
        max_id: Option<u64>,
        summary: &mut SweepSummary,
    ) -> Result<Vec<Post>, SweepError> {
        summary.fetches += 1;
        let page = self.api.list_timeline(max_id).await.map_err(|source| {
            error!(?max_id, error = ?source, "Failed to fetch timeline");
            SweepError::Fetch { max_id, source }
        })?;
        info!(?max_id, page_len = page.len(), "Timeline retrieved");
        Ok(page)
    }

    /// Deletes every post in `posts` that the retention policy lets go, in
    /// the order given, and picks the next cursor. A timestamp that does not
    /// parse always aborts the page; a failed delete aborts it under
    /// [`DeleteErrorPolicy::Halt`].
    pub async fn sweep_page(&self, posts: &[Post]) -> Result<PageOutcome, SweepError> {
        let now = Utc::now();
        let retention = &self.config.retention;
        let mut outcome = PageOutcome::default();
        let mut oldest: Option<(u64, TimeDelta)> = None;

        for post in posts {
            let age = post.age_at(now).map_err(|source| {
                error!(post_id = post.id, created_at = %post.created_at, "Could not parse post time");
                SweepError::TimestampParse {
                    id: post.id,
                    value: post.created_at.clone(),
                    source,
                }
            })?;

            if retention.should_delete(post.id, age) {
                match self.api.delete_post(post.id).await {
                    Ok(()) => {
                        outcome.deleted += 1;
                        info!(post_id = post.id, created_at = %post.created_at, text = %post.text, "Deleted post");
                    }
                    Err(source) => match self.config.delete_error_policy {
                        DeleteErrorPolicy::Halt => {
                            error!(post_id = post.id, error = ?source, "Failed to delete post");
                            return Err(SweepError::Delete { id: post.id, source });
                        }
                        DeleteErrorPolicy::Skip => {
                            warn!(post_id = post.id, error = ?source, "Failed to delete post, skipping");
                            outcome.delete_failures += 1;
                        }
                    },
                }
            } else {
                outcome.kept += 1;
            }

            if oldest.is_none_or(|(_, max_age)| age > max_age) {
                oldest = Some((post.id, age));
            }
        }

        outcome.cursor = oldest.map(|(id, _)| id);
        Ok(outcome)
    }
}
