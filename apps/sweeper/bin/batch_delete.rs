use anyhow::{Context, Result};
use dotenv::dotenv;
use sweeper::{batch::BatchDeleter, config::BatchConfig, twitter_api::TwitterApi};
use tracing::info;
use utils::{
    errors::{API_CLIENT_BUILD_FAILED, BATCH_DELETE_FAILED, CONFIG_LOAD_FAILED},
    tracing::run_with_tracing,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv().ok();
    run_with_tracing(delete_from_export).await
}

async fn delete_from_export() -> Result<()> {
    let config = BatchConfig::from_env().context(CONFIG_LOAD_FAILED)?;
    let api = TwitterApi::from_config(&config.api).context(API_CLIENT_BUILD_FAILED)?;

    let summary = BatchDeleter::new(api, config)
        .run()
        .await
        .context(BATCH_DELETE_FAILED)?;

    info!(
        attempted = summary.attempted,
        deleted = summary.deleted,
        unparsable = summary.unparsable,
        delete_failures = summary.delete_failures,
        pauses = summary.pauses,
        "Batch delete complete"
    );
    Ok(())
}
