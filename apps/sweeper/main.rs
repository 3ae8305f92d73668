use anyhow::{Context, Result};
use dotenv::dotenv;
use sweeper::{config::SweepConfig, sweeper::Sweeper, twitter_api::TwitterApi};
use tracing::info;
use utils::{
    errors::{API_CLIENT_BUILD_FAILED, CONFIG_LOAD_FAILED, SWEEP_FAILED},
    tracing::run_with_tracing,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv().ok();
    run_with_tracing(sweep).await
}

async fn sweep() -> Result<()> {
    let config = SweepConfig::from_env().context(CONFIG_LOAD_FAILED)?;
    let api = TwitterApi::from_config(&config.api).context(API_CLIENT_BUILD_FAILED)?;

    info!(base_url = %api.base_url, "Starting retention sweep");
    let summary = Sweeper::new(api, config)
        .run()
        .await
        .context(SWEEP_FAILED)?;

    info!(
        fetches = summary.fetches,
        pages = summary.pages,
        deleted = summary.deleted,
        kept = summary.kept,
        delete_failures = summary.delete_failures,
        "Retention sweep complete"
    );
    Ok(())
}
