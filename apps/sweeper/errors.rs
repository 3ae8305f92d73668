use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to fetch timeline page (max_id: {max_id:?})")]
    Fetch {
        max_id: Option<u64>,
        #[source]
        source: anyhow::Error,
    },

    #[error("could not parse creation time {value:?} of post {id}")]
    TimestampParse {
        id: u64,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("failed to delete post {id}")]
    Delete {
        id: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to load post export {}", .path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}
