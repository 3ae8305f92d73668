use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// A previously downloaded list of post ids, `{ "tweets": ["123", ...] }`.
#[derive(Debug, Deserialize, Serialize, Default, PartialEq)]
pub struct PostExport {
    #[serde(default)]
    pub tweets: Vec<String>,
}

impl PostExport {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read export file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse export file {}", path.display()))
    }
}
