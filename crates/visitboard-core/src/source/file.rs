//! Day-level records from a JSON file

use std::path::{Path, PathBuf};

use super::parse_payload;
use crate::error::CoreError;
use crate::models::RawDailyRecord;

/// Reads a JSON array of records (or `{"daily": [...]}`) from disk
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Vec<RawDailyRecord>, CoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CoreError::FileNotFound {
                    path: self.path.clone(),
                })
            }
            Err(source) => {
                return Err(CoreError::FileRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        parse_payload(&text, &self.path.display().to_string())
    }
}
