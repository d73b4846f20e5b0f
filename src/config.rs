use crate::error::Result;
use crate::plan::{DEFAULT_BATCH_SIZE, DEFAULT_TRANSACTION_COUNT, TARGET_SLIDES};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Run settings. Every field has a default, so a config file only needs
/// the keys it changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportConfig {
    pub transaction_count: usize,
    pub batch_size: usize,
    pub target_slides: usize,
    /// Seed for record generation and cosmetics; `None` draws from entropy.
    pub seed: Option<u64>,
    pub title: Option<String>,
    pub output: PathBuf,
    pub manifest: Option<PathBuf>,
    pub records_csv: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            transaction_count: DEFAULT_TRANSACTION_COUNT,
            batch_size: DEFAULT_BATCH_SIZE,
            target_slides: TARGET_SLIDES,
            seed: None,
            title: None,
            output: PathBuf::from("trade_report.html"),
            manifest: None,
            records_csv: None,
        }
    }
}

impl ReportConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
