/*
 * File: /src/config.rs
 * Created Date: Friday, January 26th 2024
 * Author: Zihan
 * -----
 * Last Modified: Monday, 19th October 2026 10:00:00 pm
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-19		Zihan	Partitioner configuration replaces the npy matrix config
 */
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Dimension below which a matrix side is considered to fit on one node.
pub const DEFAULT_IN_MEMORY_THRESHOLD: i64 = 2000;

/// Column slices sparser than this are stored as cells instead of blocks.
/// Determined empirically: a cell costs 3-4 values per non-zero, so block
/// storage wins well below the usual sparse/dense turn point.
pub const DEFAULT_SPARSITY_CELL_THRESHOLD: f64 = 0.1;

/// Cost constants consumed by format selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub in_memory_threshold: i64,
    pub sparsity_cell_threshold: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            in_memory_threshold: DEFAULT_IN_MEMORY_THRESHOLD,
            sparsity_cell_threshold: DEFAULT_SPARSITY_CELL_THRESHOLD,
        }
    }
}

/// Partitioner settings, read once at startup and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionerConfig {
    /// Root of the durable block store.
    pub storage_root: PathBuf,
    /// Store-relative directory for in-flight partitioned outputs.
    pub staging_dir: String,
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl Default for PartitionerConfig {
    fn default() -> Self {
        Self {
            storage_root: std::env::temp_dir().join("fast_partition"),
            staging_dir: "_staging/partitioning".to_string(),
            thresholds: Thresholds::default(),
        }
    }
}

impl PartitionerConfig {
    /// constructor from command line arguments
    ///
    /// # Examples
    /// ```bash
    /// $ cargo run -- /tmp/blocks 2000 0.1
    /// ```
    pub fn new(mut args: impl Iterator<Item = String>) -> Result<Self, Box<dyn Error>> {
        // args:
        // 0: program name
        // 1: storage root
        // 2: in-memory threshold (optional)
        // 3: sparsity cell threshold (optional)
        args.next();
        let mut config = PartitionerConfig::default();
        let storage_root = args.next().ok_or("missing storage root argument")?;
        config.storage_root = PathBuf::from(storage_root);
        if let Some(threshold) = args.next() {
            config.thresholds.in_memory_threshold = threshold.parse::<i64>()?;
        }
        if let Some(sparsity) = args.next() {
            config.thresholds.sparsity_cell_threshold = sparsity.parse::<f64>()?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let text = fs::read_to_string(path)?;
        let config: PartitionerConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.thresholds.in_memory_threshold < 0 {
            return Err("in-memory threshold must be non-negative".into());
        }
        if !(0.0..=1.0).contains(&self.thresholds.sparsity_cell_threshold) {
            return Err("sparsity cell threshold must lie in [0, 1]".into());
        }
        if self.staging_dir.trim().is_empty() {
            return Err("staging directory must not be empty".into());
        }
        Ok(())
    }

    pub fn get_thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn get_staging_dir(&self) -> &str {
        &self.staging_dir
    }
}
