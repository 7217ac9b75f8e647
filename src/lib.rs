/*
 * File: /src/lib.rs
 * Created Date: Monday, January 22nd 2024
 * Author: Zihan
 * -----
 * Last Modified: Monday, 19th October 2026 6:02:11 pm
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-19		Zihan	Partitioning and cumulative aggregation modules
 */

//! Partitioning and distributed cumulative aggregation for blocked matrices.

pub mod config;
pub mod context;
pub mod cumulative;
pub mod dataset;
pub mod matrix;
pub mod partitioner;
pub mod storage;
pub mod util;

use chrono::Local;
use log::LevelFilter;

pub use config::{PartitionerConfig, Thresholds};
pub use context::ExecutionContext;
pub use cumulative::{CumulativeOffsetEngine, CumulativeOffsetInstruction, CumulativeOp};
pub use dataset::{BlockDataset, BlockIndex, PartitionedBroadcast};
pub use matrix::{MatrixBlock, MatrixMetadata, MatrixObject};
pub use partitioner::{DataPartitioner, PartitionFormat};
pub use storage::{BlockStore, LocalBlockStore};

/// Installs the stdout logger at `level`.
pub fn init_logger(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    simple_logger::SimpleLogger::new().with_level(level).init()
}

/// Wall-clock time for run log lines.
pub fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}
