//! # Partitioning Data Structures
//!
//! Formats, split outputs and errors shared by the partitioner pieces.

/*
 * File: /src/partitioner/types.rs
 * Created Date: Monday, October 19th 2026
 * Author: Zihan
 * -----
 * Last Modified: Monday, 19th October 2026
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-19		Zihan	Created data structures for matrix partitioning
 */

use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dataset::{BlockIndex, DatasetError};
use crate::matrix::{Cell, MatrixBlock, MatrixError, MatrixMetadata};
use crate::storage::StorageError;

/// How a matrix is cut into independently readable partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionFormat {
    /// No partitioning; the matrix is read whole.
    None,
    /// One partition per row.
    RowWise,
    /// One partition per column.
    ColumnWise,
    /// One partition per row-block.
    RowBlockWise,
    /// One partition per column-block.
    ColumnBlockWise,
}

impl PartitionFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionFormat::None => "NONE",
            PartitionFormat::RowWise => "ROW_WISE",
            PartitionFormat::ColumnWise => "COLUMN_WISE",
            PartitionFormat::RowBlockWise => "ROW_BLOCK_WISE",
            PartitionFormat::ColumnBlockWise => "COLUMN_BLOCK_WISE",
        }
    }
}

impl fmt::Display for PartitionFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartitionFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(PartitionFormat::None),
            "ROW_WISE" => Ok(PartitionFormat::RowWise),
            "COLUMN_WISE" => Ok(PartitionFormat::ColumnWise),
            "ROW_BLOCK_WISE" => Ok(PartitionFormat::RowBlockWise),
            "COLUMN_BLOCK_WISE" => Ok(PartitionFormat::ColumnBlockWise),
            other => Err(format!("Unknown partition format '{}'", other)),
        }
    }
}

/// Outcome of format selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatDecision {
    pub format: PartitionFormat,
    /// Re-encode block payloads as coordinate cells.
    pub convert_to_cells: bool,
}

/// Content of one partition as written to storage.
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionPayload {
    /// Blocks keyed by their index inside the partition.
    Blocks(Vec<(BlockIndex, MatrixBlock)>),
    /// Non-zeros in partition-local 1-based coordinates.
    Cells(Vec<Cell>),
}

impl PartitionPayload {
    pub fn non_zeros(&self) -> usize {
        match self {
            PartitionPayload::Blocks(blocks) => blocks.iter().map(|(_, b)| b.non_zeros()).sum(),
            PartitionPayload::Cells(cells) => cells.len(),
        }
    }
}

/// Header stored next to a partitioned matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionedHeader {
    pub format: PartitionFormat,
    /// Metadata of the partitioned matrix (degenerate block sizes applied).
    pub metadata: MatrixMetadata,
    pub num_partitions: i64,
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug)]
pub enum PartitionError {
    Storage(StorageError),
    Matrix(MatrixError),
    Dataset(DatasetError),
    NotPartitioned(String),
    InvalidPartitionIndex { index: i64, num_partitions: i64 },
}

impl fmt::Display for PartitionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PartitionError::Storage(e) => write!(f, "Partitioning storage error: {}", e),
            PartitionError::Matrix(e) => write!(f, "Partitioning metadata error: {}", e),
            PartitionError::Dataset(e) => write!(f, "Partitioning dataset error: {}", e),
            PartitionError::NotPartitioned(name) => {
                write!(f, "Matrix '{}' is not partitioned", name)
            }
            PartitionError::InvalidPartitionIndex {
                index,
                num_partitions,
            } => write!(
                f,
                "Partition index {} out of range 1..={}",
                index, num_partitions
            ),
        }
    }
}

impl Error for PartitionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PartitionError::Storage(e) => Some(e),
            PartitionError::Matrix(e) => Some(e),
            PartitionError::Dataset(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for PartitionError {
    fn from(e: StorageError) -> Self {
        PartitionError::Storage(e)
    }
}

impl From<MatrixError> for PartitionError {
    fn from(e: MatrixError) -> Self {
        PartitionError::Matrix(e)
    }
}

impl From<DatasetError> for PartitionError {
    fn from(e: DatasetError) -> Self {
        PartitionError::Dataset(e)
    }
}
