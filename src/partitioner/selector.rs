//! # Partition Format Selection
//!
//! Decides the effective partition format for a matrix and whether its
//! partitions should be re-encoded as cells.

/*
 * File: /src/partitioner/selector.rs
 * Created Date: Monday, October 19th 2026
 * Author: Zihan
 * -----
 * Last Modified: Monday, 19th October 2026
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-19		Zihan	Partition format selection rules
 */

use log::info;

use crate::config::Thresholds;
use crate::matrix::{MatrixMetadata, StorageFormat};
use crate::partitioner::types::{FormatDecision, PartitionFormat};

/// Chooses the effective format for partitioning a matrix described by
/// `metadata` with the `requested` format.
///
/// Unless `force` is set, partitioning is skipped for vectors and for
/// matrices that fit in memory on both sides, and single-row/column
/// partitioning falls back to the block-wise variant when the other side is
/// small. Dense-block column slices sparser than the cell threshold are
/// always re-encoded as cells.
pub fn select_format(
    requested: PartitionFormat,
    metadata: &MatrixMetadata,
    thresholds: &Thresholds,
    force: bool,
) -> FormatDecision {
    let mut format = requested;
    if format == PartitionFormat::None {
        return FormatDecision {
            format,
            convert_to_cells: false,
        };
    }

    let (rows, cols) = (metadata.rows, metadata.cols);
    let limit = thresholds.in_memory_threshold;
    if !force {
        if metadata.is_vector() || (rows < limit && cols < limit) {
            return FormatDecision {
                format: PartitionFormat::None,
                convert_to_cells: false,
            };
        }
        if format == PartitionFormat::RowWise && cols < limit {
            info!(
                "Changing partition format from {} to {} ({} cols < {})",
                format,
                PartitionFormat::RowBlockWise,
                cols,
                limit
            );
            format = PartitionFormat::RowBlockWise;
        }
        if format == PartitionFormat::ColumnWise && rows < limit {
            info!(
                "Changing partition format from {} to {} ({} rows < {})",
                format,
                PartitionFormat::ColumnBlockWise,
                rows,
                limit
            );
            format = PartitionFormat::ColumnBlockWise;
        }
    }

    let convert_to_cells = metadata.storage_format == StorageFormat::DenseBlock
        && format == PartitionFormat::ColumnWise
        && metadata.sparsity() < thresholds.sparsity_cell_threshold;
    if convert_to_cells {
        info!(
            "Storing {} partitions as cells (sparsity {:.4} < {})",
            format,
            metadata.sparsity(),
            thresholds.sparsity_cell_threshold
        );
    }

    FormatDecision {
        format,
        convert_to_cells,
    }
}
