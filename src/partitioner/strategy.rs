//! # Split Strategies
//!
//! Physical splitting of a blocked matrix into partitions, one strategy per
//! partition format. Strategies are pure: blocks in, partitions out.

/*
 * File: /src/partitioner/strategy.rs
 * Created Date: Monday, October 19th 2026
 * Author: Zihan
 * -----
 * Last Modified: Monday, 19th October 2026
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-19		Zihan	Row, column and block split strategies
 */

use std::collections::BTreeMap;

use crate::dataset::{BlockDataset, BlockIndex};
use crate::matrix::{MatrixBlock, MatrixMetadata};
use crate::partitioner::types::{PartitionFormat, PartitionPayload};
use crate::util::compute_cell_index;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
    RowWise,
    ColumnWise,
    RowBlockWise,
    ColumnBlockWise,
}

impl SplitStrategy {
    /// Strategy for `format`; `None` has nothing to split.
    pub fn for_format(format: PartitionFormat) -> Option<Self> {
        match format {
            PartitionFormat::None => None,
            PartitionFormat::RowWise => Some(SplitStrategy::RowWise),
            PartitionFormat::ColumnWise => Some(SplitStrategy::ColumnWise),
            PartitionFormat::RowBlockWise => Some(SplitStrategy::RowBlockWise),
            PartitionFormat::ColumnBlockWise => Some(SplitStrategy::ColumnBlockWise),
        }
    }

    pub fn format(&self) -> PartitionFormat {
        match self {
            SplitStrategy::RowWise => PartitionFormat::RowWise,
            SplitStrategy::ColumnWise => PartitionFormat::ColumnWise,
            SplitStrategy::RowBlockWise => PartitionFormat::RowBlockWise,
            SplitStrategy::ColumnBlockWise => PartitionFormat::ColumnBlockWise,
        }
    }

    pub fn num_partitions(&self, metadata: &MatrixMetadata) -> i64 {
        match self {
            SplitStrategy::RowWise => metadata.rows,
            SplitStrategy::ColumnWise => metadata.cols,
            SplitStrategy::RowBlockWise => metadata.num_row_blocks(),
            SplitStrategy::ColumnBlockWise => metadata.num_col_blocks(),
        }
    }

    /// Block size of the partitioned matrix: the partitioned axis collapses
    /// to 1 for the single row/column formats.
    pub fn output_block_size(&self, metadata: &MatrixMetadata) -> (i32, i32) {
        match self {
            SplitStrategy::RowWise => (1, metadata.cols_per_block),
            SplitStrategy::ColumnWise => (metadata.rows_per_block, 1),
            SplitStrategy::RowBlockWise | SplitStrategy::ColumnBlockWise => {
                (metadata.rows_per_block, metadata.cols_per_block)
            }
        }
    }

    /// Splits the source blocks into partitions `1..=num_partitions`, in
    /// ascending order. With `convert_to_cells` each partition is written as
    /// its non-zero cells instead of blocks.
    pub fn split(
        &self,
        blocks: &BlockDataset<MatrixBlock>,
        metadata: &MatrixMetadata,
        convert_to_cells: bool,
    ) -> Vec<(i64, PartitionPayload)> {
        let (brlen, bclen) = (metadata.rows_per_block, metadata.cols_per_block);
        let emitted: Vec<(i64, BlockIndex, MatrixBlock)> =
            blocks.par_flat_map(|index, block| match self {
                SplitStrategy::RowWise => (0..block.num_rows())
                    .map(|i| {
                        (
                            compute_cell_index(index.row, brlen, i),
                            BlockIndex::new(1, index.col),
                            block.slice_row(i),
                        )
                    })
                    .collect(),
                SplitStrategy::ColumnWise => (0..block.num_cols())
                    .map(|j| {
                        (
                            compute_cell_index(index.col, bclen, j),
                            BlockIndex::new(index.row, 1),
                            block.slice_col(j),
                        )
                    })
                    .collect(),
                SplitStrategy::RowBlockWise => {
                    vec![(index.row, BlockIndex::new(1, index.col), block.clone())]
                }
                SplitStrategy::ColumnBlockWise => {
                    vec![(index.col, BlockIndex::new(index.row, 1), block.clone())]
                }
            });

        let mut grouped: BTreeMap<i64, Vec<(BlockIndex, MatrixBlock)>> =
            (1..=self.num_partitions(metadata)).map(|p| (p, Vec::new())).collect();
        for (partition, index, block) in emitted {
            grouped.entry(partition).or_default().push((index, block));
        }

        let (out_brlen, out_bclen) = self.output_block_size(metadata);
        grouped
            .into_iter()
            .map(|(partition, mut part_blocks)| {
                part_blocks.sort_by_key(|(ix, _)| *ix);
                let payload = if convert_to_cells {
                    let mut cells: Vec<_> = part_blocks
                        .iter()
                        .flat_map(|(ix, block)| {
                            block.to_cells(
                                (ix.row - 1) * out_brlen as i64,
                                (ix.col - 1) * out_bclen as i64,
                            )
                        })
                        .collect();
                    cells.sort_by_key(|c| (c.row, c.col));
                    PartitionPayload::Cells(cells)
                } else {
                    PartitionPayload::Blocks(part_blocks)
                };
                (partition, payload)
            })
            .collect()
    }
}
