//! # Cumulative Offset Engine
//!
//! Second pass of a distributed prefix aggregate over a row-block
//! partitioned matrix. The aggregate input holds one row per data row-block:
//! row `k` (1-based) is the aggregate of data blocks `1..=k`, seeded with the
//! init value. Data block `r` is therefore seeded with aggregate row `r - 1`,
//! or with a row of init values for `r == 1`.
//!
//! The offsets reach their data blocks either through a broadcast lookup or
//! through a split-and-join on block keys.

/*
 * File: /src/cumulative/offset.rs
 * Created Date: Monday, October 19th 2026
 * Author: Zihan
 * -----
 * Last Modified: Monday, 19th October 2026
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-19		Zihan	Broadcast and shuffle offset application
 */

use std::time::Instant;

use log::debug;

use crate::cumulative::kernels::combine;
use crate::cumulative::types::{CumulativeError, CumulativeOp};
use crate::dataset::{BlockDataset, BlockIndex, DatasetError, PartitionedBroadcast};
use crate::matrix::{MatrixBlock, MatrixMetadata};
use crate::util::{compute_block_index, compute_cell_in_block, compute_num_blocks};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CumulativeOffsetEngine {
    op: CumulativeOp,
    init_value: f64,
    broadcast: bool,
}

impl CumulativeOffsetEngine {
    /// Binds `opcode` to its operator pair; unknown opcodes are rejected here.
    pub fn new(opcode: &str, init_value: f64, broadcast: bool) -> Result<Self, CumulativeError> {
        Ok(Self::with_op(CumulativeOp::from_opcode(opcode)?, init_value, broadcast))
    }

    pub fn with_op(op: CumulativeOp, init_value: f64, broadcast: bool) -> Self {
        Self {
            op,
            init_value,
            broadcast,
        }
    }

    pub fn op(&self) -> &CumulativeOp {
        &self.op
    }

    pub fn init_value(&self) -> f64 {
        self.init_value
    }

    pub fn is_broadcast(&self) -> bool {
        self.broadcast
    }

    /// Applies the offsets in `agg` to every block of `data`, using the
    /// broadcast or shuffle path as configured.
    pub fn apply(
        &self,
        data: &BlockDataset<MatrixBlock>,
        agg: &BlockDataset<MatrixBlock>,
        agg_metadata: &MatrixMetadata,
    ) -> Result<BlockDataset<MatrixBlock>, CumulativeError> {
        if self.broadcast {
            self.apply_broadcast(data, &agg.clone().broadcast(), agg_metadata)
        } else {
            self.apply_shuffle(data, agg, agg_metadata)
        }
    }

    /// Broadcast path: every data block looks its offset row up in the
    /// shared aggregate table.
    pub fn apply_broadcast(
        &self,
        data: &BlockDataset<MatrixBlock>,
        agg: &PartitionedBroadcast<MatrixBlock>,
        agg_metadata: &MatrixMetadata,
    ) -> Result<BlockDataset<MatrixBlock>, CumulativeError> {
        let start = Instant::now();
        let (agg_rows, brlen) = (agg_metadata.rows, agg_metadata.rows_per_block);
        let out = data.try_map_values(|index, block| {
            let offset = self.lookup_offset(agg, index, block, agg_rows, brlen)?;
            self.combine_checked(index, block, &offset)
        })?;
        debug!(
            "{} (broadcast) over {} blocks in {:?}",
            self.op,
            out.len(),
            start.elapsed()
        );
        Ok(out)
    }

    /// Shuffle path: split the aggregates into per-block offset rows and
    /// join them with the data by key.
    pub fn apply_shuffle(
        &self,
        data: &BlockDataset<MatrixBlock>,
        agg: &BlockDataset<MatrixBlock>,
        agg_metadata: &MatrixMetadata,
    ) -> Result<BlockDataset<MatrixBlock>, CumulativeError> {
        let start = Instant::now();
        let offsets = self.split_offsets(agg, agg_metadata)?;
        let joined = data.join(&offsets)?;
        let out = joined.try_map_values(|index, (block, offset)| {
            self.combine_checked(index, block, offset)
        })?;
        debug!(
            "{} (shuffle) over {} blocks, {} offset rows in {:?}",
            self.op,
            out.len(),
            offsets.len(),
            start.elapsed()
        );
        Ok(out)
    }

    /// Re-keys every aggregate row under the data block it seeds: row `i`
    /// of aggregate block `(b, c)` goes to `((b-1) * brlen + i + 2, c)`.
    /// Block `b == 1` also emits the init row under `(1, c)`; the very last
    /// aggregate row seeds nothing and is dropped.
    pub fn split_offsets(
        &self,
        agg: &BlockDataset<MatrixBlock>,
        agg_metadata: &MatrixMetadata,
    ) -> Result<BlockDataset<MatrixBlock>, DatasetError> {
        let brlen = agg_metadata.rows_per_block;
        let last_row_block = compute_num_blocks(agg_metadata.rows, brlen);
        let init_value = self.init_value;
        agg.flat_map_to_pair(|index, block| {
            let row_offset = (index.row - 1) * brlen as i64;
            let mut out = Vec::with_capacity(block.num_rows() + 1);
            if index.row == 1 {
                out.push((
                    BlockIndex::new(1, index.col),
                    MatrixBlock::filled(1, block.num_cols(), init_value),
                ));
            }
            for i in 0..block.num_rows() {
                if index.row == last_row_block && i + 1 == block.num_rows() {
                    continue;
                }
                out.push((
                    BlockIndex::new(row_offset + i as i64 + 2, index.col),
                    block.slice_row(i),
                ));
            }
            out
        })
    }

    /// Metadata of the result for data described by `data_metadata`.
    pub fn output_metadata(
        &self,
        data_metadata: &MatrixMetadata,
    ) -> Result<MatrixMetadata, CumulativeError> {
        let cols = if self.op.is_fused() { 1 } else { data_metadata.cols };
        Ok(MatrixMetadata::new(
            data_metadata.rows,
            cols,
            data_metadata.rows_per_block,
            data_metadata.cols_per_block,
            -1,
        )?)
    }

    fn lookup_offset(
        &self,
        agg: &PartitionedBroadcast<MatrixBlock>,
        index: &BlockIndex,
        block: &MatrixBlock,
        agg_rows: i64,
        brlen: i32,
    ) -> Result<MatrixBlock, CumulativeError> {
        if index.row == 1 {
            let width = if self.op.is_fused() { 1 } else { block.num_cols() };
            return Ok(MatrixBlock::filled(1, width, self.init_value));
        }
        let agg_block = agg.get_block(compute_block_index(index.row - 1, brlen), index.col)?;
        let row = compute_cell_in_block(index.row - 1, brlen);
        if index.row - 1 > agg_rows || row >= agg_block.num_rows() {
            return Err(CumulativeError::MissingOffset(*index));
        }
        Ok(agg_block.slice_row(row))
    }

    fn combine_checked(
        &self,
        index: &BlockIndex,
        block: &MatrixBlock,
        offset: &MatrixBlock,
    ) -> Result<MatrixBlock, CumulativeError> {
        let expected = if self.op.is_fused() { 1 } else { block.num_cols() };
        let width_ok = if self.op.is_fused() {
            offset.num_cols() >= 1
        } else {
            offset.num_cols() == expected
        };
        if !width_ok {
            return Err(CumulativeError::OffsetWidth {
                index: *index,
                expected,
                actual: offset.num_cols(),
            });
        }
        combine(&self.op, block, offset)
    }
}
