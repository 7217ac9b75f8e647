//! First pass of the distributed prefix aggregate: per-block summaries and
//! the offset aggregates consumed by [`CumulativeOffsetEngine`].

/*
 * File: /src/cumulative/aggregate.rs
 * Created Date: Monday, October 19th 2026
 * Author: Zihan
 * -----
 * Last Modified: Monday, 19th October 2026
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-19		Zihan	Block summaries, offset aggregates and the two-pass scan
 */

use log::{debug, info};
use ndarray::{s, Array2};

use crate::cumulative::kernels::{combine, cumulative};
use crate::cumulative::offset::CumulativeOffsetEngine;
use crate::cumulative::types::{CumulativeError, CumulativeOp, UnaryAggKind};
use crate::dataset::{BlockDataset, DatasetError};
use crate::matrix::{MatrixBlock, MatrixMetadata};

/// Summary row of every data block.
///
/// The summary is the last row of the block's own prefix aggregate. For the
/// fused variant it is the pair `(A, B)` such that the block maps an incoming
/// carry `x` to `A + B * x`: `A` is the block's cumsum-of-products seeded
/// with zero and `B` the product of its weight column.
pub fn local_block_aggregates(
    op: &CumulativeOp,
    data: &BlockDataset<MatrixBlock>,
) -> Result<BlockDataset<MatrixBlock>, CumulativeError> {
    data.try_map_values(|_, block| {
        let rows = block.num_rows();
        if rows == 0 {
            return Err(CumulativeError::ShapeMismatch("empty data block".to_string()));
        }
        let prefix = cumulative(op.unary, &block.data)?;
        let last = prefix.slice(s![rows - 1..rows, ..]).to_owned();
        if op.unary != UnaryAggKind::CumSumProd {
            return Ok(MatrixBlock::new(last));
        }
        let weight: f64 = block.data.column(1).iter().product();
        Ok(MatrixBlock::new(ndarray::array![[last[(0, 0)], weight]]))
    })
}

/// Global prefix over the block summaries, seeded with `init_value` and
/// blocked at `agg_rows_per_block`. Row `k` of the result is the aggregate of
/// data blocks `1..=k`.
///
/// The summaries are gathered into one matrix with a row per data row-block,
/// which keeps the work proportional to the block count.
pub fn build_offset_aggregates(
    op: &CumulativeOp,
    local: &BlockDataset<MatrixBlock>,
    data_metadata: &MatrixMetadata,
    init_value: f64,
    agg_rows_per_block: i32,
) -> Result<(MatrixMetadata, BlockDataset<MatrixBlock>), CumulativeError> {
    let num_row_blocks = data_metadata.num_row_blocks();
    let bclen = data_metadata.cols_per_block;
    let width = if op.is_fused() {
        if data_metadata.num_col_blocks() != 1 {
            return Err(CumulativeError::ShapeMismatch(format!(
                "{} needs the (value, weight) columns in one column block",
                op
            )));
        }
        2
    } else {
        data_metadata.cols as usize
    };

    let mut summaries = Array2::zeros((num_row_blocks as usize, width));
    for (index, block) in local.iter() {
        let row = (index.row - 1) as usize;
        let c0 = if op.is_fused() {
            0
        } else {
            (index.col - 1) as usize * bclen as usize
        };
        let w = block.num_cols();
        if row >= summaries.nrows() || c0 + w > width || block.num_rows() != 1 {
            return Err(DatasetError::BlockOutOfBounds(*index).into());
        }
        summaries.slice_mut(s![row..row + 1, c0..c0 + w]).assign(&block.data);
    }

    let seed = MatrixBlock::filled(1, if op.is_fused() { 1 } else { width }, init_value);
    let prefix = combine(op, &MatrixBlock::new(summaries), &seed)?;
    let (rows, cols) = prefix.data.dim();
    // validate the block size before blocking
    let mut metadata =
        MatrixMetadata::new(rows as i64, cols as i64, agg_rows_per_block, bclen, -1)?;
    let blocks = BlockDataset::from_matrix(&prefix.data, agg_rows_per_block, bclen);
    metadata.non_zeros = blocks.non_zeros();
    debug!(
        "{}: {} offset rows from {} block summaries",
        op,
        rows,
        local.len()
    );
    Ok((metadata, blocks))
}

/// Full two-pass prefix aggregate of `data` along its rows.
pub fn cumulative_scan(
    engine: &CumulativeOffsetEngine,
    data: &BlockDataset<MatrixBlock>,
    data_metadata: &MatrixMetadata,
    agg_rows_per_block: i32,
) -> Result<(MatrixMetadata, BlockDataset<MatrixBlock>), CumulativeError> {
    let op = engine.op();
    let local = local_block_aggregates(op, data)?;
    let (agg_metadata, agg) = build_offset_aggregates(
        op,
        &local,
        data_metadata,
        engine.init_value(),
        agg_rows_per_block,
    )?;
    let out = engine.apply(data, &agg, &agg_metadata)?;
    info!(
        "{} over {}x{} ({} blocks, {})",
        op,
        data_metadata.rows,
        data_metadata.cols,
        data.len(),
        if engine.is_broadcast() { "broadcast" } else { "shuffle" }
    );
    Ok((engine.output_metadata(data_metadata)?, out))
}
