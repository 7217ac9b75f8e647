/*
 * File: /src/util.rs
 * Created Date: Tuesday, June 18th 2024
 * Author: Zihan
 * -----
 * Last Modified: Monday, 19th October 2026 10:12:25 am
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-19		Zihan	Block addressing helpers for blocked matrices
 */

//! Block addressing.
//!
//! All cell and block indexes here are 1-based, matching the block keys of
//! [`crate::dataset::BlockDataset`]. Offsets inside a block are 0-based.

/// Index of the block containing the 1-based `cell_index`.
pub fn compute_block_index(cell_index: i64, block_len: i32) -> i64 {
    (cell_index - 1) / block_len as i64 + 1
}

/// 0-based offset of the 1-based `cell_index` inside its block.
pub fn compute_cell_in_block(cell_index: i64, block_len: i32) -> usize {
    ((cell_index - 1) % block_len as i64) as usize
}

/// 1-based global index of offset `cell_in_block` inside block `block_index`.
pub fn compute_cell_index(block_index: i64, block_len: i32, cell_in_block: usize) -> i64 {
    (block_index - 1) * block_len as i64 + cell_in_block as i64 + 1
}

/// Number of blocks needed to cover `len` cells.
pub fn compute_num_blocks(len: i64, block_len: i32) -> i64 {
    if len <= 0 {
        return 0;
    }
    (len + block_len as i64 - 1) / block_len as i64
}

/// Extent of block `block_index`; only the last block may be partial.
pub fn compute_block_size(len: i64, block_index: i64, block_len: i32) -> usize {
    let start = (block_index - 1) * block_len as i64;
    (len - start).clamp(0, block_len as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_index_and_offset() {
        assert_eq!(compute_block_index(1, 4), 1);
        assert_eq!(compute_block_index(4, 4), 1);
        assert_eq!(compute_block_index(5, 4), 2);
        assert_eq!(compute_block_index(10, 4), 3);

        assert_eq!(compute_cell_in_block(1, 4), 0);
        assert_eq!(compute_cell_in_block(4, 4), 3);
        assert_eq!(compute_cell_in_block(5, 4), 0);
        assert_eq!(compute_cell_in_block(10, 4), 1);
    }

    #[test]
    fn test_cell_index_inverts_addressing() {
        for cell in 1..=37_i64 {
            let block = compute_block_index(cell, 5);
            let offset = compute_cell_in_block(cell, 5);
            assert_eq!(compute_cell_index(block, 5, offset), cell);
        }
    }

    #[test]
    fn test_block_counts_and_partial_blocks() {
        assert_eq!(compute_num_blocks(10, 4), 3);
        assert_eq!(compute_num_blocks(8, 4), 2);
        assert_eq!(compute_num_blocks(0, 4), 0);

        assert_eq!(compute_block_size(10, 1, 4), 4);
        assert_eq!(compute_block_size(10, 2, 4), 4);
        assert_eq!(compute_block_size(10, 3, 4), 2);
        // past the end
        assert_eq!(compute_block_size(10, 4, 4), 0);
    }
}
