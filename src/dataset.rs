//! # Block Datasets
//!
//! Key-partitioned block collections and the handful of data-parallel
//! operations the operators in this crate need: per-entry map, flat map,
//! key join and broadcast lookup. Work is spread over the rayon pool.

/*
 * File: /src/dataset.rs
 * Created Date: Monday, October 19th 2026
 * Author: Zihan
 * -----
 * Last Modified: Monday, 19th October 2026
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-19		Zihan	Block dataset with map/flat map/join/broadcast
 */

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use ndarray::{s, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::matrix::MatrixBlock;
use crate::util::{compute_block_size, compute_num_blocks};

/// 1-based `(row, col)` coordinates of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockIndex {
    pub row: i64,
    pub col: i64,
}

impl BlockIndex {
    pub fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for BlockIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// Unordered collection of values keyed by unique block index.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDataset<V> {
    blocks: HashMap<BlockIndex, V>,
}

impl<V> Default for BlockDataset<V> {
    fn default() -> Self {
        Self {
            blocks: HashMap::new(),
        }
    }
}

impl<V> BlockDataset<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a dataset, rejecting repeated keys.
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (BlockIndex, V)>,
    ) -> Result<Self, DatasetError> {
        let mut blocks = HashMap::new();
        for (index, value) in pairs {
            if blocks.insert(index, value).is_some() {
                return Err(DatasetError::DuplicateKey(index));
            }
        }
        Ok(Self { blocks })
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: &BlockIndex) -> Option<&V> {
        self.blocks.get(index)
    }

    pub fn contains(&self, index: &BlockIndex) -> bool {
        self.blocks.contains_key(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BlockIndex, &V)> {
        self.blocks.iter()
    }

    /// Keys in ascending `(row, col)` order.
    pub fn sorted_keys(&self) -> Vec<BlockIndex> {
        let mut keys: Vec<BlockIndex> = self.blocks.keys().copied().collect();
        keys.sort();
        keys
    }
}

impl<V: Send + Sync> BlockDataset<V> {
    /// Applies `f` to every value, keeping keys. The first error observed
    /// aborts the whole map.
    pub fn try_map_values<U, E, F>(&self, f: F) -> Result<BlockDataset<U>, E>
    where
        U: Send,
        E: Send,
        F: Fn(&BlockIndex, &V) -> Result<U, E> + Sync + Send,
    {
        let blocks = self
            .blocks
            .par_iter()
            .map(|(index, value)| f(index, value).map(|out| (*index, out)))
            .collect::<Result<HashMap<_, _>, E>>()?;
        Ok(BlockDataset { blocks })
    }

    /// Re-keys every entry; the new keys must stay unique.
    pub fn map_to_pair<U, F>(&self, f: F) -> Result<BlockDataset<U>, DatasetError>
    where
        U: Send,
        F: Fn(&BlockIndex, &V) -> (BlockIndex, U) + Sync + Send,
    {
        let pairs: Vec<(BlockIndex, U)> = self
            .blocks
            .par_iter()
            .map(|(index, value)| f(index, value))
            .collect();
        BlockDataset::from_pairs(pairs)
    }

    /// Expands every entry into zero or more entries; the new keys must stay
    /// unique across the whole output.
    pub fn flat_map_to_pair<U, F>(&self, f: F) -> Result<BlockDataset<U>, DatasetError>
    where
        U: Send,
        F: Fn(&BlockIndex, &V) -> Vec<(BlockIndex, U)> + Sync + Send,
    {
        let nested: Vec<Vec<(BlockIndex, U)>> = self
            .blocks
            .par_iter()
            .map(|(index, value)| f(index, value))
            .collect();
        BlockDataset::from_pairs(nested.into_iter().flatten())
    }

    /// Expands every entry into arbitrary records, collected in no
    /// particular order.
    pub fn par_flat_map<U, F>(&self, f: F) -> Vec<U>
    where
        U: Send,
        F: Fn(&BlockIndex, &V) -> Vec<U> + Sync + Send,
    {
        self.blocks
            .par_iter()
            .flat_map_iter(|(index, value)| f(index, value))
            .collect()
    }

    /// Pairs every entry with the entry of `other` under the same key.
    ///
    /// Every key of `self` must be present in `other`; keys only present in
    /// `other` are dropped.
    pub fn join<'a, W: Sync>(
        &'a self,
        other: &'a BlockDataset<W>,
    ) -> Result<BlockDataset<(&'a V, &'a W)>, DatasetError> {
        let blocks = self
            .blocks
            .par_iter()
            .map(|(index, left)| match other.blocks.get(index) {
                Some(right) => Ok((*index, (left, right))),
                None => Err(DatasetError::MissingKey(*index)),
            })
            .collect::<Result<HashMap<_, _>, DatasetError>>()?;
        Ok(BlockDataset { blocks })
    }

    /// Turns the dataset into a read-only table shared by all workers.
    pub fn broadcast(self) -> PartitionedBroadcast<V> {
        PartitionedBroadcast {
            blocks: Arc::new(self.blocks),
        }
    }
}

impl BlockDataset<MatrixBlock> {
    /// Cuts a dense matrix into `rows_per_block x cols_per_block` blocks.
    pub fn from_matrix(matrix: &Array2<f64>, rows_per_block: i32, cols_per_block: i32) -> Self {
        let (rows, cols) = (matrix.nrows() as i64, matrix.ncols() as i64);
        let mut blocks = HashMap::new();
        for br in 1..=compute_num_blocks(rows, rows_per_block) {
            let r0 = ((br - 1) * rows_per_block as i64) as usize;
            let h = compute_block_size(rows, br, rows_per_block);
            for bc in 1..=compute_num_blocks(cols, cols_per_block) {
                let c0 = ((bc - 1) * cols_per_block as i64) as usize;
                let w = compute_block_size(cols, bc, cols_per_block);
                let payload = matrix.slice(s![r0..r0 + h, c0..c0 + w]).to_owned();
                blocks.insert(BlockIndex::new(br, bc), MatrixBlock::new(payload));
            }
        }
        Self { blocks }
    }

    /// Assembles the blocks back into a dense `rows x cols` matrix. Missing
    /// blocks stay zero.
    pub fn to_matrix(
        &self,
        rows: i64,
        cols: i64,
        rows_per_block: i32,
        cols_per_block: i32,
    ) -> Result<Array2<f64>, DatasetError> {
        let mut out = Array2::zeros((rows as usize, cols as usize));
        for (index, block) in &self.blocks {
            let r0 = (index.row - 1) * rows_per_block as i64;
            let c0 = (index.col - 1) * cols_per_block as i64;
            let (h, w) = (block.num_rows() as i64, block.num_cols() as i64);
            if index.row < 1 || index.col < 1 || r0 + h > rows || c0 + w > cols {
                return Err(DatasetError::BlockOutOfBounds(*index));
            }
            let (r0, c0) = (r0 as usize, c0 as usize);
            out.slice_mut(s![r0..r0 + h as usize, c0..c0 + w as usize])
                .assign(&block.data);
        }
        Ok(out)
    }

    pub fn non_zeros(&self) -> i64 {
        self.blocks
            .par_iter()
            .map(|(_, block)| block.non_zeros() as i64)
            .sum()
    }
}

/// Read-only block table replicated to every worker; cloning shares it.
#[derive(Debug)]
pub struct PartitionedBroadcast<V> {
    blocks: Arc<HashMap<BlockIndex, V>>,
}

impl<V> Clone for PartitionedBroadcast<V> {
    fn clone(&self) -> Self {
        Self {
            blocks: Arc::clone(&self.blocks),
        }
    }
}

impl<V> PartitionedBroadcast<V> {
    pub fn get_block(&self, row: i64, col: i64) -> Result<&V, DatasetError> {
        let index = BlockIndex::new(row, col);
        self.blocks
            .get(&index)
            .ok_or(DatasetError::MissingBroadcastBlock(index))
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DatasetError {
    DuplicateKey(BlockIndex),
    MissingKey(BlockIndex),
    MissingBroadcastBlock(BlockIndex),
    BlockOutOfBounds(BlockIndex),
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DatasetError::DuplicateKey(ix) => write!(f, "Duplicate block key {}", ix),
            DatasetError::MissingKey(ix) => write!(f, "No join partner for block key {}", ix),
            DatasetError::MissingBroadcastBlock(ix) => {
                write!(f, "Block {} missing from broadcast", ix)
            }
            DatasetError::BlockOutOfBounds(ix) => {
                write!(f, "Block {} lies outside the matrix", ix)
            }
        }
    }
}

impl Error for DatasetError {}
