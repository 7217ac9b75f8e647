/*
 * File: /matrix.rs
 * Created Date: Thursday November 23rd 2023
 * Author: Zihan
 * -----
 * Last Modified: Monday, 19th October 2026 2:18:35 pm
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-19		Zihan	Blocked matrix metadata, blocks and matrix handles
 */

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use crate::dataset::BlockDataset;
use crate::partitioner::PartitionFormat;
use crate::storage::{BlockStore, StorageError};
use crate::util::compute_num_blocks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Fp64,
    Int64,
    Boolean,
}

/// How the blocks of a matrix are encoded in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageFormat {
    DenseBlock,
    SparseBlock,
    /// Coordinate triples `(row, col, value)` of the non-zeros.
    CellList,
}

/// Shape, blocking and sparsity of a matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixMetadata {
    pub rows: i64,
    pub cols: i64,
    pub rows_per_block: i32,
    pub cols_per_block: i32,
    /// Negative when unknown.
    pub non_zeros: i64,
    pub storage_format: StorageFormat,
}

impl MatrixMetadata {
    pub fn new(
        rows: i64,
        cols: i64,
        rows_per_block: i32,
        cols_per_block: i32,
        non_zeros: i64,
    ) -> Result<Self, MatrixError> {
        let meta = Self {
            rows,
            cols,
            rows_per_block,
            cols_per_block,
            non_zeros,
            storage_format: StorageFormat::DenseBlock,
        };
        meta.validate()?;
        Ok(meta)
    }

    pub fn with_storage_format(mut self, storage_format: StorageFormat) -> Self {
        self.storage_format = storage_format;
        self
    }

    pub fn validate(&self) -> Result<(), MatrixError> {
        if self.rows_per_block <= 0 || self.cols_per_block <= 0 {
            return Err(MatrixError::InvalidBlockSize(
                self.rows_per_block,
                self.cols_per_block,
            ));
        }
        if self.rows < 0 || self.cols < 0 {
            return Err(MatrixError::InvalidDimensions(self.rows, self.cols));
        }
        Ok(())
    }

    /// Fraction of non-zero cells. Unknown non-zeros count as dense.
    pub fn sparsity(&self) -> f64 {
        if self.non_zeros < 0 {
            return 1.0;
        }
        let cells = self.rows as f64 * self.cols as f64;
        if cells == 0.0 {
            0.0
        } else {
            (self.non_zeros as f64 / cells).min(1.0)
        }
    }

    pub fn is_vector(&self) -> bool {
        self.rows == 1 || self.cols == 1
    }

    pub fn num_row_blocks(&self) -> i64 {
        compute_num_blocks(self.rows, self.rows_per_block)
    }

    pub fn num_col_blocks(&self) -> i64 {
        compute_num_blocks(self.cols, self.cols_per_block)
    }
}

/// A single non-zero cell, 1-based coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub row: i64,
    pub col: i64,
    pub value: f64,
}

/// Dense payload of one matrix block.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixBlock {
    pub data: Array2<f64>,
}

impl MatrixBlock {
    pub fn new(data: Array2<f64>) -> Self {
        Self { data }
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), value),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn num_cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn non_zeros(&self) -> usize {
        self.data.iter().filter(|v| **v != 0.0).count()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[(row, col)]
    }

    /// Copy of row `row` as a `1 x cols` block.
    pub fn slice_row(&self, row: usize) -> MatrixBlock {
        MatrixBlock::new(self.data.slice(s![row..row + 1, ..]).to_owned())
    }

    /// Copy of column `col` as a `rows x 1` block.
    pub fn slice_col(&self, col: usize) -> MatrixBlock {
        MatrixBlock::new(self.data.slice(s![.., col..col + 1]).to_owned())
    }

    /// Non-zeros as cells, shifted so that local `(0, 0)` lands on
    /// `(row_offset + 1, col_offset + 1)`.
    pub fn to_cells(&self, row_offset: i64, col_offset: i64) -> Vec<Cell> {
        self.data
            .indexed_iter()
            .filter(|(_, v)| **v != 0.0)
            .map(|((i, j), v)| Cell {
                row: row_offset + i as i64 + 1,
                col: col_offset + j as i64 + 1,
                value: *v,
            })
            .collect()
    }
}

/// Handle on a logical matrix: where it lives, what it looks like, and
/// optionally its blocks when it only exists in memory.
#[derive(Debug, Clone)]
pub struct MatrixObject {
    value_type: ValueType,
    var_name: String,
    file_name: String,
    metadata: MatrixMetadata,
    dirty: bool,
    data: Option<Arc<BlockDataset<MatrixBlock>>>,
    partition_format: Option<PartitionFormat>,
}

impl MatrixObject {
    /// Handle on a matrix already present in storage under `file_name`.
    pub fn persisted(var_name: &str, file_name: &str, metadata: MatrixMetadata) -> Self {
        Self {
            value_type: ValueType::Fp64,
            var_name: var_name.to_string(),
            file_name: file_name.to_string(),
            metadata,
            dirty: false,
            data: None,
            partition_format: None,
        }
    }

    /// Handle on an in-memory result not yet written to `file_name`.
    pub fn in_memory(
        var_name: &str,
        file_name: &str,
        metadata: MatrixMetadata,
        blocks: BlockDataset<MatrixBlock>,
    ) -> Self {
        Self {
            value_type: ValueType::Fp64,
            var_name: var_name.to_string(),
            file_name: file_name.to_string(),
            metadata,
            dirty: true,
            data: Some(Arc::new(blocks)),
            partition_format: None,
        }
    }

    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn with_partition_format(mut self, format: PartitionFormat) -> Self {
        self.partition_format = Some(format);
        self
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn var_name(&self) -> &str {
        &self.var_name
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn metadata(&self) -> &MatrixMetadata {
        &self.metadata
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_partitioned(&self) -> bool {
        self.partition_format.is_some()
    }

    pub fn partition_format(&self) -> Option<PartitionFormat> {
        self.partition_format
    }

    /// Writes the in-memory blocks to storage if they are newer than what
    /// storage holds. Fails if the matrix exists nowhere.
    pub fn export_data<S: BlockStore>(&mut self, store: &S) -> Result<(), StorageError> {
        if self.dirty {
            if let Some(blocks) = &self.data {
                store.write_matrix(&self.file_name, &self.metadata, blocks)?;
                log::debug!("Exported dirty matrix '{}' to '{}'", self.var_name, self.file_name);
            }
            self.dirty = false;
        }
        if !store.exists(&self.file_name) {
            return Err(StorageError::NotMaterialized(self.var_name.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatrixError {
    InvalidBlockSize(i32, i32),
    InvalidDimensions(i64, i64),
}

impl fmt::Display for MatrixError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MatrixError::InvalidBlockSize(br, bc) => {
                write!(f, "Invalid block size {}x{} (must be positive)", br, bc)
            }
            MatrixError::InvalidDimensions(r, c) => {
                write!(f, "Invalid matrix dimensions {}x{}", r, c)
            }
        }
    }
}

impl Error for MatrixError {}
