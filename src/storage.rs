//! # Durable Block Storage
//!
//! The [`BlockStore`] trait is the storage seam used by the partitioner and
//! by matrix handles. [`LocalBlockStore`] keeps everything under one local
//! directory:
//!
//! ```text
//! <root>/<matrix>/metadata.json          shape, blocking, non-zeros
//! <root>/<matrix>/blocks/<r>_<c>.npy     one file per block
//! <root>/<matrix>_dp/metadata.json       partitioned header
//! <root>/<matrix>_dp/<p>/blocks/...      partition p stored as blocks
//! <root>/<matrix>_dp/<p>/cells.npy       partition p stored as n x 3 cells
//! ```

/*
 * File: /src/storage.rs
 * Created Date: Monday, October 19th 2026
 * Author: Zihan
 * -----
 * Last Modified: Monday, 19th October 2026
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-19		Zihan	Block store trait and npy-backed local implementation
 */

use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use ndarray_npy::{read_npy, write_npy};
use rayon::prelude::*;

use crate::dataset::{BlockDataset, BlockIndex};
use crate::matrix::{Cell, MatrixBlock, MatrixMetadata};
use crate::partitioner::{PartitionPayload, PartitionedHeader};

const METADATA_FILE: &str = "metadata.json";
const BLOCKS_DIR: &str = "blocks";
const CELLS_FILE: &str = "cells.npy";

/// Storage operations needed by the partitioner. Paths are opaque strings
/// owned by the store.
pub trait BlockStore: Send + Sync {
    fn exists(&self, path: &str) -> bool;

    /// Removes `path` and everything below it; absent paths are fine.
    fn delete(&self, path: &str) -> Result<(), StorageError>;

    fn create_dir(&self, path: &str) -> Result<(), StorageError>;

    fn rename(&self, from: &str, to: &str) -> Result<(), StorageError>;

    fn write_matrix(
        &self,
        path: &str,
        metadata: &MatrixMetadata,
        blocks: &BlockDataset<MatrixBlock>,
    ) -> Result<(), StorageError>;

    fn read_matrix(
        &self,
        path: &str,
    ) -> Result<(MatrixMetadata, BlockDataset<MatrixBlock>), StorageError>;

    fn write_partitioned(
        &self,
        path: &str,
        header: &PartitionedHeader,
        partitions: &[(i64, PartitionPayload)],
    ) -> Result<(), StorageError>;

    fn read_partitioned_header(&self, path: &str) -> Result<PartitionedHeader, StorageError>;

    fn read_partition(&self, path: &str, index: i64) -> Result<PartitionPayload, StorageError>;
}

/// [`BlockStore`] on a local directory tree.
#[derive(Debug, Clone)]
pub struct LocalBlockStore {
    root: PathBuf,
}

impl LocalBlockStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| StorageError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    fn write_blocks<'a>(
        dir: &Path,
        blocks: impl Iterator<Item = (&'a BlockIndex, &'a MatrixBlock)>,
    ) -> Result<(), StorageError> {
        fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
        let blocks: Vec<_> = blocks.collect();
        blocks.par_iter().try_for_each(|(index, block)| {
            let file = dir.join(format!("{}_{}.npy", index.row, index.col));
            write_npy(&file, &block.data).map_err(|e| StorageError::npy(&file, e))
        })
    }

    fn read_blocks(dir: &Path) -> Result<Vec<(BlockIndex, MatrixBlock)>, StorageError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| StorageError::io(dir, e))? {
            let entry = entry.map_err(|e| StorageError::io(dir, e))?;
            files.push(entry.path());
        }
        files
            .par_iter()
            .map(|file| {
                let index = parse_block_file_name(file)?;
                let data: Array2<f64> = read_npy(file).map_err(|e| StorageError::npy(file, e))?;
                Ok((index, MatrixBlock::new(data)))
            })
            .collect()
    }

    fn write_json<T: serde::Serialize>(file: &Path, value: &T) -> Result<(), StorageError> {
        let text = serde_json::to_string_pretty(value)
            .map_err(|e| StorageError::metadata(file, e.to_string()))?;
        fs::write(file, text).map_err(|e| StorageError::io(file, e))
    }

    fn read_json<T: serde::de::DeserializeOwned>(file: &Path) -> Result<T, StorageError> {
        let text = fs::read_to_string(file).map_err(|e| StorageError::io(file, e))?;
        serde_json::from_str(&text).map_err(|e| StorageError::metadata(file, e.to_string()))
    }
}

impl BlockStore for LocalBlockStore {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path);
        let result = if target.is_dir() {
            fs::remove_dir_all(&target)
        } else if target.exists() {
            fs::remove_file(&target)
        } else {
            return Ok(());
        };
        result.map_err(|e| StorageError::io(&target, e))
    }

    fn create_dir(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path);
        fs::create_dir_all(&target).map_err(|e| StorageError::io(&target, e))
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let (src, dst) = (self.resolve(from), self.resolve(to));
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
        fs::rename(&src, &dst).map_err(|e| StorageError::io(&dst, e))
    }

    fn write_matrix(
        &self,
        path: &str,
        metadata: &MatrixMetadata,
        blocks: &BlockDataset<MatrixBlock>,
    ) -> Result<(), StorageError> {
        let dir = self.resolve(path);
        self.delete(path)?;
        Self::write_blocks(&dir.join(BLOCKS_DIR), blocks.iter())?;
        Self::write_json(&dir.join(METADATA_FILE), metadata)
    }

    fn read_matrix(
        &self,
        path: &str,
    ) -> Result<(MatrixMetadata, BlockDataset<MatrixBlock>), StorageError> {
        let dir = self.resolve(path);
        if !dir.exists() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        let metadata_file = dir.join(METADATA_FILE);
        let metadata: MatrixMetadata = Self::read_json(&metadata_file)?;
        metadata
            .validate()
            .map_err(|e| StorageError::metadata(&metadata_file, e.to_string()))?;
        let blocks = BlockDataset::from_pairs(Self::read_blocks(&dir.join(BLOCKS_DIR))?)
            .map_err(|e| StorageError::metadata(&dir, e.to_string()))?;
        Ok((metadata, blocks))
    }

    fn write_partitioned(
        &self,
        path: &str,
        header: &PartitionedHeader,
        partitions: &[(i64, PartitionPayload)],
    ) -> Result<(), StorageError> {
        let dir = self.resolve(path);
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        partitions.par_iter().try_for_each(|(index, payload)| {
            let part_dir = dir.join(index.to_string());
            match payload {
                PartitionPayload::Blocks(blocks) => Self::write_blocks(
                    &part_dir.join(BLOCKS_DIR),
                    blocks.iter().map(|(ix, block)| (ix, block)),
                ),
                PartitionPayload::Cells(cells) => {
                    fs::create_dir_all(&part_dir).map_err(|e| StorageError::io(&part_dir, e))?;
                    let file = part_dir.join(CELLS_FILE);
                    write_npy(&file, &cells_to_array(cells)).map_err(|e| StorageError::npy(&file, e))
                }
            }
        })?;
        // header last: a directory without it is never a finished output
        Self::write_json(&dir.join(METADATA_FILE), header)
    }

    fn read_partitioned_header(&self, path: &str) -> Result<PartitionedHeader, StorageError> {
        let file = self.resolve(path).join(METADATA_FILE);
        if !file.exists() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Self::read_json(&file)
    }

    fn read_partition(&self, path: &str, index: i64) -> Result<PartitionPayload, StorageError> {
        let part_dir = self.resolve(path).join(index.to_string());
        let cells_file = part_dir.join(CELLS_FILE);
        if cells_file.exists() {
            let raw: Array2<f64> =
                read_npy(&cells_file).map_err(|e| StorageError::npy(&cells_file, e))?;
            return Ok(PartitionPayload::Cells(array_to_cells(&raw)));
        }
        let blocks_dir = part_dir.join(BLOCKS_DIR);
        if !blocks_dir.exists() {
            return Err(StorageError::NotFound(format!("{}/{}", path, index)));
        }
        let mut blocks = Self::read_blocks(&blocks_dir)?;
        blocks.sort_by_key(|(ix, _)| *ix);
        Ok(PartitionPayload::Blocks(blocks))
    }
}

fn parse_block_file_name(file: &Path) -> Result<BlockIndex, StorageError> {
    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| StorageError::metadata(file, "unreadable block file name".to_string()))?;
    let mut parts = stem.splitn(2, '_');
    let mut next = || -> Result<i64, StorageError> {
        parts
            .next()
            .and_then(|p| p.parse::<i64>().ok())
            .ok_or_else(|| StorageError::metadata(file, format!("malformed block file name '{}'", stem)))
    };
    let row = next()?;
    let col = next()?;
    Ok(BlockIndex::new(row, col))
}

fn cells_to_array(cells: &[Cell]) -> Array2<f64> {
    let mut out = Array2::zeros((cells.len(), 3));
    for (i, cell) in cells.iter().enumerate() {
        out[(i, 0)] = cell.row as f64;
        out[(i, 1)] = cell.col as f64;
        out[(i, 2)] = cell.value;
    }
    out
}

fn array_to_cells(raw: &Array2<f64>) -> Vec<Cell> {
    raw.outer_iter()
        .map(|row| Cell {
            row: row[0] as i64,
            col: row[1] as i64,
            value: row[2],
        })
        .collect()
}

#[derive(Debug)]
pub enum StorageError {
    Io { path: PathBuf, source: io::Error },
    Npy { path: PathBuf, message: String },
    Metadata { path: PathBuf, message: String },
    NotFound(String),
    /// A handle whose data is neither in memory nor in storage.
    NotMaterialized(String),
}

impl StorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn npy(path: &Path, err: impl fmt::Display) -> Self {
        StorageError::Npy {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    fn metadata(path: &Path, message: String) -> Self {
        StorageError::Metadata {
            path: path.to_path_buf(),
            message,
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StorageError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            StorageError::Npy { path, message } => {
                write!(f, "npy error on {}: {}", path.display(), message)
            }
            StorageError::Metadata { path, message } => {
                write!(f, "Bad metadata in {}: {}", path.display(), message)
            }
            StorageError::NotFound(path) => write!(f, "No stored matrix at '{}'", path),
            StorageError::NotMaterialized(name) => {
                write!(f, "Matrix '{}' is neither in memory nor in storage", name)
            }
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StorageError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partitioner::PartitionFormat;
    use ndarray::array;

    fn create_store() -> (tempfile::TempDir, LocalBlockStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlockStore::new(dir.path().join("store")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_matrix_write_read() {
        let (_dir, store) = create_store();
        let matrix = Array2::from_shape_fn((5, 3), |(i, j)| (i * 3 + j) as f64);
        let blocks = BlockDataset::from_matrix(&matrix, 2, 2);
        let meta = MatrixMetadata::new(5, 3, 2, 2, blocks.non_zeros()).unwrap();

        store.write_matrix("A", &meta, &blocks).unwrap();
        assert!(store.exists("A"));

        let (meta_back, blocks_back) = store.read_matrix("A").unwrap();
        assert_eq!(meta_back, meta);
        assert_eq!(blocks_back, blocks);
    }

    #[test]
    fn test_read_missing_matrix() {
        let (_dir, store) = create_store();
        match store.read_matrix("nope") {
            Err(StorageError::NotFound(path)) => assert_eq!(path, "nope"),
            other => panic!("Expected NotFound, got {:?}", other.map(|(m, _)| m)),
        }
    }

    #[test]
    fn test_delete_and_rename() {
        let (_dir, store) = create_store();
        let blocks = BlockDataset::from_matrix(&array![[1.0, 2.0]], 1, 2);
        let meta = MatrixMetadata::new(1, 2, 1, 2, 2).unwrap();
        store.write_matrix("tmp/A", &meta, &blocks).unwrap();

        store.rename("tmp/A", "B").unwrap();
        assert!(!store.exists("tmp/A"));
        assert!(store.exists("B"));

        store.delete("B").unwrap();
        assert!(!store.exists("B"));
        // deleting twice is fine
        store.delete("B").unwrap();
    }

    #[test]
    fn test_partition_payloads() {
        let (_dir, store) = create_store();
        let meta = MatrixMetadata::new(4, 2, 4, 1, 3).unwrap();
        let header = PartitionedHeader {
            format: PartitionFormat::ColumnWise,
            metadata: meta,
            num_partitions: 2,
        };
        let cells = vec![
            Cell { row: 1, col: 1, value: 3.5 },
            Cell { row: 4, col: 1, value: -1.0 },
        ];
        let block = MatrixBlock::new(array![[1.0], [0.0], [0.0], [2.0]]);
        let partitions = vec![
            (1, PartitionPayload::Cells(cells.clone())),
            (2, PartitionPayload::Blocks(vec![(BlockIndex::new(1, 1), block.clone())])),
        ];
        store.write_partitioned("A_dp", &header, &partitions).unwrap();

        assert_eq!(store.read_partitioned_header("A_dp").unwrap(), header);
        assert_eq!(store.read_partition("A_dp", 1).unwrap(), PartitionPayload::Cells(cells));
        assert_eq!(
            store.read_partition("A_dp", 2).unwrap(),
            PartitionPayload::Blocks(vec![(BlockIndex::new(1, 1), block)])
        );
        assert!(matches!(
            store.read_partition("A_dp", 3),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_parse_block_file_name() {
        assert_eq!(
            parse_block_file_name(Path::new("/x/blocks/3_12.npy")).unwrap(),
            BlockIndex::new(3, 12)
        );
        assert!(parse_block_file_name(Path::new("/x/blocks/junk.npy")).is_err());
    }
}
