//! Integration tests for matrix partitioning
//!
//! Covers the whole path from an in-memory matrix handle to partitions
//! read back from a local block store.

use std::fs;

use fast_partition::config::{PartitionerConfig, Thresholds};
use fast_partition::dataset::BlockDataset;
use fast_partition::matrix::{MatrixBlock, MatrixMetadata, MatrixObject, StorageFormat};
use fast_partition::partitioner::*;
use fast_partition::storage::{BlockStore, LocalBlockStore, StorageError};
use ndarray::{concatenate, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn create_config(root: &std::path::Path, threshold: i64) -> PartitionerConfig {
    PartitionerConfig {
        storage_root: root.to_path_buf(),
        staging_dir: "_staging/partitioning".to_string(),
        thresholds: Thresholds {
            in_memory_threshold: threshold,
            sparsity_cell_threshold: 0.1,
        },
    }
}

/// Random matrix where roughly `density` of the cells are non-zero.
fn create_test_matrix(rows: usize, cols: usize, density: f64, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((rows, cols), |_| {
        if rng.random_range(0.0..1.0) < density {
            rng.random_range(-10.0..10.0)
        } else {
            0.0
        }
    })
}

fn create_handle(name: &str, matrix: &Array2<f64>, brlen: i32, bclen: i32) -> MatrixObject {
    let blocks = BlockDataset::from_matrix(matrix, brlen, bclen);
    let (rows, cols) = matrix.dim();
    let meta = MatrixMetadata::new(rows as i64, cols as i64, brlen, bclen, blocks.non_zeros()).unwrap();
    MatrixObject::in_memory(name, &format!("data/{}", name), meta, blocks)
}

#[test]
fn test_row_formats_shape_invariant() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let matrix = create_test_matrix(40, 30, 0.8, 1);

    let store = LocalBlockStore::new(dir.path()).unwrap();
    let row_blocks = DataPartitioner::new(PartitionFormat::RowBlockWise, create_config(dir.path(), 10), store).unwrap();
    let mut input = create_handle("A", &matrix, 8, 7);
    let out = row_blocks.create_partitioned_matrix_default(&mut input).unwrap();
    assert_eq!(out.partition_format(), Some(PartitionFormat::RowBlockWise));
    assert_eq!((out.metadata().rows_per_block, out.metadata().cols_per_block), (8, 7));
    assert_eq!(out.metadata().non_zeros, input.metadata().non_zeros);

    let store = LocalBlockStore::new(dir.path()).unwrap();
    let rows = DataPartitioner::new(PartitionFormat::RowWise, create_config(dir.path(), 10), store).unwrap();
    let mut input = create_handle("B", &matrix, 8, 7);
    let out = rows.create_partitioned_matrix_default(&mut input).unwrap();
    assert_eq!(out.partition_format(), Some(PartitionFormat::RowWise));
    assert_eq!((out.metadata().rows_per_block, out.metadata().cols_per_block), (1, 7));
    assert_eq!(out.metadata().non_zeros, input.metadata().non_zeros);
}

#[test]
fn test_all_formats_reassemble_source() {
    init_logging();
    let matrix = create_test_matrix(23, 17, 0.7, 2);
    let cases = [
        (PartitionFormat::RowWise, Axis(0), 23),
        (PartitionFormat::RowBlockWise, Axis(0), 5),
        (PartitionFormat::ColumnWise, Axis(1), 17),
        (PartitionFormat::ColumnBlockWise, Axis(1), 4),
    ];
    for (format, axis, expected_parts) in cases {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlockStore::new(dir.path()).unwrap();
        let partitioner = DataPartitioner::new(format, create_config(dir.path(), 5), store).unwrap();
        let mut input = create_handle("M", &matrix, 5, 5);
        let out = partitioner.create_partitioned_matrix(&mut input, true).unwrap();

        let header = partitioner.store().read_partitioned_header(out.file_name()).unwrap();
        assert_eq!(header.num_partitions, expected_parts, "{}", format);
        let parts = read_partition_range(partitioner.store(), &out, 1, expected_parts).unwrap();
        let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
        assert_eq!(concatenate(axis, &views).unwrap(), matrix, "{}", format);
    }
}

#[test]
fn test_partitioning_is_idempotent() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let matrix = create_test_matrix(30, 30, 0.5, 3);
    let store = LocalBlockStore::new(dir.path()).unwrap();
    let partitioner = DataPartitioner::new(PartitionFormat::ColumnBlockWise, create_config(dir.path(), 10), store).unwrap();

    let mut input = create_handle("C", &matrix, 7, 7);
    let first = partitioner.create_partitioned_matrix_default(&mut input).unwrap();
    let header_file = dir.path().join(first.file_name()).join("metadata.json");
    let first_bytes = fs::read(&header_file).unwrap();
    let first_part = read_partition(partitioner.store(), &first, 2).unwrap();

    let second = partitioner.create_partitioned_matrix_default(&mut input).unwrap();
    assert_eq!(second.file_name(), first.file_name());
    assert_eq!(second.metadata(), first.metadata());
    assert_eq!(fs::read(&header_file).unwrap(), first_bytes);
    assert_eq!(read_partition(partitioner.store(), &second, 2).unwrap(), first_part);
}

#[test]
fn test_small_and_vector_inputs_pass_through() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let store = LocalBlockStore::new(dir.path()).unwrap();
    let partitioner = DataPartitioner::new(PartitionFormat::RowWise, create_config(dir.path(), 100), store).unwrap();

    for (rows, cols) in [(50, 50), (1, 500), (500, 1)] {
        let matrix = create_test_matrix(rows, cols, 1.0, 4);
        let mut input = create_handle("S", &matrix, 10, 10);
        let out = partitioner.create_partitioned_matrix_default(&mut input).unwrap();
        assert_eq!(out.var_name(), "S");
        assert!(!out.is_partitioned());
        assert!(!partitioner.store().exists("data/S_dp"));
    }
}

#[test]
fn test_sparse_columns_stored_as_cells() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let matrix = create_test_matrix(60, 40, 0.02, 5);
    let store = LocalBlockStore::new(dir.path()).unwrap();
    let partitioner = DataPartitioner::new(PartitionFormat::ColumnWise, create_config(dir.path(), 10), store).unwrap();

    let mut input = create_handle("D", &matrix, 16, 16);
    let out = partitioner.create_partitioned_matrix_default(&mut input).unwrap();
    assert_eq!(out.partition_format(), Some(PartitionFormat::ColumnWise));
    assert_eq!(out.metadata().storage_format, StorageFormat::CellList);
    assert_eq!((out.metadata().rows_per_block, out.metadata().cols_per_block), (16, 1));

    for j in [1, 20, 40] {
        let col = read_partition(partitioner.store(), &out, j).unwrap();
        assert_eq!(col.column(0), matrix.column(j as usize - 1));
    }
}

/// Store whose rename always fails.
struct FailingRenameStore {
    inner: LocalBlockStore,
}

impl BlockStore for FailingRenameStore {
    fn exists(&self, path: &str) -> bool {
        self.inner.exists(path)
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.inner.delete(path)
    }

    fn create_dir(&self, path: &str) -> Result<(), StorageError> {
        self.inner.create_dir(path)
    }

    fn rename(&self, from: &str, _to: &str) -> Result<(), StorageError> {
        Err(StorageError::NotFound(from.to_string()))
    }

    fn write_matrix(
        &self,
        path: &str,
        metadata: &MatrixMetadata,
        blocks: &BlockDataset<MatrixBlock>,
    ) -> Result<(), StorageError> {
        self.inner.write_matrix(path, metadata, blocks)
    }

    fn read_matrix(&self, path: &str) -> Result<(MatrixMetadata, BlockDataset<MatrixBlock>), StorageError> {
        self.inner.read_matrix(path)
    }

    fn write_partitioned(
        &self,
        path: &str,
        header: &PartitionedHeader,
        partitions: &[(i64, PartitionPayload)],
    ) -> Result<(), StorageError> {
        self.inner.write_partitioned(path, header, partitions)
    }

    fn read_partitioned_header(&self, path: &str) -> Result<PartitionedHeader, StorageError> {
        self.inner.read_partitioned_header(path)
    }

    fn read_partition(&self, path: &str, index: i64) -> Result<PartitionPayload, StorageError> {
        self.inner.read_partition(path, index)
    }
}

#[test]
fn test_failed_publish_leaves_no_output() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let store = FailingRenameStore {
        inner: LocalBlockStore::new(dir.path()).unwrap(),
    };
    let partitioner = DataPartitioner::new(PartitionFormat::RowBlockWise, create_config(dir.path(), 10), store).unwrap();
    let matrix = create_test_matrix(30, 30, 1.0, 6);
    let mut input = create_handle("E", &matrix, 10, 10);

    let result = partitioner.create_partitioned_matrix_default(&mut input);
    assert!(matches!(result, Err(PartitionError::Storage(_))));
    assert!(!partitioner.store().exists("data/E_dp"));
    let staging = fs::read_dir(dir.path().join("_staging/partitioning")).unwrap().count();
    assert_eq!(staging, 0);
}
