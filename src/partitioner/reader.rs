//! Read access to single partitions of a partitioned matrix.

/*
 * File: /src/partitioner/reader.rs
 * Created Date: Monday, October 19th 2026
 * Author: Zihan
 * -----
 * Last Modified: Monday, 19th October 2026
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-19		Zihan	Partition read-back
 */

use log::debug;
use ndarray::{s, Array2};

use crate::dataset::{BlockIndex, DatasetError};
use crate::matrix::MatrixObject;
use crate::partitioner::types::*;
use crate::storage::BlockStore;
use crate::util::compute_block_size;

/// Shape of partition `index` of a matrix partitioned with `header`.
pub fn partition_shape(header: &PartitionedHeader, index: i64) -> (usize, usize) {
    let meta = &header.metadata;
    match header.format {
        PartitionFormat::RowWise => (1, meta.cols as usize),
        PartitionFormat::ColumnWise => (meta.rows as usize, 1),
        PartitionFormat::RowBlockWise => (
            compute_block_size(meta.rows, index, meta.rows_per_block),
            meta.cols as usize,
        ),
        PartitionFormat::ColumnBlockWise => (
            meta.rows as usize,
            compute_block_size(meta.cols, index, meta.cols_per_block),
        ),
        PartitionFormat::None => (meta.rows as usize, meta.cols as usize),
    }
}

/// Loads partition `index` (1-based) of `handle` as a dense matrix.
pub fn read_partition<S: BlockStore>(
    store: &S,
    handle: &MatrixObject,
    index: i64,
) -> Result<Array2<f64>, PartitionError> {
    let format = match handle.partition_format() {
        Some(format) if format != PartitionFormat::None => format,
        _ => return Err(PartitionError::NotPartitioned(handle.var_name().to_string())),
    };

    let header = store.read_partitioned_header(handle.file_name())?;
    if header.format != format {
        return Err(PartitionError::NotPartitioned(format!(
            "{} (stored as {}, handle says {})",
            handle.var_name(),
            header.format,
            format
        )));
    }
    if index < 1 || index > header.num_partitions {
        return Err(PartitionError::InvalidPartitionIndex {
            index,
            num_partitions: header.num_partitions,
        });
    }

    let (rows, cols) = partition_shape(&header, index);
    let mut out = Array2::zeros((rows, cols));
    let (brlen, bclen) = (
        header.metadata.rows_per_block as usize,
        header.metadata.cols_per_block as usize,
    );
    match store.read_partition(handle.file_name(), index)? {
        PartitionPayload::Blocks(blocks) => {
            for (ix, block) in blocks {
                let r0 = (ix.row - 1) as usize * brlen;
                let c0 = (ix.col - 1) as usize * bclen;
                let (h, w) = block.data.dim();
                if r0 + h > rows || c0 + w > cols {
                    return Err(DatasetError::BlockOutOfBounds(ix).into());
                }
                out.slice_mut(s![r0..r0 + h, c0..c0 + w]).assign(&block.data);
            }
        }
        PartitionPayload::Cells(cells) => {
            for cell in cells {
                let (i, j) = ((cell.row - 1) as usize, (cell.col - 1) as usize);
                if i >= rows || j >= cols {
                    return Err(DatasetError::BlockOutOfBounds(BlockIndex::new(cell.row, cell.col)).into());
                }
                out[(i, j)] = cell.value;
            }
        }
    }
    debug!(
        "Read partition {} of '{}' ({}x{})",
        index,
        handle.var_name(),
        rows,
        cols
    );
    Ok(out)
}

/// Loads partitions `from..=to` of `handle`.
pub fn read_partition_range<S: BlockStore>(
    store: &S,
    handle: &MatrixObject,
    from: i64,
    to: i64,
) -> Result<Vec<Array2<f64>>, PartitionError> {
    (from..=to)
        .map(|index| read_partition(store, handle, index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PartitionerConfig, Thresholds};
    use crate::dataset::BlockDataset;
    use crate::matrix::MatrixMetadata;
    use crate::partitioner::DataPartitioner;
    use crate::storage::LocalBlockStore;
    use ndarray::Axis;

    fn create_partitioned(
        format: PartitionFormat,
        matrix: &Array2<f64>,
    ) -> (tempfile::TempDir, DataPartitioner<LocalBlockStore>, MatrixObject) {
        let dir = tempfile::tempdir().unwrap();
        let config = PartitionerConfig {
            storage_root: dir.path().to_path_buf(),
            staging_dir: "_staging".to_string(),
            thresholds: Thresholds {
                in_memory_threshold: 2,
                sparsity_cell_threshold: 0.1,
            },
        };
        let store = LocalBlockStore::new(dir.path()).unwrap();
        let partitioner = DataPartitioner::new(format, config, store).unwrap();
        let blocks = BlockDataset::from_matrix(matrix, 3, 2);
        let (rows, cols) = matrix.dim();
        let meta = MatrixMetadata::new(rows as i64, cols as i64, 3, 2, blocks.non_zeros()).unwrap();
        let mut input = MatrixObject::in_memory("M", "M", meta, blocks);
        let out = partitioner.create_partitioned_matrix(&mut input, true).unwrap();
        (dir, partitioner, out)
    }

    #[test]
    fn test_row_wise_rows_read_back() {
        let matrix = Array2::from_shape_fn((7, 5), |(i, j)| (i * 10 + j) as f64);
        let (_dir, partitioner, handle) = create_partitioned(PartitionFormat::RowWise, &matrix);
        for i in 0..7 {
            let row = read_partition(partitioner.store(), &handle, i as i64 + 1).unwrap();
            assert_eq!(row.row(0), matrix.row(i));
        }
    }

    #[test]
    fn test_column_block_wise_reassembles() {
        let matrix = Array2::from_shape_fn((7, 5), |(i, j)| (i * 10 + j) as f64 + 0.5);
        let (_dir, partitioner, handle) = create_partitioned(PartitionFormat::ColumnBlockWise, &matrix);
        let parts = read_partition_range(partitioner.store(), &handle, 1, 3).unwrap();
        let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
        let whole = ndarray::concatenate(Axis(1), &views).unwrap();
        assert_eq!(whole, matrix);
    }

    #[test]
    fn test_cell_partitions_read_back() {
        let mut matrix = Array2::zeros((6, 6));
        matrix[(4, 2)] = 7.0;
        let (_dir, partitioner, handle) = create_partitioned(PartitionFormat::ColumnWise, &matrix);
        assert_eq!(
            handle.metadata().storage_format,
            crate::matrix::StorageFormat::CellList
        );
        let col = read_partition(partitioner.store(), &handle, 3).unwrap();
        assert_eq!(col.column(0), matrix.column(2));
    }

    #[test]
    fn test_read_errors() {
        let matrix = Array2::from_elem((4, 4), 1.0);
        let (_dir, partitioner, handle) = create_partitioned(PartitionFormat::RowBlockWise, &matrix);
        assert!(matches!(
            read_partition(partitioner.store(), &handle, 3),
            Err(PartitionError::InvalidPartitionIndex { index: 3, num_partitions: 2 })
        ));
        assert!(matches!(
            read_partition(partitioner.store(), &handle, 0),
            Err(PartitionError::InvalidPartitionIndex { .. })
        ));

        let plain = MatrixObject::persisted("P", "P", handle.metadata().clone());
        assert!(matches!(
            read_partition(partitioner.store(), &plain, 1),
            Err(PartitionError::NotPartitioned(_))
        ));
    }
}
