//! # Data Partitioner
//!
//! Materializes a partitioned copy of a matrix in durable storage so that
//! later readers can fetch single partitions instead of the whole matrix.

/*
 * File: /src/partitioner/data_partitioner.rs
 * Created Date: Monday, October 19th 2026
 * Author: Zihan
 * -----
 * Last Modified: Monday, 19th October 2026
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-19		Zihan	Implemented format selection, staging and atomic publish
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use log::{debug, info, warn};

use crate::config::PartitionerConfig;
use crate::matrix::{MatrixMetadata, MatrixObject, StorageFormat};
use crate::partitioner::selector::select_format;
use crate::partitioner::strategy::SplitStrategy;
use crate::partitioner::types::*;
use crate::storage::BlockStore;

/// Suffix appended to variable and file names of partitioned outputs.
pub const NAME_SUFFIX: &str = "_dp";

pub struct DataPartitioner<S: BlockStore> {
    format: PartitionFormat,
    config: PartitionerConfig,
    store: S,
    staging_seq: AtomicU64,
}

impl<S: BlockStore> DataPartitioner<S> {
    /// Creates a partitioner for `format` and prepares its staging directory.
    pub fn new(
        format: PartitionFormat,
        config: PartitionerConfig,
        store: S,
    ) -> Result<Self, PartitionError> {
        store.create_dir(config.get_staging_dir())?;
        Ok(Self {
            format,
            config,
            store,
            staging_seq: AtomicU64::new(0),
        })
    }

    pub fn format(&self) -> PartitionFormat {
        self.format
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &PartitionerConfig {
        &self.config
    }

    /// [`Self::create_partitioned_matrix`] without forcing the format.
    pub fn create_partitioned_matrix_default(
        &self,
        input: &mut MatrixObject,
    ) -> Result<MatrixObject, PartitionError> {
        self.create_partitioned_matrix(input, false)
    }

    /// Creates a partitioned copy of `input` in storage and returns a handle
    /// on it. Returns `input` itself when partitioning does not pay off.
    ///
    /// # Algorithm
    /// 1. Select the effective format (may skip partitioning)
    /// 2. Flush `input` to storage if it only lives in memory
    /// 3. Remove any previous output at `<file>_dp`
    /// 4. Split into a staging location, then rename onto the destination
    /// 5. Describe the result with adjusted block sizes and the format marker
    pub fn create_partitioned_matrix(
        &self,
        input: &mut MatrixObject,
        force: bool,
    ) -> Result<MatrixObject, PartitionError> {
        let metadata = input.metadata().clone();
        let decision = select_format(self.format, &metadata, self.config.get_thresholds(), force);
        let strategy = match SplitStrategy::for_format(decision.format) {
            Some(strategy) => strategy,
            None => {
                debug!(
                    "Skipping partitioning of '{}' ({}x{})",
                    input.var_name(),
                    metadata.rows,
                    metadata.cols
                );
                return Ok(input.clone());
            }
        };

        let start = Instant::now();
        input.export_data(&self.store)?;

        let file_name = input.file_name().to_string();
        let file_name_new = format!("{}{}", file_name, NAME_SUFFIX);
        if self.store.exists(&file_name_new) {
            warn!("Removing stale partitioned output '{}'", file_name_new);
            self.store.delete(&file_name_new)?;
        }

        let (brlen, bclen) = strategy.output_block_size(&metadata);
        let mut metadata_new = MatrixMetadata::new(
            metadata.rows,
            metadata.cols,
            brlen,
            bclen,
            metadata.non_zeros,
        )?
        .with_storage_format(metadata.storage_format);
        if decision.convert_to_cells {
            metadata_new = metadata_new.with_storage_format(StorageFormat::CellList);
        }
        let header = PartitionedHeader {
            format: decision.format,
            metadata: metadata_new.clone(),
            num_partitions: strategy.num_partitions(&metadata),
        };

        self.partition_matrix(
            &file_name,
            &file_name_new,
            strategy,
            &metadata,
            &header,
            decision.convert_to_cells,
        )?;

        info!(
            "Partitioned '{}' as {} into {} partitions in {:?}",
            input.var_name(),
            decision.format,
            header.num_partitions,
            start.elapsed()
        );

        let var_name_new = format!("{}{}", input.var_name(), NAME_SUFFIX);
        Ok(
            MatrixObject::persisted(&var_name_new, &file_name_new, metadata_new)
                .with_value_type(input.value_type())
                .with_partition_format(decision.format),
        )
    }

    /// Reads `source`, splits it and publishes the result at `destination`.
    /// Nothing becomes visible at `destination` unless every write succeeded.
    fn partition_matrix(
        &self,
        source: &str,
        destination: &str,
        strategy: SplitStrategy,
        metadata: &MatrixMetadata,
        header: &PartitionedHeader,
        convert_to_cells: bool,
    ) -> Result<(), PartitionError> {
        let (_, blocks) = self.store.read_matrix(source)?;
        let partitions = strategy.split(&blocks, metadata, convert_to_cells);

        let staging = self.staging_path(destination);
        let published = self
            .store
            .write_partitioned(&staging, header, &partitions)
            .and_then(|_| self.store.rename(&staging, destination));
        if let Err(e) = published {
            if let Err(cleanup) = self.store.delete(&staging) {
                warn!("Could not remove staging output '{}': {}", staging, cleanup);
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn staging_path(&self, destination: &str) -> String {
        let seq = self.staging_seq.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}/{}-{}-{}",
            self.config.get_staging_dir().trim_end_matches('/'),
            destination.replace('/', "_"),
            std::process::id(),
            seq
        )
    }
}
