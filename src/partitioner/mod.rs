//! # Matrix Partitioning
//!
//! Format selection, physical split strategies and the partitioner that
//! materializes partitioned matrices in a [`crate::storage::BlockStore`].

/*
 * File: /src/partitioner/mod.rs
 * Created Date: Monday, October 19th 2026
 * Author: Zihan
 * -----
 * Last Modified: Monday, 19th October 2026
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-19		Zihan	Partitioning module layout
 */

pub mod data_partitioner;
pub mod reader;
pub mod selector;
pub mod strategy;
pub mod types;

pub use data_partitioner::{DataPartitioner, NAME_SUFFIX};
pub use reader::{partition_shape, read_partition, read_partition_range};
pub use selector::select_format;
pub use strategy::SplitStrategy;
pub use types::{
    FormatDecision, PartitionError, PartitionFormat, PartitionPayload, PartitionedHeader,
};
