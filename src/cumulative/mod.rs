//! # Distributed Cumulative Aggregation
//!
//! Two-pass prefix aggregates (cumsum, cumprod, cumsum-of-products, cummin,
//! cummax) over row-block partitioned matrices:
//! 1. [`aggregate`] summarizes every block and builds the offset aggregates
//! 2. [`offset`] seeds every block with its offset and finishes the scan

/*
 * File: /src/cumulative/mod.rs
 * Created Date: Monday, October 19th 2026
 * Author: Zihan
 * -----
 * Last Modified: Monday, 19th October 2026
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-19		Zihan	Cumulative aggregation module layout
 */

pub mod aggregate;
pub mod instruction;
pub mod kernels;
pub mod offset;
pub mod types;

pub use aggregate::{build_offset_aggregates, cumulative_scan, local_block_aggregates};
pub use instruction::CumulativeOffsetInstruction;
pub use kernels::{combine, cumulative};
pub use offset::CumulativeOffsetEngine;
pub use types::{
    BinaryOpKind, CumulativeError, CumulativeOp, InstructionError, UnaryAggKind, CUMULATIVE_OPS,
};
