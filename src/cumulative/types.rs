//! # Cumulative Aggregation Data Structures
//!
//! Operator kinds, the opcode table and the error types of the cumulative
//! offset stage.

/*
 * File: /src/cumulative/types.rs
 * Created Date: Monday, October 19th 2026
 * Author: Zihan
 * -----
 * Last Modified: Monday, 19th October 2026
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-19		Zihan	Opcode table and error types for cumulative offsets
 */

use std::error::Error;
use std::fmt;

use crate::dataset::{BlockIndex, DatasetError};
use crate::matrix::MatrixError;

/// Element-wise operator folding the offset row into the first data row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOpKind {
    Plus,
    Multiply,
    /// `(value, weight) x offset -> value + weight * offset`; only defined on
    /// two-column blocks, see [`crate::cumulative::kernels::combine`].
    PlusMultiply,
    Min,
    Max,
}

impl BinaryOpKind {
    /// Element-wise application. `PlusMultiply` has no element-wise form and
    /// degenerates to `Plus`.
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOpKind::Plus | BinaryOpKind::PlusMultiply => a + b,
            BinaryOpKind::Multiply => a * b,
            BinaryOpKind::Min => a.min(b),
            BinaryOpKind::Max => a.max(b),
        }
    }
}

/// Column-wise prefix aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryAggKind {
    CumSum,
    CumProd,
    /// `out[i] = a[i] + b[i] * out[i-1]` over a two-column `(a, b)` block.
    CumSumProd,
    CumMin,
    CumMax,
}

/// Operator pair bound to an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CumulativeOp {
    pub opcode: &'static str,
    pub binary: BinaryOpKind,
    pub unary: UnaryAggKind,
}

pub const CUMULATIVE_OPS: [CumulativeOp; 5] = [
    CumulativeOp {
        opcode: "cumulative-offset-plus",
        binary: BinaryOpKind::Plus,
        unary: UnaryAggKind::CumSum,
    },
    CumulativeOp {
        opcode: "cumulative-offset-multiply",
        binary: BinaryOpKind::Multiply,
        unary: UnaryAggKind::CumProd,
    },
    CumulativeOp {
        opcode: "cumulative-offset-fused-multiply",
        binary: BinaryOpKind::PlusMultiply,
        unary: UnaryAggKind::CumSumProd,
    },
    CumulativeOp {
        opcode: "cumulative-offset-min",
        binary: BinaryOpKind::Min,
        unary: UnaryAggKind::CumMin,
    },
    CumulativeOp {
        opcode: "cumulative-offset-max",
        binary: BinaryOpKind::Max,
        unary: UnaryAggKind::CumMax,
    },
];

/// Short opcodes accepted as aliases, in the order of [`CUMULATIVE_OPS`].
const SHORT_OPCODES: [&str; 5] = ["bcumoffk+", "bcumoff*", "bcumoff+*", "bcumoffmin", "bcumoffmax"];

impl CumulativeOp {
    pub fn from_opcode(opcode: &str) -> Result<Self, CumulativeError> {
        let opcode = opcode.trim();
        CUMULATIVE_OPS
            .iter()
            .zip(SHORT_OPCODES.iter())
            .find(|(op, short)| op.opcode == opcode || **short == opcode)
            .map(|(op, _)| *op)
            .ok_or_else(|| CumulativeError::UnknownOpcode(opcode.to_string()))
    }

    /// Fused cumsum-of-products: two input columns, one output column.
    pub fn is_fused(&self) -> bool {
        self.binary == BinaryOpKind::PlusMultiply
    }
}

impl fmt::Display for CumulativeOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.opcode)
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum InstructionError {
    FieldCount { expected: usize, actual: usize },
    UnknownOpcode(String),
    InvalidNumber(String),
    InvalidBoolean(String),
}

impl fmt::Display for InstructionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InstructionError::FieldCount { expected, actual } => {
                write!(f, "Expected {} instruction fields, got {}", expected, actual)
            }
            InstructionError::UnknownOpcode(op) => write!(f, "Unknown opcode '{}'", op),
            InstructionError::InvalidNumber(s) => write!(f, "Invalid number '{}'", s),
            InstructionError::InvalidBoolean(s) => write!(f, "Invalid boolean '{}'", s),
        }
    }
}

impl Error for InstructionError {}

#[derive(Debug, Clone, PartialEq)]
pub enum CumulativeError {
    UnknownOpcode(String),
    /// A data block found no offset row.
    MissingOffset(BlockIndex),
    /// Offset row width does not match the data block it seeds.
    OffsetWidth {
        index: BlockIndex,
        expected: usize,
        actual: usize,
    },
    ShapeMismatch(String),
    UnknownVariable(String),
    Dataset(DatasetError),
    Matrix(MatrixError),
    Instruction(InstructionError),
}

impl fmt::Display for CumulativeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CumulativeError::UnknownOpcode(op) => write!(f, "Unknown cumulative opcode '{}'", op),
            CumulativeError::MissingOffset(ix) => {
                write!(f, "No offset row for data block {}", ix)
            }
            CumulativeError::OffsetWidth {
                index,
                expected,
                actual,
            } => write!(
                f,
                "Offset row for block {} has {} columns, expected {}",
                index, actual, expected
            ),
            CumulativeError::ShapeMismatch(msg) => write!(f, "Shape mismatch: {}", msg),
            CumulativeError::UnknownVariable(name) => write!(f, "Unknown variable '{}'", name),
            CumulativeError::Dataset(e) => write!(f, "Dataset error: {}", e),
            CumulativeError::Matrix(e) => write!(f, "Metadata error: {}", e),
            CumulativeError::Instruction(e) => write!(f, "Instruction error: {}", e),
        }
    }
}

impl Error for CumulativeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CumulativeError::Dataset(e) => Some(e),
            CumulativeError::Matrix(e) => Some(e),
            CumulativeError::Instruction(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DatasetError> for CumulativeError {
    fn from(e: DatasetError) -> Self {
        match e {
            DatasetError::MissingKey(ix) | DatasetError::MissingBroadcastBlock(ix) => {
                CumulativeError::MissingOffset(ix)
            }
            other => CumulativeError::Dataset(other),
        }
    }
}

impl From<MatrixError> for CumulativeError {
    fn from(e: MatrixError) -> Self {
        CumulativeError::Matrix(e)
    }
}

impl From<InstructionError> for CumulativeError {
    fn from(e: InstructionError) -> Self {
        CumulativeError::Instruction(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_table() {
        let op = CumulativeOp::from_opcode("cumulative-offset-plus").unwrap();
        assert_eq!(op.binary, BinaryOpKind::Plus);
        assert_eq!(op.unary, UnaryAggKind::CumSum);
        assert!(!op.is_fused());

        let fused = CumulativeOp::from_opcode("bcumoff+*").unwrap();
        assert_eq!(fused.opcode, "cumulative-offset-fused-multiply");
        assert!(fused.is_fused());

        assert_eq!(
            CumulativeOp::from_opcode("bcumoffmax").unwrap().unary,
            UnaryAggKind::CumMax
        );
    }

    #[test]
    fn test_unknown_opcode() {
        assert_eq!(
            CumulativeOp::from_opcode("cumulative-offset-avg"),
            Err(CumulativeError::UnknownOpcode("cumulative-offset-avg".to_string()))
        );
    }

    #[test]
    fn test_binary_apply() {
        assert_eq!(BinaryOpKind::Plus.apply(2.0, 3.0), 5.0);
        assert_eq!(BinaryOpKind::Multiply.apply(2.0, 3.0), 6.0);
        assert_eq!(BinaryOpKind::Min.apply(2.0, -3.0), -3.0);
        assert_eq!(BinaryOpKind::Max.apply(2.0, -3.0), 2.0);
    }

    #[test]
    fn test_missing_join_key_is_missing_offset() {
        let ix = BlockIndex::new(3, 1);
        let err: CumulativeError = DatasetError::MissingKey(ix).into();
        assert_eq!(err, CumulativeError::MissingOffset(ix));
        let err: CumulativeError = DatasetError::DuplicateKey(ix).into();
        assert!(matches!(err, CumulativeError::Dataset(_)));
        assert!(err.source().is_some());
    }
}
