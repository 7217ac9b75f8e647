//! Per-block kernels: column-wise prefix aggregates and the offset combine
//! step. Everything here is pure and single-threaded; parallelism comes from
//! running one kernel per block.

/*
 * File: /src/cumulative/kernels.rs
 * Created Date: Monday, October 19th 2026
 * Author: Zihan
 * -----
 * Last Modified: Monday, 19th October 2026
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-19		Zihan	Column prefix kernels and offset combine
 */

use ndarray::{Array2, Axis};

use crate::cumulative::types::{CumulativeError, CumulativeOp, UnaryAggKind};
use crate::matrix::MatrixBlock;

/// Running sum with Kahan compensation.
#[derive(Debug, Clone, Copy, Default)]
struct KahanSum {
    sum: f64,
    correction: f64,
}

impl KahanSum {
    fn add(&mut self, value: f64) -> f64 {
        let y = value - self.correction;
        let t = self.sum + y;
        self.correction = (t - self.sum) - y;
        self.sum = t;
        self.sum
    }
}

/// Column-wise prefix aggregate of `data`.
///
/// For [`UnaryAggKind::CumSumProd`] the input is read as `(a, b)` pairs from
/// the first two columns and the output has a single column with
/// `out[0] = a[0]` and `out[i] = a[i] + b[i] * out[i-1]`.
pub fn cumulative(kind: UnaryAggKind, data: &Array2<f64>) -> Result<Array2<f64>, CumulativeError> {
    let (rows, cols) = data.dim();
    match kind {
        UnaryAggKind::CumSumProd => {
            if cols < 2 {
                return Err(CumulativeError::ShapeMismatch(format!(
                    "cumsum-of-products needs 2 columns, got {}",
                    cols
                )));
            }
            let mut out = Array2::zeros((rows, 1));
            let mut prev = 0.0;
            for (i, row) in data.axis_iter(Axis(0)).enumerate() {
                prev = if i == 0 { row[0] } else { row[0] + row[1] * prev };
                out[(i, 0)] = prev;
            }
            Ok(out)
        }
        UnaryAggKind::CumSum => {
            let mut out = data.clone();
            for mut col in out.axis_iter_mut(Axis(1)) {
                let mut acc = KahanSum::default();
                col.iter_mut().for_each(|v| *v = acc.add(*v));
            }
            Ok(out)
        }
        UnaryAggKind::CumProd | UnaryAggKind::CumMin | UnaryAggKind::CumMax => {
            let step: fn(f64, f64) -> f64 = match kind {
                UnaryAggKind::CumProd => |acc, v| acc * v,
                UnaryAggKind::CumMin => f64::min,
                _ => f64::max,
            };
            let mut out = data.clone();
            for mut col in out.axis_iter_mut(Axis(1)) {
                let mut iter = col.iter_mut();
                if let Some(first) = iter.next() {
                    let mut acc = *first;
                    for v in iter {
                        acc = step(acc, *v);
                        *v = acc;
                    }
                }
            }
            Ok(out)
        }
    }
}

/// Folds the offset row into the first row of `data` and runs the prefix
/// aggregate down every column.
///
/// Fused: `data[0][0] += data[0][1] * offset[0][0]`, one output column.
/// Otherwise `data[0][j] = bop(data[0][j], offset[0][j])` and the output has
/// the shape of `data`.
pub fn combine(
    op: &CumulativeOp,
    data: &MatrixBlock,
    offset: &MatrixBlock,
) -> Result<MatrixBlock, CumulativeError> {
    if offset.num_rows() == 0 {
        return Err(CumulativeError::ShapeMismatch("empty offset row".to_string()));
    }
    let mut seeded = data.data.clone();
    if seeded.nrows() > 0 {
        if op.is_fused() {
            if seeded.ncols() < 2 {
                return Err(CumulativeError::ShapeMismatch(format!(
                    "{} needs 2 data columns, got {}",
                    op,
                    seeded.ncols()
                )));
            }
            if offset.num_cols() == 0 {
                return Err(CumulativeError::ShapeMismatch(format!(
                    "{} needs an offset value, got an empty offset row",
                    op
                )));
            }
            seeded[(0, 0)] += seeded[(0, 1)] * offset.get(0, 0);
        } else {
            if offset.num_cols() != seeded.ncols() {
                return Err(CumulativeError::ShapeMismatch(format!(
                    "offset row has {} columns, data block has {}",
                    offset.num_cols(),
                    seeded.ncols()
                )));
            }
            seeded
                .row_mut(0)
                .zip_mut_with(&offset.data.row(0), |d, o| *d = op.binary.apply(*d, *o));
        }
    }
    cumulative(op.unary, &seeded).map(MatrixBlock::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn op(opcode: &str) -> CumulativeOp {
        CumulativeOp::from_opcode(opcode).unwrap()
    }

    #[test]
    fn test_cumulative_columns() {
        let data = array![[1.0, 4.0], [2.0, -1.0], [3.0, 2.0]];
        assert_eq!(
            cumulative(UnaryAggKind::CumSum, &data).unwrap(),
            array![[1.0, 4.0], [3.0, 3.0], [6.0, 5.0]]
        );
        assert_eq!(
            cumulative(UnaryAggKind::CumProd, &data).unwrap(),
            array![[1.0, 4.0], [2.0, -4.0], [6.0, -8.0]]
        );
        assert_eq!(
            cumulative(UnaryAggKind::CumMin, &data).unwrap(),
            array![[1.0, 4.0], [1.0, -1.0], [1.0, -1.0]]
        );
        assert_eq!(
            cumulative(UnaryAggKind::CumMax, &data).unwrap(),
            array![[1.0, 4.0], [2.0, 4.0], [3.0, 4.0]]
        );
        assert_eq!(
            cumulative(UnaryAggKind::CumSumProd, &data).unwrap(),
            array![[1.0], [2.0 - 1.0], [3.0 + 2.0 * 1.0]]
        );
    }

    #[test]
    fn test_kahan_cumsum_is_compensated() {
        let mut data = Array2::from_elem((10_001, 1), 0.1);
        data[(0, 0)] = 1e8;
        let out = cumulative(UnaryAggKind::CumSum, &data).unwrap();
        let expected = 1e8 + 10_000.0 * 0.1;
        assert!((out[(10_000, 0)] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_combine_general() {
        let data = MatrixBlock::new(array![[1.0, 1.0], [1.0, 1.0]]);
        let offset = MatrixBlock::new(array![[5.0, -2.0]]);
        let out = combine(&op("cumulative-offset-plus"), &data, &offset).unwrap();
        assert_eq!(out.data, array![[6.0, -1.0], [7.0, 0.0]]);

        let out = combine(&op("cumulative-offset-min"), &data, &offset).unwrap();
        assert_eq!(out.data, array![[1.0, -2.0], [1.0, -2.0]]);
    }

    #[test]
    fn test_combine_fused() {
        let data = MatrixBlock::new(array![[2.0, 3.0], [1.0, 0.5]]);
        let offset = MatrixBlock::new(array![[10.0]]);
        let out = combine(&op("cumulative-offset-fused-multiply"), &data, &offset).unwrap();
        assert_eq!(out.num_cols(), 1);
        assert_eq!(out.get(0, 0), 2.0 + 3.0 * 10.0);
        assert_eq!(out.get(1, 0), 1.0 + 0.5 * 32.0);
        // input untouched
        assert_eq!(data.get(0, 0), 2.0);
    }

    #[test]
    fn test_combine_shape_errors() {
        let narrow = MatrixBlock::new(array![[1.0], [2.0]]);
        let offset = MatrixBlock::new(array![[0.0]]);
        assert!(matches!(
            combine(&op("cumulative-offset-fused-multiply"), &narrow, &offset),
            Err(CumulativeError::ShapeMismatch(_))
        ));

        let wide_offset = MatrixBlock::new(array![[0.0, 0.0]]);
        assert!(matches!(
            combine(&op("cumulative-offset-plus"), &narrow, &wide_offset),
            Err(CumulativeError::ShapeMismatch(_))
        ));

        let pair = MatrixBlock::new(array![[1.0, 2.0]]);
        let no_columns = MatrixBlock::new(Array2::zeros((1, 0)));
        assert!(matches!(
            combine(&op("cumulative-offset-fused-multiply"), &pair, &no_columns),
            Err(CumulativeError::ShapeMismatch(_))
        ));
    }
}
