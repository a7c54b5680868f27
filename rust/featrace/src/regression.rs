//! Polynomial least squares with graceful degradation.
//!
//! Callers get a fit object whose `predict` never fails; the `-1.0`
//! sentinel marks "no usable fit" at the public boundary while the
//! internal fit and solve stay `Result`-based.

use tracing::debug;

use crate::errors::DataProcessingError;

const FIT_DEGREE: usize = 3;
pub const PREDICT_SENTINEL: f64 = -1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    // Ascending order: coefficients[k] multiplies x^k.
    coefficients: Vec<f64>,
}

impl Polynomial {
    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * x + c)
    }
}

/// Degree-3 least-squares fit over `(x, y)` pairs.
#[derive(Debug, Clone)]
pub struct RegressionFit {
    polynomial: Option<Polynomial>,
}

impl RegressionFit {
    /// A fit failure is absorbed: the returned object answers every
    /// `predict` with the sentinel.
    pub fn new(points: &[(f64, f64)]) -> Self {
        let polynomial = match fit_polynomial(points, FIT_DEGREE) {
            Ok(p) => Some(p),
            Err(e) => {
                debug!(error = %e, points = points.len(), "regression fit failed");
                None
            }
        };
        Self { polynomial }
    }

    pub fn is_fitted(&self) -> bool {
        self.polynomial.is_some()
    }

    /// Evaluates the fit at `x`, or `-1.0` when no function was fit or
    /// the evaluation is not finite.
    pub fn predict(&self, x: f64) -> f64 {
        match &self.polynomial {
            Some(p) => {
                let y = p.evaluate(x);
                if y.is_finite() {
                    y
                } else {
                    PREDICT_SENTINEL
                }
            }
            None => PREDICT_SENTINEL,
        }
    }
}

/// Least squares via the normal equations.
fn fit_polynomial(
    points: &[(f64, f64)],
    degree: usize,
) -> Result<Polynomial, DataProcessingError> {
    let n = degree + 1;
    if points.is_empty() {
        return Err(DataProcessingError::ExpectedNonEmptyData);
    }
    if points.len() < n {
        return Err(DataProcessingError::InsufficientData {
            real: points.len(),
            expected: n,
        });
    }
    for &(x, y) in points {
        if !x.is_finite() || !y.is_finite() {
            return Err(DataProcessingError::NonFiniteValue(if x.is_finite() {
                y
            } else {
                x
            }));
        }
    }

    // A[i][j] = sum x^(i+j), b[i] = sum y * x^i
    let mut matrix = vec![vec![0.0; n]; n];
    let mut rhs = vec![0.0; n];
    for &(x, y) in points {
        let mut xi = 1.0;
        let mut powers = Vec::with_capacity(2 * n - 1);
        for _ in 0..(2 * n - 1) {
            powers.push(xi);
            xi *= x;
        }
        for i in 0..n {
            rhs[i] += y * powers[i];
            for j in 0..n {
                matrix[i][j] += powers[i + j];
            }
        }
    }

    let coefficients = solve(matrix, rhs)?;
    Ok(Polynomial { coefficients })
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, DataProcessingError> {
    let n = b.len();
    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&r1, &r2| {
                a[r1][col]
                    .abs()
                    .partial_cmp(&a[r2][col].abs())
                    .expect("pivot magnitudes should not be NaN")
            })
            .expect("column range is non-empty");
        if a[pivot_row][col].abs() < 1e-12 {
            return Err(DataProcessingError::SingularSystem);
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for k in (row + 1)..n {
            acc -= a[row][k] * x[k];
        }
        x[row] = acc / a[row][row];
    }
    Ok(x)
}
