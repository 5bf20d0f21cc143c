use ndarray::{Array1, Array2};

use crate::math::symmetrize;
use crate::{Precondition, Result};

/// Negative variances no larger in magnitude than this fraction of the largest variance (or of
/// one, if that is larger) are floating point round-off
pub const ROUND_OFF: f64 = 1e-9;

/// A labelled mean vector with its covariance
#[derive(Clone, Debug, PartialEq)]
pub struct Estimate<L> {
    labels: Vec<L>,
    mean: Array1<f64>,
    covariance: Array2<f64>,
}

impl<L> Estimate<L> {
    /// The covariance is symmetrised on construction.
    ///
    /// # Errors
    /// Fails if `mean` or `covariance` disagree in size with `labels`.
    pub fn new(labels: Vec<L>, mean: Array1<f64>, covariance: &Array2<f64>) -> Result<Self> {
        let n = labels.len();
        if mean.len() != n {
            return Err(Precondition::ShapeMismatch {
                axis: "mean",
                labels: n,
                values: mean.len(),
            }
            .into());
        }
        if covariance.dim() != (n, n) {
            return Err(Precondition::ShapeMismatch {
                axis: "covariance",
                labels: n,
                values: covariance.nrows().max(covariance.ncols()),
            }
            .into());
        }
        Ok(Self {
            labels,
            mean,
            covariance: symmetrize(covariance),
        })
    }

    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    pub const fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub const fn covariance(&self) -> &Array2<f64> {
        &self.covariance
    }

    /// Square roots of the covariance diagonal
    ///
    /// Negative variances map to zero and `NaN` stays `NaN`. A negative variance beyond
    /// [`ROUND_OFF`] is logged as a warning.
    pub fn standard_errors(&self) -> Array1<f64> {
        let scale = self.variance_scale();
        self.covariance
            .diag()
            .mapv(|variance| standard_error(variance, scale))
    }

    fn variance_scale(&self) -> f64 {
        self.covariance
            .diag()
            .iter()
            .fold(1f64, |acc, variance| acc.max(variance.abs()))
    }

    /// Push the estimate through the linear map `matrix`, whose columns follow `self.labels`
    ///
    /// The result has mean `A μ` and covariance `A Σ Aᵗ`.
    ///
    /// # Errors
    /// Fails if `matrix` has the wrong number of columns or `labels` the wrong length.
    pub fn transform<M>(&self, matrix: &Array2<f64>, labels: Vec<M>) -> Result<Estimate<M>> {
        if matrix.ncols() != self.labels.len() {
            return Err(Precondition::LabelsMisaligned.into());
        }
        let mean = matrix.dot(&self.mean);
        let covariance = matrix.dot(&self.covariance).dot(&matrix.t());
        Estimate::new(labels, mean, &covariance)
    }
}

impl<L: PartialEq> Estimate<L> {
    /// Mean and standard error for one label
    pub fn get(&self, label: &L) -> Option<(f64, f64)> {
        let ii = self.labels.iter().position(|candidate| candidate == label)?;
        let standard_error = standard_error(self.covariance[[ii, ii]], self.variance_scale());
        Some((self.mean[ii], standard_error))
    }
}

fn standard_error(variance: f64, scale: f64) -> f64 {
    if variance < 0. {
        if variance < -ROUND_OFF * scale {
            log::warn!(
                "clipping variance {variance:.3e} to zero, beyond round-off at scale {scale:.3e}"
            );
        }
        0.
    } else {
        variance.sqrt()
    }
}
