use ndarray::Array1;
use rayon::prelude::*;

use crate::component_contribution::{fit, FitResult};
use crate::config::Config;
use crate::estimate::Estimate;
use crate::partition::Partition;
use crate::table::{GroupMatrix, Measurements, ReactionId, StoichiometricMatrix};
use crate::{Error, Result};

/// A full-data fit together with one fit per partition
#[derive(Clone, Debug)]
pub struct CrossValidation {
    full: FitResult,
    splits: Vec<FitResult>,
    partitions: Vec<Partition>,
}

/// As `CrossValidation`, but with failed splits recorded rather than fatal
#[derive(Debug)]
pub struct BestEffortCrossValidation {
    full: FitResult,
    splits: Vec<Result<FitResult>>,
    partitions: Vec<Partition>,
}

/// Predictions for the test reactions of one partition, made by the fit on its training set
#[derive(Clone, Debug)]
pub struct HeldOut {
    partition: usize,
    observed: Measurements,
    predicted: Estimate<ReactionId>,
}

/// Fit the full data and then each partition's training set
///
/// Every split reuses the full group matrix and takes the training columns of `stoichiometry` and
/// the training rows of `measurements`. Splits run in parallel; results keep partition order.
///
/// # Errors
/// A failure of the full fit is returned as is. Otherwise the failure of the first failing
/// partition is returned wrapped in `Error::Split`.
pub fn cross_validate(
    stoichiometry: &StoichiometricMatrix,
    groups: &GroupMatrix,
    measurements: &Measurements,
    partitions: Vec<Partition>,
    config: &Config,
) -> Result<CrossValidation> {
    let (full, splits) = run(stoichiometry, groups, measurements, &partitions, config);
    let full = full?;
    let splits = splits.into_iter().collect::<Result<Vec<_>>>()?;
    log::info!("cross-validation finished over {} partitions", splits.len());
    Ok(CrossValidation {
        full,
        splits,
        partitions,
    })
}

/// Cross-validate, keeping going when individual partitions fail
///
/// # Errors
/// Only a failure of the full-data fit is an error. Split failures are kept in the result,
/// each wrapped in `Error::Split`.
pub fn cross_validate_best_effort(
    stoichiometry: &StoichiometricMatrix,
    groups: &GroupMatrix,
    measurements: &Measurements,
    partitions: Vec<Partition>,
    config: &Config,
) -> Result<BestEffortCrossValidation> {
    let (full, splits) = run(stoichiometry, groups, measurements, &partitions, config);
    let full = full?;
    for error in splits.iter().filter_map(|split| split.as_ref().err()) {
        log::warn!("{error}");
    }
    Ok(BestEffortCrossValidation {
        full,
        splits,
        partitions,
    })
}

fn run(
    stoichiometry: &StoichiometricMatrix,
    groups: &GroupMatrix,
    measurements: &Measurements,
    partitions: &[Partition],
    config: &Config,
) -> (Result<FitResult>, Vec<Result<FitResult>>) {
    log::info!("cross-validating over {} partitions", partitions.len());
    rayon::join(
        || fit(stoichiometry, groups, measurements, config),
        || {
            partitions
                .par_iter()
                .enumerate()
                .map(|(index, partition)| {
                    log::debug!(
                        "fitting split {index} with {} training reactions",
                        partition.train().len()
                    );
                    fit_split(stoichiometry, groups, measurements, partition, config).map_err(
                        |source| Error::Split {
                            index,
                            source: Box::new(source),
                        },
                    )
                })
                .collect()
        },
    )
}

fn fit_split(
    stoichiometry: &StoichiometricMatrix,
    groups: &GroupMatrix,
    measurements: &Measurements,
    partition: &Partition,
    config: &Config,
) -> Result<FitResult> {
    partition.validate(stoichiometry.columns().len())?;
    let stoichiometry = stoichiometry.select_columns(partition.train())?;
    let measurements = measurements.select(partition.train())?;
    fit(&stoichiometry, groups, &measurements, config)
}

fn evaluate(
    index: usize,
    split: &FitResult,
    full: &FitResult,
    partition: &Partition,
) -> Result<HeldOut> {
    let stoichiometry = full.stoichiometry().select_columns(partition.test())?;
    Ok(HeldOut {
        partition: index,
        observed: full.measurements().select(partition.test())?,
        predicted: split.predict_reactions(&stoichiometry)?,
    })
}

impl CrossValidation {
    pub const fn full(&self) -> &FitResult {
        &self.full
    }

    /// One fit per partition, in partition order
    pub fn splits(&self) -> &[FitResult] {
        &self.splits
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Predict every partition's test reactions from its training fit
    ///
    /// # Errors
    /// Fails only if a partition's test indices are out of range.
    pub fn held_out(&self) -> Result<Vec<HeldOut>> {
        self.splits
            .iter()
            .zip(&self.partitions)
            .enumerate()
            .map(|(index, (split, partition))| evaluate(index, split, &self.full, partition))
            .collect()
    }
}

impl BestEffortCrossValidation {
    pub const fn full(&self) -> &FitResult {
        &self.full
    }

    /// One outcome per partition, in partition order
    pub fn splits(&self) -> &[Result<FitResult>] {
        &self.splits
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Failed splits, each tagged with its partition index
    pub fn failures(&self) -> impl Iterator<Item = &Error> {
        self.splits.iter().filter_map(|split| split.as_ref().err())
    }

    /// Held-out predictions for the splits which succeeded
    ///
    /// # Errors
    /// Fails only if a partition's test indices are out of range.
    pub fn held_out(&self) -> Result<Vec<HeldOut>> {
        self.splits
            .iter()
            .zip(&self.partitions)
            .enumerate()
            .filter_map(|(index, (split, partition))| {
                split
                    .as_ref()
                    .ok()
                    .map(|split| evaluate(index, split, &self.full, partition))
            })
            .collect()
    }
}

impl HeldOut {
    /// Position of the partition these predictions belong to
    pub const fn partition(&self) -> usize {
        self.partition
    }

    pub const fn observed(&self) -> &Measurements {
        &self.observed
    }

    pub const fn predicted(&self) -> &Estimate<ReactionId> {
        &self.predicted
    }

    /// Predicted minus observed reaction energy
    pub fn residuals(&self) -> Array1<f64> {
        self.predicted.mean() - self.observed.values()
    }

    /// Root mean squared residual, `None` for an empty test set
    #[allow(clippy::cast_precision_loss)]
    pub fn rmse(&self) -> Option<f64> {
        if self.observed.is_empty() {
            return None;
        }
        let residuals = self.residuals();
        Some((residuals.dot(&residuals) / residuals.len() as f64).sqrt())
    }
}
