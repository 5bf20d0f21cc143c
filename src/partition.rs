use ndarray::Axis;
use serde::{Deserialize, Serialize};

use crate::table::{check_distinct, check_indices, CompoundId, StoichiometricMatrix};
use crate::{Error, Precondition, Result};

/// A train/test split of reaction positions, 0-based along the reaction axis
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    train: Vec<usize>,
    test: Vec<usize>,
}

impl Partition {
    pub const fn new(train: Vec<usize>, test: Vec<usize>) -> Self {
        Self { train, test }
    }

    pub fn train(&self) -> &[usize] {
        &self.train
    }

    pub fn test(&self) -> &[usize] {
        &self.test
    }

    /// Check the partition can index `num_reactions` reactions
    ///
    /// # Errors
    /// Fails if the training set is empty, or if either half repeats a position or holds one
    /// out of range.
    pub fn validate(&self, num_reactions: usize) -> Result<()> {
        if self.train.is_empty() {
            return Err(Precondition::Empty("training set").into());
        }
        check_indices(&self.train, num_reactions)?;
        check_indices(&self.test, num_reactions)?;
        check_distinct(&self.train)?;
        check_distinct(&self.test)
    }
}

impl From<(Vec<usize>, Vec<usize>)> for Partition {
    fn from((train, test): (Vec<usize>, Vec<usize>)) -> Self {
        Self::new(train, test)
    }
}

/// Split `num_reactions` reactions into `folds` partitions, reaction `i` being held out in fold
/// `i % folds`
///
/// # Errors
/// Returns `Error::InvalidConfig` unless `2 <= folds <= num_reactions`.
pub fn k_fold(num_reactions: usize, folds: usize) -> Result<Vec<Partition>> {
    if folds < 2 || folds > num_reactions {
        return Err(Error::InvalidConfig(format!(
            "cannot split {num_reactions} reactions into {folds} folds"
        )));
    }
    Ok((0..folds)
        .map(|fold| {
            let (test, train) = (0..num_reactions).partition(|ii| ii % folds == fold);
            Partition::new(train, test)
        })
        .collect())
}

/// One partition per reaction, holding out just that reaction
pub fn leave_one_out(num_reactions: usize) -> Vec<Partition> {
    (0..num_reactions)
        .map(|held_out| {
            let train = (0..num_reactions).filter(|&ii| ii != held_out).collect();
            Partition::new(train, vec![held_out])
        })
        .collect()
}

/// Hold out every reaction which creates or consumes any of `compounds`
///
/// # Errors
/// Returns `Precondition::UnknownLabel` if a compound is not a row of `stoichiometry`.
#[allow(clippy::float_cmp)]
pub fn hold_out_compounds(
    stoichiometry: &StoichiometricMatrix,
    compounds: &[CompoundId],
) -> Result<Partition> {
    let rows = compounds
        .iter()
        .map(|compound| {
            stoichiometry
                .rows()
                .iter()
                .position(|candidate| candidate == compound)
                .ok_or_else(|| Error::from(Precondition::UnknownLabel(compound.to_string())))
        })
        .collect::<Result<Vec<usize>>>()?;

    let (test, train) = stoichiometry
        .values()
        .axis_iter(Axis(1))
        .enumerate()
        .map(|(jj, column)| (jj, rows.iter().any(|&ii| column[ii] != 0.)))
        .partition::<Vec<_>, _>(|&(_, involved)| involved);

    Ok(Partition::new(
        train.into_iter().map(|(jj, _)| jj).collect(),
        test.into_iter().map(|(jj, _)| jj).collect(),
    ))
}
