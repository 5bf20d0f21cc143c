use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

use itertools::Itertools;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::{Precondition, Result};

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompoundId(pub u64);

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReactionId(pub u64);

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl fmt::Display for CompoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compound {}", self.0)
    }
}

impl fmt::Display for ReactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reaction {}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group {}", self.0)
    }
}

/// A dense matrix whose rows and columns carry identifiers
#[derive(Clone, Debug, PartialEq)]
pub struct LabelledMatrix<R, C> {
    rows: Vec<R>,
    columns: Vec<C>,
    values: Array2<f64>,
}

/// Stoichiometric coefficients, compounds by reactions
pub type StoichiometricMatrix = LabelledMatrix<CompoundId, ReactionId>;

/// Group occurrence counts, compounds by groups
pub type GroupMatrix = LabelledMatrix<CompoundId, GroupId>;

impl<R, C> LabelledMatrix<R, C>
where
    R: Eq + Hash + fmt::Display,
    C: Eq + Hash + fmt::Display,
{
    /// # Errors
    /// Returns `Precondition::ShapeMismatch` if the label counts disagree with the shape of
    /// `values`, `Precondition::DuplicateLabel` if a row or column label repeats, or
    /// `Precondition::NonFinite` if any value is `NaN` or infinite.
    pub fn new(rows: Vec<R>, columns: Vec<C>, values: Array2<f64>) -> Result<Self> {
        let (num_rows, num_columns) = values.dim();
        if rows.len() != num_rows {
            return Err(Precondition::ShapeMismatch {
                axis: "row axis",
                labels: rows.len(),
                values: num_rows,
            }
            .into());
        }
        if columns.len() != num_columns {
            return Err(Precondition::ShapeMismatch {
                axis: "column axis",
                labels: columns.len(),
                values: num_columns,
            }
            .into());
        }
        check_unique(&rows)?;
        check_unique(&columns)?;
        if !values.iter().all(|value| value.is_finite()) {
            return Err(Precondition::NonFinite("matrix").into());
        }
        Ok(Self {
            rows,
            columns,
            values,
        })
    }
}

impl<R, C> LabelledMatrix<R, C> {
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn columns(&self) -> &[C] {
        &self.columns
    }

    pub const fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Keep only the columns at the given positions, in the given order
    ///
    /// # Errors
    /// Returns `Precondition::IndexOutOfRange` if any position is past the last column, or
    /// `Precondition::DuplicateIndex` if a position repeats.
    pub fn select_columns(&self, indices: &[usize]) -> Result<Self>
    where
        R: Clone,
        C: Clone,
    {
        check_indices(indices, self.columns.len())?;
        check_distinct(indices)?;
        Ok(Self {
            rows: self.rows.clone(),
            columns: indices.iter().map(|&ii| self.columns[ii].clone()).collect(),
            values: self.values.select(Axis(1), indices),
        })
    }
}

impl<R, C> LabelledMatrix<R, C>
where
    R: Clone + Eq + Hash + fmt::Display,
    C: Clone + Eq + Hash + fmt::Display,
{
    /// Assemble a dense matrix from long-form `(row, column, value)` entries
    ///
    /// Pairs which never appear are zero, so sparse tables which omit zero coefficients can be
    /// passed directly.
    ///
    /// # Errors
    /// Fails if a label repeats in `rows` or `columns`, if an entry names a label missing from
    /// them, if the same pair appears twice, or if a value is not finite.
    pub fn from_entries<I>(rows: Vec<R>, columns: Vec<C>, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (R, C, f64)>,
    {
        check_unique(&rows)?;
        check_unique(&columns)?;
        let row_positions = positions(&rows);
        let column_positions = positions(&columns);
        let mut values = Array2::zeros((rows.len(), columns.len()));
        let mut seen = vec![false; values.len()];

        for (row, column, value) in entries {
            let ii = *row_positions
                .get(&row)
                .ok_or_else(|| Precondition::UnknownLabel(row.to_string()))?;
            let jj = *column_positions
                .get(&column)
                .ok_or_else(|| Precondition::UnknownLabel(column.to_string()))?;
            let flat = ii * columns.len() + jj;
            if seen[flat] {
                return Err(Precondition::DuplicateEntry {
                    row: row.to_string(),
                    column: column.to_string(),
                }
                .into());
            }
            seen[flat] = true;
            values[[ii, jj]] = value;
        }

        Self::new(rows, columns, values)
    }
}

fn positions<L: Clone + Eq + Hash>(labels: &[L]) -> HashMap<L, usize> {
    labels
        .iter()
        .enumerate()
        .map(|(ii, label)| (label.clone(), ii))
        .collect()
}

fn check_unique<L: Eq + Hash + fmt::Display>(labels: &[L]) -> Result<()> {
    if let Some(label) = first_duplicate(labels) {
        return Err(Precondition::DuplicateLabel(label.to_string()).into());
    }
    Ok(())
}

pub(crate) fn check_distinct(indices: &[usize]) -> Result<()> {
    if let Some(&index) = first_duplicate(indices) {
        return Err(Precondition::DuplicateIndex(index).into());
    }
    Ok(())
}

pub(crate) fn check_indices(indices: &[usize], len: usize) -> Result<()> {
    if let Some(&index) = indices.iter().find(|&&index| index >= len) {
        return Err(Precondition::IndexOutOfRange { index, len }.into());
    }
    Ok(())
}

/// Measured reaction energies, one row per reaction
#[derive(Clone, Debug, PartialEq)]
pub struct Measurements {
    reactions: Vec<ReactionId>,
    /// Measured standard reaction energy
    y: Array1<f64>,
    /// How many raw observations were averaged into each row
    counts: Vec<usize>,
}

impl Measurements {
    /// # Errors
    /// Fails if `reactions` and `y` differ in length, a reaction repeats, or `y` holds a
    /// non-finite value.
    pub fn new(reactions: Vec<ReactionId>, y: Array1<f64>) -> Result<Self> {
        if reactions.len() != y.len() {
            return Err(Precondition::ShapeMismatch {
                axis: "measurements",
                labels: reactions.len(),
                values: y.len(),
            }
            .into());
        }
        check_unique(&reactions)?;
        if !y.iter().all(|value| value.is_finite()) {
            return Err(Precondition::NonFinite("measurements").into());
        }
        let counts = vec![1; reactions.len()];
        Ok(Self {
            reactions,
            y,
            counts,
        })
    }

    /// Collapse repeated observations of a reaction into their mean
    ///
    /// Rows are ordered by reaction id.
    ///
    /// # Errors
    /// Fails if any observation is not finite.
    pub fn from_observations<I>(observations: I) -> Result<Self>
    where
        I: IntoIterator<Item = (ReactionId, f64)>,
    {
        let mut grouped: BTreeMap<ReactionId, (f64, usize)> = BTreeMap::new();
        for (reaction, value) in observations {
            if !value.is_finite() {
                return Err(Precondition::NonFinite("observations").into());
            }
            let entry = grouped.entry(reaction).or_insert((0., 0));
            entry.0 += value;
            entry.1 += 1;
        }

        let (reactions, (y, counts)): (Vec<_>, (Vec<_>, Vec<_>)) = grouped
            .into_iter()
            .map(|(reaction, (sum, count))| {
                #[allow(clippy::cast_precision_loss)]
                let mean = sum / count as f64;
                (reaction, (mean, count))
            })
            .unzip();

        Ok(Self {
            reactions,
            y: Array1::from(y),
            counts,
        })
    }

    pub fn reactions(&self) -> &[ReactionId] {
        &self.reactions
    }

    pub const fn values(&self) -> &Array1<f64> {
        &self.y
    }

    pub fn observation_counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    /// Keep only the rows at the given positions, in the given order
    ///
    /// # Errors
    /// Returns `Precondition::IndexOutOfRange` if any position is past the last row, or
    /// `Precondition::DuplicateIndex` if a position repeats.
    pub fn select(&self, indices: &[usize]) -> Result<Self> {
        check_indices(indices, self.len())?;
        check_distinct(indices)?;
        Ok(Self {
            reactions: indices.iter().map(|&ii| self.reactions[ii]).collect(),
            y: self.y.select(Axis(0), indices),
            counts: indices.iter().map(|&ii| self.counts[ii]).collect(),
        })
    }
}

/// Find the first item which repeats
fn first_duplicate<T: Eq + Hash>(items: &[T]) -> Option<&T> {
    items.iter().duplicates().next()
}
