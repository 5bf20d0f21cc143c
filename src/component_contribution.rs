//! Component contribution: a two layer regression of formation energies on reaction energies.
//!
//! The reactant layer regresses the measured reaction energies `b` directly on the
//! stoichiometric matrix `S`, giving one estimate per compound. That estimate is only determined
//! on the range of `S`, so the remaining directions are filled in by the group layer, which
//! regresses `b` on `GᵗS` and maps the group estimates back to compounds through `G`. The two
//! layers have different ranks and residuals, and so carry separate mean squared errors into the
//! covariance.

use itertools::Itertools;
use ndarray::{Array1, Array2, Axis};

use crate::config::{Config, DegeneracyPolicy};
use crate::estimate::Estimate;
use crate::math::{invert_project, Projection};
use crate::table::{
    CompoundId, GroupId, GroupMatrix, Measurements, ReactionId, StoichiometricMatrix,
};
use crate::{Degeneracy, Layer, Precondition, Result};

/// A completed fit
///
/// Holds its own copies of the inputs alongside the estimates, so it stays meaningful after the
/// caller's tables are dropped or sliced.
#[derive(Clone, Debug)]
pub struct FitResult {
    stoichiometry: StoichiometricMatrix,
    groups: GroupMatrix,
    measurements: Measurements,
    formation_energies: Estimate<CompoundId>,
    group_contributions: Estimate<GroupId>,
    /// Least squares compound estimate from the reactant layer alone
    reactant_layer: Array1<f64>,
    diagnostics: Diagnostics,
}

/// Ranks and residual statistics of the two regression layers
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostics {
    reactant_rank: usize,
    group_rank: usize,
    reactant_mse: f64,
    group_mse: f64,
    kernel_mse: f64,
    kernel_reactions: Vec<usize>,
}

impl Diagnostics {
    pub const fn reactant_rank(&self) -> usize {
        self.reactant_rank
    }

    pub const fn group_rank(&self) -> usize {
        self.group_rank
    }

    /// Residual sum of squares of the reactant layer over `reactions - reactant_rank`
    pub const fn reactant_mse(&self) -> f64 {
        self.reactant_mse
    }

    /// Residual sum of squares of the group layer over `reactions - group_rank`
    pub const fn group_mse(&self) -> f64 {
        self.group_mse
    }

    /// Mean squared group layer residual over the reactions invisible to the group layer
    ///
    /// `None` when no such reaction exists, in which case the value is undefined.
    pub fn kernel_mse(&self) -> Option<f64> {
        if self.kernel_reactions.is_empty() {
            None
        } else {
            Some(self.kernel_mse)
        }
    }

    /// Positions of reactions whose column in `GᵗS` is identically zero
    pub fn kernel_reactions(&self) -> &[usize] {
        &self.kernel_reactions
    }
}

/// Fit formation energies by component contribution
///
/// `stoichiometry` is compounds by reactions, `groups` is compounds by groups and
/// `measurements` holds one value per reaction. Rows of `groups` must be the compounds of
/// `stoichiometry` in the same order, and rows of `measurements` its reactions in the same order.
///
/// # Errors
/// - `PrecondViolation` for misaligned or empty inputs or negative group counts. Nothing is
///   computed in that case.
/// - `NumericalDegeneracy` if a decomposition fails, or, under `DegeneracyPolicy::Reject`, if a
///   layer has no residual degrees of freedom or no reaction lies in the kernel of the groups.
pub fn fit(
    stoichiometry: &StoichiometricMatrix,
    groups: &GroupMatrix,
    measurements: &Measurements,
    config: &Config,
) -> Result<FitResult> {
    config.validate()?;
    check_alignment(stoichiometry, groups, measurements)?;

    let s = stoichiometry.values();
    let g = groups.values();
    let b = measurements.values();
    let num_reactions = b.len();
    log::info!(
        "fitting {} compounds, {} groups and {} reactions",
        s.nrows(),
        g.ncols(),
        num_reactions
    );

    let gs = g.t().dot(s);

    // Reactant layer
    let rc = invert_project(s, config.tolerance)?;
    // Group layer
    let gc = invert_project(&gs, config.tolerance)?;

    let dg0_rc = rc.inverse.t().dot(b);
    let dg0_gc = gc.inverse.t().dot(b);
    let null_g = rc.null.dot(g);
    let dg0_cc = rc.range.dot(&dg0_rc) + null_g.dot(&dg0_gc);

    let e_rc = s.t().dot(&dg0_rc) - b;
    let e_gc = gs.t().dot(&dg0_gc) - b;

    // rank(GᵗS) <= rank(S), so the reactant layer always runs out of degrees of freedom first
    let reactant_mse = mean_square(
        e_rc.dot(&e_rc),
        num_reactions - rc.rank,
        Degeneracy::NoDegreesOfFreedom(Layer::Reactant),
        config.degeneracy,
    )?;
    let group_mse = mean_square(
        e_gc.dot(&e_gc),
        num_reactions - gc.rank,
        Degeneracy::NoDegreesOfFreedom(Layer::Group),
        config.degeneracy,
    )?;

    let kernel_reactions = kernel_reactions(&gs);
    let kernel_mse = mean_square(
        kernel_reactions.iter().map(|&jj| e_gc[jj].powi(2)).sum(),
        kernel_reactions.len(),
        Degeneracy::EmptyKernel,
        config.degeneracy,
    )?;

    let components = covariance_components(s, &gs, &null_g, &rc, &gc, config.tolerance)?;
    let covariance = components.combine(reactant_mse, group_mse, kernel_mse);
    let group_covariance = &components.group_inverse * group_mse + &gc.null * kernel_mse;

    log::info!(
        "reactant layer rank {}, mse {:.6e}; group layer rank {}, mse {:.6e}; {} kernel reactions",
        rc.rank,
        reactant_mse,
        gc.rank,
        group_mse,
        kernel_reactions.len()
    );

    Ok(FitResult {
        formation_energies: Estimate::new(stoichiometry.rows().to_vec(), dg0_cc, &covariance)?,
        group_contributions: Estimate::new(groups.columns().to_vec(), dg0_gc, &group_covariance)?,
        reactant_layer: dg0_rc,
        diagnostics: Diagnostics {
            reactant_rank: rc.rank,
            group_rank: gc.rank,
            reactant_mse,
            group_mse,
            kernel_mse,
            kernel_reactions,
        },
        stoichiometry: stoichiometry.clone(),
        groups: groups.clone(),
        measurements: measurements.clone(),
    })
}

/// Compound covariance structures of the two layers and of the directions neither layer sees,
/// each still to be scaled by its mean squared error
struct CovarianceComponents {
    reactant: Array2<f64>,
    group: Array2<f64>,
    kernel: Array2<f64>,
    /// `(GS GSᵗ)⁺`
    group_inverse: Array2<f64>,
}

impl CovarianceComponents {
    fn combine(&self, reactant_mse: f64, group_mse: f64, kernel_mse: f64) -> Array2<f64> {
        &self.reactant * reactant_mse + &self.group * group_mse + &self.kernel * kernel_mse
    }
}

fn covariance_components(
    s: &Array2<f64>,
    gs: &Array2<f64>,
    null_g: &Array2<f64>,
    rc: &Projection,
    gc: &Projection,
    tolerance: f64,
) -> Result<CovarianceComponents> {
    let inv_ss = invert_project(&s.dot(&s.t()), tolerance)?.inverse;
    let group_inverse = invert_project(&gs.dot(&gs.t()), tolerance)?.inverse;

    Ok(CovarianceComponents {
        reactant: rc.range.dot(&inv_ss).dot(&rc.range),
        group: null_g.dot(&group_inverse).dot(&null_g.t()),
        kernel: null_g.dot(&gc.null).dot(&null_g.t()),
        group_inverse,
    })
}

fn check_alignment(
    stoichiometry: &StoichiometricMatrix,
    groups: &GroupMatrix,
    measurements: &Measurements,
) -> Result<()> {
    if stoichiometry.rows().is_empty() {
        return Err(Precondition::Empty("compound axis").into());
    }
    if stoichiometry.columns().is_empty() {
        return Err(Precondition::Empty("reaction axis").into());
    }
    if groups.columns().is_empty() {
        return Err(Precondition::Empty("group axis").into());
    }
    if groups.rows() != stoichiometry.rows() {
        return Err(Precondition::GroupRowsMisaligned.into());
    }
    if measurements.reactions() != stoichiometry.columns() {
        return Err(Precondition::MeasurementRowsMisaligned.into());
    }
    if let Some(((ii, jj), _)) = groups
        .values()
        .indexed_iter()
        .find(|(_, &count)| count < 0.)
    {
        return Err(Precondition::NegativeGroupCount {
            compound: groups.rows()[ii].to_string(),
            group: groups.columns()[jj].to_string(),
        }
        .into());
    }
    Ok(())
}

/// Positions of the reactions which are invisible to the group layer
#[allow(clippy::float_cmp)]
fn kernel_reactions(gs: &Array2<f64>) -> Vec<usize> {
    gs.axis_iter(Axis(1))
        .positions(|column| column.iter().all(|&value| value == 0.))
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn mean_square(
    sum_of_squares: f64,
    divisor: usize,
    degeneracy: Degeneracy,
    policy: DegeneracyPolicy,
) -> Result<f64> {
    if divisor > 0 {
        return Ok(sum_of_squares / divisor as f64);
    }
    match policy {
        DegeneracyPolicy::Reject => Err(degeneracy.into()),
        DegeneracyPolicy::NotANumber => {
            log::warn!("{degeneracy}, mean squared error is undefined");
            Ok(f64::NAN)
        }
    }
}

impl FitResult {
    pub const fn stoichiometry(&self) -> &StoichiometricMatrix {
        &self.stoichiometry
    }

    pub const fn groups(&self) -> &GroupMatrix {
        &self.groups
    }

    pub const fn measurements(&self) -> &Measurements {
        &self.measurements
    }

    pub fn compounds(&self) -> &[CompoundId] {
        self.formation_energies.labels()
    }

    /// Estimated formation energy for each compound, in the row order of the stoichiometric
    /// matrix
    pub const fn mean(&self) -> &Array1<f64> {
        self.formation_energies.mean()
    }

    /// Symmetric compound by compound covariance of the formation energies
    pub const fn covariance(&self) -> &Array2<f64> {
        self.formation_energies.covariance()
    }

    pub const fn formation_energies(&self) -> &Estimate<CompoundId> {
        &self.formation_energies
    }

    /// Group layer estimate, with covariance `MSE_gc (GS GSᵗ)⁺ + MSE_kerG P_N_gc`
    pub const fn group_contributions(&self) -> &Estimate<GroupId> {
        &self.group_contributions
    }

    pub const fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub const fn reactant_layer_estimate(&self) -> &Array1<f64> {
        &self.reactant_layer
    }

    /// Compound estimate implied by the group layer alone, `G dG0_gc`
    pub fn group_layer_estimate(&self) -> Array1<f64> {
        self.groups.values().dot(self.group_contributions.mean())
    }

    /// Reaction energies for reactions over the fitted compounds
    ///
    /// # Errors
    /// Returns `Precondition::LabelsMisaligned` unless the rows of `stoichiometry` are the fitted
    /// compounds in the fitted order.
    pub fn predict_reactions(
        &self,
        stoichiometry: &StoichiometricMatrix,
    ) -> Result<Estimate<ReactionId>> {
        if stoichiometry.rows() != self.compounds() {
            return Err(Precondition::LabelsMisaligned.into());
        }
        self.formation_energies.transform(
            &stoichiometry.values().t().to_owned(),
            stoichiometry.columns().to_vec(),
        )
    }

    /// Formation energies of compounds, possibly never measured, from their group decomposition
    ///
    /// # Errors
    /// Returns `Precondition::LabelsMisaligned` unless the columns of `groups` are the fitted
    /// groups in the fitted order.
    pub fn predict_compounds(&self, groups: &GroupMatrix) -> Result<Estimate<CompoundId>> {
        if groups.columns() != self.group_contributions.labels() {
            return Err(Precondition::LabelsMisaligned.into());
        }
        self.group_contributions
            .transform(groups.values(), groups.rows().to_vec())
    }
}
