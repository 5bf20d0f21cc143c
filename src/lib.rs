#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// #![warn(clippy::cargo)]

extern crate blas_src;

pub mod component_contribution;
pub mod config;
pub mod cross_validation;
mod error;
pub mod estimate;
pub mod math;
pub mod partition;
pub mod table;

pub use component_contribution::{fit, Diagnostics, FitResult};
pub use config::{Config, DegeneracyPolicy};
pub use cross_validation::{
    cross_validate, cross_validate_best_effort, BestEffortCrossValidation, CrossValidation,
    HeldOut,
};
pub use error::{Degeneracy, Error, Layer, Precondition, Result};
pub use estimate::Estimate;
pub use partition::Partition;
pub use table::{
    CompoundId, GroupId, GroupMatrix, Measurements, ReactionId, StoichiometricMatrix,
};
