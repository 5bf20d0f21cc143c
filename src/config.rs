use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Singular values at or below this are treated as zero when counting rank.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// What to do when a mean squared error would divide by zero
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DegeneracyPolicy {
    /// Fail the fit with `Error::NumericalDegeneracy`
    #[default]
    Reject,
    /// Carry `NaN` forward as the mean squared error, and so into the covariance
    NotANumber,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Tolerance used by the rank-revealing decomposition
    pub tolerance: f64,
    pub degeneracy: DegeneracyPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            degeneracy: DegeneracyPolicy::default(),
        }
    }
}

impl Config {
    /// Read a configuration from a TOML file
    ///
    /// Missing keys take their default values.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid TOML, contains unknown keys or
    /// carries an invalid tolerance.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        contents.parse()
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_degeneracy(mut self, degeneracy: DegeneracyPolicy) -> Self {
        self.degeneracy = degeneracy;
        self
    }

    /// # Errors
    /// Returns `Error::InvalidConfig` if the tolerance is negative or not finite.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0. {
            return Err(Error::InvalidConfig(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
