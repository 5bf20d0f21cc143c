use std::fmt;

use ndarray_linalg::error::LinalgError;

pub type Result<T> = ::std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("precondition violated: {0}")]
    PrecondViolation(Precondition),

    #[error("numerical degeneracy: {0}")]
    NumericalDegeneracy(Degeneracy),

    /// A fit on one cross-validation partition failed. `index` is the 0-based position of the
    /// partition in the list handed to the driver.
    #[error("cross-validation split {index} failed: {source}")]
    Split {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Strips any partition tags, returning the failure that actually occurred
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Split { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<Precondition> for Error {
    fn from(value: Precondition) -> Self {
        Self::PrecondViolation(value)
    }
}

impl From<Degeneracy> for Error {
    fn from(value: Degeneracy) -> Self {
        Self::NumericalDegeneracy(value)
    }
}

impl From<LinalgError> for Error {
    fn from(value: LinalgError) -> Self {
        Self::NumericalDegeneracy(Degeneracy::Decomposition(value))
    }
}

/// Index alignment and shape requirements on the fit inputs
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum Precondition {
    #[error("group matrix rows do not match the compounds of the stoichiometric matrix")]
    GroupRowsMisaligned,
    #[error("measurement rows do not match the reactions of the stoichiometric matrix")]
    MeasurementRowsMisaligned,
    #[error("estimate labels do not match the columns of the propagating matrix")]
    LabelsMisaligned,
    #[error("{axis} has {labels} labels but {values} entries")]
    ShapeMismatch {
        axis: &'static str,
        labels: usize,
        values: usize,
    },
    #[error("{0} is empty")]
    Empty(&'static str),
    #[error("index {index} is out of range for {len} reactions")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("index {0} appears more than once in a selection")]
    DuplicateIndex(usize),
    #[error("label {0} appears more than once")]
    DuplicateLabel(String),
    #[error("unknown label {0}")]
    UnknownLabel(String),
    #[error("entry ({row}, {column}) appears more than once")]
    DuplicateEntry { row: String, column: String },
    #[error("compound {compound} has a negative count for group {group}")]
    NegativeGroupCount { compound: String, group: String },
    #[error("{0} contains a non-finite value")]
    NonFinite(&'static str),
}

/// Failures of the numerics on otherwise valid input
#[derive(Debug, thiserror::Error)]
pub enum Degeneracy {
    #[error("no degrees of freedom remain in the {0} layer")]
    NoDegreesOfFreedom(Layer),
    #[error("no reaction lies in the kernel of the group decomposition")]
    EmptyKernel,
    #[error("singular value decomposition failed: {0}")]
    Decomposition(LinalgError),
    #[error("singular value decomposition did not return singular vectors")]
    MissingSingularVectors,
}

/// The two regression layers of a component contribution fit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    Reactant,
    Group,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reactant => write!(f, "reactant"),
            Self::Group => write!(f, "group"),
        }
    }
}
