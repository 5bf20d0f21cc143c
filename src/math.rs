use ndarray::{s, Array2, ArrayBase, Data, Ix2};
use ndarray_linalg::SVD;

use crate::{Degeneracy, Result};

/// The generalized inverse of a matrix together with projectors onto the space spanned by its
/// columns and the orthogonal complement of that space.
#[derive(Clone, Debug)]
pub struct Projection {
    /// Moore-Penrose pseudo-inverse, of shape (n x m) for an (m x n) input
    pub inverse: Array2<f64>,
    /// Number of singular values strictly above the tolerance
    pub rank: usize,
    /// (m x m) projector onto the range of the input
    pub range: Array2<f64>,
    /// (m x m) projector onto the orthogonal complement of the range, `I - range`
    pub null: Array2<f64>,
}

/// Invert a matrix and compute its range and null space projectors
///
/// For an (m x n) matrix `M = U Σ Vᵗ` the rank `r` is the number of singular values larger than
/// `tolerance`. The inverse is `V_r Σ_r⁻¹ U_rᵗ` and the projectors are built from the leading `r`
/// and trailing `m - r` left singular vectors respectively. Rectangular and rank-deficient inputs
/// are both fine.
///
/// # Errors
/// Returns `Degeneracy::Decomposition` if the singular value decomposition fails.
///
/// # Examples
///
/// ```
/// use formation_energy::math::invert_project;
/// use ndarray::arr2;
///
/// // A single isomerisation between two compounds
/// let matrix = arr2(&[[-1.], [1.]]);
/// let projection = invert_project(&matrix, 1e-10).unwrap();
///
/// assert_eq!(projection.rank, 1);
/// approx::assert_relative_eq!(projection.inverse[[0, 1]], 0.5, epsilon = 1e-12);
/// approx::assert_relative_eq!(projection.null[[0, 1]], 0.5, epsilon = 1e-12);
/// approx::assert_relative_eq!(projection.range[[0, 1]], -0.5, epsilon = 1e-12);
/// ```
pub fn invert_project<S: Data<Elem = f64>>(
    matrix: &ArrayBase<S, Ix2>,
    tolerance: f64,
) -> Result<Projection> {
    let (u, sigma, vt) = matrix.svd(true, true)?;
    let (Some(u), Some(vt)) = (u, vt) else {
        return Err(Degeneracy::MissingSingularVectors.into());
    };

    // Singular values are returned in descending order
    let rank = sigma.iter().take_while(|&&value| value > tolerance).count();

    let u_range = u.slice(s![.., ..rank]);
    let u_null = u.slice(s![.., rank..]);
    let v_range = vt.slice(s![..rank, ..]).reversed_axes();

    let inverse_sigma = sigma.slice(s![..rank]).mapv(f64::recip);
    let inverse = (&v_range * &inverse_sigma).dot(&u_range.t());

    Ok(Projection {
        inverse,
        rank,
        range: u_range.dot(&u_range.t()),
        null: u_null.dot(&u_null.t()),
    })
}

/// Average a square matrix with its transpose, removing floating point asymmetry
pub fn symmetrize<S: Data<Elem = f64>>(matrix: &ArrayBase<S, Ix2>) -> Array2<f64> {
    (matrix + &matrix.t()) * 0.5
}
