#![allow(dead_code)]

use ndarray::{arr1, arr2, Array2};

use formation_energy::{
    CompoundId, GroupId, GroupMatrix, Measurements, ReactionId, StoichiometricMatrix,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn compound_ids() -> Vec<CompoundId> {
    vec![CompoundId(23), CompoundId(70), CompoundId(152), CompoundId(5)]
}

pub fn reaction_ids() -> Vec<ReactionId> {
    (1..=5).map(ReactionId).collect()
}

pub fn group_ids() -> Vec<GroupId> {
    (0..4).map(|ii| GroupId(format!("g{ii}"))).collect()
}

/// Four compounds and five reactions
///
/// The first reaction interconverts two compounds with identical group decompositions, so it is
/// invisible to the group layer. The columns all sum to zero and the fifth reaction is the
/// difference of the second and first, leaving the stoichiometric matrix with rank three.
pub fn stoichiometry() -> StoichiometricMatrix {
    StoichiometricMatrix::new(
        compound_ids(),
        reaction_ids(),
        arr2(&[
            [-1., -1., 0., 2., 0.],
            [1., 0., -1., 0., -1.],
            [0., 1., 0., -1., 1.],
            [0., 0., 1., -1., 0.],
        ]),
    )
    .unwrap()
}

/// Compounds 23 and 70 share a decomposition
pub fn groups() -> GroupMatrix {
    GroupMatrix::new(compound_ids(), group_ids(), group_counts()).unwrap()
}

pub fn group_counts() -> Array2<f64> {
    arr2(&[
        [1., 2., 0., 1.],
        [1., 2., 0., 1.],
        [0., 1., 3., 0.],
        [2., 0., 1., 1.],
    ])
}

/// An invertible decomposition, under which no reaction is invisible to the group layer
pub fn groups_without_kernel() -> GroupMatrix {
    GroupMatrix::new(
        compound_ids(),
        group_ids(),
        arr2(&[
            [1., 2., 11., 1.],
            [2., 7., 0., 4.],
            [1., 5., 2., 2.],
            [3., 3., 2., 7.],
        ]),
    )
    .unwrap()
}

pub fn measurements() -> Measurements {
    Measurements::new(reaction_ids(), arr1(&[1.5, -3.0, 2.0, 4.0, -4.2])).unwrap()
}

pub fn assert_close(actual: f64, expected: f64) {
    approx::assert_relative_eq!(actual, expected, epsilon = 1e-12, max_relative = 1e-8);
}

pub fn assert_all_close<'a>(
    actual: impl IntoIterator<Item = &'a f64>,
    expected: impl IntoIterator<Item = &'a f64>,
) {
    let actual = actual.into_iter().collect::<Vec<_>>();
    let expected = expected.into_iter().collect::<Vec<_>>();
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.into_iter().zip(expected) {
        assert_close(*a, *e);
    }
}
