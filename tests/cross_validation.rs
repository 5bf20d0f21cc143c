mod common;

use formation_energy::partition::{hold_out_compounds, k_fold, leave_one_out};
use formation_energy::{
    cross_validate, cross_validate_best_effort, fit, CompoundId, Config, Degeneracy, Error,
    Partition, Precondition, ReactionId,
};

use common::{
    assert_all_close, assert_close, groups, groups_without_kernel, init_logging, measurements,
    stoichiometry,
};

/// Training sets which all keep the reaction invisible to the group layer
fn partitions() -> Vec<Partition> {
    vec![
        Partition::new(vec![0, 1, 2, 3], vec![4]),
        Partition::new(vec![0, 2, 3, 4], vec![1]),
        Partition::new(vec![0, 1, 2, 4], vec![3]),
    ]
}

#[test]
fn bundle_holds_one_fit_per_partition_in_order() {
    init_logging();
    let s = stoichiometry();
    let g = groups();
    let m = measurements();
    let config = Config::default();

    let cv = cross_validate(&s, &g, &m, partitions(), &config).unwrap();

    assert_eq!(cv.splits().len(), 3);
    assert_eq!(cv.partitions(), partitions().as_slice());

    let full = fit(&s, &g, &m, &config).unwrap();
    assert_all_close(cv.full().mean(), full.mean());
    assert_all_close(cv.full().covariance(), full.covariance());

    for (split, partition) in cv.splits().iter().zip(partitions()) {
        let expected = fit(
            &s.select_columns(partition.train()).unwrap(),
            &g,
            &m.select(partition.train()).unwrap(),
            &config,
        )
        .unwrap();
        let train_reactions = partition
            .train()
            .iter()
            .map(|&jj| ReactionId(jj as u64 + 1))
            .collect::<Vec<_>>();
        assert_eq!(split.stoichiometry().columns(), train_reactions.as_slice());
        assert_eq!(split.groups(), &g);
        assert_all_close(split.mean(), expected.mean());
        assert_all_close(split.covariance(), expected.covariance());
    }
}

#[test]
fn no_partitions_gives_only_the_full_fit() {
    let cv = cross_validate(
        &stoichiometry(),
        &groups(),
        &measurements(),
        vec![],
        &Config::default(),
    )
    .unwrap();

    assert!(cv.splits().is_empty());
    assert!(cv.held_out().unwrap().is_empty());
}

#[test]
fn test_indices_do_not_change_the_split_fit() {
    let partitions = vec![
        Partition::new(vec![0, 1, 2, 3], vec![4]),
        Partition::new(vec![0, 1, 2, 3], vec![]),
    ];

    let cv = cross_validate(
        &stoichiometry(),
        &groups(),
        &measurements(),
        partitions,
        &Config::default(),
    )
    .unwrap();

    assert_all_close(cv.splits()[0].mean(), cv.splits()[1].mean());
    assert_all_close(cv.splits()[0].covariance(), cv.splits()[1].covariance());
}

#[test]
fn held_out_reactions_are_predicted_from_the_training_fit() {
    let cv = cross_validate(
        &stoichiometry(),
        &groups(),
        &measurements(),
        partitions(),
        &Config::default(),
    )
    .unwrap();

    let held_out = cv.held_out().unwrap();

    assert_eq!(held_out.len(), 3);
    let first = &held_out[0];
    assert_eq!(first.partition(), 0);
    assert_eq!(first.observed().reactions(), &[ReactionId(5)]);
    assert_eq!(first.predicted().labels(), &[ReactionId(5)]);
    // The fifth reaction converts compound 70 into compound 152
    assert_close(first.predicted().mean()[0], -4.5);
    assert_close(first.residuals()[0], -0.3);
    assert_close(first.rmse().unwrap(), 0.3);
    assert!(first.predicted().covariance()[[0, 0]] >= 0.);
}

#[test]
fn failing_split_aborts_and_names_its_partition() {
    init_logging();
    // Holding out the first reaction leaves nothing in the kernel of the groups
    let result = cross_validate(
        &stoichiometry(),
        &groups(),
        &measurements(),
        leave_one_out(5),
        &Config::default(),
    );

    match result {
        Err(Error::Split { index, source }) => {
            assert_eq!(index, 0);
            assert!(matches!(
                *source,
                Error::NumericalDegeneracy(Degeneracy::EmptyKernel)
            ));
        }
        other => panic!("expected a split failure, got {other:?}"),
    }
}

#[test]
fn best_effort_records_failures_and_keeps_the_rest() {
    let cv = cross_validate_best_effort(
        &stoichiometry(),
        &groups(),
        &measurements(),
        k_fold(5, 5).unwrap(),
        &Config::default(),
    )
    .unwrap();

    assert_eq!(cv.splits().len(), 5);
    assert_eq!(cv.partitions().len(), 5);
    assert!(cv.splits()[0].is_err());
    assert!(cv.splits()[1..].iter().all(Result::is_ok));

    let failures = cv.failures().collect::<Vec<_>>();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0], Error::Split { index: 0, .. }));
    assert!(matches!(
        failures[0].root(),
        Error::NumericalDegeneracy(Degeneracy::EmptyKernel)
    ));

    let held_out = cv.held_out().unwrap();
    assert_eq!(
        held_out.iter().map(|h| h.partition()).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
    for h in &held_out {
        assert_eq!(h.residuals().len(), 1);
    }
}

#[test]
fn out_of_range_partition_is_a_tagged_precondition_failure() {
    let partitions = vec![
        Partition::new(vec![0, 1, 2, 3], vec![4]),
        Partition::new(vec![0, 1, 7], vec![]),
    ];

    let result = cross_validate(
        &stoichiometry(),
        &groups(),
        &measurements(),
        partitions,
        &Config::default(),
    );

    match result {
        Err(Error::Split { index: 1, source }) => assert!(matches!(
            *source,
            Error::PrecondViolation(Precondition::IndexOutOfRange { index: 7, len: 5 })
        )),
        other => panic!("expected a split failure, got {other:?}"),
    }
}

#[test]
fn full_fit_failure_is_not_tagged_with_a_partition() {
    let result = cross_validate(
        &stoichiometry(),
        &groups_without_kernel(),
        &measurements(),
        partitions(),
        &Config::default(),
    );

    assert!(matches!(
        result,
        Err(Error::NumericalDegeneracy(Degeneracy::EmptyKernel))
    ));
}

#[test]
fn compound_hold_out_partitions_feed_the_driver() {
    let s = stoichiometry();
    // Compound 5 takes part in the third and fourth reactions only
    let partition = hold_out_compounds(&s, &[CompoundId(5)]).unwrap();
    assert_eq!(partition, Partition::new(vec![0, 1, 4], vec![2, 3]));

    let cv = cross_validate(
        &s,
        &groups(),
        &measurements(),
        vec![partition],
        &Config::default(),
    )
    .unwrap();

    let held_out = cv.held_out().unwrap();
    assert_eq!(held_out[0].observed().reactions(), &[ReactionId(3), ReactionId(4)]);
    assert_eq!(held_out[0].predicted().mean().len(), 2);
}
