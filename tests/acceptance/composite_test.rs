//! Composite block acceptance tests.
//!
//! # Acceptance Criteria
//!
//! - Internal variables are laid out one slot per declaration, sized by kind
//! - A failing sub-block leaves no sibling from the same batch alive
//! - Dotted paths resolve through owned sub-blocks; unknown segments are
//!   "not found"
//! - A type that contains itself, directly or through another type, fails
//!   at the nesting limit instead of recursing without bound

use super::common::{init_tracing, output, registry, resource, set_input};
use fb_common::{FbError, FbState, RuntimeConfig, StringId, Value, ValueKind};
use fb_core::{dispatch_event, resolve_path, BasicFb, InternalFbDecl, InternalVarsInfo, Resource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_internal_variable_storage_matches_declaration() -> anyhow::Result<()> {
    let info = InternalVarsInfo::from_pairs(&[
        ("enabled", ValueKind::Bool),
        ("count", ValueKind::UDInt),
        ("setpoint", ValueKind::Real),
        ("elapsed", ValueKind::Time),
        ("label", ValueKind::String),
    ])?;
    let expected: usize = info.vars().iter().map(|decl| decl.kind.size()).sum();
    assert_eq!(BasicFb::calculate_vars_size(&info)?, expected);
    assert_eq!(info.len(), 5);
    for (index, decl) in info.vars().iter().enumerate() {
        assert_eq!(info.index_of(decl.name), Some(index));
    }
    Ok(())
}

#[test]
fn test_sub_block_failure_releases_siblings() {
    let live = Arc::new(AtomicUsize::new(0));
    let resource = resource(
        &live,
        vec![(
            "THREE_PART",
            vec![
                InternalFbDecl::new("part1", "CELL"),
                InternalFbDecl::new("part2", "GEN_AND_0_BOOL"),
                InternalFbDecl::new("part3", "CELL"),
            ],
        )],
    );

    let err = resource.create_fb("THREE_PART", "ASSEMBLY").unwrap_err();
    let FbError::SubBlockCreation { index, source, .. } = err else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(index, 1);
    assert!(matches!(*source, FbError::Configuration(_)));
    assert_eq!(live.load(Ordering::SeqCst), 0);
}

#[test]
fn test_nested_sub_block_failure_propagates() {
    let live = Arc::new(AtomicUsize::new(0));
    let resource = resource(
        &live,
        vec![
            (
                "INNER",
                vec![
                    InternalFbDecl::new("a", "CELL"),
                    InternalFbDecl::new("b", "MISSING"),
                ],
            ),
            (
                "OUTER",
                vec![
                    InternalFbDecl::new("first", "CELL"),
                    InternalFbDecl::new("second", "INNER"),
                ],
            ),
        ],
    );

    assert!(matches!(
        resource.create_fb("OUTER", "NEST"),
        Err(FbError::SubBlockCreation { index: 1, .. })
    ));
    assert_eq!(live.load(Ordering::SeqCst), 0);
}

#[test]
fn test_paths_resolve_through_sub_blocks() -> anyhow::Result<()> {
    let live = Arc::new(AtomicUsize::new(0));
    let resource = resource(
        &live,
        vec![(
            "STATION",
            vec![
                InternalFbDecl::new("subblock1", "CELL"),
                InternalFbDecl::new("gate", "GEN_AND_2_BOOL"),
                InternalFbDecl::new("counter", "FB_CTU_DINT"),
            ],
        )],
    );

    let mut station = resource.create_fb("STATION", "ST1")?;
    assert_eq!(live.load(Ordering::SeqCst), 1);
    assert_eq!(station.core().state(), FbState::Initialized);

    dispatch_event(station.as_mut(), 0)?;
    dispatch_event(station.as_mut(), 0)?;

    let path = [StringId::intern("subblock1"), StringId::intern("x")];
    assert_eq!(station.get_variable(&path), Some(&Value::DInt(2)));
    assert_eq!(resolve_path(station.as_ref(), "gate.OUT"), Some(&Value::Bool(false)));
    assert_eq!(resolve_path(station.as_ref(), "counter.CV"), Some(&Value::DInt(0)));

    assert_eq!(station.get_variable(&[StringId::intern("nope")]), None);
    assert_eq!(resolve_path(station.as_ref(), "subblock1.y"), None);
    assert_eq!(resolve_path(station.as_ref(), "subblock1.x.z"), None);
    assert_eq!(resolve_path(station.as_ref(), "absent_segment_7f3a.x"), None);
    Ok(())
}

#[test]
fn test_sub_blocks_released_with_owner() -> anyhow::Result<()> {
    let live = Arc::new(AtomicUsize::new(0));
    let resource = resource(
        &live,
        vec![(
            "PAIR",
            vec![
                InternalFbDecl::new("left", "CELL"),
                InternalFbDecl::new("right", "CELL"),
            ],
        )],
    );

    let mut pair = resource.create_fb("PAIR", "P1")?;
    assert_eq!(live.load(Ordering::SeqCst), 2);

    // Re-initialization replaces the sub-blocks instead of accumulating them
    pair.initialize(&resource)?;
    assert_eq!(live.load(Ordering::SeqCst), 2);

    drop(pair);
    assert_eq!(live.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn test_standalone_cell_counts() -> anyhow::Result<()> {
    let live = Arc::new(AtomicUsize::new(0));
    let resource = resource(&live, Vec::new());
    let mut cell = resource.create_fb("CELL", "C1")?;
    for _ in 0..3 {
        dispatch_event(cell.as_mut(), 0)?;
    }
    assert_eq!(resolve_path(cell.as_ref(), "x"), Some(&Value::DInt(3)));
    assert!(cell.core().connections().is_empty());

    let mut gate = resource.create_fb("GEN_AND_2_BOOL", "G1")?;
    set_input(gate.as_mut(), 0, true);
    set_input(gate.as_mut(), 1, true);
    dispatch_event(gate.as_mut(), 0)?;
    assert!(output::<bool>(gate.as_ref(), 0));
    Ok(())
}

/// Number of `SubBlockCreation` levels above the innermost cause.
fn creation_chain(err: &FbError) -> (usize, &FbError) {
    let mut levels = 0;
    let mut cause = err;
    while let FbError::SubBlockCreation { source, .. } = cause {
        levels += 1;
        cause = source;
    }
    (levels, cause)
}

#[test]
fn test_self_containing_type_hits_nesting_limit() {
    let live = Arc::new(AtomicUsize::new(0));
    let resource = resource(
        &live,
        vec![(
            "LOOP",
            vec![
                InternalFbDecl::new("cell", "CELL"),
                InternalFbDecl::new("again", "LOOP"),
            ],
        )],
    );

    let err = resource.create_fb("LOOP", "L1").unwrap_err();
    assert!(matches!(err, FbError::SubBlockCreation { index: 1, .. }));
    let (levels, cause) = creation_chain(&err);
    assert_eq!(levels, RuntimeConfig::default().resource.max_nesting_depth);
    assert!(matches!(cause, FbError::Configuration(_)));
    assert_eq!(live.load(Ordering::SeqCst), 0);
}

#[test]
fn test_mutually_containing_types_hit_nesting_limit() {
    let live = Arc::new(AtomicUsize::new(0));
    let resource = resource(
        &live,
        vec![
            ("PING", vec![InternalFbDecl::new("pong", "PONG")]),
            (
                "PONG",
                vec![
                    InternalFbDecl::new("cell", "CELL"),
                    InternalFbDecl::new("ping", "PING"),
                ],
            ),
        ],
    );

    let err = resource.create_fb("PING", "P1").unwrap_err();
    assert!(matches!(err, FbError::SubBlockCreation { index: 0, .. }));
    assert!(matches!(creation_chain(&err).1, FbError::Configuration(_)));
    assert_eq!(live.load(Ordering::SeqCst), 0);
}

#[test]
fn test_nesting_limit_is_configurable() -> anyhow::Result<()> {
    init_tracing();
    let live = Arc::new(AtomicUsize::new(0));
    let composites = || {
        vec![
            ("LEAF", vec![InternalFbDecl::new("cell", "CELL")]),
            ("MIDDLE", vec![InternalFbDecl::new("leaf", "LEAF")]),
            ("TOP", vec![InternalFbDecl::new("middle", "MIDDLE")]),
        ]
    };
    let mut config = RuntimeConfig::default();
    config.resource.max_nesting_depth = 3;
    let resource = Resource::new(registry(&live, composites()), config.clone());

    // TOP.middle.leaf.cell sits exactly at depth 3
    let top = resource.create_fb("TOP", "T1")?;
    assert_eq!(resolve_path(top.as_ref(), "middle.leaf.cell.x"), Some(&Value::DInt(0)));
    drop(top);

    config.resource.max_nesting_depth = 2;
    let shallow = Resource::new(registry(&live, composites()), config);
    let err = shallow.create_fb("TOP", "T2").unwrap_err();
    let (levels, cause) = creation_chain(&err);
    assert_eq!(levels, 2);
    assert!(matches!(cause, FbError::Configuration(_)));
    assert_eq!(live.load(Ordering::SeqCst), 0);
    Ok(())
}
