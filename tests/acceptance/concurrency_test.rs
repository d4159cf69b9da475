//! Concurrent event delivery.
//!
//! # Acceptance Criteria
//!
//! - Events sent to one shared instance from many threads never interleave
//! - Distinct instances run independently on separate threads

use super::common::{resource, set_input};
use fb_common::Value;
use fb_core::{resolve_path, InternalFbDecl, SharedInstance};
use fb_stdlib::{FbCtuDint, FB_CTU_DINT};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

const THREADS: usize = 8;
const EVENTS_PER_THREAD: usize = 50;

#[test]
fn test_shared_counter_counts_every_event() -> anyhow::Result<()> {
    let resource = resource(&Arc::new(AtomicUsize::new(0)), Vec::new());
    let mut ctu = resource.create_fb(FB_CTU_DINT, "SHARED_CTU")?;
    set_input(ctu.as_mut(), 0, true);
    set_input(ctu.as_mut(), 2, i32::MAX);
    let shared = SharedInstance::new(ctu);

    crossbeam_utils::thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|_| {
                for _ in 0..EVENTS_PER_THREAD {
                    shared.execute_event(FbCtuDint::EVENT_REQ).unwrap();
                }
            });
        }
    })
    .expect("worker thread panicked");

    let expected = i32::try_from(THREADS * EVENTS_PER_THREAD)?;
    let cv = shared.with_block(|block| resolve_path(block, "CV").cloned())?;
    assert_eq!(cv, Some(Value::DInt(expected)));
    Ok(())
}

#[test]
fn test_shared_composite_updates_all_sub_blocks() -> anyhow::Result<()> {
    let live = Arc::new(AtomicUsize::new(0));
    let resource = resource(
        &live,
        vec![(
            "LINE",
            vec![
                InternalFbDecl::new("first", "CELL"),
                InternalFbDecl::new("second", "CELL"),
            ],
        )],
    );
    let shared = SharedInstance::new(resource.create_fb("LINE", "LINE1")?);

    crossbeam_utils::thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|_| {
                for _ in 0..EVENTS_PER_THREAD {
                    shared.execute_event(0).unwrap();
                }
            });
        }
    })
    .expect("worker thread panicked");

    let expected = Value::DInt(i32::try_from(THREADS * EVENTS_PER_THREAD)?);
    let (first, second) = shared.with_block(|block| {
        (
            resolve_path(block, "first.x").cloned(),
            resolve_path(block, "second.x").cloned(),
        )
    })?;
    assert_eq!(first.as_ref(), Some(&expected));
    assert_eq!(second.as_ref(), Some(&expected));

    drop(shared.into_inner()?);
    assert_eq!(live.load(std::sync::atomic::Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn test_independent_instances_on_separate_threads() -> anyhow::Result<()> {
    let resource = resource(&Arc::new(AtomicUsize::new(0)), Vec::new());
    let mut gates = (0..THREADS)
        .map(|i| resource.create_fb("GEN_XOR_2_WORD", &format!("XOR{i}")))
        .collect::<Result<Vec<_>, _>>()?;

    crossbeam_utils::thread::scope(|scope| {
        for (i, gate) in gates.iter_mut().enumerate() {
            scope.spawn(move |_| {
                let seed = u16::try_from(i).unwrap();
                set_input(gate.as_mut(), 0, seed);
                set_input(gate.as_mut(), 1, 0xFF00u16);
                fb_core::dispatch_event(gate.as_mut(), 0).unwrap();
            });
        }
    })
    .expect("worker thread panicked");

    for (i, gate) in gates.iter().enumerate() {
        let seed = u16::try_from(i)?;
        assert_eq!(
            resolve_path(gate.as_ref(), "OUT"),
            Some(&Value::Word(seed ^ 0xFF00))
        );
    }
    Ok(())
}
