//! Standard block scenarios.
//!
//! # Acceptance Criteria
//!
//! - `FB_CTU_DINT` with PV=3 stops at CV=3 with Q set after five counts, and
//!   R clears both
//! - A two-input boolean `GEN_AND` follows the AND truth table
//! - Generic gates combine their inputs left to right for every bit kind
//! - A process pin's reading feeds a gate the way a scheduler would wire it

use super::common::{init_tracing, output, registry, resource, set_input};
use fb_common::{FbError, ProcessConfig, RuntimeConfig, StringId, Value};
use fb_core::{dispatch_event, resolve_path, BlockKind, FunctionBlock, Resource};
use fb_process::{
    register_process_types, ProcessInterfaceFb, SharedConnection, SimulatedApi, IX, STATUS_OK,
};
use fb_stdlib::{FbCtuDint, FB_CTU_DINT};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

const CU: usize = 0;
const R: usize = 1;
const PV: usize = 2;
const Q: usize = 0;
const CV: usize = 1;

#[test]
fn test_counter_saturates_at_preset_then_resets() -> anyhow::Result<()> {
    let resource = resource(&Arc::new(AtomicUsize::new(0)), Vec::new());
    let mut ctu = resource.create_fb(FB_CTU_DINT, "COUNTER")?;
    assert_eq!(ctu.kind(), BlockKind::Base);

    set_input(ctu.as_mut(), CU, true);
    set_input(ctu.as_mut(), R, false);
    set_input(ctu.as_mut(), PV, 3i32);
    for _ in 0..5 {
        assert_eq!(
            dispatch_event(ctu.as_mut(), FbCtuDint::EVENT_REQ)?,
            vec![FbCtuDint::EVENT_CNF]
        );
    }
    assert!(output::<bool>(ctu.as_ref(), Q));
    assert_eq!(output::<i32>(ctu.as_ref(), CV), 3);

    set_input(ctu.as_mut(), CU, false);
    set_input(ctu.as_mut(), R, true);
    dispatch_event(ctu.as_mut(), FbCtuDint::EVENT_REQ)?;
    assert!(!output::<bool>(ctu.as_ref(), Q));
    assert_eq!(output::<i32>(ctu.as_ref(), CV), 0);
    Ok(())
}

#[test]
fn test_two_input_and_gate() -> anyhow::Result<()> {
    let resource = resource(&Arc::new(AtomicUsize::new(0)), Vec::new());
    let mut gate = resource.create_fb("GEN_AND_2_BOOL", "AND2")?;
    assert_eq!(gate.kind(), BlockKind::Generic);
    assert_eq!(gate.core().interface().data_inputs().len(), 2);

    for (a, b, expected) in [
        (true, false, false),
        (true, true, true),
        (false, true, false),
        (false, false, false),
    ] {
        set_input(gate.as_mut(), 0, a);
        set_input(gate.as_mut(), 1, b);
        assert_eq!(dispatch_event(gate.as_mut(), 0)?, vec![0]);
        assert_eq!(output::<bool>(gate.as_ref(), 0), expected, "{a} AND {b}");
    }
    Ok(())
}

#[test]
fn test_three_input_gates_fold_left_to_right() -> anyhow::Result<()> {
    let resource = resource(&Arc::new(AtomicUsize::new(0)), Vec::new());

    let mut and = resource.create_fb("GEN_AND_3_DWORD", "AND3")?;
    let mut or = resource.create_fb("GEN_OR_3_DWORD", "OR3")?;
    let mut xor = resource.create_fb("GEN_XOR_3_DWORD", "XOR3")?;
    let inputs = [0xF0F0_00FFu32, 0xFF00_0F0F, 0x0FF0_F00F];

    for gate in [&mut and, &mut or, &mut xor] {
        for (index, value) in inputs.into_iter().enumerate() {
            set_input(gate.as_mut(), index, value);
        }
        dispatch_event(gate.as_mut(), 0)?;
    }

    let [a, b, c] = inputs;
    assert_eq!(output::<u32>(and.as_ref(), 0), a & b & c);
    assert_eq!(output::<u32>(or.as_ref(), 0), a | b | c);
    assert_eq!(output::<u32>(xor.as_ref(), 0), a ^ b ^ c);
    Ok(())
}

#[test]
fn test_gate_output_named_by_configuration() -> anyhow::Result<()> {
    let resource = resource(&Arc::new(AtomicUsize::new(0)), Vec::new());
    let mut gate = resource.create_fb("GEN_OR_4_BYTE", "OR4")?;
    assert_eq!(gate.type_name(), StringId::intern("GEN_OR_4_BYTE"));

    for (index, bit) in [0x01u8, 0x02, 0x04, 0x08].into_iter().enumerate() {
        set_input(gate.as_mut(), index, bit);
    }
    dispatch_event(gate.as_mut(), 0)?;
    assert_eq!(resolve_path(gate.as_ref(), "OUT"), Some(&Value::Byte(0x0F)));
    assert_eq!(resolve_path(gate.as_ref(), "IN4"), Some(&Value::Byte(0x08)));
    Ok(())
}

#[test]
fn test_malformed_gate_configurations() {
    let resource = resource(&Arc::new(AtomicUsize::new(0)), Vec::new());
    for config in ["GEN_AND_0_BOOL", "GEN_AND_two_BOOL", "GEN_AND_2", "GEN_AND_2_LREAL"] {
        assert!(
            matches!(
                resource.create_fb(config, "BAD"),
                Err(FbError::Configuration(_))
            ),
            "{config} should be rejected"
        );
    }
    assert!(matches!(
        resource.create_fb("GEN_NAND_2_BOOL", "BAD"),
        Err(FbError::UnknownType(_))
    ));
}

#[test]
fn test_process_pin_feeds_gate() -> anyhow::Result<()> {
    init_tracing();
    let api = Arc::new(
        SimulatedApi::new()
            .with_symbol("GVL.bDoorClosed", true)
            .with_symbol("GVL.bGuardOk", false),
    );
    let config = RuntimeConfig {
        process: ProcessConfig {
            connect_retries: 0,
            retry_interval: Duration::from_millis(1),
        },
        ..RuntimeConfig::default()
    };
    let connection = Arc::new(SharedConnection::new(api.clone(), config.process.clone()));
    let mut registry = registry(&Arc::new(AtomicUsize::new(0)), Vec::new());
    register_process_types(&mut registry, &connection)?;
    let resource = Resource::new(registry, config);

    let mut door = resource.create_fb(IX, "DOOR")?;
    let mut guard = resource.create_fb(IX, "GUARD")?;
    let mut interlock = resource.create_fb("GEN_AND_2_BOOL", "INTERLOCK")?;

    for (pin, symbol) in [(&mut door, "GVL.bDoorClosed"), (&mut guard, "GVL.bGuardOk")] {
        set_input(pin.as_mut(), 0, true);
        set_input(pin.as_mut(), 1, symbol.to_string());
        dispatch_event(pin.as_mut(), ProcessInterfaceFb::EVENT_INIT)?;
        assert_eq!(
            resolve_path(pin.as_ref(), "STATUS"),
            Some(&Value::String(STATUS_OK.to_string()))
        );
    }

    let mut scan = |door: &mut Box<dyn FunctionBlock>,
                    guard: &mut Box<dyn FunctionBlock>|
     -> anyhow::Result<bool> {
        dispatch_event(door.as_mut(), ProcessInterfaceFb::EVENT_REQ)?;
        dispatch_event(guard.as_mut(), ProcessInterfaceFb::EVENT_REQ)?;
        // Data connections: IX.IN -> IN1 / IN2
        set_input(interlock.as_mut(), 0, output::<bool>(door.as_ref(), 2));
        set_input(interlock.as_mut(), 1, output::<bool>(guard.as_ref(), 2));
        dispatch_event(interlock.as_mut(), 0)?;
        Ok(output::<bool>(interlock.as_ref(), 0))
    };

    assert!(!scan(&mut door, &mut guard)?);
    api.set_symbol("GVL.bGuardOk", true);
    assert!(scan(&mut door, &mut guard)?);
    assert_eq!(api.connect_attempts(), 1);
    Ok(())
}
