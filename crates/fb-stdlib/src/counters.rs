//! Counter function blocks.
//!
//! - [`FbCtuDint`] - `FB_CTU_DINT`, the IEC 61131-3 up counter driven by one REQ event
//! - [`ECtu`] - `E_CTU`, the IEC 61499 event-driven up counter

use fb_common::{EventId, FbResult, StringId, Value, ValueKind};
use fb_core::{
    BasicFb, BlockKind, EccState, EventSink, FbCore, FunctionBlock, InterfaceSpec,
    InternalVarsInfo, Resource,
};
use std::sync::Arc;

/// Registered type name of [`FbCtuDint`].
pub const FB_CTU_DINT: &str = "FB_CTU_DINT";
/// Registered type name of [`ECtu`].
pub const E_CTU: &str = "E_CTU";

/// Counter Up over DINT (`FB_CTU_DINT`).
///
/// # Interface
///
/// ```text
/// EVENT_INPUT   REQ WITH CU, R, PV
/// EVENT_OUTPUT  CNF WITH Q, CV
/// VAR_INPUT     CU : BOOL;  R : BOOL;  PV : DINT;
/// VAR_OUTPUT    Q : BOOL;   CV : DINT;
/// ```
///
/// On REQ, R clears CV. Otherwise CU counts CV up while it is below PV, so
/// the count stops at the preset. Q is `CV >= PV`.
#[derive(Debug)]
pub struct FbCtuDint {
    core: FbCore,
}

impl FbCtuDint {
    /// Event input REQ.
    pub const EVENT_REQ: EventId = 0;
    /// Event output CNF.
    pub const EVENT_CNF: EventId = 0;

    const IN_CU: usize = 0;
    const IN_R: usize = 1;
    const IN_PV: usize = 2;
    const OUT_Q: usize = 0;
    const OUT_CV: usize = 1;

    /// The shared interface of every instance.
    ///
    /// # Errors
    ///
    /// Returns [`fb_common::FbError::InvalidInterface`] only if the
    /// declaration below is inconsistent.
    pub fn interface() -> FbResult<InterfaceSpec> {
        InterfaceSpec::builder()
            .event_input("REQ", &["CU", "R", "PV"])
            .event_output("CNF", &["Q", "CV"])
            .data_input("CU", ValueKind::Bool)
            .data_input("R", ValueKind::Bool)
            .data_input("PV", ValueKind::DInt)
            .data_output("Q", ValueKind::Bool)
            .data_output("CV", ValueKind::DInt)
            .build()
    }

    /// Create an uninitialized instance.
    #[must_use]
    pub fn new(interface: Arc<InterfaceSpec>, instance_name: StringId) -> Self {
        Self {
            core: FbCore::new(interface, StringId::intern(FB_CTU_DINT), instance_name),
        }
    }
}

impl FunctionBlock for FbCtuDint {
    fn kind(&self) -> BlockKind {
        BlockKind::Base
    }

    fn core(&self) -> &FbCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FbCore {
        &mut self.core
    }

    fn execute_event(&mut self, event: EventId, sink: &mut EventSink) -> FbResult<()> {
        if event != Self::EVENT_REQ {
            return Ok(());
        }

        let cu: bool = self.core.input(Self::IN_CU)?;
        let r: bool = self.core.input(Self::IN_R)?;
        let pv: i32 = self.core.input(Self::IN_PV)?;
        let mut cv: i32 = self.core.data_output(Self::OUT_CV).get()?;

        if r {
            // Reset takes priority
            cv = 0;
        } else if cu && cv < pv {
            cv += 1;
        }

        self.core.set_output(Self::OUT_Q, cv >= pv)?;
        self.core.set_output(Self::OUT_CV, cv)?;
        sink.send(Self::EVENT_CNF);
        Ok(())
    }
}

/// Event-driven Counter Up (`E_CTU`).
///
/// # Interface
///
/// ```text
/// EVENT_INPUT   CU WITH PV;  R
/// EVENT_OUTPUT  CUO WITH Q, CV;  RO WITH Q, CV
/// VAR_INPUT     PV : UINT;
/// VAR_OUTPUT    Q : BOOL;  CV : UINT;
/// ```
///
/// # Execution control
///
/// ```text
/// START --CU [CV < 65535]--> CU --> START   (CV := CV + 1; Q := CV >= PV; CUO)
/// START --R----------------> R  --> START   (CV := 0; Q := FALSE; RO)
/// ```
#[derive(Debug)]
pub struct ECtu {
    basic: BasicFb,
}

impl ECtu {
    /// Event input CU.
    pub const EVENT_CU: EventId = 0;
    /// Event input R.
    pub const EVENT_R: EventId = 1;
    /// Event output CUO.
    pub const EVENT_CUO: EventId = 0;
    /// Event output RO.
    pub const EVENT_RO: EventId = 1;

    /// Chart state START.
    pub const STATE_START: EccState = EccState::INITIAL;
    /// Chart state CU.
    pub const STATE_CU: EccState = EccState(1);
    /// Chart state R.
    pub const STATE_R: EccState = EccState(2);

    const IN_PV: usize = 0;
    const OUT_Q: usize = 0;
    const OUT_CV: usize = 1;

    /// The shared interface of every instance.
    ///
    /// # Errors
    ///
    /// Returns [`fb_common::FbError::InvalidInterface`] only if the
    /// declaration below is inconsistent.
    pub fn interface() -> FbResult<InterfaceSpec> {
        InterfaceSpec::builder()
            .event_input("CU", &["PV"])
            .event_input("R", &[])
            .event_output("CUO", &["Q", "CV"])
            .event_output("RO", &["Q", "CV"])
            .data_input("PV", ValueKind::UInt)
            .data_output("Q", ValueKind::Bool)
            .data_output("CV", ValueKind::UInt)
            .build()
    }

    /// Create an uninitialized instance.
    #[must_use]
    pub fn new(
        interface: Arc<InterfaceSpec>,
        internals: Arc<InternalVarsInfo>,
        instance_name: StringId,
    ) -> Self {
        Self {
            basic: BasicFb::new(interface, StringId::intern(E_CTU), instance_name, internals),
        }
    }

    /// Current chart state.
    #[must_use]
    pub fn ecc_state(&self) -> EccState {
        self.basic.ecc_state()
    }

    fn enter(&mut self, state: EccState, cv: u16, sink: &mut EventSink) -> FbResult<()> {
        self.basic.set_ecc_state(state);
        let core = self.basic.core_mut();
        let pv: u16 = core.input(Self::IN_PV)?;
        core.set_output(Self::OUT_CV, cv)?;
        core.set_output(Self::OUT_Q, state == Self::STATE_CU && cv >= pv)?;
        sink.send(if state == Self::STATE_CU {
            Self::EVENT_CUO
        } else {
            Self::EVENT_RO
        });
        // Both action states fall through to START unconditionally
        self.basic.set_ecc_state(Self::STATE_START);
        Ok(())
    }
}

impl FunctionBlock for ECtu {
    fn kind(&self) -> BlockKind {
        BlockKind::Basic
    }

    fn core(&self) -> &FbCore {
        self.basic.core()
    }

    fn core_mut(&mut self) -> &mut FbCore {
        self.basic.core_mut()
    }

    fn initialize(&mut self, resource: &Resource) -> FbResult<()> {
        self.basic.initialize(resource)
    }

    fn execute_event(&mut self, event: EventId, sink: &mut EventSink) -> FbResult<()> {
        let cv: u16 = self.basic.core().data_output(Self::OUT_CV).get()?;
        match (self.basic.ecc_state(), event) {
            (Self::STATE_START, Self::EVENT_CU) if cv < u16::MAX => {
                self.enter(Self::STATE_CU, cv + 1, sink)
            }
            (Self::STATE_START, Self::EVENT_R) => self.enter(Self::STATE_R, 0, sink),
            _ => Ok(()),
        }
    }

    fn get_variable(&self, path: &[StringId]) -> Option<&Value> {
        self.basic.get_variable(path)
    }
}
