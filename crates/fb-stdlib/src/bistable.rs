//! Event-driven bistable (`E_SR`).
//!
//! ```text
//! EVENT_INPUT   S;  R
//! EVENT_OUTPUT  EO WITH Q
//! VAR_OUTPUT    Q : BOOL;
//! ```
//!
//! The chart remembers the last accepted edge, so repeated S (or R) events
//! produce no output until the opposite event arrives:
//!
//! ```text
//! START --S--> SET    (Q := TRUE;  EO)
//! SET   --R--> RESET  (Q := FALSE; EO)
//! RESET --S--> SET    (Q := TRUE;  EO)
//! ```

use fb_common::{EventId, FbResult, StringId, Value, ValueKind};
use fb_core::{
    BasicFb, BlockKind, EccState, EventSink, FbCore, FunctionBlock, InterfaceSpec,
    InternalVarsInfo, Resource,
};
use std::sync::Arc;

/// Registered type name of [`ESr`].
pub const E_SR: &str = "E_SR";

/// Event-driven set/reset flip-flop.
#[derive(Debug)]
pub struct ESr {
    basic: BasicFb,
}

impl ESr {
    /// Event input S.
    pub const EVENT_S: EventId = 0;
    /// Event input R.
    pub const EVENT_R: EventId = 1;
    /// Event output EO.
    pub const EVENT_EO: EventId = 0;

    /// Chart state START.
    pub const STATE_START: EccState = EccState::INITIAL;
    /// Chart state SET.
    pub const STATE_SET: EccState = EccState(1);
    /// Chart state RESET.
    pub const STATE_RESET: EccState = EccState(2);

    const OUT_Q: usize = 0;

    /// The shared interface of every instance.
    ///
    /// # Errors
    ///
    /// Returns [`fb_common::FbError::InvalidInterface`] only if the
    /// declaration below is inconsistent.
    pub fn interface() -> FbResult<InterfaceSpec> {
        InterfaceSpec::builder()
            .event_input("S", &[])
            .event_input("R", &[])
            .event_output("EO", &["Q"])
            .data_output("Q", ValueKind::Bool)
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
            basic: BasicFb::new(interface, StringId::intern(E_SR), instance_name, internals),
        }
    }

    /// Current chart state.
    #[must_use]
    pub fn ecc_state(&self) -> EccState {
        self.basic.ecc_state()
    }
}

impl FunctionBlock for ESr {
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
        let next = match (self.basic.ecc_state(), event) {
            (Self::STATE_START | Self::STATE_RESET, Self::EVENT_S) => Self::STATE_SET,
            (Self::STATE_SET, Self::EVENT_R) => Self::STATE_RESET,
            _ => return Ok(()),
        };

        self.basic
            .core_mut()
            .set_output(Self::OUT_Q, next == Self::STATE_SET)?;
        self.basic.set_ecc_state(next);
        sink.send(Self::EVENT_EO);
        Ok(())
    }

    fn get_variable(&self, path: &[StringId]) -> Option<&Value> {
        self.basic.get_variable(path)
    }
}
