//! Boolean process pins `IX` (input) and `QX` (output).
//!
//! ```text
//! IX  EVENT_INPUT   INIT WITH QI, PARAMS;  REQ WITH QI
//!     EVENT_OUTPUT  INITO WITH QO, STATUS;  CNF WITH QO, STATUS, IN
//!     VAR_INPUT     QI : BOOL;  PARAMS : STRING;
//!     VAR_OUTPUT    QO : BOOL;  STATUS : STRING;  IN : BOOL;
//!
//! QX  EVENT_INPUT   INIT WITH QI, PARAMS;  REQ WITH QI, OUT
//!     EVENT_OUTPUT  INITO WITH QO, STATUS;  CNF WITH QO, STATUS
//!     VAR_INPUT     QI : BOOL;  PARAMS : STRING;  OUT : BOOL;
//!     VAR_OUTPUT    QO : BOOL;  STATUS : STRING;
//! ```
//!
//! PARAMS names the controller variable. INIT with QI set binds the pin and
//! opens the shared connection; INIT with QI cleared releases it. Every
//! operation reports its outcome through STATUS.

use crate::api::encode_symbol;
use crate::connection::SharedConnection;
use fb_common::{EventId, FbResult, StringId, Value, ValueKind};
use fb_core::{BlockKind, EventSink, FbCore, FunctionBlock, InterfaceSpec};
use std::sync::Arc;
use tracing::{debug, error};

/// The operation succeeded.
pub const STATUS_OK: &str = "OK";
/// The shared controller connection could not be opened.
pub const STATUS_API_NOT_INITIALISED: &str = "API not initialized";
/// The pin has no usable variable binding.
pub const STATUS_FB_NOT_INITIALISED: &str = "FB not initialized";
/// The controller rejected the call.
pub const STATUS_CALL_FAILED: &str = "Call to API Failed";

/// Registered type name of the input pin.
pub const IX: &str = "IX";
/// Registered type name of the output pin.
pub const QX: &str = "QX";

/// The contract the resource drives an I/O collaborator through.
///
/// Each call returns whether it succeeded and leaves the specific outcome in
/// [`ProcessInterface::status`].
pub trait ProcessInterface {
    /// Bind the pin. `is_input` selects read or write direction.
    fn initialise(&mut self, is_input: bool) -> bool;
    /// Release the binding.
    fn deinitialise(&mut self) -> bool;
    /// Read the bound variable into the pin's IN output.
    fn read_pin(&mut self) -> bool;
    /// Write the pin's OUT input to the bound variable.
    fn write_pin(&mut self) -> bool;
    /// Outcome of the last call.
    fn status(&self) -> &str;
}

/// Direction of a process pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinDirection {
    /// Reads the controller (`IX`).
    Input,
    /// Writes the controller (`QX`).
    Output,
}

impl PinDirection {
    /// Registered type name for this direction.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Input => IX,
            Self::Output => QX,
        }
    }

    /// Interface shared by every pin of this direction.
    ///
    /// # Errors
    ///
    /// Returns [`fb_common::FbError::InvalidInterface`] only if the
    /// declaration below is inconsistent.
    pub fn interface(self) -> FbResult<InterfaceSpec> {
        let builder = InterfaceSpec::builder()
            .event_input("INIT", &["QI", "PARAMS"])
            .event_output("INITO", &["QO", "STATUS"])
            .data_input("QI", ValueKind::Bool)
            .data_input("PARAMS", ValueKind::String)
            .data_output("QO", ValueKind::Bool)
            .data_output("STATUS", ValueKind::String);
        match self {
            Self::Input => builder
                .event_input("REQ", &["QI"])
                .event_output("CNF", &["QO", "STATUS", "IN"])
                .data_output("IN", ValueKind::Bool),
            Self::Output => builder
                .event_input("REQ", &["QI", "OUT"])
                .event_output("CNF", &["QO", "STATUS"])
                .data_input("OUT", ValueKind::Bool),
        }
        .build()
    }
}

/// A boolean pin bound to one controller variable.
#[derive(Debug)]
pub struct ProcessInterfaceFb {
    core: FbCore,
    direction: PinDirection,
    connection: Arc<SharedConnection>,
    symbol: Option<Vec<u16>>,
}

impl ProcessInterfaceFb {
    /// Event input INIT.
    pub const EVENT_INIT: EventId = 0;
    /// Event input REQ.
    pub const EVENT_REQ: EventId = 1;
    /// Event output INITO.
    pub const EVENT_INITO: EventId = 0;
    /// Event output CNF.
    pub const EVENT_CNF: EventId = 1;

    const IN_QI: usize = 0;
    const IN_PARAMS: usize = 1;
    const IN_OUT: usize = 2;
    const OUT_QO: usize = 0;
    const OUT_STATUS: usize = 1;
    const OUT_IN: usize = 2;

    /// Create an uninitialized pin sharing `connection`.
    #[must_use]
    pub fn new(
        direction: PinDirection,
        interface: Arc<InterfaceSpec>,
        connection: Arc<SharedConnection>,
        instance_name: StringId,
    ) -> Self {
        Self {
            core: FbCore::new(
                interface,
                StringId::intern(direction.type_name()),
                instance_name,
            ),
            direction,
            connection,
            symbol: None,
        }
    }

    /// Pin direction.
    #[must_use]
    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    /// Returns true while a variable is bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.symbol.is_some()
    }

    fn set_status(&mut self, status: &str) {
        *self.core.data_output_mut(Self::OUT_STATUS) = Value::String(status.to_string());
    }

    fn set_qo(&mut self, qo: bool) {
        *self.core.data_output_mut(Self::OUT_QO) = Value::Bool(qo);
    }

    fn flag(&self, index: usize) -> bool {
        matches!(self.core.data_input(index), Value::Bool(true))
    }
}

impl ProcessInterface for ProcessInterfaceFb {
    fn initialise(&mut self, is_input: bool) -> bool {
        if !self.core.state().is_usable() {
            return false;
        }
        if !self.connection.ensure_connected() {
            error!(instance = %self.core.instance_name(), "Couldn't initialize API");
            self.set_status(STATUS_API_NOT_INITIALISED);
            return false;
        }

        let symbol = match self.core.data_input(Self::IN_PARAMS) {
            Value::String(params) if !params.is_empty() => Some(encode_symbol(params)),
            _ => None,
        };
        let Some(symbol) = symbol else {
            error!(instance = %self.core.instance_name(), "PARAMS does not name a variable");
            self.symbol = None;
            self.set_status(STATUS_FB_NOT_INITIALISED);
            return false;
        };
        debug!(
            instance = %self.core.instance_name(),
            is_input,
            symbol = %String::from_utf16_lossy(&symbol),
            "Process pin bound"
        );
        self.symbol = Some(symbol);
        self.set_status(STATUS_OK);
        true
    }

    fn deinitialise(&mut self) -> bool {
        self.symbol = None;
        true
    }

    fn read_pin(&mut self) -> bool {
        if !self.core.state().is_usable() {
            return false;
        }
        let Some(symbol) = self.symbol.as_deref() else {
            self.set_status(STATUS_FB_NOT_INITIALISED);
            return false;
        };
        let result = self
            .connection
            .with_api(|api, handle| api.read_bool(handle, symbol));
        match result {
            Some(Ok(value)) => {
                if self.direction == PinDirection::Input {
                    *self.core.data_output_mut(Self::OUT_IN) = Value::Bool(value);
                }
                self.set_status(STATUS_OK);
                true
            }
            Some(Err(e)) => {
                error!(instance = %self.core.instance_name(), error = %e, "Failed to read");
                self.set_status(STATUS_CALL_FAILED);
                false
            }
            None => {
                error!(
                    instance = %self.core.instance_name(),
                    "Cannot read pin, the API is not initialized"
                );
                self.set_status(STATUS_API_NOT_INITIALISED);
                false
            }
        }
    }

    fn write_pin(&mut self) -> bool {
        if !self.core.state().is_usable() {
            return false;
        }
        let Some(symbol) = self.symbol.as_deref() else {
            self.set_status(STATUS_FB_NOT_INITIALISED);
            return false;
        };
        let value = self.direction == PinDirection::Output && self.flag(Self::IN_OUT);
        let result = self
            .connection
            .with_api(|api, handle| api.write_bool(handle, symbol, value));
        match result {
            Some(Ok(())) => {
                self.set_status(STATUS_OK);
                true
            }
            Some(Err(e)) => {
                error!(instance = %self.core.instance_name(), error = %e, "Failed to write");
                self.set_status(STATUS_CALL_FAILED);
                false
            }
            None => {
                error!(
                    instance = %self.core.instance_name(),
                    "Cannot write pin, the API is not initialized"
                );
                self.set_status(STATUS_API_NOT_INITIALISED);
                false
            }
        }
    }

    fn status(&self) -> &str {
        let slot = self.core.interface().data_inputs().len() + Self::OUT_STATUS;
        match self.core.connections().get(slot) {
            Some(Value::String(status)) => status.as_str(),
            _ => "",
        }
    }
}

impl FunctionBlock for ProcessInterfaceFb {
    fn kind(&self) -> BlockKind {
        BlockKind::Adapter
    }

    fn core(&self) -> &FbCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FbCore {
        &mut self.core
    }

    fn execute_event(&mut self, event: EventId, sink: &mut EventSink) -> FbResult<()> {
        let qi = self.flag(Self::IN_QI);
        match event {
            Self::EVENT_INIT => {
                let qo = if qi {
                    self.initialise(self.direction == PinDirection::Input)
                } else {
                    self.deinitialise()
                };
                self.set_qo(qo);
                sink.send(Self::EVENT_INITO);
            }
            Self::EVENT_REQ => {
                let qo = qi
                    && match self.direction {
                        PinDirection::Input => self.read_pin(),
                        PinDirection::Output => self.write_pin(),
                    };
                self.set_qo(qo);
                sink.send(Self::EVENT_CNF);
            }
            _ => {}
        }
        Ok(())
    }
}
