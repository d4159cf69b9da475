//! The function block base: buffer ownership, port access, and the
//! execution contract every block kind implements.
//!
//! # Execution contract
//!
//! - [`FunctionBlock::execute_event`] runs synchronously to completion and
//!   is never re-entered; `&mut self` makes overlapping calls on one
//!   instance impossible.
//! - The caller guarantees the data inputs bound to the firing event hold
//!   current values.
//! - The block writes the data outputs bound to an event output before
//!   raising it through the [`EventSink`]. Raised events are reported back
//!   to the caller and never delivered recursively from inside a block.
//!
//! Port accessors do not check indices. Concrete blocks use indices fixed by
//! their own interface; an out-of-range index panics.

use crate::interface::{InterfaceSpec, VarDecl};
use crate::layout::{BufferLayout, ValueBuffer};
use crate::resource::Resource;
use fb_common::{
    EventId, FbError, FbResult, FbState, PortId, PortValue, ResourceConfig, StringDictionary,
    StringId, Value,
};
use static_assertions::{assert_impl_all, assert_obj_safe};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, trace};

/// The closed set of block kinds built on this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Plain block; behavior entirely in `execute_event`.
    Base,
    /// Block with execution-control state, internal variables, and sub-blocks.
    Basic,
    /// Block whose data-input arity is fixed by a configuration string.
    Generic,
    /// Process-interface block bridging to external I/O.
    Adapter,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => write!(f, "BASE"),
            Self::Basic => write!(f, "BASIC"),
            Self::Generic => write!(f, "GENERIC"),
            Self::Adapter => write!(f, "ADAPTER"),
        }
    }
}

/// Event outputs raised during one `execute_event` call, in raise order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSink {
    raised: Vec<EventId>,
}

impl EventSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal event output `event`.
    pub fn send(&mut self, event: EventId) {
        self.raised.push(event);
    }

    /// Events raised so far.
    #[must_use]
    pub fn raised(&self) -> &[EventId] {
        &self.raised
    }

    /// Returns true if nothing was raised.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raised.is_empty()
    }

    /// Consume the sink.
    #[must_use]
    pub fn into_events(self) -> Vec<EventId> {
        self.raised
    }
}

/// State shared by every block kind: interface, names, lifecycle, buffers.
#[derive(Debug)]
pub struct FbCore {
    interface: Arc<InterfaceSpec>,
    type_name: StringId,
    instance_name: StringId,
    state: FbState,
    /// Data inputs followed by data outputs.
    connections: ValueBuffer,
    /// Block-local values (internal variables of basic blocks).
    vars: ValueBuffer,
}

impl FbCore {
    /// Create an unallocated core for an instance of `type_name`.
    #[must_use]
    pub fn new(
        interface: Arc<InterfaceSpec>,
        type_name: StringId,
        instance_name: StringId,
    ) -> Self {
        Self {
            interface,
            type_name,
            instance_name,
            state: FbState::Created,
            connections: ValueBuffer::empty(),
            vars: ValueBuffer::empty(),
        }
    }

    /// Allocate the connection buffer; the variable buffer stays empty.
    ///
    /// # Errors
    ///
    /// See [`FbCore::allocate`].
    pub fn initialize(&mut self, limits: &ResourceConfig) -> FbResult<()> {
        self.allocate(limits, &[])
    }

    /// Allocate the connection buffer from the interface and the variable
    /// buffer from `locals`. Prior contents are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::InvalidStateTransition`] on a failed instance, or a
    /// layout/allocation error; in the latter case the instance becomes failed.
    pub fn allocate(&mut self, limits: &ResourceConfig, locals: &[VarDecl]) -> FbResult<()> {
        if !self.state.can_transition_to(FbState::Initialized) {
            return Err(FbError::InvalidStateTransition {
                from: self.state.to_string(),
                to: FbState::Initialized.to_string(),
            });
        }

        let buffers = BufferLayout::connection(&self.interface)
            .and_then(|layout| ValueBuffer::allocate(layout, limits.max_buffer_bytes))
            .and_then(|connections| {
                let layout = BufferLayout::variables(locals)?;
                let vars = ValueBuffer::allocate(layout, limits.max_buffer_bytes)?;
                Ok((connections, vars))
            });

        match buffers {
            Ok((connections, vars)) => {
                debug!(
                    instance = %self.instance_name,
                    fb_type = %self.type_name,
                    connection_bytes = connections.byte_size(),
                    var_bytes = vars.byte_size(),
                    "Function block buffers allocated"
                );
                self.connections = connections;
                self.vars = vars;
                self.state.transition_to(FbState::Initialized)
            }
            Err(e) => {
                error!(instance = %self.instance_name, error = %e, "Buffer allocation failed");
                self.mark_failed();
                Err(e)
            }
        }
    }

    /// Release buffers and make the instance unusable.
    pub fn mark_failed(&mut self) {
        if self.state.can_transition_to(FbState::Failed) {
            self.state = FbState::Failed;
        }
        self.connections = ValueBuffer::empty();
        self.vars = ValueBuffer::empty();
    }

    /// Interface this instance was laid out from.
    #[must_use]
    pub fn interface(&self) -> &Arc<InterfaceSpec> {
        &self.interface
    }

    /// Replace the interface of an instance that has not been initialized.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::InvalidStateTransition`] once buffers were allocated.
    pub fn replace_interface(&mut self, interface: Arc<InterfaceSpec>) -> FbResult<()> {
        if self.state != FbState::Created {
            return Err(FbError::InvalidStateTransition {
                from: self.state.to_string(),
                to: FbState::Created.to_string(),
            });
        }
        self.interface = interface;
        Ok(())
    }

    /// Type name reported to the resource.
    #[must_use]
    pub fn type_name(&self) -> StringId {
        self.type_name
    }

    pub(crate) fn set_type_name(&mut self, type_name: StringId) {
        self.type_name = type_name;
    }

    /// Instance name.
    #[must_use]
    pub fn instance_name(&self) -> StringId {
        self.instance_name
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> FbState {
        self.state
    }

    /// Connection buffer (data inputs, then data outputs).
    #[must_use]
    pub fn connections(&self) -> &ValueBuffer {
        &self.connections
    }

    /// Variable buffer.
    #[must_use]
    pub fn vars(&self) -> &ValueBuffer {
        &self.vars
    }

    /// Data input `index`. Panics if out of range.
    #[inline]
    #[must_use]
    pub fn data_input(&self, index: PortId) -> &Value {
        self.connections.value(index)
    }

    /// Mutable data input `index`, used by the resource to deliver values.
    #[inline]
    pub fn data_input_mut(&mut self, index: PortId) -> &mut Value {
        self.connections.value_mut(index)
    }

    /// Data output `index`. Panics if out of range.
    #[inline]
    #[must_use]
    pub fn data_output(&self, index: PortId) -> &Value {
        self.connections
            .value(self.interface.data_inputs().len() + index)
    }

    /// Mutable data output `index`.
    #[inline]
    pub fn data_output_mut(&mut self, index: PortId) -> &mut Value {
        let offset = self.interface.data_inputs().len();
        self.connections.value_mut(offset + index)
    }

    /// Read data input `index` as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::KindMismatch`] if the port is not declared as `T`.
    #[inline]
    pub fn input<T: PortValue>(&self, index: PortId) -> FbResult<T> {
        self.data_input(index).get()
    }

    /// Write `value` to data output `index`.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::KindMismatch`] if the port is not declared as `T`.
    #[inline]
    pub fn set_output<T: PortValue>(&mut self, index: PortId, value: T) -> FbResult<()> {
        self.data_output_mut(index).set(value)
    }

    /// Variable `index` in the variable buffer. Panics if out of range.
    #[inline]
    #[must_use]
    pub fn var(&self, index: usize) -> &Value {
        self.vars.value(index)
    }

    /// Mutable variable `index`.
    #[inline]
    pub fn var_mut(&mut self, index: usize) -> &mut Value {
        self.vars.value_mut(index)
    }

    /// Look up a data input or output by name.
    #[must_use]
    pub fn port_variable(&self, name: StringId) -> Option<&Value> {
        if let Some(index) = self.interface.data_input_index(name) {
            return self.connections.get(index);
        }
        self.interface
            .data_output_index(name)
            .and_then(|index| self.connections.get(self.interface.data_inputs().len() + index))
    }
}

assert_impl_all!(FbCore: Send, Sync);

/// A function block instance as seen by the resource.
pub trait FunctionBlock: Send + fmt::Debug {
    /// Which block kind this is.
    fn kind(&self) -> BlockKind;

    /// Shared base state.
    fn core(&self) -> &FbCore;

    /// Mutable shared base state.
    fn core_mut(&mut self) -> &mut FbCore;

    /// Allocate buffers (and sub-blocks, for basic blocks).
    ///
    /// # Errors
    ///
    /// Returns the layout, allocation, or sub-block failure; the instance is
    /// then unusable.
    fn initialize(&mut self, resource: &Resource) -> FbResult<()> {
        self.core_mut().initialize(&resource.config().resource)
    }

    /// React to event input `event`, raising event outputs through `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if a port holds a value of an unexpected kind.
    fn execute_event(&mut self, event: EventId, sink: &mut EventSink) -> FbResult<()>;

    /// Resolve a name path to a value, or `None` if any segment is unknown.
    fn get_variable(&self, path: &[StringId]) -> Option<&Value> {
        match path {
            [name] => self.core().port_variable(*name),
            _ => None,
        }
    }

    /// Type name (the configuration string for generic blocks).
    fn type_name(&self) -> StringId {
        self.core().type_name()
    }

    /// Instance name.
    fn instance_name(&self) -> StringId {
        self.core().instance_name()
    }
}

assert_obj_safe!(FunctionBlock);

/// Deliver event input `event` to `block` and return the raised event outputs.
///
/// # Errors
///
/// Returns [`FbError::NotInitialized`] for an unusable instance,
/// [`FbError::UnknownEvent`] for an out-of-range event, any error of the
/// block itself, and [`FbError::Fault`] if the block raised an event output
/// its interface does not declare.
pub fn dispatch_event(block: &mut dyn FunctionBlock, event: EventId) -> FbResult<Vec<EventId>> {
    let core = block.core();
    let instance = core.instance_name();
    if !core.state().is_usable() {
        return Err(FbError::NotInitialized(instance.to_string()));
    }
    let Some(decl) = core.interface().event_inputs().get(event) else {
        return Err(FbError::UnknownEvent {
            index: event,
            instance: instance.to_string(),
        });
    };
    trace!(instance = %instance, event = %decl.name, "Executing event");

    let mut sink = EventSink::new();
    block.execute_event(event, &mut sink)?;

    let declared = block.core().interface().event_outputs().len();
    if let Some(bad) = sink.raised().iter().find(|&&eo| eo >= declared) {
        return Err(FbError::Fault(format!(
            "{instance} raised undeclared event output #{bad}"
        )));
    }
    Ok(sink.into_events())
}

/// Resolve a dotted path such as `"COUNTER1.CV"` against `block`.
///
/// A segment that was never interned cannot name anything and yields `None`.
#[must_use]
pub fn resolve_path<'a>(block: &'a dyn FunctionBlock, path: &str) -> Option<&'a Value> {
    let dictionary = StringDictionary::global();
    let ids = path
        .split('.')
        .map(|segment| dictionary.lookup(segment))
        .collect::<Option<Vec<_>>>()?;
    block.get_variable(&ids)
}
