//! Interface specifications shared by every instance of a block type.
//!
//! An [`InterfaceSpec`] lists the event inputs/outputs, the data
//! inputs/outputs with their declared kinds, and the WITH bindings that name
//! which data ports belong to which event. It is immutable once built and
//! shared behind an `Arc`.
//!
//! The front end delivers interfaces as an [`InterfaceDescriptor`] (names as
//! text, typically TOML). [`InterfaceBuilder`] offers the same thing in code.

use fb_common::{EventId, FbError, FbResult, PortId, StringDictionary, StringId, ValueKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A named, typed data port or variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarDecl {
    /// Interned name.
    pub name: StringId,
    /// Declared kind.
    pub kind: ValueKind,
}

impl VarDecl {
    /// Declare `name` with `kind`, interning the name.
    pub fn new(name: &str, kind: ValueKind) -> Self {
        Self {
            name: StringId::intern(name),
            kind,
        }
    }
}

/// An event port and the data ports bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDecl {
    /// Interned name.
    pub name: StringId,
    /// For event inputs: data inputs that must be valid when it fires.
    /// For event outputs: data outputs guaranteed valid when it is raised.
    pub with: Vec<PortId>,
}

/// An adapter socket or plug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterDecl {
    /// Instance name of the adapter.
    pub name: StringId,
    /// Adapter type name.
    pub type_name: StringId,
    /// True for a plug, false for a socket.
    pub plug: bool,
}

/// Immutable per-type port metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InterfaceSpec {
    event_inputs: Vec<EventDecl>,
    event_outputs: Vec<EventDecl>,
    data_inputs: Vec<VarDecl>,
    data_outputs: Vec<VarDecl>,
    adapters: Vec<AdapterDecl>,
}

impl InterfaceSpec {
    /// Start building an interface by name.
    #[must_use]
    pub fn builder() -> InterfaceBuilder {
        InterfaceBuilder::default()
    }

    /// Assemble an interface from already-resolved parts.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::InvalidInterface`] if a WITH index is out of range
    /// or a port name is declared twice.
    pub fn new(
        event_inputs: Vec<EventDecl>,
        event_outputs: Vec<EventDecl>,
        data_inputs: Vec<VarDecl>,
        data_outputs: Vec<VarDecl>,
        adapters: Vec<AdapterDecl>,
    ) -> FbResult<Self> {
        let spec = Self {
            event_inputs,
            event_outputs,
            data_inputs,
            data_outputs,
            adapters,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Resolve a front-end descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::InvalidInterface`] if a WITH entry names an unknown
    /// data port, or the resulting interface is inconsistent.
    pub fn from_descriptor(descriptor: &InterfaceDescriptor) -> FbResult<Self> {
        let data_inputs: Vec<VarDecl> = descriptor
            .data_inputs
            .iter()
            .map(|d| VarDecl::new(&d.name, d.kind))
            .collect();
        let data_outputs: Vec<VarDecl> = descriptor
            .data_outputs
            .iter()
            .map(|d| VarDecl::new(&d.name, d.kind))
            .collect();

        let resolve = |events: &[EventDescriptor], ports: &[VarDecl], side: &str| {
            events
                .iter()
                .map(|event| {
                    let with = event
                        .with
                        .iter()
                        .map(|port| {
                            StringDictionary::global()
                                .lookup(port)
                                .and_then(|id| ports.iter().position(|decl| decl.name == id))
                                .ok_or_else(|| {
                                    FbError::InvalidInterface(format!(
                                        "event {} is bound to unknown data {side} {port}",
                                        event.name
                                    ))
                                })
                        })
                        .collect::<FbResult<Vec<_>>>()?;
                    Ok(EventDecl {
                        name: StringId::intern(&event.name),
                        with,
                    })
                })
                .collect::<FbResult<Vec<_>>>()
        };

        let event_inputs = resolve(&descriptor.event_inputs, &data_inputs, "input")?;
        let event_outputs = resolve(&descriptor.event_outputs, &data_outputs, "output")?;
        let adapters = descriptor
            .adapters
            .iter()
            .map(|a| AdapterDecl {
                name: StringId::intern(&a.name),
                type_name: StringId::intern(&a.type_name),
                plug: a.plug,
            })
            .collect();

        Self::new(event_inputs, event_outputs, data_inputs, data_outputs, adapters)
    }

    /// Parse a TOML descriptor and resolve it.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::InvalidInterface`] on malformed TOML or an inconsistent interface.
    pub fn from_toml(content: &str) -> FbResult<Self> {
        let descriptor: InterfaceDescriptor = toml::from_str(content)
            .map_err(|e| FbError::InvalidInterface(format!("malformed descriptor: {e}")))?;
        Self::from_descriptor(&descriptor)
    }

    fn validate(&self) -> FbResult<()> {
        for event in &self.event_inputs {
            if let Some(bad) = event.with.iter().find(|&&i| i >= self.data_inputs.len()) {
                return Err(FbError::InvalidInterface(format!(
                    "event input {} references data input #{bad}",
                    event.name
                )));
            }
        }
        for event in &self.event_outputs {
            if let Some(bad) = event.with.iter().find(|&&i| i >= self.data_outputs.len()) {
                return Err(FbError::InvalidInterface(format!(
                    "event output {} references data output #{bad}",
                    event.name
                )));
            }
        }

        let mut seen = HashSet::new();
        let data_names = self
            .data_inputs
            .iter()
            .chain(&self.data_outputs)
            .map(|d| d.name)
            .chain(self.adapters.iter().map(|a| a.name));
        for name in data_names {
            if !seen.insert(name) {
                return Err(FbError::InvalidInterface(format!(
                    "data port {name} declared twice"
                )));
            }
        }

        let mut seen = HashSet::new();
        for event in self.event_inputs.iter().chain(&self.event_outputs) {
            if !seen.insert(event.name) {
                return Err(FbError::InvalidInterface(format!(
                    "event {} declared twice",
                    event.name
                )));
            }
        }
        Ok(())
    }

    /// Event inputs in declaration order.
    #[must_use]
    pub fn event_inputs(&self) -> &[EventDecl] {
        &self.event_inputs
    }

    /// Event outputs in declaration order.
    #[must_use]
    pub fn event_outputs(&self) -> &[EventDecl] {
        &self.event_outputs
    }

    /// Data inputs in declaration order.
    #[must_use]
    pub fn data_inputs(&self) -> &[VarDecl] {
        &self.data_inputs
    }

    /// Data outputs in declaration order.
    #[must_use]
    pub fn data_outputs(&self) -> &[VarDecl] {
        &self.data_outputs
    }

    /// Adapter sockets and plugs.
    #[must_use]
    pub fn adapters(&self) -> &[AdapterDecl] {
        &self.adapters
    }

    /// Index of the event input called `name`.
    #[must_use]
    pub fn event_input_index(&self, name: StringId) -> Option<EventId> {
        self.event_inputs.iter().position(|e| e.name == name)
    }

    /// Index of the event output called `name`.
    #[must_use]
    pub fn event_output_index(&self, name: StringId) -> Option<EventId> {
        self.event_outputs.iter().position(|e| e.name == name)
    }

    /// Index of the data input called `name`.
    #[must_use]
    pub fn data_input_index(&self, name: StringId) -> Option<PortId> {
        self.data_inputs.iter().position(|d| d.name == name)
    }

    /// Index of the data output called `name`.
    #[must_use]
    pub fn data_output_index(&self, name: StringId) -> Option<PortId> {
        self.data_outputs.iter().position(|d| d.name == name)
    }
}

/// Ordered (name, kind) pairs for the private state of a basic block type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InternalVarsInfo {
    vars: Vec<VarDecl>,
}

impl InternalVarsInfo {
    /// A descriptor without internal variables.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap already-interned declarations.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::InvalidInterface`] if a name is declared twice.
    pub fn new(vars: Vec<VarDecl>) -> FbResult<Self> {
        let mut seen = HashSet::new();
        if let Some(dup) = vars.iter().find(|v| !seen.insert(v.name)) {
            return Err(FbError::InvalidInterface(format!(
                "internal variable {} declared twice",
                dup.name
            )));
        }
        Ok(Self { vars })
    }

    /// Declare variables from `(name, kind)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::InvalidInterface`] if a name is declared twice.
    pub fn from_pairs(pairs: &[(&str, ValueKind)]) -> FbResult<Self> {
        Self::new(pairs.iter().map(|(n, k)| VarDecl::new(n, *k)).collect())
    }

    /// Declarations in order.
    #[must_use]
    pub fn vars(&self) -> &[VarDecl] {
        &self.vars
    }

    /// Number of internal variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns true if the block has no internal variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Index of the variable called `name`.
    #[must_use]
    pub fn index_of(&self, name: StringId) -> Option<usize> {
        self.vars.iter().position(|v| v.name == name)
    }
}

/// Interface as produced by the front end, with names as text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceDescriptor {
    /// Event inputs with their WITH lists (data input names).
    pub event_inputs: Vec<EventDescriptor>,
    /// Event outputs with their WITH lists (data output names).
    pub event_outputs: Vec<EventDescriptor>,
    /// Data inputs.
    pub data_inputs: Vec<VarDescriptor>,
    /// Data outputs.
    pub data_outputs: Vec<VarDescriptor>,
    /// Adapter sockets and plugs.
    pub adapters: Vec<AdapterDescriptor>,
}

/// Textual event declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDescriptor {
    /// Event name.
    pub name: String,
    /// Names of the bound data ports.
    #[serde(default)]
    pub with: Vec<String>,
}

/// Textual data declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDescriptor {
    /// Port name.
    pub name: String,
    /// Declared kind.
    #[serde(rename = "type")]
    pub kind: ValueKind,
}

/// Textual adapter declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterDescriptor {
    /// Adapter instance name.
    pub name: String,
    /// Adapter type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// True for a plug.
    #[serde(default)]
    pub plug: bool,
}

/// Fluent construction of an [`InterfaceSpec`] by port name.
#[derive(Debug, Clone, Default)]
pub struct InterfaceBuilder {
    descriptor: InterfaceDescriptor,
}

impl InterfaceBuilder {
    /// Add an event input bound to the named data inputs.
    #[must_use]
    pub fn event_input(mut self, name: &str, with: &[&str]) -> Self {
        self.descriptor.event_inputs.push(EventDescriptor {
            name: name.to_string(),
            with: with.iter().map(ToString::to_string).collect(),
        });
        self
    }

    /// Add an event output bound to the named data outputs.
    #[must_use]
    pub fn event_output(mut self, name: &str, with: &[&str]) -> Self {
        self.descriptor.event_outputs.push(EventDescriptor {
            name: name.to_string(),
            with: with.iter().map(ToString::to_string).collect(),
        });
        self
    }

    /// Add a data input.
    #[must_use]
    pub fn data_input(mut self, name: &str, kind: ValueKind) -> Self {
        self.descriptor.data_inputs.push(VarDescriptor {
            name: name.to_string(),
            kind,
        });
        self
    }

    /// Add a data output.
    #[must_use]
    pub fn data_output(mut self, name: &str, kind: ValueKind) -> Self {
        self.descriptor.data_outputs.push(VarDescriptor {
            name: name.to_string(),
            kind,
        });
        self
    }

    /// Add an adapter socket (`plug == false`) or plug.
    #[must_use]
    pub fn adapter(mut self, name: &str, type_name: &str, plug: bool) -> Self {
        self.descriptor.adapters.push(AdapterDescriptor {
            name: name.to_string(),
            type_name: type_name.to_string(),
            plug,
        });
        self
    }

    /// Resolve the collected declarations.
    ///
    /// # Errors
    ///
    /// See [`InterfaceSpec::from_descriptor`].
    pub fn build(self) -> FbResult<InterfaceSpec> {
        InterfaceSpec::from_descriptor(&self.descriptor)
    }
}
