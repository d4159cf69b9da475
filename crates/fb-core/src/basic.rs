//! Basic function blocks: execution-control state, internal variables, and
//! owned internal sub-blocks.
//!
//! Concrete basic blocks embed a [`BasicFb`] and drive their own
//! execution-control chart from `execute_event`; this layer only keeps the
//! state id across events. Internal variables live in the core's variable
//! buffer, one slot per [`InternalVarsInfo`] entry, and the slot index is the
//! handle used by [`BasicFb::var_internal`].

use crate::block::{FbCore, FunctionBlock};
use crate::interface::{InterfaceSpec, InternalVarsInfo};
use crate::layout::BufferLayout;
use crate::resource::Resource;
use fb_common::{FbError, FbResult, StringId, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Current state of an execution-control chart. State 0 is the initial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EccState(pub u16);

impl EccState {
    /// The initial state of every chart.
    pub const INITIAL: EccState = EccState(0);
}

impl fmt::Display for EccState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state {}", self.0)
    }
}

/// Type and instance name of one internal sub-block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalFbDecl {
    /// Instance name inside the owning block.
    pub instance_name: StringId,
    /// Registered type name, or a generic configuration string.
    pub type_name: String,
}

impl InternalFbDecl {
    /// Declare sub-block `instance_name` of `type_name`.
    pub fn new(instance_name: &str, type_name: &str) -> Self {
        Self {
            instance_name: StringId::intern(instance_name),
            type_name: type_name.to_string(),
        }
    }
}

/// An owned internal sub-block.
#[derive(Debug)]
pub struct InternalFb {
    name: StringId,
    block: Box<dyn FunctionBlock>,
}

impl InternalFb {
    /// Instance name inside the owner.
    #[must_use]
    pub fn name(&self) -> StringId {
        self.name
    }

    /// The sub-block.
    #[must_use]
    pub fn block(&self) -> &dyn FunctionBlock {
        self.block.as_ref()
    }

    /// The sub-block, mutably.
    pub fn block_mut(&mut self) -> &mut dyn FunctionBlock {
        self.block.as_mut()
    }
}

/// Shared state of a basic function block.
#[derive(Debug)]
pub struct BasicFb {
    core: FbCore,
    ecc_state: EccState,
    internals: Arc<InternalVarsInfo>,
    internal_fb_decls: Arc<[InternalFbDecl]>,
    internal_fbs: Vec<InternalFb>,
}

impl BasicFb {
    /// Create an unallocated basic block.
    #[must_use]
    pub fn new(
        interface: Arc<InterfaceSpec>,
        type_name: StringId,
        instance_name: StringId,
        internals: Arc<InternalVarsInfo>,
    ) -> Self {
        Self {
            core: FbCore::new(interface, type_name, instance_name),
            ecc_state: EccState::INITIAL,
            internals,
            internal_fb_decls: Arc::from(Vec::new()),
            internal_fbs: Vec::new(),
        }
    }

    /// Declare the internal sub-blocks created at initialization.
    #[must_use]
    pub fn with_internal_fbs(mut self, decls: Arc<[InternalFbDecl]>) -> Self {
        self.internal_fb_decls = decls;
        self
    }

    /// Bytes needed for the internal variables of `info`.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::Layout`] if the total size overflows.
    pub fn calculate_vars_size(info: &InternalVarsInfo) -> FbResult<usize> {
        BufferLayout::variables(info.vars()).map(|layout| layout.size())
    }

    /// Allocate buffers and internal variables, then create the internal sub-blocks.
    ///
    /// Sub-blocks of a previous initialization are destroyed first. The
    /// chart returns to [`EccState::INITIAL`].
    ///
    /// # Errors
    ///
    /// Returns the allocation failure or [`FbError::SubBlockCreation`]; no
    /// sub-block survives a failed call.
    pub fn initialize(&mut self, resource: &Resource) -> FbResult<()> {
        Self::delete_internal_fbs(std::mem::take(&mut self.internal_fbs));
        self.ecc_state = EccState::INITIAL;

        self.core
            .allocate(&resource.config().resource, self.internals.vars())?;

        match Self::create_internal_fbs(&self.internal_fb_decls, resource) {
            Ok(created) => {
                debug!(
                    instance = %self.core.instance_name(),
                    internal_vars = self.internals.len(),
                    internal_fbs = created.len(),
                    "Basic function block initialized"
                );
                self.internal_fbs = created;
                Ok(())
            }
            Err(e) => {
                self.core.mark_failed();
                Err(e)
            }
        }
    }

    /// Create one initialized instance per declaration.
    ///
    /// Either every entry is created or none survives: on the first failure
    /// all instances created so far in this batch are destroyed.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::SubBlockCreation`] naming the failing entry,
    /// [`FbError::Allocation`] if the batch exceeds the resource limit, or
    /// [`FbError::Configuration`] if the sub-blocks would sit deeper than
    /// `max_nesting_depth`.
    pub fn create_internal_fbs(
        decls: &[InternalFbDecl],
        resource: &Resource,
    ) -> FbResult<Vec<InternalFb>> {
        let limit = resource.config().resource.max_internal_fbs;
        if decls.len() > limit {
            return Err(FbError::Allocation {
                bytes: decls.len() * std::mem::size_of::<InternalFb>(),
                limit: limit * std::mem::size_of::<InternalFb>(),
            });
        }

        if decls.is_empty() {
            return Ok(Vec::new());
        }
        let nested = resource.nested()?;

        let mut created: Vec<InternalFb> = Vec::new();
        created
            .try_reserve_exact(decls.len())
            .map_err(|_| FbError::Allocation {
                bytes: decls.len() * std::mem::size_of::<InternalFb>(),
                limit: limit * std::mem::size_of::<InternalFb>(),
            })?;

        for (index, decl) in decls.iter().enumerate() {
            match nested.create_fb_named(&decl.type_name, decl.instance_name) {
                Ok(block) => created.push(InternalFb {
                    name: decl.instance_name,
                    block,
                }),
                Err(source) => {
                    error!(
                        index,
                        instance = %decl.instance_name,
                        fb_type = %decl.type_name,
                        error = %source,
                        "Internal block creation failed, releasing batch"
                    );
                    Self::delete_internal_fbs(created);
                    return Err(FbError::SubBlockCreation {
                        index,
                        instance: decl.instance_name.to_string(),
                        source: Box::new(source),
                    });
                }
            }
        }
        Ok(created)
    }

    /// Destroy sub-blocks, newest first.
    pub fn delete_internal_fbs(mut blocks: Vec<InternalFb>) {
        while let Some(block) = blocks.pop() {
            trace!(instance = %block.name, "Destroying internal block");
            drop(block);
        }
    }

    /// Shared base state.
    #[must_use]
    pub fn core(&self) -> &FbCore {
        &self.core
    }

    /// Mutable shared base state.
    pub fn core_mut(&mut self) -> &mut FbCore {
        &mut self.core
    }

    /// Current chart state.
    #[must_use]
    pub fn ecc_state(&self) -> EccState {
        self.ecc_state
    }

    /// Move the chart to `state`.
    pub fn set_ecc_state(&mut self, state: EccState) {
        if state != self.ecc_state {
            trace!(
                instance = %self.core.instance_name(),
                from = self.ecc_state.0,
                to = state.0,
                "ECC transition"
            );
        }
        self.ecc_state = state;
    }

    /// Internal variable descriptor.
    #[must_use]
    pub fn internals(&self) -> &InternalVarsInfo {
        &self.internals
    }

    /// Internal variable `index`. Panics if out of range.
    #[inline]
    #[must_use]
    pub fn var_internal(&self, index: usize) -> &Value {
        self.core.var(index)
    }

    /// Mutable internal variable `index`. Panics if out of range.
    #[inline]
    pub fn var_internal_mut(&mut self, index: usize) -> &mut Value {
        self.core.var_mut(index)
    }

    /// Internal variable called `name`.
    #[must_use]
    pub fn internal_var(&self, name: StringId) -> Option<&Value> {
        self.internals
            .index_of(name)
            .and_then(|index| self.core.vars().get(index))
    }

    /// Owned sub-blocks in creation order.
    #[must_use]
    pub fn internal_fbs(&self) -> &[InternalFb] {
        &self.internal_fbs
    }

    /// Sub-block called `name`.
    #[must_use]
    pub fn internal_fb(&self, name: StringId) -> Option<&dyn FunctionBlock> {
        self.internal_fbs
            .iter()
            .find(|fb| fb.name == name)
            .map(InternalFb::block)
    }

    /// Sub-block called `name`, mutably.
    pub fn internal_fb_mut(&mut self, name: StringId) -> Option<&mut dyn FunctionBlock> {
        self.internal_fbs
            .iter_mut()
            .find(|fb| fb.name == name)
            .map(InternalFb::block_mut)
    }

    /// Resolve internal variables first, then ports, then descend into sub-blocks.
    #[must_use]
    pub fn get_variable(&self, path: &[StringId]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;

        if self.internals.index_of(*first).is_some() {
            return if rest.is_empty() {
                self.internal_var(*first)
            } else {
                None
            };
        }
        if rest.is_empty() {
            if let Some(value) = self.core.port_variable(*first) {
                return Some(value);
            }
        }
        self.internal_fb(*first)
            .and_then(|block| block.get_variable(rest))
    }
}

impl Drop for BasicFb {
    fn drop(&mut self) {
        // Sub-blocks go before the owner's buffers.
        Self::delete_internal_fbs(std::mem::take(&mut self.internal_fbs));
    }
}
