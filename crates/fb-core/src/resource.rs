//! The calling contract between a resource and the blocks it hosts.
//!
//! A [`Resource`] owns a [`FbTypeRegistry`] and the runtime limits. It
//! creates instances by type name (configuring generic types from the name
//! itself) and initializes them. Wiring and scheduling live outside this
//! crate; [`SharedInstance`] is the piece a multi-threaded scheduler needs to
//! keep event execution serialized per instance.

use crate::block::{dispatch_event, FunctionBlock};
use fb_common::{
    EventId, FbError, FbResult, GenericConfig, RuntimeConfig, StringDictionary, StringId,
};
use static_assertions::assert_impl_all;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Creates an uninitialized instance of a fixed-interface type.
pub type FbFactory = Box<dyn Fn(StringId) -> Box<dyn FunctionBlock> + Send + Sync>;

/// Creates and configures an instance of a generic type from its configuration string.
pub type GenericFbFactory =
    Box<dyn Fn(StringId, &str, &GenericConfig) -> FbResult<Box<dyn FunctionBlock>> + Send + Sync>;

/// Known block types.
#[derive(Default)]
pub struct FbTypeRegistry {
    fixed: HashMap<StringId, FbFactory>,
    generic: Vec<(String, GenericFbFactory)>,
}

impl fmt::Debug for FbTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fixed: Vec<String> = self.fixed.keys().map(ToString::to_string).collect();
        fixed.sort();
        let generic: Vec<&str> = self.generic.iter().map(|(p, _)| p.as_str()).collect();
        f.debug_struct("FbTypeRegistry")
            .field("fixed", &fixed)
            .field("generic", &generic)
            .finish()
    }
}

impl FbTypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fixed-interface type. A later registration replaces an earlier one.
    pub fn register<F>(&mut self, type_name: &str, factory: F)
    where
        F: Fn(StringId) -> Box<dyn FunctionBlock> + Send + Sync + 'static,
    {
        self.fixed
            .insert(StringId::intern(type_name), Box::new(factory));
    }

    /// Register a generic type matched by `prefix` followed by `_`.
    pub fn register_generic<F>(&mut self, prefix: &str, factory: F)
    where
        F: Fn(StringId, &str, &GenericConfig) -> FbResult<Box<dyn FunctionBlock>>
            + Send
            + Sync
            + 'static,
    {
        self.generic.retain(|(p, _)| p != prefix);
        self.generic.push((prefix.to_string(), Box::new(factory)));
    }

    /// Returns true if `type_name` would resolve to a factory.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.fixed_factory(type_name).is_some() || self.generic_factory(type_name).is_some()
    }

    fn fixed_factory(&self, type_name: &str) -> Option<&FbFactory> {
        StringDictionary::global()
            .lookup(type_name)
            .and_then(|id| self.fixed.get(&id))
    }

    /// Longest registered prefix matching `type_name`.
    fn generic_factory(&self, type_name: &str) -> Option<&GenericFbFactory> {
        self.generic
            .iter()
            .filter(|(prefix, _)| {
                type_name
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('_'))
            })
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, factory)| factory)
    }

    /// Create an uninitialized instance.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::UnknownType`] if nothing matches, or the generic
    /// configuration failure.
    pub fn instantiate(
        &self,
        type_name: &str,
        instance_name: StringId,
        limits: &GenericConfig,
    ) -> FbResult<Box<dyn FunctionBlock>> {
        if let Some(factory) = self.fixed_factory(type_name) {
            return Ok(factory(instance_name));
        }
        match self.generic_factory(type_name) {
            Some(factory) => factory(instance_name, type_name, limits),
            None => Err(FbError::UnknownType(type_name.to_string())),
        }
    }
}

/// Container that creates and initializes block instances.
///
/// Clones share the registry and configuration. Each resource also carries
/// the nesting depth at which it creates blocks; sub-blocks are created
/// through [`Resource::nested`] so recursive type declarations end in an
/// error instead of unbounded recursion.
#[derive(Debug, Clone)]
pub struct Resource {
    shared: Arc<ResourceShared>,
    depth: usize,
}

#[derive(Debug)]
struct ResourceShared {
    name: StringId,
    registry: FbTypeRegistry,
    config: RuntimeConfig,
}

impl Resource {
    /// Create a resource over `registry` with `config` limits.
    #[must_use]
    pub fn new(registry: FbTypeRegistry, config: RuntimeConfig) -> Self {
        Self {
            shared: Arc::new(ResourceShared {
                name: StringId::intern(&config.resource.name),
                registry,
                config,
            }),
            depth: 0,
        }
    }

    /// Create a resource with default configuration.
    #[must_use]
    pub fn with_defaults(registry: FbTypeRegistry) -> Self {
        Self::new(registry, RuntimeConfig::default())
    }

    /// Resource name.
    #[must_use]
    pub fn name(&self) -> StringId {
        self.shared.name
    }

    /// Registered types.
    #[must_use]
    pub fn registry(&self) -> &FbTypeRegistry {
        &self.shared.registry
    }

    /// Runtime configuration.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.shared.config
    }

    /// Nesting depth of the blocks this resource creates; 0 for top-level instances.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The resource used to create sub-blocks of a block created here.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::Configuration`] if the next level would exceed
    /// `max_nesting_depth`.
    pub fn nested(&self) -> FbResult<Resource> {
        let depth = self.depth + 1;
        let max = self.config().resource.max_nesting_depth;
        if depth > max {
            return Err(FbError::Configuration(format!(
                "sub-block nesting depth {depth} exceeds {max}"
            )));
        }
        Ok(Self {
            shared: Arc::clone(&self.shared),
            depth,
        })
    }

    /// Create and initialize an instance of `type_name`.
    ///
    /// # Errors
    ///
    /// See [`Resource::create_fb_named`].
    pub fn create_fb(
        &self,
        type_name: &str,
        instance_name: &str,
    ) -> FbResult<Box<dyn FunctionBlock>> {
        self.create_fb_named(type_name, StringId::intern(instance_name))
    }

    /// Create and initialize an instance of `type_name` called `instance_name`.
    ///
    /// A block that fails to initialize is destroyed before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::UnknownType`], a generic configuration failure, or
    /// the initialization failure of the block.
    pub fn create_fb_named(
        &self,
        type_name: &str,
        instance_name: StringId,
    ) -> FbResult<Box<dyn FunctionBlock>> {
        let mut block = self
            .registry()
            .instantiate(type_name, instance_name, &self.config().generic)?;

        if let Err(e) = block.initialize(self) {
            warn!(
                resource = %self.name(),
                instance = %instance_name,
                depth = self.depth,
                fb_type = type_name,
                error = %e,
                "Function block initialization failed"
            );
            return Err(e);
        }

        debug!(
            resource = %self.name(),
            instance = %instance_name,
            depth = self.depth,
            fb_type = type_name,
            kind = %block.kind(),
            "Function block created"
        );
        Ok(block)
    }
}

assert_impl_all!(Resource: Send, Sync);

/// An instance that may be driven from several scheduler threads.
///
/// Event execution takes the instance lock, so at most one
/// `execute_event` is in flight per instance and events run in lock
/// acquisition order.
#[derive(Debug)]
pub struct SharedInstance {
    block: Mutex<Box<dyn FunctionBlock>>,
}

impl SharedInstance {
    /// Wrap an initialized block.
    #[must_use]
    pub fn new(block: Box<dyn FunctionBlock>) -> Self {
        Self {
            block: Mutex::new(block),
        }
    }

    /// Deliver event input `event` and return the raised event outputs.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::Fault`] if a previous execution panicked, otherwise
    /// the result of [`dispatch_event`].
    pub fn execute_event(&self, event: EventId) -> FbResult<Vec<EventId>> {
        self.with_block(|block| dispatch_event(block, event))?
    }

    /// Run `f` with exclusive access to the block.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::Fault`] if a previous execution panicked.
    pub fn with_block<R>(&self, f: impl FnOnce(&mut dyn FunctionBlock) -> R) -> FbResult<R> {
        let mut guard = self
            .block
            .lock()
            .map_err(|_| FbError::Fault("function block lock poisoned".to_string()))?;
        Ok(f(&mut **guard))
    }

    /// Unwrap the block.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::Fault`] if a previous execution panicked.
    pub fn into_inner(self) -> FbResult<Box<dyn FunctionBlock>> {
        self.block
            .into_inner()
            .map_err(|_| FbError::Fault("function block lock poisoned".to_string()))
    }
}

assert_impl_all!(SharedInstance: Send, Sync);
