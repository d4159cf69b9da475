//! Generic bitwise gates `GEN_AND`, `GEN_OR` and `GEN_XOR`.
//!
//! Each gate is configured from a type name such as `GEN_OR_4_WORD`. REQ
//! combines `IN1..INn` left to right into `OUT` and raises CNF.

use fb_common::{EventId, FbResult, StringId, ValueKind};
use fb_core::{
    BitwiseOp, BlockKind, EventSink, FbCore, FbTypeRegistry, FunctionBlock, GenericFb, Resource,
    EVENT_CNF, EVENT_REQ,
};

/// Generic AND prefix.
pub const GEN_AND: &str = "GEN_AND";
/// Generic OR prefix.
pub const GEN_OR: &str = "GEN_OR";
/// Generic XOR prefix.
pub const GEN_XOR: &str = "GEN_XOR";

/// A generic gate folding its inputs with one [`BitwiseOp`].
#[derive(Debug)]
pub struct GenBitwise {
    generic: GenericFb,
    op: BitwiseOp,
}

impl GenBitwise {
    /// Create an unconfigured gate of generic type `prefix`.
    #[must_use]
    pub fn new(prefix: &str, instance_name: StringId, op: BitwiseOp) -> Self {
        Self {
            generic: GenericFb::new(StringId::intern(prefix), instance_name, ValueKind::is_any_bit),
            op,
        }
    }

    /// Create and configure a gate from its configuration string.
    ///
    /// # Errors
    ///
    /// Returns [`fb_common::FbError::Configuration`] if `config` is rejected.
    pub fn configured(
        prefix: &str,
        instance_name: StringId,
        op: BitwiseOp,
        config: &str,
        limits: &fb_common::GenericConfig,
    ) -> FbResult<Self> {
        let mut gate = Self::new(prefix, instance_name, op);
        gate.generic.configure(config, limits)?;
        Ok(gate)
    }

    /// The combining operation.
    #[must_use]
    pub fn op(&self) -> BitwiseOp {
        self.op
    }

    /// Generic base state.
    #[must_use]
    pub fn generic(&self) -> &GenericFb {
        &self.generic
    }
}

impl FunctionBlock for GenBitwise {
    fn kind(&self) -> BlockKind {
        BlockKind::Generic
    }

    fn core(&self) -> &FbCore {
        self.generic.core()
    }

    fn core_mut(&mut self) -> &mut FbCore {
        self.generic.core_mut()
    }

    fn initialize(&mut self, resource: &Resource) -> FbResult<()> {
        self.generic.initialize(&resource.config().resource)
    }

    fn execute_event(&mut self, event: EventId, sink: &mut EventSink) -> FbResult<()> {
        if event == EVENT_REQ {
            let count = self.generic.input_count();
            self.op.combine_inputs(self.generic.core_mut(), count)?;
            sink.send(EVENT_CNF);
        }
        Ok(())
    }
}

/// Register the three bitwise gates with `registry`.
pub fn register(registry: &mut FbTypeRegistry) {
    for (prefix, op) in [
        (GEN_AND, BitwiseOp::And),
        (GEN_OR, BitwiseOp::Or),
        (GEN_XOR, BitwiseOp::Xor),
    ] {
        registry.register_generic(prefix, move |instance, config, limits| {
            GenBitwise::configured(prefix, instance, op, config, limits)
                .map(|gate| Box::new(gate) as Box<dyn FunctionBlock>)
        });
    }
}
