//! Generic function blocks whose data-input count is set at creation time.
//!
//! A generic block type is registered under a prefix such as `GEN_AND`. The
//! resource creates an instance from a configuration string of the form
//! `<PREFIX>_<N>_<KIND>`, e.g. `GEN_AND_3_BOOL`. Configuration builds an
//! interface owned by that instance:
//!
//! ```text
//! EVENT_INPUT   REQ WITH IN1, ..., INn
//! EVENT_OUTPUT  CNF WITH OUT
//! VAR_INPUT     IN1 .. INn : KIND
//! VAR_OUTPUT    OUT        : KIND
//! ```
//!
//! The combining computation is written once over [`AnyBit`] and dispatched
//! on the configured kind at the point of use.

use crate::block::FbCore;
use crate::interface::{EventDecl, InterfaceSpec, VarDecl};
use fb_common::{FbError, FbResult, GenericConfig, PortValue, ResourceConfig, StringId, ValueKind};
use std::sync::Arc;
use tracing::{debug, warn};

/// Event input index of `REQ`.
pub const EVENT_REQ: usize = 0;
/// Event output index of `CNF`.
pub const EVENT_CNF: usize = 0;
/// Data output index of `OUT`.
pub const OUTPUT_OUT: usize = 0;

/// Input count and kind parsed from a configuration string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericArity {
    /// Number of data inputs.
    pub inputs: usize,
    /// Kind of every data input and of the output.
    pub kind: ValueKind,
}

impl GenericArity {
    /// Parse `config` for a type registered under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::Configuration`] if the prefix does not match, the
    /// count is not a positive integer up to `max_inputs`, or the kind is unknown.
    pub fn parse(prefix: &str, config: &str, max_inputs: usize) -> FbResult<Self> {
        let bad = |reason: &str| {
            FbError::Configuration(format!("invalid configuration {config:?}: {reason}"))
        };

        let rest = config
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('_'))
            .ok_or_else(|| bad("type prefix does not match"))?;
        let (count, kind) = rest
            .split_once('_')
            .ok_or_else(|| bad("expected <N>_<KIND>"))?;

        if count.is_empty() || !count.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad("input count is not a decimal number"));
        }
        if count.len() > 1 && count.starts_with('0') {
            return Err(bad("input count has leading zeros"));
        }
        let inputs: usize = count.parse().map_err(|_| bad("input count is out of range"))?;
        if inputs == 0 {
            return Err(bad("input count must be positive"));
        }
        if inputs > max_inputs {
            return Err(bad("input count exceeds the configured maximum"));
        }
        let kind = ValueKind::from_name(kind).ok_or_else(|| bad("unknown value kind"))?;

        Ok(Self { inputs, kind })
    }
}

/// Base state of a generic block.
#[derive(Debug)]
pub struct GenericFb {
    core: FbCore,
    prefix: StringId,
    accepts: fn(ValueKind) -> bool,
    arity: Option<GenericArity>,
}

impl GenericFb {
    /// Create an unconfigured instance of the generic type `prefix`.
    ///
    /// `accepts` restricts the kinds a configuration may select.
    #[must_use]
    pub fn new(prefix: StringId, instance_name: StringId, accepts: fn(ValueKind) -> bool) -> Self {
        Self {
            core: FbCore::new(Arc::new(InterfaceSpec::default()), prefix, instance_name),
            prefix,
            accepts,
            arity: None,
        }
    }

    /// Parse `config` and install the instance-owned interface.
    ///
    /// Nothing is committed unless every step succeeds; a rejected string
    /// leaves the instance unconfigured.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::Configuration`] for a malformed string, an
    /// unsupported kind, or an instance that was already configured.
    pub fn configure(&mut self, config: &str, limits: &GenericConfig) -> FbResult<GenericArity> {
        if self.arity.is_some() {
            return Err(FbError::Configuration(format!(
                "{} is already configured",
                self.core.instance_name()
            )));
        }

        let result = GenericArity::parse(&self.prefix.text(), config, limits.max_inputs)
            .and_then(|arity| {
                if (self.accepts)(arity.kind) {
                    Ok(arity)
                } else {
                    Err(FbError::Configuration(format!(
                        "{} does not support inputs of kind {}",
                        self.prefix, arity.kind
                    )))
                }
            })
            .and_then(|arity| Ok((arity, Self::build_interface(arity)?)));

        let (arity, spec) = match result {
            Ok(parts) => parts,
            Err(e) => {
                warn!(
                    instance = %self.core.instance_name(),
                    error = %e,
                    "Generic configuration rejected"
                );
                return Err(e);
            }
        };

        self.core.replace_interface(Arc::new(spec))?;
        self.core.set_type_name(StringId::intern(config));
        self.arity = Some(arity);
        debug!(
            instance = %self.core.instance_name(),
            fb_type = config,
            inputs = arity.inputs,
            kind = %arity.kind,
            "Generic function block configured"
        );
        Ok(arity)
    }

    fn build_interface(arity: GenericArity) -> FbResult<InterfaceSpec> {
        let allocation_error = |_| FbError::Allocation {
            bytes: arity.inputs.saturating_mul(std::mem::size_of::<VarDecl>()),
            limit: usize::MAX,
        };

        let mut inputs = Vec::new();
        inputs.try_reserve_exact(arity.inputs).map_err(allocation_error)?;
        let mut with = Vec::new();
        with.try_reserve_exact(arity.inputs).map_err(allocation_error)?;
        for index in 0..arity.inputs {
            inputs.push(VarDecl::new(&format!("IN{}", index + 1), arity.kind));
            with.push(index);
        }

        InterfaceSpec::new(
            vec![EventDecl {
                name: StringId::intern("REQ"),
                with,
            }],
            vec![EventDecl {
                name: StringId::intern("CNF"),
                with: vec![OUTPUT_OUT],
            }],
            inputs,
            vec![VarDecl::new("OUT", arity.kind)],
            Vec::new(),
        )
    }

    /// Allocate buffers for the configured interface.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::Configuration`] if [`GenericFb::configure`] has not
    /// succeeded, otherwise the allocation failure.
    pub fn initialize(&mut self, limits: &ResourceConfig) -> FbResult<()> {
        if self.arity.is_none() {
            self.core.mark_failed();
            return Err(FbError::Configuration(format!(
                "{} must be configured before initialization",
                self.core.instance_name()
            )));
        }
        self.core.initialize(limits)
    }

    /// Configured arity, if any.
    #[must_use]
    pub fn arity(&self) -> Option<GenericArity> {
        self.arity
    }

    /// Number of configured data inputs (0 while unconfigured).
    #[must_use]
    pub fn input_count(&self) -> usize {
        self.arity.map_or(0, |arity| arity.inputs)
    }

    /// Registered generic type name.
    #[must_use]
    pub fn prefix(&self) -> StringId {
        self.prefix
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
}

/// Kinds that support bitwise combination.
pub trait AnyBit: PortValue + Copy {
    /// Bitwise AND.
    #[must_use]
    fn bit_and(self, other: Self) -> Self;
    /// Bitwise OR.
    #[must_use]
    fn bit_or(self, other: Self) -> Self;
    /// Bitwise XOR.
    #[must_use]
    fn bit_xor(self, other: Self) -> Self;
}

macro_rules! any_bit {
    ($($ty:ty),+) => {
        $(
            impl AnyBit for $ty {
                #[inline]
                fn bit_and(self, other: Self) -> Self {
                    self & other
                }

                #[inline]
                fn bit_or(self, other: Self) -> Self {
                    self | other
                }

                #[inline]
                fn bit_xor(self, other: Self) -> Self {
                    self ^ other
                }
            }
        )+
    };
}

any_bit!(bool, u8, u16, u32, u64);

/// Binary operation folded over the inputs of a bitwise generic block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitwiseOp {
    /// Bitwise AND.
    And,
    /// Bitwise OR.
    Or,
    /// Bitwise XOR.
    Xor,
}

impl BitwiseOp {
    /// Combine two operands.
    #[inline]
    #[must_use]
    pub fn apply<T: AnyBit>(self, lhs: T, rhs: T) -> T {
        match self {
            Self::And => lhs.bit_and(rhs),
            Self::Or => lhs.bit_or(rhs),
            Self::Xor => lhs.bit_xor(rhs),
        }
    }

    /// Fold `inputs` left to right; the first input is the initial value.
    #[must_use]
    pub fn fold<T: AnyBit>(self, inputs: impl IntoIterator<Item = T>) -> Option<T> {
        let mut inputs = inputs.into_iter();
        let first = inputs.next()?;
        Some(inputs.fold(first, |acc, input| self.apply(acc, input)))
    }

    /// Combine data inputs `0..count` of `core` into data output 0,
    /// dispatching on the output's kind.
    ///
    /// # Errors
    ///
    /// Returns [`FbError::KindMismatch`] if a port does not hold the output's
    /// kind, or [`FbError::Configuration`] for a kind without bitwise support.
    pub fn combine_inputs(self, core: &mut FbCore, count: usize) -> FbResult<()> {
        match core.data_output(OUTPUT_OUT).kind() {
            ValueKind::Bool => self.combine::<bool>(core, count),
            ValueKind::Byte => self.combine::<u8>(core, count),
            ValueKind::Word => self.combine::<u16>(core, count),
            ValueKind::DWord => self.combine::<u32>(core, count),
            ValueKind::LWord => self.combine::<u64>(core, count),
            other => Err(FbError::Configuration(format!(
                "bitwise operation on non-bit kind {other}"
            ))),
        }
    }

    fn combine<T: AnyBit>(self, core: &mut FbCore, count: usize) -> FbResult<()> {
        let inputs = (0..count)
            .map(|index| core.input::<T>(index))
            .collect::<FbResult<Vec<T>>>()?;
        match self.fold(inputs) {
            Some(out) => core.set_output(OUTPUT_OUT, out),
            None => Ok(()),
        }
    }
}
