use crate::value::ValueKind;
use thiserror::Error;

/// Function block error types covering layout, configuration, and execution failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FbError {
    /// Buffer layout could not be computed (size overflow, empty descriptor misuse).
    #[error("layout error: {0}")]
    Layout(String),

    /// Buffer allocation failed or exceeded the configured limit.
    #[error("allocation of {bytes} bytes failed (limit: {limit} bytes)")]
    Allocation {
        /// Requested size in bytes.
        bytes: usize,
        /// Configured upper bound in bytes.
        limit: usize,
    },

    /// Interface specification is inconsistent.
    #[error("invalid interface: {0}")]
    InvalidInterface(String),

    /// No factory is registered for the requested type name.
    #[error("unknown function block type: {0}")]
    UnknownType(String),

    /// Generic block configuration string was rejected.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An internal sub-block could not be created; the whole batch was released.
    #[error("internal block #{index} ({instance}) could not be created: {source}")]
    SubBlockCreation {
        /// Position of the failing entry in the descriptor list.
        index: usize,
        /// Instance name of the failing entry.
        instance: String,
        /// Failure reported by the sub-block.
        #[source]
        source: Box<FbError>,
    },

    /// Invalid lifecycle transition attempted.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Source state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// Operation requires an initialized instance.
    #[error("instance {0} is not initialized")]
    NotInitialized(String),

    /// A value of one kind was used where another was declared.
    #[error("kind mismatch: expected {expected}, found {found}")]
    KindMismatch {
        /// Declared kind of the slot.
        expected: ValueKind,
        /// Kind actually supplied or requested.
        found: ValueKind,
    },

    /// A STRING value does not fit its storage slot.
    #[error("string of {len} bytes exceeds the {max}-byte limit")]
    StringTooLong {
        /// Length of the rejected value in bytes.
        len: usize,
        /// Longest value a slot holds.
        max: usize,
    },

    /// Event index outside the interface.
    #[error("unknown event {index} on {instance}")]
    UnknownEvent {
        /// Offending event index.
        index: usize,
        /// Instance the event was delivered to.
        instance: String,
    },

    /// Generic runtime fault.
    #[error("runtime fault: {0}")]
    Fault(String),
}

/// Convenience type alias for function block operations.
pub type FbResult<T> = Result<T, FbError>;
