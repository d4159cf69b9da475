//! Process-interface blocks for the function block runtime.
//!
//! This crate provides:
//! - [`ProcessInterface`] - the initialise/deinitialise/read/write/status
//!   contract every I/O collaborator block exposes
//! - [`ControlApi`] - the binding to an external control API, with the
//!   in-memory [`SimulatedApi`] for testing
//! - [`SharedConnection`] - the one controller connection shared by all pins
//! - [`ProcessInterfaceFb`] - the boolean pins `IX` and `QX`

pub mod api;
pub mod connection;
pub mod pin;

pub use api::*;
pub use connection::*;
pub use pin::*;

use fb_common::FbResult;
use fb_core::FbTypeRegistry;
use std::sync::Arc;

/// Register `IX` and `QX`, all instances sharing `connection`.
///
/// # Errors
///
/// Returns [`fb_common::FbError::InvalidInterface`] if a pin interface
/// declaration is inconsistent.
pub fn register_process_types(
    registry: &mut FbTypeRegistry,
    connection: &Arc<SharedConnection>,
) -> FbResult<()> {
    for direction in [PinDirection::Input, PinDirection::Output] {
        let interface = Arc::new(direction.interface()?);
        let connection = Arc::clone(connection);
        registry.register(direction.type_name(), move |instance| {
            Box::new(ProcessInterfaceFb::new(
                direction,
                Arc::clone(&interface),
                Arc::clone(&connection),
                instance,
            ))
        });
    }
    Ok(())
}
