//! Standard function blocks built on the execution core.
//!
//! - **Counters** ([`counters`]): `FB_CTU_DINT`, `E_CTU`
//! - **Bistable** ([`bistable`]): `E_SR`
//! - **Bitwise** ([`bitwise`]): `GEN_AND`, `GEN_OR`, `GEN_XOR` (generic arity)
//!
//! # Example
//!
//! ```
//! use fb_core::{dispatch_event, FbTypeRegistry, Resource};
//! use fb_stdlib::register_standard_types;
//!
//! let mut registry = FbTypeRegistry::new();
//! register_standard_types(&mut registry).unwrap();
//! let resource = Resource::with_defaults(registry);
//!
//! let mut gate = resource.create_fb("GEN_AND_2_BOOL", "AND1").unwrap();
//! gate.core_mut().data_input_mut(0).set(true).unwrap();
//! gate.core_mut().data_input_mut(1).set(true).unwrap();
//! assert_eq!(dispatch_event(gate.as_mut(), 0).unwrap(), vec![0]);
//! assert!(gate.core().data_output(0).get::<bool>().unwrap());
//! ```

pub mod bistable;
pub mod bitwise;
pub mod counters;

pub use bistable::{ESr, E_SR};
pub use bitwise::{GenBitwise, GEN_AND, GEN_OR, GEN_XOR};
pub use counters::{ECtu, FbCtuDint, E_CTU, FB_CTU_DINT};

use fb_common::FbResult;
use fb_core::{FbTypeRegistry, InternalVarsInfo};
use std::sync::Arc;
use tracing::debug;

/// Register every standard type with `registry`.
///
/// Each interface is built once here and shared by all instances.
///
/// # Errors
///
/// Returns [`fb_common::FbError::InvalidInterface`] if a built-in interface
/// declaration is inconsistent.
pub fn register_standard_types(registry: &mut FbTypeRegistry) -> FbResult<()> {
    let ctu_dint = Arc::new(FbCtuDint::interface()?);
    registry.register(FB_CTU_DINT, move |instance| {
        Box::new(FbCtuDint::new(Arc::clone(&ctu_dint), instance))
    });

    let no_internals = Arc::new(InternalVarsInfo::empty());

    let e_ctu = Arc::new(ECtu::interface()?);
    let internals = Arc::clone(&no_internals);
    registry.register(E_CTU, move |instance| {
        Box::new(ECtu::new(Arc::clone(&e_ctu), Arc::clone(&internals), instance))
    });

    let e_sr = Arc::new(ESr::interface()?);
    let internals = Arc::clone(&no_internals);
    registry.register(E_SR, move |instance| {
        Box::new(ESr::new(Arc::clone(&e_sr), Arc::clone(&internals), instance))
    });

    bitwise::register(registry);

    debug!(registry = ?registry, "Standard function block types registered");
    Ok(())
}
