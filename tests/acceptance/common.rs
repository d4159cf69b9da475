//! Common utilities for acceptance tests.
//!
//! Provides:
//! - Tracing setup honoring `RUST_LOG`
//! - A counting basic block (`CELL`) and a composite block type that owns
//!   declared sub-blocks
//! - A registry with the standard types plus those test types

#![allow(dead_code)] // Not every scenario uses every helper

use fb_common::{EventId, FbResult, PortValue, StringId, Value, ValueKind};
use fb_core::{
    dispatch_event, BasicFb, BlockKind, EventSink, FbCore, FbTypeRegistry, FunctionBlock,
    InterfaceSpec, InternalFbDecl, InternalVarsInfo, Resource,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Install a test subscriber once per process.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Basic block with one internal DINT `x`, counted up on REQ.
#[derive(Debug)]
pub struct Cell {
    basic: BasicFb,
    live: Arc<AtomicUsize>,
}

impl Drop for Cell {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FunctionBlock for Cell {
    fn kind(&self) -> BlockKind {
        BlockKind::Basic
    }

    fn core(&self) -> &FbCore {
        self.basic.core()
    }

    fn core_mut(&mut self) -> &mut FbCore {
        self.basic.core_mut()
    }

    fn initialize(&mut self, resource: &Resource) -> FbResult<()> {
        self.basic.initialize(resource)
    }

    fn execute_event(&mut self, _event: EventId, sink: &mut EventSink) -> FbResult<()> {
        let x: i32 = self.basic.var_internal(0).get()?;
        self.basic.var_internal_mut(0).set(x + 1)?;
        sink.send(0);
        Ok(())
    }

    fn get_variable(&self, path: &[StringId]) -> Option<&Value> {
        self.basic.get_variable(path)
    }
}

/// Basic block forwarding REQ to each owned sub-block in creation order.
#[derive(Debug)]
pub struct Composite {
    basic: BasicFb,
}

impl FunctionBlock for Composite {
    fn kind(&self) -> BlockKind {
        BlockKind::Basic
    }

    fn core(&self) -> &FbCore {
        self.basic.core()
    }

    fn core_mut(&mut self) -> &mut FbCore {
        self.basic.core_mut()
    }

    fn initialize(&mut self, resource: &Resource) -> FbResult<()> {
        self.basic.initialize(resource)
    }

    fn execute_event(&mut self, _event: EventId, sink: &mut EventSink) -> FbResult<()> {
        let names: Vec<StringId> = self
            .basic
            .internal_fbs()
            .iter()
            .map(|fb| fb.name())
            .collect();
        for name in names {
            if let Some(block) = self.basic.internal_fb_mut(name) {
                dispatch_event(block, 0)?;
            }
        }
        sink.send(0);
        Ok(())
    }

    fn get_variable(&self, path: &[StringId]) -> Option<&Value> {
        self.basic.get_variable(path)
    }
}

fn req_cnf() -> Arc<InterfaceSpec> {
    Arc::new(
        InterfaceSpec::builder()
            .event_input("REQ", &[])
            .event_output("CNF", &[])
            .build()
            .unwrap(),
    )
}

/// Standard types, `CELL`, and one composite type per `(name, sub-blocks)`.
///
/// `live` tracks how many `CELL` instances exist.
pub fn registry(
    live: &Arc<AtomicUsize>,
    composites: Vec<(&'static str, Vec<InternalFbDecl>)>,
) -> FbTypeRegistry {
    let mut registry = FbTypeRegistry::new();
    fb_stdlib::register_standard_types(&mut registry).unwrap();

    let spec = req_cnf();
    let vars = Arc::new(InternalVarsInfo::from_pairs(&[("x", ValueKind::DInt)]).unwrap());
    let cell_live = Arc::clone(live);
    registry.register("CELL", move |instance| {
        cell_live.fetch_add(1, Ordering::SeqCst);
        Box::new(Cell {
            basic: BasicFb::new(
                Arc::clone(&spec),
                StringId::intern("CELL"),
                instance,
                Arc::clone(&vars),
            ),
            live: Arc::clone(&cell_live),
        })
    });

    for (type_name, decls) in composites {
        let spec = req_cnf();
        let decls: Arc<[InternalFbDecl]> = Arc::from(decls);
        registry.register(type_name, move |instance| {
            Box::new(Composite {
                basic: BasicFb::new(
                    Arc::clone(&spec),
                    StringId::intern(type_name),
                    instance,
                    Arc::new(InternalVarsInfo::empty()),
                )
                .with_internal_fbs(Arc::clone(&decls)),
            })
        });
    }

    registry
}

/// Resource over [`registry`] with default limits.
pub fn resource(
    live: &Arc<AtomicUsize>,
    composites: Vec<(&'static str, Vec<InternalFbDecl>)>,
) -> Resource {
    init_tracing();
    Resource::with_defaults(registry(live, composites))
}

/// Write data input `index` of `block`.
pub fn set_input<T: PortValue>(block: &mut dyn FunctionBlock, index: usize, value: T) {
    block.core_mut().data_input_mut(index).set(value).unwrap();
}

/// Read data output `index` of `block`.
pub fn output<T: PortValue>(block: &dyn FunctionBlock, index: usize) -> T {
    block.core().data_output(index).get().unwrap()
}
