//! Runtime configuration acceptance tests.
//!
//! # Acceptance Criteria
//!
//! - A TOML file configures resource limits, generic limits, and connection policy
//! - Omitted sections fall back to defaults
//! - Every configured limit is enforced when instances are created

use super::common::{init_tracing, registry};
use fb_common::{ConfigError, FbError, RuntimeConfig};
use fb_core::{InternalFbDecl, Resource};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const PLANT_CONFIG: &str = r#"
[resource]
name = "PLANT_RES"
max_buffer_bytes = 16
max_internal_fbs = 2
max_nesting_depth = 4

[generic]
max_inputs = 4

[process]
connect_retries = 3
retry_interval = "250ms"
"#;

fn plant_resource(live: &Arc<AtomicUsize>) -> anyhow::Result<Resource> {
    init_tracing();
    let config = RuntimeConfig::from_toml(PLANT_CONFIG)?;
    let composites = vec![
        (
            "PAIR",
            vec![
                InternalFbDecl::new("a", "CELL"),
                InternalFbDecl::new("b", "CELL"),
            ],
        ),
        (
            "TRIPLE",
            vec![
                InternalFbDecl::new("a", "CELL"),
                InternalFbDecl::new("b", "CELL"),
                InternalFbDecl::new("c", "CELL"),
            ],
        ),
    ];
    Ok(Resource::new(registry(live, composites), config))
}

#[test]
fn test_parse_full_configuration() -> anyhow::Result<()> {
    let config = RuntimeConfig::from_toml(PLANT_CONFIG)?;
    assert_eq!(config.resource.name, "PLANT_RES");
    assert_eq!(config.resource.max_buffer_bytes, 16);
    assert_eq!(config.resource.max_internal_fbs, 2);
    assert_eq!(config.resource.max_nesting_depth, 4);
    assert_eq!(config.generic.max_inputs, 4);
    assert_eq!(config.process.connect_retries, 3);
    assert_eq!(config.process.retry_interval, Duration::from_millis(250));
    Ok(())
}

#[test]
fn test_omitted_sections_use_defaults() -> anyhow::Result<()> {
    let config = RuntimeConfig::from_toml("[generic]\nmax_inputs = 8\n")?;
    let defaults = RuntimeConfig::default();
    assert_eq!(config.generic.max_inputs, 8);
    assert_eq!(config.resource.name, defaults.resource.name);
    assert_eq!(config.process.connect_retries, defaults.process.connect_retries);

    let reparsed = RuntimeConfig::from_toml(&config.to_toml()?)?;
    assert_eq!(reparsed.generic.max_inputs, 8);
    assert_eq!(reparsed.process.retry_interval, defaults.process.retry_interval);
    Ok(())
}

#[test]
fn test_invalid_configuration_sources() {
    assert!(matches!(
        RuntimeConfig::from_toml("[resource]\nmax_buffer_bytes = \"lots\"\n"),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        RuntimeConfig::from_file(Path::new("/nonexistent/fb-runtime/runtime.toml")),
        Err(ConfigError::Io { .. })
    ));
}

#[test]
fn test_resource_name_from_configuration() -> anyhow::Result<()> {
    let resource = plant_resource(&Arc::new(AtomicUsize::new(0)))?;
    assert_eq!(resource.name().to_string(), "PLANT_RES");
    Ok(())
}

#[test]
fn test_generic_input_limit_enforced() -> anyhow::Result<()> {
    let resource = plant_resource(&Arc::new(AtomicUsize::new(0)))?;
    let gate = resource.create_fb("GEN_OR_4_BYTE", "WIDE_OK")?;
    assert_eq!(gate.core().interface().data_inputs().len(), 4);
    assert!(matches!(
        resource.create_fb("GEN_OR_5_BYTE", "TOO_WIDE"),
        Err(FbError::Configuration(_))
    ));
    Ok(())
}

#[test]
fn test_buffer_limit_enforced() -> anyhow::Result<()> {
    let resource = plant_resource(&Arc::new(AtomicUsize::new(0)))?;
    // 3 x 4 bytes in, 4 bytes out
    resource.create_fb("GEN_AND_3_DWORD", "FITS")?;
    assert!(matches!(
        resource.create_fb("GEN_AND_4_DWORD", "OVERFLOWS"),
        Err(FbError::Allocation { bytes: 20, limit: 16 })
    ));
    Ok(())
}

#[test]
fn test_internal_block_limit_enforced() -> anyhow::Result<()> {
    let live = Arc::new(AtomicUsize::new(0));
    let resource = plant_resource(&live)?;
    let pair = resource.create_fb("PAIR", "P")?;
    assert_eq!(live.load(Ordering::SeqCst), 2);

    assert!(matches!(
        resource.create_fb("TRIPLE", "T"),
        Err(FbError::Allocation { .. })
    ));
    assert_eq!(live.load(Ordering::SeqCst), 2);

    drop(pair);
    assert_eq!(live.load(Ordering::SeqCst), 0);
    Ok(())
}
