//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Only scalar defaults live here; list and nested defaults come from the serde
/// defaults on `EngineConfig` so a partial file never wipes them.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("store.path", ".orgcfg/store")?
        .set_default("store.timeout_ms", 2_000_i64)?
        .set_default("cache.enabled", true)
}
