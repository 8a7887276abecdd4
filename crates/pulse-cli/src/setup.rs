use anyhow::Context;
use pulse_core::cache::{Cache, FileCache, MemoryCache};
use pulse_core::config::Config;
use pulse_core::paths;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolve the config file location.
///
/// Priority:
/// 1. `--config` flag / `PULSE_CONFIG` env var (passed in as `explicit`)
/// 2. `~/.pulse/config.yaml`
pub fn config_path(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    match explicit {
        Some(p) => Ok(p.to_path_buf()),
        None => Ok(Config::default_path()?),
    }
}

pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<(PathBuf, Config)> {
    let path = config_path(explicit)?;
    let config = Config::load(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    Ok((path, config))
}

/// On-disk cache under `~/.pulse/cache`, or a throwaway in-memory one.
pub fn open_cache(config: &Config, no_cache: bool) -> anyhow::Result<Arc<dyn Cache>> {
    if no_cache {
        return Ok(Arc::new(MemoryCache::new()));
    }
    let dir = paths::cache_dir(&paths::pulse_home()?);
    Ok(Arc::new(FileCache::with_ttl_minutes(
        dir,
        config.activity.cache_ttl_minutes,
    )))
}
