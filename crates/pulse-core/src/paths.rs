use crate::error::{PulseError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const PULSE_DIR: &str = ".pulse";
pub const CONFIG_FILE: &str = "config.yaml";
pub const CACHE_DIR: &str = "cache";

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "PULSE_CONFIG";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// `~/.pulse`
pub fn pulse_home() -> Result<PathBuf> {
    let home = home::home_dir().ok_or(PulseError::HomeNotFound)?;
    Ok(home.join(PULSE_DIR))
}

pub fn config_path(pulse_home: &Path) -> PathBuf {
    pulse_home.join(CONFIG_FILE)
}

pub fn cache_dir(pulse_home: &Path) -> PathBuf {
    pulse_home.join(CACHE_DIR)
}

/// File backing one cache key. Each `/`-separated key segment becomes one
/// path component.
pub fn cache_file(cache_dir: &Path, key: &str) -> PathBuf {
    let mut path = cache_dir.to_path_buf();
    let segments: Vec<String> = key
        .split('/')
        .filter(|s| !s.is_empty())
        .map(sanitize_component)
        .collect();
    let Some((last, dirs)) = segments.split_last() else {
        return path.join("_.json");
    };
    for dir in dirs {
        path.push(dir);
    }
    path.join(format!("{last}.json"))
}

// ---------------------------------------------------------------------------
// Component sanitizing
// ---------------------------------------------------------------------------

static UNSAFE_RE: OnceLock<Regex> = OnceLock::new();

fn unsafe_re() -> &'static Regex {
    UNSAFE_RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_\-]").unwrap())
}

/// Replace anything outside `[A-Za-z0-9_-]` so ids from the backend can't
/// escape the cache directory.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned = unsafe_re().replace_all(raw, "_").into_owned();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
