use crate::activity::DEFAULT_CONCURRENCY;
use crate::cache::DEFAULT_TTL_MINUTES;
use crate::error::{PulseError, Result};
use crate::paths;
use crate::scanner::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PRIMARY_ENDPOINT: &str = "https://api.zenhub.com/public/graphql";
pub const DEFAULT_PRIMARY_TOKEN_ENV: &str = "ZENHUB_TOKEN";
pub const DEFAULT_SECONDARY_ENDPOINT: &str = "https://api.github.com/graphql";
pub const DEFAULT_SECONDARY_TOKEN_ENV: &str = "GITHUB_TOKEN";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One GraphQL backend. The token itself never lives in the file, only the
/// name of the environment variable holding it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub endpoint: String,
    pub token_env: String,
}

impl BackendConfig {
    pub fn primary_default() -> Self {
        Self {
            endpoint: DEFAULT_PRIMARY_ENDPOINT.to_string(),
            token_env: DEFAULT_PRIMARY_TOKEN_ENV.to_string(),
        }
    }

    pub fn secondary_default() -> Self {
        Self {
            endpoint: DEFAULT_SECONDARY_ENDPOINT.to_string(),
            token_env: DEFAULT_SECONDARY_TOKEN_ENV.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_minutes: u32,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            page_size: DEFAULT_PAGE_SIZE,
            cache_ttl_minutes: DEFAULT_TTL_MINUTES,
        }
    }
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_cache_ttl() -> u32 {
    DEFAULT_TTL_MINUTES
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub workspace: WorkspaceConfig,
    #[serde(default = "BackendConfig::primary_default")]
    pub primary: BackendConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<BackendConfig>,
    #[serde(default)]
    pub activity: ActivityConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(workspace_id: impl Into<String>) -> Self {
        Self {
            version: 1,
            workspace: WorkspaceConfig {
                id: workspace_id.into(),
                name: None,
            },
            primary: BackendConfig::primary_default(),
            secondary: None,
            activity: ActivityConfig::default(),
        }
    }

    /// `~/.pulse/config.yaml`
    pub fn default_path() -> Result<PathBuf> {
        Ok(paths::config_path(&paths::pulse_home()?))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PulseError::NotConfigured(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut push = |level: WarnLevel, message: String| {
            warnings.push(ConfigWarning { level, message });
        };

        if self.version != 1 {
            push(
                WarnLevel::Warning,
                format!("unsupported config version {}; expected 1", self.version),
            );
        }

        if self.workspace.id.trim().is_empty() {
            push(WarnLevel::Error, "workspace.id is empty".to_string());
        }

        let backends = std::iter::once(("primary", &self.primary))
            .chain(self.secondary.as_ref().map(|b| ("secondary", b)));
        for (section, backend) in backends {
            let endpoint = backend.endpoint.trim();
            if endpoint.is_empty() {
                push(WarnLevel::Error, format!("{section}.endpoint is empty"));
            } else if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
                push(
                    WarnLevel::Warning,
                    format!("{section}.endpoint '{endpoint}' is not an http(s) URL"),
                );
            }
            if backend.token_env.trim().is_empty() {
                push(WarnLevel::Error, format!("{section}.token_env is empty"));
            }
        }

        if self.activity.concurrency == 0 {
            push(
                WarnLevel::Error,
                "activity.concurrency must be at least 1".to_string(),
            );
        }

        if self.activity.page_size == 0 || self.activity.page_size > MAX_PAGE_SIZE {
            push(
                WarnLevel::Warning,
                format!(
                    "activity.page_size {} is outside 1-{MAX_PAGE_SIZE}; it will be clamped",
                    self.activity.page_size
                ),
            );
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FULL: &str = r#"
version: 1
workspace:
  id: ws-123
  name: Platform
primary:
  endpoint: https://api.zenhub.com/public/graphql
  token_env: ZENHUB_TOKEN
secondary:
  endpoint: https://api.github.com/graphql
  token_env: GITHUB_TOKEN
activity:
  concurrency: 8
  page_size: 25
  cache_ttl_minutes: 15
"#;

    #[test]
    fn full_config_parses() {
        let cfg: Config = serde_yaml::from_str(FULL).unwrap();
        assert_eq!(cfg.workspace.id, "ws-123");
        assert_eq!(cfg.workspace.name.as_deref(), Some("Platform"));
        assert_eq!(cfg.secondary, Some(BackendConfig::secondary_default()));
        assert_eq!(cfg.activity.concurrency, 8);
        assert_eq!(cfg.activity.page_size, 25);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg: Config = serde_yaml::from_str("workspace:\n  id: ws-1\n").unwrap();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.primary, BackendConfig::primary_default());
        assert!(cfg.secondary.is_none());
        assert_eq!(cfg.activity.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(cfg.activity.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(cfg.activity.cache_ttl_minutes, DEFAULT_TTL_MINUTES);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pulse").join("config.yaml");
        let mut cfg = Config::new("ws-9");
        cfg.secondary = Some(BackendConfig::secondary_default());
        cfg.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.workspace.id, "ws-9");
        assert!(loaded.secondary.is_some());
    }

    #[test]
    fn load_missing_file_is_not_configured() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, PulseError::NotConfigured(_)));
    }

    #[test]
    fn validate_flags_empty_fields() {
        let mut cfg = Config::new("  ");
        cfg.primary.endpoint = String::new();
        cfg.secondary = Some(BackendConfig {
            endpoint: "api.github.com".into(),
            token_env: String::new(),
        });
        cfg.activity.concurrency = 0;
        cfg.activity.page_size = 500;

        let warnings = cfg.validate();
        let errors: Vec<_> = warnings
            .iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message.as_str())
            .collect();
        assert_eq!(
            errors,
            vec![
                "workspace.id is empty",
                "primary.endpoint is empty",
                "secondary.token_env is empty",
                "activity.concurrency must be at least 1",
            ]
        );
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Warning && w.message.contains("not an http(s) URL")));
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Warning && w.message.contains("page_size 500")));
    }
}
