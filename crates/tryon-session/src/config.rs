use std::path::PathBuf;
use std::time::Duration;
use tryon_core::{Catalog, CatalogError};

/// Session configuration, loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// How long the simulated face scan takes, in milliseconds.
    pub analysis_delay_ms: u64,
    /// Catalog TOML file. The embedded catalog is used when unset.
    pub catalog_path: Option<PathBuf>,
    /// Frame highlighted before any shape is detected.
    pub default_frame: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_device: "/dev/video0".to_string(),
            analysis_delay_ms: 2800,
            catalog_path: None,
            default_frame: "v2".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `TRYON_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            camera_device: var("TRYON_CAMERA_DEVICE").unwrap_or(defaults.camera_device),
            analysis_delay_ms: parse_or(
                var("TRYON_ANALYSIS_DELAY_MS"),
                defaults.analysis_delay_ms,
            ),
            catalog_path: var("TRYON_CATALOG_PATH")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            default_frame: var("TRYON_DEFAULT_FRAME").unwrap_or(defaults.default_frame),
        }
    }

    pub fn analysis_delay(&self) -> Duration {
        Duration::from_millis(self.analysis_delay_ms)
    }

    /// The configured catalog file, or the embedded catalog.
    pub fn load_catalog(&self) -> Result<Catalog, CatalogError> {
        match &self.catalog_path {
            Some(path) => Catalog::load(path),
            None => Catalog::embedded(),
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}
