//! Configuration for the packfs tooling.
//!
//! Sources, lowest precedence first: built-in defaults, a TOML file
//! (`packfs.toml` in the working directory, or an explicit path), then
//! `PACKFS__*` environment variables with `__` separating nested keys,
//! e.g. `PACKFS__SERVE__ADDR=0.0.0.0:80`.

use crate::bundle::MAX_LEVEL;
use crate::logging::LoggingConfig;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "packfs.toml";
pub const ENV_PREFIX: &str = "PACKFS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackfsConfig {
    #[serde(default)]
    pub pack: PackSection,

    #[serde(default)]
    pub serve: ServeSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for `packfs pack`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackSection {
    /// Compression level, 0..=9
    #[serde(default = "default_quality")]
    pub quality: u32,

    /// Keep only files whose name matches this glob
    #[serde(default)]
    pub include: Option<String>,

    /// Drop files whose name matches this glob
    #[serde(default)]
    pub exclude: Option<String>,

    /// Honor `.gitignore` files under the base directory
    #[serde(default)]
    pub gitignore: bool,

    /// Directory entry paths are relative to; the working directory when unset
    #[serde(default)]
    pub base: Option<PathBuf>,
}

fn default_quality() -> u32 {
    MAX_LEVEL
}

impl Default for PackSection {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            include: None,
            exclude: None,
            gitignore: false,
            base: None,
        }
    }
}

/// Settings for `packfs serve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServeSection {
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Bundle path served as the document root
    #[serde(default)]
    pub root: String,

    /// Inflate file content on first open instead of at startup
    #[serde(default)]
    pub lazy: bool,
}

fn default_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            root: String::new(),
            lazy: false,
        }
    }
}

/// Loads [`PackfsConfig`] from file and environment sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load with `packfs.toml` from `dir` if it exists.
    pub fn load(dir: &Path) -> Result<PackfsConfig, ConfigError> {
        Self::build(
            Some(File::from(dir.join(CONFIG_FILE)).format(FileFormat::Toml).required(false)),
            None,
        )
    }

    /// Load from an explicit file, which must exist.
    pub fn load_from_file(path: &Path) -> Result<PackfsConfig, ConfigError> {
        Self::build(
            Some(File::from(path).format(FileFormat::Toml).required(true)),
            None,
        )
    }

    /// Build from an optional file plus an environment overlay.
    ///
    /// `env` replaces the process environment; used by tests.
    fn build(
        file: Option<File<config::FileSourceFile, FileFormat>>,
        env: Option<HashMap<String, String>>,
    ) -> Result<PackfsConfig, ConfigError> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(file);
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(env),
        );
        builder.build()?.try_deserialize()
    }
}
