//! Settings loading utilities
//!
//! Loads `settings.toml` from a configuration root, optionally layering a
//! second file over it table by table.

use crate::paths::SETTINGS_FILE;
use crate::{ConfigError, Result, Settings};
use std::path::{Path, PathBuf};

/// Loader for server settings
pub struct ConfigLoader {
    /// Root path for configuration
    root: PathBuf,
    /// Whether to use default values for missing configs
    use_defaults: bool,
    /// Whether to validate settings after loading
    validate: bool,
}

impl ConfigLoader {
    /// Create a new settings loader
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            use_defaults: true,
            validate: true,
        }
    }

    /// Create a loader for the default system configuration
    pub fn system() -> Self {
        Self::new(crate::paths::system_config())
    }

    /// Set whether to use defaults for missing configs
    pub fn use_defaults(mut self, use_defaults: bool) -> Self {
        self.use_defaults = use_defaults;
        self
    }

    /// Set whether to validate settings
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Load the settings
    pub fn load(&self) -> Result<Settings> {
        let table = self.load_base_table()?;
        self.finish(table)
    }

    /// Load settings with an overlay file merged over the base
    pub fn load_with_overlay(&self, overlay: &Path) -> Result<Settings> {
        let mut table = self.load_base_table()?;

        if overlay.exists() {
            let overlay_table = read_table(overlay)?;
            merge_tables(&mut table, overlay_table);
        } else {
            tracing::warn!("Settings overlay does not exist: {}", overlay.display());
        }

        self.finish(table)
    }

    /// Get the configuration root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the settings file inside the root
    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    fn load_base_table(&self) -> Result<toml::Table> {
        let path = self.settings_path();
        if !path.exists() {
            if self.use_defaults {
                return Ok(toml::Table::new());
            }
            return Err(ConfigError::NotFound(path));
        }
        read_table(&path)
    }

    fn finish(&self, table: toml::Table) -> Result<Settings> {
        let settings: Settings = toml::Value::Table(table).try_into()?;

        if self.validate {
            validate_settings(&settings)?;
        }

        Ok(settings)
    }
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let content = std::fs::read_to_string(path)?;
    Ok(content.parse::<toml::Table>()?)
}

/// Merge `overlay` into `base`; nested tables merge, everything else replaces
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Validate settings for common issues
fn validate_settings(settings: &Settings) -> Result<()> {
    settings.validate()?;

    if settings.allow_duplicate_macs {
        tracing::warn!("allow_duplicate_macs is enabled; DHCP may hand out conflicting leases");
    }
    if settings.allow_duplicate_ips {
        tracing::warn!("allow_duplicate_ips is enabled; DNS records may collide");
    }
    if settings.server == "127.0.0.1" {
        tracing::warn!("server is 127.0.0.1; installing systems will not reach it");
    }

    Ok(())
}
