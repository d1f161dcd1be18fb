//! Cobbler server settings
//!
//! Settings are the implicit root of every inheritance chain: a Distro,
//! Profile or System that leaves a field inheriting eventually resolves it
//! against these values (either the key itself or its `default_` form).
//!
//! - [`settings`]: the [`Settings`] struct and its stock defaults
//! - [`loader`]: loading `settings.toml` from a configuration root
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cobbler_config::ConfigLoader;
//!
//! let settings = ConfigLoader::system().load().unwrap();
//! println!("serving from {}:{}", settings.server, settings.http_port);
//! ```

pub mod error;
pub mod loader;
pub mod settings;

pub use error::{ConfigError, Result};
pub use loader::ConfigLoader;
pub use settings::Settings;

/// Default paths
pub mod paths {
    use std::path::PathBuf;

    /// System configuration directory
    pub fn system_config() -> PathBuf {
        PathBuf::from("/etc/cobbler")
    }

    /// Name of the settings file inside a configuration root
    pub const SETTINGS_FILE: &str = "settings.toml";
}
