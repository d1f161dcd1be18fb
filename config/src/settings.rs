//! Server-wide settings
//!
//! Field names are part of the resolved-mapping contract: templates and
//! generators read keys such as `server`, `http_port` or
//! `default_virt_bridge` straight out of a blended item, so they must not be
//! renamed.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{ConfigError, Result};

/// Server settings (settings.toml)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Address clients use to reach the provisioning server
    pub server: String,
    /// TFTP server handed out by DHCP
    pub next_server: String,
    /// Port the web server listens on
    pub http_port: u16,
    /// Owners assigned to newly created objects
    pub default_ownership: Vec<String>,
    /// Autoinstall template used when a profile names none
    pub default_autoinstall: String,
    /// Name servers used when a profile names none
    pub default_name_servers: Vec<String>,
    /// DNS search domains used when a profile names none
    pub default_name_servers_search: Vec<String>,
    /// Bridge for new virtual guests
    pub default_virt_bridge: String,
    /// Disk driver for new virtual guests
    pub default_virt_disk_driver: String,
    /// Disk size (GB) for new virtual guests
    pub default_virt_file_size: f64,
    /// Memory (MB) for new virtual guests
    pub default_virt_ram: u64,
    /// Hypervisor type for new virtual guests
    pub default_virt_type: String,
    /// Whether profiles chainload gPXE by default
    pub enable_gpxe: bool,
    /// Whether profiles appear in the PXE menu by default
    pub enable_menu: bool,
    /// Default power management driver for systems
    pub power_management_default_type: String,
    /// Red Hat management server
    pub redhat_management_server: String,
    /// Flags passed to createrepo for mirrored repos
    pub createrepo_flags: String,
    /// Proxy used when mirroring external repos
    pub proxy_url_ext: String,
    /// Proxy handed to installing systems
    pub proxy_url_int: String,
    /// Allow two systems to share a MAC address
    pub allow_duplicate_macs: bool,
    /// Allow two systems to share an IP address
    pub allow_duplicate_ips: bool,
    /// Allow two systems to share a DNS name
    pub allow_duplicate_hostnames: bool,
    /// Configuration management classes applied everywhere
    pub mgmt_classes: Vec<String>,
    /// Configuration management parameters applied everywhere
    pub mgmt_parameters: IndexMap<String, String>,
    /// Kernel options applied to every distro
    pub kernel_options: IndexMap<String, String>,
    /// Whether virtual guests start on host boot by default
    pub virt_auto_boot: bool,
    /// Web root for served content
    pub webdir: String,
    /// TFTP root
    pub tftpboot_location: String,
}

impl Default for Settings {
    fn default() -> Self {
        let mut mgmt_parameters = IndexMap::new();
        mgmt_parameters.insert("from_cobbler".to_string(), "1".to_string());

        Self {
            server: "127.0.0.1".to_string(),
            next_server: "127.0.0.1".to_string(),
            http_port: 80,
            default_ownership: vec!["admin".to_string()],
            default_autoinstall: "/var/lib/cobbler/templates/default.ks".to_string(),
            default_name_servers: Vec::new(),
            default_name_servers_search: Vec::new(),
            default_virt_bridge: "xenbr0".to_string(),
            default_virt_disk_driver: "raw".to_string(),
            default_virt_file_size: 5.0,
            default_virt_ram: 512,
            default_virt_type: "auto".to_string(),
            enable_gpxe: false,
            enable_menu: true,
            power_management_default_type: "ipmilanplus".to_string(),
            redhat_management_server: "xmlrpc.rhn.redhat.com".to_string(),
            createrepo_flags: "-c cache -s sha".to_string(),
            proxy_url_ext: String::new(),
            proxy_url_int: String::new(),
            allow_duplicate_macs: false,
            allow_duplicate_ips: false,
            allow_duplicate_hostnames: false,
            mgmt_classes: Vec::new(),
            mgmt_parameters,
            kernel_options: IndexMap::new(),
            virt_auto_boot: true,
            webdir: "/var/www/cobbler".to_string(),
            tftpboot_location: "/var/lib/tftpboot".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from a TOML string; unset keys keep their defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize settings to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Address for the web server as clients see it
    pub fn http_server(&self) -> String {
        if self.http_port == 80 {
            self.server.clone()
        } else {
            format!("{}:{}", self.server, self.http_port)
        }
    }

    /// Check the settings for values nothing downstream could use
    pub fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            return Err(ConfigError::Invalid("server must not be empty".to_string()));
        }
        if self.http_port == 0 {
            return Err(ConfigError::Invalid("http_port must not be 0".to_string()));
        }
        if self.default_virt_file_size < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "default_virt_file_size must not be negative: {}",
                self.default_virt_file_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server, "127.0.0.1");
        assert_eq!(settings.http_port, 80);
        assert_eq!(settings.default_ownership, vec!["admin".to_string()]);
        assert_eq!(
            settings.mgmt_parameters.get("from_cobbler").map(String::as_str),
            Some("1")
        );
        settings.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml("server = \"cobbler.example.org\"\nhttp_port = 8080\n")
            .unwrap();
        assert_eq!(settings.server, "cobbler.example.org");
        assert_eq!(settings.http_port, 8080);
        assert_eq!(settings.default_virt_bridge, "xenbr0");
    }

    #[test]
    fn test_http_server() {
        let mut settings = Settings::default();
        assert_eq!(settings.http_server(), "127.0.0.1");
        settings.http_port = 8080;
        assert_eq!(settings.http_server(), "127.0.0.1:8080");
    }

    #[test]
    fn test_validate_rejects_empty_server() {
        let settings = Settings {
            server: "  ".to_string(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let settings = Settings::default();
        let text = settings.to_toml().unwrap();
        assert_eq!(Settings::from_toml(&text).unwrap(), settings);
    }
}
