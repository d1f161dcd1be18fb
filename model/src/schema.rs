//! Field schema
//!
//! Every item type has one ordered table of [`FieldDescriptor`]s. The table
//! decides which attributes exist, their defaults (for top-level objects and
//! for sub-objects such as sub-profiles), their kind and the values they
//! accept. Items store exactly the fields their table names.

use crate::convert;
use crate::item::ItemType;
use crate::value::{Inheritable, Mapping, Value, INHERIT};
use crate::{Error, Result};
use indexmap::IndexMap;

/// Semantic type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    Int,
    Float,
    Bool,
    List,
    Dict,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Str => write!(f, "str"),
            FieldKind::Int => write!(f, "int"),
            FieldKind::Float => write!(f, "float"),
            FieldKind::Bool => write!(f, "bool"),
            FieldKind::List => write!(f, "list"),
            FieldKind::Dict => write!(f, "dict"),
        }
    }
}

/// Default of a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Str(&'static str),
    Int(i64),
    Float(f64),
    Bool(bool),
    EmptyList,
    EmptyDict,
    /// Resolve from the ancestor chain
    Inherit,
    /// Copy the named settings key when the item is created
    Setting(&'static str),
}

impl DefaultValue {
    /// Materialize the default; settings-backed defaults read `settings`
    pub fn materialize(&self, settings: &Mapping) -> Inheritable<Value> {
        match self {
            DefaultValue::Inherit => Inheritable::Inherit,
            other => Inheritable::Value(other.concrete(settings).unwrap_or_default()),
        }
    }

    /// The concrete default, or `None` for [`DefaultValue::Inherit`]
    pub fn concrete(&self, settings: &Mapping) -> Option<Value> {
        match self {
            DefaultValue::Str(s) => Some(Value::from(*s)),
            DefaultValue::Int(i) => Some(Value::Int(*i)),
            DefaultValue::Float(x) => Some(Value::Float(*x)),
            DefaultValue::Bool(b) => Some(Value::Bool(*b)),
            DefaultValue::EmptyList => Some(Value::List(Vec::new())),
            DefaultValue::EmptyDict => Some(Value::Dict(Mapping::new())),
            DefaultValue::Inherit => None,
            DefaultValue::Setting(key) => Some(settings.get(*key).cloned().unwrap_or_default()),
        }
    }
}

/// Description of one field of an item type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub default: DefaultValue,
    pub subobject_default: DefaultValue,
    pub display_name: &'static str,
    pub editable: bool,
    pub tooltip: &'static str,
    pub allowed_values: &'static [&'static str],
    pub kind: FieldKind,
}

impl FieldDescriptor {
    const fn new(name: &'static str, kind: FieldKind, default: DefaultValue) -> Self {
        Self {
            name,
            default,
            subobject_default: default,
            display_name: name,
            editable: true,
            tooltip: "",
            allowed_values: &[],
            kind,
        }
    }

    const fn sub(self, subobject_default: DefaultValue) -> Self {
        Self {
            subobject_default,
            ..self
        }
    }

    const fn display(self, display_name: &'static str, tooltip: &'static str) -> Self {
        Self {
            display_name,
            tooltip,
            ..self
        }
    }

    const fn allowed(self, allowed_values: &'static [&'static str]) -> Self {
        Self {
            allowed_values,
            ..self
        }
    }

    const fn read_only(self) -> Self {
        Self {
            editable: false,
            ..self
        }
    }

    /// Default for a top-level object or a sub-object
    pub fn default_for(&self, is_subobject: bool) -> DefaultValue {
        if is_subobject {
            self.subobject_default
        } else {
            self.default
        }
    }
}

use DefaultValue as D;
use FieldKind as K;

const fn str_field(name: &'static str, default: DefaultValue) -> FieldDescriptor {
    FieldDescriptor::new(name, K::Str, default)
}
const fn int_field(name: &'static str, default: DefaultValue) -> FieldDescriptor {
    FieldDescriptor::new(name, K::Int, default)
}
const fn float_field(name: &'static str, default: DefaultValue) -> FieldDescriptor {
    FieldDescriptor::new(name, K::Float, default)
}
const fn bool_field(name: &'static str, default: DefaultValue) -> FieldDescriptor {
    FieldDescriptor::new(name, K::Bool, default)
}
const fn list_field(name: &'static str, default: DefaultValue) -> FieldDescriptor {
    FieldDescriptor::new(name, K::List, default)
}
const fn dict_field(name: &'static str, default: DefaultValue) -> FieldDescriptor {
    FieldDescriptor::new(name, K::Dict, default)
}

const ARCHES: &[&str] = &[
    "i386", "x86_64", "ia64", "ppc", "ppc64", "ppc64le", "ppc64el", "s390", "s390x", "arm",
    "aarch64",
];
const REPO_ARCHES: &[&str] = &[
    "", "i386", "x86_64", "ia64", "ppc", "ppc64", "ppc64le", "ppc64el", "s390", "s390x", "arm",
    "aarch64", "noarch", "src",
];
const BREEDS: &[&str] = &[
    "redhat", "debian", "ubuntu", "suse", "vmware", "xen", "freebsd", "windows", "unix",
    "generic",
];
const REPO_BREEDS: &[&str] = &["", "rsync", "rhn", "yum", "apt", "wget"];
const VIRT_TYPES: &[&str] = &["auto", "xenpv", "xenfv", "qemu", "kvm", "vmware", "openvz"];
const VIRT_DISK_DRIVERS: &[&str] = &["raw", "qcow2", "qed", "vdi", "vmdk"];
const IMAGE_TYPES: &[&str] = &["direct", "iso", "memdisk", "virt-clone"];
const SYSTEM_STATUSES: &[&str] = &["", "development", "testing", "acceptance", "production"];
const INTERFACE_TYPES: &[&str] = &[
    "", "na", "bond", "bond_slave", "bridge", "bridge_slave", "bonded_bridge_slave", "bmc",
    "infiniband", "master", "slave",
];

/// Identity fields every type carries
///
/// These live on the item struct itself rather than in its field map.
pub const IDENTITY_FIELDS: &[&str] = &["name", "uid", "ctime", "mtime", "depth"];

const NAME: FieldDescriptor = str_field("name", D::Str("")).display("Name", "Ex: vanhalen.example.org");
const UID: FieldDescriptor = str_field("uid", D::Str("")).read_only();
const CTIME: FieldDescriptor = float_field("ctime", D::Float(0.0)).read_only();
const MTIME: FieldDescriptor = float_field("mtime", D::Float(0.0)).read_only();
const DEPTH: FieldDescriptor = int_field("depth", D::Int(0)).read_only();
const COMMENT: FieldDescriptor = str_field("comment", D::Str("")).display("Comment", "Free form text description");
const OWNERS: FieldDescriptor = list_field("owners", D::Setting("default_ownership"))
    .sub(D::Inherit)
    .display("Owners", "Owners list for authz_ownership (space delimited)");

/// Distro fields
pub static DISTRO_FIELDS: &[FieldDescriptor] = &[
    NAME,
    UID,
    CTIME,
    MTIME,
    DEPTH,
    OWNERS,
    COMMENT,
    str_field("arch", D::Str("x86_64")).allowed(ARCHES).display("Architecture", ""),
    dict_field("autoinstall_meta", D::EmptyDict).display("Automatic Installation Template Metadata", "Ex: dog=fang agent=86"),
    dict_field("boot_files", D::EmptyDict).display("TFTP Boot Files", "Files copied into tftpboot beyond the kernel/initrd"),
    str_field("breed", D::Str("redhat")).allowed(BREEDS).display("Breed", "What is the type of distribution?"),
    dict_field("fetchable_files", D::EmptyDict).display("Fetchable Files", "Templates for tftp or wget/curl"),
    str_field("initrd", D::Str("")).display("Initrd", "Absolute path to initrd on filesystem"),
    str_field("kernel", D::Str("")).display("Kernel", "Absolute path to kernel on filesystem"),
    dict_field("kernel_options", D::EmptyDict).display("Kernel Options", "Ex: selinux=permissive"),
    dict_field("kernel_options_post", D::EmptyDict).display("Kernel Options (Post Install)", "Ex: clocksource=pit noapic"),
    list_field("mgmt_classes", D::EmptyList).display("Management Classes", "Management classes for external config management"),
    str_field("os_version", D::Str("")).display("OS Version", "Needed for some virtualization optimizations"),
    str_field("redhat_management_key", D::Str("")).display("Redhat Management Key", "Registration key for RHN, Spacewalk, or Satellite"),
    str_field("remote_boot_initrd", D::Str("")).display("Remote Boot Initrd", "URL the bootloader fetches the initrd from"),
    str_field("remote_boot_kernel", D::Str("")).display("Remote Boot Kernel", "URL the bootloader fetches the kernel from"),
    list_field("source_repos", D::EmptyList).read_only(),
    dict_field("template_files", D::EmptyDict).display("Template Files", "File mappings for built-in config management"),
];

/// Profile fields; sub-profiles inherit nearly everything by default
pub static PROFILE_FIELDS: &[FieldDescriptor] = &[
    NAME,
    UID,
    CTIME,
    MTIME,
    DEPTH,
    OWNERS,
    COMMENT,
    str_field("autoinstall", D::Setting("default_autoinstall")).sub(D::Inherit).display("Automatic Installation Template", "Path to automatic installation template"),
    dict_field("autoinstall_meta", D::EmptyDict).sub(D::Inherit).display("Automatic Installation Metadata", "Ex: dog=fang agent=86"),
    dict_field("boot_files", D::EmptyDict).sub(D::Inherit).display("TFTP Boot Files", "Files copied into tftpboot beyond the kernel/initrd"),
    str_field("dhcp_tag", D::Str("default")).sub(D::Inherit).display("DHCP Tag", "See manpage or leave blank"),
    str_field("distro", D::Str("")).sub(D::Inherit).display("Distribution", "Parent distribution"),
    bool_field("enable_gpxe", D::Setting("enable_gpxe")).sub(D::Inherit).display("Enable gPXE?", "Use gPXE instead of PXELINUX for advanced booting options"),
    bool_field("enable_menu", D::Setting("enable_menu")).sub(D::Inherit).display("Enable PXE Menu?", "Show this profile in the PXE menu?"),
    dict_field("fetchable_files", D::EmptyDict).sub(D::Inherit).display("Fetchable Files", "Templates for tftp or wget/curl"),
    dict_field("kernel_options", D::EmptyDict).sub(D::Inherit).display("Kernel Options", "Ex: selinux=permissive"),
    dict_field("kernel_options_post", D::EmptyDict).sub(D::Inherit).display("Kernel Options (Post Install)", "Ex: clocksource=pit noapic"),
    list_field("mgmt_classes", D::EmptyList).sub(D::Inherit).display("Management Classes", "For external configuration management"),
    dict_field("mgmt_parameters", D::Inherit).display("Management Parameters", "Parameters which will be handed to your management application"),
    list_field("name_servers", D::Setting("default_name_servers")).sub(D::EmptyList).display("Name Servers", "space delimited"),
    list_field("name_servers_search", D::Setting("default_name_servers_search")).sub(D::EmptyList).display("Name Servers Search Path", "space delimited"),
    str_field("next_server", D::Inherit).display("Next Server Override", "See manpage or leave blank"),
    str_field("parent", D::Str("")).display("Parent Profile", ""),
    str_field("proxy", D::Setting("proxy_url_int")).sub(D::Inherit).display("Proxy", "Proxy URL"),
    str_field("redhat_management_key", D::Inherit).display("Red Hat Management Key", "Registration key for RHN, Spacewalk, or Satellite"),
    list_field("repos", D::EmptyList).sub(D::Inherit).display("Repos", "Repos to auto-assign to this profile"),
    str_field("server", D::Inherit).display("Server Override", "See manpage or leave blank"),
    dict_field("template_files", D::EmptyDict).sub(D::Inherit).display("Template Files", "File mappings for built-in config management"),
    bool_field("virt_auto_boot", D::Setting("virt_auto_boot")).sub(D::Inherit).display("Virt Auto Boot", "Auto boot this VM?"),
    str_field("virt_bridge", D::Setting("default_virt_bridge")).sub(D::Inherit).display("Virt Bridge", ""),
    int_field("virt_cpus", D::Int(1)).sub(D::Inherit).display("Virt CPUs", "integer"),
    str_field("virt_disk_driver", D::Setting("default_virt_disk_driver")).sub(D::Inherit).allowed(VIRT_DISK_DRIVERS).display("Virt Disk Driver Type", "The on-disk format for the virtualization disk"),
    float_field("virt_file_size", D::Setting("default_virt_file_size")).sub(D::Inherit).display("Virt File Size(GB)", ""),
    str_field("virt_path", D::Str("")).sub(D::Inherit).display("Virt Path", "Ex: /directory OR VolGroup00"),
    int_field("virt_ram", D::Setting("default_virt_ram")).sub(D::Inherit).display("Virt RAM (MB)", ""),
    str_field("virt_type", D::Setting("default_virt_type")).sub(D::Inherit).allowed(VIRT_TYPES).display("Virt Type", "Virtualization technology to use"),
];

/// System fields (per-interface fields are in [`INTERFACE_FIELDS`])
pub static SYSTEM_FIELDS: &[FieldDescriptor] = &[
    NAME,
    UID,
    CTIME,
    MTIME,
    DEPTH,
    OWNERS,
    COMMENT,
    str_field("autoinstall", D::Inherit).display("Automatic Installation Template", "Path to automatic installation template"),
    dict_field("autoinstall_meta", D::EmptyDict).display("Automatic Installation Template Metadata", "Ex: dog=fang agent=86"),
    dict_field("boot_files", D::EmptyDict).display("TFTP Boot Files", "Files copied into tftpboot beyond the kernel/initrd"),
    bool_field("enable_gpxe", D::Inherit).display("Enable gPXE?", "Use gPXE instead of PXELINUX for advanced booting options"),
    dict_field("fetchable_files", D::EmptyDict).display("Fetchable Files", "Templates for tftp or wget/curl"),
    str_field("gateway", D::Str("")).display("Gateway", ""),
    str_field("hostname", D::Str("")).display("Hostname", ""),
    str_field("image", D::Str("")).display("Image", "Parent image (if not a profile)"),
    bool_field("ipv6_autoconfiguration", D::Bool(false)).display("IPv6 Autoconfiguration", ""),
    str_field("ipv6_default_device", D::Str("")).display("IPv6 Default Device", ""),
    dict_field("kernel_options", D::EmptyDict).display("Kernel Options", "Ex: selinux=permissive"),
    dict_field("kernel_options_post", D::EmptyDict).display("Kernel Options (Post Install)", "Ex: clocksource=pit noapic"),
    list_field("mgmt_classes", D::Inherit).display("Management Classes", "For external config management"),
    dict_field("mgmt_parameters", D::Inherit).display("Management Parameters", "Parameters which will be handed to your management application"),
    list_field("name_servers", D::EmptyList).display("Name Servers", "space delimited"),
    list_field("name_servers_search", D::EmptyList).display("Name Servers Search Path", "space delimited"),
    bool_field("netboot_enabled", D::Bool(true)).display("Netboot Enabled", "PXE (re)install this machine at next boot?"),
    str_field("next_server", D::Inherit).display("Next Server Override", "See manpage or leave blank"),
    str_field("power_address", D::Str("")).display("Power Management Address", "Ex: power-device.example.org"),
    str_field("power_id", D::Str("")).display("Power Management ID", "Usually a plug number or blade name, if power type requires it"),
    str_field("power_pass", D::Str("")).display("Power Management Password", ""),
    str_field("power_type", D::Setting("power_management_default_type")).display("Power Management Type", "Power management script to use"),
    str_field("power_user", D::Str("")).display("Power Management Username", ""),
    str_field("profile", D::Str("")).display("Profile", "Parent profile"),
    str_field("proxy", D::Inherit).display("Internal Proxy", "Internal proxy URL"),
    str_field("redhat_management_key", D::Inherit).display("Redhat Management Key", "Registration key for RHN, Spacewalk, or Satellite"),
    str_field("server", D::Inherit).display("Server Override", "See manpage or leave blank"),
    str_field("status", D::Str("production")).allowed(SYSTEM_STATUSES).display("Status", "System status"),
    dict_field("template_files", D::EmptyDict).display("Template Files", "File mappings for built-in configuration management"),
    bool_field("virt_auto_boot", D::Inherit).display("Virt Auto Boot", "Auto boot this VM?"),
    int_field("virt_cpus", D::Inherit).display("Virt CPUs", ""),
    str_field("virt_disk_driver", D::Inherit).allowed(VIRT_DISK_DRIVERS).display("Virt Disk Driver Type", "The on-disk format for the virtualization disk"),
    float_field("virt_file_size", D::Inherit).display("Virt File Size(GB)", ""),
    str_field("virt_path", D::Inherit).display("Virt Path", "Ex: /directory or VolGroup00"),
    bool_field("virt_pxe_boot", D::Bool(false)).display("Virt PXE Boot", "Use PXE to build this VM?"),
    int_field("virt_ram", D::Inherit).display("Virt RAM (MB)", ""),
    str_field("virt_type", D::Inherit).allowed(VIRT_TYPES).display("Virt Type", "Virtualization technology to use"),
];

/// Per-interface fields of a System
pub static INTERFACE_FIELDS: &[FieldDescriptor] = &[
    list_field("cnames", D::EmptyList).display("CNAMES", "Cannonical Name Records, should be used with --dns-name"),
    bool_field("connected_mode", D::Bool(false)).display("InfiniBand Connected Mode", ""),
    str_field("dhcp_tag", D::Str("")).display("DHCP Tag", ""),
    str_field("dns_name", D::Str("")).display("DNS Name", ""),
    str_field("bonding_opts", D::Str("")).display("Bonding Opts", ""),
    str_field("bridge_opts", D::Str("")).display("Bridge Opts", ""),
    str_field("if_gateway", D::Str("")).display("Per-Interface Gateway", ""),
    str_field("interface_master", D::Str("")).display("Master Interface", ""),
    str_field("interface_type", D::Str("")).allowed(INTERFACE_TYPES).display("Interface Type", ""),
    str_field("ip_address", D::Str("")).display("IP Address", "Should be used with --interface"),
    str_field("ipv6_address", D::Str("")).display("IPv6 Address", ""),
    str_field("ipv6_default_gateway", D::Str("")).display("IPv6 Default Gateway", ""),
    str_field("ipv6_mtu", D::Str("")).display("IPv6 MTU", ""),
    str_field("ipv6_prefix", D::Str("")).display("IPv6 Prefix", ""),
    list_field("ipv6_secondaries", D::EmptyList).display("IPv6 Secondaries", "Space delimited"),
    list_field("ipv6_static_routes", D::EmptyList).display("IPv6 Static Routes", ""),
    str_field("mac_address", D::Str("")).display("MAC Address", "(Place \"random\" in this field for a random MAC Address.)"),
    bool_field("management", D::Bool(false)).display("Management Interface", "Is this the management interface?"),
    str_field("mtu", D::Str("")).display("MTU", ""),
    str_field("netmask", D::Str("")).display("Subnet Mask", ""),
    bool_field("static", D::Bool(false)).display("Static", "Is this interface static?"),
    list_field("static_routes", D::EmptyList).display("Static Routes", ""),
    str_field("virt_bridge", D::Str("")).display("Virt Bridge", ""),
];

/// Repo fields
pub static REPO_FIELDS: &[FieldDescriptor] = &[
    NAME,
    UID,
    CTIME,
    MTIME,
    DEPTH,
    OWNERS,
    COMMENT,
    list_field("apt_components", D::EmptyList).display("Apt Components (apt only)", "ex: main restricted universe"),
    list_field("apt_dists", D::EmptyList).display("Apt Dist Names (apt only)", "ex: precise precise-updates"),
    str_field("arch", D::Str("")).allowed(REPO_ARCHES).display("Arch", "ex: i386, x86_64"),
    str_field("breed", D::Str("")).allowed(REPO_BREEDS).display("Breed", ""),
    str_field("createrepo_flags", D::Setting("createrepo_flags")).display("Createrepo Flags", "Flags to use with createrepo"),
    dict_field("environment", D::EmptyDict).display("Environment Variables", "Use these environment variables during commands (key=value, space delimited)"),
    bool_field("keep_updated", D::Bool(true)).display("Keep Updated", "Update this repo on next 'cobbler reposync'?"),
    str_field("mirror", D::Str("")).display("Mirror", "Address of yum or rsync repo to mirror"),
    bool_field("mirror_locally", D::Bool(true)).display("Mirror locally", "Copy files or just reference the repo externally?"),
    str_field("os_version", D::Str("")).display("OS Version", "Used for some virtualization optimizations"),
    int_field("priority", D::Int(99)).display("Priority", "Value for yum priorities plugin, if installed"),
    str_field("proxy", D::Setting("proxy_url_ext")).display("Proxy information", "http://example.com:8080, or <<inherit>> to use proxy_url_ext from settings"),
    list_field("rpm_list", D::EmptyList).display("RPM List", "Mirror just these RPMs (yum only)"),
    dict_field("yumopts", D::EmptyDict).display("Yum Options", "Options to write to yum config file"),
];

/// Image fields
pub static IMAGE_FIELDS: &[FieldDescriptor] = &[
    NAME,
    UID,
    CTIME,
    MTIME,
    DEPTH,
    OWNERS,
    COMMENT,
    str_field("arch", D::Str("x86_64")).allowed(ARCHES).display("Architecture", ""),
    str_field("autoinstall", D::Str("")).display("Automatic installation file", "Path to autoinst/answer file template"),
    str_field("breed", D::Str("redhat")).allowed(BREEDS).display("Breed", ""),
    str_field("file", D::Str("")).display("File", "Path to local file or nfs://user@host:path"),
    str_field("image_type", D::Str("iso")).allowed(IMAGE_TYPES).display("Image Type", ""),
    int_field("network_count", D::Int(1)).display("Virt NICs", ""),
    str_field("os_version", D::Str("")).display("OS Version", "ex: rhel4"),
    bool_field("virt_auto_boot", D::Setting("virt_auto_boot")).display("Virt Auto Boot", "Auto boot this VM?"),
    str_field("virt_bridge", D::Setting("default_virt_bridge")).display("Virt Bridge", ""),
    int_field("virt_cpus", D::Int(1)).display("Virt CPUs", ""),
    str_field("virt_disk_driver", D::Setting("default_virt_disk_driver")).allowed(VIRT_DISK_DRIVERS).display("Virt Disk Driver Type", ""),
    float_field("virt_file_size", D::Setting("default_virt_file_size")).display("Virt File Size (GB)", ""),
    str_field("virt_path", D::Str("")).display("Virt Path", "Ex: /directory or VolGroup00"),
    int_field("virt_ram", D::Setting("default_virt_ram")).display("Virt RAM (MB)", ""),
    str_field("virt_type", D::Setting("default_virt_type")).allowed(VIRT_TYPES).display("Virt Type", ""),
];

/// Network fields
pub static NETWORK_FIELDS: &[FieldDescriptor] = &[
    NAME,
    UID,
    CTIME,
    MTIME,
    DEPTH,
    OWNERS,
    COMMENT,
    str_field("address", D::Str("")).display("Address", "Network address"),
    str_field("broadcast", D::Str("")).display("Broadcast", "Broadcast address"),
    str_field("cidr", D::Str("")).display("CIDR", "CIDR representation of the network"),
    list_field("free_addresses", D::EmptyList).read_only(),
    str_field("gateway", D::Str("")).display("Gateway", "Default gateway for this network"),
    list_field("name_servers", D::EmptyList).display("Name Servers", "Name servers for this network"),
    list_field("reserved", D::EmptyList).display("Reserved", "Addresses handed out by something else"),
    list_field("used_addresses", D::EmptyList).read_only(),
];

/// Legacy and command-line spellings accepted by setters
const FIELD_ALIASES: &[(&str, &str)] = &[
    ("kickstart", "autoinstall"),
    ("ks_meta", "autoinstall_meta"),
    ("ksmeta", "autoinstall_meta"),
    ("kopts", "kernel_options"),
    ("kopts_post", "kernel_options_post"),
    ("inherit", "parent"),
];

/// Extra spellings accepted only when searching
const SEARCH_ALIASES: &[(&str, &str)] = &[
    ("ip", "ip_address"),
    ("mac", "mac_address"),
    ("subnet", "netmask"),
    ("bonding", "interface_type"),
    ("bonding_master", "interface_master"),
];

/// Dict fields that take repeated keys as a list of values
const MULTI_VALUE_DICTS: &[&str] = &["kernel_options", "kernel_options_post"];

/// The field table of an item type
pub fn fields(kind: ItemType) -> &'static [FieldDescriptor] {
    match kind {
        ItemType::Distro => DISTRO_FIELDS,
        ItemType::Profile => PROFILE_FIELDS,
        ItemType::System => SYSTEM_FIELDS,
        ItemType::Repo => REPO_FIELDS,
        ItemType::Image => IMAGE_FIELDS,
        ItemType::Network => NETWORK_FIELDS,
    }
}

/// Look up a field descriptor by its canonical name
pub fn descriptor(kind: ItemType, name: &str) -> Option<&'static FieldDescriptor> {
    fields(kind).iter().find(|d| d.name == name)
}

/// Look up an interface field descriptor
pub fn interface_descriptor(name: &str) -> Option<&'static FieldDescriptor> {
    INTERFACE_FIELDS.iter().find(|d| d.name == name)
}

/// Map a legacy or command-line field spelling to its canonical name
pub fn canonical_name(name: &str) -> &str {
    FIELD_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map_or(name, |(_, canonical)| *canonical)
}

/// Map a search key to the field it names
///
/// Accepts everything [`canonical_name`] does plus dashed spellings,
/// `ip`/`mac` shorthands and deprecated interface field names.
pub fn search_key(key: &str) -> String {
    let key = key.replace('-', "_");
    let key = SEARCH_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map_or(key.as_str(), |(_, canonical)| *canonical);
    canonical_name(key).to_string()
}

/// Default values of every field of a type
pub fn defaults(
    kind: ItemType,
    is_subobject: bool,
    settings: &Mapping,
) -> IndexMap<&'static str, Inheritable<Value>> {
    fields(kind)
        .iter()
        .map(|d| (d.name, d.default_for(is_subobject).materialize(settings)))
        .collect()
}

/// Type-check and normalize raw input for a field
///
/// Returns the canonical stored form. The inherit marker string is accepted
/// for every field and becomes [`Inheritable::Inherit`].
pub fn validate(kind: ItemType, name: &str, raw: &Value) -> Result<Inheritable<Value>> {
    let name = canonical_name(name);
    let descriptor = descriptor(kind, name)
        .ok_or_else(|| Error::invalid_field(name, format!("{} has no such field", kind)))?;
    validate_with(descriptor, raw)
}

/// Type-check and normalize raw input against a descriptor
pub fn validate_with(descriptor: &FieldDescriptor, raw: &Value) -> Result<Inheritable<Value>> {
    let name = descriptor.name;
    if raw.as_str() == Some(INHERIT) {
        return Ok(Inheritable::Inherit);
    }

    let value = match descriptor.kind {
        FieldKind::Str => match raw {
            Value::Null => Value::Str(String::new()),
            Value::Str(s) => Value::Str(s.trim().to_string()),
            Value::Bool(_) | Value::Int(_) | Value::Float(_) => Value::Str(raw.to_string()),
            other => {
                return Err(Error::invalid_field(
                    name,
                    format!("expected a string, got '{}'", other),
                ))
            }
        },
        FieldKind::Int => Value::Int(parse_int(name, raw)?),
        FieldKind::Float => Value::Float(parse_float(name, raw)?),
        FieldKind::Bool => Value::Bool(convert::input_boolean(raw)),
        FieldKind::List => return convert::string_or_list(name, raw),
        FieldKind::Dict => {
            return convert::string_or_dict(name, raw, MULTI_VALUE_DICTS.contains(&name))
        }
    };

    if let Value::Str(s) = &value {
        if !descriptor.allowed_values.is_empty() && !descriptor.allowed_values.contains(&s.as_str())
        {
            return Err(Error::invalid_field(
                name,
                format!(
                    "'{}' is not one of: {}",
                    s,
                    descriptor.allowed_values.join(", ")
                ),
            ));
        }
    }

    Ok(Inheritable::Value(value))
}

fn parse_int(name: &str, raw: &Value) -> Result<i64> {
    match raw {
        Value::Int(i) => Ok(*i),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Float(x) if x.fract() == 0.0 => Ok(*x as i64),
        Value::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| Error::invalid_field(name, format!("'{}' is not an integer", s))),
        other => Err(Error::invalid_field(
            name,
            format!("'{}' is not an integer", other),
        )),
    }
}

fn parse_float(name: &str, raw: &Value) -> Result<f64> {
    match raw {
        Value::Float(x) => Ok(*x),
        Value::Int(i) => Ok(*i as f64),
        Value::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| Error::invalid_field(name, format!("'{}' is not a number", s))),
        other => Err(Error::invalid_field(
            name,
            format!("'{}' is not a number", other),
        )),
    }
}
