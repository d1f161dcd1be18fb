//! Integration tests for resolving items against their ancestors

use cobbler_config::Settings;
use cobbler_model::*;

fn lab(settings: Settings) -> Inventory {
    let mut inv = Inventory::new(settings).unwrap();

    let mut distro = inv.new_item(ItemType::Distro, "rhel9").unwrap();
    distro.set_field("kernel", "/images/rhel9/vmlinuz").unwrap();
    distro.set_field("initrd", "/images/rhel9/initrd.img").unwrap();
    distro.set_field("kernel_options", "a=1 x=1").unwrap();
    inv.add(distro, AddOptions::default()).unwrap();

    let mut profile = inv.new_item(ItemType::Profile, "web").unwrap();
    profile.set_field("distro", "rhel9").unwrap();
    profile.set_field("kernel_options", "a=2 b=3").unwrap();
    profile.set_field("mgmt_classes", "a b").unwrap();
    inv.add(profile, AddOptions::default()).unwrap();

    let mut system = inv.new_item(ItemType::System, "web01").unwrap();
    system.set_field("profile", "web").unwrap();
    system
        .set_interface_field("eth0", "ip_address", "10.0.0.5")
        .unwrap();
    system
        .set_interface_field("eth0", "mac_address", "aa:bb:cc:dd:ee:05")
        .unwrap();
    inv.add(system, AddOptions::default()).unwrap();

    inv
}

fn dict(value: &Value) -> &Mapping {
    value.as_dict().unwrap()
}

fn contains_inherit_marker(value: &Value) -> bool {
    match value {
        Value::Str(s) => s == INHERIT,
        Value::List(items) => items.iter().any(contains_inherit_marker),
        Value::Dict(map) => map
            .iter()
            .any(|(k, v)| k == INHERIT || contains_inherit_marker(v)),
        _ => false,
    }
}

mod merging {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_later_nodes_override_dict_keys() {
        let inv = lab(Settings::default());
        let profile = inv.blend(ItemType::Profile, "web", false).unwrap();

        let kopts = dict(&profile["kernel_options"]);
        assert_eq!(kopts["a"], Value::from("2"));
        assert_eq!(kopts["b"], Value::from("3"));
        assert_eq!(kopts["x"], Value::from("1"));
    }

    #[test]
    fn test_lists_append_without_repeats() {
        let mut inv = lab(Settings::default());
        let mut sub = inv.new_subprofile("web-sub", "web").unwrap();
        sub.set_field("mgmt_classes", "b c").unwrap();
        inv.add(sub, AddOptions::default()).unwrap();

        let blended = inv.blend(ItemType::Profile, "web-sub", false).unwrap();
        assert_eq!(blended["mgmt_classes"], Value::from(vec!["a", "b", "c"]));
    }

    #[test]
    fn test_first_distro_sticks() {
        let mut inv = lab(Settings::default());
        let mut other = inv.new_item(ItemType::Distro, "rhel8").unwrap();
        other.set_field("kernel", "/images/rhel8/vmlinuz").unwrap();
        other.set_field("initrd", "/images/rhel8/initrd.img").unwrap();
        inv.add(other, AddOptions::default()).unwrap();

        let mut sub = inv.new_subprofile("web-sub", "web").unwrap();
        sub.set_field("distro", "rhel8").unwrap();
        inv.add(sub, AddOptions::default()).unwrap();

        let blended = inv.blend(ItemType::Profile, "web-sub", false).unwrap();
        assert_eq!(blended["distro"], Value::from("rhel9"));
    }

    #[test]
    fn test_bang_keys_remove_inherited_entries() {
        let mut inv = lab(Settings::default());
        inv.set_field_inplace(ItemType::Profile, "web", "kernel_options", "!x")
            .unwrap();

        let system = inv.blend(ItemType::System, "web01", false).unwrap();
        let kopts = dict(&system["kernel_options"]);
        assert!(!kopts.contains_key("x"));
        assert!(!kopts.contains_key("!x"));
        assert_eq!(kopts["a"], Value::from("2"));
    }

    #[test]
    fn test_bang_key_without_target_disappears() {
        let mut inv = lab(Settings::default());
        inv.set_field(ItemType::System, "web01", "kernel_options", "!nothing")
            .unwrap();

        let system = inv.blend(ItemType::System, "web01", false).unwrap();
        assert!(!dict(&system["kernel_options"]).contains_key("!nothing"));
    }

    #[test]
    fn test_blend_is_repeatable() {
        let inv = lab(Settings::default());
        let first = inv.blend(ItemType::System, "web01", false).unwrap();
        let second = inv.blend(ItemType::System, "web01", false).unwrap();
        assert_eq!(first, second);
    }
}

mod inheritance {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_settings_fill_inheriting_fields() {
        let settings = Settings {
            server: "cobbler.lab".to_string(),
            default_virt_ram: 2048,
            ..Default::default()
        };
        let inv = lab(settings);
        let system = inv.blend(ItemType::System, "web01", false).unwrap();

        assert_eq!(system["server"], Value::from("cobbler.lab"));
        assert_eq!(system["virt_ram"], Value::Int(2048));
        assert_eq!(system["owners"], Value::from(vec!["admin"]));
    }

    #[test]
    fn test_concrete_value_beats_settings() {
        let mut inv = lab(Settings::default());
        inv.set_field(ItemType::System, "web01", "server", "10.9.9.9")
            .unwrap();
        let system = inv.blend(ItemType::System, "web01", false).unwrap();
        assert_eq!(system["server"], Value::from("10.9.9.9"));
    }

    #[test]
    fn test_no_inherit_marker_survives() {
        let mut inv = lab(Settings::default());
        let sub = inv.new_subprofile("web-sub", "web").unwrap();
        inv.add(sub, AddOptions::default()).unwrap();
        let mut system = inv.new_item(ItemType::System, "web02").unwrap();
        system.set_field("profile", "web-sub").unwrap();
        inv.add(system, AddOptions::default()).unwrap();

        for (kind, name) in [
            (ItemType::Distro, "rhel9"),
            (ItemType::Profile, "web"),
            (ItemType::Profile, "web-sub"),
            (ItemType::System, "web02"),
        ] {
            let blended = inv.blend(kind, name, false).unwrap();
            for (key, value) in &blended {
                assert!(
                    !contains_inherit_marker(value),
                    "{} {} left {} inheriting",
                    kind,
                    name,
                    key
                );
            }
        }
    }

    #[test]
    fn test_autoinstall_meta_joins_mgmt_parameters() {
        let mut inv = lab(Settings::default());
        inv.set_field(ItemType::Profile, "web", "autoinstall_meta", "site=lab")
            .unwrap();
        let system = inv.blend(ItemType::System, "web01", false).unwrap();

        let params = dict(&system["mgmt_parameters"]);
        assert_eq!(params["from_cobbler"], Value::from("1"));
        assert_eq!(params["site"], Value::from("lab"));
    }

    #[test]
    fn test_missing_item() {
        let inv = lab(Settings::default());
        assert!(matches!(
            inv.blend(ItemType::System, "nope", false),
            Err(Error::NotFound { .. })
        ));
    }
}

mod derived {
    use super::*;
    use pretty_assertions::assert_eq;

    fn add_repo(inv: &mut Inventory, name: &str, priority: i64) {
        let mut repo = inv.new_item(ItemType::Repo, name).unwrap();
        repo.set_field("mirror", format!("http://mirror.lab/{}", name))
            .unwrap();
        repo.set_field("priority", priority).unwrap();
        inv.add(repo, AddOptions::default()).unwrap();
    }

    #[test]
    fn test_repo_data_sorted_by_priority() {
        let mut inv = lab(Settings::default());
        add_repo(&mut inv, "base", 50);
        add_repo(&mut inv, "updates", 99);
        add_repo(&mut inv, "extras", 50);
        inv.set_field(ItemType::Profile, "web", "repos", "base updates extras missing")
            .unwrap();

        let profile = inv.blend(ItemType::Profile, "web", false).unwrap();
        let names: Vec<String> = profile["repo_data"]
            .as_list()
            .unwrap()
            .iter()
            .map(|repo| dict(repo)["name"].to_string())
            .collect();
        assert_eq!(names, vec!["updates", "base", "extras"]);
    }

    #[test]
    fn test_http_server() {
        let inv = lab(Settings::default());
        let system = inv.blend(ItemType::System, "web01", false).unwrap();
        assert_eq!(system["http_server"], Value::from("127.0.0.1"));

        let inv = lab(Settings {
            http_port: 8080,
            ..Default::default()
        });
        let system = inv.blend(ItemType::System, "web01", false).unwrap();
        assert_eq!(system["http_server"], Value::from("127.0.0.1:8080"));
    }

    #[test]
    fn test_interfaces_exploded() {
        let inv = lab(Settings::default());
        let system = inv.blend(ItemType::System, "web01", false).unwrap();
        assert_eq!(system["ip_address_eth0"], Value::from("10.0.0.5"));
        assert_eq!(system["mac_address_eth0"], Value::from("aa:bb:cc:dd:ee:05"));
        assert!(dict(&system["interfaces"]).contains_key("eth0"));
    }

    #[test]
    fn test_aliases() {
        let inv = lab(Settings::default());
        let system = inv.blend(ItemType::System, "web01", false).unwrap();
        assert_eq!(system["system_name"], Value::from("web01"));
        assert_eq!(system["profile_name"], Value::from("web"));
        assert_eq!(system["distro_name"], Value::from("rhel9"));

        let distro = inv.blend(ItemType::Distro, "rhel9", false).unwrap();
        assert_eq!(distro["distro_name"], Value::from("rhel9"));
    }

    #[test]
    fn test_image_based_system() {
        let mut inv = lab(Settings::default());
        let mut image = inv.new_item(ItemType::Image, "appliance").unwrap();
        image.set_field("file", "/srv/appliance.iso").unwrap();
        inv.add(image, AddOptions::default()).unwrap();
        let mut system = inv.new_item(ItemType::System, "kiosk").unwrap();
        system.set_field("image", "appliance").unwrap();
        inv.add(system, AddOptions::default()).unwrap();

        let blended = inv.blend(ItemType::System, "kiosk", false).unwrap();
        assert_eq!(blended["distro_name"], Value::from("N/A"));
        assert_eq!(blended["image_name"], Value::from("appliance"));
        assert_eq!(blended["file"], Value::from("/srv/appliance.iso"));

        let image = inv.blend(ItemType::Image, "appliance", false).unwrap();
        assert!(dict(&image["children"]).contains_key("kiosk"));
    }

    #[test]
    fn test_children_are_resolved() {
        let inv = lab(Settings::default());
        let distro = inv.blend(ItemType::Distro, "rhel9", false).unwrap();
        let children = dict(&distro["children"]);
        let web = dict(&children["web"]);
        assert_eq!(web["distro"], Value::from("rhel9"));
        assert_eq!(web["server"], Value::from("127.0.0.1"));

        let system = inv.blend(ItemType::System, "web01", false).unwrap();
        assert!(!system.contains_key("children"));
    }

    #[test]
    fn test_flatten() {
        let mut inv = lab(Settings::default());
        add_repo(&mut inv, "base", 99);
        inv.set_field(ItemType::Profile, "web", "repos", "base").unwrap();
        inv.set_field(ItemType::Profile, "web", "autoinstall_meta", "tree='a b'")
            .unwrap();

        let profile = inv.blend(ItemType::Profile, "web", true).unwrap();
        assert_eq!(profile["kernel_options"], Value::from("a=2 x=1 b=3"));
        assert_eq!(profile["repos"], Value::from("base"));
        assert_eq!(profile["autoinstall_meta"], Value::from("tree='a b'"));
        assert!(matches!(profile["mgmt_parameters"], Value::Dict(_)));
    }
}
