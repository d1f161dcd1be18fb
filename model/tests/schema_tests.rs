//! Integration tests for field input and stored forms

use cobbler_config::Settings;
use cobbler_model::schema;
use cobbler_model::*;

fn inventory() -> Inventory {
    Inventory::new(Settings::default()).unwrap()
}

mod input_forms {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_list_reads_back_as_input() {
        let inv = inventory();
        let mut profile = inv.new_item(ItemType::Profile, "web").unwrap();
        profile.set_field("mgmt_classes", "a b c").unwrap();

        let stored = profile.get("mgmt_classes").and_then(Inheritable::value).unwrap();
        assert_eq!(stored, &Value::from(vec!["a", "b", "c"]));
        assert_eq!(stored.to_input_string(), "a b c");
    }

    #[test]
    fn test_quoted_words_stay_together() {
        let inv = inventory();
        let mut distro = inv.new_item(ItemType::Distro, "rhel9").unwrap();
        distro
            .set_field("kernel_options", r#"console=ttyS0 title="Red Hat" quiet"#)
            .unwrap();

        let kopts = distro
            .get("kernel_options")
            .and_then(Inheritable::value)
            .and_then(Value::as_dict)
            .unwrap();
        assert_eq!(kopts["title"], Value::from("Red Hat"));
        assert_eq!(kopts["quiet"], Value::Null);
        assert!(distro.set_field("kernel_options", "broken=\"quote").is_err());
    }

    #[test]
    fn test_repeated_kernel_options_collect() {
        let inv = inventory();
        let mut distro = inv.new_item(ItemType::Distro, "rhel9").unwrap();
        distro
            .set_field("kernel_options", "console=tty0 console=ttyS0,115200")
            .unwrap();
        distro.set_field("autoinstall_meta", "a=1 a=2").unwrap();

        let kopts = distro.get("kernel_options").and_then(Inheritable::value).unwrap();
        assert_eq!(
            kopts.as_dict().unwrap()["console"],
            Value::from(vec!["tty0", "ttyS0,115200"])
        );
        let meta = distro.get("autoinstall_meta").and_then(Inheritable::value).unwrap();
        assert_eq!(meta.as_dict().unwrap()["a"], Value::from("2"));
    }

    #[test]
    fn test_delete_clears_collections() {
        let inv = inventory();
        let mut profile = inv.new_item(ItemType::Profile, "web").unwrap();
        profile.set_field("repos", "base updates").unwrap();
        profile.set_field("repos", "delete").unwrap();
        assert_eq!(
            profile.get("repos").and_then(Inheritable::value),
            Some(&Value::List(Vec::new()))
        );
    }

    #[test]
    fn test_inherit_marker_round_trips() {
        let inv = inventory();
        let mut system = inv.new_item(ItemType::System, "web01").unwrap();
        system.set_field("virt_ram", 4096_i64).unwrap();
        system.set_field("virt_ram", INHERIT).unwrap();

        let slot = system.get("virt_ram").unwrap();
        assert!(slot.is_inherit());
        assert_eq!(serde_json::to_value(slot).unwrap(), serde_json::json!(INHERIT));
    }
}

mod defaults {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_settings_seed_new_items() {
        let settings = Settings {
            default_virt_bridge: "br0".to_string(),
            default_ownership: vec!["ops".to_string(), "admin".to_string()],
            ..Default::default()
        };
        let inv = Inventory::new(settings).unwrap();
        let profile = inv.new_item(ItemType::Profile, "web").unwrap();

        assert_eq!(profile.get_str("virt_bridge"), Some("br0"));
        assert_eq!(
            profile.get("owners").and_then(Inheritable::value),
            Some(&Value::from(vec!["ops", "admin"]))
        );
    }

    #[test]
    fn test_subprofile_inherits_by_default() {
        let inv = inventory();
        let sub = inv.new_subprofile("web-sub", "web").unwrap();
        for field in ["kernel_options", "virt_ram", "owners", "repos", "distro"] {
            assert!(sub.get(field).unwrap().is_inherit(), "{} should inherit", field);
        }
        assert_eq!(sub.get_str("parent"), Some("web"));
    }

    #[test]
    fn test_every_type_has_a_table() {
        for kind in ItemType::ALL {
            let table = schema::fields(kind);
            assert!(!table.is_empty());
            assert_eq!(table[0].name, "name");
        }
        assert!(schema::INTERFACE_FIELDS
            .iter()
            .any(|d| d.name == "mac_address" && d.kind == FieldKind::Str));
    }
}
