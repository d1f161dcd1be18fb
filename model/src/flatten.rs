//! Rendering blended dicts and lists as command-line strings

use crate::value::{Mapping, Value};

/// Dict fields rendered as `key=value` strings when flattening
pub const FLATTENED_DICTS: &[&str] = &[
    "environment",
    "kernel_options",
    "kernel_options_post",
    "yumopts",
    "autoinstall_meta",
    "template_files",
    "boot_files",
    "fetchable_files",
];

/// List fields rendered space-separated when flattening
pub const FLATTENED_LISTS: &[&str] = &["repos", "rpm_list"];

/// Render a dict as space-separated `key=value` pairs
///
/// A falsy value renders as the bare key, a list value repeats the key once
/// per element, and a value containing a space is single-quoted.
pub fn dict_to_string(dict: &Mapping) -> String {
    let mut parts = Vec::with_capacity(dict.len());
    for (key, value) in dict {
        match value {
            value if !value.is_truthy() => parts.push(key.clone()),
            Value::List(items) => {
                for item in items {
                    parts.push(pair(key, item));
                }
            }
            value => parts.push(pair(key, value)),
        }
    }
    parts.join(" ")
}

fn pair(key: &str, value: &Value) -> String {
    let value = value.to_string();
    let value = value.trim();
    if value.contains(' ') {
        format!("{}='{}'", key, value)
    } else {
        format!("{}={}", key, value)
    }
}

/// Render the dict and list fields of a blended mapping as strings
pub fn flatten(result: &mut Mapping) {
    for field in FLATTENED_DICTS {
        if let Some(Value::Dict(dict)) = result.get(*field) {
            let rendered = dict_to_string(dict);
            result.insert(field.to_string(), Value::Str(rendered));
        }
    }
    for field in FLATTENED_LISTS {
        if let Some(list @ Value::List(_)) = result.get(*field) {
            let rendered = list.to_input_string();
            result.insert(field.to_string(), Value::Str(rendered));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dict_to_string() {
        let mut dict = Mapping::new();
        dict.insert("quiet".to_string(), Value::Null);
        dict.insert("console".to_string(), Value::from(vec!["tty0", "ttyS0"]));
        dict.insert("ks".to_string(), Value::from(" http://x/ks "));
        dict.insert("label".to_string(), Value::from("two words"));
        dict.insert("nomodeset".to_string(), Value::from(""));

        assert_eq!(
            dict_to_string(&dict),
            "quiet console=tty0 console=ttyS0 ks=http://x/ks label='two words' nomodeset"
        );
    }

    #[test]
    fn test_empty_list_is_bare_key() {
        let mut dict = Mapping::new();
        dict.insert("noipv6".to_string(), Value::List(Vec::new()));
        dict.insert("console".to_string(), Value::from(vec!["ttyS0"]));
        assert_eq!(dict_to_string(&dict), "noipv6 console=ttyS0");
    }

    #[test]
    fn test_empty_dict() {
        assert_eq!(dict_to_string(&Mapping::new()), "");
    }

    #[test]
    fn test_flatten_fields() {
        let mut kopts = Mapping::new();
        kopts.insert("a".to_string(), Value::from("1"));
        kopts.insert("b".to_string(), Value::Null);

        let mut result = Mapping::new();
        result.insert("kernel_options".to_string(), Value::Dict(kopts.clone()));
        result.insert("repos".to_string(), Value::from(vec!["base", "updates"]));
        result.insert("mgmt_parameters".to_string(), Value::Dict(kopts));
        result.insert("rpm_list".to_string(), Value::List(Vec::new()));

        flatten(&mut result);

        assert_eq!(result["kernel_options"], Value::from("a=1 b"));
        assert_eq!(result["repos"], Value::from("base updates"));
        assert_eq!(result["rpm_list"], Value::from(""));
        assert!(matches!(result["mgmt_parameters"], Value::Dict(_)));
    }
}
