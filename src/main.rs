mod inventory_file;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cobbler_config::ConfigLoader;
use cobbler_model::{Inventory, Item, ItemType};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Cobbler - inspect provisioning objects and how they inherit
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration root holding settings.toml
    #[arg(long = "config-dir", env = "COBBLER_CONFIG_DIR", default_value = "/etc/cobbler")]
    config_dir: PathBuf,

    /// Inventory file (defaults to inventory.toml in the configuration root)
    #[arg(long, env = "COBBLER_INVENTORY")]
    inventory: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the fully resolved view of an item as JSON
    Dump {
        /// Item type (distro, profile, system, repo, image, network)
        item_type: ItemType,
        /// Item name
        name: String,
        /// Render dict and list fields as command-line strings
        #[arg(long)]
        flatten: bool,
    },
    /// Print the inheritance tree
    Tree,
    /// List items matching every key=value criterion
    Find {
        /// Item type to search
        item_type: ItemType,
        /// Criteria such as name=web* or mac=aa:bb:*; prefix a value with ~ to negate
        #[arg(required = true)]
        criteria: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = ConfigLoader::new(&cli.config_dir)
        .load()
        .with_context(|| format!("Failed to load settings from {}", cli.config_dir.display()))?;
    let mut inventory = Inventory::new(settings)?;

    let path = inventory_file::inventory_path(cli.inventory.as_deref(), &cli.config_dir);
    if path.exists() {
        inventory_file::load(&path, &mut inventory)?;
    } else if cli.inventory.is_some() {
        bail!("Inventory file {} does not exist", path.display());
    } else {
        debug!("No inventory at {}", path.display());
    }

    match cli.command {
        Commands::Dump {
            item_type,
            name,
            flatten,
        } => {
            let blended = inventory.blend(item_type, &name, flatten)?;
            println!("{}", serde_json::to_string_pretty(&blended)?);
        }
        Commands::Tree => {
            for root in inventory.roots() {
                print_tree(&inventory, root, 0);
            }
        }
        Commands::Find {
            item_type,
            criteria,
        } => {
            let pairs = parse_criteria(&criteria)?;
            for item in inventory.find_all(item_type, &pairs)? {
                println!("{}", item.name());
            }
        }
    }

    Ok(())
}

fn print_tree(inventory: &Inventory, item: &Item, indent: usize) {
    println!("{}{} {}", "  ".repeat(indent), item.kind(), item.name());
    for child in inventory.children(item.kind(), item.name()) {
        print_tree(inventory, child, indent + 1);
    }
}

fn parse_criteria(criteria: &[String]) -> Result<Vec<(&str, &str)>> {
    criteria
        .iter()
        .map(|criterion| match criterion.split_once('=') {
            Some(pair) => Ok(pair),
            None => bail!("Criterion '{}' is not in key=value form", criterion),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_dump() {
        let cli = Cli::try_parse_from(["cobbler", "-vv", "dump", "system", "web01", "--flatten"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Dump {
                item_type,
                name,
                flatten,
            } => {
                assert_eq!(item_type, ItemType::System);
                assert_eq!(name, "web01");
                assert!(flatten);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Cli::try_parse_from(["cobbler", "dump", "mainframe", "x"]).is_err());
    }

    #[test]
    fn test_parse_criteria() {
        let raw = vec!["name=web*".to_string(), "mac=~aa:*".to_string()];
        assert_eq!(
            parse_criteria(&raw).unwrap(),
            vec![("name", "web*"), ("mac", "~aa:*")]
        );
        assert!(parse_criteria(&["name".to_string()]).is_err());
    }

    #[test]
    fn test_tree_order() {
        let mut inventory = Inventory::new(Default::default()).unwrap();
        inventory_file::load_str(
            r#"
[[distro]]
name = "rhel9"
kernel = "/k"
initrd = "/i"

[[profile]]
name = "web"
distro = "rhel9"
"#,
            &mut inventory,
        )
        .unwrap();
        let roots: Vec<&str> = inventory.roots().into_iter().map(Item::name).collect();
        assert_eq!(roots, vec!["rhel9"]);
        assert_eq!(inventory.children(ItemType::Distro, "rhel9").len(), 1);
    }
}
