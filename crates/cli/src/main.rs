//! Command-line harness over the unitstore storage contract.
//!
//! The storage is resolved once at startup from, in order of precedence:
//! - `--config <file>` / `UNITSTORE_CONFIG`: a serialized storage configuration record
//! - `--root` / `UNITSTORE_ROOT` and `--backend` / `UNITSTORE_BACKEND`
//!
//! A `.env` file in the working directory is loaded first.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use unitstore_core::{
    units_equal, DirectoryStorage, List, Note, Storage, StorageConfig, Todo, Unit, UnitId,
    UnitRegistry,
};

#[derive(Parser)]
#[command(name = "unitstore")]
#[command(about = "Store, load and remove units in a directory-backed storage")]
struct Cli {
    /// Storage root directory (overrides UNITSTORE_ROOT)
    #[arg(long, global = true)]
    root: Option<String>,
    /// Storage backend: disk or memory (overrides UNITSTORE_BACKEND)
    #[arg(long, global = true)]
    backend: Option<String>,
    /// Storage configuration record to use instead of root/backend (overrides UNITSTORE_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the storage root
    Init,
    /// Show where the storage lives and whether it exists
    Status,
    /// Remove the storage root and every unit in it
    Destroy,
    /// Save a new note
    AddNote {
        title: String,
        body: String,
        /// Unit id (generated if omitted)
        #[arg(long)]
        id: Option<String>,
    },
    /// Save a new todo list
    AddTodo {
        title: String,
        /// Items to add, in order
        items: Vec<String>,
        /// Unit id (generated if omitted)
        #[arg(long)]
        id: Option<String>,
    },
    /// Save a new list holding already stored units
    AddList {
        title: String,
        /// Ids of stored units to include, in order
        items: Vec<String>,
        /// Unit id (generated if omitted)
        #[arg(long)]
        id: Option<String>,
    },
    /// Print a unit and its children
    Show {
        id: String,
        /// Print the stored encoding instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// List stored units
    List,
    /// Remove a unit
    Remove {
        id: String,
        /// Also remove the units it contains, keeping any another unit still lists
        #[arg(long)]
        cascade: bool,
    },
    /// Print the storage configuration record, or migrate a legacy one
    Config {
        /// Configuration record to rewrite in canonical form
        #[arg(long)]
        migrate: Option<PathBuf>,
        /// Overwrite the migrated file instead of printing the result
        #[arg(long, requires = "migrate")]
        write: bool,
    },
    /// Run a create/save/load/remove round trip on a throwaway in-memory storage
    Demo,
}

/// Storage settings gathered from flags and the environment.
#[derive(Debug, Default)]
struct Settings {
    root: Option<String>,
    backend: Option<String>,
    config: Option<PathBuf>,
}

impl Settings {
    fn from_cli_and_env(cli: &Cli) -> Self {
        Self {
            root: cli.root.clone().or_else(|| std::env::var("UNITSTORE_ROOT").ok()),
            backend: cli
                .backend
                .clone()
                .or_else(|| std::env::var("UNITSTORE_BACKEND").ok()),
            config: cli
                .config
                .clone()
                .or_else(|| std::env::var_os("UNITSTORE_CONFIG").map(PathBuf::from)),
        }
    }

    fn resolve(self) -> anyhow::Result<StorageConfig> {
        if let Some(path) = self.config {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("failed to read storage config {}", path.display()))?;
            return StorageConfig::from_json(&bytes)
                .with_context(|| format!("invalid storage config {}", path.display()));
        }
        Ok(StorageConfig::from_env_values(self.root, self.backend)?)
    }
}

fn parse_or_generate_id(id: Option<String>) -> anyhow::Result<UnitId> {
    match id {
        Some(id) => UnitId::new(&id).with_context(|| format!("invalid unit id {id:?}")),
        None => Ok(UnitId::generate()),
    }
}

fn describe(unit: &dyn Unit) -> String {
    let any = unit.as_any();
    if let Some(note) = any.downcast_ref::<Note>() {
        note.title().to_string()
    } else if let Some(todo) = any.downcast_ref::<Todo>() {
        format!(
            "{} [{}/{} done]",
            todo.title(),
            todo.completed_count(),
            todo.items().len()
        )
    } else if let Some(list) = any.downcast_ref::<List>() {
        format!("{} ({} items)", list.title(), list.len())
    } else {
        String::new()
    }
}

fn print_tree(unit: &dyn Unit, depth: usize) {
    println!(
        "{:indent$}{} [{}] {}",
        "",
        unit.id(),
        unit.unit_type(),
        describe(unit),
        indent = depth * 2
    );
    if let Some(todo) = unit.as_any().downcast_ref::<Todo>() {
        for item in todo.items() {
            let mark = if item.done { "x" } else { " " };
            println!("{:indent$}- [{mark}] {}", "", item.text, indent = depth * 2 + 2);
        }
    }
    for child in unit.children() {
        print_tree(child, depth + 1);
    }
}

fn run_demo() -> anyhow::Result<()> {
    let storage = DirectoryStorage::in_memory();
    println!(
        "storage at {} ({}), created: {}",
        storage.root_dir().display(),
        storage.backend_kind(),
        storage.is_created()
    );

    storage.create()?;
    println!("created: {}", storage.is_created());

    let mut todo = Todo::new(UnitId::new("chores")?, "Chores");
    todo.add_item("water plants");
    todo.add_item("take out recycling");
    todo.set_done(0, true);

    let mut list = List::new(UnitId::new("home")?, "Home");
    list.push(Box::new(Note::new(UnitId::new("a")?, "Groceries", "milk, eggs")));
    list.push(Box::new(todo));

    storage.save_unit(&list)?;
    println!("saved: {:?}", storage.list_unit_ids()?);

    let loaded = storage.load_unit("home")?;
    if !units_equal(loaded.as_ref(), &list) {
        bail!("loaded unit differs from the saved one");
    }
    print_tree(loaded.as_ref(), 0);

    storage.remove_unit(&list)?;
    match storage.load_unit("home") {
        Err(err) if err.is_not_found() => println!("after remove: {err}"),
        Err(err) => return Err(err.into()),
        Ok(_) => bail!("unit still present after remove"),
    }

    println!("config record: {}", String::from_utf8_lossy(&storage.serialize()?));
    storage.remove()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("unitstore=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command.as_ref() else {
        println!("Use 'unitstore --help' for commands");
        return Ok(());
    };

    let config = Settings::from_cli_and_env(&cli).resolve()?;
    if config.is_legacy() {
        tracing::warn!("storage config uses the legacy format; run `unitstore config --migrate`");
    }
    let storage = DirectoryStorage::from_config(&config)
        .with_registry(Arc::new(UnitRegistry::with_builtin_units()));
    tracing::debug!(root = %storage.root_dir().display(), backend = %storage.backend_kind(), "resolved storage");

    match command {
        Commands::Init => {
            storage.create().context("failed to create storage")?;
            println!(
                "Created {} storage at {}",
                storage.backend_kind(),
                storage.root_dir().display()
            );
        }
        Commands::Status => {
            println!("root: {}", storage.root_dir().display());
            println!("backend: {}", storage.backend_kind());
            println!("created: {}", storage.is_created());
            if storage.is_created() {
                println!("units: {}", storage.list_unit_ids()?.len());
            }
        }
        Commands::Destroy => {
            storage.remove().context("failed to remove storage")?;
            println!("Removed storage at {}", storage.root_dir().display());
        }
        Commands::AddNote { title, body, id } => {
            let note = Note::new(parse_or_generate_id(id.clone())?, title, body);
            storage.save_unit(&note).context("failed to save note")?;
            println!("{}", note.id());
        }
        Commands::AddTodo { title, items, id } => {
            let mut todo = Todo::new(parse_or_generate_id(id.clone())?, title);
            for item in items {
                todo.add_item(item);
            }
            storage.save_unit(&todo).context("failed to save todo")?;
            println!("{}", todo.id());
        }
        Commands::AddList { title, items, id } => {
            let mut list = List::new(parse_or_generate_id(id.clone())?, title);
            for item in items {
                let unit = storage
                    .load_unit(item)
                    .with_context(|| format!("failed to load list item {item}"))?;
                list.push(unit);
            }
            storage.save_unit(&list).context("failed to save list")?;
            println!("{}", list.id());
        }
        Commands::Show { id, json } => {
            let unit = storage
                .load_unit(id)
                .with_context(|| format!("failed to load unit {id}"))?;
            if *json {
                let encoded = unit.encode()?;
                let value: serde_json::Value = serde_json::from_slice(&encoded)?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                print_tree(unit.as_ref(), 0);
            }
        }
        Commands::List => {
            let ids = storage.list_unit_ids().context("failed to list units")?;
            if ids.is_empty() {
                println!("No units found.");
            }
            for id in ids {
                match storage.load_unit(id.as_str()) {
                    Ok(unit) => println!("{id}\t{}\t{}", unit.unit_type(), describe(unit.as_ref())),
                    Err(err) => println!("{id}\t?\t{err}"),
                }
            }
        }
        Commands::Remove { id, cascade } => {
            if *cascade {
                let unit = storage
                    .load_unit(id)
                    .with_context(|| format!("failed to load unit {id}"))?;
                storage.remove_unit_tree(unit.as_ref())?;
            } else {
                storage.remove_unit_by_id(id)?;
            }
            println!("Removed {id}");
        }
        Commands::Config { migrate, write } => match migrate {
            Some(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let migrated = StorageConfig::migrate_json(&bytes)?;
                if *write {
                    std::fs::write(path, &migrated)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Migrated {}", path.display());
                } else {
                    println!("{}", String::from_utf8_lossy(&migrated));
                }
            }
            None => println!("{}", String::from_utf8_lossy(&storage.serialize()?)),
        },
        Commands::Demo => run_demo()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use unitstore_core::BackendKind;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "unitstore",
            "add-todo",
            "Chores",
            "dishes",
            "laundry",
            "--backend",
            "memory",
        ])
        .unwrap();
        assert_eq!(cli.backend.as_deref(), Some("memory"));
        match cli.command {
            Some(Commands::AddTodo { title, items, id }) => {
                assert_eq!(title, "Chores");
                assert_eq!(items, vec!["dishes", "laundry"]);
                assert!(id.is_none());
            }
            _ => panic!("expected add-todo"),
        }
    }

    #[test]
    fn test_write_requires_migrate() {
        assert!(Cli::try_parse_from(["unitstore", "config", "--write"]).is_err());
    }

    #[test]
    fn test_settings_resolve_from_values() {
        let settings = Settings {
            root: Some("/data".into()),
            backend: Some("memory".into()),
            config: None,
        };
        let config = settings.resolve().unwrap();
        assert_eq!(config.root(), std::path::Path::new("/data"));
        assert_eq!(config.backend(), BackendKind::InMemory);
    }

    #[test]
    fn test_settings_prefer_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, br#"{"root":"/legacy","type":"directory"}"#).unwrap();

        let settings = Settings {
            root: Some("/ignored".into()),
            backend: None,
            config: Some(path),
        };
        let config = settings.resolve().unwrap();
        assert_eq!(config.root(), std::path::Path::new("/legacy"));
        assert!(config.is_legacy());
    }

    #[test]
    fn test_demo_runs() {
        run_demo().unwrap();
    }

    #[test]
    fn test_explicit_ids_are_validated() {
        assert!(parse_or_generate_id(Some("".into())).is_err());
        assert_eq!(
            parse_or_generate_id(Some("n1".into())).unwrap().as_str(),
            "n1"
        );
        assert_eq!(parse_or_generate_id(None).unwrap().as_str().len(), 32);
    }
}
