//! Master Data CLI
//!
//! Exposes the type registry and the master record table: list, create,
//! inspect, update and delete types and records from the command line.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use masterdata::{
    MasterConfig, MasterDataError, MasterStore, OutputFormat, RecordResource, RecordWriter,
    SchemaDefinition, TypeResource,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "masterdata")]
#[command(about = "Manage user-defined types and their master records")]
struct Cli {
    /// Path to the store root (overrides config)
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Path to a config file
    #[arg(short, long)]
    config: Option<String>,

    /// Compact JSON output
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage type definitions (the "rulebooks")
    #[command(subcommand)]
    Type(TypeCommands),

    /// Manage master records
    #[command(subcommand)]
    Record(RecordCommands),
}

#[derive(Subcommand)]
enum TypeCommands {
    /// List all types
    List,

    /// Create a new type
    Create {
        /// Type name (unique, case-insensitive)
        #[arg(short, long)]
        name: String,
        /// Schema definition as JSON, e.g.
        /// '{"fields":[{"name":"sku","type":"string","mandatory":true}]}'
        #[arg(short, long)]
        schema: String,
    },

    /// Show one type
    Show {
        /// Type id or name
        type_ref: String,
    },

    /// Rename a type and/or replace its schema
    Update {
        /// Type id or name
        type_ref: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        schema: Option<String>,
    },

    /// Soft-delete a type (name stays reserved)
    Deactivate { type_ref: String },

    /// Reactivate a soft-deleted type
    Reactivate { type_ref: String },

    /// Hard-delete a type and all of its records
    Delete { type_ref: String },
}

#[derive(Subcommand)]
enum RecordCommands {
    /// List records, most recent first
    List {
        /// Only records of this type (id or name)
        #[arg(short, long)]
        r#type: Option<String>,
    },

    /// Create a record
    Create {
        /// Type id or name
        #[arg(short, long)]
        r#type: String,
        /// Attributes as a JSON object, e.g. '{"sku":"A1","color":"red"}'
        #[arg(short, long)]
        attributes: String,
    },

    /// Show one record
    Show { id: u64 },

    /// Replace a record's attributes
    Update {
        id: u64,
        #[arg(short, long)]
        attributes: String,
    },

    /// Delete a record
    Delete { id: u64 },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        // Validation failures exit 2, infrastructure faults exit 1
        let code = match e.downcast_ref::<MasterDataError>() {
            Some(err) if err.is_validation() => 2,
            _ => 1,
        };
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = MasterConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?;

    let store_path = cli.store.clone().unwrap_or_else(|| config.store_path());
    let mut store = MasterStore::open(&store_path)
        .with_context(|| format!("failed to open store at {}", store_path.display()))?;

    let format = if cli.compact {
        OutputFormat::Compact
    } else {
        config.output.format
    };

    match cli.command {
        Commands::Type(cmd) => run_type(cmd, &mut store, format),
        Commands::Record(cmd) => run_record(cmd, &mut store, format),
    }
}

fn run_type(cmd: TypeCommands, store: &mut MasterStore, format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TypeCommands::List => {
            for def in store.list_types() {
                let marker = if def.is_active { "✅" } else { "💤" };
                println!(
                    "{} {:>5}  {}  ({} fields)",
                    marker,
                    def.id,
                    def.name,
                    def.schema_definition.fields.len()
                );
            }
            Ok(())
        }

        TypeCommands::Create { name, schema } => {
            let schema: SchemaDefinition =
                serde_json::from_str(&schema).context("invalid schema JSON")?;
            let def = store.create_type(&name, schema)?;
            println!("✅ Created type '{}' (id {})", def.name, def.id);
            print_json(&TypeResource::from(&def), format)
        }

        TypeCommands::Show { type_ref } => {
            let id = resolve_type(store, &type_ref)?;
            let def = TypeResource::from(store.get_type(id)?);
            print_json(&def, format)
        }

        TypeCommands::Update {
            type_ref,
            name,
            schema,
        } => {
            let id = resolve_type(store, &type_ref)?;
            let schema = schema
                .map(|s| serde_json::from_str::<SchemaDefinition>(&s))
                .transpose()
                .context("invalid schema JSON")?;
            let def = store.update_type(id, name.as_deref(), schema)?;
            println!("✅ Updated type '{}' (id {})", def.name, def.id);
            print_json(&TypeResource::from(&def), format)
        }

        TypeCommands::Deactivate { type_ref } => {
            let id = resolve_type(store, &type_ref)?;
            let def = store.deactivate_type(id)?;
            println!("💤 Deactivated type '{}' (name stays reserved)", def.name);
            Ok(())
        }

        TypeCommands::Reactivate { type_ref } => {
            let id = resolve_type(store, &type_ref)?;
            let def = store.reactivate_type(id)?;
            println!("✅ Reactivated type '{}'", def.name);
            Ok(())
        }

        TypeCommands::Delete { type_ref } => {
            let id = resolve_type(store, &type_ref)?;
            store.delete_type(id)?;
            println!("🗑️  Deleted type {} and its records", id);
            Ok(())
        }
    }
}

fn run_record(
    cmd: RecordCommands,
    store: &mut MasterStore,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match cmd {
        RecordCommands::List { r#type } => {
            let filter = r#type
                .as_deref()
                .map(|t| resolve_type(store, t))
                .transpose()?;
            for record in store.list_records(filter) {
                println!(
                    "{}  type {}  {}",
                    record.formatted_id(),
                    record.record_type,
                    serde_json::to_string(&record.attributes)?
                );
            }
            Ok(())
        }

        RecordCommands::Create { r#type, attributes } => {
            let type_id = resolve_type(store, &r#type)?;
            let raw: serde_json::Value =
                serde_json::from_str(&attributes).context("invalid attributes JSON")?;
            let record = RecordWriter::new(store).create(type_id, &raw)?;
            println!("✅ Created record {}", record.formatted_id());
            print_json(&RecordResource::from(&record), format)
        }

        RecordCommands::Show { id } => {
            let record = store.get_record(id)?;
            print_json(&RecordResource::from(record), format)
        }

        RecordCommands::Update { id, attributes } => {
            let raw: serde_json::Value =
                serde_json::from_str(&attributes).context("invalid attributes JSON")?;
            let record = RecordWriter::new(store).update(id, &raw)?;
            println!("✅ Updated record {}", record.formatted_id());
            print_json(&RecordResource::from(&record), format)
        }

        RecordCommands::Delete { id } => {
            store.delete_record(id)?;
            println!("🗑️  Deleted record {}", id);
            Ok(())
        }
    }
}

/// Resolve a type reference given either as a numeric id or as a name
fn resolve_type(store: &MasterStore, type_ref: &str) -> anyhow::Result<u64> {
    if let Ok(id) = type_ref.parse::<u64>() {
        return Ok(id);
    }
    match store.find_type_by_name(type_ref) {
        Some(def) => Ok(def.id),
        None => bail!("no type named '{}'", type_ref),
    }
}

fn print_json<T: serde::Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        OutputFormat::Compact => serde_json::to_string(value)?,
    };
    println!("{}", rendered);
    Ok(())
}
