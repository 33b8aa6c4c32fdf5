use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lossreg::{registry, utils, Config, Identifier, LossCallable};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "lossreg")]
#[command(version, about = "Resolve and serialize loss identifiers", long_about = None)]
struct Cli {
    /// Configuration file (JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered loss names
    List {
        /// Show aliases and their targets
        #[arg(long)]
        aliases: bool,
    },

    /// Resolve an identifier and print its serialized form
    Resolve {
        /// Loss name, or a JSON configuration mapping
        identifier: String,
    },

    /// Compute per-sample loss values
    Evaluate {
        /// Loss name, or a JSON configuration mapping
        #[arg(short, long)]
        loss: String,

        /// Labels as nested JSON arrays
        #[arg(long)]
        y_true: String,

        /// Predictions as nested JSON arrays
        #[arg(long)]
        y_pred: String,
    },

    /// Show version and registry information
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    lossreg::logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    match cli.command {
        Commands::List { aliases } => list(aliases),
        Commands::Resolve { identifier } => resolve(&config, &identifier)?,
        Commands::Evaluate { loss, y_true, y_pred } => evaluate(&config, &loss, &y_true, &y_pred)?,
        Commands::Info => show_info(),
    }

    Ok(())
}

/// JSON text becomes a structured identifier, anything else is a name
fn parse_identifier(raw: &str) -> Identifier {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => Identifier::from(value),
        Err(_) => Identifier::Name(raw.to_string()),
    }
}

fn resolve_loss(config: &Config, raw: &str) -> Result<LossCallable> {
    let custom = config.custom_namespace()?;
    lossreg::get_with(parse_identifier(raw), &custom)
        .with_context(|| format!("Failed to resolve loss '{raw}'"))?
        .context("No loss configured")
}

fn list(aliases: bool) {
    let table = registry();
    if aliases {
        for (alias, target) in table.aliases() {
            println!("{alias} -> {target}");
        }
        return;
    }
    for name in table.canonical_names() {
        if let Some(entity) = table.get(name) {
            println!("{name:<34} {}", entity.kind());
        }
    }
}

fn resolve(config: &Config, raw: &str) -> Result<()> {
    let loss = resolve_loss(config, raw)?;
    info!(name = loss.name(), "Resolved loss");

    let kind = match &loss {
        LossCallable::Function(_) => "function",
        LossCallable::Instance(_) => "instance",
    };
    let serialized = lossreg::serialize(loss).context("Failed to serialize loss")?;
    let output = json!({ "kind": kind, "serialized": serialized });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn evaluate(config: &Config, raw: &str, y_true: &str, y_pred: &str) -> Result<()> {
    let loss = resolve_loss(config, raw)?;
    let y_true: Value = serde_json::from_str(y_true).context("Invalid y_true JSON")?;
    let y_pred: Value = serde_json::from_str(y_pred).context("Invalid y_pred JSON")?;
    let y_true = utils::tensor::from_json(&y_true)?;
    let y_pred = utils::tensor::from_json(&y_pred)?;

    let values = loss
        .call(&y_true, &y_pred)
        .with_context(|| format!("Failed to evaluate '{}'", loss.name()))?;
    println!("{}", utils::tensor::to_json(&values));
    Ok(())
}

fn show_info() {
    let table = registry();
    println!("lossreg {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Registered losses: {}", table.canonical_names().len());
    println!("Aliases: {}", table.aliases().len());
}
