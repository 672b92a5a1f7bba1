//! Harmonization Check CLI
//!
//! Inspects a harmonization schema and validates sample records
//! against it.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use harmonize::{
    CapabilityRegistry, Harmonization, HarmonizeConfig, MessageFactory, Message, RecordKind,
};

#[derive(Parser)]
#[command(name = "harmonize-check")]
#[command(about = "Inspect harmonization schemas and validate sample records")]
struct Cli {
    /// Path to a config file (harmonize.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Harmonization schema JSON (overrides the config file)
    #[arg(long)]
    harmonization: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List record kinds and their field counts
    Kinds,

    /// List the field declarations of one kind
    Fields {
        /// "report" or "event"
        kind: String,
    },

    /// Validate a file of tagged payloads, one JSON object per line
    Validate {
        /// Input file
        file: PathBuf,
    },

    /// Print the deduplication hash of each event payload in a file
    Hash {
        /// Input file, one tagged JSON object per line
        file: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = HarmonizeConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?;

    let harmonization = load_harmonization(&cli, &config)?;

    match cli.command {
        Commands::Kinds => {
            for kind in [RecordKind::Report, RecordKind::Event] {
                let schema = harmonization.schema(kind);
                println!("{}: {} fields", kind, schema.len());
            }
        }

        Commands::Fields { kind } => {
            let kind = match kind.as_str() {
                "report" => RecordKind::Report,
                "event" => RecordKind::Event,
                other => bail!("unknown kind {:?}, expected \"report\" or \"event\"", other),
            };

            for (key, spec) in harmonization.schema(kind).iter() {
                let mut constraints = vec![spec.type_name().to_string()];
                if let Some(length) = spec.length() {
                    constraints.push(format!("length <= {}", length));
                }
                if let Some(pattern) = spec.pattern() {
                    constraints.push(format!("regex {}", pattern.as_str()));
                }
                println!("{:40} {}", key, constraints.join(", "));
            }
        }

        Commands::Validate { file } => {
            let factory = MessageFactory::new(harmonization);
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;

            let mut failures = 0;
            for (number, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match factory.deserialize(line) {
                    Ok(message) => {
                        println!("line {}: ok ({})", number + 1, message.kind());
                    }
                    Err(e) => {
                        println!("line {}: INVALID - {}", number + 1, e);
                        failures += 1;
                    }
                }
            }

            if failures > 0 {
                bail!("{} invalid payload(s)", failures);
            }
        }

        Commands::Hash { file } => {
            let factory = MessageFactory::new(harmonization);
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;

            for (number, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match factory.deserialize(line)? {
                    Message::Event(event) => {
                        println!("{}  line {}", event.content_hash(), number + 1);
                    }
                    Message::Report(_) => {
                        println!("(report, no hash)  line {}", number + 1);
                    }
                }
            }
        }
    }

    Ok(())
}

fn load_harmonization(
    cli: &Cli,
    config: &HarmonizeConfig,
) -> Result<std::sync::Arc<Harmonization>> {
    let capabilities = CapabilityRegistry::with_builtins();

    let path = cli
        .harmonization
        .clone()
        .or_else(|| config.harmonization_path());

    let harmonization = match path {
        Some(path) => Harmonization::load(&path, &capabilities)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => Harmonization::default_config().context("failed to load embedded schema")?,
    };

    Ok(harmonization)
}
