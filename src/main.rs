//! leychile CLI: query Chilean legislation from the BCN linked-data service.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use leychile::config::LeyChileConfig;
use leychile::error::LeyChileError;
use leychile::pipeline::{Pipeline, Response};

#[derive(Parser)]
#[command(name = "leychile", version, about = "Chilean legislation lookup over BCN linked data")]
struct Cli {
    /// Configuration file (default: $XDG_CONFIG_HOME/leychile/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a request and, when it applies, run it against the endpoint.
    Ask {
        /// The request, e.g. "Que dice la ley 19.628 sobre proteccion de datos?".
        text: Vec<String>,
    },

    /// Show how a request is classified, without any network access.
    Classify {
        text: Vec<String>,
    },

    /// Print the SPARQL query a request would run, without executing it.
    Query {
        text: Vec<String>,
    },

    /// Fetch the resource document of a law by idNorma.
    Norm {
        /// LeyChile identifier, e.g. 172986.
        id: u64,
    },

    /// Probe retired endpoints (all of them when no name is given).
    Probe {
        name: Option<String>,
    },

    /// List the known norms.
    Registry,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = LeyChileConfig::resolve(cli.config.as_deref()).map_err(LeyChileError::from)?;
    let pipeline = Pipeline::from_config(config)?;

    match cli.command {
        Commands::Ask { text } => {
            let response = pipeline.handle(&text.join(" "));
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response).into_diagnostic()?);
            } else {
                print_response(&response);
            }
        }

        Commands::Classify { text } => {
            let classification = pipeline.classifier().explain(&text.join(" "));
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&classification).into_diagnostic()?
                );
            } else {
                println!("rule:   {:?}", classification.rule);
                println!("intent: {:?}", classification.intent);
            }
        }

        Commands::Query { text } => {
            let intent = pipeline.classifier().classify(&text.join(" "));
            let query = pipeline
                .builder()
                .build(&intent)
                .map_err(LeyChileError::from)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&query).into_diagnostic()?);
            } else {
                println!("{}", query.to_sparql());
            }
        }

        Commands::Norm { id } => {
            let outcome = pipeline.fetch_norm(id);
            println!("{}", serde_json::to_string_pretty(&outcome).into_diagnostic()?);
        }

        Commands::Probe { name } => {
            let health = pipeline.health();
            let names: Vec<String> = match name {
                Some(name) => vec![name],
                None => health.names().into_iter().map(String::from).collect(),
            };
            if names.is_empty() {
                println!("No endpoints configured.");
            }
            for name in names {
                let state = if health.is_available(&name) {
                    "available"
                } else {
                    "unavailable"
                };
                println!("{name:<16} {state}");
            }
        }

        Commands::Registry => {
            let registry = pipeline.registry();
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(registry.norms()).into_diagnostic()?
                );
            } else {
                println!("{} known norms:", registry.len());
                for norm in registry.norms() {
                    let number = norm
                        .law_number
                        .as_deref()
                        .map(|n| format!(" (Ley {n})"))
                        .unwrap_or_default();
                    println!(
                        "  {:>8}  {:<13} {}{}",
                        norm.identifier,
                        norm.kind.to_string(),
                        norm.name(),
                        number
                    );
                }
            }
        }
    }

    Ok(())
}

fn print_response(response: &Response) {
    println!("{}", response.message());
    if let Response::Retrieved { query, outcome } = response {
        println!("  [{}]", query.template());
        for row in outcome.bindings() {
            let title = row.get("title").map(String::as_str).unwrap_or("(sin título)");
            let uri = row
                .get("norma")
                .or_else(|| row.get("item"))
                .map(String::as_str)
                .unwrap_or_default();
            println!("  - {title}  {uri}");
        }
    }
}
