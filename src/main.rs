//! autodoc CLI
//!
//! Subcommands:
//! - `generate`: run the full documentation pipeline against a root
//! - `status`: show checkpoint progress for a root
//! - `clean`: remove checkpoints for a root
//! - `decode`: expand an SKF manifest back into Markdown

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use autodoc::checkpoint::UnitStatus;
use autodoc::{Config, Pipeline, create_provider, pipeline, skf};

#[derive(Parser)]
#[command(name = "autodoc", version, about = "LLM documentation synthesis for codebases")]
struct Cli {
    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate documentation for a codebase
    Generate {
        /// Root directory to document
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Config file (defaults to <root>/.autodoc/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the per-unit token budget
        #[arg(long)]
        budget: Option<usize>,

        /// Override the model name
        #[arg(long)]
        model: Option<String>,

        /// Override concurrent unit synthesis (1 = strict order)
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Show checkpoint progress for a root
    Status {
        #[arg(default_value = ".")]
        root: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Emit machine-readable JSON instead of the table
        #[arg(long)]
        json: bool,
    },

    /// Remove stored checkpoints for a root
    Clean {
        #[arg(default_value = ".")]
        root: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Expand an SKF manifest back into Markdown
    Decode {
        /// Manifest file (.skf.txt)
        manifest: PathBuf,

        /// Output path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Generate {
            root,
            config,
            budget,
            model,
            concurrency,
        } => {
            let mut config = load_config(&root, config.as_deref())?;
            if let Some(budget) = budget {
                config.unit_budget = budget;
            }
            if let Some(model) = model {
                config.provider.model = Some(model);
            }
            if let Some(concurrency) = concurrency {
                config.max_concurrent_units = concurrency;
            }
            config.validate()?;

            let provider = create_provider(&config.provider)?;
            let summary = Pipeline::new(config, provider).run(&root).await?;

            if !cli.quiet {
                print_summary(&summary);
            }
            if summary.units_failed > 0 {
                std::process::exit(2);
            }
        }

        Command::Status { root, config, json } => {
            let config = load_config(&root, config.as_deref())?;
            let (store, identity) = pipeline::open_store(&root)?;
            let records = store.load(&identity, config.unit_budget)?;

            let completed = records
                .values()
                .filter(|r| r.status == UnitStatus::Completed)
                .count();
            let failed = records.len() - completed;

            if json {
                let out = serde_json::json!({
                    "root": root.display().to_string(),
                    "budget": config.unit_budget,
                    "completed": completed,
                    "failed": failed,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{}", style("Checkpoint status").bold());
                println!("  Root:      {}", root.display());
                println!("  Budget:    {}", config.unit_budget);
                println!("  Completed: {}", style(completed).green());
                println!("  Failed:    {}", style(failed).red());
            }
        }

        Command::Clean { root, config } => {
            let config = load_config(&root, config.as_deref())?;
            let (store, identity) = pipeline::open_store(&root)?;
            let removed = store.clear(&identity, config.unit_budget)?;
            println!("Removed {} checkpoint(s)", removed);
        }

        Command::Decode { manifest, output } => {
            let input = std::fs::read_to_string(&manifest)
                .with_context(|| format!("Cannot read manifest: {}", manifest.display()))?;
            let doc = skf::decode(&input)?;
            let markdown = doc.to_markdown();
            match output {
                Some(path) => {
                    std::fs::write(&path, markdown)
                        .with_context(|| format!("Cannot write: {}", path.display()))?;
                    println!("Expanded manifest to {}", path.display());
                }
                None => print!("{}", markdown),
            }
        }
    }

    Ok(())
}

fn load_config(root: &std::path::Path, explicit: Option<&std::path::Path>) -> anyhow::Result<Config> {
    let config = match explicit {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load(root)?,
    };
    Ok(config)
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if quiet {
        "autodoc=error"
    } else if verbose {
        "autodoc=debug"
    } else {
        "autodoc=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_summary(summary: &autodoc::RunSummary) {
    println!();
    println!("{}", style("Documentation run complete").bold().green());
    println!("  Files cataloged:  {}", summary.files);
    if summary.files_skipped > 0 {
        println!("  Files skipped:    {}", summary.files_skipped);
    }
    if summary.parse_failures > 0 {
        println!(
            "  Parse failures:   {}",
            style(summary.parse_failures).yellow()
        );
    }
    println!(
        "  Units:            {} completed, {} failed ({} resumed)",
        style(summary.units_completed).green(),
        if summary.units_failed > 0 {
            style(summary.units_failed).red()
        } else {
            style(summary.units_failed).dim()
        },
        summary.units_resumed
    );
    println!("  Dependency graph: {} nodes, {} layers, {} cycles broken",
        summary.graph.nodes, summary.graph.layers, summary.graph.soft_edges);
    println!(
        "  Token usage:      {} in / {} out over {} request(s)",
        summary.usage.input_tokens, summary.usage.output_tokens, summary.usage.requests
    );
    println!("  Markdown:         {}", summary.doc_path.display());
    println!(
        "  Manifest:         {} ({:.0}% of Markdown size)",
        summary.skf_path.display(),
        summary.compression.ratio() * 100.0
    );
}
