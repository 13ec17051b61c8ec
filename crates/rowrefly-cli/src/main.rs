use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rowrefly_core::Config;
use rowrefly_engine::{FetchPolicy, SuiteRunner, TableValidator, ValidatorOptions};
use rowrefly_fixtures::{load_registry, Project};
use rowrefly_source::SnapshotRowSource;

mod render;

use render::{generate_markdown_report, print_report_summary};

const DEFAULT_CONFIG: &str = "rowrefly.toml";

/// RowRefly - Persisted row validation against expected fixtures
#[derive(Parser)]
#[command(name = "rowrefly")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: rowrefly.toml)
    #[arg(short, long, global = true, env = "ROWREFLY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate persisted rows for every scenario
    Validate {
        /// Only run the scenario with this test case id
        #[arg(short, long)]
        scenario: Option<String>,

        /// Output file for report.json
        #[arg(short, long, default_value = "report.json")]
        output: PathBuf,

        /// Also output markdown report
        #[arg(short, long)]
        markdown: Option<PathBuf>,
    },

    /// Load the schema directory and report authoring errors
    CheckSchema,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    if let Commands::Init { force } = cli.command {
        let path = cli.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
        return init_command(&path, force);
    }

    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::Validate {
            scenario,
            output,
            markdown,
        } => validate_command(&config, scenario.as_deref(), &output, markdown.as_deref(), cli.verbose).await,
        Commands::CheckSchema => check_schema_command(&config, cli.verbose),
        Commands::Init { .. } => Ok(()),
    }
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    if let Some(path) = path {
        return Config::from_file(path).with_context(|| format!("Failed to load config {}", path.display()));
    }

    let default_path = Path::new(DEFAULT_CONFIG);
    if default_path.exists() {
        return Config::from_file(default_path).with_context(|| format!("Failed to load config {}", DEFAULT_CONFIG));
    }

    if verbose {
        eprintln!("{}", "No config file found, using defaults".yellow());
    }
    Ok(Config::default())
}

/// Validate command - run scenarios against the snapshot exports
async fn validate_command(
    config: &Config,
    scenario: Option<&str>,
    output: &Path,
    markdown: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    if verbose {
        eprintln!("{} {}", "Loading schemas from:".cyan(), config.schema_dir().display());
        eprintln!("{} {}", "Loading fixtures from:".cyan(), config.expected_dir().display());
    }

    let project = Project::load(config).context("Failed to load validation inputs")?;

    let scenarios = project.select(scenario);
    if let Some(id) = scenario {
        if scenarios.is_empty() {
            anyhow::bail!("Scenario '{}' not found in {}", id, config.scenarios_path().display());
        }
    }

    let options = ValidatorOptions::from_config(&config.matching).context("Invalid matching.time_pattern")?;
    let actual_dir = config.actual_dir();
    let source = SnapshotRowSource::new(&actual_dir);

    if verbose {
        eprintln!(
            "{} {} scenarios against {}",
            "Running".cyan(),
            scenarios.len(),
            actual_dir.display()
        );
    }

    tracing::info!(scenarios = scenarios.len(), tables = project.registry.len(), "starting validation");

    let runner = SuiteRunner::new(Arc::new(project.registry), Arc::new(project.expected), Arc::new(source))
        .with_validator(TableValidator::new(options))
        .with_policy(FetchPolicy::from_config(&config.fetch))
        .with_concurrency(config.concurrency)
        .with_skip(config.skip.clone());

    let report = runner.run(&scenarios).await.with_metadata(serde_json::json!({
        "source": "Snapshot",
        "actualDir": actual_dir.display().to_string(),
    }));

    report
        .save_to_file(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    if verbose {
        eprintln!("{} {}", "Report saved to:".green(), output.display());
    }

    if let Some(md_path) = markdown {
        std::fs::write(md_path, generate_markdown_report(&report))
            .with_context(|| format!("Failed to write {}", md_path.display()))?;
        if verbose {
            eprintln!("{} {}", "Markdown report saved to:".green(), md_path.display());
        }
    }

    print_report_summary(&report, verbose);

    // Exit with error code if any table failed
    if report.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}

/// Init command - write the default config
fn init_command(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    Config::default()
        .save_to_file(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("{} {}", "✓ Config written to".green(), path.display());
    Ok(())
}

/// Check-schema command - load the registry and list its tables
fn check_schema_command(config: &Config, verbose: bool) -> Result<()> {
    let dir = config.schema_dir();
    if verbose {
        eprintln!("{} {}", "Loading schemas from:".cyan(), dir.display());
    }

    let registry = match load_registry(&dir) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            std::process::exit(1);
        }
    };

    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Schema Registry".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    for name in registry.table_names() {
        let Some(schema) = registry.table(name) else {
            continue;
        };
        let lookup = match registry.lookup(name).filter(|l| !l.is_empty()) {
            Some(lookup) => format!("{} (lookup file)", lookup.columns().join(" OR ")),
            None => schema.primary_lookup.clone().unwrap_or_else(|| "(inferred)".to_string()),
        };

        println!("  {} {}", "✓".green(), name.bold());
        println!("      lookup: {}", lookup);
        if verbose {
            println!(
                "      columns: {} mandatory, {} json, {} generated, {} rules",
                schema.mandatory_columns.len(),
                schema.json_columns.len(),
                schema.generated_columns.len(),
                schema.columns.len()
            );
            for constraint in &schema.unique_constraints {
                println!("      unique: ({})", constraint.join(", "));
            }
        }
    }

    println!();
    println!("{} {} tables loaded", "✓".green(), registry.len());
    Ok(())
}
