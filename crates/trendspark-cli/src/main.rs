//! TrendSpark CLI
//!
//! Validate a startup idea from the command line and print the report as
//! JSON on stdout. Logs go to stderr.
//!
//! # Usage
//! ```bash
//! trendspark validate --title "StudySync" --description "AI study planner for students"
//! trendspark validate --input idea.json --trace
//! trendspark models
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use trendspark_engine::{EngineConfig, IdeaInput, ModelSelector, ValidationPipeline};

/// TrendSpark - startup idea validation
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON config file (defaults to $TRENDSPARK_CONFIG, then environment)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the validation pipeline for one idea
    Validate(ValidateArgs),

    /// Probe the candidate models and print the one that would be used
    Models,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Idea title
    #[arg(long, required_unless_present = "input")]
    title: Option<String>,

    /// Problem, solution and unique value
    #[arg(long, required_unless_present = "input")]
    description: Option<String>,

    /// Industry or category
    #[arg(long)]
    industry: Option<String>,

    /// Target audience
    #[arg(long)]
    audience: Option<String>,

    /// Read the idea from a JSON file instead ("-" for stdin)
    #[arg(long, conflicts_with_all = ["title", "description", "industry", "audience"])]
    input: Option<PathBuf>,

    /// Include per-stage diagnostics and timings in the output
    #[arg(long)]
    trace: bool,

    /// Print compact JSON
    #[arg(long)]
    compact: bool,
}

impl ValidateArgs {
    fn idea(&self) -> Result<IdeaInput> {
        if let Some(path) = &self.input {
            let payload = if path.as_os_str() == "-" {
                std::io::read_to_string(std::io::stdin()).context("Failed to read idea from stdin")?
            } else {
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read idea file {:?}", path))?
            };
            return Ok(IdeaInput::from_json(&payload)?);
        }

        let mut idea = IdeaInput::new(
            self.title.clone().unwrap_or_default(),
            self.description.clone().unwrap_or_default(),
        );
        if let Some(industry) = &self.industry {
            idea = idea.with_industry(industry.clone());
        }
        if let Some(audience) = &self.audience {
            idea = idea.with_target_audience(audience.clone());
        }
        idea.validate()?;
        Ok(idea)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Validate(args) => validate(&config, &args).await,
        Commands::Models => models(&config).await,
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&std::path::Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load_from(path)
            .with_context(|| format!("Failed to load config {:?}", path)),
        None => EngineConfig::load().context("Failed to load configuration"),
    }
}

async fn validate(config: &EngineConfig, args: &ValidateArgs) -> Result<()> {
    let idea = args.idea()?;

    let pipeline = ValidationPipeline::connect(config)
        .await
        .context("Generative backend unavailable")?;

    let output = if args.trace {
        let run = pipeline.run_traced(&idea).await;
        serde_json::to_value(&run)?
    } else {
        let report = pipeline.run(&idea).await;
        serde_json::to_value(&report)?
    };

    let rendered = if args.compact {
        serde_json::to_string(&output)?
    } else {
        serde_json::to_string_pretty(&output)?
    };
    println!("{}", rendered);
    Ok(())
}

async fn models(config: &EngineConfig) -> Result<()> {
    config.validate()?;

    let generator = ModelSelector::select_gemini(&config.generative)
        .await
        .context("No candidate model answered")?;

    println!("{}", generator.model());
    Ok(())
}
