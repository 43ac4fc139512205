use clap::{Args, Parser, Subcommand, builder::styling};
use eyre::Result;
use jira_harvest::cli::{ConfigOverrides, harvest_status, reset_state, resolve_config, run_harvest};
use owo_colors::OwoColorize;
use std::path::PathBuf;

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// Jira Harvest: turns Jira projects into an instruction-tuning corpus, one resumable page at a time
#[derive(Parser)]
#[command(name = "harvest", version, styles = STYLES)]
struct Cli {
    /// The dotenv file to source JIRA_* variables from
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(flatten)]
    config: ConfigArgs,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigArgs {
    /// YAML config file (defaults to harvest.yml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Checkpoint file
    #[arg(short, long, global = true)]
    state: Option<PathBuf>,

    /// Project keys to harvest, in order (repeatable or comma-separated)
    #[arg(short, long = "project", global = true, value_delimiter = ',')]
    projects: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest issues, resuming from the last checkpoint
    Run {
        /// NDJSON file to append training examples to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Issues requested per page
        #[arg(long)]
        page_size: Option<u64>,

        /// Skip examples whose id is already in the output file
        #[arg(long)]
        dedupe: bool,

        /// Don't draw progress bars
        #[arg(long)]
        no_progress: bool,
    },

    /// Show where the next run will resume
    Status,

    /// Delete the checkpoint so the next run starts over
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Err(e) = dotenvy::from_filename(&cli.env) {
        if !e.not_found() {
            return Err(e.into());
        }
    }

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    let mut overrides = ConfigOverrides {
        config: cli.config.config,
        projects: cli.config.projects,
        state: cli.config.state,
        ..Default::default()
    };

    match cli.command {
        Commands::Run {
            output,
            page_size,
            dedupe,
            no_progress,
        } => {
            overrides.output = output;
            overrides.page_size = page_size;
            overrides.dedupe = dedupe;
            let config = resolve_config(&overrides)?;

            log::info!(
                "Starting Jira harvest of {}",
                config.projects.join(", ").cyan()
            );
            let report = run_harvest(&config, !no_progress).await?;
            for collection in &report.collections {
                log::info!(
                    "  {}: {} issue(s), {} example(s), {} skipped",
                    collection.collection.bright_black(),
                    collection.records_fetched,
                    collection.examples_written,
                    collection.records_skipped
                );
            }
        }
        Commands::Status => {
            let config = resolve_config(&overrides)?;
            let status = harvest_status(&config)?;
            log::info!("State file: {}", config.state.display().bright_black());
            print!("{}", status);
        }
        Commands::Reset => {
            let config = resolve_config(&overrides)?;
            reset_state(&config)?;
        }
    }

    Ok(())
}
