use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "dcplan",
    about = "Datacenter module selection and floor placement",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Planner configuration (TOML). Built-in defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Choose module counts for every specification
    Optimize {
        #[command(flatten)]
        inputs: SolveInputs,
    },
    /// Lay out given module counts on a grid.
    ///
    /// Counts are a JSON object mapping module id to instance count,
    /// e.g. {"3": 2, "7": 1}.
    Place {
        /// Module catalog rows (JSON array)
        #[arg(short, long)]
        modules: PathBuf,
        /// Module counts (JSON object)
        #[arg(long)]
        counts: PathBuf,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        /// Locked region as x,y,width,height. Repeatable.
        #[arg(long = "lock", value_name = "X,Y,W,H")]
        locks: Vec<String>,
        /// Instances with fixed positions (JSON array of {module_id, x, y});
        /// they count toward the module counts
        #[arg(long)]
        positions: Option<PathBuf>,
        /// Append an ASCII rendering of the grid (text format only)
        #[arg(long)]
        ascii: bool,
    },
    /// Optimize, then place each selection on its specification's site
    Plan {
        #[command(flatten)]
        inputs: SolveInputs,
        /// Locked region as x,y,width,height. Repeatable.
        #[arg(long = "lock", value_name = "X,Y,W,H")]
        locks: Vec<String>,
        /// Modules already on site (JSON array of {module_id, x, y}),
        /// placed in addition to each selection
        #[arg(long)]
        positions: Option<PathBuf>,
        /// Append an ASCII rendering of each grid (text format only)
        #[arg(long)]
        ascii: bool,
    },
    /// Manage the planner configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
struct SolveInputs {
    /// Module catalog rows (JSON array)
    #[arg(short, long)]
    modules: PathBuf,
    /// Specification rows (JSON array)
    #[arg(short, long)]
    specs: PathBuf,
    /// Only solve the specification with this name
    #[arg(long = "only")]
    only: Option<String>,
    /// Counts of modules already installed (JSON object, module id → count);
    /// their net resources are available to every specification
    #[arg(long)]
    fixed: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default configuration
    Init {
        #[arg(short, long, default_value = "dcplan.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dcplan=info".parse()?))
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    match cli.command {
        Commands::Optimize { inputs } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::optimize::optimize(
                &commands::SolveRequest {
                    modules: &inputs.modules,
                    specs: &inputs.specs,
                    only: inputs.only.as_deref(),
                    fixed: inputs.fixed.as_deref(),
                },
                &config,
                cli.format,
            )
        }
        Commands::Place {
            modules,
            counts,
            width,
            height,
            locks,
            positions,
            ascii,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::place::place(
                &commands::place::PlaceRequest {
                    modules: &modules,
                    counts: &counts,
                    width,
                    height,
                    locks: &locks,
                    positions: positions.as_deref(),
                    ascii,
                },
                &config,
                cli.format,
            )
        }
        Commands::Plan {
            inputs,
            locks,
            positions,
            ascii,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::plan::plan(
                &commands::SolveRequest {
                    modules: &inputs.modules,
                    specs: &inputs.specs,
                    only: inputs.only.as_deref(),
                    fixed: inputs.fixed.as_deref(),
                },
                &commands::plan::SiteOptions {
                    locks: &locks,
                    positions: positions.as_deref(),
                    ascii,
                },
                &config,
                cli.format,
            )
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { path, force } => commands::config::init(&path, force),
        },
    }
}
