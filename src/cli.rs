//! # CLI Argument Parsing and Command Dispatch
//!
//! Defines the command-line interface using `clap`:
//!
//! - Global arguments (`--color`, `--log-level`, `--verbose`, `--quiet`,
//!   `--debug`) shared by every subcommand.
//! - One module per subcommand under `src/commands/`.
//! - An external-subcommand fallthrough: anything that is not a built-in
//!   command is forwarded to `docker compose` with the generated file, so
//!   `homelabctl ps`, `homelabctl logs`, `homelabctl pull` etc. just work.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;

use crate::commands;
use homelabctl::output::OutputConfig;

/// Homelab stack runtime - compile and deploy declarative stacks
#[derive(Parser, Debug)]
#[command(name = "homelabctl")]
#[command(
    version,
    about,
    long_about = "Homelab stack runtime - compiles stack definitions, inventory and \
                  secrets into a deployable docker-compose file"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// Increase output verbosity (can be repeated)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Suppress output except errors
    #[arg(long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Preserve intermediate rendered files (also: HOMELAB_DEBUG=1)
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize a new homelab repository or verify an existing one
    Init(commands::init::InitArgs),

    /// Enable a stack, or re-enable a disabled service with -s
    Enable(commands::enable::EnableArgs),

    /// Disable a stack, or disable a single service with -s
    Disable(commands::disable::DisableArgs),

    /// List enabled stacks grouped by category
    List(commands::list::ListArgs),

    /// Validate the repository configuration
    Validate(commands::validate::ValidateArgs),

    /// Generate runtime files
    Generate(commands::generate::GenerateArgs),

    /// Generate and deploy with docker compose
    Deploy(commands::deploy::DeployArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),

    /// Anything else is passed through to docker compose
    #[command(external_subcommand)]
    External(Vec<String>),
}

impl Cli {
    /// The color policy derived from the global flag and environment.
    pub fn output_config(&self) -> OutputConfig {
        OutputConfig::from_env_and_flag(&self.color)
    }

    /// Whether intermediates should be preserved this run.
    fn debug_mode(&self) -> bool {
        self.debug || std::env::var("HOMELAB_DEBUG").is_ok_and(|v| v == "1")
    }

    /// Execute the parsed CLI command.
    pub fn execute(self) -> Result<()> {
        self.init_logger()?;

        let colors = self.output_config();
        let debug = self.debug_mode();

        match self.command {
            Commands::Init(args) => commands::init::execute(args),
            Commands::Enable(args) => commands::enable::execute(args),
            Commands::Disable(args) => commands::disable::execute(args),
            Commands::List(args) => commands::list::execute(args, &colors),
            Commands::Validate(args) => commands::validate::execute(args),
            Commands::Generate(args) => commands::generate::execute(args, debug),
            Commands::Deploy(args) => commands::deploy::execute(args, debug),
            Commands::Completions(args) => commands::completions::execute(args),
            Commands::External(args) => commands::passthrough::execute(args),
        }
    }

    /// Initialize the logger from the global flags.
    fn init_logger(&self) -> Result<()> {
        let log_level = self.parse_log_level()?;
        let use_color = self.output_config().use_color;

        env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .write_style(if use_color {
                env_logger::WriteStyle::Auto
            } else {
                env_logger::WriteStyle::Never
            })
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

        Ok(())
    }

    /// Parse the log level, considering `--verbose` and `--quiet`.
    fn parse_log_level(&self) -> Result<LevelFilter> {
        if self.quiet {
            return Ok(LevelFilter::Error);
        }

        if self.verbose > 0 {
            return Ok(match self.verbose {
                1 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            });
        }

        match self.log_level.to_lowercase().as_str() {
            "error" => Ok(LevelFilter::Error),
            "warn" => Ok(LevelFilter::Warn),
            "info" => Ok(LevelFilter::Info),
            "debug" => Ok(LevelFilter::Debug),
            "trace" => Ok(LevelFilter::Trace),
            "off" => Ok(LevelFilter::Off),
            _ => Err(anyhow::anyhow!(
                "Invalid log level: '{}'. Valid options are: error, warn, info, debug, trace, off",
                self.log_level
            )),
        }
    }
}
