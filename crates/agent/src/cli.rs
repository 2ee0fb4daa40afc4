use clap::{Parser, Subcommand, ValueEnum};
use infrastructure::config::{LogFormat, LogLevel};
use infrastructure::constants::DEFAULT_CONFIG_PATH;

#[derive(Parser, Debug)]
#[command(
    name = "otx-lookup",
    about = "AlienVault OTX domain threat intelligence lookups",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, env = "OTX_LOOKUP_CONFIG")]
    pub config: String,

    /// Log level override (takes precedence over config file)
    #[arg(short, long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Log format: json (default, production) or text (development)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Output format
    #[arg(short, long, default_value = "table", global = true)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table (default)
    Table,
    /// JSON
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Display version and build information
    Version,

    /// Look up one or more domains, concurrently
    Lookup {
        /// Domains as captured from logs (whitespace and one trailing dot are ignored)
        #[arg(required = true)]
        domains: Vec<String>,

        /// Print the metrics registry after the lookups
        #[arg(long)]
        metrics: bool,
    },

    /// Print a domain as it would be sent to the provider
    Normalize {
        domain: String,
    },

    /// Print the pipeline function descriptor
    Describe,
}

pub fn parse() -> Cli {
    Cli::parse()
}
