#![forbid(unsafe_code)]

mod cli;
mod commands;

use anyhow::Result;

use cli::Command;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::parse();
    let output = cli.output;

    match &cli.command {
        Command::Version => {
            println!("otx-lookup {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Lookup { domains, metrics } => commands::cmd_lookup(&cli, domains, *metrics).await,
        Command::Normalize { domain } => commands::cmd_normalize(domain, output),
        Command::Describe => commands::cmd_describe(output),
    }
}
