mod cli;
mod commands;
mod config;
mod observability;
mod output;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use output::print_error;

fn main() {
    if let Err(e) = run() {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.format.unwrap_or_default();

    match &cli.command {
        Commands::Keygen => commands::keys::keygen(format)?,
        Commands::Policy => commands::policy::show(format)?,
        Commands::Digest(args) => commands::keys::digest(&args.token, format)?,
        Commands::Issue(args) => {
            let service = load_service(&cli)?;
            commands::token::issue(&service, args, format)?;
        }
        Commands::Verify(args) => {
            let service = load_service(&cli)?;
            commands::token::verify(&service, args, format)?;
        }
    }

    Ok(())
}

fn load_service(cli: &Cli) -> Result<tokenkit_auth::TokenService> {
    let cfg = config::load(cli.config.as_deref())?;
    observability::init_tracing_with_level(&cfg.logging.level);
    config::service(&cfg)
}
