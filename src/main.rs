use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use compass_keyless::cli::{auth, demo, Cli, Commands};
use compass_keyless::config::KeylessConfig;
use compass_keyless::error::Result;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match KeylessConfig::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(db) = &cli.db {
        config.ledger.db_path = db.clone();
    }

    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli, &config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: &KeylessConfig) -> Result<ExitCode> {
    let open = || {
        info!("Ledger: {}", config.ledger.db_path);
        auth::open_ledger(config)
    };
    let caller = cli.caller.as_deref();

    match cli.command {
        Commands::Register => auth::handle_register(&open()?, auth::require_caller(caller)?)?,
        Commands::Challenge => auth::handle_challenge(&open()?, auth::require_caller(caller)?)?,
        Commands::Sign => auth::handle_sign(&open()?, auth::require_caller(caller)?)?,
        Commands::Authenticate { signature, hash, v, r, s } => {
            let caller = auth::require_caller(caller)?;
            let sig = auth::parse_signature(signature, hash, v, r, s)?;
            if !auth::handle_authenticate(&open()?, caller, &sig)? {
                return Ok(ExitCode::from(2));
            }
        }
        Commands::Account => auth::handle_account(&open()?, auth::require_caller(caller)?)?,
        Commands::Events { json } => auth::handle_events(&open()?, json)?,
        Commands::Demo => demo::run_demo().await?,
    }
    Ok(ExitCode::SUCCESS)
}
