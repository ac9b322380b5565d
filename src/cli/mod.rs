pub mod auth;
pub mod demo;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;
use crate::crypto::Bytes32;

#[derive(Parser)]
#[command(name = "compass-keyless")]
#[command(about = "Keyless challenge-response authentication on a local ledger", long_about = None)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Ledger database directory (overrides the config file)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Calling identity: a 0x-prefixed address or a label hashed into one
    #[arg(long, global = true)]
    pub caller: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register the caller
    Register,
    /// Issue a challenge into the shared slot
    Challenge,
    /// Derive a signature over the current challenge (printed as JSON)
    Sign,
    /// Check a signature for the caller
    Authenticate {
        /// Signature JSON as printed by `sign`
        #[arg(long, conflicts_with_all = ["hash", "v", "r", "s"])]
        signature: Option<String>,
        #[arg(long, required_unless_present = "signature")]
        hash: Option<Bytes32>,
        #[arg(long, required_unless_present = "signature")]
        v: Option<u8>,
        #[arg(long, required_unless_present = "signature")]
        r: Option<Bytes32>,
        #[arg(long, required_unless_present = "signature")]
        s: Option<Bytes32>,
    },
    /// Show the caller's account record
    Account,
    /// List committed ledger notifications
    Events {
        #[arg(long)]
        json: bool,
    },
    /// Walk through the full flow and the shared-challenge hazard in memory
    Demo,
}
