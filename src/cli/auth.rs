use std::sync::Arc;

use crate::clock::SystemClock;
use crate::config::KeylessConfig;
use crate::crypto::Bytes32;
use crate::error::{LedgerError, Result};
use crate::events::LedgerEvent;
use crate::identity::{resolve_caller, Identity};
use crate::ledger::Ledger;
use crate::signature::SimulatedSignature;
use crate::storage::Storage;

pub fn open_ledger(config: &KeylessConfig) -> Result<Ledger> {
    tracing::debug!("Persistence: opening sled DB at '{}'", config.ledger.db_path);
    let storage = Storage::open(&config.ledger.db_path)?;
    Ledger::open(Arc::new(storage), Arc::new(SystemClock))
}

pub fn require_caller(caller: Option<&str>) -> Result<Identity> {
    let arg = caller.ok_or_else(|| LedgerError::InvalidIdentity("--caller is required".to_string()))?;
    resolve_caller(arg)
}

pub fn handle_register(ledger: &Ledger, caller: Identity) -> Result<()> {
    let account = ledger.register(caller)?;
    println!("Registered {}", account.identity);
    println!("Public Key: {}", account.public_key);
    println!("Secret:     {}", account.secret);
    println!("Block Time: {}", format_timestamp(account.registered_at));
    Ok(())
}

pub fn handle_challenge(ledger: &Ledger, caller: Identity) -> Result<()> {
    let challenge = ledger.generate_challenge(caller)?;
    println!("{}", challenge);
    Ok(())
}

pub fn handle_sign(ledger: &Ledger, caller: Identity) -> Result<()> {
    let sig = ledger.generate_signature(caller)?;
    let json = serde_json::to_string_pretty(&sig)
        .map_err(|e| LedgerError::SerializationError(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

pub fn parse_signature(
    signature: Option<String>,
    hash: Option<Bytes32>,
    v: Option<u8>,
    r: Option<Bytes32>,
    s: Option<Bytes32>,
) -> Result<SimulatedSignature> {
    if let Some(json) = signature {
        return serde_json::from_str(&json)
            .map_err(|e| LedgerError::SerializationError(format!("signature: {}", e)));
    }
    match (hash, v, r, s) {
        (Some(hash), Some(v), Some(r), Some(s)) => Ok(SimulatedSignature { hash, v, r, s }),
        _ => Err(LedgerError::SerializationError(
            "signature needs --hash, --v, --r and --s".to_string(),
        )),
    }
}

/// Prints the verdict; returns it so the caller can pick an exit code.
pub fn handle_authenticate(ledger: &Ledger, caller: Identity, sig: &SimulatedSignature) -> Result<bool> {
    let accepted = ledger.authenticate(caller, sig)?;
    if accepted {
        println!("✅ Authenticated {}", caller);
    } else {
        println!("❌ Signature rejected for {}", caller);
    }
    Ok(accepted)
}

pub fn handle_account(ledger: &Ledger, caller: Identity) -> Result<()> {
    match ledger.account(&caller)? {
        Some(account) => {
            println!("Identity:   {}", account.identity);
            println!("Registered: {}", account.registered);
            println!("Public Key: {}", account.public_key);
            println!("Secret:     {}", account.secret);
            println!("Block Time: {}", format_timestamp(account.registered_at));
        }
        None => println!("No account for {}", caller),
    }
    println!("Latest challenge (shared): {}", ledger.latest_challenge()?);
    Ok(())
}

pub fn handle_events(ledger: &Ledger, json: bool) -> Result<()> {
    let records = ledger.events()?;
    if json {
        let out = serde_json::to_string_pretty(&records)
            .map_err(|e| LedgerError::SerializationError(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }
    if records.is_empty() {
        println!("No events.");
    }
    for record in records {
        println!(
            "#{:<4} {}  {}  {}",
            record.seq,
            format_timestamp(record.timestamp),
            record.caller,
            describe(&record.event)
        );
    }
    Ok(())
}

pub fn describe(event: &LedgerEvent) -> String {
    match event {
        LedgerEvent::UserRegistered { identity, secret, .. } => {
            format!("UserRegistered identity={} secret={}", identity, secret)
        }
        LedgerEvent::ChallengeGenerated { challenge } => {
            format!("ChallengeGenerated challenge={}", challenge)
        }
        LedgerEvent::SignatureGenerated { hash, v, .. } => {
            format!("SignatureGenerated hash={} v={}", hash, v)
        }
    }
}

fn format_timestamp(ts: u64) -> String {
    chrono::DateTime::from_timestamp(ts as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}
