use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use super::auth::describe;
use crate::clock::{Clock, ManualClock, SystemClock};
use crate::error::Result;
use crate::identity::Identity;
use crate::ledger::Ledger;
use crate::signature::SimulatedSignature;

/// Run the whole flow for two identities on a throwaway in-memory ledger,
/// with a watcher task printing every notification as it is committed.
pub async fn run_demo() -> Result<()> {
    let clock = Arc::new(ManualClock::new(SystemClock.now()));
    let ledger = Ledger::new(clock.clone());

    let mut rx = ledger.subscribe();
    let watcher = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(record) => println!("   📣 #{} {}", record.seq, describe(&record.event)),
                Err(RecvError::Lagged(n)) => println!("   📣 (missed {} events)", n),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let alice = Identity::from_label("alice");
    let bob = Identity::from_label("bob");

    println!("\n=== 1. Register ===");
    ledger.register(alice)?;
    ledger.register(bob)?;
    match ledger.register(alice) {
        Err(e) => println!("Second registration refused: {}", e),
        Ok(_) => println!("Second registration unexpectedly accepted"),
    }

    println!("\n=== 2. Challenge -> Sign -> Authenticate (alice) ===");
    clock.advance(12);
    let challenge = ledger.generate_challenge(alice)?;
    let sig = ledger.generate_signature(alice)?;
    println!("challenge = {}", challenge);
    println!("accepted  = {}", ledger.authenticate(alice, &sig)?);

    let tampered = SimulatedSignature { s: sig.s.with_bit_flipped(0), ..sig };
    println!("tampered  = {}", ledger.authenticate(alice, &tampered)?);

    println!("\n=== 3. Shared challenge slot ===");
    clock.advance(12);
    let alice_challenge = ledger.generate_challenge(alice)?;
    let bob_challenge = ledger.generate_challenge(bob)?;
    let alice_sig = ledger.generate_signature(alice)?;
    println!("alice was issued   {}", alice_challenge);
    println!("bob was issued     {}", bob_challenge);
    println!("alice then signed  {}", alice_sig.hash);
    if alice_sig.hash == bob_challenge {
        println!("⚠️  alice signed bob's challenge: the slot is global");
    }

    // Closing the bus ends the watcher once it has drained.
    drop(ledger);
    let _ = watcher.await;
    Ok(())
}
