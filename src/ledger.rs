//! The ledger host: one mutex-guarded state, one transaction at a time.
//!
//! Every public operation takes the caller identity as given by the host and
//! runs to completion under the state lock. Operation bodies only read state
//! and stage writes; the writes reach live state after storage accepted them,
//! so a rejected or failed call leaves nothing behind. Notifications go out
//! before the lock is released, in sequence order.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::account::{Account, AccountStore};
use crate::challenge::{self, ChallengeSlot};
use crate::clock::Clock;
use crate::crypto::Bytes32;
use crate::error::{LedgerError, Result};
use crate::events::{EventBus, EventRecord, LedgerEvent};
use crate::identity::Identity;
use crate::signature::{self, SimulatedSignature};
use crate::storage::{StateStore, StateWrite};
use crate::verifier;

#[derive(Debug, Default)]
struct LedgerState {
    accounts: AccountStore,
    challenge: ChallengeSlot,
    next_seq: u64,
    last_timestamp: u64,
    /// In-memory log, used when there is no storage backend.
    log: Vec<EventRecord>,
}

impl LedgerState {
    fn apply(&mut self, write: &StateWrite) {
        match write {
            StateWrite::Account(account) => self.accounts.insert(account.clone()),
            StateWrite::Challenge(challenge) => self.challenge = ChallengeSlot::new(*challenge),
            StateWrite::LastTimestamp(ts) => self.last_timestamp = *ts,
            StateWrite::Event(_) => {}
        }
    }
}

/// Per-transaction context handed to each operation body.
struct TxContext {
    caller: Identity,
    timestamp: u64,
    writes: Vec<StateWrite>,
    events: Vec<LedgerEvent>,
}

impl TxContext {
    fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    fn write(&mut self, write: StateWrite) {
        self.writes.push(write);
    }
}

pub struct Ledger {
    state: Mutex<LedgerState>,
    clock: Arc<dyn Clock>,
    storage: Option<Arc<dyn StateStore>>,
    events: EventBus,
}

impl Ledger {
    /// An in-memory ledger.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            clock,
            storage: None,
            events: EventBus::default(),
        }
    }

    /// A ledger backed by `storage`, rebuilt from whatever it already holds.
    pub fn open(storage: Arc<dyn StateStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        let accounts = AccountStore::from_accounts(storage.load_accounts()?);
        let challenge = ChallengeSlot::new(storage.load_challenge()?.unwrap_or_default());
        let last_timestamp = storage.load_last_timestamp()?.unwrap_or(0);
        let next_seq = storage.last_event_seq()?.map_or(0, |seq| seq + 1);

        info!(
            accounts = accounts.len(),
            next_seq, "Persistence: ledger state restored"
        );

        Ok(Self {
            state: Mutex::new(LedgerState {
                accounts,
                challenge,
                next_seq,
                last_timestamp,
                log: Vec::new(),
            }),
            clock,
            storage: Some(storage),
            events: EventBus::default(),
        })
    }

    // --- Operations ---

    /// Create the caller's account. Fails with `AlreadyRegistered` on repeat.
    pub fn register(&self, caller: Identity) -> Result<Account> {
        self.transact(caller, "register", |state, tx| {
            let account = state.accounts.prepare_register(tx.caller, tx.timestamp)?;
            tx.write(StateWrite::Account(account.clone()));
            tx.emit(LedgerEvent::UserRegistered {
                identity: account.identity,
                public_key: account.public_key,
                secret: account.secret,
            });
            Ok(account)
        })
    }

    /// Issue a challenge and publish it to the slot shared by all identities.
    pub fn generate_challenge(&self, caller: Identity) -> Result<Bytes32> {
        self.transact(caller, "generate_challenge", |state, tx| {
            let mut slot = state.challenge;
            let challenge =
                challenge::generate_challenge(&state.accounts, &mut slot, &tx.caller, tx.timestamp)?;
            tx.write(StateWrite::Challenge(challenge));
            tx.emit(LedgerEvent::ChallengeGenerated { challenge });
            Ok(challenge)
        })
    }

    /// Sign whatever the shared slot currently holds.
    pub fn generate_signature(&self, caller: Identity) -> Result<SimulatedSignature> {
        self.transact(caller, "generate_signature", |state, tx| {
            let sig = signature::generate_signature(&state.accounts, &state.challenge, &tx.caller)?;
            tx.emit(LedgerEvent::from(&sig));
            Ok(sig)
        })
    }

    /// Check a signature for the caller. Read-only; emits nothing.
    pub fn authenticate(&self, caller: Identity, sig: &SimulatedSignature) -> Result<bool> {
        let state = self.lock()?;
        match verifier::authenticate(&state.accounts, &caller, sig) {
            Ok(accepted) => {
                info!(caller = %caller, accepted, "authenticate");
                Ok(accepted)
            }
            Err(e) => {
                debug!(caller = %caller, "authenticate rejected: {}", e);
                Err(e)
            }
        }
    }

    // --- Queries ---

    pub fn account(&self, identity: &Identity) -> Result<Option<Account>> {
        Ok(self.lock()?.accounts.get(identity).cloned())
    }

    pub fn latest_challenge(&self) -> Result<Bytes32> {
        Ok(self.lock()?.challenge.latest())
    }

    /// The committed notification log, oldest first.
    pub fn events(&self) -> Result<Vec<EventRecord>> {
        match &self.storage {
            Some(storage) => storage.load_events(),
            None => Ok(self.lock()?.log.clone()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events.subscribe()
    }

    // --- Transaction boundary ---

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>> {
        self.state.lock().map_err(|_| LedgerError::StatePoisoned)
    }

    fn transact<T, F>(&self, caller: Identity, op: &'static str, body: F) -> Result<T>
    where
        F: FnOnce(&LedgerState, &mut TxContext) -> Result<T>,
    {
        let mut guard = self.lock()?;

        // Block time never runs backwards.
        let timestamp = self.clock.now().max(guard.last_timestamp);
        let mut tx = TxContext {
            caller,
            timestamp,
            writes: Vec::new(),
            events: Vec::new(),
        };

        let output = match body(&*guard, &mut tx) {
            Ok(output) => output,
            Err(e) => {
                debug!(caller = %caller, op, "rejected: {}", e);
                return Err(e);
            }
        };
        tx.write(StateWrite::LastTimestamp(timestamp));

        let first_seq = guard.next_seq;
        let records: Vec<EventRecord> = tx
            .events
            .drain(..)
            .zip(first_seq..)
            .map(|(event, seq)| EventRecord {
                seq,
                timestamp,
                caller,
                event,
            })
            .collect();

        if let Some(storage) = &self.storage {
            tx.writes
                .extend(records.iter().cloned().map(StateWrite::Event));
            if let Err(e) = storage.commit(&tx.writes) {
                error!(caller = %caller, op, "commit failed: {}", e);
                return Err(e);
            }
        }

        for write in &tx.writes {
            guard.apply(write);
        }
        guard.next_seq = first_seq + records.len() as u64;
        if self.storage.is_none() {
            guard.log.extend(records.iter().cloned());
        }

        info!(caller = %caller, op, timestamp, "✅ committed");
        // Still under the lock, so subscribers see commit order.
        for record in records {
            self.events.publish(record);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::compute_challenge;
    use crate::clock::ManualClock;
    use crate::storage::Storage;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    /// A sled store whose commits can be made to fail on demand.
    struct FlakyStore {
        inner: Storage,
        fail_commits: AtomicBool,
    }

    impl StateStore for FlakyStore {
        fn load_accounts(&self) -> Result<Vec<Account>> {
            self.inner.load_accounts()
        }

        fn load_challenge(&self) -> Result<Option<Bytes32>> {
            self.inner.load_challenge()
        }

        fn load_last_timestamp(&self) -> Result<Option<u64>> {
            self.inner.load_last_timestamp()
        }

        fn last_event_seq(&self) -> Result<Option<u64>> {
            self.inner.last_event_seq()
        }

        fn load_events(&self) -> Result<Vec<EventRecord>> {
            self.inner.load_events()
        }

        fn commit(&self, writes: &[StateWrite]) -> Result<()> {
            if self.fail_commits.load(Ordering::SeqCst) {
                return Err(LedgerError::DatabaseError("disk full".to_string()));
            }
            self.inner.commit(writes)
        }
    }

    fn ledger() -> (Ledger, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        (Ledger::new(clock.clone()), clock)
    }

    #[test]
    fn test_round_trip() {
        let (ledger, clock) = ledger();
        let alice = Identity::from_label("alice");

        ledger.register(alice).unwrap();
        clock.advance(12);
        let challenge = ledger.generate_challenge(alice).unwrap();
        let sig = ledger.generate_signature(alice).unwrap();

        assert_eq!(sig.hash, challenge);
        assert!(ledger.authenticate(alice, &sig).unwrap());
    }

    #[test]
    fn test_gating_for_unknown_identity() {
        let (ledger, _) = ledger();
        let ghost = Identity::from_label("ghost");
        let sig = SimulatedSignature {
            hash: Bytes32::ZERO,
            v: 27,
            r: Bytes32::ZERO,
            s: Bytes32::ZERO,
        };

        assert!(matches!(ledger.generate_challenge(ghost), Err(LedgerError::NotRegistered(_))));
        assert!(matches!(ledger.generate_signature(ghost), Err(LedgerError::NotRegistered(_))));
        assert!(matches!(ledger.authenticate(ghost, &sig), Err(LedgerError::NotRegistered(_))));
        assert!(ledger.events().unwrap().is_empty());
    }

    #[test]
    fn test_double_register_leaves_state_alone() {
        let (ledger, clock) = ledger();
        let alice = Identity::from_label("alice");
        let first = ledger.register(alice).unwrap();
        clock.advance(60);

        let err = ledger.register(alice).unwrap_err();

        assert!(matches!(err, LedgerError::AlreadyRegistered(_)));
        assert_eq!(ledger.account(&alice).unwrap(), Some(first));
        assert_eq!(ledger.events().unwrap().len(), 1);
    }

    #[test]
    fn test_shared_slot_interference() {
        let (ledger, clock) = ledger();
        let alice = Identity::from_label("alice");
        let bob = Identity::from_label("bob");
        ledger.register(alice).unwrap();
        ledger.register(bob).unwrap();

        clock.advance(1);
        let alice_challenge = ledger.generate_challenge(alice).unwrap();
        let bob_challenge = ledger.generate_challenge(bob).unwrap();
        let alice_sig = ledger.generate_signature(alice).unwrap();

        assert_ne!(alice_challenge, bob_challenge);
        assert_eq!(alice_sig.hash, bob_challenge);
        // Still verifies: the verifier checks the hash that was signed, not
        // the one alice was issued.
        assert!(ledger.authenticate(alice, &alice_sig).unwrap());
    }

    #[test]
    fn test_block_time_is_monotonic() {
        let (ledger, clock) = ledger();
        let alice = Identity::from_label("alice");
        ledger.register(alice).unwrap();

        clock.set(10);
        let challenge = ledger.generate_challenge(alice).unwrap();

        assert_eq!(challenge, compute_challenge(&alice, 1_000));
    }

    #[test]
    fn test_events_logged_and_published() {
        let (ledger, _) = ledger();
        let mut rx = ledger.subscribe();
        let alice = Identity::from_label("alice");

        let account = ledger.register(alice).unwrap();
        let challenge = ledger.generate_challenge(alice).unwrap();
        let sig = ledger.generate_signature(alice).unwrap();
        ledger.authenticate(alice, &sig).unwrap();
        assert!(matches!(ledger.register(alice), Err(LedgerError::AlreadyRegistered(_))));

        let log = ledger.events().unwrap();
        let seqs: Vec<u64> = log.iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(
            log[0].event,
            LedgerEvent::UserRegistered {
                identity: alice,
                public_key: alice,
                secret: account.secret,
            }
        );
        assert_eq!(log[1].event, LedgerEvent::ChallengeGenerated { challenge });
        assert_eq!(log[2].event, LedgerEvent::from(&sig));

        for expected in &log {
            assert_eq!(&rx.try_recv().unwrap(), expected);
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_concurrent_register_single_winner() {
        let (ledger, _) = ledger();
        let ledger = Arc::new(ledger);
        let alice = Identity::from_label("alice");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                thread::spawn(move || ledger.register(alice).is_ok())
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(wins, 1);
        assert_eq!(ledger.events().unwrap().len(), 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let alice = Identity::from_label("alice");
        let clock = Arc::new(ManualClock::new(5_000));

        let (account, challenge) = {
            let storage = Arc::new(Storage::open(dir.path()).unwrap());
            let ledger = Ledger::open(storage, clock.clone()).unwrap();
            let account = ledger.register(alice).unwrap();
            clock.advance(3);
            (account, ledger.generate_challenge(alice).unwrap())
        };

        let storage = Arc::new(Storage::open(dir.path()).unwrap());
        let ledger = Ledger::open(storage, clock.clone()).unwrap();

        assert_eq!(ledger.account(&alice).unwrap(), Some(account));
        assert_eq!(ledger.latest_challenge().unwrap(), challenge);
        assert!(matches!(ledger.register(alice), Err(LedgerError::AlreadyRegistered(_))));

        let sig = ledger.generate_signature(alice).unwrap();
        assert!(ledger.authenticate(alice, &sig).unwrap());
        let seqs: Vec<u64> = ledger.events().unwrap().iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn test_failed_commit_leaves_state_alone() {
        let store = Arc::new(FlakyStore {
            inner: Storage::temporary().unwrap(),
            fail_commits: AtomicBool::new(false),
        });
        let clock = Arc::new(ManualClock::new(2_000));
        let ledger = Ledger::open(store.clone(), clock.clone()).unwrap();
        let alice = Identity::from_label("alice");
        let bob = Identity::from_label("bob");

        ledger.register(alice).unwrap();
        let challenge = ledger.generate_challenge(alice).unwrap();
        let log_before = ledger.events().unwrap();
        let mut rx = ledger.subscribe();

        store.fail_commits.store(true, Ordering::SeqCst);
        clock.advance(30);
        assert!(matches!(ledger.register(bob), Err(LedgerError::DatabaseError(_))));
        assert!(matches!(ledger.generate_challenge(alice), Err(LedgerError::DatabaseError(_))));
        assert!(matches!(ledger.generate_signature(alice), Err(LedgerError::DatabaseError(_))));

        assert_eq!(ledger.account(&bob).unwrap(), None);
        assert_eq!(ledger.latest_challenge().unwrap(), challenge);
        assert_eq!(ledger.events().unwrap(), log_before);
        assert!(rx.try_recv().is_err());

        // Once the store recovers, sequence numbers carry on without a gap.
        store.fail_commits.store(false, Ordering::SeqCst);
        ledger.register(bob).unwrap();
        assert_eq!(rx.try_recv().unwrap().seq, 2);
    }

    #[test]
    fn test_concurrent_events_published_in_commit_order() {
        let (ledger, _) = ledger();
        let ledger = Arc::new(ledger);
        let callers: Vec<Identity> = (0..8)
            .map(|i| Identity::from_label(&format!("user{}", i)))
            .collect();
        for caller in &callers {
            ledger.register(*caller).unwrap();
        }
        let mut rx = ledger.subscribe();

        let mut last_seq = None;
        let mut received = 0;
        for _ in 0..50 {
            let handles: Vec<_> = callers
                .iter()
                .map(|caller| {
                    let ledger = ledger.clone();
                    let caller = *caller;
                    thread::spawn(move || {
                        for _ in 0..4 {
                            ledger.generate_challenge(caller).unwrap();
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            while let Ok(record) = rx.try_recv() {
                if let Some(prev) = last_seq {
                    assert_eq!(record.seq, prev + 1);
                }
                last_seq = Some(record.seq);
                received += 1;
            }
        }

        assert_eq!(received, 8 * 4 * 50);
        assert_eq!(ledger.events().unwrap().len(), 8 + 8 * 4 * 50);
    }
}
