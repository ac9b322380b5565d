use serde::Deserialize;
use std::path::Path;

use crate::account::Account;
use crate::crypto::Bytes32;
use crate::error::Result;
use crate::events::EventRecord;
use crate::identity::Identity;

const ACCOUNT_PREFIX: &str = "account:";
const EVENT_PREFIX: &str = "event:";
const CHALLENGE_KEY: &str = "challenge:latest";
const LAST_TIMESTAMP_KEY: &str = "meta:last_timestamp";

/// A state change produced by one ledger transaction.
#[derive(Debug, Clone)]
pub enum StateWrite {
    Account(Account),
    Challenge(Bytes32),
    LastTimestamp(u64),
    Event(EventRecord),
}

/// What the ledger needs from its durable backend: load on open, and commit
/// one transaction's writes all-or-nothing.
pub trait StateStore: Send + Sync {
    fn load_accounts(&self) -> Result<Vec<Account>>;
    fn load_challenge(&self) -> Result<Option<Bytes32>>;
    fn load_last_timestamp(&self) -> Result<Option<u64>>;
    /// Sequence number of the newest logged event, if any.
    fn last_event_seq(&self) -> Result<Option<u64>>;
    fn load_events(&self) -> Result<Vec<EventRecord>>;
    fn commit(&self, writes: &[StateWrite]) -> Result<()>;
}

/// Durable ledger state, backed by sled.
pub struct Storage {
    db: sled::Db,
}

impl Storage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Storage { db })
    }

    /// A database that is removed when dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Storage { db })
    }

    // Generic Helper: Get
    fn get<T: for<'a> Deserialize<'a>>(&self, key: &str) -> Result<Option<T>> {
        match self.db.get(key.as_bytes())? {
            Some(data) => Ok(Some(bincode::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    fn scan<T: for<'a> Deserialize<'a>>(&self, prefix: &str) -> Result<Vec<T>> {
        let mut out = Vec::new();
        for item in self.db.scan_prefix(prefix.as_bytes()) {
            let (_, data) = item?;
            out.push(bincode::deserialize(&data)?);
        }
        Ok(out)
    }
}

impl StateStore for Storage {
    fn load_accounts(&self) -> Result<Vec<Account>> {
        self.scan(ACCOUNT_PREFIX)
    }

    fn load_challenge(&self) -> Result<Option<Bytes32>> {
        self.get(CHALLENGE_KEY)
    }

    fn load_last_timestamp(&self) -> Result<Option<u64>> {
        self.get(LAST_TIMESTAMP_KEY)
    }

    fn last_event_seq(&self) -> Result<Option<u64>> {
        match self.db.scan_prefix(EVENT_PREFIX.as_bytes()).next_back() {
            Some(item) => {
                let (_, data) = item?;
                let record: EventRecord = bincode::deserialize(&data)?;
                Ok(Some(record.seq))
            }
            None => Ok(None),
        }
    }

    /// Events in commit order (keys are zero-padded sequence numbers).
    fn load_events(&self) -> Result<Vec<EventRecord>> {
        self.scan(EVENT_PREFIX)
    }

    /// Apply all writes of one transaction atomically and flush them to disk.
    fn commit(&self, writes: &[StateWrite]) -> Result<()> {
        let mut batch = sled::Batch::default();
        for write in writes {
            let (key, value) = match write {
                StateWrite::Account(account) => {
                    (account_key(&account.identity), bincode::serialize(account)?)
                }
                StateWrite::Challenge(challenge) => {
                    (CHALLENGE_KEY.to_string(), bincode::serialize(challenge)?)
                }
                StateWrite::LastTimestamp(ts) => {
                    (LAST_TIMESTAMP_KEY.to_string(), bincode::serialize(ts)?)
                }
                StateWrite::Event(record) => (event_key(record.seq), bincode::serialize(record)?),
            };
            batch.insert(key.as_bytes(), value);
        }
        self.db.apply_batch(batch)?;
        self.db.flush()?;
        Ok(())
    }
}

fn account_key(identity: &Identity) -> String {
    format!("{}{}", ACCOUNT_PREFIX, identity.to_hex())
}

fn event_key(seq: u64) -> String {
    format!("{}{:020}", EVENT_PREFIX, seq)
}
