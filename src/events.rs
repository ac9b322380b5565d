//! Ledger notifications.
//!
//! Every successful state-changing call emits exactly one event. Events go to
//! the ordered log kept by the ledger and to any live subscribers; nobody is
//! required to listen.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;

use crate::crypto::Bytes32;
use crate::identity::Identity;
use crate::signature::SimulatedSignature;

pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    /// Carries the account secret in the clear.
    UserRegistered {
        identity: Identity,
        public_key: Identity,
        secret: Bytes32,
    },
    ChallengeGenerated {
        challenge: Bytes32,
    },
    SignatureGenerated {
        hash: Bytes32,
        v: u8,
        r: Bytes32,
        s: Bytes32,
    },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::UserRegistered { .. } => "UserRegistered",
            LedgerEvent::ChallengeGenerated { .. } => "ChallengeGenerated",
            LedgerEvent::SignatureGenerated { .. } => "SignatureGenerated",
        }
    }
}

impl From<&SimulatedSignature> for LedgerEvent {
    fn from(sig: &SimulatedSignature) -> Self {
        LedgerEvent::SignatureGenerated {
            hash: sig.hash,
            v: sig.v,
            r: sig.r,
            s: sig.s,
        }
    }
}

/// An event as committed to the ledger log.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EventRecord {
    pub seq: u64,
    pub timestamp: u64,
    pub caller: Identity,
    pub event: LedgerEvent,
}

/// Fan-out of committed events to live watchers.
pub struct EventBus {
    tx: broadcast::Sender<EventRecord>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.tx.subscribe()
    }

    /// Fire and forget. Having no subscribers is fine.
    pub fn publish(&self, record: EventRecord) {
        info!(
            seq = record.seq,
            caller = %record.caller,
            "📣 {}",
            record.event.name()
        );
        let _ = self.tx.send(record);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}
