//! Account storage: the registry half of the ledger state

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::types::Account;
use crate::error::{LedgerError, Result};
use crate::identity::Identity;

/// All accounts known to the ledger, keyed by identity.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct AccountStore {
    accounts: HashMap<Identity, Account>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted records.
    pub fn from_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        Self {
            accounts: accounts.into_iter().map(|a| (a.identity, a)).collect(),
        }
    }

    /// Check that `identity` may register at block time `timestamp` and build
    /// its record. Nothing is stored until the caller `insert`s it.
    ///
    /// A record that exists but is not flagged `registered` may be
    /// (re)registered; a registered one is rejected with `AlreadyRegistered`.
    pub fn prepare_register(&self, identity: Identity, timestamp: u64) -> Result<Account> {
        if self.is_registered(&identity) {
            return Err(LedgerError::AlreadyRegistered(identity));
        }
        Ok(Account::new_registered(identity, timestamp))
    }

    /// Store a record, replacing any previous one for the same identity.
    pub fn insert(&mut self, account: Account) {
        self.accounts.insert(account.identity, account);
    }

    pub fn is_registered(&self, identity: &Identity) -> bool {
        self.accounts.get(identity).map_or(false, |a| a.registered)
    }

    /// Gate shared by the challenge, signature, and verification steps.
    pub fn require_registered(&self, identity: &Identity) -> Result<&Account> {
        self.accounts
            .get(identity)
            .filter(|a| a.registered)
            .ok_or(LedgerError::NotRegistered(*identity))
    }

    pub fn get(&self, identity: &Identity) -> Option<&Account> {
        self.accounts.get(identity)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
