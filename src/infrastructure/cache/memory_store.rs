use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::domain::entities::rescaled;
use crate::domain::error::WalletError;
use crate::domain::gateways::{BalanceCache, CacheCommit, LeaseStore};
use crate::domain::types::AccountId;

/// Clave del hash de billetera en el store compartido (campo: balance).
pub fn wallet_key(account_id: AccountId) -> String {
    format!("wallet:user:{account_id}")
}

/// Clave del log espejo de asientos de una cuenta.
pub fn transactions_key(account_id: AccountId) -> String {
    format!("transactions:user:{account_id}")
}

struct LeaseEntry {
    token: Uuid,
    expires_at: Instant,
}

#[derive(Default)]
struct StoreInner {
    // wallet:user:<id> -> texto decimal canónico del campo balance
    balances: HashMap<String, String>,
    // transactions:user:<id> -> lista append-only de asientos serializados
    entry_logs: HashMap<String, Vec<String>>,
    // lock:wallet:<id> -> lease con TTL
    leases: HashMap<String, LeaseEntry>,
}

/// Store compartido en memoria: balances, logs espejo y leases.
///
/// Un único mutex sobre todo el keyspace hace que `compare_and_swap` sea
/// linealizable entre callers concurrentes, que es exactamente el contrato
/// que el Transfer Engine necesita de la fábrica compartida.
pub struct InMemorySharedStore {
    inner: Mutex<StoreInner>,
}

impl InMemorySharedStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
        }
    }
}

impl Default for InMemorySharedStore {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_balance(raw: Option<&String>) -> Result<Decimal, WalletError> {
    match raw {
        Some(text) => Decimal::from_str(text)
            .map_err(|e| WalletError::RepositoryError(format!("corrupt cached balance: {e}"))),
        None => Ok(Decimal::ZERO),
    }
}

#[async_trait]
impl BalanceCache for InMemorySharedStore {
    async fn read_balance(&self, account_id: AccountId) -> Result<Decimal, WalletError> {
        let inner = self.inner.lock();
        parse_balance(inner.balances.get(&wallet_key(account_id)))
    }

    async fn seed_balance(
        &self,
        account_id: AccountId,
        balance: Decimal,
    ) -> Result<(), WalletError> {
        let mut inner = self.inner.lock();
        inner
            .balances
            .entry(wallet_key(account_id))
            .or_insert_with(|| rescaled(balance).to_string());
        Ok(())
    }

    async fn compare_and_swap(&self, commit: &CacheCommit) -> Result<(), WalletError> {
        let mut inner = self.inner.lock();

        // Fase de verificación: ningún balance pudo haber cambiado desde la
        // lectura del caller. Cualquier diferencia aborta sin escribir.
        for (account_id, expected) in &commit.expected {
            let current = parse_balance(inner.balances.get(&wallet_key(*account_id)))?;
            if current != *expected {
                return Err(WalletError::Conflict(format!(
                    "balance changed for {} (expected {}, found {})",
                    wallet_key(*account_id),
                    expected,
                    current
                )));
            }
        }

        for (account_id, balance) in &commit.writes {
            inner
                .balances
                .insert(wallet_key(*account_id), rescaled(*balance).to_string());
        }
        for (account_id, payload) in &commit.appends {
            inner
                .entry_logs
                .entry(transactions_key(*account_id))
                .or_default()
                .push(payload.clone());
        }
        Ok(())
    }

    async fn hard_set(&self, account_id: AccountId, balance: Decimal) -> Result<(), WalletError> {
        let mut inner = self.inner.lock();
        inner
            .balances
            .insert(wallet_key(account_id), rescaled(balance).to_string());
        Ok(())
    }

    async fn remove_entry(
        &self,
        account_id: AccountId,
        payload: &str,
    ) -> Result<(), WalletError> {
        let mut inner = self.inner.lock();
        if let Some(log) = inner.entry_logs.get_mut(&transactions_key(account_id)) {
            if let Some(position) = log.iter().position(|item| item == payload) {
                log.remove(position);
            }
        }
        Ok(())
    }

    async fn entry_log(&self, account_id: AccountId) -> Result<Vec<String>, WalletError> {
        let inner = self.inner.lock();
        Ok(inner
            .entry_logs
            .get(&transactions_key(account_id))
            .cloned()
            .unwrap_or_default())
    }
}

impl LeaseStore for InMemorySharedStore {
    fn try_acquire(&self, key: &str, token: Uuid, ttl: Duration) -> bool {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        match inner.leases.get(key) {
            Some(lease) if lease.expires_at > now && lease.token != token => false,
            _ => {
                inner.leases.insert(
                    key.to_string(),
                    LeaseEntry {
                        token,
                        expires_at: now + ttl,
                    },
                );
                true
            }
        }
    }

    fn release(&self, key: &str, token: Uuid) -> bool {
        let mut inner = self.inner.lock();
        match inner.leases.get(key) {
            Some(lease) if lease.token == token => {
                inner.leases.remove(key);
                true
            }
            _ => false,
        }
    }
}
