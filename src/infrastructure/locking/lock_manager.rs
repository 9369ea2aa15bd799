use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex as TokioMutex, OwnedMutexGuard};
use tracing::warn;
use uuid::Uuid;

use crate::domain::error::WalletError;
use crate::domain::gateways::LeaseStore;
use crate::domain::types::AccountId;

/// Clave del lease compartido de una billetera.
pub fn lock_key(account_id: AccountId) -> String {
    format!("lock:wallet:{account_id}")
}

/// Constantes del lock de dos niveles. Todas configurables vía entorno.
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// Timeout del mutex local por par de billeteras (T_app).
    pub local_timeout: Duration,
    /// TTL del lease en el store compartido (T_lease).
    pub lease_ttl: Duration,
    /// Intentos de adquisición del lease (R_lock).
    pub lease_retry_attempts: u32,
    /// Espera entre intentos de lease.
    pub lease_retry_delay: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            local_timeout: Duration::from_secs(5),
            lease_ttl: Duration::from_secs(60),
            lease_retry_attempts: 20,
            lease_retry_delay: Duration::from_millis(200),
        }
    }
}

/// Scope de exclusión sobre un par de billeteras.
///
/// Mientras viva el guard, ningún otro worker (local o remoto) puede mutar
/// ninguna de las dos billeteras. En `Drop` libera los leases en orden
/// inverso y después el mutex local, en cualquier camino de salida,
/// incluyendo unwind por panic.
pub struct DualWalletGuard {
    held: Vec<(String, Uuid)>,
    leases: Arc<dyn LeaseStore>,
    _local: OwnedMutexGuard<()>,
}

impl Drop for DualWalletGuard {
    fn drop(&mut self) {
        while let Some((key, token)) = self.held.pop() {
            if !self.leases.release(&key, token) {
                warn!("Lease {} was not held at release time (expired?)", key);
            }
        }
    }
}

/// Lock manager de dos niveles: mutex en proceso + lease compartido.
///
/// La adquisición siempre ordenada del par `(lo, hi)` elimina el deadlock;
/// el mutex local colapsa la contención inútil entre workers co-ubicados y
/// el TTL del lease acota el daño si un worker muere sosteniéndolo.
pub struct WalletLockManager {
    leases: Arc<dyn LeaseStore>,
    // Mutex por par ordenado de cuentas; las entradas se crean bajo demanda
    // y no se recolectan.
    local: DashMap<(AccountId, AccountId), Arc<TokioMutex<()>>>,
    config: LockConfig,
}

impl WalletLockManager {
    pub fn new(leases: Arc<dyn LeaseStore>, config: LockConfig) -> Self {
        Self {
            leases,
            local: DashMap::new(),
            config,
        }
    }

    /// Adquiere el scope sobre `a` y `b`. Con `a == b` degenera en el caso
    /// de lock único (auto-transferencia).
    pub async fn with_two_wallets(
        &self,
        a: AccountId,
        b: AccountId,
    ) -> Result<DualWalletGuard, WalletError> {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

        let pair_mutex = self
            .local
            .entry((lo, hi))
            .or_insert_with(|| Arc::new(TokioMutex::new(())))
            .clone();

        let local = tokio::time::timeout(self.config.local_timeout, pair_mutex.lock_owned())
            .await
            .map_err(|_| {
                WalletError::LockBusy(format!(
                    "could not acquire application lock for pair ({lo}, {hi})"
                ))
            })?;

        let mut guard = DualWalletGuard {
            held: Vec::with_capacity(2),
            leases: self.leases.clone(),
            _local: local,
        };

        self.acquire_lease(&lock_key(lo), &mut guard).await?;
        if hi != lo {
            self.acquire_lease(&lock_key(hi), &mut guard).await?;
        }
        Ok(guard)
    }

    async fn acquire_lease(
        &self,
        key: &str,
        guard: &mut DualWalletGuard,
    ) -> Result<(), WalletError> {
        let token = Uuid::new_v4();
        for attempt in 1..=self.config.lease_retry_attempts {
            if self.leases.try_acquire(key, token, self.config.lease_ttl) {
                guard.held.push((key.to_string(), token));
                return Ok(());
            }
            if attempt < self.config.lease_retry_attempts {
                tokio::time::sleep(self.config.lease_retry_delay).await;
            }
        }
        // El guard parcial libera en Drop lo que ya se haya adquirido.
        Err(WalletError::LockBusy(format!(
            "could not acquire lease {} after {} attempts",
            key, self.config.lease_retry_attempts
        )))
    }
}
