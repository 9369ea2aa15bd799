use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::error::WalletError;
use crate::domain::types::AccountId;

/// Escritura especulativa sobre la capa de caché.
///
/// `expected` son los balances que el caller leyó antes de calcular;
/// `writes` los balances nuevos y `appends` los asientos serializados que se
/// agregan al log espejo de cada cuenta. La implementación debe verificar y
/// aplicar todo de forma atómica y linealizable entre callers concurrentes.
#[derive(Debug, Clone)]
pub struct CacheCommit {
    pub expected: Vec<(AccountId, Decimal)>,
    pub writes: Vec<(AccountId, Decimal)>,
    pub appends: Vec<(AccountId, String)>,
}

// Port for the fast shared balance cache (keyspace: wallet:user:<id>,
// transactions:user:<id>)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BalanceCache: Send + Sync {
    /// Balance cacheado; clave ausente se lee como 0.00.
    async fn read_balance(&self, account_id: AccountId) -> Result<Decimal, WalletError>;

    /// Siembra el balance desde el valor durable SOLO en la primera
    /// observación; llamadas posteriores no tocan el valor cacheado.
    async fn seed_balance(&self, account_id: AccountId, balance: Decimal)
        -> Result<(), WalletError>;

    /// Primitiva de commit optimista. Falla con `Conflict` si algún balance
    /// actual difiere del esperado; en ese caso no escribe nada.
    async fn compare_and_swap(&self, commit: &CacheCommit) -> Result<(), WalletError>;

    /// Escritura incondicional. Solo para caminos de compensación.
    async fn hard_set(&self, account_id: AccountId, balance: Decimal) -> Result<(), WalletError>;

    /// Quita la primera ocurrencia del payload en el log espejo de la cuenta.
    /// Solo para caminos de compensación.
    async fn remove_entry(&self, account_id: AccountId, payload: &str) -> Result<(), WalletError>;

    /// Lectura del log espejo (auditoría reciente).
    async fn entry_log(&self, account_id: AccountId) -> Result<Vec<String>, WalletError>;
}

/// Port para los leases del store compartido (claves `lock:wallet:<id>`).
///
/// Las operaciones son síncronas para que el guard del lock manager pueda
/// liberar en `Drop`, incluso durante un unwind.
pub trait LeaseStore: Send + Sync {
    /// Adquiere (o refresca, si el token coincide) el lease. Retorna `false`
    /// si otro holder lo tiene y su TTL no expiró.
    fn try_acquire(&self, key: &str, token: Uuid, ttl: Duration) -> bool;

    /// Libera el lease solo si el token coincide con el holder actual.
    fn release(&self, key: &str, token: Uuid) -> bool;
}
