use std::sync::Arc;

use crate::domain::entities::{Account, AccountRole, Wallet};
use crate::domain::error::WalletError;
use crate::domain::gateways::BalanceCache;
use crate::domain::repository::{AccountRepository, LedgerStore};
use crate::domain::types::{AccountId, PhoneNumber};

/// Registro de identidades y billeteras.
///
/// Resuelve cuentas por teléfono, crea billeteras de forma perezosa y siembra
/// el balance cacheado desde el valor durable exactamente una vez. Todas las
/// operaciones `ensure_*` son idempotentes.
#[derive(Clone)]
pub struct WalletRegistry {
    accounts: Arc<dyn AccountRepository>,
    ledger: Arc<dyn LedgerStore>,
    cache: Arc<dyn BalanceCache>,
}

impl WalletRegistry {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        ledger: Arc<dyn LedgerStore>,
        cache: Arc<dyn BalanceCache>,
    ) -> Self {
        Self {
            accounts,
            ledger,
            cache,
        }
    }

    /// Resuelve una cuenta existente o falla con `AccountNotFound`.
    pub async fn lookup_account(&self, phone: &PhoneNumber) -> Result<Account, WalletError> {
        self.accounts
            .find_by_phone(phone)
            .await?
            .ok_or_else(|| WalletError::AccountNotFound(phone.to_string()))
    }

    /// Crea la cuenta si no existe; nunca sobreescribe una existente.
    pub async fn ensure_account(
        &self,
        phone: &PhoneNumber,
        default_role: AccountRole,
    ) -> Result<Account, WalletError> {
        self.accounts.get_or_create(phone, default_role).await
    }

    /// Crea la billetera (balance 0.00, ACTIVE) si no existe y siembra el
    /// balance cacheado en la primera observación.
    pub async fn ensure_wallet(&self, account_id: AccountId) -> Result<Wallet, WalletError> {
        let wallet = self.ledger.get_or_create_wallet(account_id).await?;
        self.cache.seed_balance(account_id, wallet.balance).await?;
        Ok(wallet)
    }
}
