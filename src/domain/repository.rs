use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::entities::{
    Account, AccountRole, ChargeSale, CreditRequest, CreditRequestStatus, LedgerEntry, Wallet,
};
use crate::domain::error::WalletError;
use crate::domain::types::{AccountId, ChargeSaleId, CreditRequestId, PhoneNumber, TransactionId};

/// Registro que el commit durable usa para enlazar el origen de la
/// transferencia con su transición de estado terminal.
#[derive(Debug, Clone)]
pub enum TransferOrigin {
    /// PENDING -> COMPLETED, enlazando el asiento del lado vendedor.
    ChargeSale {
        id: ChargeSaleId,
        seller_entry: TransactionId,
    },
    /// WAITING -> ACCEPTED, estampando el admin que autorizó.
    CreditApproval {
        id: CreditRequestId,
        admin_id: AccountId,
    },
}

/// Carga completa de un commit durable: N asientos, N balances finales y la
/// transición del registro de origen. Se aplica todo o nada.
#[derive(Debug, Clone)]
pub struct TransferCommit {
    pub entries: Vec<LedgerEntry>,
    pub balances: Vec<(AccountId, Decimal)>,
    pub origin: TransferOrigin,
}

// Port for Account persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Account>, WalletError>;

    /// Get-or-create idempotente: nunca sobreescribe una cuenta existente.
    async fn get_or_create(
        &self,
        phone: &PhoneNumber,
        role: AccountRole,
    ) -> Result<Account, WalletError>;
}

// Port for the durable ledger (wallets, credit requests, charge sales, entries)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_or_create_wallet(&self, account_id: AccountId) -> Result<Wallet, WalletError>;

    async fn find_wallet(&self, account_id: AccountId) -> Result<Option<Wallet>, WalletError>;

    async fn update_wallet_balance(
        &self,
        account_id: AccountId,
        balance: Decimal,
    ) -> Result<(), WalletError>;

    async fn create_credit_request(
        &self,
        account_id: AccountId,
        amount: Decimal,
    ) -> Result<CreditRequest, WalletError>;

    async fn find_credit_request(
        &self,
        id: CreditRequestId,
    ) -> Result<Option<CreditRequest>, WalletError>;

    /// Transición precondicionada: solo aplica si el estado actual es `from`.
    /// Retorna `true` si este caller ganó la transición (regla single-winner
    /// entre procesadores concurrentes).
    async fn transition_credit_request(
        &self,
        id: CreditRequestId,
        from: CreditRequestStatus,
        to: CreditRequestStatus,
        admin_id: AccountId,
    ) -> Result<bool, WalletError>;

    async fn create_charge_sale(&self, sale: &ChargeSale) -> Result<(), WalletError>;

    async fn find_charge_sale(&self, id: ChargeSaleId)
        -> Result<Option<ChargeSale>, WalletError>;

    /// Historial de ventas de un vendedor, de la más reciente a la más vieja.
    async fn charge_sales_for_seller(
        &self,
        seller_id: AccountId,
    ) -> Result<Vec<ChargeSale>, WalletError>;

    /// PENDING -> FAILED; no-op si la venta ya alcanzó otro estado terminal.
    async fn mark_charge_sale_failed(&self, id: ChargeSaleId) -> Result<(), WalletError>;

    /// Commit durable de una transferencia dentro de UNA transacción
    /// persistente: inserta los asientos (id duplicado rechazado), fija los
    /// balances y transiciona el registro de origen. Todo o nada.
    async fn commit_transfer(&self, commit: &TransferCommit) -> Result<(), WalletError>;

    /// Asientos de una cuenta, ordenados por fecha y desempatados por id.
    async fn entries_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<LedgerEntry>, WalletError>;

    async fn entries_for_reference(
        &self,
        reference_id: &str,
    ) -> Result<Vec<LedgerEntry>, WalletError>;
}
