use crate::domain::types::{AccountId, CreditRequestId};
use thiserror::Error;

/// Error unificado del dominio de billeteras.
///
/// Cada variante corresponde a un modo de fallo observable por el caller; la
/// capa API es la única que decide códigos HTTP (ver `api::error`).
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Account not found with phone number: {0}")]
    AccountNotFound(String),

    #[error("Wallet is not active for account: {0}")]
    WalletInactive(AccountId),

    #[error("Insufficient balance in wallet: {0}")]
    InsufficientBalance(AccountId),

    #[error("Credit request not found or already processed: {0}")]
    RequestMissing(CreditRequestId),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Could not acquire wallet locks: {0}")]
    LockBusy(String),

    // Interno: lo absorbe el bucle de reintentos del Transfer Engine.
    #[error("Cache commit conflict: {0}")]
    Conflict(String),

    #[error("Max retries exceeded: {0}")]
    Concurrency(String),

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Repository error: {0}")]
    RepositoryError(String),
}
