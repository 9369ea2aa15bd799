use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::error::WalletError;
use crate::domain::types::{AccountId, ChargeSaleId, CreditRequestId, PhoneNumber, TransactionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountRole {
    ADMIN,
    SELLER,
    USER,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "wallet_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletStatus {
    ACTIVE,
    DEACTIVE,
    SUSPEND,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "credit_request_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditRequestStatus {
    WAITING,
    ACCEPTED,
    REJECTED,
    FAILED,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    CREDIT_INCREASE,
    CHARGE_SALE,
    REFUND,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "charge_sale_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeSaleStatus {
    PENDING,
    COMPLETED,
    FAILED,
    REFUNDED,
}

/// Monto mínimo que acepta cualquier transferencia o solicitud de crédito.
pub fn minimum_transfer_amount() -> Decimal {
    Decimal::new(1_000_00, 2)
}

/// Normaliza un monto al formato canónico de dos decimales.
///
/// Todo valor monetario se cachea, persiste y compara con esta escala para
/// evitar derivas de representación ("1000" vs "1000.00").
pub fn rescaled(amount: Decimal) -> Decimal {
    let mut canonical = amount;
    canonical.rescale(2);
    canonical
}

/// Valida el monto de una transferencia antes de tomar cualquier lock.
pub fn validate_transfer_amount(amount: Decimal) -> Result<(), WalletError> {
    if amount <= Decimal::ZERO {
        return Err(WalletError::InvalidAmount(
            "amount must be positive".to_string(),
        ));
    }
    if amount.normalize().scale() > 2 {
        return Err(WalletError::InvalidAmount(
            "amount supports at most 2 decimal places".to_string(),
        ));
    }
    if amount < minimum_transfer_amount() {
        return Err(WalletError::InvalidAmount(format!(
            "minimum transfer amount is {}",
            minimum_transfer_amount()
        )));
    }
    Ok(())
}

/// Modelo de Entidad: Account.
/// Identidad mínima del sistema: teléfono único de 11 caracteres y rol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub phone_number: PhoneNumber,
    pub role: AccountRole,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(phone_number: PhoneNumber, role: AccountRole) -> Self {
        Self {
            id: AccountId::new(),
            phone_number,
            role,
            created_at: Utc::now(),
        }
    }
}

/// Modelo de Entidad: Wallet.
/// Una billetera por cuenta; el balance durable es la fuente de verdad.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub account_id: AccountId,
    pub balance: Decimal,
    pub status: WalletStatus,
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            balance: rescaled(Decimal::ZERO),
            status: WalletStatus::ACTIVE,
            created_at: Utc::now(),
        }
    }

    /// Falla con `WalletInactive` si la billetera no está ACTIVE.
    pub fn require_active(&self) -> Result<(), WalletError> {
        if self.status != WalletStatus::ACTIVE {
            return Err(WalletError::WalletInactive(self.account_id));
        }
        Ok(())
    }
}

/// Modelo de Entidad: CreditRequest.
/// Solicitud de un vendedor para que el admin le transfiera crédito.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditRequest {
    pub id: CreditRequestId,
    pub account_id: AccountId,
    pub amount: Decimal,
    pub status: CreditRequestStatus,
    pub admin_id: Option<AccountId>,
    pub created_at: DateTime<Utc>,
}

/// Modelo de Entidad: ChargeSale.
/// Transferencia iniciada por un vendedor hacia el teléfono de un comprador.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeSale {
    pub id: ChargeSaleId,
    pub seller_id: AccountId,
    pub phone_number: PhoneNumber,
    pub amount: Decimal,
    pub status: ChargeSaleStatus,
    pub transaction_id: Option<TransactionId>,
    pub created_at: DateTime<Utc>,
}

impl ChargeSale {
    pub fn new(seller_id: AccountId, phone_number: PhoneNumber, amount: Decimal) -> Self {
        Self {
            id: ChargeSaleId::new(),
            seller_id,
            phone_number,
            amount: rescaled(amount),
            status: ChargeSaleStatus::PENDING,
            transaction_id: None,
            created_at: Utc::now(),
        }
    }
}

/// Modelo de Entidad: LedgerEntry (Transaction).
///
/// Asiento inmutable del libro mayor: registra el cambio de balance de UNA
/// billetera. `amount` es con signo (débito negativo, crédito positivo) y
/// `reference_id` apunta al ChargeSale o CreditRequest que lo originó.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: TransactionId,
    pub seller_id: AccountId,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub reference_id: String,
    pub description: String,
    pub admin_id: Option<AccountId>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        seller_id: AccountId,
        transaction_type: TransactionType,
        amount: Decimal,
        balance_before: Decimal,
        balance_after: Decimal,
        reference_id: String,
        description: String,
        admin_id: Option<AccountId>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            seller_id,
            transaction_type,
            amount: rescaled(amount),
            balance_before: rescaled(balance_before),
            balance_after: rescaled(balance_after),
            reference_id,
            description,
            admin_id,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case("1000.00", true)]
    #[case("1000", true)]
    #[case("30000.00", true)]
    #[case("999.99", false)]
    #[case("0", false)]
    #[case("-1000.00", false)]
    #[case("1000.005", false)]
    fn test_validate_transfer_amount(#[case] raw: &str, #[case] ok: bool) {
        let amount = Decimal::from_str(raw).unwrap();
        assert_eq!(validate_transfer_amount(amount).is_ok(), ok, "amount: {raw}");
    }

    #[test]
    fn test_rescaled_is_canonical_text() {
        assert_eq!(rescaled(Decimal::from_str("1000").unwrap()).to_string(), "1000.00");
        assert_eq!(rescaled(Decimal::from_str("0").unwrap()).to_string(), "0.00");
        assert_eq!(
            rescaled(Decimal::from_str("30000000.0").unwrap()).to_string(),
            "30000000.00"
        );
    }

    #[test]
    fn test_wallet_require_active() {
        let mut wallet = Wallet::new(AccountId::new());
        assert!(wallet.require_active().is_ok());

        wallet.status = WalletStatus::SUSPEND;
        match wallet.require_active().unwrap_err() {
            WalletError::WalletInactive(id) => assert_eq!(id, wallet.account_id),
            other => panic!("Expected WalletInactive, got {other:?}"),
        }
    }

    #[test]
    fn test_charge_sale_starts_pending() {
        let sale = ChargeSale::new(
            AccountId::new(),
            PhoneNumber::new("09123456789").unwrap(),
            Decimal::from_str("1000").unwrap(),
        );
        assert_eq!(sale.status, ChargeSaleStatus::PENDING);
        assert_eq!(sale.amount.to_string(), "1000.00");
        assert!(sale.transaction_id.is_none());
    }
}
