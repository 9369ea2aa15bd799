use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::domain::entities::{
    Account, AccountRole, ChargeSale, ChargeSaleStatus, CreditRequest, CreditRequestStatus,
    LedgerEntry, TransactionType, Wallet, WalletStatus,
};
use crate::domain::types::{AccountId, ChargeSaleId, CreditRequestId, PhoneNumber, TransactionId};

#[derive(Debug, FromRow)]
pub struct AccountModel {
    pub id: AccountId,
    pub phone_number: PhoneNumber,
    pub role: AccountRole,
    pub created_at: DateTime<Utc>,
}

impl From<AccountModel> for Account {
    fn from(m: AccountModel) -> Self {
        Self {
            id: m.id,
            phone_number: m.phone_number,
            role: m.role,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct WalletModel {
    pub account_id: AccountId,
    pub balance: Decimal,
    pub status: WalletStatus,
    pub created_at: DateTime<Utc>,
}

impl From<WalletModel> for Wallet {
    fn from(m: WalletModel) -> Self {
        Self {
            account_id: m.account_id,
            balance: m.balance,
            status: m.status,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct CreditRequestModel {
    pub id: CreditRequestId,
    pub account_id: AccountId,
    pub amount: Decimal,
    pub status: CreditRequestStatus,
    pub admin_id: Option<AccountId>,
    pub created_at: DateTime<Utc>,
}

impl From<CreditRequestModel> for CreditRequest {
    fn from(m: CreditRequestModel) -> Self {
        Self {
            id: m.id,
            account_id: m.account_id,
            amount: m.amount,
            status: m.status,
            admin_id: m.admin_id,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct TransactionModel {
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

impl From<&LedgerEntry> for TransactionModel {
    fn from(e: &LedgerEntry) -> Self {
        Self {
            id: e.id,
            seller_id: e.seller_id,
            transaction_type: e.transaction_type,
            amount: e.amount,
            balance_before: e.balance_before,
            balance_after: e.balance_after,
            reference_id: e.reference_id.clone(),
            description: e.description.clone(),
            admin_id: e.admin_id,
            created_at: e.created_at,
        }
    }
}

impl From<TransactionModel> for LedgerEntry {
    fn from(m: TransactionModel) -> Self {
        Self {
            id: m.id,
            seller_id: m.seller_id,
            transaction_type: m.transaction_type,
            amount: m.amount,
            balance_before: m.balance_before,
            balance_after: m.balance_after,
            reference_id: m.reference_id,
            description: m.description,
            admin_id: m.admin_id,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ChargeSaleModel {
    pub id: ChargeSaleId,
    pub seller_id: AccountId,
    pub phone_number: PhoneNumber,
    pub amount: Decimal,
    pub status: ChargeSaleStatus,
    pub transaction_id: Option<TransactionId>,
    pub created_at: DateTime<Utc>,
}

impl From<ChargeSaleModel> for ChargeSale {
    fn from(m: ChargeSaleModel) -> Self {
        Self {
            id: m.id,
            seller_id: m.seller_id,
            phone_number: m.phone_number,
            amount: m.amount,
            status: m.status,
            transaction_id: m.transaction_id,
            created_at: m.created_at,
        }
    }
}
