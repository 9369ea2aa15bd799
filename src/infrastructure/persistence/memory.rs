use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::domain::entities::{
    rescaled, Account, AccountRole, ChargeSale, ChargeSaleStatus, CreditRequest,
    CreditRequestStatus, LedgerEntry, Wallet,
};
use crate::domain::error::WalletError;
use crate::domain::repository::{
    AccountRepository, LedgerStore, TransferCommit, TransferOrigin,
};
use crate::domain::types::{AccountId, ChargeSaleId, CreditRequestId, PhoneNumber, TransactionId};

/// Repositorio de Cuentas en memoria.
///
/// Gemelo del repositorio PostgreSQL para tests y corridas sin base de datos.
pub struct InMemoryAccountRepository {
    accounts: Mutex<HashMap<String, Account>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryAccountRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Account>, WalletError> {
        let accounts = self.accounts.lock();
        Ok(accounts.get(phone.as_str()).cloned())
    }

    async fn get_or_create(
        &self,
        phone: &PhoneNumber,
        role: AccountRole,
    ) -> Result<Account, WalletError> {
        let mut accounts = self.accounts.lock();
        let account = accounts
            .entry(phone.as_str().to_string())
            .or_insert_with(|| Account::new(phone.clone(), role));
        Ok(account.clone())
    }
}

#[derive(Default)]
struct LedgerState {
    wallets: HashMap<AccountId, Wallet>,
    credit_requests: BTreeMap<i64, CreditRequest>,
    next_credit_request_id: i64,
    charge_sales: HashMap<ChargeSaleId, ChargeSale>,
    entries: Vec<LedgerEntry>,
    entry_ids: HashSet<TransactionId>,
}

/// Ledger Store en memoria bajo un único mutex.
///
/// El mutex convierte cada operación del port en una transacción: o se
/// aplica completa o (si la validación previa falla) no toca nada.
pub struct InMemoryLedgerStore {
    state: Mutex<LedgerState>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
        }
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn get_or_create_wallet(&self, account_id: AccountId) -> Result<Wallet, WalletError> {
        let mut state = self.state.lock();
        let wallet = state
            .wallets
            .entry(account_id)
            .or_insert_with(|| Wallet::new(account_id));
        Ok(wallet.clone())
    }

    async fn find_wallet(&self, account_id: AccountId) -> Result<Option<Wallet>, WalletError> {
        let state = self.state.lock();
        Ok(state.wallets.get(&account_id).cloned())
    }

    async fn update_wallet_balance(
        &self,
        account_id: AccountId,
        balance: Decimal,
    ) -> Result<(), WalletError> {
        let mut state = self.state.lock();
        match state.wallets.get_mut(&account_id) {
            Some(wallet) => {
                wallet.balance = rescaled(balance);
                Ok(())
            }
            None => Err(WalletError::RepositoryError(format!(
                "wallet not found for account {account_id}"
            ))),
        }
    }

    async fn create_credit_request(
        &self,
        account_id: AccountId,
        amount: Decimal,
    ) -> Result<CreditRequest, WalletError> {
        let mut state = self.state.lock();
        state.next_credit_request_id += 1;
        let request = CreditRequest {
            id: CreditRequestId(state.next_credit_request_id),
            account_id,
            amount: rescaled(amount),
            status: CreditRequestStatus::WAITING,
            admin_id: None,
            created_at: Utc::now(),
        };
        state.credit_requests.insert(request.id.0, request.clone());
        Ok(request)
    }

    async fn find_credit_request(
        &self,
        id: CreditRequestId,
    ) -> Result<Option<CreditRequest>, WalletError> {
        let state = self.state.lock();
        Ok(state.credit_requests.get(&id.0).cloned())
    }

    async fn transition_credit_request(
        &self,
        id: CreditRequestId,
        from: CreditRequestStatus,
        to: CreditRequestStatus,
        admin_id: AccountId,
    ) -> Result<bool, WalletError> {
        let mut state = self.state.lock();
        match state.credit_requests.get_mut(&id.0) {
            Some(request) if request.status == from => {
                request.status = to;
                request.admin_id = Some(admin_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_charge_sale(&self, sale: &ChargeSale) -> Result<(), WalletError> {
        let mut state = self.state.lock();
        state.charge_sales.insert(sale.id, sale.clone());
        Ok(())
    }

    async fn find_charge_sale(
        &self,
        id: ChargeSaleId,
    ) -> Result<Option<ChargeSale>, WalletError> {
        let state = self.state.lock();
        Ok(state.charge_sales.get(&id).cloned())
    }

    async fn charge_sales_for_seller(
        &self,
        seller_id: AccountId,
    ) -> Result<Vec<ChargeSale>, WalletError> {
        let state = self.state.lock();
        let mut sales: Vec<ChargeSale> = state
            .charge_sales
            .values()
            .filter(|sale| sale.seller_id == seller_id)
            .cloned()
            .collect();
        sales.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sales)
    }

    async fn mark_charge_sale_failed(&self, id: ChargeSaleId) -> Result<(), WalletError> {
        let mut state = self.state.lock();
        if let Some(sale) = state.charge_sales.get_mut(&id) {
            if sale.status == ChargeSaleStatus::PENDING {
                sale.status = ChargeSaleStatus::FAILED;
            }
        }
        Ok(())
    }

    async fn commit_transfer(&self, commit: &TransferCommit) -> Result<(), WalletError> {
        let mut state = self.state.lock();

        // Validación completa antes de mutar nada (todo o nada).
        let mut batch_ids = HashSet::new();
        for entry in &commit.entries {
            if state.entry_ids.contains(&entry.id) || !batch_ids.insert(entry.id) {
                return Err(WalletError::RepositoryError(format!(
                    "duplicate transaction id {}",
                    entry.id
                )));
            }
        }
        for (account_id, _) in &commit.balances {
            if !state.wallets.contains_key(account_id) {
                return Err(WalletError::RepositoryError(format!(
                    "wallet not found for account {account_id}"
                )));
            }
        }
        match &commit.origin {
            TransferOrigin::ChargeSale { id, .. } => {
                match state.charge_sales.get(id) {
                    Some(sale) if sale.status == ChargeSaleStatus::PENDING => {}
                    _ => {
                        return Err(WalletError::RepositoryError(format!(
                            "charge sale {id} no longer PENDING"
                        )))
                    }
                }
            }
            TransferOrigin::CreditApproval { id, .. } => {
                match state.credit_requests.get(&id.0) {
                    Some(request) if request.status == CreditRequestStatus::WAITING => {}
                    _ => {
                        return Err(WalletError::RepositoryError(format!(
                            "credit request {id} no longer WAITING"
                        )))
                    }
                }
            }
        }

        for entry in &commit.entries {
            state.entry_ids.insert(entry.id);
            state.entries.push(entry.clone());
        }
        for (account_id, balance) in &commit.balances {
            if let Some(wallet) = state.wallets.get_mut(account_id) {
                wallet.balance = rescaled(*balance);
            }
        }
        match &commit.origin {
            TransferOrigin::ChargeSale { id, seller_entry } => {
                if let Some(sale) = state.charge_sales.get_mut(id) {
                    sale.status = ChargeSaleStatus::COMPLETED;
                    sale.transaction_id = Some(*seller_entry);
                }
            }
            TransferOrigin::CreditApproval { id, admin_id } => {
                if let Some(request) = state.credit_requests.get_mut(&id.0) {
                    request.status = CreditRequestStatus::ACCEPTED;
                    request.admin_id = Some(*admin_id);
                }
            }
        }
        Ok(())
    }

    async fn entries_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<LedgerEntry>, WalletError> {
        let state = self.state.lock();
        let mut entries: Vec<LedgerEntry> = state
            .entries
            .iter()
            .filter(|entry| entry.seller_id == account_id)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| (entry.created_at, entry.id.0));
        Ok(entries)
    }

    async fn entries_for_reference(
        &self,
        reference_id: &str,
    ) -> Result<Vec<LedgerEntry>, WalletError> {
        let state = self.state.lock();
        let mut entries: Vec<LedgerEntry> = state
            .entries
            .iter()
            .filter(|entry| entry.reference_id == reference_id)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| (entry.created_at, entry.id.0));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::TransactionType;
    use std::str::FromStr;

    fn decimal(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    fn entry_for(account: AccountId, amount: &str, reference: &str) -> LedgerEntry {
        LedgerEntry::new(
            account,
            TransactionType::CREDIT_INCREASE,
            decimal(amount),
            Decimal::ZERO,
            decimal(amount),
            reference.to_string(),
            "test entry".to_string(),
            None,
        )
    }

    #[tokio::test]
    async fn test_credit_request_ids_are_monotonic() {
        let store = InMemoryLedgerStore::new();
        let account = AccountId::new();

        let first = store
            .create_credit_request(account, decimal("1000.00"))
            .await
            .unwrap();
        let second = store
            .create_credit_request(account, decimal("2000.00"))
            .await
            .unwrap();

        assert!(second.id > first.id);
        assert_eq!(first.status, CreditRequestStatus::WAITING);
    }

    #[tokio::test]
    async fn test_transition_is_single_winner() {
        let store = InMemoryLedgerStore::new();
        let account = AccountId::new();
        let admin = AccountId::new();
        let request = store
            .create_credit_request(account, decimal("1000.00"))
            .await
            .unwrap();

        let won = store
            .transition_credit_request(
                request.id,
                CreditRequestStatus::WAITING,
                CreditRequestStatus::REJECTED,
                admin,
            )
            .await
            .unwrap();
        assert!(won);

        // Segunda transición sobre un estado terminal: pierde.
        let lost = store
            .transition_credit_request(
                request.id,
                CreditRequestStatus::WAITING,
                CreditRequestStatus::ACCEPTED,
                admin,
            )
            .await
            .unwrap();
        assert!(!lost);

        let stored = store.find_credit_request(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CreditRequestStatus::REJECTED);
        assert_eq!(stored.admin_id, Some(admin));
    }

    #[tokio::test]
    async fn test_commit_transfer_rejects_duplicate_entry_id() {
        let store = InMemoryLedgerStore::new();
        let account = AccountId::new();
        let admin = AccountId::new();
        store.get_or_create_wallet(account).await.unwrap();

        let request = store
            .create_credit_request(account, decimal("1000.00"))
            .await
            .unwrap();
        let entry = entry_for(account, "1000.00", &request.id.to_string());

        let commit = TransferCommit {
            entries: vec![entry.clone(), entry],
            balances: vec![(account, decimal("1000.00"))],
            origin: TransferOrigin::CreditApproval {
                id: request.id,
                admin_id: admin,
            },
        };
        let result = store.commit_transfer(&commit).await;
        assert!(matches!(result, Err(WalletError::RepositoryError(_))));

        // Nada quedó aplicado: la solicitud sigue WAITING y no hay asientos.
        let stored = store.find_credit_request(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CreditRequestStatus::WAITING);
        assert!(store
            .entries_for_account(account)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_commit_transfer_is_all_or_nothing_on_stale_origin() {
        let store = InMemoryLedgerStore::new();
        let account = AccountId::new();
        let admin = AccountId::new();
        store.get_or_create_wallet(account).await.unwrap();

        let request = store
            .create_credit_request(account, decimal("1000.00"))
            .await
            .unwrap();
        // Otro procesador ya la rechazó.
        store
            .transition_credit_request(
                request.id,
                CreditRequestStatus::WAITING,
                CreditRequestStatus::REJECTED,
                admin,
            )
            .await
            .unwrap();

        let commit = TransferCommit {
            entries: vec![entry_for(account, "1000.00", &request.id.to_string())],
            balances: vec![(account, decimal("1000.00"))],
            origin: TransferOrigin::CreditApproval {
                id: request.id,
                admin_id: admin,
            },
        };
        let result = store.commit_transfer(&commit).await;
        assert!(result.is_err());

        // Nada quedó aplicado.
        let wallet = store.find_wallet(account).await.unwrap().unwrap();
        assert_eq!(wallet.balance, Decimal::ZERO);
        assert!(store
            .entries_for_reference(&request.id.to_string())
            .await
            .unwrap()
            .is_empty());
    }
}
