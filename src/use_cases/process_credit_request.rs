use std::sync::Arc;
use tracing::info;

use crate::domain::entities::{AccountRole, CreditRequest, CreditRequestStatus};
use crate::domain::error::WalletError;
use crate::domain::repository::LedgerStore;
use crate::domain::types::{CreditRequestId, PhoneNumber};
use crate::infrastructure::pool::worker_pool::TransferPool;
use crate::use_cases::transfer_engine::TransferEngine;
use crate::use_cases::wallet_registry::WalletRegistry;

// Codificación del status en el wire del endpoint de administración. Es el
// contrato publicado: 1 ecoa sin procesar, 2 aprueba, 3 rechaza.
pub const WIRE_STATUS_WAITING: i32 = 1;
pub const WIRE_STATUS_ACCEPTED: i32 = 2;
pub const WIRE_STATUS_REJECTED: i32 = 3;

/// Resultado de procesar una solicitud: la fila resultante, o `None` para el
/// eco sin efecto (wire status 1).
pub type ProcessOutcome = Option<CreditRequest>;

/// Caso de Uso: Procesar (aprobar/rechazar) una solicitud de crédito.
///
/// El caller se identifica por teléfono y debe tener rol ADMIN. La
/// aprobación delega en el Transfer Engine a través del pool de workers; el
/// rechazo es una transición durable precondicionada, sin locks ni caché.
#[derive(Clone)]
pub struct ProcessCreditRequestUseCase {
    registry: Arc<WalletRegistry>,
    ledger: Arc<dyn LedgerStore>,
    engine: Arc<TransferEngine>,
    pool: Arc<TransferPool>,
}

impl ProcessCreditRequestUseCase {
    pub fn new(
        registry: Arc<WalletRegistry>,
        ledger: Arc<dyn LedgerStore>,
        engine: Arc<TransferEngine>,
        pool: Arc<TransferPool>,
    ) -> Self {
        Self {
            registry,
            ledger,
            engine,
            pool,
        }
    }

    pub async fn execute(
        &self,
        admin_phone: &str,
        credit_id: i64,
        wire_status: i32,
    ) -> Result<ProcessOutcome, WalletError> {
        let phone = PhoneNumber::new(admin_phone)?;
        let admin = self.registry.lookup_account(&phone).await?;
        if admin.role != AccountRole::ADMIN {
            return Err(WalletError::PermissionDenied);
        }
        if credit_id < 1 {
            return Err(WalletError::InvalidInput(
                "credit_id must be >= 1".to_string(),
            ));
        }
        let request_id = CreditRequestId(credit_id);

        match wire_status {
            WIRE_STATUS_WAITING => Ok(None),
            WIRE_STATUS_ACCEPTED => {
                let engine = self.engine.clone();
                let request = self
                    .pool
                    .submit(async move { engine.approve_credit_request(request_id, admin).await })
                    .await?;
                Ok(Some(request))
            }
            WIRE_STATUS_REJECTED => {
                let rejected = self
                    .ledger
                    .transition_credit_request(
                        request_id,
                        CreditRequestStatus::WAITING,
                        CreditRequestStatus::REJECTED,
                        admin.id,
                    )
                    .await?;
                if !rejected {
                    return Err(WalletError::RequestMissing(request_id));
                }
                info!(
                    "Credit request rejected: {} by admin {}",
                    request_id, admin.id
                );
                let request = self
                    .ledger
                    .find_credit_request(request_id)
                    .await?
                    .ok_or(WalletError::RequestMissing(request_id))?;
                Ok(Some(request))
            }
            other => Err(WalletError::InvalidInput(format!(
                "unknown wire status {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gateways::BalanceCache;
    use crate::domain::repository::AccountRepository;
    use crate::infrastructure::cache::memory_store::InMemorySharedStore;
    use crate::infrastructure::locking::lock_manager::{LockConfig, WalletLockManager};
    use crate::infrastructure::persistence::memory::{
        InMemoryAccountRepository, InMemoryLedgerStore,
    };
    use crate::use_cases::transfer_engine::EngineConfig;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::time::Duration;

    struct Env {
        use_case: ProcessCreditRequestUseCase,
        accounts: Arc<InMemoryAccountRepository>,
        ledger: Arc<InMemoryLedgerStore>,
        cache: Arc<InMemorySharedStore>,
    }

    fn env() -> Env {
        let accounts = Arc::new(InMemoryAccountRepository::new());
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let cache = Arc::new(InMemorySharedStore::new());
        let registry = Arc::new(WalletRegistry::new(
            accounts.clone(),
            ledger.clone(),
            cache.clone(),
        ));
        let locks = Arc::new(WalletLockManager::new(
            cache.clone(),
            LockConfig {
                local_timeout: Duration::from_millis(200),
                lease_ttl: Duration::from_secs(60),
                lease_retry_attempts: 5,
                lease_retry_delay: Duration::from_millis(2),
            },
        ));
        let engine = Arc::new(TransferEngine::new(
            registry.clone(),
            cache.clone(),
            locks,
            ledger.clone(),
            EngineConfig::default(),
        ));
        let pool = Arc::new(TransferPool::new(4));
        Env {
            use_case: ProcessCreditRequestUseCase::new(registry, ledger.clone(), engine, pool),
            accounts,
            ledger,
            cache,
        }
    }

    fn decimal(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    async fn seed(env: &Env) -> (crate::domain::entities::Account, crate::domain::entities::Account)
    {
        let admin = env
            .accounts
            .get_or_create(
                &PhoneNumber::new("08994562531").unwrap(),
                AccountRole::ADMIN,
            )
            .await
            .unwrap();
        let seller = env
            .accounts
            .get_or_create(
                &PhoneNumber::new("09125129188").unwrap(),
                AccountRole::SELLER,
            )
            .await
            .unwrap();
        env.ledger.get_or_create_wallet(admin.id).await.unwrap();
        env.ledger
            .update_wallet_balance(admin.id, decimal("50000.00"))
            .await
            .unwrap();
        env.cache
            .hard_set(admin.id, decimal("50000.00"))
            .await
            .unwrap();
        (admin, seller)
    }

    #[tokio::test]
    async fn test_non_admin_caller_is_denied() {
        let test_env = env();
        let (_, seller) = seed(&test_env).await;
        let request = test_env
            .ledger
            .create_credit_request(seller.id, decimal("1000.00"))
            .await
            .unwrap();

        let result = test_env
            .use_case
            .execute("09125129188", request.id.0, WIRE_STATUS_ACCEPTED)
            .await;
        assert!(matches!(result, Err(WalletError::PermissionDenied)));

        // La solicitud no se tocó.
        let stored = test_env
            .ledger
            .find_credit_request(request.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, CreditRequestStatus::WAITING);
    }

    #[tokio::test]
    async fn test_wire_status_waiting_is_noop_echo() {
        let test_env = env();
        let (_, seller) = seed(&test_env).await;
        let request = test_env
            .ledger
            .create_credit_request(seller.id, decimal("1000.00"))
            .await
            .unwrap();

        let outcome = test_env
            .use_case
            .execute("08994562531", request.id.0, WIRE_STATUS_WAITING)
            .await
            .unwrap();
        assert!(outcome.is_none());

        let stored = test_env
            .ledger
            .find_credit_request(request.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, CreditRequestStatus::WAITING);
    }

    #[tokio::test]
    async fn test_reject_stamps_admin_and_writes_no_entries() {
        let test_env = env();
        let (admin, seller) = seed(&test_env).await;
        let request = test_env
            .ledger
            .create_credit_request(seller.id, decimal("1500.00"))
            .await
            .unwrap();

        let outcome = test_env
            .use_case
            .execute("08994562531", request.id.0, WIRE_STATUS_REJECTED)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.status, CreditRequestStatus::REJECTED);
        assert_eq!(outcome.admin_id, Some(admin.id));
        assert!(test_env
            .ledger
            .entries_for_reference(&request.id.to_string())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_reject_already_processed_request_is_missing() {
        let test_env = env();
        let (_, seller) = seed(&test_env).await;
        let request = test_env
            .ledger
            .create_credit_request(seller.id, decimal("1000.00"))
            .await
            .unwrap();

        test_env
            .use_case
            .execute("08994562531", request.id.0, WIRE_STATUS_REJECTED)
            .await
            .unwrap();

        let second = test_env
            .use_case
            .execute("08994562531", request.id.0, WIRE_STATUS_REJECTED)
            .await;
        assert!(matches!(second, Err(WalletError::RequestMissing(_))));
    }

    #[tokio::test]
    async fn test_approve_moves_funds_through_engine() {
        let test_env = env();
        let (admin, seller) = seed(&test_env).await;
        let request = test_env
            .ledger
            .create_credit_request(seller.id, decimal("1000.00"))
            .await
            .unwrap();

        let outcome = test_env
            .use_case
            .execute("08994562531", request.id.0, WIRE_STATUS_ACCEPTED)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.status, CreditRequestStatus::ACCEPTED);

        let admin_wallet = test_env
            .ledger
            .find_wallet(admin.id)
            .await
            .unwrap()
            .unwrap();
        let seller_wallet = test_env
            .ledger
            .find_wallet(seller.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin_wallet.balance, decimal("49000.00"));
        assert_eq!(seller_wallet.balance, decimal("1000.00"));
    }

    #[tokio::test]
    async fn test_invalid_wire_status_and_credit_id() {
        let test_env = env();
        seed(&test_env).await;

        let bad_status = test_env.use_case.execute("08994562531", 1, 7).await;
        assert!(matches!(bad_status, Err(WalletError::InvalidInput(_))));

        let bad_id = test_env
            .use_case
            .execute("08994562531", 0, WIRE_STATUS_ACCEPTED)
            .await;
        assert!(matches!(bad_id, Err(WalletError::InvalidInput(_))));
    }
}
