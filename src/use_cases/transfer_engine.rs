use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::domain::entities::{
    rescaled, validate_transfer_amount, Account, AccountRole, ChargeSale, ChargeSaleStatus,
    CreditRequest, CreditRequestStatus, LedgerEntry, TransactionType,
};
use crate::domain::error::WalletError;
use crate::domain::gateways::{BalanceCache, CacheCommit};
use crate::domain::repository::{LedgerStore, TransferCommit, TransferOrigin};
use crate::domain::types::{AccountId, ChargeSaleId, CreditRequestId, PhoneNumber, TransactionId};
use crate::infrastructure::locking::lock_manager::WalletLockManager;
use crate::use_cases::wallet_registry::WalletRegistry;

/// Política de reintentos del commit optimista.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Intentos del CAS ante `Conflict` (R_cas).
    pub cas_retry_attempts: u32,
    /// Base del backoff: espera `cas_backoff × intento` entre reintentos.
    pub cas_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cas_retry_attempts: 3,
            cas_backoff: Duration::from_millis(100),
        }
    }
}

/// Registro de origen visto desde el plan (la transición terminal concreta
/// se arma por intento, cuando ya existe el asiento del lado origen).
#[derive(Debug, Clone)]
enum OriginRef {
    Sale(ChargeSaleId),
    Credit {
        id: CreditRequestId,
        admin_id: AccountId,
    },
}

/// Plan de una transferencia: mover `amount` de `source` a `dest`, con los
/// textos y el registro de origen ya resueltos. Inmutable entre reintentos.
struct TransferPlan {
    source: AccountId,
    dest: AccountId,
    amount: Decimal,
    reference_id: String,
    debit_description: String,
    credit_description: String,
    admin_id: Option<AccountId>,
    origin: OriginRef,
}

/// Materialización de un intento: asientos con ids frescos, el commit de
/// caché y el commit durable equivalente.
struct AttemptSnapshot {
    cache: CacheCommit,
    durable: TransferCommit,
    seller_entry: TransactionId,
}

struct CommittedTransfer {
    seller_entry: TransactionId,
}

/// Motor de transferencias atómicas entre dos billeteras.
///
/// Orquesta el ciclo completo de un intento: prechequeos sin locks, scope de
/// locks sobre el par, lectura y commit optimista en caché, commit durable y,
/// si algo falla después del CAS, la compensación determinista del estado
/// cacheado. Las dos operaciones públicas (venta de carga y aprobación de
/// crédito) comparten esta maquinaria.
pub struct TransferEngine {
    registry: Arc<WalletRegistry>,
    cache: Arc<dyn BalanceCache>,
    locks: Arc<WalletLockManager>,
    ledger: Arc<dyn LedgerStore>,
    config: EngineConfig,
}

impl TransferEngine {
    pub fn new(
        registry: Arc<WalletRegistry>,
        cache: Arc<dyn BalanceCache>,
        locks: Arc<WalletLockManager>,
        ledger: Arc<dyn LedgerStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            cache,
            locks,
            ledger,
            config,
        }
    }

    /// Venta de carga: el vendedor debita su billetera y acredita la del
    /// teléfono destino (auto-provisionado con rol USER si no existe).
    ///
    /// La fila ChargeSale se inserta PENDING antes de intentar la
    /// transferencia, de modo que el request del cliente tiene un handle
    /// durable incluso si el intento falla después.
    pub async fn create_charge_sale(
        &self,
        seller: Account,
        receiver_phone: PhoneNumber,
        amount: Decimal,
    ) -> Result<ChargeSale, WalletError> {
        validate_transfer_amount(amount)?;

        let target = self
            .registry
            .ensure_account(&receiver_phone, AccountRole::USER)
            .await?;
        let seller_wallet = self.registry.ensure_wallet(seller.id).await?;
        let target_wallet = self.registry.ensure_wallet(target.id).await?;
        seller_wallet.require_active()?;
        target_wallet.require_active()?;

        let mut sale = ChargeSale::new(seller.id, receiver_phone.clone(), amount);
        self.ledger.create_charge_sale(&sale).await?;

        let plan = TransferPlan {
            source: seller.id,
            dest: target.id,
            amount: sale.amount,
            reference_id: sale.id.to_string(),
            debit_description: format!("Charge sale deduction to {receiver_phone}"),
            credit_description: format!("Charge sale credit from {}", seller.phone_number),
            admin_id: None,
            origin: OriginRef::Sale(sale.id),
        };

        let committed = self.run_transfer(plan).await?;
        sale.status = ChargeSaleStatus::COMPLETED;
        sale.transaction_id = Some(committed.seller_entry);
        info!("Charge sale completed: {}", sale.id);
        Ok(sale)
    }

    /// Aprobación de crédito: el admin debita su billetera y acredita la del
    /// solicitante. Con admin == solicitante degenera en el caso de
    /// auto-aprobación: balances intactos y un único asiento de monto cero.
    pub async fn approve_credit_request(
        &self,
        id: CreditRequestId,
        admin: Account,
    ) -> Result<CreditRequest, WalletError> {
        let request = self
            .ledger
            .find_credit_request(id)
            .await?
            .filter(|r| r.status == CreditRequestStatus::WAITING)
            .ok_or(WalletError::RequestMissing(id))?;

        let admin_wallet = self.registry.ensure_wallet(admin.id).await?;
        let user_wallet = self.registry.ensure_wallet(request.account_id).await?;
        admin_wallet.require_active()?;
        user_wallet.require_active()?;

        let plan = if admin.id == request.account_id {
            let description = format!("Self-transfer for credit request {}", request.id);
            TransferPlan {
                source: admin.id,
                dest: admin.id,
                amount: request.amount,
                reference_id: request.id.to_string(),
                debit_description: description.clone(),
                credit_description: description,
                admin_id: Some(admin.id),
                origin: OriginRef::Credit {
                    id: request.id,
                    admin_id: admin.id,
                },
            }
        } else {
            TransferPlan {
                source: admin.id,
                dest: request.account_id,
                amount: request.amount,
                reference_id: request.id.to_string(),
                debit_description: format!(
                    "Transfer to user {} for credit request",
                    request.account_id
                ),
                credit_description: format!("Credit increase from admin {}", admin.id),
                admin_id: Some(admin.id),
                origin: OriginRef::Credit {
                    id: request.id,
                    admin_id: admin.id,
                },
            }
        };

        self.run_transfer(plan).await?;
        info!("Credit approval completed: {}", request.id);
        Ok(CreditRequest {
            status: CreditRequestStatus::ACCEPTED,
            admin_id: Some(admin.id),
            ..request
        })
    }

    /// Bucle de reintentos alrededor de un intento de transferencia.
    ///
    /// Solo `Conflict` se reabsorbe; cualquier otro error transiciona el
    /// registro de origen a su estado terminal de fallo antes de emerger.
    async fn run_transfer(&self, plan: TransferPlan) -> Result<CommittedTransfer, WalletError> {
        let mut attempt: u32 = 1;
        loop {
            match self.attempt_transfer(&plan).await {
                Ok(committed) => return Ok(committed),
                Err(WalletError::Conflict(reason)) => {
                    warn!(
                        "Cache conflict for {}, retry {}/{}: {}",
                        plan.reference_id, attempt, self.config.cas_retry_attempts, reason
                    );
                    if attempt >= self.config.cas_retry_attempts {
                        self.mark_origin_failed(&plan).await;
                        return Err(WalletError::Concurrency(format!(
                            "max retries exceeded for {}",
                            plan.reference_id
                        )));
                    }
                    tokio::time::sleep(self.config.cas_backoff * attempt).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!("Transfer {} failed: {}", plan.reference_id, err);
                    self.mark_origin_failed(&plan).await;
                    return Err(err);
                }
            }
        }
    }

    /// Un intento completo: LOCKED -> CAS_TRYING -> COMMITTING.
    async fn attempt_transfer(
        &self,
        plan: &TransferPlan,
    ) -> Result<CommittedTransfer, WalletError> {
        // LOCKED: el guard serializa todo acceso a ambas billeteras y se
        // libera en Drop por cualquier camino de salida.
        let _guard = self.locks.with_two_wallets(plan.source, plan.dest).await?;

        // CAS_TRYING: leer, verificar fondos, construir y commitear en caché.
        let source_balance = self.cache.read_balance(plan.source).await?;
        let dest_balance = self.cache.read_balance(plan.dest).await?;

        if source_balance < plan.amount {
            return Err(WalletError::InsufficientBalance(plan.source));
        }

        let snapshot = self.build_attempt(plan, source_balance, dest_balance)?;
        self.cache.compare_and_swap(&snapshot.cache).await?;

        // COMMITTING: transacción durable. A partir de acá el caché ya tiene
        // el estado nuevo, así que cualquier fallo exige compensación.
        if let Err(cause) = self.ledger.commit_transfer(&snapshot.durable).await {
            self.compensate(plan, &snapshot, source_balance, dest_balance)
                .await;
            return Err(WalletError::TransferFailed(cause.to_string()));
        }

        Ok(CommittedTransfer {
            seller_entry: snapshot.seller_entry,
        })
    }

    /// Materializa los asientos (ids frescos por intento) y los dos commits.
    fn build_attempt(
        &self,
        plan: &TransferPlan,
        source_balance: Decimal,
        dest_balance: Decimal,
    ) -> Result<AttemptSnapshot, WalletError> {
        let amount = rescaled(plan.amount);
        let source_balance = rescaled(source_balance);
        let dest_balance = rescaled(dest_balance);

        let (entries, expected, writes) = if plan.source == plan.dest {
            match &plan.origin {
                // Auto-aprobación: sin movimiento, un único asiento de 0.00
                // que deja constancia de la solicitud.
                OriginRef::Credit { .. } => {
                    let entry = LedgerEntry::new(
                        plan.source,
                        TransactionType::CREDIT_INCREASE,
                        Decimal::ZERO,
                        source_balance,
                        source_balance,
                        plan.reference_id.clone(),
                        plan.debit_description.clone(),
                        plan.admin_id,
                    );
                    (
                        vec![entry],
                        vec![(plan.source, source_balance)],
                        vec![(plan.source, source_balance)],
                    )
                }
                // Venta al propio teléfono: el par ±A se registra igual para
                // que el libro reconstruya el balance, que no cambia.
                OriginRef::Sale(_) => {
                    let debit = LedgerEntry::new(
                        plan.source,
                        TransactionType::CHARGE_SALE,
                        -amount,
                        source_balance,
                        source_balance - amount,
                        plan.reference_id.clone(),
                        plan.debit_description.clone(),
                        plan.admin_id,
                    );
                    let credit = LedgerEntry::new(
                        plan.source,
                        TransactionType::CREDIT_INCREASE,
                        amount,
                        source_balance - amount,
                        source_balance,
                        plan.reference_id.clone(),
                        plan.credit_description.clone(),
                        plan.admin_id,
                    );
                    (
                        vec![debit, credit],
                        vec![(plan.source, source_balance)],
                        vec![(plan.source, source_balance)],
                    )
                }
            }
        } else {
            let debit = LedgerEntry::new(
                plan.source,
                TransactionType::CHARGE_SALE,
                -amount,
                source_balance,
                source_balance - amount,
                plan.reference_id.clone(),
                plan.debit_description.clone(),
                plan.admin_id,
            );
            let credit = LedgerEntry::new(
                plan.dest,
                TransactionType::CREDIT_INCREASE,
                amount,
                dest_balance,
                dest_balance + amount,
                plan.reference_id.clone(),
                plan.credit_description.clone(),
                plan.admin_id,
            );
            (
                vec![debit, credit],
                vec![(plan.source, source_balance), (plan.dest, dest_balance)],
                vec![
                    (plan.source, source_balance - amount),
                    (plan.dest, dest_balance + amount),
                ],
            )
        };

        let seller_entry = entries[0].id;
        let mut appends = Vec::with_capacity(entries.len());
        for entry in &entries {
            let payload = serde_json::to_string(entry)
                .map_err(|e| WalletError::RepositoryError(format!("entry serialization: {e}")))?;
            appends.push((entry.seller_id, payload));
        }

        let origin = match &plan.origin {
            OriginRef::Sale(id) => TransferOrigin::ChargeSale {
                id: *id,
                seller_entry,
            },
            OriginRef::Credit { id, admin_id } => TransferOrigin::CreditApproval {
                id: *id,
                admin_id: *admin_id,
            },
        };

        Ok(AttemptSnapshot {
            cache: CacheCommit {
                expected,
                writes: writes.clone(),
                appends,
            },
            durable: TransferCommit {
                entries,
                balances: writes,
                origin,
            },
            seller_entry,
        })
    }

    /// Inverso determinista de la mutación de caché ya aplicada: restaura
    /// ambos balances y quita los asientos espejo agregados.
    async fn compensate(
        &self,
        plan: &TransferPlan,
        snapshot: &AttemptSnapshot,
        source_balance: Decimal,
        dest_balance: Decimal,
    ) {
        if let Err(e) = self.cache.hard_set(plan.source, source_balance).await {
            error!("Compensation hard_set failed for {}: {}", plan.source, e);
        }
        if plan.dest != plan.source {
            if let Err(e) = self.cache.hard_set(plan.dest, dest_balance).await {
                error!("Compensation hard_set failed for {}: {}", plan.dest, e);
            }
        }
        for (account_id, payload) in &snapshot.cache.appends {
            if let Err(e) = self.cache.remove_entry(*account_id, payload).await {
                error!("Compensation remove_entry failed for {}: {}", account_id, e);
            }
        }
        warn!("Rolled back cache state for {}", plan.reference_id);
    }

    /// Lleva el registro de origen a su estado terminal de fallo.
    async fn mark_origin_failed(&self, plan: &TransferPlan) {
        match &plan.origin {
            OriginRef::Sale(id) => {
                if let Err(e) = self.ledger.mark_charge_sale_failed(*id).await {
                    error!("Could not mark charge sale {} as FAILED: {}", id, e);
                }
            }
            OriginRef::Credit { id, admin_id } => {
                // Precondicionada: si otro procesador ya la llevó a un estado
                // terminal, esta transición pierde y no pisa nada.
                match self
                    .ledger
                    .transition_credit_request(
                        *id,
                        CreditRequestStatus::WAITING,
                        CreditRequestStatus::FAILED,
                        *admin_id,
                    )
                    .await
                {
                    Ok(true) => {}
                    Ok(false) => {
                        info!("Credit request {} already terminal, FAILED not applied", id)
                    }
                    Err(e) => error!("Could not mark credit request {} as FAILED: {}", id, e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Wallet;
    use crate::domain::gateways::MockBalanceCache;
    use crate::domain::repository::{AccountRepository, MockLedgerStore};
    use crate::infrastructure::cache::memory_store::InMemorySharedStore;
    use crate::infrastructure::locking::lock_manager::{LockConfig, WalletLockManager};
    use crate::infrastructure::persistence::memory::{
        InMemoryAccountRepository, InMemoryLedgerStore,
    };
    use std::str::FromStr;

    fn decimal(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    fn phone(raw: &str) -> PhoneNumber {
        PhoneNumber::new(raw).unwrap()
    }

    fn fast_lock_config() -> LockConfig {
        LockConfig {
            local_timeout: Duration::from_millis(200),
            lease_ttl: Duration::from_secs(60),
            lease_retry_attempts: 5,
            lease_retry_delay: Duration::from_millis(2),
        }
    }

    fn fast_engine_config() -> EngineConfig {
        EngineConfig {
            cas_retry_attempts: 3,
            cas_backoff: Duration::from_millis(1),
        }
    }

    struct Env {
        accounts: Arc<InMemoryAccountRepository>,
        ledger: Arc<InMemoryLedgerStore>,
        cache: Arc<InMemorySharedStore>,
        engine: TransferEngine,
    }

    fn memory_env() -> Env {
        let accounts = Arc::new(InMemoryAccountRepository::new());
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let cache = Arc::new(InMemorySharedStore::new());
        let registry = Arc::new(WalletRegistry::new(
            accounts.clone(),
            ledger.clone(),
            cache.clone(),
        ));
        let locks = Arc::new(WalletLockManager::new(cache.clone(), fast_lock_config()));
        let engine = TransferEngine::new(
            registry,
            cache.clone(),
            locks,
            ledger.clone(),
            fast_engine_config(),
        );
        Env {
            accounts,
            ledger,
            cache,
            engine,
        }
    }

    async fn seed_account(
        env: &Env,
        raw_phone: &str,
        role: AccountRole,
        balance: &str,
    ) -> Account {
        let account = env
            .accounts
            .get_or_create(&phone(raw_phone), role)
            .await
            .unwrap();
        env.ledger.get_or_create_wallet(account.id).await.unwrap();
        env.ledger
            .update_wallet_balance(account.id, decimal(balance))
            .await
            .unwrap();
        env.cache
            .hard_set(account.id, decimal(balance))
            .await
            .unwrap();
        account
    }

    #[tokio::test]
    async fn test_charge_sale_moves_funds_and_links_entry() {
        let env = memory_env();
        let seller = seed_account(&env, "09120000001", AccountRole::SELLER, "50000.00").await;

        let sale = env
            .engine
            .create_charge_sale(seller.clone(), phone("09120000002"), decimal("30000.00"))
            .await
            .unwrap();

        assert_eq!(sale.status, ChargeSaleStatus::COMPLETED);
        assert!(sale.transaction_id.is_some());

        // Balance durable y cacheado del vendedor coinciden.
        let wallet = env.ledger.find_wallet(seller.id).await.unwrap().unwrap();
        assert_eq!(wallet.balance, decimal("20000.00"));
        assert_eq!(
            env.cache.read_balance(seller.id).await.unwrap(),
            decimal("20000.00")
        );

        // Exactamente dos asientos con la venta como referencia: -A y +A.
        let entries = env
            .ledger
            .entries_for_reference(&sale.id.to_string())
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        let total: Decimal = entries.iter().map(|e| e.amount).sum();
        assert_eq!(total, Decimal::ZERO);
        assert_eq!(
            entries.iter().find(|e| e.seller_id == seller.id).unwrap().amount,
            decimal("-30000.00")
        );
    }

    #[tokio::test]
    async fn test_insufficient_balance_fails_without_entries() {
        let env = memory_env();
        let seller = seed_account(&env, "09120000001", AccountRole::SELLER, "500.00").await;

        let result = env
            .engine
            .create_charge_sale(seller.clone(), phone("09120000002"), decimal("1000.00"))
            .await;

        assert!(matches!(result, Err(WalletError::InsufficientBalance(_))));

        // La venta quedó FAILED y nada se movió en ninguna capa.
        let sales = env.ledger.charge_sales_for_seller(seller.id).await.unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].status, ChargeSaleStatus::FAILED);
        assert!(env
            .ledger
            .entries_for_account(seller.id)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            env.cache.read_balance(seller.id).await.unwrap(),
            decimal("500.00")
        );
    }

    #[tokio::test]
    async fn test_below_minimum_amount_rejected_before_any_row() {
        let env = memory_env();
        let seller = seed_account(&env, "09120000001", AccountRole::SELLER, "5000.00").await;

        let result = env
            .engine
            .create_charge_sale(seller.clone(), phone("09120000002"), decimal("999.99"))
            .await;

        assert!(matches!(result, Err(WalletError::InvalidAmount(_))));
        assert!(env
            .ledger
            .charge_sales_for_seller(seller.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_inactive_seller_wallet_rejected_before_sale_row() {
        use crate::domain::entities::WalletStatus;

        let accounts = Arc::new(InMemoryAccountRepository::new());
        let cache = Arc::new(InMemorySharedStore::new());

        let mut ledger = MockLedgerStore::new();
        ledger.expect_get_or_create_wallet().returning(|id| {
            let mut wallet = Wallet::new(id);
            wallet.status = WalletStatus::SUSPEND;
            Ok(wallet)
        });
        // Sin expectativa para create_charge_sale: el precheck corta antes
        // de insertar la fila PENDING.
        let ledger: Arc<dyn LedgerStore> = Arc::new(ledger);

        let registry = Arc::new(WalletRegistry::new(
            accounts.clone(),
            ledger.clone(),
            cache.clone(),
        ));
        let locks = Arc::new(WalletLockManager::new(cache.clone(), fast_lock_config()));
        let engine =
            TransferEngine::new(registry, cache, locks, ledger, fast_engine_config());

        let seller = accounts
            .get_or_create(&phone("09120000001"), AccountRole::SELLER)
            .await
            .unwrap();

        let result = engine
            .create_charge_sale(seller, phone("09120000002"), decimal("1000.00"))
            .await;
        assert!(matches!(result, Err(WalletError::WalletInactive(_))));
    }

    #[tokio::test]
    async fn test_cas_conflict_exhaustion_marks_request_failed() {
        let accounts = Arc::new(InMemoryAccountRepository::new());
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let store = Arc::new(InMemorySharedStore::new());

        let mut cache = MockBalanceCache::new();
        cache.expect_seed_balance().returning(|_, _| Ok(()));
        cache
            .expect_read_balance()
            .returning(|_| Ok(Decimal::from_str("10000.00").unwrap()));
        cache.expect_compare_and_swap().returning(|_| {
            Err(WalletError::Conflict("balance changed".to_string()))
        });
        let cache: Arc<dyn BalanceCache> = Arc::new(cache);

        let registry = Arc::new(WalletRegistry::new(
            accounts.clone(),
            ledger.clone(),
            cache.clone(),
        ));
        let locks = Arc::new(WalletLockManager::new(store, fast_lock_config()));
        let engine = TransferEngine::new(
            registry,
            cache,
            locks,
            ledger.clone(),
            fast_engine_config(),
        );

        let admin = accounts
            .get_or_create(&phone("08994562531"), AccountRole::ADMIN)
            .await
            .unwrap();
        let user = accounts
            .get_or_create(&phone("09125129188"), AccountRole::SELLER)
            .await
            .unwrap();
        ledger.get_or_create_wallet(admin.id).await.unwrap();
        ledger.get_or_create_wallet(user.id).await.unwrap();
        let request = ledger
            .create_credit_request(user.id, decimal("1000.00"))
            .await
            .unwrap();

        let result = engine.approve_credit_request(request.id, admin.clone()).await;
        assert!(matches!(result, Err(WalletError::Concurrency(_))));

        // El agotamiento de reintentos deja la solicitud FAILED con admin.
        let stored = ledger.find_credit_request(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CreditRequestStatus::FAILED);
        assert_eq!(stored.admin_id, Some(admin.id));
    }

    #[tokio::test]
    async fn test_durable_failure_compensates_cache() {
        let accounts = Arc::new(InMemoryAccountRepository::new());
        let cache = Arc::new(InMemorySharedStore::new());

        let mut ledger = MockLedgerStore::new();
        ledger
            .expect_get_or_create_wallet()
            .returning(|id| Ok(Wallet::new(id)));
        ledger.expect_create_charge_sale().returning(|_| Ok(()));
        ledger.expect_commit_transfer().returning(|_| {
            Err(WalletError::RepositoryError("durable store down".to_string()))
        });
        ledger
            .expect_mark_charge_sale_failed()
            .times(1)
            .returning(|_| Ok(()));
        let ledger: Arc<dyn LedgerStore> = Arc::new(ledger);

        let registry = Arc::new(WalletRegistry::new(
            accounts.clone(),
            ledger.clone(),
            cache.clone(),
        ));
        let locks = Arc::new(WalletLockManager::new(cache.clone(), fast_lock_config()));
        let engine = TransferEngine::new(
            registry,
            cache.clone(),
            locks,
            ledger,
            fast_engine_config(),
        );

        let seller = accounts
            .get_or_create(&phone("09120000001"), AccountRole::SELLER)
            .await
            .unwrap();
        // Fondos cacheados previos al intento.
        cache.hard_set(seller.id, decimal("5000.00")).await.unwrap();

        let result = engine
            .create_charge_sale(seller.clone(), phone("09120000002"), decimal("1000.00"))
            .await;
        assert!(matches!(result, Err(WalletError::TransferFailed(_))));

        // La compensación restauró el balance y vació los logs espejo.
        assert_eq!(
            cache.read_balance(seller.id).await.unwrap(),
            decimal("5000.00")
        );
        assert!(cache.entry_log(seller.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_approve_missing_request_fails_fast() {
        let env = memory_env();
        let admin = seed_account(&env, "08994562531", AccountRole::ADMIN, "10000.00").await;

        let result = env
            .engine
            .approve_credit_request(CreditRequestId(99), admin)
            .await;
        assert!(matches!(result, Err(WalletError::RequestMissing(_))));
    }

    #[tokio::test]
    async fn test_self_approval_records_zero_amount_entry() {
        let env = memory_env();
        let admin = seed_account(&env, "08994562531", AccountRole::ADMIN, "10000.00").await;
        let request = env
            .ledger
            .create_credit_request(admin.id, decimal("2000.00"))
            .await
            .unwrap();

        let approved = env
            .engine
            .approve_credit_request(request.id, admin.clone())
            .await
            .unwrap();
        assert_eq!(approved.status, CreditRequestStatus::ACCEPTED);

        // Balance intacto en ambas capas.
        let wallet = env.ledger.find_wallet(admin.id).await.unwrap().unwrap();
        assert_eq!(wallet.balance, decimal("10000.00"));
        assert_eq!(
            env.cache.read_balance(admin.id).await.unwrap(),
            decimal("10000.00")
        );

        // Un único asiento de 0.00 referenciando la solicitud.
        let entries = env
            .ledger
            .entries_for_reference(&request.id.to_string())
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount, Decimal::ZERO);
        assert_eq!(entries[0].transaction_type, TransactionType::CREDIT_INCREASE);
        assert_eq!(entries[0].balance_before, entries[0].balance_after);
    }
}
