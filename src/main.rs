use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use charge_wallet_service::{
    api::http_routes::{routes, AppState},
    config::AppConfig,
    domain::gateways::{BalanceCache, LeaseStore},
    domain::repository::{AccountRepository, LedgerStore},
    infrastructure::{
        cache::memory_store::InMemorySharedStore,
        locking::lock_manager::WalletLockManager,
        persistence::account_repository::PostgresAccountRepository,
        persistence::ledger_store::PostgresLedgerStore,
        pool::worker_pool::TransferPool,
    },
    use_cases::{
        create_charge_sale::CreateChargeSaleUseCase,
        create_credit_request::CreateCreditRequestUseCase,
        process_credit_request::ProcessCreditRequestUseCase, transfer_engine::TransferEngine,
        wallet_registry::WalletRegistry,
    },
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        charge_wallet_service::api::http_routes::create_credit_request,
        charge_wallet_service::api::http_routes::create_charge_sale,
        charge_wallet_service::api::http_routes::process_credit_request
    ),
    components(schemas(
        charge_wallet_service::api::http_routes::CreateCreditRequestBody,
        charge_wallet_service::api::http_routes::CreateChargeSaleBody,
        charge_wallet_service::api::http_routes::ProcessCreditRequestBody
    ))
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Cargar variables de entorno
    dotenv().ok();

    // 2. Configurar Logging/Tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting Charge Wallet Service...");
    let config = AppConfig::from_env()?;

    // 3. Configurar Conexión a Base de Datos (fuente de verdad)
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    info!("Connected to Database");

    // 4. Instanciar Dependencias (Infraestructura)
    let accounts: Arc<dyn AccountRepository> =
        Arc::new(PostgresAccountRepository::new(pool.clone()));
    let ledger: Arc<dyn LedgerStore> = Arc::new(PostgresLedgerStore::new(pool));

    // El store compartido cumple dos roles: caché de balances y fábrica de
    // leases para el lock manager.
    let shared_store = Arc::new(InMemorySharedStore::new());
    let cache: Arc<dyn BalanceCache> = shared_store.clone();
    let leases: Arc<dyn LeaseStore> = shared_store;

    let registry = Arc::new(WalletRegistry::new(
        accounts,
        ledger.clone(),
        cache.clone(),
    ));
    let locks = Arc::new(WalletLockManager::new(leases, config.lock.clone()));
    let engine = Arc::new(TransferEngine::new(
        registry.clone(),
        cache,
        locks,
        ledger.clone(),
        config.engine.clone(),
    ));
    let transfer_pool = Arc::new(TransferPool::new(config.transfer_workers));

    // 5. Instanciar Casos de Uso
    let create_credit_request_use_case =
        CreateCreditRequestUseCase::new(registry.clone(), ledger.clone());
    let process_credit_request_use_case = ProcessCreditRequestUseCase::new(
        registry.clone(),
        ledger,
        engine.clone(),
        transfer_pool.clone(),
    );
    let create_charge_sale_use_case =
        CreateChargeSaleUseCase::new(registry, engine, transfer_pool);

    // 6. Configurar Estado de la App Axum
    let app_state = Arc::new(AppState {
        create_credit_request_use_case,
        process_credit_request_use_case,
        create_charge_sale_use_case,
    });

    // 7. Configurar Rutas y Servidor
    let app = routes(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let addr = format!("{}:{}", config.host, config.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
