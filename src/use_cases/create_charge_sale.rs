use rust_decimal::Decimal;
use std::sync::Arc;

use crate::domain::entities::ChargeSale;
use crate::domain::error::WalletError;
use crate::domain::types::PhoneNumber;
use crate::infrastructure::pool::worker_pool::TransferPool;
use crate::use_cases::transfer_engine::TransferEngine;
use crate::use_cases::wallet_registry::WalletRegistry;

/// Caso de Uso: Crear una venta de carga.
///
/// Resuelve el vendedor por teléfono y delega la transferencia completa en el
/// Transfer Engine a través del pool de workers, que acota el paralelismo y
/// devuelve un resultado síncrono al caller.
#[derive(Clone)]
pub struct CreateChargeSaleUseCase {
    registry: Arc<WalletRegistry>,
    engine: Arc<TransferEngine>,
    pool: Arc<TransferPool>,
}

impl CreateChargeSaleUseCase {
    pub fn new(
        registry: Arc<WalletRegistry>,
        engine: Arc<TransferEngine>,
        pool: Arc<TransferPool>,
    ) -> Self {
        Self {
            registry,
            engine,
            pool,
        }
    }

    pub async fn execute(
        &self,
        seller_phone: &str,
        receiver_phone: &str,
        amount: Decimal,
    ) -> Result<ChargeSale, WalletError> {
        let seller_phone = PhoneNumber::new(seller_phone)?;
        let receiver_phone = PhoneNumber::new(receiver_phone)?;
        let seller = self.registry.lookup_account(&seller_phone).await?;

        let engine = self.engine.clone();
        self.pool
            .submit(async move {
                engine
                    .create_charge_sale(seller, receiver_phone, amount)
                    .await
            })
            .await
    }
}
