use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

use crate::domain::entities::{rescaled, validate_transfer_amount, CreditRequest};
use crate::domain::error::WalletError;
use crate::domain::repository::LedgerStore;
use crate::domain::types::PhoneNumber;
use crate::use_cases::wallet_registry::WalletRegistry;

/// Caso de Uso: Crear una solicitud de crédito.
///
/// Inserta la fila WAITING y retorna. No toma locks ni toca ninguna
/// billetera: el movimiento de fondos ocurre recién cuando el admin aprueba.
#[derive(Clone)]
pub struct CreateCreditRequestUseCase {
    registry: Arc<WalletRegistry>,
    ledger: Arc<dyn LedgerStore>,
}

impl CreateCreditRequestUseCase {
    pub fn new(registry: Arc<WalletRegistry>, ledger: Arc<dyn LedgerStore>) -> Self {
        Self { registry, ledger }
    }

    pub async fn execute(
        &self,
        seller_phone: &str,
        amount: Decimal,
    ) -> Result<CreditRequest, WalletError> {
        let phone = PhoneNumber::new(seller_phone)?;
        let seller = self.registry.lookup_account(&phone).await?;
        validate_transfer_amount(amount)?;

        let request = self
            .ledger
            .create_credit_request(seller.id, rescaled(amount))
            .await?;
        info!(
            "Credit request created: {} for account {}",
            request.id, seller.id
        );
        Ok(request)
    }
}
