use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::domain::error::WalletError;

/// Pool acotado de workers de transferencia.
///
/// Cada transferencia corre en exactamente una tarea; los permits del
/// semáforo acotan cuántas viven a la vez (default 10), aislando el lock
/// manager por billetera de un paralelismo sin control. El caller espera el
/// resultado, así que el modelo observable es síncrono.
pub struct TransferPool {
    permits: Arc<Semaphore>,
}

impl TransferPool {
    pub fn new(workers: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers)),
        }
    }

    /// Encola la transferencia y bloquea hasta su resultado.
    ///
    /// Un panic dentro del worker emerge como `TransferFailed`; los guards
    /// de locks se liberan igualmente durante el unwind de la tarea.
    pub async fn submit<T, F>(&self, work: F) -> Result<T, WalletError>
    where
        F: Future<Output = Result<T, WalletError>> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| WalletError::TransferFailed(format!("worker pool closed: {e}")))?;

        let handle = tokio::spawn(async move {
            let _permit = permit;
            work.await
        });

        handle
            .await
            .map_err(|e| WalletError::TransferFailed(format!("transfer worker crashed: {e}")))?
    }
}
