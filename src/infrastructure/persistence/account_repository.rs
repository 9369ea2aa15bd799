use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::domain::entities::{Account, AccountRole};
use crate::domain::error::WalletError;
use crate::domain::repository::AccountRepository;
use crate::domain::types::{AccountId, PhoneNumber};
use crate::infrastructure::persistence::models::AccountModel;

/// Repositorio de Cuentas basado en PostgreSQL.
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    /// Busca una cuenta por su número de teléfono (único e indexado).
    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Account>, WalletError> {
        let model_opt = sqlx::query_as::<_, AccountModel>(
            r#"
            SELECT * FROM accounts
            WHERE phone_number = $1
            "#,
        )
        .bind(phone.clone())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        Ok(model_opt.map(|m| m.into()))
    }

    /// Get-or-create idempotente sobre el teléfono.
    ///
    /// `ON CONFLICT DO NOTHING` garantiza que una cuenta existente nunca se
    /// sobreescribe, aun con creadores concurrentes; el SELECT posterior
    /// devuelve la fila ganadora sea cual sea.
    async fn get_or_create(
        &self,
        phone: &PhoneNumber,
        role: AccountRole,
    ) -> Result<Account, WalletError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, phone_number, role, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (phone_number) DO NOTHING
            "#,
        )
        .bind(AccountId::new())
        .bind(phone.clone())
        .bind(role)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        let model = sqlx::query_as::<_, AccountModel>(
            r#"
            SELECT * FROM accounts
            WHERE phone_number = $1
            "#,
        )
        .bind(phone.clone())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        Ok(model.into())
    }
}
