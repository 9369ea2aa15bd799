use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::domain::entities::{
    ChargeSale, CreditRequest, CreditRequestStatus, LedgerEntry, Wallet,
};
use crate::domain::error::WalletError;
use crate::domain::repository::{LedgerStore, TransferCommit, TransferOrigin};
use crate::domain::types::{AccountId, ChargeSaleId, CreditRequestId};
use crate::infrastructure::persistence::models::{
    ChargeSaleModel, CreditRequestModel, TransactionModel, WalletModel,
};

/// Ledger Store durable implementado para PostgreSQL.
///
/// Utiliza consultas SQL parametrizadas directas con `sqlx`. Las transiciones
/// de estado van siempre precondicionadas en el WHERE, de modo que la base de
/// datos es quien decide al único ganador entre procesadores concurrentes.
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    /// Crea la billetera con balance 0.00 y estado ACTIVE si no existe.
    async fn get_or_create_wallet(&self, account_id: AccountId) -> Result<Wallet, WalletError> {
        sqlx::query(
            r#"
            INSERT INTO wallets (account_id, balance, status, created_at)
            VALUES ($1, 0.00, 'ACTIVE', $2)
            ON CONFLICT (account_id) DO NOTHING
            "#,
        )
        .bind(account_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        let model = sqlx::query_as::<_, WalletModel>(
            r#"SELECT * FROM wallets WHERE account_id = $1"#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        Ok(model.into())
    }

    async fn find_wallet(&self, account_id: AccountId) -> Result<Option<Wallet>, WalletError> {
        let model_opt = sqlx::query_as::<_, WalletModel>(
            r#"SELECT * FROM wallets WHERE account_id = $1"#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        Ok(model_opt.map(|m| m.into()))
    }

    async fn update_wallet_balance(
        &self,
        account_id: AccountId,
        balance: Decimal,
    ) -> Result<(), WalletError> {
        let result = sqlx::query(
            r#"UPDATE wallets SET balance = $1 WHERE account_id = $2"#,
        )
        .bind(balance)
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(WalletError::RepositoryError(format!(
                "wallet not found for account {account_id}"
            )));
        }
        Ok(())
    }

    async fn create_credit_request(
        &self,
        account_id: AccountId,
        amount: Decimal,
    ) -> Result<CreditRequest, WalletError> {
        let model = sqlx::query_as::<_, CreditRequestModel>(
            r#"
            INSERT INTO credit_requests (account_id, amount, status, created_at)
            VALUES ($1, $2, 'WAITING', $3)
            RETURNING *
            "#,
        )
        .bind(account_id)
        .bind(amount)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        Ok(model.into())
    }

    async fn find_credit_request(
        &self,
        id: CreditRequestId,
    ) -> Result<Option<CreditRequest>, WalletError> {
        let model_opt = sqlx::query_as::<_, CreditRequestModel>(
            r#"SELECT * FROM credit_requests WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        Ok(model_opt.map(|m| m.into()))
    }

    async fn transition_credit_request(
        &self,
        id: CreditRequestId,
        from: CreditRequestStatus,
        to: CreditRequestStatus,
        admin_id: AccountId,
    ) -> Result<bool, WalletError> {
        let result = sqlx::query(
            r#"
            UPDATE credit_requests
            SET status = $1, admin_id = $2
            WHERE id = $3 AND status = $4
            "#,
        )
        .bind(to)
        .bind(admin_id)
        .bind(id)
        .bind(from)
        .execute(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn create_charge_sale(&self, sale: &ChargeSale) -> Result<(), WalletError> {
        sqlx::query(
            r#"
            INSERT INTO charge_sales (
                id, seller_id, phone_number, amount, status, transaction_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(sale.id)
        .bind(sale.seller_id)
        .bind(sale.phone_number.clone())
        .bind(sale.amount)
        .bind(sale.status)
        .bind(sale.transaction_id)
        .bind(sale.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        Ok(())
    }

    async fn find_charge_sale(
        &self,
        id: ChargeSaleId,
    ) -> Result<Option<ChargeSale>, WalletError> {
        let model_opt = sqlx::query_as::<_, ChargeSaleModel>(
            r#"SELECT * FROM charge_sales WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        Ok(model_opt.map(|m| m.into()))
    }

    async fn charge_sales_for_seller(
        &self,
        seller_id: AccountId,
    ) -> Result<Vec<ChargeSale>, WalletError> {
        let models = sqlx::query_as::<_, ChargeSaleModel>(
            r#"
            SELECT * FROM charge_sales
            WHERE seller_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        Ok(models.into_iter().map(|m| m.into()).collect())
    }

    async fn mark_charge_sale_failed(&self, id: ChargeSaleId) -> Result<(), WalletError> {
        sqlx::query(
            r#"
            UPDATE charge_sales
            SET status = 'FAILED'
            WHERE id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        Ok(())
    }

    /// Commit durable: asientos, balances y transición de origen dentro de
    /// una única transacción. Cualquier retorno temprano descarta `tx`, que
    /// hace rollback al caer.
    async fn commit_transfer(&self, commit: &TransferCommit) -> Result<(), WalletError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        for entry in &commit.entries {
            let model = TransactionModel::from(entry);
            sqlx::query(
                r#"
                INSERT INTO transactions (
                    id, seller_id, transaction_type, amount, balance_before,
                    balance_after, reference_id, description, admin_id, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(model.id)
            .bind(model.seller_id)
            .bind(model.transaction_type)
            .bind(model.amount)
            .bind(model.balance_before)
            .bind(model.balance_after)
            .bind(model.reference_id)
            .bind(model.description)
            .bind(model.admin_id)
            .bind(model.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| WalletError::RepositoryError(e.to_string()))?;
        }

        for (account_id, balance) in &commit.balances {
            let result = sqlx::query(
                r#"UPDATE wallets SET balance = $1 WHERE account_id = $2"#,
            )
            .bind(*balance)
            .bind(*account_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

            if result.rows_affected() == 0 {
                return Err(WalletError::RepositoryError(format!(
                    "wallet not found for account {account_id}"
                )));
            }
        }

        match &commit.origin {
            TransferOrigin::ChargeSale { id, seller_entry } => {
                let result = sqlx::query(
                    r#"
                    UPDATE charge_sales
                    SET status = 'COMPLETED', transaction_id = $1
                    WHERE id = $2 AND status = 'PENDING'
                    "#,
                )
                .bind(*seller_entry)
                .bind(*id)
                .execute(&mut *tx)
                .await
                .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

                if result.rows_affected() == 0 {
                    return Err(WalletError::RepositoryError(format!(
                        "charge sale {id} no longer PENDING"
                    )));
                }
            }
            TransferOrigin::CreditApproval { id, admin_id } => {
                let result = sqlx::query(
                    r#"
                    UPDATE credit_requests
                    SET status = 'ACCEPTED', admin_id = $1
                    WHERE id = $2 AND status = 'WAITING'
                    "#,
                )
                .bind(*admin_id)
                .bind(*id)
                .execute(&mut *tx)
                .await
                .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

                if result.rows_affected() == 0 {
                    return Err(WalletError::RepositoryError(format!(
                        "credit request {id} no longer WAITING"
                    )));
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| WalletError::RepositoryError(e.to_string()))
    }

    async fn entries_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<LedgerEntry>, WalletError> {
        let models = sqlx::query_as::<_, TransactionModel>(
            r#"
            SELECT * FROM transactions
            WHERE seller_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        Ok(models.into_iter().map(|m| m.into()).collect())
    }

    async fn entries_for_reference(
        &self,
        reference_id: &str,
    ) -> Result<Vec<LedgerEntry>, WalletError> {
        let models = sqlx::query_as::<_, TransactionModel>(
            r#"
            SELECT * FROM transactions
            WHERE reference_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(reference_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        Ok(models.into_iter().map(|m| m.into()).collect())
    }
}
