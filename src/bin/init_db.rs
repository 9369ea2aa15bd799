use chrono::Utc;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::env;

use charge_wallet_service::domain::entities::AccountRole;
use charge_wallet_service::domain::types::{AccountId, PhoneNumber};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    println!("Connecting to {}...", database_url);
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .map_err(|e| format!("Failed to connect: {}", e))?;

    println!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| format!("Migration failed: {}", e))?;

    // Bootstrap opcional del primer administrador.
    if let Ok(raw_phone) = env::var("ADMIN_PHONE") {
        let phone = PhoneNumber::new(&raw_phone)
            .map_err(|e| format!("ADMIN_PHONE invalid: {}", e))?;
        let admin_id = AccountId::new();

        sqlx::query(
            r#"
            INSERT INTO accounts (id, phone_number, role, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (phone_number) DO NOTHING
            "#,
        )
        .bind(admin_id)
        .bind(phone.clone())
        .bind(AccountRole::ADMIN)
        .bind(Utc::now())
        .execute(&pool)
        .await
        .map_err(|e| format!("Admin seed failed: {}", e))?;

        sqlx::query(
            r#"
            INSERT INTO wallets (account_id, balance, status, created_at)
            SELECT id, 0.00, 'ACTIVE', $1 FROM accounts WHERE phone_number = $2
            ON CONFLICT (account_id) DO NOTHING
            "#,
        )
        .bind(Utc::now())
        .bind(phone.clone())
        .execute(&pool)
        .await
        .map_err(|e| format!("Admin wallet seed failed: {}", e))?;

        println!("Admin account ensured for {}", phone);
    }

    println!("Wallet ledger DB initialized successfully!");
    Ok(())
}
