use anyhow::Context;
use std::env;
use std::time::Duration;

use crate::infrastructure::locking::lock_manager::LockConfig;
use crate::use_cases::transfer_engine::EngineConfig;

/// Configuración de la aplicación, armada desde variables de entorno.
///
/// Las únicas constantes externas son las conexiones, el tamaño del pool de
/// workers y los tunables de locks/CAS; todo lo demás tiene default.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: String,
    pub transfer_workers: usize,
    pub lock: LockConfig,
    pub engine: EngineConfig,
}

fn env_u64(name: &str, default: u64) -> anyhow::Result<u64> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("{name} must be an integer, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());

        let lock = LockConfig {
            local_timeout: Duration::from_secs(env_u64("LOCK_LOCAL_TIMEOUT_SECS", 5)?),
            lease_ttl: Duration::from_secs(env_u64("LOCK_LEASE_TTL_SECS", 60)?),
            lease_retry_attempts: env_u64("LOCK_RETRY_ATTEMPTS", 20)? as u32,
            lease_retry_delay: Duration::from_millis(env_u64("LOCK_RETRY_DELAY_MS", 200)?),
        };
        let engine = EngineConfig {
            cas_retry_attempts: env_u64("CAS_RETRY_ATTEMPTS", 3)? as u32,
            cas_backoff: Duration::from_millis(env_u64("CAS_BACKOFF_MS", 100)?),
        };

        Ok(Self {
            database_url,
            host,
            port,
            transfer_workers: env_u64("TRANSFER_WORKERS", 10)? as usize,
            lock,
            engine,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_constants() {
        // Sin overrides, los tunables quedan en los valores documentados.
        let lock = LockConfig::default();
        assert_eq!(lock.local_timeout, Duration::from_secs(5));
        assert_eq!(lock.lease_ttl, Duration::from_secs(60));
        assert_eq!(lock.lease_retry_attempts, 20);
        assert_eq!(lock.lease_retry_delay, Duration::from_millis(200));

        let engine = EngineConfig::default();
        assert_eq!(engine.cas_retry_attempts, 3);
        assert_eq!(engine.cas_backoff, Duration::from_millis(100));
    }
}
