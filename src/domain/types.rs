use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::error::WalletError;

/// Identificador de Cuenta usando NewType Pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct AccountId(pub Uuid);

impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identificador de un asiento del libro mayor (Transaction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct TransactionId(pub Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identificador de una venta de carga (ChargeSale).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct ChargeSaleId(pub Uuid);

impl ChargeSaleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChargeSaleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChargeSaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identificador monotónico (BIGSERIAL) de una solicitud de crédito.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct CreditRequestId(pub i64);

impl fmt::Display for CreditRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Número de teléfono validado: exactamente 11 caracteres.
///
/// Es la identidad pública de una cuenta; se valida en el borde para que las
/// capas internas solo trabajen con valores bien formados.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn new(raw: &str) -> Result<Self, WalletError> {
        let trimmed = raw.trim();
        if trimmed.len() != 11 {
            return Err(WalletError::InvalidInput(format!(
                "phone number must be exactly 11 characters, got {}",
                trimmed.len()
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_number_valid() {
        let phone = PhoneNumber::new("09123456789");
        assert!(phone.is_ok());
        assert_eq!(phone.unwrap().as_str(), "09123456789");
    }

    #[test]
    fn test_phone_number_trims_whitespace() {
        let phone = PhoneNumber::new(" 09123456789 ").unwrap();
        assert_eq!(phone.as_str(), "09123456789");
    }

    #[test]
    fn test_phone_number_wrong_length() {
        assert!(PhoneNumber::new("0912345678").is_err());
        assert!(PhoneNumber::new("091234567890").is_err());
        assert!(PhoneNumber::new("").is_err());
    }
}
