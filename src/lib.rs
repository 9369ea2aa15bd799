//! Charge Wallet Service Library
//!
//! Ledger de billeteras para un marketplace prepago de venta de cargas: los
//! vendedores obtienen crédito del administrador y debitan su billetera para
//! acreditar compradores. El corazón es el motor de transferencias atómicas
//! entre dos billeteras, que mantiene consistentes el store durable y el
//! caché compartido bajo workers concurrentes.
//!
//! # Modules
//!
//! * `api` - Interfaz HTTP (axum) y mapeo de errores a códigos de estado.
//! * `config` - Configuración desde variables de entorno.
//! * `domain` - Entidades, errores y ports (persistencia, caché, leases).
//! * `infrastructure` - Adaptadores concretos: PostgreSQL, store compartido
//!   en memoria, lock manager de dos niveles y pool de workers.
//! * `use_cases` - Flujos de aplicación: registro de billeteras, motor de
//!   transferencias e intake de solicitudes.

pub mod api;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod use_cases;
