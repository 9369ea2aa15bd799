pub mod account_repository;
pub mod ledger_store;
pub mod memory;
pub mod models;
