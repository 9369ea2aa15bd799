pub mod create_charge_sale;
pub mod create_credit_request;
pub mod process_credit_request;
pub mod transfer_engine;
pub mod wallet_registry;
