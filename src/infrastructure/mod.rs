pub mod cache;
pub mod locking;
pub mod persistence;
pub mod pool;
