pub mod error;
pub mod http_routes;
