//! Outbound HTTP clients for external services

pub mod api_football;
pub mod mercado_pago;

pub use api_football::ApiFootballClient;
pub use mercado_pago::MercadoPagoClient;
