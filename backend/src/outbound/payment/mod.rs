//! Payment provider outbound adapter.

mod dto;
mod http_client;

pub use http_client::{HttpPaymentClient, PaymentHttpConfig};
