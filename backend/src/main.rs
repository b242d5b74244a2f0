//! Backend entry-point: wires the ride reservation endpoint, health
//! probes, and OpenAPI docs.

mod server;

use std::env;
use std::sync::Arc;

use actix_web::web;
use reqwest::Url;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use backend::inbound::http::health::HealthState;
use backend::outbound::payment::{HttpPaymentClient, PaymentHttpConfig};
use backend::outbound::persistence::DbPool;
use server::ServerConfig;

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let bind_addr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()
        .map_err(|err| std::io::Error::other(format!("invalid BIND_ADDR: {err}")))?;

    let mut config = ServerConfig::new(bind_addr);

    match env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = DbPool::connect(&database_url)
                .await
                .map_err(|err| std::io::Error::other(format!("building database pool: {err}")))?;
            config = config.with_db_pool(pool);
        }
        Err(_) => warn!("DATABASE_URL not set; running without persistence"),
    }

    match (env::var("PAYMENT_API_URL"), env::var("PAYMENT_SECRET_KEY")) {
        (Ok(base), Ok(secret)) => {
            let base_url = Url::parse(&base)
                .map_err(|err| std::io::Error::other(format!("invalid PAYMENT_API_URL: {err}")))?;
            let client = HttpPaymentClient::new(PaymentHttpConfig::new(base_url, secret))
                .map_err(|err| std::io::Error::other(format!("building payment client: {err}")))?;
            config = config.with_payment_provider(Arc::new(client));
        }
        _ => warn!("payment provider credentials not set; charges will use the fixture provider"),
    }

    let health_state = web::Data::new(HealthState::new());
    let http_server = server::create_server(health_state, config)?;

    info!(addr = %bind_addr, "server listening");
    http_server.await
}
