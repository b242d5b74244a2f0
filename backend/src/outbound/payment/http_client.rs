//! Reqwest-backed payment provider adapter.
//!
//! This adapter owns transport details only: form serialization, the
//! provider idempotency header, timeout and HTTP error mapping, and JSON
//! decoding of the charge response. Workflow semantics stay in the
//! driver.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::domain::ports::{ChargeRequest, PaymentProvider, PaymentProviderError};

use super::dto::{ChargeDto, ChargeErrorDto};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Header the provider uses to deduplicate retried charge requests.
const PROVIDER_IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Connection settings for the charges API.
#[derive(Debug, Clone)]
pub struct PaymentHttpConfig {
    base_url: Url,
    secret_key: String,
    timeout: Duration,
}

impl PaymentHttpConfig {
    /// Create a configuration for the given API base and secret key.
    ///
    /// The base URL must end with a trailing slash for relative joins to
    /// resolve, e.g. `https://api.stripe.com/`.
    pub fn new(base_url: Url, secret_key: impl Into<String>) -> Self {
        Self {
            base_url,
            secret_key: secret_key.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Override the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Payment provider adapter performing HTTP POSTs against one endpoint.
pub struct HttpPaymentClient {
    client: Client,
    base_url: Url,
    secret_key: String,
}

impl HttpPaymentClient {
    /// Build an adapter using a reqwest client with an explicit request
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: PaymentHttpConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url,
            secret_key: config.secret_key,
        })
    }
}

/// Form fields the charges endpoint expects.
fn charge_form(charge: &ChargeRequest) -> Vec<(&'static str, String)> {
    vec![
        ("customer", charge.customer_id.clone()),
        ("amount", charge.amount_cents.to_string()),
        ("currency", charge.currency.clone()),
        ("receipt_email", charge.receipt_email.clone()),
    ]
}

#[async_trait]
impl PaymentProvider for HttpPaymentClient {
    async fn create_charge(&self, charge: &ChargeRequest) -> Result<String, PaymentProviderError> {
        let url = self
            .base_url
            .join("v1/charges")
            .map_err(|err| PaymentProviderError::transport(err.to_string()))?;

        let response = self
            .client
            .post(url)
            .basic_auth(&self.secret_key, None::<&str>)
            .header(
                PROVIDER_IDEMPOTENCY_HEADER,
                charge.idempotency_key.as_str(),
            )
            .form(&charge_form(charge))
            .send()
            .await
            .map_err(|err| PaymentProviderError::transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let envelope: ChargeErrorDto = response.json().await.unwrap_or_default();
            let message = envelope
                .error
                .message
                .unwrap_or_else(|| "no error message provided".to_owned());
            return Err(PaymentProviderError::rejected(status.as_u16(), message));
        }

        // A replayed idempotency key gets the provider's original success
        // response back, so this decodes the original charge id too.
        let body: ChargeDto = response
            .json()
            .await
            .map_err(|err| PaymentProviderError::decode(err.to_string()))?;

        Ok(body.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IdempotencyKey;
    use rstest::{fixture, rstest};

    #[fixture]
    fn charge() -> ChargeRequest {
        ChargeRequest {
            customer_id: "cus_9".to_owned(),
            amount_cents: 2000,
            currency: "usd".to_owned(),
            receipt_email: "rider@example.com".to_owned(),
            idempotency_key: IdempotencyKey::new("testKey").expect("valid key"),
        }
    }

    #[rstest]
    fn charge_form_carries_every_field(charge: ChargeRequest) {
        let form = charge_form(&charge);

        assert_eq!(
            form,
            vec![
                ("customer", "cus_9".to_owned()),
                ("amount", "2000".to_owned()),
                ("currency", "usd".to_owned()),
                ("receipt_email", "rider@example.com".to_owned()),
            ]
        );
    }

    #[rstest]
    fn base_url_joins_the_charges_path() {
        let base = Url::parse("https://api.stripe.com/").expect("valid base");
        let url = base.join("v1/charges").expect("joins");
        assert_eq!(url.as_str(), "https://api.stripe.com/v1/charges");
    }
}
