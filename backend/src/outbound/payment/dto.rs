//! Wire types for the payment provider's charges API.

use serde::Deserialize;

/// Successful charge creation response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChargeDto {
    /// Provider charge identifier, e.g. `ch_123`.
    pub id: String,
}

/// Error envelope returned with non-success statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ChargeErrorDto {
    #[serde(default)]
    pub error: ChargeErrorDetailDto,
}

/// Inner error payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ChargeErrorDetailDto {
    #[serde(default)]
    pub message: Option<String>,
}
