use async_trait::async_trait;
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, instrument};

use crate::errors::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Amount {0} cannot be expressed in minor units")]
    InvalidAmount(Decimal),
}

impl From<GatewayError> for ServiceError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidAmount(_) => ServiceError::ValidationError(err.to_string()),
            other => ServiceError::ExternalServiceError(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentNotes {
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Body of a gateway order ("payment intent") creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateIntentRequest {
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: IntentNotes,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

/// Remote payment provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, request: &CreateIntentRequest) -> Result<PaymentIntent, GatewayError>;

    /// Public key handed to clients for the checkout widget.
    fn key_id(&self) -> String;
}

/// Converts a major-unit amount to minor units (× 100), rounding half away from zero.
pub fn to_minor_units(amount: Decimal) -> Result<i64, GatewayError> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .filter(|minor| *minor >= 0)
        .ok_or(GatewayError::InvalidAmount(amount))
}

/// Razorpay-compatible REST client.
#[derive(Clone)]
pub struct RazorpayGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl std::fmt::Debug for RazorpayGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayGateway")
            .field("base_url", &self.base_url)
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl RazorpayGateway {
    pub fn new(
        base_url: &str,
        key_id: &str,
        key_secret: &str,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id: key_id.to_string(),
            key_secret: key_secret.to_string(),
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    #[instrument(skip(self, request), fields(receipt = %request.receipt, amount = request.amount))]
    async fn create_intent(&self, request: &CreateIntentRequest) -> Result<PaymentIntent, GatewayError> {
        let response = self
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Payment gateway request failed");
                GatewayError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Payment gateway rejected order creation");
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let intent: PaymentIntent = response.json().await?;
        info!(gateway_order_id = %intent.id, "Payment intent created");
        Ok(intent)
    }

    fn key_id(&self) -> String {
        self.key_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{body_partial_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> CreateIntentRequest {
        CreateIntentRequest {
            amount: 8000,
            currency: "INR".into(),
            receipt: "4b1c8c3e-0000-4000-8000-000000000001".into(),
            notes: IntentNotes {
                order_id: "4b1c8c3e-0000-4000-8000-000000000001".into(),
                user_id: "user-1".into(),
            },
        }
    }

    #[test]
    fn minor_units_round_half_away_from_zero() {
        assert_eq!(to_minor_units(dec!(80)).unwrap(), 8000);
        assert_eq!(to_minor_units(dec!(10.005)).unwrap(), 1001);
        assert_eq!(to_minor_units(dec!(10.004)).unwrap(), 1000);
        assert_eq!(to_minor_units(dec!(0)).unwrap(), 0);
        assert_matches!(to_minor_units(dec!(-1)), Err(GatewayError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn create_intent_posts_order_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .and(header_exists("authorization"))
            .and(body_partial_json(serde_json::json!({
                "amount": 8000,
                "currency": "INR",
                "notes": { "userId": "user-1" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "order_RZP123",
                "entity": "order",
                "amount": 8000,
                "currency": "INR",
                "status": "created"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway =
            RazorpayGateway::new(&server.uri(), "rzp_test", "secret", Duration::from_secs(5)).unwrap();
        let intent = gateway.create_intent(&request()).await.unwrap();

        assert_eq!(intent.id, "order_RZP123");
        assert_eq!(intent.amount, 8000);
        assert_eq!(gateway.key_id(), "rzp_test");
    }

    #[tokio::test]
    async fn gateway_errors_surface_as_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let gateway =
            RazorpayGateway::new(&server.uri(), "rzp_test", "wrong", Duration::from_secs(5)).unwrap();
        let err = gateway.create_intent(&request()).await.unwrap_err();

        assert_matches!(err, GatewayError::Rejected { status: 401, .. });
        assert_matches!(ServiceError::from(err), ServiceError::ExternalServiceError(_));
    }
}
