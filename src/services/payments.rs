//! Payment reconciliation for orders.
//!
//! Intents are requested from the configured gateway, confirmations are
//! checked against the recorded intent and the HMAC signature, and every
//! payment-status write goes through the repository's compare-and-set.

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::{ensure_owner, ensure_owner_or_admin, AuthUser},
    entities::order::{Model as OrderModel, OrderStatus, PaymentStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    payments::{to_minor_units, CreateIntentRequest, IntentNotes, PaymentProvider},
    repositories::OrderRepository,
    services::order_lifecycle::{
        ensure_payment_intent_allowed, payment_status_after_failure_report, VerificationOutcome,
    },
};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreatePaymentIntentRequest {
    #[serde(default, alias = "orderId")]
    pub order_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentIntentResponse {
    pub gateway_order_id: String,
    /// Minor currency units
    pub amount: i64,
    pub currency: String,
    pub order_id: Uuid,
    /// Public key for the client checkout widget
    pub key_id: String,
}

/// Confirmation relayed by the client after checkout.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    #[serde(default, alias = "razorpayOrderId", alias = "razorpay_order_id")]
    pub gateway_order_id: Option<String>,
    #[serde(default, alias = "razorpayPaymentId", alias = "razorpay_payment_id")]
    pub gateway_payment_id: Option<String>,
    #[serde(default, alias = "razorpaySignature", alias = "razorpay_signature")]
    pub signature: Option<String>,
    #[serde(default, alias = "orderId")]
    pub order_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VerifyPaymentResponse {
    pub order_id: Uuid,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PaymentFailureRequest {
    #[serde(default, alias = "orderId")]
    pub order_id: Option<String>,
    /// Client-side description of what went wrong
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentFailureResponse {
    pub order_id: Uuid,
    pub payment_status: PaymentStatus,
}

fn required<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str, ServiceError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::ValidationError(message.to_string()))
}

// An id that does not parse cannot name an order.
fn parse_order_id(raw: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw).map_err(|_| ServiceError::NotFound("Order not found".to_string()))
}

fn describe_failure(error: &Option<serde_json::Value>) -> Option<String> {
    match error {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(text)) => Some(text.clone()),
        Some(serde_json::Value::Object(map)) => map
            .get("description")
            .or_else(|| map.get("message"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| Some(serde_json::Value::Object(map.clone()).to_string())),
        Some(other) => Some(other.to_string()),
    }
}

/// Payment intents, confirmation verification and failure reports.
#[derive(Clone)]
pub struct PaymentService {
    repo: OrderRepository,
    provider: Option<PaymentProvider>,
    event_sender: EventSender,
    currency: String,
}

impl PaymentService {
    pub fn new(
        repo: OrderRepository,
        provider: Option<PaymentProvider>,
        event_sender: EventSender,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            provider,
            event_sender,
            currency: currency.into(),
        }
    }

    fn provider(&self) -> Result<&PaymentProvider, ServiceError> {
        self.provider.as_ref().ok_or_else(|| {
            ServiceError::ServiceUnavailable("Payment gateway is not configured".to_string())
        })
    }

    async fn load(&self, id: Uuid) -> Result<OrderModel, ServiceError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))
    }

    /// Asks the gateway for a payment intent covering the order total.
    #[instrument(skip(self, user, request), fields(user_id = %user.user_id))]
    pub async fn create_intent(
        &self,
        user: &AuthUser,
        request: CreatePaymentIntentRequest,
    ) -> Result<PaymentIntentResponse, ServiceError> {
        let order_id = parse_order_id(required(
            request.order_id.as_deref(),
            "Order ID is required",
        )?)?;
        let order = self.load(order_id).await?;
        ensure_owner(user, order.user_id)?;
        ensure_payment_intent_allowed(order.payment_status)?;
        let provider = self.provider()?;

        let amount = to_minor_units(order.total_amount)?;
        let intent = provider
            .gateway
            .create_intent(&CreateIntentRequest {
                amount,
                currency: self.currency.clone(),
                receipt: order.id.to_string(),
                notes: IntentNotes {
                    order_id: order.id.to_string(),
                    user_id: user.user_id.to_string(),
                },
            })
            .await
            .map_err(|e| {
                error!(order_id = %order.id, error = %e, "Payment intent creation failed");
                ServiceError::from(e)
            })?;

        let order = self.repo.set_gateway_order_id(order, &intent.id).await?;
        info!(order_id = %order.id, gateway_order_id = %intent.id, amount, "Payment intent issued");

        Ok(PaymentIntentResponse {
            gateway_order_id: intent.id,
            amount: intent.amount,
            currency: intent.currency,
            order_id: order.id,
            key_id: provider.gateway.key_id(),
        })
    }

    /// Checks the gateway signature and settles the payment track.
    ///
    /// A match marks the order `paid`. Once the order is loaded and owned by
    /// the caller, every error (signature mismatch, unbound intent, missing
    /// gateway, failed write) marks it `failed` before it is returned.
    #[instrument(skip(self, user, request), fields(user_id = %user.user_id))]
    pub async fn verify_payment(
        &self,
        user: &AuthUser,
        request: VerifyPaymentRequest,
    ) -> Result<VerifyPaymentResponse, ServiceError> {
        const MISSING: &str = "Missing payment verification parameters";
        let gateway_order_id = required(request.gateway_order_id.as_deref(), MISSING)?;
        let payment_id = required(request.gateway_payment_id.as_deref(), MISSING)?;
        let signature = required(request.signature.as_deref(), MISSING)?;
        let order_id = parse_order_id(required(request.order_id.as_deref(), MISSING)?)?;

        let order = self.load(order_id).await?;
        ensure_owner(user, order.user_id)?;

        self.verify_loaded(order, gateway_order_id, payment_id, signature)
            .await
    }

    async fn verify_loaded(
        &self,
        order: OrderModel,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<VerifyPaymentResponse, ServiceError> {
        let order_id = order.id;
        match self
            .settle_confirmation(order, gateway_order_id, payment_id, signature)
            .await
        {
            Ok(response) => Ok(response),
            Err(err) => {
                self.fail_after_verification_error(order_id, &err).await;
                Err(err)
            }
        }
    }

    async fn settle_confirmation(
        &self,
        order: OrderModel,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<VerifyPaymentResponse, ServiceError> {
        let provider = self.provider()?;

        if let Err(reason) = check_intent_binding(&order, gateway_order_id) {
            warn!(order_id = %order.id, %reason, "Payment confirmation rejected");
            return Err(ServiceError::PaymentVerificationFailed(reason));
        }

        let outcome = provider
            .verifier
            .verify(gateway_order_id, payment_id, signature);

        match outcome {
            VerificationOutcome::Verified if order.payment_status == PaymentStatus::Paid => {
                info!(order_id = %order.id, "Payment already confirmed");
                Ok(verify_response(&order))
            }
            VerificationOutcome::Verified => {
                let paid = self
                    .repo
                    .compare_and_set_payment_status(
                        order.id,
                        order.payment_status,
                        outcome.next_payment_status(),
                        Some(payment_id),
                    )
                    .await?;
                info!(order_id = %paid.id, gateway_payment_id = %payment_id, "Payment verified");
                self.event_sender.emit(Event::PaymentConfirmed {
                    order: paid.clone(),
                });
                Ok(verify_response(&paid))
            }
            VerificationOutcome::SignatureMismatch => {
                warn!(order_id = %order.id, "Payment signature mismatch");
                Err(ServiceError::PaymentVerificationFailed(
                    "Invalid signature".to_string(),
                ))
            }
        }
    }

    /// Forces `failed` after a verification error. Errors here are logged so
    /// the caller still sees the original one.
    async fn fail_after_verification_error(&self, order_id: Uuid, cause: &ServiceError) {
        let current = match self.load(order_id).await {
            Ok(order) => order,
            Err(e) => {
                error!(%order_id, error = %e, "Could not reload order to mark payment failed");
                return;
            }
        };

        // A lost race means another writer already settled the payment track.
        if matches!(cause, ServiceError::ConcurrentModification(_))
            && current.payment_status != PaymentStatus::Pending
        {
            info!(%order_id, payment_status = %current.payment_status, "Payment settled concurrently");
            return;
        }

        let reason = match cause {
            ServiceError::PaymentVerificationFailed(reason) => reason.clone(),
            other => other.to_string(),
        };
        if let Err(e) = self.mark_failed(current, Some(reason)).await {
            error!(%order_id, error = %e, "Could not mark payment failed");
        }
    }

    /// Records a client-reported payment failure. Always lands in `failed`.
    #[instrument(skip(self, user, request), fields(user_id = %user.user_id))]
    pub async fn report_failure(
        &self,
        user: &AuthUser,
        request: PaymentFailureRequest,
    ) -> Result<PaymentFailureResponse, ServiceError> {
        let order_id = parse_order_id(required(
            request.order_id.as_deref(),
            "Order ID is required",
        )?)?;
        let order = self.load(order_id).await?;
        ensure_owner_or_admin(user, order.user_id)?;

        let reason = describe_failure(&request.error);
        warn!(order_id = %order.id, reason = ?reason, "Payment failure reported");
        let failed = self.mark_failed(order, reason).await?;

        Ok(PaymentFailureResponse {
            order_id: failed.id,
            payment_status: failed.payment_status,
        })
    }

    async fn mark_failed(
        &self,
        order: OrderModel,
        reason: Option<String>,
    ) -> Result<OrderModel, ServiceError> {
        let failed = self
            .repo
            .compare_and_set_payment_status(
                order.id,
                order.payment_status,
                payment_status_after_failure_report(order.payment_status),
                None,
            )
            .await?;
        self.event_sender.emit(Event::PaymentFailed {
            order: failed.clone(),
            reason,
        });
        Ok(failed)
    }
}

/// A confirmation must name the intent this service issued for the order.
fn check_intent_binding(order: &OrderModel, gateway_order_id: &str) -> Result<(), String> {
    match order.gateway_order_id.as_deref() {
        Some(issued) if issued == gateway_order_id => Ok(()),
        Some(_) => Err("Gateway order does not belong to this order".to_string()),
        None => Err("No payment intent was issued for this order".to_string()),
    }
}

fn verify_response(order: &OrderModel) -> VerifyPaymentResponse {
    VerifyPaymentResponse {
        order_id: order.id,
        payment_status: order.payment_status,
        order_status: order.order_status,
    }
}
