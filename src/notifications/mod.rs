//! Best-effort customer notifications for order lifecycle events.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::config::NotificationConfig;
use crate::entities::order::{OrderStatus, PaymentStatus};
use crate::events::Event;
use crate::payments::HmacSigner;

pub const SIGNATURE_HEADER: &str = "X-Pizzeria-Signature";
pub const TIMESTAMP_HEADER: &str = "X-Pizzeria-Timestamp";

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Delivery failed after {attempts} attempts")]
    DeliveryFailed { attempts: u32 },
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

/// Destination for lifecycle notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: &Event) -> Result<(), NotificationError>;
}

/// Customer-facing text for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

fn status_line(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Placed => "Your order has been placed",
        OrderStatus::Preparing => "Your order is being prepared",
        OrderStatus::Dispatched => "Your order has been dispatched",
        OrderStatus::Delivered => "Your order has been delivered",
    }
}

fn payment_line(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "Pending",
        PaymentStatus::Paid => "Paid",
        PaymentStatus::Failed => "Failed",
    }
}

/// Renders the subject and plain-text body sent to the customer.
pub fn render_message(event: &Event, currency: &str) -> RenderedMessage {
    let order = event.order();
    let items = order
        .line_items()
        .unwrap_or_default()
        .iter()
        .map(|item| {
            let size = item
                .selected_size
                .as_ref()
                .map(|s| format!(" ({})", s.name))
                .unwrap_or_default();
            format!(
                "- {}{} x {} = {} {:.2}",
                item.name, size, item.quantity, currency, item.total_price
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let summary = format!(
        "Order ID: {}\nDelivery Location: {}\n\nItems:\n{}\n\nTotal Amount: {} {:.2}\nPayment Status: {}",
        order.id,
        order.delivery_location,
        items,
        currency,
        order.total_amount,
        payment_line(order.payment_status),
    );

    match event {
        Event::OrderCreated { .. } => RenderedMessage {
            subject: format!("Order Confirmation - #{}", order.id),
            body: format!(
                "Your order has been placed successfully!\n\n{}\n\nWe'll notify you once payment is confirmed.",
                summary
            ),
        },
        Event::PaymentConfirmed { .. } => RenderedMessage {
            subject: format!("Payment Successful - Order #{}", order.id),
            body: format!(
                "Your payment has been confirmed!\n\n{}\nOrder Status: {}",
                summary, order.order_status
            ),
        },
        Event::PaymentFailed { reason, .. } => RenderedMessage {
            subject: format!("Payment Failed - Order #{}", order.id),
            body: format!(
                "We could not confirm your payment{}.\n\n{}\n\nYou can retry the payment from the Orders section.",
                reason
                    .as_deref()
                    .map(|r| format!(" ({})", r))
                    .unwrap_or_default(),
                summary
            ),
        },
        Event::FulfillmentStatusChanged { new_status, .. } => RenderedMessage {
            subject: format!("Order Update - #{}", order.id),
            body: format!("{}!\n\n{}", status_line(*new_status), summary),
        },
    }
}

/// Writes notifications to the log. Used when no webhook is configured.
#[derive(Debug, Clone)]
pub struct LogNotificationSink {
    currency: String,
}

impl LogNotificationSink {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn notify(&self, event: &Event) -> Result<(), NotificationError> {
        let message = render_message(event, &self.currency);
        info!(
            kind = event.kind(),
            order_id = %event.order().id,
            user_id = %event.order().user_id,
            subject = %message.subject,
            "Customer notification"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    event: &'static str,
    order_id: uuid::Uuid,
    user_id: uuid::Uuid,
    message: RenderedMessage,
    data: &'a Event,
}

/// POSTs signed JSON notifications to an external endpoint with retries.
#[derive(Clone, Debug)]
pub struct WebhookNotificationSink {
    client: reqwest::Client,
    url: String,
    signer: HmacSigner,
    currency: String,
    max_retries: u32,
    backoff_base: Duration,
}

impl WebhookNotificationSink {
    pub fn new(url: &str, secret: &str, currency: &str) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        let signer = HmacSigner::new(secret.as_bytes())
            .map_err(|e| NotificationError::Configuration(e.to_string()))?;
        Ok(Self {
            client,
            url: url.to_string(),
            signer,
            currency: currency.to_string(),
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
        })
    }

    pub fn with_retry_policy(mut self, max_retries: u32, backoff_base: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.backoff_base = backoff_base;
        self
    }
}

#[async_trait]
impl NotificationSink for WebhookNotificationSink {
    #[instrument(skip(self, event), fields(kind = event.kind(), order_id = %event.order().id))]
    async fn notify(&self, event: &Event) -> Result<(), NotificationError> {
        let order = event.order();
        let body = serde_json::to_string(&WebhookPayload {
            event: event.kind(),
            order_id: order.id,
            user_id: order.user_id,
            message: render_message(event, &self.currency),
            data: event,
        })?;

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self
            .signer
            .sign_hex(format!("{}.{}", timestamp, body).as_bytes());

        for attempt in 1..=self.max_retries {
            let result = self
                .client
                .post(&self.url)
                .header("Content-Type", "application/json")
                .header(TIMESTAMP_HEADER, &timestamp)
                .header(SIGNATURE_HEADER, &signature)
                .body(body.clone())
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    info!(attempt, "Notification webhook delivered");
                    return Ok(());
                }
                Ok(response) => warn!(
                    status = response.status().as_u16(),
                    attempt,
                    max_retries = self.max_retries,
                    "Notification webhook rejected"
                ),
                Err(e) => warn!(
                    error = %e,
                    attempt,
                    max_retries = self.max_retries,
                    "Notification webhook delivery error"
                ),
            }

            // Exponential backoff: base, 2×base, 4×base
            if attempt < self.max_retries {
                tokio::time::sleep(self.backoff_base * 2_u32.pow(attempt - 1)).await;
            }
        }

        error!(attempts = self.max_retries, "Notification webhook delivery failed");
        Err(NotificationError::DeliveryFailed {
            attempts: self.max_retries,
        })
    }
}

/// Picks the webhook sink when configured, the log sink otherwise.
pub fn sink_from_config(
    config: &NotificationConfig,
    currency: &str,
) -> Result<std::sync::Arc<dyn NotificationSink>, NotificationError> {
    match (config.webhook_url.as_deref(), config.webhook_secret.as_deref()) {
        (Some(url), Some(secret)) => {
            info!(url, "Notification webhook sink enabled");
            Ok(std::sync::Arc::new(WebhookNotificationSink::new(
                url, secret, currency,
            )?))
        }
        (Some(_), None) => Err(NotificationError::Configuration(
            "webhook_url requires webhook_secret".into(),
        )),
        _ => Ok(std::sync::Arc::new(LogNotificationSink::new(currency))),
    }
}
