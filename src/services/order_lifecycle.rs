//! Order lifecycle rules.
//!
//! An order moves along two independent tracks:
//!
//! * **fulfillment** (`placed → preparing → dispatched → delivered`), driven by
//!   administrators;
//! * **payment** (`pending → paid | failed`), driven by the payment gateway
//!   round trip and by client failure reports.
//!
//! This module only decides whether a move is legal and what the next state
//! is. Persisting the move (with compare-and-swap on the payment track) is the
//! job of [`crate::repositories::order_repository::OrderRepository`].

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::entities::order::{OrderStatus, PaymentStatus};
use crate::errors::ServiceError;

/// How administrators may move the fulfillment track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentPolicy {
    /// Any of the four states may be set from any state.
    #[default]
    Permissive,
    /// Only forward moves (or re-setting the current state) are accepted.
    Monotonic,
}

pub const FULFILLMENT_STATES: [OrderStatus; 4] = [
    OrderStatus::Placed,
    OrderStatus::Preparing,
    OrderStatus::Dispatched,
    OrderStatus::Delivered,
];

impl OrderStatus {
    fn rank(self) -> u8 {
        match self {
            OrderStatus::Placed => 0,
            OrderStatus::Preparing => 1,
            OrderStatus::Dispatched => 2,
            OrderStatus::Delivered => 3,
        }
    }

    /// Parses an administrator-supplied target state.
    pub fn parse_target(raw: &str) -> Result<Self, ServiceError> {
        OrderStatus::from_str(raw.trim()).map_err(|_| {
            ServiceError::ValidationError(format!(
                "Invalid order status '{}'. Valid statuses are: placed, preparing, dispatched, delivered",
                raw
            ))
        })
    }
}

/// Validates an administrative fulfillment move under `policy`.
pub fn check_fulfillment_transition(
    policy: FulfillmentPolicy,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<(), ServiceError> {
    match policy {
        FulfillmentPolicy::Permissive => Ok(()),
        FulfillmentPolicy::Monotonic if is_forward_transition(from, to) => Ok(()),
        FulfillmentPolicy::Monotonic => Err(ServiceError::Conflict(format!(
            "Cannot move order from '{}' back to '{}'",
            from, to
        ))),
    }
}

// Skipping ahead (placed → dispatched) counts as forward.
fn is_forward_transition(from: OrderStatus, to: OrderStatus) -> bool {
    to.rank() >= from.rank()
}

/// A new payment intent may be issued for any order that is not yet paid.
pub fn ensure_payment_intent_allowed(current: PaymentStatus) -> Result<(), ServiceError> {
    if current == PaymentStatus::Paid {
        return Err(ServiceError::Conflict("Order is already paid".to_string()));
    }
    Ok(())
}

/// Result of checking a gateway confirmation signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    SignatureMismatch,
}

impl VerificationOutcome {
    /// Payment status the order must end up in.
    pub fn next_payment_status(self) -> PaymentStatus {
        match self {
            VerificationOutcome::Verified => PaymentStatus::Paid,
            VerificationOutcome::SignatureMismatch => PaymentStatus::Failed,
        }
    }
}

/// A client-reported failure always lands in `failed`, whatever the prior state.
pub fn payment_status_after_failure_report(_current: PaymentStatus) -> PaymentStatus {
    PaymentStatus::Failed
}
