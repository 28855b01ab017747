use axum::{extract::State, Json};

use crate::{
    auth::AuthUser,
    handlers::{
        common::{message_response, success_response},
        AppState,
    },
    services::payments::{
        CreatePaymentIntentRequest, PaymentFailureRequest, PaymentFailureResponse,
        PaymentIntentResponse, VerifyPaymentRequest, VerifyPaymentResponse,
    },
    ApiResponse, ApiResult,
};

/// Create a gateway payment intent for an unpaid order
#[utoipa::path(
    post,
    path = "/api/payments/create",
    summary = "Create payment intent",
    request_body = CreatePaymentIntentRequest,
    responses(
        (status = 200, description = "Payment intent created", body = ApiResponse<PaymentIntentResponse>),
        (status = 400, description = "Order already paid or missing order id", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the order owner", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment gateway error", body = crate::errors::ErrorResponse),
        (status = 503, description = "Payment gateway not configured", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "payments"
)]
pub async fn create_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePaymentIntentRequest>,
) -> ApiResult<PaymentIntentResponse> {
    let intent = state.payments.create_intent(&user, payload).await?;
    Ok(success_response(intent))
}

/// Verify the gateway's payment confirmation signature
#[utoipa::path(
    post,
    path = "/api/payments/verify",
    summary = "Verify payment",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified", body = ApiResponse<VerifyPaymentResponse>),
        (status = 400, description = "Verification failed or missing parameters", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the order owner", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Payment status changed concurrently", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "payments"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<VerifyPaymentRequest>,
) -> ApiResult<VerifyPaymentResponse> {
    let verified = state.payments.verify_payment(&user, payload).await?;
    Ok(message_response(verified, "Payment verified successfully"))
}

/// Record a client-side payment failure
#[utoipa::path(
    post,
    path = "/api/payments/failure",
    summary = "Report payment failure",
    request_body = PaymentFailureRequest,
    responses(
        (status = 200, description = "Payment failure recorded", body = ApiResponse<PaymentFailureResponse>),
        (status = 400, description = "Missing order id", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the order owner", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "payments"
)]
pub async fn payment_failure(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PaymentFailureRequest>,
) -> ApiResult<PaymentFailureResponse> {
    let report = state.payments.report_failure(&user, payload).await?;
    Ok(message_response(report, "Payment failure recorded"))
}
