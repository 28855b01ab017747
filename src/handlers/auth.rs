use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::{AuthResponse, AuthUser, LoginRequest, SignupRequest, UserResponse},
    errors::ServiceError,
    handlers::{
        common::{created_response, success_response},
        AppState,
    },
    ApiResponse, ApiResult,
};

/// Register a new customer account
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    summary = "Sign up",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Invalid input or email already registered", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), ServiceError> {
    let response = state.auth.signup(payload).await?;
    Ok(created_response(response))
}

/// Exchange email and password for a bearer token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    summary = "Log in",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let response = state.auth.login(payload).await?;
    Ok(success_response(response))
}

/// Current principal
#[utoipa::path(
    get,
    path = "/api/auth/me",
    summary = "Current user",
    responses(
        (status = 200, description = "Authenticated user", body = ApiResponse<UserResponse>),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "auth"
)]
pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<UserResponse> {
    let profile = state.auth.current_user(&user).await?;
    Ok(success_response(profile))
}
