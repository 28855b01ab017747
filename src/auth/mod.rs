/*!
 * # Authentication Module
 *
 * Password accounts and bearer tokens for the storefront API.
 *
 * - Signup and login with argon2-hashed passwords
 * - HS256 JWTs carrying the user's id, name, email and role
 * - An [`AuthUser`] extractor that authenticates `Authorization: Bearer` requests
 *
 * Authorization decisions (owner-or-admin, admin-only) live in [`rbac`].
 */

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::config::AppConfig;
use crate::errors::ServiceError;

pub mod rbac;
pub mod user;

pub use rbac::{ensure_admin, ensure_owner, ensure_owner_or_admin};
use user::{ActiveModel as UserActiveModel, Entity as UserEntity, Model as UserModel, UserRole};

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,           // Subject (user ID)
    pub name: Option<String>,  // User's name
    pub email: Option<String>, // User's email
    pub roles: Vec<String>,    // User's roles
    pub jti: String,           // JWT ID
    pub iat: i64,              // Issued at time
    pub exp: i64,              // Expiration time
    pub nbf: i64,              // Not valid before time
    pub iss: String,           // Issuer
    pub aud: String,           // Audience
}

/// Authenticated principal extracted from the bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: UserRole,
    #[serde(skip)]
    pub token_id: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let role = if claims.roles.iter().any(|r| r == "admin") {
            UserRole::Admin
        } else {
            UserRole::User
        };
        Ok(Self {
            user_id,
            name: claims.name,
            email: claims.email,
            role,
            token_id: claims.jti,
        })
    }
}

/// Token settings
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub token_expiration: std::time::Duration,
}

impl AuthConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            jwt_audience: config.auth_audience.clone(),
            jwt_issuer: config.auth_issuer.clone(),
            token_expiration: std::time::Duration::from_secs(config.jwt_expiration as u64),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, max = 128, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl From<UserModel> for UserResponse {
    fn from(user: UserModel) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

/// Issues and validates tokens; owns password accounts.
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Creates a regular user account and returns a token for it.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn signup(&self, request: SignupRequest) -> Result<AuthResponse, ServiceError> {
        request.validate()?;
        let user = self
            .create_user(&request.name, &request.email, &request.password, UserRole::User)
            .await?;
        info!(user_id = %user.id, "User registered");
        self.respond_with_token(user)
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, ServiceError> {
        request.validate()?;
        let user = self
            .find_by_email(&request.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&request.password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        debug!(user_id = %user.id, "Login succeeded");
        self.respond_with_token(user)
    }

    /// Loads the account behind an authenticated principal.
    pub async fn current_user(&self, principal: &AuthUser) -> Result<UserResponse, ServiceError> {
        UserEntity::find_by_id(principal.user_id)
            .one(&*self.db)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, ServiceError> {
        Ok(UserEntity::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(&*self.db)
            .await?)
    }

    /// Inserts an account with a freshly hashed password. Emails are unique
    /// case-insensitively.
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> Result<UserModel, ServiceError> {
        if self.find_by_email(email).await?.is_some() {
            return Err(ServiceError::Conflict(
                "User already exists with this email".to_string(),
            ));
        }

        let now = Utc::now();
        let user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.trim().to_string()),
            email: Set(normalize_email(email)),
            password_hash: Set(hash_password(password)?),
            role: Set(role),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(user.insert(&*self.db).await?)
    }

    fn respond_with_token(&self, user: UserModel) -> Result<AuthResponse, ServiceError> {
        let token = self.generate_token(&user)?;
        Ok(AuthResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.token_expiration.as_secs() as i64,
            user: user.into(),
        })
    }

    /// Generate a JWT token for a user
    pub fn generate_token(&self, user: &UserModel) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.token_expiration)
                .map_err(|_| AuthError::TokenCreation("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            name: Some(user.name.clone()),
            email: Some(user.email.clone()),
            roles: vec![user.role.to_string()],
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);
        validation.validate_nbf = true;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::HashError(e.to_string()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, ServiceError> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| ServiceError::HashError(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenCreation(msg) => ServiceError::InternalError(msg),
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message) = match &self {
            Self::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING_TOKEN",
                "No authentication token provided",
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_CREDENTIALS",
                "Invalid credentials",
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token",
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired",
            ),
            Self::TokenCreation(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
                "Could not issue token",
            ),
        };

        let body = Json(serde_json::json!({
            "error": error_code,
            "message": error_message,
            "request_id": crate::tracing::current_request_id().map(|id| id.to_string()),
            "timestamp": Utc::now(),
        }));

        (status, body).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_service = Arc::<AuthService>::from_ref(state);

        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::InvalidToken)?;

        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = auth_service.validate_token(token)?;
        AuthUser::try_from(claims)
    }
}
