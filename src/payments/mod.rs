//! Payment gateway adapter and confirmation signature scheme.

pub mod gateway;
pub mod signature;

pub use gateway::{
    to_minor_units, CreateIntentRequest, GatewayError, IntentNotes, PaymentGateway, PaymentIntent,
    RazorpayGateway,
};
pub use signature::{HmacSigner, PaymentSignatureVerifier};

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::PaymentConfig;

/// Gateway client plus verifier, built once at startup.
#[derive(Clone)]
pub struct PaymentProvider {
    pub gateway: Arc<dyn PaymentGateway>,
    pub verifier: PaymentSignatureVerifier,
}

impl PaymentProvider {
    pub fn new(gateway: Arc<dyn PaymentGateway>, verifier: PaymentSignatureVerifier) -> Self {
        Self { gateway, verifier }
    }

    /// Returns `None` when credentials are missing; payment endpoints then
    /// answer `503`.
    pub fn from_config(config: &PaymentConfig) -> Result<Option<Self>, anyhow::Error> {
        let Some((key_id, key_secret)) = config.credentials() else {
            warn!("Payment gateway credentials not configured; payment endpoints are disabled");
            return Ok(None);
        };

        let gateway = RazorpayGateway::new(
            &config.gateway_base_url,
            key_id,
            key_secret,
            Duration::from_secs(config.timeout_secs),
        )?;
        let verifier = PaymentSignatureVerifier::new(key_secret)
            .map_err(|e| anyhow::anyhow!("invalid payment key secret: {}", e))?;

        info!(base_url = %config.gateway_base_url, "Payment gateway client initialized");
        Ok(Some(Self::new(Arc::new(gateway), verifier)))
    }
}
