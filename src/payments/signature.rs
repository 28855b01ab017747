use hmac::{digest::InvalidLength, Hmac, Mac};
use sha2::Sha256;
use std::fmt;

use crate::services::order_lifecycle::VerificationOutcome;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 keyed once, reused for every signature.
#[derive(Clone)]
pub struct HmacSigner {
    mac: HmacSha256,
}

impl fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HmacSigner(..)")
    }
}

impl HmacSigner {
    pub fn new(secret: &[u8]) -> Result<Self, InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(secret)?,
        })
    }

    /// Lower-case hex digest of `message`.
    pub fn sign_hex(&self, message: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(message);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time comparison against a hex signature. Malformed hex is a mismatch.
    pub fn verify_hex(&self, message: &[u8], signature_hex: &str) -> bool {
        let Ok(provided) = hex::decode(signature_hex.trim()) else {
            return false;
        };
        let mut mac = self.mac.clone();
        mac.update(message);
        mac.verify_slice(&provided).is_ok()
    }
}

/// Checks gateway payment confirmations.
///
/// The gateway signs `"{gateway_order_id}|{payment_id}"` with the merchant
/// key secret and sends the hex digest back through the client.
#[derive(Clone, Debug)]
pub struct PaymentSignatureVerifier {
    signer: HmacSigner,
}

impl PaymentSignatureVerifier {
    pub fn new(key_secret: &str) -> Result<Self, InvalidLength> {
        Ok(Self {
            signer: HmacSigner::new(key_secret.as_bytes())?,
        })
    }

    fn signed_payload(gateway_order_id: &str, payment_id: &str) -> String {
        format!("{}|{}", gateway_order_id, payment_id)
    }

    pub fn expected_signature(&self, gateway_order_id: &str, payment_id: &str) -> String {
        self.signer
            .sign_hex(Self::signed_payload(gateway_order_id, payment_id).as_bytes())
    }

    pub fn verify(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> VerificationOutcome {
        let payload = Self::signed_payload(gateway_order_id, payment_id);
        if self.signer.verify_hex(payload.as_bytes(), signature) {
            VerificationOutcome::Verified
        } else {
            VerificationOutcome::SignatureMismatch
        }
    }
}
