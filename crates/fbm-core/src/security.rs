//! Webhook authenticity checks.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use tracing::warn;

use crate::{Error, Result};

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_256_HEADER: &str = "X-Hub-Signature-256";
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature";
pub const SUBSCRIBE_MODE: &str = "subscribe";

/// Header a signature value is delivered in, judged by its algorithm prefix.
pub fn signature_header_name(value: &str) -> &'static str {
    if value.trim().starts_with("sha1=") {
        SIGNATURE_HEADER
    } else {
        SIGNATURE_256_HEADER
    }
}

/// Check a `sha256=<hex>` or `sha1=<hex>` header value against the raw body.
///
/// The digest comparison is constant time.
pub fn verify_signature(app_secret: &str, body: &[u8], header: &str) -> Result<()> {
    let header = header.trim();
    let ok = if let Some(hex_sig) = header.strip_prefix("sha256=") {
        let provided = decode_hex(hex_sig)?;
        let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
            .map_err(|e| Error::Security(format!("invalid app secret: {e}")))?;
        mac.update(body);
        mac.verify_slice(&provided).is_ok()
    } else if let Some(hex_sig) = header.strip_prefix("sha1=") {
        let provided = decode_hex(hex_sig)?;
        let mut mac = HmacSha1::new_from_slice(app_secret.as_bytes())
            .map_err(|e| Error::Security(format!("invalid app secret: {e}")))?;
        mac.update(body);
        mac.verify_slice(&provided).is_ok()
    } else {
        return Err(Error::Security(
            "signature header must start with sha256= or sha1=".to_string(),
        ));
    };

    if ok {
        Ok(())
    } else {
        warn!(body_len = body.len(), "webhook signature mismatch");
        Err(Error::Security("signature mismatch".to_string()))
    }
}

/// Answer the platform's `hub.mode` / `hub.verify_token` / `hub.challenge`
/// handshake. Returns the challenge to echo back, or `None` to refuse.
pub fn verify_subscription<'a>(
    mode: &str,
    token: &str,
    challenge: &'a str,
    expected_token: &str,
) -> Option<&'a str> {
    if mode == SUBSCRIBE_MODE && !expected_token.is_empty() && token == expected_token {
        Some(challenge)
    } else {
        None
    }
}

/// Hex digest as the platform sends it, for tests and replay tooling.
pub fn sign_sha256(app_secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .map_err(|e| Error::Security(format!("invalid app secret: {e}")))?;
    mac.update(body);
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

fn decode_hex(value: &str) -> Result<Vec<u8>> {
    hex::decode(value).map_err(|e| Error::Security(format!("invalid signature hex: {e}")))
}
