//! `x-signature` verification for payment webhooks

use crate::error::{BotError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signed manifest: `id:{data.id};request-id:{x-request-id};ts:{ts};`
/// with the request-id part omitted when the header is absent.
pub(crate) fn manifest(data_id: &str, request_id: Option<&str>, ts: &str) -> String {
    let mut manifest = format!("id:{};", data_id.to_lowercase());
    if let Some(request_id) = request_id.filter(|r| !r.is_empty()) {
        manifest.push_str(&format!("request-id:{};", request_id));
    }
    manifest.push_str(&format!("ts:{};", ts));
    manifest
}

/// Check an `x-signature` header of the form `ts=<ts>,v1=<hex hmac>`
pub fn verify_signature(
    secret: &str,
    header: &str,
    request_id: Option<&str>,
    data_id: &str,
) -> Result<()> {
    let mut ts = None;
    let mut v1 = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("ts", value)) => ts = Some(value.trim()),
            Some(("v1", value)) => v1 = Some(value.trim()),
            _ => {}
        }
    }

    let ts = ts.ok_or_else(|| BotError::Signature("missing ts".to_string()))?;
    let v1 = v1.ok_or_else(|| BotError::Signature("missing v1".to_string()))?;
    let expected = hex::decode(v1)
        .map_err(|e| BotError::Signature(format!("v1 is not hex: {}", e)))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| BotError::Signature(format!("HMAC init failed: {}", e)))?;
    mac.update(manifest(data_id, request_id, ts).as_bytes());

    mac.verify_slice(&expected)
        .map_err(|_| BotError::Signature("digest mismatch".to_string()))
}

#[cfg(test)]
pub(crate) fn sign(secret: &str, data_id: &str, request_id: Option<&str>, ts: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(manifest(data_id, request_id, ts).as_bytes());
    format!("ts={},v1={}", ts, hex::encode(mac.finalize().into_bytes()))
}
