// ABOUTME: Signature verification and payload types of the account-sync webhook
// ABOUTME: HMAC-SHA256 over "{id}.{timestamp}.{body}" with a base64 secret, svix header format

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use prdsmith_storage::AccountUpsert;
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const ID_HEADER: &str = "svix-id";
pub const TIMESTAMP_HEADER: &str = "svix-timestamp";
pub const SIGNATURE_HEADER: &str = "svix-signature";

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

/// Deliveries signed further than this from the current time are replays or clock errors
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("Missing webhook signature headers")]
    MissingHeaders,

    #[error("Webhook secret is not valid base64")]
    InvalidSecret,

    #[error("Webhook signature mismatch")]
    InvalidSignature,

    #[error("Webhook timestamp is invalid or outside the allowed window")]
    InvalidTimestamp,
}

/// Headers identifying and signing one delivery
#[derive(Debug, Clone, Copy)]
pub struct SignedDelivery<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    /// Space-separated `v1,<base64>` entries
    pub signatures: &'a str,
}

fn secret_bytes(secret: &str) -> Result<Vec<u8>, WebhookError> {
    let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
    STANDARD
        .decode(encoded)
        .map_err(|_| WebhookError::InvalidSecret)
}

fn signing_mac(secret: &str, delivery: &SignedDelivery<'_>, body: &[u8]) -> Result<HmacSha256, WebhookError> {
    let key = secret_bytes(secret)?;
    let mut mac = HmacSha256::new_from_slice(&key).map_err(|_| WebhookError::InvalidSecret)?;
    mac.update(delivery.id.as_bytes());
    mac.update(b".");
    mac.update(delivery.timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(mac)
}

/// Accept the delivery when any `v1` signature in the header matches and
/// it was signed within the tolerance window of now
pub fn verify(secret: &str, delivery: &SignedDelivery<'_>, body: &[u8]) -> Result<(), WebhookError> {
    verify_at(secret, delivery, body, Utc::now().timestamp())
}

/// `verify` against an explicit current time in unix seconds
pub fn verify_at(
    secret: &str,
    delivery: &SignedDelivery<'_>,
    body: &[u8],
    now: i64,
) -> Result<(), WebhookError> {
    if delivery.id.is_empty() || delivery.timestamp.is_empty() || delivery.signatures.is_empty() {
        return Err(WebhookError::MissingHeaders);
    }

    let signed_at: i64 = delivery
        .timestamp
        .trim()
        .parse()
        .map_err(|_| WebhookError::InvalidTimestamp)?;
    if (now - signed_at).abs() > TIMESTAMP_TOLERANCE_SECS {
        return Err(WebhookError::InvalidTimestamp);
    }

    let mac = signing_mac(secret, delivery, body)?;
    let matched = delivery
        .signatures
        .split_whitespace()
        .filter_map(|entry| entry.split_once(','))
        .filter(|(version, _)| *version == SIGNATURE_VERSION)
        .filter_map(|(_, signature)| STANDARD.decode(signature).ok())
        .any(|expected| mac.clone().verify_slice(&expected).is_ok());

    if matched {
        Ok(())
    } else {
        Err(WebhookError::InvalidSignature)
    }
}

/// Produce the `v1,<base64>` header entry for a delivery
pub fn sign(secret: &str, delivery_id: &str, timestamp: &str, body: &[u8]) -> Result<String, WebhookError> {
    let delivery = SignedDelivery {
        id: delivery_id,
        timestamp,
        signatures: "",
    };
    let signature = signing_mac(secret, &delivery, body)?.finalize().into_bytes();
    Ok(format!("{},{}", SIGNATURE_VERSION, STANDARD.encode(signature)))
}

#[derive(Debug, Deserialize)]
pub struct AccountEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: AccountEventData,
}

#[derive(Debug, Deserialize)]
pub struct AccountEventData {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailAddress {
    pub email_address: String,
}

impl AccountEventData {
    /// First email address, and first and last name joined; no name when both are blank
    pub fn to_upsert(&self) -> AccountUpsert {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        AccountUpsert {
            external_id: self.id.clone(),
            email: self
                .email_addresses
                .first()
                .map(|address| address.email_address.clone())
                .unwrap_or_default(),
            name: if name.is_empty() { None } else { Some(name) },
        }
    }
}
