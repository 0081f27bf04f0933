//! Best-effort claims extraction from a signed access token.
//!
//! The engine consumes tokens, it never issues or verifies them; signature
//! checks belong to the authentication layer. Anything malformed — wrong
//! segment count, bad base64, bad JSON, an expired `exp` — degrades to an
//! empty claim set rather than an error.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use clearance_domain::{Claims, DepartmentId, RoleId};

/// Decodes token payloads into transient [`Claims`].
pub struct ClaimsExtractor;

impl ClaimsExtractor {
    /// Decodes the payload segment of a `header.payload.signature` token.
    ///
    /// Never fails: every malformed input yields [`Claims::empty`].
    #[must_use]
    pub fn decode(token: &str) -> Claims {
        Self::try_decode(token).unwrap_or_else(Claims::empty)
    }

    fn try_decode(token: &str) -> Option<Claims> {
        let mut segments = token.split('.');
        let payload = match (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => return None,
        };

        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        let value: Value = serde_json::from_slice(&bytes).ok()?;

        let expires_at = value
            .get("exp")
            .and_then(Value::as_i64)
            .and_then(|timestamp| DateTime::from_timestamp(timestamp, 0));
        if let Some(expiry) = expires_at
            && expiry <= Utc::now()
        {
            return None;
        }

        Some(Claims {
            subject_id: value
                .get("sub")
                .and_then(Value::as_str)
                .map(str::to_owned),
            role_names: string_list(&value, "roles"),
            permission_strings: string_list(&value, "permissions"),
            role_ids: uuid_list(&value, "role_ids")
                .into_iter()
                .map(RoleId::from_uuid)
                .collect(),
            department_id: value
                .get("department_id")
                .and_then(Value::as_str)
                .and_then(|raw| Uuid::parse_str(raw).ok())
                .map(DepartmentId::from_uuid),
            department_name: value
                .get("department_name")
                .and_then(Value::as_str)
                .map(str::to_owned),
            expires_at,
        })
    }
}

/// Extracts an array of strings, skipping non-string entries.
fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Extracts an array of UUID strings, skipping anything unparsable.
fn uuid_list(value: &Value, key: &str) -> Vec<Uuid> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|raw| Uuid::parse_str(raw).ok())
                .collect()
        })
        .unwrap_or_default()
}
