use crate::core::errors::GeminiError;
use base64::engine::general_purpose;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha384;

type HmacSha384 = Hmac<Sha384>;

pub const PAYLOAD_HEADER: &str = "X-GEMINI-PAYLOAD";
pub const SIGNATURE_HEADER: &str = "X-GEMINI-SIGNATURE";
pub const API_KEY_HEADER: &str = "X-GEMINI-APIKEY";

/// Signed request envelope.
///
/// Serializes as `{"request": .., "nonce": .., <params>}` with the key order
/// fixed, so the same logical request always encodes to the same bytes.
#[derive(Debug, Clone, Serialize)]
pub struct Payload<'a, P: Serialize> {
    pub request: &'a str,
    pub nonce: u64,
    #[serde(flatten)]
    pub params: P,
}

impl<'a, P: Serialize> Payload<'a, P> {
    pub fn new(request: &'a str, nonce: u64, params: P) -> Self {
        Self {
            request,
            nonce,
            params,
        }
    }
}

/// The three authentication headers sent on REST calls and the private
/// WebSocket handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    /// Base64 of the JSON payload
    pub payload: String,
    /// Lowercase hex of HMAC-SHA384(secret, payload)
    pub signature: String,
    pub api_key: String,
}

impl AuthHeaders {
    /// Header name/value pairs in wire form
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        vec![
            (PAYLOAD_HEADER.to_string(), self.payload.clone()),
            (SIGNATURE_HEADER.to_string(), self.signature.clone()),
            (API_KEY_HEADER.to_string(), self.api_key.clone()),
        ]
    }
}

impl std::fmt::Debug for AuthHeaders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthHeaders")
            .field("payload", &self.payload)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

/// Serialize a payload to JSON and base64 it.
///
/// This is the only encode step used by both REST and WebSocket signing.
pub fn encode_payload<P: Serialize>(payload: &P) -> Result<String, GeminiError> {
    let json = serde_json::to_vec(payload)?;
    Ok(general_purpose::STANDARD.encode(json))
}

/// Sign an already-encoded payload.
///
/// The secret must be non-empty; callers check credentials before reaching
/// this point.
pub fn sign(api_key: &str, secret: &str, encoded_payload: &str) -> Result<AuthHeaders, GeminiError> {
    let mut mac = HmacSha384::new_from_slice(secret.as_bytes())
        .map_err(|e| GeminiError::Auth(format!("Invalid secret key: {}", e)))?;
    mac.update(encoded_payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(AuthHeaders {
        payload: encoded_payload.to_string(),
        signature,
        api_key: api_key.to_string(),
    })
}

/// Encode then sign
pub fn sign_payload<P: Serialize>(
    api_key: &str,
    secret: &str,
    payload: &P,
) -> Result<AuthHeaders, GeminiError> {
    let encoded = encode_payload(payload)?;
    sign(api_key, secret, &encoded)
}

/// Credential holder producing [`AuthHeaders`] for a given request path.
pub trait Signer: Send + Sync {
    /// Build the envelope for `request` with `nonce`, encode it and sign it.
    fn sign_request<P: Serialize>(
        &self,
        request: &str,
        nonce: u64,
        params: P,
    ) -> Result<AuthHeaders, GeminiError>;
}

/// HMAC-SHA384 signer holding an API key pair
pub struct HmacSigner {
    api_key: String,
    secret_key: String,
}

impl HmacSigner {
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key,
            secret_key,
        }
    }
}

impl Signer for HmacSigner {
    fn sign_request<P: Serialize>(
        &self,
        request: &str,
        nonce: u64,
        params: P,
    ) -> Result<AuthHeaders, GeminiError> {
        sign_payload(
            &self.api_key,
            &self.secret_key,
            &Payload::new(request, nonce, params),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "mykey";
    const SECRET: &str = "1234abcd";
    const ENCODED: &str =
        "eyJyZXF1ZXN0IjoiL3YxL29yZGVyL3N0YXR1cyIsIm5vbmNlIjoxMjM0NTYsIm9yZGVyX2lkIjoxODgzNH0=";
    const SIGNATURE: &str = "51f2d46b8d13add5414bb73d72c1e1e1d3e1f6f8ed411960d860510df3219d0ed3514578d14f18cd1340109bf0c0385b";

    #[derive(Serialize)]
    struct OrderStatus {
        order_id: u64,
    }

    #[test]
    fn test_known_vector_from_encoded_string() {
        let headers = sign(KEY, SECRET, ENCODED).unwrap();
        assert_eq!(headers.payload, ENCODED);
        assert_eq!(headers.signature, SIGNATURE);
        assert_eq!(headers.api_key, KEY);
    }

    #[test]
    fn test_payload_envelope_encodes_in_fixed_key_order() {
        let payload = Payload::new("/v1/order/status", 123_456, OrderStatus { order_id: 18834 });
        assert_eq!(encode_payload(&payload).unwrap(), ENCODED);

        let signer = HmacSigner::new(KEY.to_string(), SECRET.to_string());
        let headers = signer
            .sign_request("/v1/order/status", 123_456, OrderStatus { order_id: 18834 })
            .unwrap();
        assert_eq!(headers.signature, SIGNATURE);
    }

    #[test]
    fn test_signature_is_deterministic() {
        let a = sign(KEY, SECRET, ENCODED).unwrap();
        let b = sign(KEY, SECRET, ENCODED).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_one_byte_change_changes_signature() {
        let mut tampered = ENCODED.to_string();
        tampered.replace_range(0..1, "f");
        let changed_payload = sign(KEY, SECRET, &tampered).unwrap();
        assert_ne!(changed_payload.signature, SIGNATURE);

        let changed_secret = sign(KEY, "1234abce", ENCODED).unwrap();
        assert_ne!(changed_secret.signature, SIGNATURE);
    }

    #[test]
    fn test_signature_is_lowercase_hex_sha384() {
        let headers = sign(KEY, SECRET, ENCODED).unwrap();
        assert_eq!(headers.signature.len(), 96);
        assert!(headers
            .signature
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_header_pairs_and_redacted_debug() {
        let headers = sign(KEY, SECRET, ENCODED).unwrap();
        let pairs = headers.to_pairs();
        assert_eq!(pairs[0], (PAYLOAD_HEADER.to_string(), ENCODED.to_string()));
        assert_eq!(pairs[1], (SIGNATURE_HEADER.to_string(), SIGNATURE.to_string()));
        assert_eq!(pairs[2], (API_KEY_HEADER.to_string(), KEY.to_string()));
        assert!(!format!("{:?}", headers).contains(SIGNATURE));
    }

    #[test]
    fn test_unit_params_add_no_fields() {
        let encoded = encode_payload(&Payload::new("/v1/balances", 7, ())).unwrap();
        let decoded = general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(
            String::from_utf8(decoded).unwrap(),
            r#"{"request":"/v1/balances","nonce":7}"#
        );
    }
}
