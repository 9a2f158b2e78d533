//! Webhook HMAC signing.
//!
//! Each household owns a hex-encoded secret. Outbound webhook bodies are
//! signed with HMAC-SHA256 over the exact bytes sent, and the hex digest is
//! carried in [`SIGNATURE_HEADER`].

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::CoreError;

/// Header carrying the hex-encoded HMAC-SHA256 of the request body.
pub const SIGNATURE_HEADER: &str = "X-Dinner-Done-Better-Signature";

type HmacSha256 = Hmac<Sha256>;

/// Decode a household's hex-encoded webhook secret.
pub fn decode_secret(hex_secret: &str) -> Result<Vec<u8>, CoreError> {
    hex::decode(hex_secret.trim()).map_err(|e| CoreError::InvalidSecret(e.to_string()))
}

/// Compute `hex(HMAC-SHA256(secret, body))`.
pub fn sign_payload(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Check a received signature in constant time.
pub fn verify_signature(secret: &[u8], body: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc4231_case_two() {
        // Key "Jefe", data "what do ya want for nothing?"
        let sig = sign_payload(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn signature_verifies_and_detects_tampering() {
        let secret = decode_secret("deadbeef").unwrap();
        let sig = sign_payload(&secret, br#"{"event_type":"recipe.created"}"#);
        assert!(verify_signature(&secret, br#"{"event_type":"recipe.created"}"#, &sig));
        assert!(!verify_signature(&secret, br#"{"event_type":"recipe.updated"}"#, &sig));
        assert!(!verify_signature(&secret, b"anything", "not-hex"));
    }

    #[test]
    fn malformed_secret_is_rejected() {
        assert!(decode_secret("zz-not-hex").is_err());
        assert!(decode_secret("abc").is_err(), "odd length");
    }

    #[test]
    fn decode_trims_whitespace() {
        assert_eq!(decode_secret(" 00ff \n").unwrap(), vec![0x00, 0xff]);
    }
}
