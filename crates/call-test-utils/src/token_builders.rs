//! Deterministic keypairs and token builders for auth tests.
//!
//! `TestKeypair` produces session-shaped JWTs signed with a key derived
//! from a numeric seed, including deliberately broken variants for
//! exercising the validation paths: expired, future-iat, tampered,
//! wrong-algorithm, and oversized tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims shape of a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestClaims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl TestClaims {
    /// Claims for a user, valid for one hour from now.
    pub fn for_user(user_id: Uuid, email: &str) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + 3600,
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// Test keypair for signing session tokens.
pub struct TestKeypair {
    public_key_bytes: Vec<u8>,
    private_key_pkcs8: Vec<u8>,
}

impl TestKeypair {
    /// Create a deterministic keypair from a numeric seed.
    pub fn new(seed: u8) -> Self {
        let mut seed_bytes = [0u8; 32];
        seed_bytes[0] = seed;
        for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
            *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
        }

        let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
            .expect("Failed to create test keypair");

        let public_key_bytes = key_pair.public_key().as_ref().to_vec();
        let private_key_pkcs8 = build_pkcs8_from_seed(&seed_bytes, &public_key_bytes);

        Self {
            public_key_bytes,
            private_key_pkcs8,
        }
    }

    /// The PKCS#8 document for this keypair, as the server config
    /// expects it.
    pub fn pkcs8_der(&self) -> &[u8] {
        &self.private_key_pkcs8
    }

    /// Sign a token with the given claims.
    pub fn sign_token(&self, claims: &TestClaims) -> String {
        let encoding_key = EncodingKey::from_ed_der(&self.private_key_pkcs8);
        let mut header = Header::new(Algorithm::EdDSA);
        header.typ = Some("JWT".to_string());

        encode(&header, claims, &encoding_key).expect("Failed to sign token")
    }

    /// Create a token that expired `expired_seconds_ago` seconds ago.
    pub fn create_expired_token(&self, user_id: Uuid, expired_seconds_ago: i64) -> String {
        let now = Utc::now().timestamp();
        let exp = now - expired_seconds_ago;
        let claims = TestClaims {
            sub: user_id.to_string(),
            email: "expired@example.com".to_string(),
            iat: exp - 3600,
            exp,
            jti: Uuid::new_v4().to_string(),
        };
        self.sign_token(&claims)
    }

    /// Create a token issued far in the future (beyond any clock skew).
    pub fn create_future_iat_token(&self, user_id: Uuid) -> String {
        let now = Utc::now().timestamp();
        let claims = TestClaims {
            sub: user_id.to_string(),
            email: "future@example.com".to_string(),
            iat: now + 3600,
            exp: now + 7200,
            jti: Uuid::new_v4().to_string(),
        };
        self.sign_token(&claims)
    }

    /// Create a token with HS256 algorithm (algorithm confusion attack).
    ///
    /// Uses the public key as the HMAC secret, which is the classic
    /// RS/EdDSA-to-HS downgrade vector.
    pub fn create_hs256_token(&self, claims: &TestClaims) -> String {
        let encoding_key = EncodingKey::from_secret(&self.public_key_bytes);
        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());

        encode(&header, claims, &encoding_key).expect("Failed to sign HS256 token")
    }

    /// Create a token signed with a different (unknown) key.
    pub fn create_token_with_wrong_key(&self, claims: &TestClaims) -> String {
        let wrong_keypair = TestKeypair::new(99);
        wrong_keypair.sign_token(claims)
    }

    /// Create a tampered token (modify payload after signing).
    pub fn create_tampered_token(&self, claims: &TestClaims) -> String {
        let valid_token = self.sign_token(claims);

        let parts: Vec<&str> = valid_token.split('.').collect();
        let header = parts.first().expect("JWT missing header");
        let signature = parts.get(2).expect("JWT missing signature");

        // Swap the subject for a different user
        let mut modified_claims = claims.clone();
        modified_claims.sub = Uuid::new_v4().to_string();

        let modified_payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_string(&modified_claims).unwrap().as_bytes());

        // Reassemble with the original signature (which no longer matches)
        format!("{}.{}.{}", header, modified_payload, signature)
    }

    /// Create a token larger than the server's size cap.
    pub fn create_oversized_token(&self, user_id: Uuid) -> String {
        let now = Utc::now().timestamp();
        let claims = TestClaims {
            sub: user_id.to_string(),
            // Padding pushes the encoded token past 8KB
            email: format!("{}@example.com", "x".repeat(9000)),
            iat: now,
            exp: now + 3600,
            jti: Uuid::new_v4().to_string(),
        };
        self.sign_token(&claims)
    }
}

/// Build a PKCS#8 v2 document (RFC 5958) from an Ed25519 seed and its
/// public key.
///
/// Version 2 carries the public key in the [1] attribute; ring's
/// `Ed25519KeyPair::from_pkcs8` rejects v1 documents, and the harness
/// feeds this document to the server's session-key constructor.
fn build_pkcs8_from_seed(seed: &[u8; 32], public_key: &[u8]) -> Vec<u8> {
    let mut pkcs8 = Vec::new();

    // Outer SEQUENCE tag
    pkcs8.push(0x30);
    pkcs8.push(0x51); // Length: 81 bytes

    // Version: INTEGER 1 (v2)
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x01]);

    // Algorithm Identifier: SEQUENCE
    pkcs8.push(0x30);
    pkcs8.push(0x05); // Length: 5 bytes
                      // OID for Ed25519: 1.3.101.112
    pkcs8.extend_from_slice(&[0x06, 0x03, 0x2b, 0x65, 0x70]);

    // Private Key: OCTET STRING
    pkcs8.push(0x04);
    pkcs8.push(0x22); // Length: 34 bytes
                      // Inner OCTET STRING with seed
    pkcs8.push(0x04);
    pkcs8.push(0x20); // Length: 32 bytes
    pkcs8.extend_from_slice(seed);

    // Public Key: [1] IMPLICIT BIT STRING
    pkcs8.push(0x81);
    pkcs8.push(0x21); // Length: 33 bytes (unused-bits byte + key)
    pkcs8.push(0x00);
    pkcs8.extend_from_slice(public_key);

    pkcs8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_is_deterministic() {
        let a = TestKeypair::new(1);
        let b = TestKeypair::new(1);
        assert_eq!(a.pkcs8_der(), b.pkcs8_der());

        let c = TestKeypair::new(2);
        assert_ne!(a.pkcs8_der(), c.pkcs8_der());
    }

    #[test]
    fn test_pkcs8_document_is_valid() {
        let keypair = TestKeypair::new(7);
        Ed25519KeyPair::from_pkcs8(keypair.pkcs8_der()).expect("PKCS#8 should parse");
    }

    #[test]
    fn test_pkcs8_document_accepted_by_session_keys() {
        // The server harness hands this document to the real
        // session-key constructor, which insists on PKCS#8 v2.
        let keypair = TestKeypair::new(1);
        assert!(call_service::auth::SessionKeys::new(keypair.pkcs8_der(), 300).is_ok());
    }

    #[test]
    fn test_sign_token_produces_jwt_shape() {
        let keypair = TestKeypair::new(1);
        let claims = TestClaims::for_user(Uuid::new_v4(), "alice@example.com");
        let token = keypair.sign_token(&claims);
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_oversized_token_exceeds_cap() {
        let keypair = TestKeypair::new(1);
        let token = keypair.create_oversized_token(Uuid::new_v4());
        assert!(token.len() > 8192);
    }
}
