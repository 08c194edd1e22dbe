use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use crate::errors::ManagerError;

pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

/// One year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id as a decimal string.
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, ManagerError> {
        self.sub.parse()
            .map_err(|_| ManagerError::Authentication("Invalid token subject".into()))
    }
}

/// Signs and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_minutes: i64) -> Result<Self, ManagerError> {
        if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&ttl_minutes) {
            return Err(ManagerError::Config(format!(
                "Token lifetime must be between 1 and {} minutes, got {}",
                MAX_TOKEN_TTL_MINUTES, ttl_minutes
            )));
        }
        let ttl = Duration::try_minutes(ttl_minutes)
            .ok_or_else(|| ManagerError::Config(format!("Token lifetime out of range: {}", ttl_minutes)))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: i64) -> Result<String, ManagerError> {
        let now = Utc::now().timestamp();
        self.encode(&Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.ttl.num_seconds(),
        })
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, ManagerError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| ManagerError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Validates signature, algorithm and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, ManagerError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => ManagerError::Authentication("Token has expired".into()),
                _ => ManagerError::Authentication("Could not validate credentials".into()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_encoding::BASE64URL_NOPAD;

    fn keys() -> TokenKeys {
        TokenKeys::new("0123456789abcdef-test-secret", DEFAULT_TOKEN_TTL_MINUTES).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let token = keys().issue(42).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let claims = keys().verify(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = keys().issue(1).unwrap();
        let other = TokenKeys::new("another-secret-of-some-length", 30).unwrap();
        assert!(matches!(other.verify(&token), Err(ManagerError::Authentication(_))));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let token = keys().issue(1).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged = BASE64URL_NOPAD.encode(br#"{"sub":"2","exp":99999999999,"iat":0}"#);
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);
        assert!(keys().verify(&tampered).is_err());
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let claims = Claims { sub: "1".into(), iat: 0, exp: Utc::now().timestamp() + 600 };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"0123456789abcdef-test-secret"),
        )
        .unwrap();
        assert!(keys().verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let now = Utc::now().timestamp();
        let token = keys().encode(&Claims { sub: "1".into(), iat: now - 120, exp: now - 60 }).unwrap();
        match keys().verify(&token) {
            Err(ManagerError::Authentication(msg)) => assert!(msg.contains("expired")),
            other => panic!("expected expiry error, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_rejected() {
        for token in ["", "abc", "a.b", "a.b.c", "...."] {
            assert!(keys().verify(token).is_err(), "{:?} should be rejected", token);
        }
    }

    #[test]
    fn test_non_numeric_subject() {
        let claims = Claims { sub: "alice".into(), exp: 0, iat: 0 };
        assert!(claims.user_id().is_err());
    }

    #[test]
    fn test_out_of_range_lifetime_is_config_error() {
        for ttl in [0, -5, MAX_TOKEN_TTL_MINUTES + 1, i64::MAX] {
            assert!(
                matches!(TokenKeys::new("0123456789abcdef-test-secret", ttl), Err(ManagerError::Config(_))),
                "{} should be rejected",
                ttl
            );
        }
        assert!(TokenKeys::new("0123456789abcdef-test-secret", MAX_TOKEN_TTL_MINUTES).is_ok());
    }
}
