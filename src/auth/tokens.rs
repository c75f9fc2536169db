// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token issuer.
//!
//! Tokens are HS256 JWTs signed with the process-wide `JWT_SECRET`. The
//! absolute expiry lives inside the signed payload, so [`TokenIssuer::verify`]
//! needs no external state to reject an expired token.
//!
//! No clock-skew leeway: a token stops verifying the
//! second after its `exp`.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use super::{claims::TokenClaims, AuthenticatedUser, Role};

/// Token issue/verification failure.
///
/// Every verification failure is reported to clients identically; the
/// variants only exist so logs can tell them apart.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token is malformed or its signature is invalid")]
    Invalid,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Identity encoded into a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub subject: String,
    pub role: Role,
    pub email: String,
}

/// A freshly minted token together with its validity window.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Mints and verifies signed, time-limited bearer tokens.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer for the given symmetric secret and token lifetime.
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Issue a token valid from now for the configured lifetime.
    pub fn issue(&self, subject: &TokenSubject) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject, Utc::now())
    }

    /// Issue a token as if minted at `issued_at`.
    pub fn issue_at(
        &self,
        subject: &TokenSubject,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Signing("token expiry out of range".into()))?;
        let claims = TokenClaims {
            sub: subject.subject.clone(),
            role: subject.role,
            email: subject.email.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            token,
            issued_at,
            expires_at,
        })
    }

    /// Verify signature and expiry, returning the encoded identity.
    ///
    /// Fails closed: anything other than a well-formed, correctly signed,
    /// unexpired token is an error.
    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            },
        )?;

        Ok(AuthenticatedUser::from_claims(data.claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(b"test-secret-for-unit-tests", Duration::hours(2))
    }

    fn alice() -> TokenSubject {
        TokenSubject {
            subject: "u-1".to_string(),
            role: Role::Client,
            email: "alice@x.com".to_string(),
        }
    }

    #[test]
    fn issued_token_verifies_to_original_identity() {
        let issuer = issuer();
        let issued = issuer.issue(&alice()).unwrap();

        let user = issuer.verify(&issued.token).unwrap();
        assert_eq!(user.user_id, "u-1");
        assert_eq!(user.role, Role::Client);
        assert_eq!(user.email, "alice@x.com");
        assert_eq!(user.expires_at, issued.expires_at.timestamp());
        assert_eq!(issued.expires_at - issued.issued_at, Duration::hours(2));
    }

    #[test]
    fn out_of_range_lifetime_fails_instead_of_panicking() {
        let issuer = TokenIssuer::new(b"test-secret", Duration::MAX);
        assert!(matches!(
            issuer.issue(&alice()),
            Err(TokenError::Signing(_))
        ));
    }

    #[test]
    fn two_tokens_for_same_subject_differ() {
        let issuer = issuer();
        let a = issuer.issue(&alice()).unwrap();
        let b = issuer.issue(&alice()).unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn expired_token_is_rejected_without_grace() {
        let issuer = issuer();
        let issued_at = Utc::now() - Duration::hours(2) - Duration::seconds(1);
        let issued = issuer.issue_at(&alice(), issued_at).unwrap();

        assert!(matches!(
            issuer.verify(&issued.token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = TokenIssuer::new(b"another-secret", Duration::hours(2));
        let issued = other.issue(&alice()).unwrap();

        assert!(matches!(
            issuer().verify(&issued.token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        let issuer = issuer();
        let issued = issuer.issue(&alice()).unwrap();
        let parts: Vec<&str> = issued.token.split('.').collect();

        let payload = URL_SAFE_NO_PAD.decode(parts[1]).unwrap();
        let forged = String::from_utf8(payload)
            .unwrap()
            .replace(r#""role":"client""#, r#""role":"admin""#);
        let forged_token = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(forged.as_bytes()),
            parts[2]
        );

        assert!(matches!(
            issuer.verify(&forged_token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn garbage_and_unsigned_tokens_are_rejected() {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        let issuer = issuer();
        assert!(issuer.verify("").is_err());
        assert!(issuer.verify("not-a-jwt").is_err());

        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(
            r#"{"sub":"u-1","role":"admin","email":"a@x.com","iat":1,"exp":9999999999,"jti":"x"}"#,
        );
        assert!(issuer.verify(&format!("{header}.{claims}.")).is_err());
    }
}
