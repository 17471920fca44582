//! JWT token service implementation.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kadha_core::ports::{AuthError, TokenClaims, TokenService};

/// Longest accepted token lifetime (one hundred years).
pub const MAX_EXPIRATION_HOURS: i64 = 24 * 365 * 100;

/// JWT token service configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Token lifetime; `None` issues tokens without an `exp` claim.
    pub expiration_hours: Option<i64>,
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            expiration_hours: None,
            issuer: "kadha-api".to_string(),
        }
    }
}

/// Internal JWT claims structure for serialization.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user_id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
    iat: i64,
    iss: String,
}

/// HS256 JWT token service. The secret is fixed at construction.
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtTokenService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::default();
        validation.set_issuer(&[&config.issuer]);
        match config.expiration_hours {
            Some(_) => validation.set_required_spec_claims(&["exp", "iss", "sub"]),
            None => {
                validation.set_required_spec_claims(&["iss", "sub"]);
                validation.validate_exp = false;
            }
        }

        Self {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    fn ensure_configured(&self) -> Result<(), AuthError> {
        if self.config.secret.is_empty() {
            return Err(AuthError::InvalidToken(
                "signing secret is not configured".to_string(),
            ));
        }
        Ok(())
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, user_id: Uuid) -> Result<String, AuthError> {
        self.ensure_configured()?;

        let now = Utc::now();
        let exp = match self.config.expiration_hours {
            Some(hours) => Some(
                TimeDelta::try_hours(hours)
                    .and_then(|lifetime| now.checked_add_signed(lifetime))
                    .ok_or_else(|| {
                        AuthError::InvalidToken(format!("token lifetime of {} hours", hours))
                    })?
                    .timestamp(),
            ),
            None => None,
        };
        let claims = Claims {
            sub: user_id.to_string(),
            exp,
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.ensure_configured()?;

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::InvalidToken(e.to_string()),
                }
            })?;

        let user_id = Uuid::parse_str(&token_data.claims.sub)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(TokenClaims {
            user_id,
            exp: token_data.claims.exp,
        })
    }

    fn expiration_seconds(&self) -> Option<i64> {
        self.config
            .expiration_hours
            .map(|hours| hours.saturating_mul(3600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key".to_string(),
            expiration_hours: Some(1),
            issuer: "test-issuer".to_string(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let service = JwtTokenService::new(test_config());
        let user_id = Uuid::new_v4();

        let token = service.issue(user_id).unwrap();
        let claims = service.verify(&token).unwrap();

        assert_eq!(claims.user_id, user_id);
        assert!(claims.exp.is_some());
    }

    #[test]
    fn test_tokens_without_expiry() {
        let service = JwtTokenService::new(JwtConfig {
            expiration_hours: None,
            ..test_config()
        });
        let user_id = Uuid::new_v4();

        let claims = service.verify(&service.issue(user_id).unwrap()).unwrap();

        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.exp, None);
        assert_eq!(service.expiration_seconds(), None);
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = JwtTokenService::new(JwtConfig {
            expiration_hours: Some(-2),
            ..test_config()
        });

        let token = service.issue(Uuid::new_v4()).unwrap();

        assert!(matches!(
            service.verify(&token).unwrap_err(),
            AuthError::TokenExpired
        ));
    }

    #[test]
    fn test_validate_invalid_token() {
        let service = JwtTokenService::new(test_config());

        let result = service.verify("invalid-token");

        assert!(matches!(result.unwrap_err(), AuthError::InvalidToken(_)));
    }

    #[test]
    fn test_signature_mismatch_rejected() {
        let signer = JwtTokenService::new(test_config());
        let verifier = JwtTokenService::new(JwtConfig {
            secret: "another-secret".to_string(),
            ..test_config()
        });

        let token = signer.issue(Uuid::new_v4()).unwrap();

        assert!(matches!(
            verifier.verify(&token).unwrap_err(),
            AuthError::InvalidToken(_)
        ));
    }

    #[test]
    fn test_validate_wrong_issuer_token() {
        let service1 = JwtTokenService::new(JwtConfig {
            issuer: "issuer1".to_string(),
            ..test_config()
        });
        let service2 = JwtTokenService::new(JwtConfig {
            issuer: "issuer2".to_string(),
            ..test_config()
        });

        let token = service1.issue(Uuid::new_v4()).unwrap();

        assert!(service2.verify(&token).is_err());
    }

    #[test]
    fn test_missing_secret_fails_closed() {
        let service = JwtTokenService::new(JwtConfig::default());

        assert!(service.issue(Uuid::new_v4()).is_err());
        assert!(matches!(
            service.verify("a.b.c").unwrap_err(),
            AuthError::InvalidToken(_)
        ));
    }

    #[test]
    fn test_expiration_seconds() {
        let service = JwtTokenService::new(JwtConfig {
            expiration_hours: Some(24),
            ..test_config()
        });

        assert_eq!(service.expiration_seconds(), Some(86400));
    }

    #[test]
    fn test_out_of_range_lifetime_is_an_error() {
        let service = JwtTokenService::new(JwtConfig {
            expiration_hours: Some(i64::MAX),
            ..test_config()
        });

        assert!(matches!(
            service.issue(Uuid::new_v4()),
            Err(AuthError::InvalidToken(_))
        ));
        assert_eq!(service.expiration_seconds(), Some(i64::MAX));
    }

    #[test]
    fn test_longest_accepted_lifetime_issues() {
        let service = JwtTokenService::new(JwtConfig {
            expiration_hours: Some(MAX_EXPIRATION_HOURS),
            ..test_config()
        });

        let claims = service.verify(&service.issue(Uuid::new_v4()).unwrap()).unwrap();
        assert!(claims.exp.is_some());
    }
}
