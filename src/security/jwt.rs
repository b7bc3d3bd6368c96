use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use log::debug;

/// Settings for verifying tokens issued by the external identity provider
/// (Supabase or Clerk). The backend never issues tokens itself.
#[derive(Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// HMAC secret, or a PEM-encoded public key for RSA/EC algorithms.
    pub secret: String,
    pub algorithm: JwtAlgorithm,
    pub audience: Option<String>,
    pub issuer: Option<String>,
    pub leeway_seconds: u64,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JwtAlgorithm {
    HS256,
    HS384,
    HS512,
    RS256,
    RS384,
    RS512,
    ES256,
    ES384,
}

impl JwtAlgorithm {
    pub fn to_jsonwebtoken(&self) -> Algorithm {
        match self {
            Self::HS256 => Algorithm::HS256,
            Self::HS384 => Algorithm::HS384,
            Self::HS512 => Algorithm::HS512,
            Self::RS256 => Algorithm::RS256,
            Self::RS384 => Algorithm::RS384,
            Self::RS512 => Algorithm::RS512,
            Self::ES256 => Algorithm::ES256,
            Self::ES384 => Algorithm::ES384,
        }
    }

    pub fn is_symmetric(&self) -> bool {
        matches!(self, Self::HS256 | Self::HS384 | Self::HS512)
    }
}

impl FromStr for JwtAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "RS512" => Ok(Self::RS512),
            "ES256" => Ok(Self::ES256),
            "ES384" => Ok(Self::ES384),
            other => Err(format!("unsupported algorithm '{other}'")),
        }
    }
}

/// Claims read from provider tokens. Only `sub` and `exp` are required;
/// Supabase carries the display name in `user_metadata`, Clerk in `username`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// A single audience string or an array of them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<serde_json::Value>,
}

impl Claims {
    pub fn new(sub: impl Into<String>, exp: i64) -> Self {
        Self {
            sub: sub.into(),
            exp,
            iat: None,
            aud: None,
            iss: None,
            email: None,
            username: None,
            user_metadata: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_audience(mut self, aud: impl Into<String>) -> Self {
        self.aud = Some(serde_json::Value::String(aud.into()));
        self
    }

    pub fn with_issuer(mut self, iss: impl Into<String>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    pub fn with_user_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.user_metadata = Some(metadata);
        self
    }

    /// Display name: `username` claim, then `user_metadata.username` /
    /// `user_metadata.user_name`, then `user_<first 8 chars of sub>`.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.username.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }

        let from_metadata = self.user_metadata.as_ref().and_then(|meta| {
            ["username", "user_name"]
                .iter()
                .find_map(|key| meta.get(*key).and_then(|v| v.as_str()))
                .filter(|n| !n.trim().is_empty())
                .map(str::to_string)
        });

        from_metadata.unwrap_or_else(|| default_username(&self.sub))
    }
}

pub fn default_username(user_id: &str) -> String {
    let prefix: String = user_id.chars().take(8).collect();
    format!("user_{prefix}")
}

/// Identity established from a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub user_id: String,
    pub email: Option<String>,
    pub username: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing authorization token")]
    MissingToken,
    #[error("Invalid authorization format")]
    InvalidFormat,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Token expired")]
    TokenExpired,
}

pub struct IdentityVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for IdentityVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityVerifier")
            .field("algorithms", &self.validation.algorithms)
            .field("leeway", &self.validation.leeway)
            .finish()
    }
}

impl IdentityVerifier {
    pub fn new(config: &JwtConfig) -> anyhow::Result<Self> {
        let pem = config.secret.as_bytes();
        let decoding_key = match config.algorithm {
            JwtAlgorithm::HS256 | JwtAlgorithm::HS384 | JwtAlgorithm::HS512 => {
                DecodingKey::from_secret(pem)
            }
            JwtAlgorithm::RS256 | JwtAlgorithm::RS384 | JwtAlgorithm::RS512 => {
                DecodingKey::from_rsa_pem(pem)
                    .map_err(|e| anyhow::anyhow!("Invalid RSA public key: {e}"))?
            }
            JwtAlgorithm::ES256 | JwtAlgorithm::ES384 => DecodingKey::from_ec_pem(pem)
                .map_err(|e| anyhow::anyhow!("Invalid EC public key: {e}"))?,
        };

        let mut validation = Validation::new(config.algorithm.to_jsonwebtoken());
        validation.leeway = config.leeway_seconds;
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.set_required_spec_claims(&["sub", "exp"]);
        match &config.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        if let Some(iss) = &config.issuer {
            validation.set_issuer(&[iss]);
        }

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// Validate a raw token and return the caller's identity.
    pub fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidToken("Invalid signature".into()),
                ErrorKind::InvalidAudience => AuthError::InvalidToken("Invalid audience".into()),
                ErrorKind::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".into()),
                ErrorKind::MissingRequiredClaim(claim) => {
                    AuthError::InvalidToken(format!("Missing required claim: {claim}"))
                }
                ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) => {
                    AuthError::InvalidToken("Malformed token".into())
                }
                _ => AuthError::InvalidToken(format!("Token validation failed: {e}")),
            })?
            .claims;

        if claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken("Empty subject".into()));
        }

        debug!("Verified token for subject {}", claims.sub);
        Ok(VerifiedIdentity {
            username: claims.display_name(),
            email: claims.email.filter(|e| !e.trim().is_empty()),
            user_id: claims.sub,
        })
    }

    /// Validate the value of an `Authorization` header.
    pub fn verify_header(&self, header: Option<&str>) -> Result<VerifiedIdentity, AuthError> {
        let header = header.ok_or(AuthError::MissingToken)?;
        let token = extract_bearer_token(header).ok_or(AuthError::InvalidFormat)?;
        self.verify(token)
    }
}

pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
