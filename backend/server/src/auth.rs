//! # Authentication
//!
//! Passwords are stored as argon2 PHC strings.
//!
//! Tokens are `payload.signature`, both halves base64url without padding:
//! - payload: JSON claims (user identity, token kind, expiry in unix seconds, random id)
//! - signature: HMAC-SHA256 of the encoded payload under the server secret
//!
//! Access tokens guard every route except signup, login and refresh. Clients send
//! them in a `token` header, or as `Authorization: Bearer <token>`.
use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use ledger::models::User;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::task::spawn_blocking;

use crate::{error::AppError, state::AppState};

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_HEADER: &str = "token";

fn hash_blocking(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {e}")))
}

fn verify_blocking(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

/// Argon2 is CPU bound, so it runs on the blocking pool instead of a runtime worker.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    spawn_blocking(move || hash_blocking(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {e}")))?
}

pub async fn verify_password(hash: String, password: String) -> Result<bool, AppError> {
    spawn_blocking(move || verify_blocking(&hash, &password))
        .await
        .map_err(|e| AppError::Internal(format!("Password verification task failed: {e}")))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for Subject {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub subject: Subject,
    pub kind: TokenKind,
    pub exp: i64,
    /// Random per token, so two tokens issued in the same second still differ.
    pub jti: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct TokenSigner {
    secret: Vec<u8>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

fn token_id() -> String {
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn unauthorized(reason: &str) -> AppError {
    AppError::Unauthorized(reason.to_string())
}

impl TokenSigner {
    pub fn new(secret: Vec<u8>, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            secret,
            access_ttl,
            refresh_ttl,
        }
    }

    fn mac(&self) -> Result<HmacSha256, AppError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::Internal(format!("Invalid token secret: {e}")))
    }

    pub fn issue(&self, subject: &Subject, kind: TokenKind) -> Result<String, AppError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };

        let claims = Claims {
            subject: subject.clone(),
            kind,
            exp: (Utc::now() + ttl).timestamp(),
            jti: token_id(),
        };

        let payload = serde_json::to_vec(&claims)
            .map_err(|e| AppError::Internal(format!("Failed to encode claims: {e}")))?;
        let payload = URL_SAFE_NO_PAD.encode(payload);

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{payload}.{signature}"))
    }

    pub fn issue_pair(&self, subject: &Subject) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue(subject, TokenKind::Access)?,
            refresh_token: self.issue(subject, TokenKind::Refresh)?,
        })
    }

    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, AppError> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| unauthorized("malformed token"))?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| unauthorized("malformed token"))?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| unauthorized("invalid token signature"))?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| unauthorized("malformed token"))?;
        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| unauthorized("malformed token"))?;

        if claims.kind != kind {
            return Err(unauthorized("wrong token kind"));
        }
        if claims.exp <= Utc::now().timestamp() {
            return Err(unauthorized("token expired"));
        }

        Ok(claims)
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    if let Some(token) = headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(token);
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Rejects requests without a valid access token and hands the claims to the handler.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer(request.headers()).ok_or_else(|| unauthorized("missing token"))?;
    let claims = state.signer.verify(token, TokenKind::Access)?;

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn subject() -> Subject {
        Subject {
            user_id: "u1".to_string(),
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
        }
    }

    fn signer() -> TokenSigner {
        TokenSigner::new(b"secret".to_vec(), Duration::hours(1), Duration::hours(2))
    }

    #[tokio::test]
    async fn test_password_round_trip() {
        let hash = hash_password("correct horse".to_string()).await.unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(hash.clone(), "correct horse".to_string()).await.unwrap());
        assert!(!verify_password(hash, "wrong horse".to_string()).await.unwrap());
        assert!(
            !verify_password("not a hash".to_string(), "correct horse".to_string())
                .await
                .unwrap()
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_hashing_leaves_runtime_free() {
        let other = tokio::spawn(async {});

        let hash = hash_password("correct horse".to_string()).await.unwrap();
        assert!(other.is_finished());

        let other = tokio::spawn(async {});
        verify_password(hash, "correct horse".to_string()).await.unwrap();
        assert!(other.is_finished());
    }

    #[test]
    fn test_issue_then_verify() {
        let signer = signer();
        let token = signer.issue(&subject(), TokenKind::Access).unwrap();

        let claims = signer.verify(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.subject, subject());
    }

    #[test]
    fn test_tokens_are_unique() {
        let signer = signer();
        let first = signer.issue_pair(&subject()).unwrap();
        let second = signer.issue_pair(&subject()).unwrap();

        assert_ne!(first.access_token, second.access_token);
        assert_ne!(first.refresh_token, second.refresh_token);
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let signer = signer();
        let pair = signer.issue_pair(&subject()).unwrap();

        assert!(signer.verify(&pair.refresh_token, TokenKind::Access).is_err());
        assert!(signer.verify(&pair.refresh_token, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let signer = signer();
        let token = signer.issue(&subject(), TokenKind::Access).unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let mut forged = subject();
        forged.user_id = "admin".to_string();
        let forged_payload = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&Claims {
                subject: forged,
                kind: TokenKind::Access,
                exp: i64::MAX,
                jti: "forged".to_string(),
            })
            .unwrap(),
        );

        let result = signer.verify(&format!("{forged_payload}.{signature}"), TokenKind::Access);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = signer().issue(&subject(), TokenKind::Access).unwrap();
        let other = TokenSigner::new(b"other".to_vec(), Duration::hours(1), Duration::hours(1));

        assert!(other.verify(&token, TokenKind::Access).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = TokenSigner::new(b"secret".to_vec(), Duration::seconds(-5), Duration::hours(1));
        let token = signer.issue(&subject(), TokenKind::Access).unwrap();

        assert!(signer.verify(&token, TokenKind::Access).is_err());
    }

    #[test]
    fn test_bearer_header_forms() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer(&headers), Some("abc"));

        headers.insert(TOKEN_HEADER, HeaderValue::from_static("xyz"));
        assert_eq!(bearer(&headers), Some("xyz"));
    }
}
