//! JWT Token Service - HS256 访问令牌与刷新令牌
//!
//! 两类令牌使用不同密钥签名，声明中的 typ 再做一次区分

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::ports::{AuthError, IssuedToken, TokenClaims, TokenKind, TokenServicePort};

/// JWT 配置
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    /// 访问令牌有效期（秒）
    pub access_ttl_secs: i64,
    /// 刷新令牌有效期（秒）
    pub refresh_ttl_secs: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    typ: String,
    iat: i64,
    exp: i64,
    jti: String,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl KeyPair {
    fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs),
        }
    }
}

/// JWT Token Service
pub struct JwtTokenService {
    access: KeyPair,
    refresh: KeyPair,
    validation: Validation,
}

impl JwtTokenService {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            access: KeyPair::new(&config.access_secret, config.access_ttl_secs),
            refresh: KeyPair::new(&config.refresh_secret, config.refresh_ttl_secs),
            validation,
        }
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn issue(&self, kind: TokenKind, user_id: Uuid, email: &str) -> Result<IssuedToken, AuthError> {
        let keys = self.keys(kind);
        let now = Utc::now();
        let expires_at = now + keys.ttl;
        let token_id = Uuid::new_v4();

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            typ: kind.as_str().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: token_id.to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| AuthError::Hashing(format!("Failed to sign token: {}", e)))?;

        Ok(IssuedToken {
            token,
            token_id,
            expires_at: timestamp(claims.exp)?,
        })
    }

    fn verify(&self, kind: TokenKind, token: &str) -> Result<TokenClaims, AuthError> {
        let data = decode::<Claims>(token, &self.keys(kind).decoding, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken,
            },
        )?;
        let claims = data.claims;

        if claims.typ != kind.as_str() {
            return Err(AuthError::WrongTokenType);
        }

        Ok(TokenClaims {
            user_id: Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?,
            email: claims.email,
            token_id: Uuid::parse_str(&claims.jti).map_err(|_| AuthError::InvalidToken)?,
            kind,
            expires_at: timestamp(claims.exp)?,
        })
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, AuthError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or(AuthError::InvalidToken)
}

impl TokenServicePort for JwtTokenService {
    fn issue_access(&self, user_id: Uuid, email: &str) -> Result<IssuedToken, AuthError> {
        self.issue(TokenKind::Access, user_id, email)
    }

    fn issue_refresh(&self, user_id: Uuid, email: &str) -> Result<IssuedToken, AuthError> {
        self.issue(TokenKind::Refresh, user_id, email)
    }

    fn verify_access(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.verify(TokenKind::Access, token)
    }

    fn verify_refresh(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.verify(TokenKind::Refresh, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            access_secret: "access-secret".to_string(),
            refresh_secret: "refresh-secret".to_string(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 3600,
        }
    }

    #[test]
    fn test_issue_and_verify_access() {
        let service = JwtTokenService::new(&config());
        let user_id = Uuid::new_v4();
        let issued = service.issue_access(user_id, "vet@example.com").unwrap();

        let claims = service.verify_access(&issued.token).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.email, "vet@example.com");
        assert_eq!(claims.token_id, issued.token_id);
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[test]
    fn test_tokens_not_interchangeable() {
        let service = JwtTokenService::new(&config());
        let user_id = Uuid::new_v4();
        let access = service.issue_access(user_id, "a@b.co").unwrap();
        let refresh = service.issue_refresh(user_id, "a@b.co").unwrap();

        assert!(service.verify_refresh(&access.token).is_err());
        assert!(service.verify_access(&refresh.token).is_err());
        assert!(service.verify_refresh(&refresh.token).is_ok());
        assert!(matches!(service.verify_access("garbage"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_same_secret_still_checks_type() {
        let mut cfg = config();
        cfg.refresh_secret = cfg.access_secret.clone();
        let service = JwtTokenService::new(&cfg);
        let refresh = service.issue_refresh(Uuid::new_v4(), "a@b.co").unwrap();
        assert!(matches!(
            service.verify_access(&refresh.token),
            Err(AuthError::WrongTokenType)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut cfg = config();
        cfg.access_ttl_secs = -120;
        let service = JwtTokenService::new(&cfg);
        let issued = service.issue_access(Uuid::new_v4(), "a@b.co").unwrap();
        assert!(matches!(service.verify_access(&issued.token), Err(AuthError::Expired)));
    }
}
