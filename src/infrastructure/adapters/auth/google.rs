//! Google Identity Verifier - 通过 tokeninfo 端点校验 ID Token
//!
//! GET {tokeninfo_url}?id_token=...
//! 返回的 aud 必须等于配置的 client id，且邮箱已验证

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::application::ports::{AuthError, ExternalIdentity, IdentityProviderPort};

/// Google 校验配置
#[derive(Debug, Clone)]
pub struct GoogleVerifierConfig {
    pub client_id: String,
    pub tokeninfo_url: String,
    pub timeout_secs: u64,
}

impl GoogleVerifierConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            tokeninfo_url: "https://oauth2.googleapis.com/tokeninfo".to_string(),
            timeout_secs: 10,
        }
    }
}

/// tokeninfo 响应（数值与布尔字段以字符串返回）
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
}

impl TokenInfo {
    fn into_identity(self, client_id: &str) -> Result<ExternalIdentity, AuthError> {
        if self.aud != client_id {
            return Err(AuthError::ProviderRejected("audience mismatch".to_string()));
        }
        let email = self
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AuthError::ProviderRejected("token carries no email".to_string()))?;
        let email_verified = self.email_verified.as_deref() == Some("true");
        if !email_verified {
            return Err(AuthError::ProviderRejected("email not verified".to_string()));
        }

        Ok(ExternalIdentity {
            subject: self.sub,
            email,
            email_verified,
            given_name: self.given_name,
            family_name: self.family_name,
        })
    }
}

/// Google Identity Verifier
pub struct GoogleIdentityVerifier {
    client: Client,
    config: GoogleVerifierConfig,
}

impl GoogleIdentityVerifier {
    pub fn new(config: GoogleVerifierConfig) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl IdentityProviderPort for GoogleIdentityVerifier {
    async fn verify_id_token(&self, id_token: &str) -> Result<ExternalIdentity, AuthError> {
        let response = self
            .client
            .get(&self.config.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AuthError::ProviderUnavailable("tokeninfo request timed out".to_string())
                } else {
                    AuthError::ProviderUnavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            return Err(AuthError::ProviderRejected("invalid id token".to_string()));
        }
        if !status.is_success() {
            return Err(AuthError::ProviderUnavailable(format!("HTTP {}", status)));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(format!("Invalid tokeninfo body: {}", e)))?;

        let identity = info.into_identity(&self.config.client_id)?;
        tracing::debug!(subject = %identity.subject, "Google identity verified");
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(aud: &str, verified: &str) -> TokenInfo {
        serde_json::from_value(serde_json::json!({
            "aud": aud,
            "sub": "1234567890",
            "email": "vet@example.com",
            "email_verified": verified,
            "given_name": "Ana",
            "exp": "1999999999"
        }))
        .unwrap()
    }

    #[test]
    fn test_identity_accepted_for_matching_audience() {
        let identity = info("client-1", "true").into_identity("client-1").unwrap();
        assert_eq!(identity.subject, "1234567890");
        assert_eq!(identity.given_name.as_deref(), Some("Ana"));
        assert!(identity.family_name.is_none());
    }

    #[test]
    fn test_identity_rejected() {
        assert!(matches!(
            info("other", "true").into_identity("client-1"),
            Err(AuthError::ProviderRejected(_))
        ));
        assert!(matches!(
            info("client-1", "false").into_identity("client-1"),
            Err(AuthError::ProviderRejected(_))
        ));
    }
}
