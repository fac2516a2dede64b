//! Auth Adapters - 令牌、密码哈希与 Google 身份校验

mod google;
mod jwt;
mod password;

pub use google::{GoogleIdentityVerifier, GoogleVerifierConfig};
pub use jwt::{JwtConfig, JwtTokenService};
pub use password::BcryptPasswordHasher;
