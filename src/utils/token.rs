use chrono::Utc;
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::enums::Role;
use crate::error::ApiError;

/// Tokens are valid for 24 hours. There is no revocation list; expiry is the
/// only bound on a token's lifetime.
pub const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Identity assertion carried in every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Role guard: each endpoint declares the exact role it requires. There
    /// is no role hierarchy; an admin does not implicitly pass a company
    /// check.
    pub fn require_role(&self, role: Role) -> Result<(), ApiError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "Access denied. {} role required.",
                match role {
                    Role::Student => "Student",
                    Role::Company => "Company",
                    Role::Admin => "Admin",
                }
            )))
        }
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, ApiError> {
    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::Internal(format!("invalid signing key: {}", e)))
}

/// Signs a 24-hour identity token for the given account.
pub fn issue(id: i64, email: &str, role: Role, secret: &str) -> Result<String, ApiError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        id,
        email: email.to_string(),
        role,
        iat: now,
        exp: now + TOKEN_TTL_SECS,
    };
    claims
        .sign_with_key(&signing_key(secret)?)
        .map_err(|e| ApiError::Internal(format!("token signing failed: {}", e)))
}

/// Validates signature and expiry. Bad signature and elapsed expiry are
/// indistinguishable to the caller.
pub fn verify(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let claims: Claims = token
        .verify_with_key(&signing_key(secret)?)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;
    if claims.exp < Utc::now().timestamp() {
        return Err(ApiError::Unauthorized("Invalid or expired token".to_string()));
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn token_round_trips() {
        let token = issue(42, "student@example.com", Role::Student, SECRET).unwrap();
        let claims = verify(&token, SECRET).unwrap();
        assert_eq!(claims.id, 42);
        assert_eq!(claims.email, "student@example.com");
        assert_eq!(claims.role, Role::Student);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue(42, "student@example.com", Role::Student, SECRET).unwrap();
        assert!(matches!(verify(&token, "other-secret"), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            id: 42,
            email: "student@example.com".to_string(),
            role: Role::Student,
            iat: now - TOKEN_TTL_SECS - 60,
            exp: now - 60,
        };
        let token = claims.sign_with_key(&signing_key(SECRET).unwrap()).unwrap();
        assert!(matches!(verify(&token, SECRET), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(verify("definitely.not.a.jwt", SECRET).is_err());
    }

    #[test]
    fn role_guard_rejects_other_roles() {
        let token = issue(7, "company@example.com", Role::Company, SECRET).unwrap();
        let claims = verify(&token, SECRET).unwrap();
        assert!(claims.require_role(Role::Company).is_ok());
        assert!(matches!(claims.require_role(Role::Admin), Err(ApiError::Forbidden(_))));
    }
}
