use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

use crate::models::{Claims, TokenType};

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or_default()
}

/// Who a token is issued to.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: u64,
    pub email: String,
    pub role: u8,
    pub employee_id: Option<String>,
}

impl From<&Claims> for TokenSubject {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.sub.clone(),
            role: claims.role,
            employee_id: claims.employee_id.clone(),
        }
    }
}

pub fn issue_token(
    subject: &TokenSubject,
    token_type: TokenType,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = Claims {
        user_id: subject.user_id,
        sub: subject.email.clone(),
        role: subject.role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
        employee_id: subject.employee_id.clone(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, claims))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> TokenSubject {
        TokenSubject {
            user_id: 7,
            email: "hr@company.vn".into(),
            role: 2,
            employee_id: Some("E7".into()),
        }
    }

    #[test]
    fn issued_tokens_verify_with_the_same_secret() {
        let (token, issued) = issue_token(&subject(), TokenType::Refresh, "secret", 60).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.jti, issued.jti);
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert_eq!(claims.employee_id.as_deref(), Some("E7"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let (token, _) = issue_token(&subject(), TokenType::Access, "secret", 60).unwrap();
        assert!(verify_token(&token, "other").is_err());
    }

    #[test]
    fn each_token_gets_a_fresh_jti() {
        let (_, a) = issue_token(&subject(), TokenType::Access, "s", 60).unwrap();
        let (_, b) = issue_token(&subject(), TokenType::Access, "s", 60).unwrap();
        assert_ne!(a.jti, b.jti);
    }
}
